use anyhow::{Result, anyhow};
use log::{error, info, warn};
use serde_json::{Value, json};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::{BufRead, BufReader, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::PathBuf,
    sync::{
        Arc, Mutex,
        mpsc::{self, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use super::pipeline::{PipelineCmd, SessionStatus, run_pipeline};
use super::runtime::{frames_socket_path, socket_path};
use super::watch::watch_profiles;
use crate::config::{DaemonConfigState, Profile};

/// Editors write profiles in bursts; reload once things settle.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

pub enum IpcMsg {
    Reload(Sender<Value>),
    UseProfile(String, Sender<Value>),
    SetEnabled(bool),
    SetSwipe(bool),
    ProfileChanged(PathBuf),
    Shutdown,
}

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let mut cfg = DaemonConfigState::load_or_install_default()?;
    info!("daemon: active profile '{}'", cfg.active_name);

    let (tx_req, rx_req) = mpsc::channel::<IpcMsg>();
    let status = Arc::new(Mutex::new(SessionStatus::default()));

    // gesture thread
    let mut gesture_thread = GestureThread::start(cfg.profile.clone(), status.clone())?;

    spawn_signal_listener(tx_req.clone())?;

    // always watched; the active profile's meta.hot_reload decides per change
    let _watcher = match watch_profiles(&cfg.profiles_dir, tx_req.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("hot reload disabled: {e}");
            None
        }
    };
    let mut reload_due: Option<Instant> = None;

    // accept loop
    listener.set_nonblocking(true)?;
    loop {
        if let Ok((stream, _)) = listener.accept() {
            let tx = tx_req.clone();
            let snapshot = cfg.clone();
            let st = status.clone();
            thread::spawn(move || {
                if let Err(e) = handle_client(stream, snapshot, tx, st) {
                    error!("ipc client error: {e}");
                }
            });
        }

        while let Ok(msg) = rx_req.try_recv() {
            match msg {
                IpcMsg::Reload(reply) => {
                    let _ = reply.send(reload(&mut cfg, &gesture_thread));
                }
                IpcMsg::UseProfile(name, reply) => {
                    let resp = match cfg.set_active(&name) {
                        Ok(()) => {
                            gesture_thread.send(PipelineCmd::Reconfigure(cfg.profile.clone()));
                            info!("switched active profile to {}", cfg.active_name);
                            json!({"ok": true, "data": {"active_profile": cfg.active_name}})
                        }
                        Err(e) => {
                            error!("use profile failed: {e}");
                            json!({"ok": false, "error": e.to_string()})
                        }
                    };
                    let _ = reply.send(resp);
                }
                IpcMsg::SetEnabled(en) => {
                    gesture_thread.send(PipelineCmd::SetEnabled(en));
                    info!("session {}", if en { "enabled" } else { "disabled" });
                }
                IpcMsg::SetSwipe(en) => gesture_thread.send(PipelineCmd::SetSwipe(en)),
                IpcMsg::ProfileChanged(p) => {
                    if cfg.watches_change(&p) {
                        reload_due = Some(Instant::now() + RELOAD_DEBOUNCE);
                    }
                }
                IpcMsg::Shutdown => {
                    gesture_thread.stop();
                    let _ = std::fs::remove_file(&sock);
                    info!("daemon: shut down");
                    return Ok(());
                }
            }
        }

        if reload_due.is_some_and(|t| Instant::now() >= t) {
            reload_due = None;
            info!("active profile changed on disk");
            reload(&mut cfg, &gesture_thread);
        }

        thread::sleep(Duration::from_millis(5));
    }
}

/// Keeps the last good profile when the new one fails to load.
fn reload(cfg: &mut DaemonConfigState, gesture_thread: &GestureThread) -> Value {
    match cfg.reload() {
        Ok(()) => {
            gesture_thread.send(PipelineCmd::Reconfigure(cfg.profile.clone()));
            info!("profile reloaded");
            json!({"ok": true, "data": {"active_profile": cfg.active_name}})
        }
        Err(e) => {
            error!("reload failed: {e}");
            json!({"ok": false, "error": e.to_string()})
        }
    }
}

fn handle_client(
    mut stream: UnixStream,
    cfg: DaemonConfigState,
    tx_req: Sender<IpcMsg>,
    status: Arc<Mutex<SessionStatus>>,
) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let req: Value = serde_json::from_str(&line)?;
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");

    let resp = match op {
        "status" => {
            let session = status.lock().map(|s| s.clone()).unwrap_or_default();
            json!({"ok": true, "data": {
                "active_profile": cfg.active_name,
                "socket": socket_path()?,
                "frames_socket": frames_socket_path()?,
                "session": session,
            }})
        }
        "reload" => {
            let (tx, rx) = mpsc::channel();
            tx_req.send(IpcMsg::Reload(tx))?;
            await_reply(rx)
        }
        "use" => {
            let name = req.get("profile").and_then(|v| v.as_str()).unwrap_or("");
            let (tx, rx) = mpsc::channel();
            tx_req.send(IpcMsg::UseProfile(name.to_string(), tx))?;
            await_reply(rx)
        }
        "enable" | "disable" => {
            let en = op == "enable";
            tx_req.send(IpcMsg::SetEnabled(en))?;
            json!({"ok": true, "data": {"enabled": en}})
        }
        "swipe" => match req.get("enabled").and_then(|v| v.as_bool()) {
            Some(en) => {
                tx_req.send(IpcMsg::SetSwipe(en))?;
                json!({"ok": true, "data": {"swipe": en}})
            }
            None => json!({"ok": false, "error": "swipe requires boolean 'enabled'"}),
        },
        "list" => {
            let list = cfg.list_profiles();
            json!({"ok": true, "data": {"profiles": list, "active": cfg.active_name}})
        }
        "doctor" => {
            let report = cfg.doctor_report(&socket_path()?, &frames_socket_path()?);
            json!({"ok": true, "data": report})
        }
        "shutdown" => {
            tx_req.send(IpcMsg::Shutdown)?;
            json!({"ok": true, "data": "shutting down"})
        }
        _ => json!({"ok": false, "error": format!("unknown op: {op}")}),
    };

    writeln!(stream, "{}", resp)?;
    Ok(())
}

fn await_reply(rx: mpsc::Receiver<Value>) -> Value {
    rx.recv_timeout(Duration::from_secs(2))
        .unwrap_or_else(|_| json!({"ok": false, "error": "daemon did not answer"}))
}

fn spawn_signal_listener(tx: Sender<IpcMsg>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("received signal {sig}; shutting down");
            let _ = tx.send(IpcMsg::Shutdown);
        }
    });
    Ok(())
}

struct GestureThread {
    tx_cmd: Sender<PipelineCmd>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GestureThread {
    fn start(profile: Profile, status: Arc<Mutex<SessionStatus>>) -> Result<Self> {
        let (tx_cmd, rx_cmd) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("pinchctl-gesture".into())
            .spawn(move || {
                if let Err(e) = run_pipeline(profile, rx_cmd, status) {
                    error!("gesture pipeline failed: {e}");
                }
            })?;
        Ok(Self {
            tx_cmd,
            handle: Some(handle),
        })
    }

    fn send(&self, cmd: PipelineCmd) {
        if self.tx_cmd.send(cmd).is_err() {
            warn!("gesture thread is gone; command dropped");
        }
    }

    /// Stops the session and waits for the thread, so no event follows.
    fn stop(&mut self) {
        self.send(PipelineCmd::Shutdown);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

// client helper
pub fn client_request(req: Value) -> Result<Value> {
    let sock = socket_path()?;
    if !sock.exists() {
        return Err(anyhow!(
            "pinchctl daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: Value = serde_json::from_str(&resp)?;
    Ok(v)
}
