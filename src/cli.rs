use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{
    env,
    fs::File,
    io::{self, BufReader},
    process::Command,
};

use pinchctl::actions::UinputSink;
use pinchctl::config::{self, Profile};
use pinchctl::events::JsonLinesSink;
use pinchctl::ingest;
use pinchctl::ipc;
use pinchctl::pipeline::Pipeline;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("start") => {
            let exe = std::env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("pinchctl: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("stop") => request(serde_json::json!({"op":"shutdown"})),
        Some("status") => request(serde_json::json!({"op":"status"})),
        Some("reload") => request(serde_json::json!({"op":"reload"})),
        Some("list") => request(serde_json::json!({"op":"list"})),
        Some("doctor") => request(serde_json::json!({"op":"doctor"})),
        Some("enable") => request(serde_json::json!({"op":"enable"})),
        Some("disable") => request(serde_json::json!({"op":"disable"})),

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: pinchctl use <profile_name>"))?;
            request(serde_json::json!({"op":"use","profile":name}))
        }

        Some("swipe") => {
            let state: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: pinchctl swipe <on|off>"))?;
            let en = match state.as_str() {
                "on" => true,
                "off" => false,
                other => return Err(anyhow!("expected on|off, got '{other}'")),
            };
            request(serde_json::json!({"op":"swipe","enabled":en}))
        }

        Some("replay") => {
            let swipe = pargs.contains("--swipe");
            let profile_name: Option<String> = pargs.opt_value_from_str("--profile")?;
            let path: String = pargs.free_from_str().map_err(|_| {
                anyhow!("usage: pinchctl replay <frames.ndjson> [--swipe] [--profile <name>]")
            })?;
            replay(&path, profile_name.as_deref(), swipe)
        }

        Some("emit") => {
            // usage:
            //   pinchctl emit click right
            //   pinchctl emit scroll 3
            //   pinchctl emit key RIGHT
            let what: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: pinchctl emit <click|scroll|key> ..."))?;
            let profile = config::load_profile("default").or_else(|_| config::builtin_profile())?;
            let mut sink = UinputSink::new(profile.screen)?;
            match what.as_str() {
                "click" => {
                    let btn: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: pinchctl emit click <left|right|middle>"))?;
                    sink.click_mouse(&btn)?;
                    println!("ok: clicked {btn}");
                }
                "scroll" => {
                    let steps: i32 = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: pinchctl emit scroll <steps>"))?;
                    sink.scroll_vertical(steps)?;
                    println!("ok: scrolled vertical {steps}");
                }
                "key" => {
                    let chord: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: pinchctl emit key RIGHT"))?;
                    sink.key_chord(&chord)?;
                    println!("ok: sent key chord {chord}");
                }
                other => return Err(anyhow!("unknown emit kind: {other}")),
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn request(req: serde_json::Value) -> Result<()> {
    let r = ipc::client_request(req)?;
    print_response(&r);
    Ok(())
}

fn replay(path: &str, profile_name: Option<&str>, swipe: bool) -> Result<()> {
    let profile: Profile = match profile_name {
        Some(name) => config::load_profile(name)?,
        None => config::builtin_profile()?,
    };
    let mut pipeline = Pipeline::new(&profile);
    if swipe {
        pipeline.set_swipe_enabled(true);
    }
    let input = BufReader::new(File::open(path).map_err(|e| anyhow!("cannot open {path}: {e}"))?);
    let mut sink = JsonLinesSink::new(io::stdout().lock());
    let summary = ingest::replay(&mut pipeline, input, &mut sink)?;
    eprintln!(
        "replayed {} frames, {} events",
        summary.frames, summary.events
    );
    Ok(())
}

fn print_help() {
    println!(
        r#"pinchctl - hand-pinch pointer daemon

USAGE:
  pinchctl help [command]                 Show general or command-specific help
  pinchctl start                          Start the daemon
  pinchctl stop                           Stop the daemon
  pinchctl status                         Show session state
  pinchctl reload                         Reload active profile
  pinchctl use <name>                     Switch active profile
  pinchctl list                           List profiles
  pinchctl doctor                         Diagnose permissions and sockets
  pinchctl enable | disable               Start or stop the gesture session
  pinchctl swipe <on|off>                 Toggle swipe detection
  pinchctl replay <file> [--swipe]        Run recorded frames, print events
  pinchctl emit click <left|right|middle> Emit a mouse click
  pinchctl emit scroll <steps>            Emit vertical scroll (+/- steps)
  pinchctl emit key RIGHT                 Emit a key or chord

TIPS:
  - Landmark producers connect to ~/.local/run/pinchctl.frames.sock
  - Profiles: ~/.config/pinchctl/profiles
  - Active profile pointer: ~/.config/pinchctl/active
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: pinchctl start\nStarts the background daemon."),
        "stop" => println!("usage: pinchctl stop\nEnds the session and stops the daemon."),
        "status" => println!(
            "usage: pinchctl status\nShows session, producer, gesture and pointer state."
        ),
        "reload" => println!(
            "usage: pinchctl reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => {
            println!("usage: pinchctl use <name>\nSwitches active profile to <name> and reloads.")
        }
        "list" => println!("usage: pinchctl list\nLists available profiles."),
        "doctor" => println!(
            "usage: pinchctl doctor\nChecks uinput permissions and reports socket paths."
        ),
        "enable" | "disable" => println!(
            "usage: pinchctl enable|disable\nStarts or stops the session; stopping releases any pinch."
        ),
        "swipe" => println!(
            "usage: pinchctl swipe <on|off>\nEnables or disables swipe detection until the next reload."
        ),
        "replay" => println!(
            "usage: pinchctl replay <frames.ndjson> [--swipe] [--profile <name>]\nFeeds recorded frames through the pipeline and prints events as JSON lines."
        ),
        "emit" => println!(
            "usage:\n  pinchctl emit click <left|right|middle>\n  pinchctl emit scroll <steps>\n  pinchctl emit key RIGHT"
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
