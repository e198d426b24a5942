use anyhow::Result;
use log::{info, warn};
use std::{
    io::{BufRead, BufReader, ErrorKind},
    os::unix::net::{UnixListener, UnixStream},
    sync::{
        Arc, Mutex,
        mpsc::{Receiver, TryRecvError},
    },
    thread,
    time::{Duration, Instant},
};

use super::dispatch::BoundSink;
use super::runtime::frames_socket_path;
use crate::actions::UinputSink;
use crate::config::Profile;
use crate::ingest::{FrameClock, feed_line, feed_missing};
use crate::pipeline::{Pipeline, PipelineStatus};

/// Requests handled by the gesture thread between ticks.
pub enum PipelineCmd {
    Reconfigure(Profile),
    SetEnabled(bool),
    SetSwipe(bool),
    Shutdown,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStatus {
    pub enabled: bool,
    pub producer_connected: bool,
    pub output_enabled: bool,
    pub frames: u64,
    pub pipeline: Option<PipelineStatus>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            enabled: true,
            producer_connected: false,
            output_enabled: true,
            frames: 0,
            pipeline: None,
        }
    }
}

/// Longest producer line accepted; a 21-point frame is well under 4 KiB.
const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, PartialEq)]
enum Poll {
    Line(String),
    Overlong,
    Idle,
    Closed,
}

/// One connected landmark producer. Partial lines survive read timeouts.
struct Producer {
    reader: BufReader<UnixStream>,
    buf: Vec<u8>,
    discarding: bool,
}

impl Producer {
    fn new(stream: UnixStream) -> Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(50)))?;
        Ok(Self {
            reader: BufReader::new(stream),
            buf: Vec::new(),
            discarding: false,
        })
    }

    fn poll(&mut self) -> Poll {
        let polled = match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => Poll::Closed,
            Ok(_) if self.buf.ends_with(b"\n") => {
                let line = String::from_utf8_lossy(&self.buf).trim().to_string();
                self.buf.clear();
                if std::mem::take(&mut self.discarding) {
                    return Poll::Idle;
                }
                Poll::Line(line)
            }
            Ok(_) => Poll::Idle,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Poll::Idle
            }
            Err(e) => {
                warn!("producer read failed: {e}");
                Poll::Closed
            }
        };
        self.cap(polled)
    }

    /// Drops an oversized line; an unfinished one is skipped up to its newline.
    fn cap(&mut self, polled: Poll) -> Poll {
        let too_long = match &polled {
            Poll::Line(line) => line.len() > MAX_LINE_BYTES,
            Poll::Idle => self.buf.len() > MAX_LINE_BYTES,
            _ => false,
        };
        if !too_long {
            return polled;
        }
        if self.discarding {
            self.buf.clear();
            return Poll::Idle;
        }
        warn!("producer line exceeds {MAX_LINE_BYTES} bytes; dropped");
        if !self.buf.is_empty() {
            self.buf.clear();
            self.discarding = true;
        }
        Poll::Overlong
    }
}

/// Gesture thread body. Owns the pipeline; nothing else touches it.
pub fn run_pipeline(
    profile: Profile,
    rx_cmd: Receiver<PipelineCmd>,
    status: Arc<Mutex<SessionStatus>>,
) -> Result<()> {
    let sock = frames_socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    listener.set_nonblocking(true)?;
    info!("pipeline: waiting for landmark producer on {}", sock.display());

    let started = Instant::now();
    let mut clock = FrameClock::default();
    let uinput = UinputSink::new(profile.screen).unwrap_or_else(|e| {
        warn!("uinput unavailable ({e}); events will not reach the OS");
        UinputSink::noop(profile.screen)
    });
    let mut sink = BoundSink::new(uinput, &profile);
    let mut pipeline = Pipeline::new(&profile);
    pipeline.stop();

    let mut enabled = true;
    let mut producer: Option<Producer> = None;
    let mut frames: u64 = 0;

    loop {
        loop {
            match rx_cmd.try_recv() {
                Ok(PipelineCmd::Reconfigure(p)) => {
                    pipeline.stop();
                    pipeline = Pipeline::new(&p);
                    sink.reconfigure(&p);
                    if enabled && producer.is_some() {
                        pipeline.start();
                    } else {
                        pipeline.stop();
                    }
                    info!("pipeline: reconfigured for '{}'", p.meta.name.as_deref().unwrap_or("?"));
                }
                Ok(PipelineCmd::SetEnabled(en)) => {
                    enabled = en;
                    if en && producer.is_some() {
                        pipeline.start();
                    } else {
                        pipeline.stop();
                    }
                }
                Ok(PipelineCmd::SetSwipe(en)) => {
                    pipeline.set_swipe_enabled(en);
                    info!("pipeline: swipe {}", if en { "on" } else { "off" });
                }
                Ok(PipelineCmd::Shutdown) | Err(TryRecvError::Disconnected) => {
                    pipeline.stop();
                    let _ = std::fs::remove_file(&sock);
                    info!("pipeline: stopped");
                    return Ok(());
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        if producer.is_none() {
            match listener.accept() {
                Ok((stream, _)) => {
                    producer = Some(Producer::new(stream)?);
                    clock.reset();
                    if enabled {
                        pipeline.start();
                    }
                    info!("pipeline: producer connected");
                }
                Err(_) => thread::sleep(Duration::from_millis(20)),
            }
            publish(&status, enabled, producer.is_some(), &sink, frames, &pipeline);
            continue;
        }

        let polled = producer.as_mut().map_or(Poll::Closed, Producer::poll);
        match polled {
            Poll::Line(line) if line.is_empty() => {}
            Poll::Line(line) => {
                let local_ms = started.elapsed().as_secs_f64() * 1000.0;
                feed_line(&mut pipeline, &mut clock, &line, local_ms, &mut sink);
                frames += 1;
            }
            Poll::Overlong => {
                let local_ms = started.elapsed().as_secs_f64() * 1000.0;
                feed_missing(&mut pipeline, &mut clock, local_ms, &mut sink);
                frames += 1;
            }
            Poll::Idle => {}
            Poll::Closed => {
                info!("pipeline: producer disconnected");
                producer = None;
                pipeline.stop();
                sink.forget_cursor();
            }
        }
        publish(&status, enabled, producer.is_some(), &sink, frames, &pipeline);
    }
}

fn publish(
    status: &Arc<Mutex<SessionStatus>>,
    enabled: bool,
    producer_connected: bool,
    sink: &BoundSink,
    frames: u64,
    pipeline: &Pipeline,
) {
    if let Ok(mut s) = status.lock() {
        *s = SessionStatus {
            enabled,
            producer_connected,
            output_enabled: sink.output_enabled(),
            frames,
            pipeline: Some(pipeline.status()),
        };
    }
}
