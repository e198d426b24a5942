//! Daemon: control socket, landmark producer socket, gesture thread.

mod dispatch;
mod pipeline;
pub mod runtime;
mod server;
mod watch;

pub use dispatch::BoundSink;
pub use server::{client_request, run_daemon};
