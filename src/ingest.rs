//! Producer lines into pipeline ticks, live or from a recording.

use anyhow::Result;
use log::warn;
use std::io::BufRead;

use crate::events::EventSink;
use crate::landmarks::decode_line;
use crate::pipeline::{Pipeline, TickOutput};

/// Nominal frame spacing for recordings that carry no timestamps.
pub const FRAME_MS: f64 = 1000.0 / 30.0;

/// Maps frame times onto the producer's clock. Lines without a usable
/// timestamp are placed after the last producer time by the local time
/// elapsed since it arrived, and stamps never move backwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameClock {
    last: Option<Anchor>,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    t_ms: f64,
    local_ms: f64,
}

impl FrameClock {
    /// Best guess of the producer time at local time `local_ms`.
    pub fn estimate(&self, local_ms: f64) -> f64 {
        match self.last {
            Some(a) => a.t_ms + (local_ms - a.local_ms).max(0.0),
            None => local_ms,
        }
    }

    /// Records a frame time and returns it clamped to be non-decreasing.
    pub fn observe(&mut self, t_ms: f64, local_ms: f64) -> f64 {
        let t_ms = match self.last {
            Some(a) => t_ms.max(a.t_ms),
            None => t_ms,
        };
        self.last = Some(Anchor { t_ms, local_ms });
        t_ms
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Decodes one line and runs a tick. Undecodable lines and invalid geometry
/// count as a frame without a hand.
pub fn feed_line(
    pipeline: &mut Pipeline,
    clock: &mut FrameClock,
    line: &str,
    local_ms: f64,
    sink: &mut dyn EventSink,
) -> TickOutput {
    let fallback = clock.estimate(local_ms);
    match decode_line(line, fallback) {
        Ok(sample) => {
            let t_ms = clock.observe(sample.t_ms, local_ms);
            pipeline.tick_into(sample.frame.as_ref(), t_ms, sink)
        }
        Err(e) => {
            warn!("dropping frame: {e}");
            feed_missing(pipeline, clock, local_ms, sink)
        }
    }
}

/// Runs a tick for a line that was dropped before decoding.
pub fn feed_missing(
    pipeline: &mut Pipeline,
    clock: &mut FrameClock,
    local_ms: f64,
    sink: &mut dyn EventSink,
) -> TickOutput {
    let t_ms = clock.estimate(local_ms);
    let t_ms = clock.observe(t_ms, local_ms);
    pipeline.tick_into(None, t_ms, sink)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: u64,
    pub events: u64,
}

/// Runs every non-empty line of `input` through `pipeline`.
pub fn replay<R: BufRead>(
    pipeline: &mut Pipeline,
    input: R,
    sink: &mut dyn EventSink,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut clock = FrameClock::default();
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let local_ms = summary.frames as f64 * FRAME_MS;
        let out = feed_line(pipeline, &mut clock, line, local_ms, sink);
        summary.frames += 1;
        summary.events += out.events.len() as u64;
    }
    pipeline.stop();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_continues_from_last_producer_time() {
        let mut c = FrameClock::default();
        assert_eq!(c.estimate(40.0), 40.0);
        c.observe(1_000_000.0, 100.0);
        assert_eq!(c.estimate(150.0), 1_000_050.0);
        // local clock hiccup never rewinds
        assert_eq!(c.estimate(90.0), 1_000_000.0);
    }

    #[test]
    fn observed_times_never_go_backwards() {
        let mut c = FrameClock::default();
        assert_eq!(c.observe(500.0, 0.0), 500.0);
        assert_eq!(c.observe(480.0, 33.0), 500.0);
        assert_eq!(c.observe(533.0, 66.0), 533.0);
        c.reset();
        assert_eq!(c.observe(10.0, 70.0), 10.0);
    }
}
