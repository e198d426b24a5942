//! Events handed to the output sink.

use anyhow::Result;
use serde::Serialize;

/// What the pointer is doing, for visual feedback on moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    Idle,
    Primary,
    Secondary,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PointerEvent {
    PointerMove { x: f32, y: f32, state: Engagement },
    PointerDown { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    Click { x: f32, y: f32 },
    DoubleClick { x: f32, y: f32 },
    SecondaryClick { x: f32, y: f32 },
    DragBegin { x: f32, y: f32 },
    /// Vertical scroll in pixels, already scaled by the scroll speed.
    Scroll { delta_y: f32 },
    DragEnd { x: f32, y: f32 },
    Swipe { direction: SwipeDirection },
}

impl PointerEvent {
    pub fn is_move(&self) -> bool {
        matches!(self, Self::PointerMove { .. })
    }
}

/// Receives the events of each tick in order.
pub trait EventSink {
    fn emit(&mut self, ev: &PointerEvent) -> Result<()>;
}

impl EventSink for Vec<PointerEvent> {
    fn emit(&mut self, ev: &PointerEvent) -> Result<()> {
        self.push(*ev);
        Ok(())
    }
}

/// Writes one JSON object per event.
pub struct JsonLinesSink<W: std::io::Write> {
    out: W,
}

impl<W: std::io::Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: std::io::Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, ev: &PointerEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, ev)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}
