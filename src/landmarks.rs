//! Landmark frames as delivered by the hand-pose producer.
//!
//! The producer streams one JSON object per line:
//! `{"t_ms": 1234.5, "landmarks": [[x, y], ...]}` with 21 normalized joints,
//! or `"landmarks": null` when no hand is visible. Points may also be
//! `[x, y, z]` or `{"x": .., "y": ..}`; depth is ignored.

use serde::Deserialize;
use thiserror::Error;

pub const LANDMARK_COUNT: usize = 21;

pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected 21 landmarks, got {0}")]
    LandmarkCount(usize),
    #[error("landmark {0} has non-finite coordinates")]
    NonFinite(usize),
}

/// One validated hand sample.
#[derive(Debug, Clone)]
pub struct LandmarkFrame {
    pub t_ms: f64,
    pub points: [Point; LANDMARK_COUNT],
}

impl LandmarkFrame {
    /// Builds a frame, rejecting degenerate geometry.
    pub fn new(t_ms: f64, points: &[Point]) -> Result<Self, FrameError> {
        if points.len() != LANDMARK_COUNT {
            return Err(FrameError::LandmarkCount(points.len()));
        }
        if let Some(i) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(FrameError::NonFinite(i));
        }
        let mut arr = [Point::default(); LANDMARK_COUNT];
        arr.copy_from_slice(points);
        Ok(Self { t_ms, points: arr })
    }

    pub fn thumb_tip(&self) -> Point {
        self.points[THUMB_TIP]
    }

    pub fn index_tip(&self) -> Point {
        self.points[INDEX_TIP]
    }

    pub fn middle_tip(&self) -> Point {
        self.points[MIDDLE_TIP]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WirePoint {
    Pair([f32; 2]),
    Triple([f32; 3]),
    Object { x: f32, y: f32 },
}

impl From<WirePoint> for Point {
    fn from(w: WirePoint) -> Self {
        match w {
            WirePoint::Pair([x, y]) | WirePoint::Triple([x, y, _]) => Point { x, y },
            WirePoint::Object { x, y } => Point { x, y },
        }
    }
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(default)]
    t_ms: Option<f64>,
    #[serde(default)]
    landmarks: Option<Vec<WirePoint>>,
}

/// A decoded producer line. `frame` is `None` when no hand was seen.
#[derive(Debug, Clone)]
pub struct Sample {
    pub t_ms: f64,
    pub frame: Option<LandmarkFrame>,
}

/// Decodes one NDJSON line; `now_ms` stamps lines that carry no timestamp.
pub fn decode_line(line: &str, now_ms: f64) -> Result<Sample, FrameError> {
    let wire: WireFrame = serde_json::from_str(line)?;
    let t_ms = wire.t_ms.filter(|t| t.is_finite()).unwrap_or(now_ms);
    let frame = match wire.landmarks {
        Some(pts) => {
            let pts: Vec<Point> = pts.into_iter().map(Point::from).collect();
            Some(LandmarkFrame::new(t_ms, &pts)?)
        }
        None => None,
    };
    Ok(Sample { t_ms, frame })
}
