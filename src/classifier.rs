use crate::config::PinchCfg;
use crate::landmarks::LandmarkFrame;

/// Per-frame pinch classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureSymbol {
    #[default]
    None,
    /// Thumb + index.
    Primary,
    /// Thumb + middle.
    Secondary,
}

impl GestureSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::None
    }
}

#[derive(Debug, Clone)]
pub struct GestureClassifier {
    cfg: PinchCfg,
}

impl GestureClassifier {
    pub fn new(cfg: PinchCfg) -> Self {
        Self { cfg }
    }

    pub fn classify(&self, frame: &LandmarkFrame) -> GestureSymbol {
        let thumb = frame.thumb_tip();
        let d_index = thumb.distance(frame.index_tip());
        let d_middle = thumb.distance(frame.middle_tip());
        self.classify_distances(d_index, d_middle)
    }

    /// Decision over the two thumb distances. A pinch counts only while the
    /// other finger is clear; two simultaneous pinches resolve to the closer
    /// one unless they are within `ambiguity_epsilon`.
    pub fn classify_distances(&self, d_index: f32, d_middle: f32) -> GestureSymbol {
        let c = &self.cfg;
        let index_pinch = d_index < c.pinch_threshold;
        let middle_pinch = d_middle < c.pinch_threshold;

        if index_pinch && !middle_pinch && d_middle > c.exclusion_threshold {
            GestureSymbol::Primary
        } else if middle_pinch && !index_pinch && d_index > c.exclusion_threshold {
            GestureSymbol::Secondary
        } else if index_pinch && middle_pinch {
            if (d_index - d_middle).abs() > c.ambiguity_epsilon {
                if d_index < d_middle {
                    GestureSymbol::Primary
                } else {
                    GestureSymbol::Secondary
                }
            } else {
                GestureSymbol::None
            }
        } else {
            GestureSymbol::None
        }
    }
}
