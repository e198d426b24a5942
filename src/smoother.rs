//! Exponential smoothing of the pointer fingertip into screen pixels.

use crate::config::{PointerCfg, Screen};

/// Smoothed cursor position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn distance(self, other: PointerPosition) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug)]
pub struct Smoother {
    cfg: PointerCfg,
    screen: Screen,
    // normalized, already mirrored
    state: Option<(f32, f32)>,
}

impl Smoother {
    pub fn new(cfg: PointerCfg, screen: Screen) -> Self {
        Self {
            cfg,
            screen,
            state: None,
        }
    }

    /// Feeds one raw normalized sample. The capture is mirrored for display,
    /// so x is flipped before filtering.
    pub fn update(&mut self, raw_x: f32, raw_y: f32, engaged: bool) -> PointerPosition {
        let mx = 1.0 - raw_x;
        let (sx, sy) = match self.state {
            None => (mx, raw_y),
            Some((sx, sy)) => {
                let alpha = if engaged {
                    self.cfg.alpha_engaged
                } else {
                    self.cfg.alpha_free
                };
                (sx + (mx - sx) * alpha, sy + (raw_y - sy) * alpha)
            }
        };
        self.state = Some((sx, sy));
        self.to_screen(sx, sy)
    }

    /// Last output without feeding a sample; origin before the first one.
    pub fn position(&self) -> PointerPosition {
        match self.state {
            Some((sx, sy)) => self.to_screen(sx, sy),
            None => PointerPosition::default(),
        }
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    fn to_screen(&self, nx: f32, ny: f32) -> PointerPosition {
        PointerPosition {
            x: nx * self.screen.width as f32,
            y: ny * self.screen.height as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother() -> Smoother {
        Smoother::new(
            PointerCfg::default(),
            Screen {
                width: 1000,
                height: 500,
            },
        )
    }

    #[test]
    fn first_sample_seeds_state_mirrored() {
        let mut s = smoother();
        let p = s.update(0.2, 0.4, false);
        assert!((p.x - 800.0).abs() < 1e-3);
        assert!((p.y - 200.0).abs() < 1e-3);
    }

    #[test]
    fn engaged_tracks_tighter_than_free() {
        let mut free = smoother();
        let mut held = smoother();
        free.update(0.5, 0.5, false);
        held.update(0.5, 0.5, true);
        let pf = free.update(0.4, 0.5, false);
        let ph = held.update(0.4, 0.5, true);
        // mirrored target is x = 600 px, start 500 px
        assert!((pf.x - 525.0).abs() < 1e-3);
        assert!((ph.x - 510.0).abs() < 1e-3);
    }

    #[test]
    fn reset_reseeds_on_next_sample() {
        let mut s = smoother();
        s.update(0.9, 0.9, false);
        s.reset();
        assert_eq!(s.position(), PointerPosition::default());
        let p = s.update(0.5, 0.5, false);
        assert!((p.x - 500.0).abs() < 1e-3);
    }
}
