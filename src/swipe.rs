//! Horizontal swipe detection over free (un-pinched) pointer motion.

use std::collections::VecDeque;

use log::debug;

use crate::config::SwipeCfg;
use crate::events::SwipeDirection;
use crate::smoother::PointerPosition;

#[derive(Debug, Clone, Copy)]
struct SwipeSample {
    x: f32,
    y: f32,
    t_ms: f64,
}

#[derive(Debug)]
pub struct SwipeDetector {
    cfg: SwipeCfg,
    enabled: bool,
    window: VecDeque<SwipeSample>,
    last_fired_ms: Option<f64>,
}

impl SwipeDetector {
    pub fn new(cfg: SwipeCfg) -> Self {
        Self {
            cfg,
            enabled: cfg.enabled,
            window: VecDeque::new(),
            last_fired_ms: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, en: bool) {
        self.enabled = en;
        if !en {
            self.window.clear();
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn on_frame(
        &mut self,
        pos: PointerPosition,
        engaged: bool,
        t_ms: f64,
    ) -> Option<SwipeDirection> {
        if !self.enabled || engaged {
            self.window.clear();
            return None;
        }

        self.window.push_back(SwipeSample {
            x: pos.x,
            y: pos.y,
            t_ms,
        });
        let horizon = self.cfg.window_ms as f64;
        while self
            .window
            .front()
            .is_some_and(|s| t_ms - s.t_ms > horizon)
        {
            self.window.pop_front();
        }

        if self.window.len() < self.cfg.min_samples {
            return None;
        }
        if let Some(last) = self.last_fired_ms {
            if t_ms - last < self.cfg.cooldown_ms as f64 {
                return None;
            }
        }

        let (first, last) = match (self.window.front(), self.window.back()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return None,
        };
        let dx = last.x - first.x;
        let dy = last.y - first.y;
        let dt = last.t_ms - first.t_ms;

        if dx.abs() > self.cfg.threshold_px
            && dy.abs() < self.cfg.max_vertical_px
            && dt <= horizon
        {
            let dir = if dx > 0.0 {
                SwipeDirection::Right
            } else {
                SwipeDirection::Left
            };
            debug!("swipe {} dx={dx:.0}px dy={dy:.0}px in {dt:.0}ms", dir.as_str());
            self.window.clear();
            self.last_fired_ms = Some(t_ms);
            return Some(dir);
        }
        None
    }

    /// Drops pending samples; motion across a gap never forms a swipe.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.last_fired_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> SwipeDetector {
        SwipeDetector::new(SwipeCfg {
            enabled: true,
            ..SwipeCfg::default()
        })
    }

    fn at(x: f32, y: f32) -> PointerPosition {
        PointerPosition { x, y }
    }

    /// Normalized x from `from` to `to` over `ms`, mapped onto a 1000 px wide screen.
    fn sweep(d: &mut SwipeDetector, from: f32, to: f32, ms: f64, t0: f64) -> Vec<SwipeDirection> {
        let frames = 7;
        (0..frames)
            .filter_map(|i| {
                let k = i as f32 / (frames - 1) as f32;
                let x = (from + (to - from) * k) * 1000.0;
                let t = t0 + ms * i as f64 / (frames - 1) as f64;
                d.on_frame(at(x, 300.0), false, t)
            })
            .collect()
    }

    #[test]
    fn rightward_sweep_fires_once() {
        let mut d = enabled();
        assert_eq!(sweep(&mut d, 0.10, 0.40, 200.0, 0.0), vec![SwipeDirection::Right]);
        assert_eq!(d.window_len(), 0);
    }

    #[test]
    fn leftward_sweep_fires_left() {
        let mut d = enabled();
        assert_eq!(sweep(&mut d, 0.60, 0.30, 200.0, 0.0), vec![SwipeDirection::Left]);
    }

    #[test]
    fn disabled_by_default() {
        let mut d = SwipeDetector::new(SwipeCfg::default());
        assert!(sweep(&mut d, 0.10, 0.40, 200.0, 0.0).is_empty());
        assert_eq!(d.window_len(), 0);
    }

    #[test]
    fn slow_motion_does_not_fire() {
        let mut d = enabled();
        assert!(sweep(&mut d, 0.10, 0.40, 1200.0, 0.0).is_empty());
    }

    #[test]
    fn diagonal_motion_does_not_fire() {
        let mut d = enabled();
        let out: Vec<_> = (0..7)
            .filter_map(|i| d.on_frame(at(i as f32 * 50.0, i as f32 * 30.0), false, i as f64 * 33.0))
            .collect();
        assert!(out.is_empty());
    }

    #[test]
    fn cooldown_suppresses_immediate_second_swipe() {
        let mut d = enabled();
        assert_eq!(sweep(&mut d, 0.10, 0.40, 200.0, 0.0).len(), 1);
        assert!(sweep(&mut d, 0.40, 0.10, 200.0, 220.0).is_empty());
        assert_eq!(
            sweep(&mut d, 0.40, 0.10, 200.0, 1000.0),
            vec![SwipeDirection::Left]
        );
    }

    #[test]
    fn engagement_clears_window() {
        let mut d = enabled();
        for i in 0..4 {
            d.on_frame(at(100.0 + i as f32 * 50.0, 300.0), false, i as f64 * 33.0);
        }
        assert_eq!(d.window_len(), 4);
        assert_eq!(d.on_frame(at(300.0, 300.0), true, 132.0), None);
        assert_eq!(d.window_len(), 0);
        // post-engagement samples alone are too few and too short to fire
        let out: Vec<_> = (5..9)
            .filter_map(|i| d.on_frame(at(100.0 + i as f32 * 50.0, 300.0), false, i as f64 * 33.0))
            .collect();
        assert!(out.is_empty());
    }

    #[test]
    fn disabling_clears_window() {
        let mut d = enabled();
        d.on_frame(at(0.0, 0.0), false, 0.0);
        d.on_frame(at(10.0, 0.0), false, 33.0);
        d.set_enabled(false);
        assert_eq!(d.window_len(), 0);
    }
}
