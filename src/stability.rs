//! Hysteresis over raw gesture symbols: slow to engage, fast to release.

use std::collections::VecDeque;

use crate::classifier::GestureSymbol;
use crate::config::StabilityCfg;

#[derive(Debug)]
pub struct StabilityFilter {
    cfg: StabilityCfg,
    history: VecDeque<GestureSymbol>,
    last_stable: GestureSymbol,
}

impl StabilityFilter {
    pub fn new(cfg: StabilityCfg) -> Self {
        Self {
            cfg,
            history: VecDeque::with_capacity(cfg.engage_frames),
            last_stable: GestureSymbol::None,
        }
    }

    pub fn stabilize(&mut self, raw: GestureSymbol) -> GestureSymbol {
        self.history.push_back(raw);
        while self.history.len() > self.cfg.engage_frames {
            self.history.pop_front();
        }

        if !raw.is_none()
            && self.history.len() >= self.cfg.engage_frames
            && self.history.iter().all(|g| *g == raw)
        {
            self.last_stable = raw;
        }

        if raw.is_none() && !self.last_stable.is_none() {
            let n = self.cfg.release_frames;
            let recent_none = self.history.len() >= n
                && self.history.iter().rev().take(n).all(GestureSymbol::is_none);
            if recent_none {
                self.last_stable = GestureSymbol::None;
            }
        }

        self.last_stable
    }

    pub fn current(&self) -> GestureSymbol {
        self.last_stable
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_stable = GestureSymbol::None;
    }
}
