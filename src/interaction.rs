//! Click / drag lifecycle driven by the stabilized gesture.

use log::debug;

use crate::classifier::GestureSymbol;
use crate::config::InteractionCfg;
use crate::events::{Engagement, PointerEvent};
use crate::smoother::PointerPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Engaged(GestureSymbol),
    Dragging,
}

/// Last primary release, kept to pair a second release into a double-click.
#[derive(Debug, Clone, Copy)]
struct ClickMemory {
    t_ms: f64,
    pos: PointerPosition,
}

#[derive(Debug)]
pub struct InteractionStateMachine {
    cfg: InteractionCfg,
    state: InteractionState,
    pinch_start: Option<PointerPosition>,
    scroll_anchor: Option<PointerPosition>,
    click_memory: Option<ClickMemory>,
}

impl InteractionStateMachine {
    pub fn new(cfg: InteractionCfg) -> Self {
        Self {
            cfg,
            state: InteractionState::Idle,
            pinch_start: None,
            scroll_anchor: None,
            click_memory: None,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn engagement(&self) -> Engagement {
        match self.state {
            InteractionState::Idle => Engagement::Idle,
            InteractionState::Engaged(GestureSymbol::Secondary) => Engagement::Secondary,
            InteractionState::Engaged(_) => Engagement::Primary,
            InteractionState::Dragging => Engagement::Dragging,
        }
    }

    pub fn has_click_memory(&self) -> bool {
        self.click_memory.is_some()
    }

    pub fn on_frame(
        &mut self,
        pos: PointerPosition,
        gesture: GestureSymbol,
        t_ms: f64,
        out: &mut Vec<PointerEvent>,
    ) {
        let PointerPosition { x, y } = pos;
        match (self.state, gesture) {
            (InteractionState::Idle, GestureSymbol::None) => {}

            (InteractionState::Idle, g) => {
                self.state = InteractionState::Engaged(g);
                self.pinch_start = Some(pos);
                self.scroll_anchor = Some(pos);
                out.push(PointerEvent::PointerDown { x, y });
            }

            (InteractionState::Engaged(sym), g) if !g.is_none() => {
                // only an index pinch may turn into a drag
                if sym == GestureSymbol::Primary && g == GestureSymbol::Primary {
                    let moved = self.pinch_start.map_or(0.0, |s| s.distance(pos));
                    if moved > self.cfg.drag_threshold_px {
                        self.state = InteractionState::Dragging;
                        self.scroll_anchor = Some(pos);
                        out.push(PointerEvent::DragBegin { x, y });
                    }
                }
            }

            (InteractionState::Dragging, g) if !g.is_none() => {
                let anchor = self.scroll_anchor.unwrap_or(pos);
                let delta_y = (anchor.y - y) * self.cfg.scroll_speed;
                out.push(PointerEvent::Scroll { delta_y });
                self.scroll_anchor = Some(pos);
            }

            (prev, _) => self.release(prev, pos, t_ms, out),
        }
    }

    fn release(
        &mut self,
        prev: InteractionState,
        pos: PointerPosition,
        t_ms: f64,
        out: &mut Vec<PointerEvent>,
    ) {
        let PointerPosition { x, y } = pos;
        self.state = InteractionState::Idle;
        self.pinch_start = None;
        self.scroll_anchor = None;

        match prev {
            InteractionState::Dragging => {
                out.push(PointerEvent::PointerUp { x, y });
                out.push(PointerEvent::DragEnd { x, y });
            }
            InteractionState::Engaged(GestureSymbol::Primary) => {
                let is_double = self.click_memory.is_some_and(|m| {
                    t_ms >= m.t_ms
                        && t_ms - m.t_ms < self.cfg.double_click_ms as f64
                        && m.pos.distance(pos) < self.cfg.double_click_px
                });
                if is_double {
                    debug!("primary release pairs with previous click at ({x:.0},{y:.0})");
                    self.click_memory = None;
                    out.push(PointerEvent::DoubleClick { x, y });
                } else {
                    self.click_memory = Some(ClickMemory { t_ms, pos });
                    out.push(PointerEvent::Click { x, y });
                }
            }
            InteractionState::Engaged(GestureSymbol::Secondary) => {
                out.push(PointerEvent::SecondaryClick { x, y });
            }
            InteractionState::Engaged(GestureSymbol::None) | InteractionState::Idle => {}
        }
    }

    /// Back to idle with nothing pending; emits no events.
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.pinch_start = None;
        self.scroll_anchor = None;
        self.click_memory = None;
    }
}
