//! Optional hover bookkeeping: which element sits under the pointer.
//!
//! Runs every tick with the smoothed position, independent of the pinch
//! state. The hit test is supplied by whatever owns the UI surface.

use crate::smoother::PointerPosition;

pub type ElementId = u64;

pub trait HitTest: Send {
    fn element_at(&self, pos: PointerPosition) -> Option<ElementId>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoverEvent {
    Enter(ElementId),
    Leave(ElementId),
    Move(ElementId, PointerPosition),
}

/// Axis-aligned named rectangles, first match wins.
#[derive(Debug, Clone, Default)]
pub struct RectRegions {
    regions: Vec<(ElementId, [f32; 4])>,
}

impl RectRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rect` is `[x, y, width, height]` in pixels.
    pub fn with(mut self, id: ElementId, rect: [f32; 4]) -> Self {
        self.regions.push((id, rect));
        self
    }
}

impl HitTest for RectRegions {
    fn element_at(&self, pos: PointerPosition) -> Option<ElementId> {
        self.regions
            .iter()
            .find(|(_, [x, y, w, h])| {
                pos.x >= *x && pos.x < x + w && pos.y >= *y && pos.y < y + h
            })
            .map(|(id, _)| *id)
    }
}

pub struct HoverTracker {
    hit: Box<dyn HitTest>,
    last: Option<ElementId>,
}

impl HoverTracker {
    pub fn new(hit: Box<dyn HitTest>) -> Self {
        Self { hit, last: None }
    }

    pub fn update(&mut self, pos: PointerPosition) -> Vec<HoverEvent> {
        let mut out = Vec::new();
        let el = self.hit.element_at(pos);
        if el != self.last {
            if let Some(prev) = self.last {
                out.push(HoverEvent::Leave(prev));
            }
            if let Some(cur) = el {
                out.push(HoverEvent::Enter(cur));
            }
            self.last = el;
        }
        if let Some(cur) = el {
            out.push(HoverEvent::Move(cur, pos));
        }
        out
    }

    pub fn hovered(&self) -> Option<ElementId> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl std::fmt::Debug for HoverTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoverTracker")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> PointerPosition {
        PointerPosition { x, y }
    }

    #[test]
    fn enter_move_leave_sequence() {
        let regions = RectRegions::new()
            .with(1, [0.0, 0.0, 100.0, 100.0])
            .with(2, [100.0, 0.0, 100.0, 100.0]);
        let mut h = HoverTracker::new(Box::new(regions));

        assert_eq!(
            h.update(at(10.0, 10.0)),
            vec![HoverEvent::Enter(1), HoverEvent::Move(1, at(10.0, 10.0))]
        );
        assert_eq!(h.update(at(20.0, 10.0)), vec![HoverEvent::Move(1, at(20.0, 10.0))]);
        assert_eq!(
            h.update(at(150.0, 10.0)),
            vec![
                HoverEvent::Leave(1),
                HoverEvent::Enter(2),
                HoverEvent::Move(2, at(150.0, 10.0))
            ]
        );
        assert_eq!(h.update(at(500.0, 500.0)), vec![HoverEvent::Leave(2)]);
        assert!(h.update(at(600.0, 500.0)).is_empty());
    }

    #[test]
    fn reset_forgets_hovered_element() {
        let mut h = HoverTracker::new(Box::new(RectRegions::new().with(7, [0.0, 0.0, 10.0, 10.0])));
        h.update(at(1.0, 1.0));
        h.reset();
        assert_eq!(h.hovered(), None);
        assert_eq!(h.update(at(1.0, 1.0))[0], HoverEvent::Enter(7));
    }
}
