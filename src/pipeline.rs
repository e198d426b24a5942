//! One tick per landmark frame: classify, stabilize, smooth, interpret,
//! detect swipes, then flush to the sink.

use log::{debug, error, info};
use serde::Serialize;

use crate::classifier::{GestureClassifier, GestureSymbol};
use crate::config::Profile;
use crate::events::{Engagement, EventSink, PointerEvent};
use crate::hover::{HoverEvent, HoverTracker};
use crate::interaction::InteractionStateMachine;
use crate::landmarks::LandmarkFrame;
use crate::smoother::{PointerPosition, Smoother};
use crate::stability::StabilityFilter;
use crate::swipe::SwipeDetector;

#[derive(Debug, Default)]
pub struct TickOutput {
    pub raw: GestureSymbol,
    pub stable: GestureSymbol,
    pub events: Vec<PointerEvent>,
    pub hover: Vec<HoverEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub active: bool,
    pub engagement: Engagement,
    pub gesture: &'static str,
    pub swipe_enabled: bool,
    pub ticks: u64,
    pub pointer: (f32, f32),
}

#[derive(Debug)]
pub struct Pipeline {
    classifier: GestureClassifier,
    stability: StabilityFilter,
    smoother: Smoother,
    interaction: InteractionStateMachine,
    swipe: SwipeDetector,
    hover: Option<HoverTracker>,
    active: bool,
    ticks: u64,
}

impl Pipeline {
    pub fn new(profile: &Profile) -> Self {
        Self {
            classifier: GestureClassifier::new(profile.pinch),
            stability: StabilityFilter::new(profile.stability),
            smoother: Smoother::new(profile.pointer, profile.screen),
            interaction: InteractionStateMachine::new(profile.interaction),
            swipe: SwipeDetector::new(profile.swipe),
            hover: None,
            active: true,
            ticks: 0,
        }
    }

    pub fn with_hover(mut self, hover: HoverTracker) -> Self {
        self.hover = Some(hover);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        if !self.active {
            info!("session started");
        }
        self.active = true;
    }

    /// Ends the session: every buffer is cleared before this returns, and
    /// ticks are ignored until `start`.
    pub fn stop(&mut self) {
        self.reset();
        if self.active {
            info!("session stopped");
        }
        self.active = false;
    }

    pub fn reset(&mut self) {
        self.interaction.reset();
        self.stability.reset();
        self.swipe.reset();
        self.smoother.reset();
        if let Some(h) = self.hover.as_mut() {
            h.reset();
        }
    }

    pub fn set_swipe_enabled(&mut self, en: bool) {
        self.swipe.set_enabled(en);
    }

    pub fn interaction(&self) -> &InteractionStateMachine {
        &self.interaction
    }

    pub fn stability(&self) -> &StabilityFilter {
        &self.stability
    }

    pub fn swipe(&self) -> &SwipeDetector {
        &self.swipe
    }

    pub fn status(&self) -> PipelineStatus {
        let p = self.smoother.position();
        PipelineStatus {
            active: self.active,
            engagement: self.interaction.engagement(),
            gesture: self.stability.current().as_str(),
            swipe_enabled: self.swipe.is_enabled(),
            ticks: self.ticks,
            pointer: (p.x, p.y),
        }
    }

    /// `frame` is `None` when no (valid) hand was seen this tick.
    pub fn tick(&mut self, frame: Option<&LandmarkFrame>, t_ms: f64) -> TickOutput {
        let mut out = TickOutput::default();
        if !self.active {
            return out;
        }
        self.ticks += 1;

        out.raw = frame.map_or(GestureSymbol::None, |f| self.classifier.classify(f));
        out.stable = self.stability.stabilize(out.raw);
        let engaged = !out.stable.is_none();

        let pos: PointerPosition = match frame {
            Some(f) => {
                let tip = f.index_tip();
                self.smoother.update(tip.x, tip.y, engaged)
            }
            None => self.smoother.position(),
        };

        if frame.is_some() {
            if let Some(h) = self.hover.as_mut() {
                out.hover = h.update(pos);
            }
        }

        let mut interaction_events = Vec::new();
        self.interaction
            .on_frame(pos, out.stable, t_ms, &mut interaction_events);

        if frame.is_some() {
            out.events.push(PointerEvent::PointerMove {
                x: pos.x,
                y: pos.y,
                state: self.interaction.engagement(),
            });
        }
        out.events.extend(interaction_events);

        if frame.is_some() {
            let free = self.interaction.is_idle();
            if let Some(direction) = self.swipe.on_frame(pos, !free, t_ms) {
                out.events.push(PointerEvent::Swipe { direction });
            }
        } else {
            self.swipe.clear();
        }

        out
    }

    /// Runs a tick and hands its events to `sink`. Sink failures are logged;
    /// the pipeline state has already advanced and is never rolled back.
    pub fn tick_into(
        &mut self,
        frame: Option<&LandmarkFrame>,
        t_ms: f64,
        sink: &mut dyn EventSink,
    ) -> TickOutput {
        let out = self.tick(frame, t_ms);
        for ev in &out.events {
            if !ev.is_move() {
                debug!("event {ev:?}");
            }
            if let Err(e) = sink.emit(ev) {
                error!("sink failed on {ev:?}: {e}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{INDEX_TIP, LANDMARK_COUNT, MIDDLE_TIP, Point, THUMB_TIP};

    fn hand(t_ms: f64, index_x: f32, d_index: f32) -> LandmarkFrame {
        let mut pts = vec![Point::new(0.5, 0.5); LANDMARK_COUNT];
        pts[INDEX_TIP] = Point::new(index_x, 0.5);
        pts[THUMB_TIP] = Point::new(index_x + d_index, 0.5);
        pts[MIDDLE_TIP] = Point::new(index_x, 0.0);
        LandmarkFrame::new(t_ms, &pts).unwrap()
    }

    #[test]
    fn missing_frames_release_an_engagement() {
        let mut p = Pipeline::new(&Profile::default());
        for i in 0..4 {
            p.tick(Some(&hand(i as f64 * 33.0, 0.5, 0.02)), i as f64 * 33.0);
        }
        assert!(!p.interaction().is_idle());
        p.tick(None, 132.0);
        let out = p.tick(None, 165.0);
        assert!(p.interaction().is_idle());
        assert!(matches!(out.events[..], [PointerEvent::Click { .. }]));
    }

    #[test]
    fn move_is_first_event_of_a_tick() {
        let mut p = Pipeline::new(&Profile::default());
        let mut last = TickOutput::default();
        for i in 0..4 {
            last = p.tick(Some(&hand(i as f64 * 33.0, 0.5, 0.02)), i as f64 * 33.0);
        }
        assert!(matches!(
            last.events[..],
            [
                PointerEvent::PointerMove { state: Engagement::Primary, .. },
                PointerEvent::PointerDown { .. }
            ]
        ));
    }

    #[test]
    fn stopped_pipeline_ignores_frames() {
        let mut p = Pipeline::new(&Profile::default());
        p.stop();
        let out = p.tick(Some(&hand(0.0, 0.5, 0.02)), 0.0);
        assert!(out.events.is_empty());
        assert_eq!(p.status().ticks, 0);
        p.start();
        assert_eq!(p.tick(Some(&hand(33.0, 0.5, 0.3)), 33.0).events.len(), 1);
    }
}
