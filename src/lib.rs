//! Hand-landmark pinch gestures to pointer events.

pub mod actions;
pub mod classifier;
pub mod config;
pub mod events;
pub mod hover;
pub mod ingest;
pub mod interaction;
pub mod ipc;
pub mod landmarks;
pub mod pipeline;
pub mod smoother;
pub mod stability;
pub mod swipe;

pub use classifier::{GestureClassifier, GestureSymbol};
pub use config::Profile;
pub use events::{Engagement, EventSink, PointerEvent, SwipeDirection};
pub use landmarks::{LandmarkFrame, Point};
pub use pipeline::{Pipeline, TickOutput};
pub use smoother::PointerPosition;
