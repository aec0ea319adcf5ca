//! Frame-driven multi-touch gesture recognition.
//!
//! A host (a game loop, a UI tick, a replay harness) feeds one
//! [`TouchFrame`] per tick with the touches that were added, moved, ended
//! and cancelled since the previous tick. Gestures group touches into
//! screen-space [`cluster::Clusters`], walk the shared lifecycle
//! (Possible, Began, Changed, a terminal state) and report what happened
//! through their per-frame output and through registered listeners.
//!
//! Two gestures are provided: [`ScaleGesture`] recognizes a two-handed
//! pinch and emits a multiplicative per-frame scale delta, and
//! [`MetaGesture`] passes every tracked touch event through to its
//! listeners without claiming a metric of its own.

pub mod cluster;
pub mod config;
pub mod dispatch;
mod lifecycle;
pub mod meta;
pub mod scale;
pub mod touches;
pub mod types;

pub use cluster::Clusters;
pub use config::{dots_per_centimeter, CancelPolicy, GestureCompletion, MetaConfig, ScaleConfig};
pub use dispatch::{Dispatcher, ListenerId, MessageTarget};
pub use meta::{
    MetaGesture, MetaOutput, TouchNotice, TouchNoticeKind, TOUCH_BEGAN_MESSAGE,
    TOUCH_CANCELLED_MESSAGE, TOUCH_ENDED_MESSAGE, TOUCH_MOVED_MESSAGE,
};
pub use scale::{
    scale_delta, ScaleGesture, ScaleNotice, ScaleOutput, SCALE_CHANGED_MESSAGE,
    SCALE_STATE_MESSAGE,
};
pub use touches::ActiveTouches;
pub use types::{GestureState, ScreenPosition, TouchFrame, TouchId, TouchPoint};
