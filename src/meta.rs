//! Passthrough gesture that reports every relevant touch to listeners
//! without claiming any metric of its own.

use crate::config::MetaConfig;
use crate::dispatch::Dispatcher;
use crate::lifecycle::{Lifecycle, LifecycleEvent, LifecycleNotice, NoticeContext};
use crate::touches::{ActiveTouches, MAX_ACTIVE_TOUCHES};
use crate::types::{GestureState, TouchFrame, TouchPoint};

pub const TOUCH_BEGAN_MESSAGE: &str = "touch_began";
pub const TOUCH_MOVED_MESSAGE: &str = "touch_moved";
pub const TOUCH_ENDED_MESSAGE: &str = "touch_ended";
pub const TOUCH_CANCELLED_MESSAGE: &str = "touch_cancelled";

// Worst frame enters Began, Changed and one terminal state.
const MAX_META_TRANSITIONS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchNoticeKind {
    Began,
    Moved,
    Ended,
    Cancelled,
}

/// One touch event re-broadcast to this gesture's listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchNotice {
    pub kind: TouchNoticeKind,
    pub touch: TouchPoint,
}

/// Per-frame output of [`MetaGesture::update`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MetaOutput {
    /// State after the frame.
    pub state: GestureState,
    pub transitions: [Option<GestureState>; MAX_META_TRANSITIONS],
}

impl MetaOutput {
    pub fn iter(&self) -> impl Iterator<Item = GestureState> + '_ {
        self.transitions.iter().flatten().copied()
    }

    fn push(&mut self, state: GestureState) {
        for slot in &mut self.transitions {
            if slot.is_none() {
                *slot = Some(state);
                return;
            }
        }
    }
}

/// Decides which touches this gesture tracks. Touches rejected at arrival
/// are never tracked, even if the filter later changes.
pub type TouchFilter = Box<dyn FnMut(&TouchPoint) -> bool>;

/// Frame-driven touch monitor. Begins on the first relevant touch, changes
/// while any moves, ends when the last lifts, and re-broadcasts each touch
/// event to its listeners along the way.
pub struct MetaGesture {
    filter: Option<TouchFilter>,
    active: ActiveTouches,
    lifecycle: Lifecycle,
    state: GestureState,
    notices: Dispatcher<TouchNotice>,
}

impl Default for MetaGesture {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaGesture {
    pub fn new() -> Self {
        Self::with_config(MetaConfig::default())
    }

    pub fn with_config(config: MetaConfig) -> Self {
        Self {
            filter: None,
            active: ActiveTouches::new(),
            lifecycle: Lifecycle::new(config.cancel_policy, config.completion),
            state: GestureState::Possible,
            notices: Dispatcher::new(),
        }
    }

    /// Ingests one frame: batches apply in declaration order and each
    /// tracked touch is re-broadcast with the matching message name.
    pub fn update(&mut self, frame: &TouchFrame) -> MetaOutput {
        let mut context = NoticeContext::default();

        let mut batch: heapless::Vec<TouchPoint, MAX_ACTIVE_TOUCHES> = heapless::Vec::new();
        for &point in frame.added {
            if self.is_relevant(&point) && self.active.insert(point) {
                let _ = batch.push(point);
            }
        }
        if !batch.is_empty() {
            let enough = !self.active.is_empty();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesAdded { enough }, &mut context);
            self.broadcast(TOUCH_BEGAN_MESSAGE, TouchNoticeKind::Began, &batch);
        }

        let mut batch: heapless::Vec<TouchPoint, MAX_ACTIVE_TOUCHES> = heapless::Vec::new();
        for &point in frame.moved {
            if self.active.update(point) {
                let _ = batch.push(point);
            }
        }
        if !batch.is_empty() {
            let enough = !self.active.is_empty();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesMoved { enough }, &mut context);
            self.broadcast(TOUCH_MOVED_MESSAGE, TouchNoticeKind::Moved, &batch);
        }

        let mut batch: heapless::Vec<TouchPoint, MAX_ACTIVE_TOUCHES> = heapless::Vec::new();
        for &point in frame.ended {
            if self.active.remove(point.id).is_some() {
                let _ = batch.push(point);
            }
        }
        if !batch.is_empty() {
            let remaining = self.active.len();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesEnded { remaining }, &mut context);
            self.broadcast(TOUCH_ENDED_MESSAGE, TouchNoticeKind::Ended, &batch);
        }

        let mut batch: heapless::Vec<TouchPoint, MAX_ACTIVE_TOUCHES> = heapless::Vec::new();
        for &point in frame.cancelled {
            if self.active.remove(point.id).is_some() {
                let _ = batch.push(point);
            }
        }
        if !batch.is_empty() {
            let remaining = self.active.len();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesCancelled { remaining }, &mut context);
            self.broadcast(TOUCH_CANCELLED_MESSAGE, TouchNoticeKind::Cancelled, &batch);
        }

        let mut output = MetaOutput::default();
        for notice in context.iter() {
            if let LifecycleNotice::Entered(state) = notice {
                self.state = state;
                output.push(state);
            }
        }
        output.state = self.state;
        output
    }

    /// Returns the gesture to Possible and forgets every tracked touch.
    /// Emits no touch notices.
    pub fn reset(&mut self) {
        self.active.clear();
        let mut context = NoticeContext::default();
        self.lifecycle.handle(&LifecycleEvent::Reset, &mut context);
        for notice in context.iter() {
            if let LifecycleNotice::Entered(state) = notice {
                self.state = state;
            }
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Touches currently tracked, in arrival order.
    pub fn active_touches(&self) -> &ActiveTouches {
        &self.active
    }

    /// Restricts tracking to touches the predicate accepts.
    pub fn set_filter(&mut self, filter: impl FnMut(&TouchPoint) -> bool + 'static) {
        self.filter = Some(Box::new(filter));
    }

    /// Accepts every touch again. Touches already rejected stay untracked.
    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Listener and message-target registration for this gesture's notices.
    pub fn notices_mut(&mut self) -> &mut Dispatcher<TouchNotice> {
        &mut self.notices
    }

    fn is_relevant(&mut self, point: &TouchPoint) -> bool {
        match self.filter.as_mut() {
            Some(filter) => filter(point),
            None => true,
        }
    }

    fn broadcast(&mut self, message: &'static str, kind: TouchNoticeKind, batch: &[TouchPoint]) {
        for &touch in batch {
            self.notices.notify(message, &TouchNotice { kind, touch });
        }
    }
}
