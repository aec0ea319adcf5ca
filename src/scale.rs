//! Two-finger pinch gesture: clusters per frame, distance-ratio metric.

use log::trace;

use crate::cluster::Clusters;
use crate::config::{GestureCompletion, ScaleConfig};
use crate::dispatch::Dispatcher;
use crate::lifecycle::{
    Lifecycle, LifecycleEvent, LifecycleNotice, NoticeContext, MAX_NOTICES_PER_FRAME,
};
use crate::touches::ActiveTouches;
use crate::types::{distance, midpoint, GestureState, ScreenPosition, TouchFrame, TouchPoint};

/// Message name forwarded with every state notice.
pub const SCALE_STATE_MESSAGE: &str = "scale_state";
/// Message name forwarded with every delta notice.
pub const SCALE_CHANGED_MESSAGE: &str = "scale_changed";

/// One externally visible emission from a scale gesture frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleNotice {
    StateChanged(GestureState),
    /// Multiplicative scale step for this frame, ready to apply to a
    /// transform.
    ScaleChanged { delta: f32 },
}

/// Per-frame output of [`ScaleGesture::update`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ScaleOutput {
    /// State after the frame.
    pub state: GestureState,
    pub notices: [Option<ScaleNotice>; MAX_NOTICES_PER_FRAME],
}

impl ScaleOutput {
    pub fn iter(&self) -> impl Iterator<Item = ScaleNotice> + '_ {
        self.notices.iter().flatten().copied()
    }

    /// Delta scale emitted this frame, when the gesture changed.
    pub fn delta_scale(&self) -> Option<f32> {
        self.iter().find_map(|notice| match notice {
            ScaleNotice::ScaleChanged { delta } => Some(delta),
            _ => None,
        })
    }

    fn push(&mut self, notice: ScaleNotice) {
        for slot in &mut self.notices {
            if slot.is_none() {
                *slot = Some(notice);
                return;
            }
        }
    }
}

/// Frame-driven pinch recognizer. The host feeds one [`TouchFrame`] per
/// tick and applies the returned delta to its transform.
pub struct ScaleGesture {
    active: ActiveTouches,
    clusters: Clusters,
    lifecycle: Lifecycle,
    state: GestureState,
    // Measured during the moved batch, while both clusters still stand.
    frame_delta: Option<f32>,
    notices: Dispatcher<ScaleNotice>,
}

impl Default for ScaleGesture {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaleGesture {
    pub fn new() -> Self {
        Self::with_config(ScaleConfig::default())
    }

    pub fn with_config(config: ScaleConfig) -> Self {
        Self {
            active: ActiveTouches::new(),
            clusters: Clusters::new(config.min_points_distance, config.max_points_per_cluster),
            lifecycle: Lifecycle::new(config.cancel_policy, GestureCompletion::Continuous),
            state: GestureState::Possible,
            frame_delta: None,
            notices: Dispatcher::new(),
        }
    }

    /// Ingests one frame: batches apply in declaration order, the clusters
    /// and the state machine advance, and the frame's delta is measured
    /// while the moved batch applies, before a same-frame release can
    /// disturb the clusters. Every touch is relevant to this gesture.
    pub fn update(&mut self, frame: &TouchFrame) -> ScaleOutput {
        let mut context = NoticeContext::default();
        self.frame_delta = None;

        if !frame.added.is_empty() {
            for &point in frame.added {
                self.active.insert(point);
            }
            self.clusters.add_points(frame.added);
            let enough = self.clusters.has_clusters();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesAdded { enough }, &mut context);
        }

        if !frame.moved.is_empty() {
            for &point in frame.moved {
                self.active.update(point);
            }
            self.clusters.update_points(frame.moved);
            self.clusters.invalidate();
            let enough = self.clusters.has_clusters();
            if enough {
                self.frame_delta = Some(scale_delta(&mut self.clusters));
            }
            self.lifecycle
                .handle(&LifecycleEvent::TouchesMoved { enough }, &mut context);
        }

        if !frame.ended.is_empty() {
            self.release_points(frame.ended);
            let remaining = self.active.len();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesEnded { remaining }, &mut context);
        }

        if !frame.cancelled.is_empty() {
            self.release_points(frame.cancelled);
            let remaining = self.active.len();
            self.lifecycle
                .handle(&LifecycleEvent::TouchesCancelled { remaining }, &mut context);
        }

        self.collect(&context)
    }

    /// Returns the gesture to Possible and forgets every tracked touch and
    /// cluster. Safe from any state, including mid-gesture.
    pub fn reset(&mut self) {
        self.active.clear();
        self.clusters.remove_all_points();
        self.frame_delta = None;
        let mut context = NoticeContext::default();
        self.lifecycle.handle(&LifecycleEvent::Reset, &mut context);
        let _ = self.collect(&context);
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Midpoint of the two cluster centroids while both are held.
    pub fn screen_position(&mut self) -> Option<ScreenPosition> {
        if !self.clusters.has_clusters() {
            return None;
        }
        Some(midpoint(
            self.clusters.center_position(0),
            self.clusters.center_position(1),
        ))
    }

    /// Prior-frame midpoint of the two cluster centroids.
    pub fn previous_screen_position(&mut self) -> Option<ScreenPosition> {
        if !self.clusters.has_clusters() {
            return None;
        }
        Some(midpoint(
            self.clusters.previous_center_position(0),
            self.clusters.previous_center_position(1),
        ))
    }

    /// Touches currently tracked, in arrival order.
    pub fn active_touches(&self) -> &ActiveTouches {
        &self.active
    }

    pub fn has_clusters(&mut self) -> bool {
        self.clusters.has_clusters()
    }

    pub fn min_points_distance(&self) -> f32 {
        self.clusters.min_points_distance()
    }

    pub fn set_min_points_distance(&mut self, pixels: f32) {
        self.clusters.set_min_points_distance(pixels);
    }

    /// Listener and message-target registration for this gesture's notices.
    pub fn notices_mut(&mut self) -> &mut Dispatcher<ScaleNotice> {
        &mut self.notices
    }

    fn release_points(&mut self, points: &[TouchPoint]) {
        for point in points {
            self.active.remove(point.id);
        }
        self.clusters.remove_points(points);
    }

    fn collect(&mut self, context: &NoticeContext) -> ScaleOutput {
        let mut output = ScaleOutput::default();
        for notice in context.iter() {
            match notice {
                LifecycleNotice::Entered(state) => {
                    self.state = state;
                    self.emit(&mut output, ScaleNotice::StateChanged(state));
                    if state == GestureState::Changed {
                        self.emit_delta(&mut output);
                    }
                }
                LifecycleNotice::Updated => self.emit_delta(&mut output),
            }
        }
        output.state = self.state;
        output
    }

    fn emit_delta(&mut self, output: &mut ScaleOutput) {
        if let Some(delta) = self.frame_delta {
            self.emit(output, ScaleNotice::ScaleChanged { delta });
        }
    }

    fn emit(&mut self, output: &mut ScaleOutput, notice: ScaleNotice) {
        output.push(notice);
        let message = match notice {
            ScaleNotice::StateChanged(_) => SCALE_STATE_MESSAGE,
            ScaleNotice::ScaleChanged { .. } => SCALE_CHANGED_MESSAGE,
        };
        self.notices.notify(message, &notice);
    }
}

/// Ratio of current to previous inter-centroid distance. Identity when the
/// previous separation is zero, so the first qualifying frame never divides
/// by zero.
pub fn scale_delta(clusters: &mut Clusters) -> f32 {
    let current = distance(clusters.center_position(1), clusters.center_position(0));
    let previous = distance(
        clusters.previous_center_position(1),
        clusters.previous_center_position(0),
    );
    if previous == 0.0 {
        return 1.0;
    }
    let delta = current / previous;
    trace!("scale delta {delta} ({current}/{previous})");
    delta
}
