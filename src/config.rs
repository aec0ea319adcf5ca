//! Tunables for the shipped gestures.

/// Default centroid separation below which two clusters read as one noisy
/// contact, in pixels. Roughly half a centimeter on a 163 dpi panel.
pub const DEFAULT_MIN_POINTS_DISTANCE_PX: f32 = 32.0;

/// One finger per cluster by default: the plain two-finger pinch.
pub const DEFAULT_MAX_POINTS_PER_CLUSTER: usize = 1;

const CENTIMETERS_PER_INCH: f32 = 2.54;

/// How touch cancellation resolves once a gesture has begun.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Cancellation routes through the Ended terminal, indistinguishable
    /// from a natural end.
    #[default]
    EndGesture,
    /// Cancellation routes to the distinct Cancelled terminal.
    CancelGesture,
}

/// How a gesture completes once its input sufficiency has been met.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureCompletion {
    /// Began/Changed/Ended flow driven by continued movement.
    #[default]
    Continuous,
    /// Holds Possible until release, then recognizes only if sufficiency
    /// was seen during the session.
    Discrete,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleConfig {
    /// Minimum inter-centroid separation for recognition, in pixels.
    pub min_points_distance: f32,
    /// Members a cluster accepts before a new contact opens the second
    /// cluster.
    pub max_points_per_cluster: usize,
    pub cancel_policy: CancelPolicy,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min_points_distance: DEFAULT_MIN_POINTS_DISTANCE_PX,
            max_points_per_cluster: DEFAULT_MAX_POINTS_PER_CLUSTER,
            cancel_policy: CancelPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetaConfig {
    pub cancel_policy: CancelPolicy,
    /// Discrete turns the monitor into a press-release notifier that
    /// resolves to Recognized instead of walking Began/Changed/Ended.
    pub completion: GestureCompletion,
}

/// Pixels per centimeter at a display density, for callers that configure
/// thresholds in device-independent units.
pub fn dots_per_centimeter(dots_per_inch: f32) -> f32 {
    dots_per_inch / CENTIMETERS_PER_INCH
}
