//! Shared touch and gesture vocabulary.

/// Identifier assigned by the input layer. Unique among currently active
/// touches; nothing beyond that is assumed about reuse.
pub type TouchId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenPosition {
    pub x: f32,
    pub y: f32,
}

impl ScreenPosition {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Snapshot of one active contact as reported for the current frame.
/// `previous_position` is where the same contact was on the prior frame;
/// a freshly added touch carries its landing position in both fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: TouchId,
    pub position: ScreenPosition,
    pub previous_position: ScreenPosition,
}

impl TouchPoint {
    pub fn new(id: TouchId, position: ScreenPosition) -> Self {
        Self {
            id,
            position,
            previous_position: position,
        }
    }

    /// Next-frame snapshot of this contact at `position`.
    pub fn moved_to(self, position: ScreenPosition) -> Self {
        Self {
            id: self.id,
            position,
            previous_position: self.position,
        }
    }
}

/// One frame of input from the host: four disjoint batches, processed in
/// declaration order. Batches a frame does not need stay empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct TouchFrame<'a> {
    pub added: &'a [TouchPoint],
    pub moved: &'a [TouchPoint],
    pub ended: &'a [TouchPoint],
    pub cancelled: &'a [TouchPoint],
}

/// Recognizer lifecycle. One gesture instance owns one state value, and the
/// value only changes through the gesture's own transition handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureState {
    #[default]
    Possible,
    Began,
    Changed,
    Recognized,
    Ended,
    Cancelled,
    Failed,
}

impl GestureState {
    /// Terminal states hold until an external reset.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Recognized | Self::Ended | Self::Cancelled | Self::Failed
        )
    }
}

fn squared_distance(a: ScreenPosition, b: ScreenPosition) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

pub(crate) fn distance(a: ScreenPosition, b: ScreenPosition) -> f32 {
    squared_distance(a, b).sqrt()
}

pub(crate) fn midpoint(a: ScreenPosition, b: ScreenPosition) -> ScreenPosition {
    ScreenPosition::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}
