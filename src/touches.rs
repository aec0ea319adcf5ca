//! Bounded table of the touches a gesture currently tracks.

use heapless::Vec;

use crate::types::{TouchId, TouchPoint};

/// Upper bound on touches one gesture tracks at a time. Real input layers
/// report far fewer; anything past the bound is dropped.
pub(crate) const MAX_ACTIVE_TOUCHES: usize = 16;

/// Insertion-ordered snapshot table, looked up linearly by id.
#[derive(Clone, Debug, Default)]
pub struct ActiveTouches {
    entries: Vec<TouchPoint, MAX_ACTIVE_TOUCHES>,
}

impl ActiveTouches {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Tracks a snapshot, refreshing in place when the id is already known.
    /// Returns false when the table is full and the touch was dropped.
    pub(crate) fn insert(&mut self, point: TouchPoint) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == point.id) {
            *entry = point;
            return true;
        }
        self.entries.push(point).is_ok()
    }

    /// Refreshes a tracked snapshot. Unknown ids are ignored.
    pub(crate) fn update(&mut self, point: TouchPoint) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == point.id) {
            Some(entry) => {
                *entry = point;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, id: TouchId) -> Option<TouchPoint> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: TouchId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn get(&self, id: TouchId) -> Option<&TouchPoint> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Tracked snapshots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TouchPoint> {
        self.entries.iter()
    }
}
