use tracing::{debug, warn};

use crate::domain::Status;

/// Tracks the newest status id seen so that the next poll only asks for
/// newer items (`since_id`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorTracker {
    cursor: Option<u64>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(id: u64) -> Self {
        Self { cursor: Some(id) }
    }

    /// `None` while unset; callers omit `since_id` in that case.
    pub fn since_id(&self) -> Option<u64> {
        self.cursor
    }

    pub fn is_set(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Apply a newest-first batch. Empty batches leave the cursor alone; an
    /// id that cannot be read as a number resets it rather than keeping a
    /// stale value.
    pub fn update(&mut self, batch: &[Status]) {
        let Some(newest) = batch.first() else {
            return;
        };

        match newest.numeric_id() {
            Some(id) => {
                debug!(since_id = id, "cursor advanced");
                self.cursor = Some(id);
            }
            None => {
                warn!(id = %newest.id, "unreadable status id, resetting cursor");
                self.cursor = None;
            }
        }
    }
}
