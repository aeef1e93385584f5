#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded undo history of board snapshots.

use std::collections::VecDeque;

use merge_forge_core::BoardSnapshot;

/// Number of undo steps kept when no capacity is configured.
pub const DEFAULT_UNDO_DEPTH: usize = 5;

/// Fixed-capacity stack of board snapshots. The oldest entry is evicted first.
#[derive(Clone, Debug)]
pub struct UndoHistory {
    capacity: usize,
    entries: VecDeque<BoardSnapshot>,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_UNDO_DEPTH)
    }
}

impl UndoHistory {
    /// Creates an empty history holding at most `capacity` snapshots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Records a snapshot, evicting the oldest when full.
    ///
    /// A zero-capacity history discards everything.
    pub fn push(&mut self, snapshot: BoardSnapshot) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Removes and returns the most recent snapshot.
    pub fn pop(&mut self) -> Option<BoardSnapshot> {
        self.entries.pop_back()
    }

    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of snapshots currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether there is nothing to undo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of snapshots held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
