use crate::model::{Track, Transition};

/// Default cap for each history stack.
pub const HISTORY_CAP: usize = 50;

/// Immutable copy of the editable timeline state.
///
/// Only `{tracks, transitions}` participate in undo: assets and settings are
/// not touched by destructive editing operations.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Track lanes at snapshot time.
    pub tracks: Vec<Track>,
    /// Transitions at snapshot time.
    pub transitions: Vec<Transition>,
}

/// Linear undo/redo over bounded snapshot stacks.
///
/// A snapshot is pushed *before* every destructive mutation. Undo moves the
/// current state onto the future stack and restores the last past snapshot;
/// any new destructive mutation after an undo clears the future stack.
#[derive(Debug, Default)]
pub struct EditHistory {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
    cap: usize,
}

impl EditHistory {
    /// Create a history with the default cap.
    pub fn new() -> Self {
        Self::with_cap(HISTORY_CAP)
    }

    /// Create a history with an explicit stack cap.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Number of undoable snapshots.
    pub fn undo_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redoable snapshots.
    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    /// Record `current` before a destructive mutation.
    ///
    /// Clears the redo stack and evicts the oldest entry past the cap.
    pub fn push(&mut self, current: Snapshot) {
        self.future.clear();
        self.past.push(current);
        if self.past.len() > self.cap {
            self.past.remove(0);
        }
    }

    /// Undo: exchange `current` for the most recent past snapshot.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.past.pop()?;
        self.future.push(current);
        if self.future.len() > self.cap {
            self.future.remove(0);
        }
        Some(restored)
    }

    /// Redo: exchange `current` for the most recent future snapshot.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.future.pop()?;
        self.past.push(current);
        Some(restored)
    }
}
