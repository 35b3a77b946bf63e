//! Snapshot-based undo/redo over the full diagram state.
//!
//! Each history entry is a deep copy of the item and connection registries
//! plus an action label and timestamp. Diagrams stay small (tens to low
//! hundreds of items), so full snapshots are preferred over a command log
//! for simplicity.

use crate::constants::MAX_HISTORY_DEPTH;
use crate::error::HistoryError;
use crate::types::{Connection, DiagramItem};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A full deep copy of the diagram state at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagramSnapshot {
    /// Name of the action about to be applied when this was taken
    pub label: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Deep copy of every item, in registry order
    pub items: Vec<DiagramItem>,
    /// Deep copy of every connection, in registry order
    pub connections: Vec<Connection>,
}

impl DiagramSnapshot {
    /// Captures the given registries under an action label.
    pub fn capture(label: &str, items: &[DiagramItem], connections: &[Connection]) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            label: label.to_string(),
            timestamp,
            items: items.to_vec(),
            connections: connections.to_vec(),
        }
    }
}

/// Manages the undo and redo stacks for one diagram session.
///
/// History is not persisted across restarts; the stacks are rebuilt empty
/// each session.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HistoryManager {
    #[serde(skip)]
    undo_stack: Vec<DiagramSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<DiagramSnapshot>,
    /// Suspension depth for bulk operations; snapshots are dropped while
    /// this is non-zero. Restoration also raises it so restoring state can
    /// never push a new entry.
    #[serde(skip)]
    suspend_depth: u32,
}

impl HistoryManager {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of the current registries onto the undo stack.
    ///
    /// Must be called **before** the mutation it labels, so undo always
    /// returns to the immediately-prior stable state. Clears the redo stack
    /// (a new mutation starts a new timeline) and evicts the oldest entry
    /// past the depth bound. A no-op while suspended.
    pub fn snapshot(&mut self, label: &str, items: &[DiagramItem], connections: &[Connection]) {
        if self.suspend_depth > 0 {
            return;
        }
        self.undo_stack
            .push(DiagramSnapshot::capture(label, items, connections));
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_HISTORY_DEPTH {
            self.undo_stack.remove(0);
        }
    }

    /// Pops the most recent undo snapshot, pushing a snapshot of the
    /// *current* state onto the redo stack first.
    ///
    /// Returns the snapshot to restore, or [`HistoryError::NothingToUndo`].
    pub fn undo(
        &mut self,
        current_items: &[DiagramItem],
        current_connections: &[Connection],
    ) -> Result<DiagramSnapshot, HistoryError> {
        let snapshot = self.undo_stack.pop().ok_or(HistoryError::NothingToUndo)?;
        self.redo_stack.push(DiagramSnapshot::capture(
            &snapshot.label,
            current_items,
            current_connections,
        ));
        Ok(snapshot)
    }

    /// Symmetric to [`Self::undo`].
    pub fn redo(
        &mut self,
        current_items: &[DiagramItem],
        current_connections: &[Connection],
    ) -> Result<DiagramSnapshot, HistoryError> {
        let snapshot = self.redo_stack.pop().ok_or(HistoryError::NothingToRedo)?;
        self.undo_stack.push(DiagramSnapshot::capture(
            &snapshot.label,
            current_items,
            current_connections,
        ));
        Ok(snapshot)
    }

    /// True if there is anything to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// True if there is anything to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the next action that would be undone, for UI tooltips.
    pub fn next_undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|s| s.label.as_str())
    }

    /// Suspends snapshotting. Bulk operations that perform many primitive
    /// mutations call this, take exactly one snapshot beforehand, and
    /// [`Self::resume`] when done. Nests.
    pub fn suspend(&mut self) {
        self.suspend_depth += 1;
    }

    /// Releases one level of suspension.
    pub fn resume(&mut self) {
        self.suspend_depth = self.suspend_depth.saturating_sub(1);
    }

    /// True while snapshots are being dropped.
    pub fn is_suspended(&self) -> bool {
        self.suspend_depth > 0
    }

    /// Drops all history, e.g. when a new document is loaded.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Current undo stack depth (for tests and diagnostics).
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}
