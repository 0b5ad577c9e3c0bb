//! Bounded undo/redo stack for group edits.

use crate::config::UndoConfig;
use crate::edit::EditRecord;
use crate::entry::EntryStore;
use crate::error::{GroupError, Result};
use crate::tree::GroupTree;

/// Strict LIFO history of [`EditRecord`]s.
///
/// A record whose replay fails is discarded rather than pushed back, so a
/// tree that no longer matches its history cannot be corrupted further.
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo_stack: Vec<EditRecord>,
    redo_stack: Vec<EditRecord>,
    max_size: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::from_config(&UndoConfig::default())
    }
}

impl UndoManager {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn from_config(config: &UndoConfig) -> Self {
        Self::new(config.max_size)
    }

    /// Record an edit that has just been applied.
    pub fn push(&mut self, record: EditRecord) {
        self.undo_stack.push(record);
        self.redo_stack.clear(); // a new action invalidates the redo branch

        if self.undo_stack.len() > self.max_size {
            let excess = self.undo_stack.len() - self.max_size;
            self.undo_stack.drain(..excess);
        }
    }

    /// Undo the most recent edit. Returns `Ok(false)` when there is nothing to undo.
    pub fn undo<S: EntryStore + ?Sized>(&mut self, tree: &mut GroupTree, entries: &mut S) -> Result<bool> {
        let Some(mut record) = self.undo_stack.pop() else {
            return Ok(false);
        };
        match record.undo(tree, entries) {
            Ok(()) => {
                self.redo_stack.push(record);
                Ok(true)
            }
            Err(err) => Err(Self::discard(record, err)),
        }
    }

    /// Redo the most recently undone edit. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo<S: EntryStore + ?Sized>(&mut self, tree: &mut GroupTree, entries: &mut S) -> Result<bool> {
        let Some(mut record) = self.redo_stack.pop() else {
            return Ok(false);
        };
        match record.redo(tree, entries) {
            Ok(()) => {
                self.undo_stack.push(record);
                Ok(true)
            }
            Err(err) => Err(Self::discard(record, err)),
        }
    }

    fn discard(mut record: EditRecord, err: GroupError) -> GroupError {
        record.discard();
        tracing::error!("Discarding edit '{}': {}", record.description(), err);
        match err {
            GroupError::InconsistentUndoState(_) => err,
            other => GroupError::InconsistentUndoState(other.to_string()),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the edit `undo` would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(EditRecord::description)
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(EditRecord::description)
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
