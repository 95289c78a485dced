//! Per-stream undo/redo history.

use log::debug;

use crate::error::EditError;

/// A reversible mutation of `T`.
///
/// `undo` restores the state saved by `execute`; `redo` re-applies the
/// forward mutation after an `undo`.
pub trait EditAction<T> {
    fn execute(&mut self, target: &mut T) -> Result<(), EditError>;

    fn undo(&mut self, target: &mut T) -> Result<(), EditError>;

    fn redo(&mut self, target: &mut T) -> Result<(), EditError>;
}

/// Two LIFO stacks of executed actions.
#[derive(Debug)]
pub struct EditHistory<A> {
    undo: Vec<A>,
    redo: Vec<A>,
}

impl<A> Default for EditHistory<A> {
    fn default() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }
}

impl<A> EditHistory<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an already executed action. Clears the redo stack.
    pub fn add_edit_action(&mut self, action: A) {
        self.undo.push(action);
        self.redo.clear();
    }

    pub fn has_undo_actions(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn has_redo_actions(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    /// Undo the most recent action. Returns `Ok(false)` if there was none.
    ///
    /// A failed action stays on the undo stack.
    pub fn undo<T>(&mut self, target: &mut T) -> Result<bool, EditError>
    where
        A: EditAction<T>,
    {
        let Some(mut action) = self.undo.pop() else {
            return Ok(false);
        };
        if let Err(e) = action.undo(target) {
            self.undo.push(action);
            return Err(e);
        }
        self.redo.push(action);
        debug!("undo: {} left, {} to redo", self.undo.len(), self.redo.len());
        Ok(true)
    }

    /// Redo the most recently undone action. Returns `Ok(false)` if there was none.
    pub fn redo<T>(&mut self, target: &mut T) -> Result<bool, EditError>
    where
        A: EditAction<T>,
    {
        let Some(mut action) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = action.redo(target) {
            self.redo.push(action);
            return Err(e);
        }
        self.undo.push(action);
        debug!("redo: {} to undo, {} left", self.undo.len(), self.redo.len());
        Ok(true)
    }
}
