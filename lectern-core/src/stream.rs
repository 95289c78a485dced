//! Editable streams and their history.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{EditError, ParseError};
use crate::history::{EditAction, EditHistory};

/// A persisted part of a recording that can be edited in place.
pub trait EditableStream: Sized {
    /// Edits this stream accepts.
    type Edit: EditAction<Self>;

    /// What decoding needs besides the bytes, `()` for most streams.
    type Context: ?Sized;

    /// Rebuild the stream from its encoding.
    fn parse_with(data: &[u8], context: &Self::Context) -> Result<Self, ParseError>;

    fn to_bytes(&self) -> Vec<u8>;

    /// Hash of the serialized content.
    fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.to_bytes().hash(&mut hasher);
        hasher.finish()
    }
}

/// A stream paired with its own undo/redo history.
pub struct RecordedStream<S: EditableStream> {
    stream: S,
    history: EditHistory<S::Edit>,
}

impl<S: EditableStream> RecordedStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            history: EditHistory::new(),
        }
    }

    pub fn get(&self) -> &S {
        &self.stream
    }

    /// Execute `edit` and push it onto the undo stack.
    pub fn apply(&mut self, mut edit: S::Edit) -> Result<(), EditError> {
        edit.execute(&mut self.stream)?;
        self.history.add_edit_action(edit);
        Ok(())
    }

    pub fn undo(&mut self) -> Result<bool, EditError> {
        self.history.undo(&mut self.stream)
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        self.history.redo(&mut self.stream)
    }

    pub fn has_undo_actions(&self) -> bool {
        self.history.has_undo_actions()
    }

    pub fn has_redo_actions(&self) -> bool {
        self.history.has_redo_actions()
    }

    pub fn clear_redo(&mut self) {
        self.history.clear_redo();
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.stream.to_bytes()
    }

    pub fn state_hash(&self) -> u64 {
        self.stream.state_hash()
    }
}

impl<S: EditableStream + fmt::Debug> fmt::Debug for RecordedStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordedStream")
            .field("stream", &self.stream)
            .field("undo", &self.history.undo_len())
            .field("redo", &self.history.redo_len())
            .finish()
    }
}
