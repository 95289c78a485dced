//! Stream-local edit actions.
//!
//! Each action mutates exactly one stream and keeps what it needs to undo
//! itself. The [`Recording`](crate::Recording) builds one action per stream
//! for every user-level edit.

mod audio;
mod document;
mod events;
mod header;

pub use audio::{DeleteAudioAction, InsertAudioAction};
pub use document::{DeleteDocumentAction, InsertDocumentAction};
pub use events::{DeleteEventsAction, DeletePageAction, InsertEventsAction, ShiftEventsAction};
pub use header::EditHeaderAction;

use crate::audio::RecordedAudio;
use crate::document::RecordedDocument;
use crate::error::EditError;
use crate::events::RecordedEvents;
use crate::history::EditAction;

/// Edits of the events stream.
#[derive(Debug)]
pub enum EventsEdit {
    Shift(ShiftEventsAction),
    Delete(DeleteEventsAction),
    Insert(InsertEventsAction),
    DeletePage(DeletePageAction),
}

impl From<ShiftEventsAction> for EventsEdit {
    fn from(action: ShiftEventsAction) -> Self {
        EventsEdit::Shift(action)
    }
}

impl From<DeleteEventsAction> for EventsEdit {
    fn from(action: DeleteEventsAction) -> Self {
        EventsEdit::Delete(action)
    }
}

impl From<InsertEventsAction> for EventsEdit {
    fn from(action: InsertEventsAction) -> Self {
        EventsEdit::Insert(action)
    }
}

impl From<DeletePageAction> for EventsEdit {
    fn from(action: DeletePageAction) -> Self {
        EventsEdit::DeletePage(action)
    }
}

impl EditAction<RecordedEvents> for EventsEdit {
    fn execute(&mut self, target: &mut RecordedEvents) -> Result<(), EditError> {
        match self {
            EventsEdit::Shift(a) => a.execute(target),
            EventsEdit::Delete(a) => a.execute(target),
            EventsEdit::Insert(a) => a.execute(target),
            EventsEdit::DeletePage(a) => a.execute(target),
        }
    }

    fn undo(&mut self, target: &mut RecordedEvents) -> Result<(), EditError> {
        match self {
            EventsEdit::Shift(a) => a.undo(target),
            EventsEdit::Delete(a) => a.undo(target),
            EventsEdit::Insert(a) => a.undo(target),
            EventsEdit::DeletePage(a) => a.undo(target),
        }
    }

    fn redo(&mut self, target: &mut RecordedEvents) -> Result<(), EditError> {
        match self {
            EventsEdit::Shift(a) => a.redo(target),
            EventsEdit::Delete(a) => a.redo(target),
            EventsEdit::Insert(a) => a.redo(target),
            EventsEdit::DeletePage(a) => a.redo(target),
        }
    }
}

/// Edits of the document stream.
#[derive(Debug)]
pub enum DocumentEdit {
    Delete(DeleteDocumentAction),
    Insert(InsertDocumentAction),
}

impl From<DeleteDocumentAction> for DocumentEdit {
    fn from(action: DeleteDocumentAction) -> Self {
        DocumentEdit::Delete(action)
    }
}

impl From<InsertDocumentAction> for DocumentEdit {
    fn from(action: InsertDocumentAction) -> Self {
        DocumentEdit::Insert(action)
    }
}

impl EditAction<RecordedDocument> for DocumentEdit {
    fn execute(&mut self, target: &mut RecordedDocument) -> Result<(), EditError> {
        match self {
            DocumentEdit::Delete(a) => a.execute(target),
            DocumentEdit::Insert(a) => a.execute(target),
        }
    }

    fn undo(&mut self, target: &mut RecordedDocument) -> Result<(), EditError> {
        match self {
            DocumentEdit::Delete(a) => a.undo(target),
            DocumentEdit::Insert(a) => a.undo(target),
        }
    }

    fn redo(&mut self, target: &mut RecordedDocument) -> Result<(), EditError> {
        match self {
            DocumentEdit::Delete(a) => a.redo(target),
            DocumentEdit::Insert(a) => a.redo(target),
        }
    }
}

/// Edits of the audio stream.
#[derive(Debug)]
pub enum AudioEdit {
    Delete(DeleteAudioAction),
    Insert(InsertAudioAction),
}

impl From<DeleteAudioAction> for AudioEdit {
    fn from(action: DeleteAudioAction) -> Self {
        AudioEdit::Delete(action)
    }
}

impl From<InsertAudioAction> for AudioEdit {
    fn from(action: InsertAudioAction) -> Self {
        AudioEdit::Insert(action)
    }
}

impl EditAction<RecordedAudio> for AudioEdit {
    fn execute(&mut self, target: &mut RecordedAudio) -> Result<(), EditError> {
        match self {
            AudioEdit::Delete(a) => a.execute(target),
            AudioEdit::Insert(a) => a.execute(target),
        }
    }

    fn undo(&mut self, target: &mut RecordedAudio) -> Result<(), EditError> {
        match self {
            AudioEdit::Delete(a) => a.undo(target),
            AudioEdit::Insert(a) => a.undo(target),
        }
    }

    fn redo(&mut self, target: &mut RecordedAudio) -> Result<(), EditError> {
        match self {
            AudioEdit::Delete(a) => a.redo(target),
            AudioEdit::Insert(a) => a.redo(target),
        }
    }
}
