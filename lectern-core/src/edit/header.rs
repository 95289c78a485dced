use log::debug;

use crate::error::{EditError, ParseError};
use crate::header::RecordingHeader;
use crate::history::EditAction;
use crate::stream::EditableStream;

/// Grows or shrinks the recorded duration.
#[derive(Debug, Clone)]
pub struct EditHeaderAction {
    delta: i64,
    previous: Option<i64>,
}

impl EditHeaderAction {
    /// `delta` is added to the duration; negative values shorten it.
    pub fn new(delta: i64) -> Self {
        Self {
            delta,
            previous: None,
        }
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }
}

impl EditAction<RecordingHeader> for EditHeaderAction {
    fn execute(&mut self, header: &mut RecordingHeader) -> Result<(), EditError> {
        let duration = header.duration + self.delta;
        if duration < 0 {
            return Err(EditError::Failure(format!(
                "duration {} ms cannot shrink by {} ms",
                header.duration, -self.delta
            )));
        }
        debug!("header duration {} -> {} ms", header.duration, duration);
        self.previous = Some(header.duration);
        header.duration = duration;
        Ok(())
    }

    fn undo(&mut self, header: &mut RecordingHeader) -> Result<(), EditError> {
        header.duration = self.previous.ok_or(EditError::NotExecuted)?;
        Ok(())
    }

    fn redo(&mut self, header: &mut RecordingHeader) -> Result<(), EditError> {
        self.execute(header)
    }
}

impl EditableStream for RecordingHeader {
    type Edit = EditHeaderAction;
    type Context = ();

    fn parse_with(data: &[u8], _: &()) -> Result<Self, ParseError> {
        RecordingHeader::parse(data)
    }

    fn to_bytes(&self) -> Vec<u8> {
        RecordingHeader::to_bytes(self)
    }
}
