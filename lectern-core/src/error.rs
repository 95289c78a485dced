//! Error types for recording parsing and editing

use thiserror::Error;

/// Errors that can occur when decoding a recording stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Format marker doesn't match the recording magic
    #[error("Invalid format: expected marker {expected:#010X}, got {actual:#010X}")]
    InvalidFormat { expected: u32, actual: u32 },

    /// Buffer is too short to contain a fixed-size record
    #[error("Record too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// A chunk length points past the end of its enclosing buffer
    #[error("Malformed recording: {0}")]
    MalformedRecording(String),

    /// Failed to deserialize a fixed-layout structure
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

impl From<bincode::Error> for ParseError {
    fn from(e: bincode::Error) -> Self {
        ParseError::DeserializationFailed(e.to_string())
    }
}

/// Errors raised by an edit action's execute/undo/redo
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// No recorded page carries the requested number
    #[error("Recorded page {0} not found")]
    PageNotFound(i32),

    /// Index outside of the stream it addresses
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Interval is empty or lies outside the recording
    #[error("Invalid edit interval [{start}, {end}) for duration {duration} ms")]
    InvalidInterval { start: i64, end: i64, duration: i64 },

    /// Inserted audio doesn't share the target's sample format
    #[error("Incompatible audio format: {0}")]
    IncompatibleAudio(String),

    /// Undo/redo requested on an action that never executed
    #[error("Edit action has not been executed")]
    NotExecuted,

    /// Any other failure, wrapped with a description
    #[error("Edit failed: {0}")]
    Failure(String),
}

impl From<ParseError> for EditError {
    fn from(e: ParseError) -> Self {
        EditError::Failure(e.to_string())
    }
}
