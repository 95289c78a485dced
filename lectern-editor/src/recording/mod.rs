//! Recording files on disk.
//!
//! - Read and write `.lrec` containers, optionally gzip-compressed
//! - Verify checksums
//! - List a recordings directory
//! - Keep numbered backups when overwriting
//!
//! ## File Format
//!
//! ```text
//! ┌──────────────────────────┐
//! │ Header (56 bytes)        │  marker "LECT", version, duration,
//! │                          │  SHA-1 checksum, chunk lengths
//! ├──────────────────────────┤
//! │ Events                   │  pages of timed actions
//! ├──────────────────────────┤
//! │ Document                 │  one blob per page
//! ├──────────────────────────┤
//! │ Audio                    │  RIFF/WAVE
//! ├──────────────────────────┤
//! │ Camera name              │  opaque
//! ├──────────────────────────┤
//! │ Tool demo                │  opaque
//! └──────────────────────────┘
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use lectern_core::{EditError, ParseError};

pub mod file_format;
pub mod manager;

pub use file_format::{compute_checksum, RecordingFile, COMPRESSED_EXTENSION, RECORDING_EXTENSION};
pub use manager::{read_recording_bytes, RecordingInfo, RecordingManager};

#[derive(Error, Debug)]
pub enum RecordingFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid recording: {0}")]
    Parse(#[from] ParseError),
    #[error("Edit failed: {0}")]
    Edit(#[from] EditError),
    #[error("Checksum mismatch: header says {expected}, content is {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Recording not found: {0}")]
    NotFound(PathBuf),
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
    #[error("Too large for the container format: {0}")]
    TooLarge(String),
}
