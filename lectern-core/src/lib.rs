//! # Lectern Core
//!
//! Platform-independent codec and edit engine for lecture recordings.
//!
//! A recording is four time-aligned streams: a fixed header, the events
//! stream (pages of timestamped drawing and tool actions), the document
//! (one slide per page) and the audio. This crate decodes and encodes the
//! binary formats and edits all four streams together, with undo and redo.
//! It performs **no file I/O**; reading and writing containers lives in
//! `lectern-editor`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  lectern-core (no I/O)                                      │
//! │  ├── header      (56-byte fixed record)                     │
//! │  ├── action      (action records, factory, tool points)     │
//! │  ├── page        (page codec, cut / shift / split)          │
//! │  ├── events      (page sequence, page lookup)               │
//! │  ├── audio       (AudioStream, in-memory WAV)               │
//! │  ├── document    (DocumentStream, paged blobs)              │
//! │  ├── edit        (per-stream undoable actions)              │
//! │  └── recording   (cross-stream cut / insert / delete page)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  lectern-editor         │
//!                 │  (container files, CLI) │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Example: Cutting a Recording
//!
//! ```rust
//! use lectern_core::{
//!     AudioFormat, PagedDocument, RecordedEvents, RecordedPage, Recording, RecordingHeader,
//!     WavAudio,
//! };
//!
//! let mut events = RecordedEvents::new();
//! events.add_page(RecordedPage::new(0, 0));
//! events.add_page(RecordedPage::new(1, 5000));
//!
//! let mut recording = Recording::new(
//!     RecordingHeader::with_duration(9000),
//!     events,
//!     Box::new(PagedDocument::new(vec![b"title".to_vec(), b"body".to_vec()])),
//!     Box::new(WavAudio::silence(AudioFormat::default(), 9000)),
//! );
//!
//! recording.cut(1000, 2000).unwrap();
//! assert_eq!(recording.duration(), 8000);
//! assert_eq!(recording.events().pages()[1].timestamp(), 4000);
//!
//! recording.undo().unwrap();
//! assert_eq!(recording.duration(), 9000);
//! ```

pub mod action;
pub mod audio;
mod codec;
pub mod document;
pub mod edit;
pub mod error;
pub mod events;
pub mod header;
pub mod history;
pub mod interval;
pub mod page;
pub mod recording;
pub mod stream;

// Re-export commonly used types
pub use action::{
    ActionFactory, ActionFlags, ActionKind, DefaultActionFactory, PenPoint, PlaybackAction,
    RecordedAction, ToolContext,
};
pub use audio::{AudioFormat, AudioStream, RecordedAudio, WavAudio};
pub use document::{DocumentStream, PagedDocument, RecordedDocument};
pub use error::{EditError, ParseError};
pub use events::RecordedEvents;
pub use header::{checksum_hex, RecordingHeader, FORMAT_MARKER, FORMAT_VERSION, HEADER_SIZE};
pub use history::{EditAction, EditHistory};
pub use interval::Interval;
pub use page::RecordedPage;
pub use recording::{ContentKind, ListenerId, Recording, DEFAULT_SNAP_MARGIN};
pub use stream::{EditableStream, RecordedStream};
