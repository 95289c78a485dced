//! # Lectern Editor
//!
//! Command-line editor for lecture recordings.
//!
//! The editor reads and writes recording containers on disk and drives the
//! edit engine in [`lectern_core`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    lectern-editor                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────┐ │
//! │  │ CLI (clap)   │  │ Edit scripts │  │ Settings (JSON) │ │
//! │  └──────┬───────┘  └──────┬───────┘  └─────────────────┘ │
//! │         ▼                 ▼                              │
//! │  ┌─────────────────────────────────────────────────────┐ │
//! │  │              RecordingManager                       │ │
//! │  │  - .lrec / .lrec.gz containers, SHA-1 checksums     │ │
//! │  │  - numbered backups                                 │ │
//! │  └─────────────────────────────────────────────────────┘ │
//! │         ▼                                                │
//! │  ┌─────────────────────────────────────────────────────┐ │
//! │  │              lectern_core::Recording                │ │
//! │  └─────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all options. Editing commands write back to the input
//! file, after a backup, unless `--output` names another file:
//!
//! ```text
//! lectern-editor cut lecture.lrec 60000 95000
//! lectern-editor delete-page lecture.lrec 4 --no-backup
//! lectern-editor insert lecture.lrec intro.lrec 0.0 -o combined.lrec
//! lectern-editor apply lecture.lrec edits.json
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod outline;
pub mod recording;
pub mod script;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(name = "lectern-editor", version, about = "Edit lecture recordings")]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Settings file, instead of the one in the user config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Snap inserts to page starts within this many milliseconds
    #[arg(long, global = true)]
    pub snap_margin: Option<i32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Show header information
    Info {
        file: PathBuf,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// List the pages with their timing and actions
    Pages {
        file: PathBuf,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the checksum and decode every stream
    Verify { file: PathBuf },

    /// List recordings in a directory
    List {
        /// Directory to scan, instead of the configured recordings directory
        dir: Option<PathBuf>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a time range, in milliseconds, from every stream
    Cut {
        file: PathBuf,
        start: i64,
        end: i64,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Remove a page and the time it was showing
    DeletePage {
        file: PathBuf,
        page: i32,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Insert another recording at a relative position (0.0 to 1.0)
    Insert {
        file: PathBuf,
        source: PathBuf,
        at: f64,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Insert a WAV file at a relative position (0.0 to 1.0)
    InsertAudio {
        file: PathBuf,
        audio: PathBuf,
        at: f64,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Apply a JSON edit script
    Apply {
        file: PathBuf,
        script: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Info { .. } => "info",
            Command::Pages { .. } => "pages",
            Command::Verify { .. } => "verify",
            Command::List { .. } => "list",
            Command::Cut { .. } => "cut",
            Command::DeletePage { .. } => "delete-page",
            Command::Insert { .. } => "insert",
            Command::InsertAudio { .. } => "insert-audio",
            Command::Apply { .. } => "apply",
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct OutputArgs {
    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not back up the file being overwritten
    #[arg(long)]
    pub no_backup: bool,
}
