//! JSON edit scripts.
//!
//! A script is a list of operations applied to one recording in order:
//!
//! ```json
//! [
//!   { "op": "cut", "start": 1000, "end": 2500 },
//!   { "op": "deletePage", "page": 3 },
//!   { "op": "insert", "file": "intro.lrec", "at": 0.0 },
//!   { "op": "insertAudio", "file": "errata.wav", "at": 0.5 },
//!   { "op": "undo" },
//!   { "op": "redo" }
//! ]
//! ```
//!
//! Relative file names are resolved against the script's directory.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use lectern_core::{Recording, WavAudio};

use crate::recording::{read_recording_bytes, RecordingFileError, RecordingManager};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOperation {
    /// Remove `[start, end)` milliseconds
    Cut { start: i64, end: i64 },
    /// Remove a page and the time it was showing
    DeletePage { page: i32 },
    /// Insert another recording at a relative position
    Insert { file: PathBuf, at: f64 },
    /// Insert a WAV file at a relative position
    InsertAudio { file: PathBuf, at: f64 },
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript {
    pub operations: Vec<EditOperation>,
}

impl EditScript {
    pub fn from_json(json: &str) -> Result<Self, RecordingFileError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, RecordingFileError> {
        if !path.is_file() {
            return Err(RecordingFileError::NotFound(path.to_path_buf()));
        }
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Apply every operation to `recording`, stopping at the first failure.
    ///
    /// Returns the number of operations applied.
    pub fn apply(
        &self,
        recording: &mut Recording,
        manager: &RecordingManager,
        base_dir: &Path,
    ) -> Result<usize, RecordingFileError> {
        for (i, operation) in self.operations.iter().enumerate() {
            info!("Step {}/{}: {:?}", i + 1, self.operations.len(), operation);
            apply_operation(recording, operation, manager, base_dir)?;
        }
        Ok(self.operations.len())
    }
}

pub fn apply_operation(
    recording: &mut Recording,
    operation: &EditOperation,
    manager: &RecordingManager,
    base_dir: &Path,
) -> Result<(), RecordingFileError> {
    match operation {
        EditOperation::Cut { start, end } => recording.cut(*start, *end)?,
        EditOperation::DeletePage { page } => recording.delete_page(*page)?,
        EditOperation::Insert { file, at } => {
            let other = manager.load(&base_dir.join(file))?;
            recording.insert(&other, *at)?;
        }
        EditOperation::InsertAudio { file, at } => {
            let audio = load_wav(&base_dir.join(file))?;
            recording.insert_audio(&audio, *at)?;
        }
        EditOperation::Undo => recording.undo()?,
        EditOperation::Redo => recording.redo()?,
    }
    Ok(())
}

pub fn load_wav(path: &Path) -> Result<WavAudio, RecordingFileError> {
    Ok(WavAudio::parse(&read_recording_bytes(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::{
        AudioFormat, AudioStream, PagedDocument, RecordedEvents, RecordedPage, RecordingHeader,
    };
    use tempfile::TempDir;

    fn recording(pages: &[i32], millis: i64) -> Recording {
        let mut events = RecordedEvents::new();
        for (i, ts) in pages.iter().enumerate() {
            events.add_page(RecordedPage::new(i as i32, *ts));
        }
        Recording::new(
            RecordingHeader::with_duration(millis),
            events,
            Box::new(PagedDocument::new(pages.iter().map(|_| vec![0]).collect())),
            Box::new(WavAudio::silence(AudioFormat::pcm(8000, 1, 16), millis)),
        )
    }

    #[test]
    fn test_parse_script() {
        let script = EditScript::from_json(
            r#"[
                {"op": "cut", "start": 0, "end": 500},
                {"op": "deletePage", "page": 2},
                {"op": "insertAudio", "file": "a.wav", "at": 0.25},
                {"op": "undo"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            script.operations,
            vec![
                EditOperation::Cut { start: 0, end: 500 },
                EditOperation::DeletePage { page: 2 },
                EditOperation::InsertAudio {
                    file: PathBuf::from("a.wav"),
                    at: 0.25
                },
                EditOperation::Undo,
            ]
        );
    }

    #[test]
    fn test_unknown_operation_rejected() {
        assert!(matches!(
            EditScript::from_json(r#"[{"op": "trim"}]"#),
            Err(RecordingFileError::Json(_))
        ));
    }

    #[test]
    fn test_apply_script() {
        let temp = TempDir::new().unwrap();
        let manager = RecordingManager::with_base_dir(temp.path().to_path_buf());
        manager
            .save(&recording(&[0], 1000), &temp.path().join("intro.lrec"), false)
            .unwrap();
        let wav = WavAudio::silence(AudioFormat::pcm(8000, 1, 16), 500);
        fs::write(temp.path().join("note.wav"), wav.to_bytes()).unwrap();

        let script = EditScript::from_json(
            r#"[
                {"op": "cut", "start": 1000, "end": 2000},
                {"op": "insert", "file": "intro.lrec", "at": 0.0},
                {"op": "insertAudio", "file": "note.wav", "at": 1.0},
                {"op": "undo"},
                {"op": "redo"}
            ]"#,
        )
        .unwrap();

        let mut rec = recording(&[0, 3000], 6000);
        assert_eq!(script.apply(&mut rec, &manager, temp.path()).unwrap(), 5);
        assert_eq!(rec.duration(), 6500);
        assert_eq!(rec.events().len(), 3);
    }

    #[test]
    fn test_apply_stops_at_failure() {
        let temp = TempDir::new().unwrap();
        let manager = RecordingManager::with_base_dir(temp.path().to_path_buf());
        let script = EditScript::from_json(
            r#"[
                {"op": "cut", "start": 0, "end": 1000},
                {"op": "deletePage", "page": 7},
                {"op": "cut", "start": 0, "end": 1000}
            ]"#,
        )
        .unwrap();

        let mut rec = recording(&[0, 3000], 6000);
        assert!(matches!(
            script.apply(&mut rec, &manager, temp.path()),
            Err(RecordingFileError::Edit(_))
        ));
        assert_eq!(rec.duration(), 5000);
    }
}
