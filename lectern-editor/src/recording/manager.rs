//! Recording file manager.
//!
//! Handles listing, loading, saving and backups of recordings.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use lectern_core::{checksum_hex, DefaultActionFactory, RecordedEvents, Recording};

use crate::config::EditorSettings;

use super::file_format::{RecordingFile, COMPRESSED_EXTENSION, RECORDING_EXTENSION};
use super::RecordingFileError;

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(&format!(".{}", suffix)))
        .unwrap_or(false)
}

pub fn is_compressed(path: &Path) -> bool {
    has_suffix(path, COMPRESSED_EXTENSION)
}

pub fn is_recording_file(path: &Path) -> bool {
    has_suffix(path, RECORDING_EXTENSION) || is_compressed(path)
}

/// Read a container file, decompressing `.lrec.gz`.
pub fn read_recording_bytes(path: &Path) -> Result<Vec<u8>, RecordingFileError> {
    if !path.is_file() {
        return Err(RecordingFileError::NotFound(path.to_path_buf()));
    }
    let mut data = Vec::new();
    let file = File::open(path)?;
    if is_compressed(path) {
        GzDecoder::new(file).read_to_end(&mut data)?;
        debug!("Decompressed {} to {} bytes", path.display(), data.len());
    } else {
        let mut file = file;
        file.read_to_end(&mut data)?;
    }
    Ok(data)
}

/// Information about a recording file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    /// Filename (without path)
    pub filename: String,
    /// Full path to the file
    #[serde(skip_serializing)]
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Recording duration in milliseconds, from the header
    pub duration_ms: i64,
    /// Number of pages in the events stream
    pub page_count: usize,
    /// Container format version
    pub version: i32,
    pub compressed: bool,
    pub checksum: String,
    pub checksum_valid: bool,
    /// File modification time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

fn write_container(
    file: &RecordingFile,
    path: &Path,
    compressed: bool,
) -> Result<(), RecordingFileError> {
    let mut writer = BufWriter::new(File::create(path)?);
    if compressed {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        file.write(&mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        file.write(&mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// Manager for recording files
pub struct RecordingManager {
    base_dir: PathBuf,
    max_backups: usize,
}

impl RecordingManager {
    pub fn new(settings: &EditorSettings) -> Self {
        let base_dir = settings.recordings_dir();

        // Ensure base directory exists
        if let Err(e) = fs::create_dir_all(&base_dir) {
            error!("Failed to create recordings directory: {}", e);
        } else {
            debug!("Recordings directory: {}", base_dir.display());
        }

        Self {
            base_dir,
            max_backups: settings.max_backups,
        }
    }

    /// Create with a custom base directory (for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&base_dir) {
            error!("Failed to create recordings directory: {}", e);
        }
        Self {
            base_dir,
            max_backups: EditorSettings::default().max_backups,
        }
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// All readable recordings in the base directory, newest first.
    pub fn list_recordings(&self) -> Vec<RecordingInfo> {
        let mut recordings = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.base_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && is_recording_file(&path) {
                    if let Some(info) = self.get_recording_info(&path) {
                        recordings.push(info);
                    }
                }
            }
        }

        recordings.sort_by(|a, b| b.modified.cmp(&a.modified));
        recordings
    }

    /// Header-derived information, or `None` if the file is not a readable
    /// recording.
    pub fn get_recording_info(&self, path: &Path) -> Option<RecordingInfo> {
        let filename = path.file_name()?.to_str()?.to_string();
        let metadata = fs::metadata(path).ok()?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        let file = match read_recording_bytes(path).and_then(|d| RecordingFile::from_bytes(&d)) {
            Ok(file) => file,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };
        let page_count = match RecordedEvents::parse(&file.events, &DefaultActionFactory) {
            Ok(events) => events.len(),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };

        Some(RecordingInfo {
            filename,
            path: path.to_path_buf(),
            size: metadata.len(),
            duration_ms: file.header.duration,
            page_count,
            version: file.header.version,
            compressed: is_compressed(path),
            checksum: checksum_hex(&file.header.checksum),
            checksum_valid: file.verify_checksum().is_ok(),
            modified,
        })
    }

    /// Find a recording by path, or by name relative to the base directory.
    ///
    /// A path naming an existing file is used as given: it came from the
    /// user, like any file argument. Only names looked up inside the base
    /// directory must stay inside it.
    pub fn resolve(&self, name: &Path) -> Result<PathBuf, RecordingFileError> {
        if name.is_file() {
            return Ok(name.to_path_buf());
        }
        let path = self.base_dir.join(name);
        if !path.is_file() {
            return Err(RecordingFileError::NotFound(name.to_path_buf()));
        }
        if !self.is_safe_path(&path) {
            return Err(RecordingFileError::InvalidPath(name.to_path_buf()));
        }
        Ok(path)
    }

    pub fn open(&self, path: &Path) -> Result<RecordingFile, RecordingFileError> {
        RecordingFile::from_bytes(&read_recording_bytes(path)?)
    }

    /// Load a recording for editing.
    ///
    /// A checksum mismatch is reported but does not stop the load.
    pub fn load(&self, path: &Path) -> Result<Recording, RecordingFileError> {
        let file = self.open(path)?;
        if let Err(e) = file.verify_checksum() {
            warn!("{}: {}", path.display(), e);
        }
        let recording = file.into_recording(&DefaultActionFactory)?;
        info!(
            "Loaded {} ({} pages, {} ms)",
            path.display(),
            recording.events().len(),
            recording.duration()
        );
        Ok(recording)
    }

    /// Write `recording` to `path`, gzip-compressed for `.lrec.gz`.
    ///
    /// With `backup` set an existing file is first rotated into the numbered
    /// backups. The file is written next to its target and renamed into
    /// place. Returns the backup path, if one was made.
    pub fn save(
        &self,
        recording: &Recording,
        path: &Path,
        backup: bool,
    ) -> Result<Option<PathBuf>, RecordingFileError> {
        let file = RecordingFile::from_recording(recording)?;

        let backup_path = if backup && path.is_file() {
            self.backup(path)?
        } else {
            None
        };

        let tmp_path = path.with_file_name(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("recording")
        ));
        let written = write_container(&file, &tmp_path, is_compressed(path))
            .and_then(|()| Ok(fs::rename(&tmp_path, path)?));
        if let Err(e) = written {
            match fs::remove_file(&tmp_path) {
                Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                    warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
                }
                _ => {}
            }
            return Err(e);
        }

        info!(
            "Saved {} ({} ms, checksum {})",
            path.display(),
            file.header.duration,
            checksum_hex(&file.header.checksum)
        );
        Ok(backup_path)
    }

    /// Copy `path` to `<path>.1`, shifting older backups up by one and
    /// dropping the oldest. Returns `None` when backups are disabled.
    pub fn backup(&self, path: &Path) -> Result<Option<PathBuf>, RecordingFileError> {
        if self.max_backups == 0 {
            return Ok(None);
        }

        let numbered = |n: usize| {
            let mut name = path.as_os_str().to_owned();
            name.push(format!(".{}", n));
            PathBuf::from(name)
        };

        let oldest = numbered(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_backups).rev() {
            let from = numbered(n);
            if from.exists() {
                fs::rename(&from, numbered(n + 1))?;
            }
        }

        let target = numbered(1);
        fs::copy(path, &target)?;
        debug!("Backed up {} to {}", path.display(), target.display());
        Ok(Some(target))
    }

    /// Check if a path is safely within our base directory
    fn is_safe_path(&self, path: &Path) -> bool {
        let Ok(base) = self.base_dir.canonicalize() else {
            return false;
        };
        match path.canonicalize() {
            Ok(canonical) => canonical.starts_with(&base),
            Err(_) => {
                // Path doesn't exist yet, check parent
                path.parent()
                    .and_then(|parent| parent.canonicalize().ok())
                    .map(|parent| parent.starts_with(&base))
                    .unwrap_or(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::{AudioFormat, PagedDocument, RecordedPage, RecordingHeader, WavAudio};
    use tempfile::TempDir;

    fn create_test_manager() -> (RecordingManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let manager = RecordingManager::with_base_dir(temp_dir.path().to_path_buf());
        (manager, temp_dir)
    }

    fn recording(millis: i64) -> Recording {
        let mut events = RecordedEvents::new();
        events.add_page(RecordedPage::new(0, 0));
        Recording::new(
            RecordingHeader::with_duration(millis),
            events,
            Box::new(PagedDocument::new(vec![b"slide".to_vec()])),
            Box::new(WavAudio::silence(AudioFormat::pcm(8000, 1, 16), millis)),
        )
    }

    #[test]
    fn test_save_and_load() {
        let (manager, temp) = create_test_manager();
        let path = temp.path().join("lecture.lrec");

        assert_eq!(manager.save(&recording(2000), &path, true).unwrap(), None);
        let loaded = manager.load(&path).unwrap();
        assert_eq!(loaded.duration(), 2000);
        assert_eq!(loaded.events().len(), 1);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let (manager, temp) = create_test_manager();
        let path = temp.path().join("lecture.lrec.gz");

        manager.save(&recording(1000), &path, false).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[0..2], &[0x1f, 0x8b]);

        let loaded = manager.load(&path).unwrap();
        assert_eq!(loaded.duration(), 1000);
    }

    #[test]
    fn test_backups_rotate() {
        let (manager, temp) = create_test_manager();
        let manager = manager.with_max_backups(2);
        let path = temp.path().join("lecture.lrec");

        for millis in [1000, 2000, 3000, 4000] {
            manager.save(&recording(millis), &path, true).unwrap();
        }

        let backup = |n: usize| temp.path().join(format!("lecture.lrec.{}", n));
        assert_eq!(manager.load(&backup(1)).unwrap().duration(), 3000);
        assert_eq!(manager.load(&backup(2)).unwrap().duration(), 2000);
        assert!(!backup(3).exists());
    }

    #[test]
    fn test_no_backup_when_disabled() {
        let (manager, temp) = create_test_manager();
        let manager = manager.with_max_backups(0);
        let path = temp.path().join("lecture.lrec");

        manager.save(&recording(1000), &path, true).unwrap();
        assert_eq!(manager.save(&recording(1000), &path, true).unwrap(), None);
        assert!(!temp.path().join("lecture.lrec.1").exists());
    }

    #[test]
    fn test_list_recordings() {
        let (manager, temp) = create_test_manager();
        manager
            .save(&recording(1500), &temp.path().join("a.lrec"), false)
            .unwrap();
        manager
            .save(&recording(500), &temp.path().join("b.lrec.gz"), false)
            .unwrap();
        fs::write(temp.path().join("notes.txt"), b"ignored").unwrap();
        fs::write(temp.path().join("broken.lrec"), b"LECT").unwrap();

        let mut recordings = manager.list_recordings();
        recordings.sort_by(|a, b| a.filename.cmp(&b.filename));
        assert_eq!(recordings.len(), 2);
        assert_eq!(recordings[0].filename, "a.lrec");
        assert_eq!(recordings[0].duration_ms, 1500);
        assert_eq!(recordings[0].page_count, 1);
        assert!(recordings[0].checksum_valid);
        assert!(recordings[1].compressed);
    }

    #[test]
    fn test_resolve() {
        let (manager, temp) = create_test_manager();
        manager
            .save(&recording(500), &temp.path().join("a.lrec"), false)
            .unwrap();

        assert!(manager.resolve(Path::new("a.lrec")).is_ok());
        assert!(matches!(
            manager.resolve(Path::new("missing.lrec")),
            Err(RecordingFileError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_stays_in_base_dir() {
        let temp = TempDir::new().unwrap();
        let manager = RecordingManager::with_base_dir(temp.path().join("base"));
        let outside = temp.path().join("outside.lrec");
        manager.save(&recording(500), &outside, false).unwrap();

        assert!(matches!(
            manager.resolve(Path::new("../outside.lrec")),
            Err(RecordingFileError::InvalidPath(_))
        ));
        assert_eq!(manager.resolve(&outside).unwrap(), outside);
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let (manager, temp) = create_test_manager();
        let path = temp.path().join("taken.lrec");
        fs::create_dir(&path).unwrap();

        assert!(manager.save(&recording(500), &path, false).is_err());
        assert!(!temp.path().join(".taken.lrec.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_missing_file() {
        let (manager, temp) = create_test_manager();
        assert!(matches!(
            manager.load(&temp.path().join("nope.lrec")),
            Err(RecordingFileError::NotFound(_))
        ));
    }
}
