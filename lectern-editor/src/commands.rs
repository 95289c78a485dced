//! Command implementations.
//!
//! Output goes to the writer passed in so the commands can be run from tests.

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use lectern_core::{checksum_hex, DefaultActionFactory, Recording, RecordingHeader};

use crate::config::{settings_path, EditorSettings};
use crate::outline::summarize;
use crate::recording::{RecordingFileError, RecordingManager};
use crate::script::{load_wav, EditScript};
use crate::{Cli, Command, OutputArgs};

type Result<T> = std::result::Result<T, RecordingFileError>;

/// `m:ss.mmm`
pub fn format_millis(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.unsigned_abs();
    format!(
        "{}{}:{:02}.{:03}",
        sign,
        millis / 60_000,
        (millis / 1000) % 60,
        millis % 1000
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoReport<'a> {
    file: &'a Path,
    header: &'a RecordingHeader,
    checksum_valid: bool,
}

/// Settings plus the file manager they configure.
pub struct Session {
    settings: EditorSettings,
    manager: RecordingManager,
}

impl Session {
    pub fn new(args: &Cli) -> Self {
        let path = args.config.clone().unwrap_or_else(settings_path);
        let mut settings = EditorSettings::load(&path);
        if let Some(margin) = args.snap_margin {
            settings.snap_to_page_margin_ms = margin;
        }
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: EditorSettings) -> Self {
        let manager = RecordingManager::new(&settings);
        Self { settings, manager }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn run<W: Write>(&self, command: &Command, out: &mut W) -> Result<()> {
        match command {
            Command::Info { file, json } => self.info(file, *json, out),
            Command::Pages { file, json } => self.pages(file, *json, out),
            Command::Verify { file } => self.verify(file, out),
            Command::List { dir, json } => self.list(dir.as_deref(), *json, out),
            Command::Cut {
                file,
                start,
                end,
                output,
            } => self.edit(file, output, out, |rec| Ok(rec.cut(*start, *end)?)),
            Command::DeletePage { file, page, output } => {
                self.edit(file, output, out, |rec| Ok(rec.delete_page(*page)?))
            }
            Command::Insert {
                file,
                source,
                at,
                output,
            } => {
                let other = self.manager.load(&self.manager.resolve(source)?)?;
                self.edit(file, output, out, |rec| Ok(rec.insert(&other, *at)?))
            }
            Command::InsertAudio {
                file,
                audio,
                at,
                output,
            } => {
                let audio = load_wav(audio)?;
                self.edit(file, output, out, |rec| Ok(rec.insert_audio(&audio, *at)?))
            }
            Command::Apply {
                file,
                script,
                output,
            } => {
                let edits = EditScript::load(script)?;
                let base_dir = script
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                self.edit(file, output, out, |rec| {
                    let steps = edits.apply(rec, &self.manager, &base_dir)?;
                    info!("Applied {} edit steps", steps);
                    Ok(())
                })
            }
        }
    }

    fn info<W: Write>(&self, file: &Path, json: bool, out: &mut W) -> Result<()> {
        let path = self.manager.resolve(file)?;
        let recording = self.manager.open(&path)?;
        let checksum_valid = recording.verify_checksum().is_ok();
        let header = &recording.header;

        if json {
            let report = InfoReport {
                file: &path,
                header,
                checksum_valid,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
            return Ok(());
        }

        writeln!(out, "File:        {}", path.display())?;
        writeln!(out, "Version:     {}", header.version)?;
        writeln!(
            out,
            "Duration:    {} ({} ms)",
            format_millis(header.duration),
            header.duration
        )?;
        writeln!(
            out,
            "Checksum:    {} ({})",
            checksum_hex(&header.checksum),
            if checksum_valid { "valid" } else { "MISMATCH" }
        )?;
        writeln!(out, "Events:      {} bytes", header.events_length)?;
        writeln!(out, "Document:    {} bytes", header.document_length)?;
        writeln!(out, "Audio:       {} bytes", header.audio_length)?;
        writeln!(out, "Camera name: {} bytes", header.camera_name_length)?;
        writeln!(out, "Tool demo:   {} bytes", header.tool_demo_length)?;
        Ok(())
    }

    fn pages<W: Write>(&self, file: &Path, json: bool, out: &mut W) -> Result<()> {
        let recording = self.load(file)?;
        let pages = summarize(&recording);

        if json {
            serde_json::to_writer_pretty(&mut *out, &pages)?;
            writeln!(out)?;
            return Ok(());
        }

        writeln!(
            out,
            "{:>5}  {:>10}  {:>10}  {:>7}  actions",
            "page", "start", "length", "static"
        )?;
        for page in &pages {
            let kinds: Vec<String> = page
                .actions_by_kind
                .iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            writeln!(
                out,
                "{:>5}  {:>10}  {:>10}  {:>7}  {}",
                page.number,
                format_millis(page.start_ms as i64),
                format_millis(page.length_ms),
                page.static_actions,
                kinds.join(", ")
            )?;
        }
        Ok(())
    }

    fn verify<W: Write>(&self, file: &Path, out: &mut W) -> Result<()> {
        let path = self.manager.resolve(file)?;
        let container = self.manager.open(&path)?;
        container.verify_checksum()?;
        let recording = container.into_recording(&DefaultActionFactory)?;

        let pages = recording.events().len();
        let document_pages = recording.document().page_count();
        if pages != document_pages {
            warn!(
                "{} has {} event pages but {} document pages",
                path.display(),
                pages,
                document_pages
            );
        }
        writeln!(
            out,
            "{}: ok, {} pages, {}",
            path.display(),
            pages,
            format_millis(recording.duration())
        )?;
        Ok(())
    }

    fn list<W: Write>(&self, dir: Option<&Path>, json: bool, out: &mut W) -> Result<()> {
        let recordings = match dir {
            Some(dir) => RecordingManager::with_base_dir(dir.to_path_buf()).list_recordings(),
            None => self.manager.list_recordings(),
        };

        if json {
            serde_json::to_writer_pretty(&mut *out, &recordings)?;
            writeln!(out)?;
            return Ok(());
        }

        for info in &recordings {
            let modified = info
                .modified
                .map(|m| DateTime::<Local>::from(m).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            writeln!(
                out,
                "{:<32}  {:>10}  {:>4} pages  {:>10} bytes  {}{}",
                info.filename,
                format_millis(info.duration_ms),
                info.page_count,
                info.size,
                modified,
                if info.checksum_valid { "" } else { "  (checksum mismatch)" }
            )?;
        }
        debug!("Listed {} recordings", recordings.len());
        Ok(())
    }

    fn load(&self, file: &Path) -> Result<Recording> {
        let path = self.manager.resolve(file)?;
        Ok(self
            .manager
            .load(&path)?
            .with_snap_margin(self.settings.snap_to_page_margin_ms))
    }

    /// Load `file`, run `f` on it and save the result.
    fn edit<W, F>(&self, file: &Path, output: &OutputArgs, out: &mut W, f: F) -> Result<()>
    where
        W: Write,
        F: FnOnce(&mut Recording) -> Result<()>,
    {
        let path = self.manager.resolve(file)?;
        let mut recording = self.load(&path)?;
        let before = recording.state_hash();

        f(&mut recording)?;

        let target: PathBuf = output.output.clone().unwrap_or_else(|| path.clone());
        if target == path && recording.state_hash() == before {
            writeln!(out, "{}: unchanged", path.display())?;
            return Ok(());
        }

        let backup = self.settings.backup_on_save && !output.no_backup;
        let backup_path = self.manager.save(&recording, &target, backup)?;

        writeln!(
            out,
            "{}: {} pages, {}",
            target.display(),
            recording.events().len(),
            format_millis(recording.duration())
        )?;
        if let Some(backup_path) = backup_path {
            writeln!(out, "backup: {}", backup_path.display())?;
        }
        recording.close();
        Ok(())
    }
}
