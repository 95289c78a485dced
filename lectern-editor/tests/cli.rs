use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use lectern_core::{
    ActionKind, AudioFormat, PagedDocument, RecordedAction, RecordedEvents, RecordedPage,
    Recording, RecordingHeader, WavAudio,
};
use lectern_editor::commands::Session;
use lectern_editor::config::EditorSettings;
use lectern_editor::recording::{RecordingFileError, RecordingManager};
use lectern_editor::{Command, OutputArgs};

fn lecture(pages: &[i32], millis: i64) -> Recording {
    let mut events = RecordedEvents::new();
    for (i, ts) in pages.iter().enumerate() {
        let mut page = RecordedPage::new(i as i32, *ts);
        page.add_playback_action(RecordedAction::boxed(ActionKind::Key, *ts + 100));
        events.add_page(page);
    }
    Recording::new(
        RecordingHeader::with_duration(millis),
        events,
        Box::new(PagedDocument::new(
            pages.iter().map(|ts| ts.to_le_bytes().to_vec()).collect(),
        )),
        Box::new(WavAudio::silence(AudioFormat::pcm(8000, 1, 16), millis)),
    )
}

struct Fixture {
    temp: TempDir,
    session: Session,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let settings = EditorSettings {
            recordings_dir: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        let session = Session::with_settings(settings);
        let fixture = Self { temp, session };
        fixture.write("lecture.lrec", &lecture(&[0, 3000, 7000], 10_000));
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    fn write(&self, name: &str, recording: &Recording) {
        RecordingManager::with_base_dir(self.temp.path().to_path_buf())
            .save(recording, &self.path(name), false)
            .unwrap();
    }

    fn read(&self, name: &str) -> Recording {
        RecordingManager::with_base_dir(self.temp.path().to_path_buf())
            .load(&self.path(name))
            .unwrap()
    }

    fn run(&self, command: Command) -> Result<String, RecordingFileError> {
        let mut out = Vec::new();
        self.session.run(&command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }
}

fn in_place() -> OutputArgs {
    OutputArgs::default()
}

fn to(path: &Path) -> OutputArgs {
    OutputArgs {
        output: Some(path.to_path_buf()),
        no_backup: false,
    }
}

#[test]
fn cut_overwrites_and_backs_up() {
    let fx = Fixture::new();

    let out = fx
        .run(Command::Cut {
            file: "lecture.lrec".into(),
            start: 1000,
            end: 2000,
            output: in_place(),
        })
        .unwrap();

    assert!(out.contains("3 pages, 0:09.000"), "{}", out);
    assert!(out.contains("backup:"), "{}", out);
    assert_eq!(fx.read("lecture.lrec").duration(), 9000);
    assert_eq!(fx.read("lecture.lrec.1").duration(), 10_000);
}

#[test]
fn no_backup_flag_skips_backup() {
    let fx = Fixture::new();

    fx.run(Command::Cut {
        file: "lecture.lrec".into(),
        start: 0,
        end: 500,
        output: OutputArgs {
            output: None,
            no_backup: true,
        },
    })
    .unwrap();

    assert!(!fx.path("lecture.lrec.1").exists());
    assert_eq!(fx.read("lecture.lrec").duration(), 9500);
}

#[test]
fn delete_page_to_other_file_leaves_input() {
    let fx = Fixture::new();
    let target = fx.path("short.lrec");

    fx.run(Command::DeletePage {
        file: "lecture.lrec".into(),
        page: 1,
        output: to(&target),
    })
    .unwrap();

    let edited = fx.read("short.lrec");
    assert_eq!(edited.duration(), 6000);
    let timetable: Vec<(i32, i32)> = edited
        .events()
        .pages()
        .iter()
        .map(|p| (p.number(), p.timestamp()))
        .collect();
    assert_eq!(timetable, vec![(0, 0), (1, 3000)]);
    assert_eq!(edited.document().page_count(), 2);

    assert_eq!(fx.read("lecture.lrec").duration(), 10_000);
    assert!(!fx.path("lecture.lrec.1").exists());
}

#[test]
fn undone_script_reports_unchanged() {
    let fx = Fixture::new();
    let before = fs::read(fx.path("lecture.lrec")).unwrap();
    fs::write(
        fx.path("noop.json"),
        r#"[{"op": "cut", "start": 4000, "end": 5000}, {"op": "undo"}]"#,
    )
    .unwrap();

    let out = fx
        .run(Command::Apply {
            file: "lecture.lrec".into(),
            script: fx.path("noop.json"),
            output: in_place(),
        })
        .unwrap();

    assert!(out.contains("unchanged"), "{}", out);
    assert_eq!(fs::read(fx.path("lecture.lrec")).unwrap(), before);
}

#[test]
fn empty_cut_is_rejected() {
    let fx = Fixture::new();
    let result = fx.run(Command::Cut {
        file: "lecture.lrec".into(),
        start: 4000,
        end: 4000,
        output: in_place(),
    });
    assert!(matches!(result, Err(RecordingFileError::Edit(_))));
}

#[test]
fn failed_edit_leaves_file_alone() {
    let fx = Fixture::new();
    let before = fs::read(fx.path("lecture.lrec")).unwrap();

    let result = fx.run(Command::DeletePage {
        file: "lecture.lrec".into(),
        page: 9,
        output: in_place(),
    });

    assert!(matches!(result, Err(RecordingFileError::Edit(_))));
    assert_eq!(fs::read(fx.path("lecture.lrec")).unwrap(), before);
}

#[test]
fn insert_recording() {
    let fx = Fixture::new();
    fx.write("intro.lrec", &lecture(&[0], 2000));

    fx.run(Command::Insert {
        file: "lecture.lrec".into(),
        source: "intro.lrec".into(),
        at: 0.0,
        output: to(&fx.path("combined.lrec")),
    })
    .unwrap();

    let combined = fx.read("combined.lrec");
    assert_eq!(combined.duration(), 12_000);
    assert_eq!(combined.events().len(), 4);
    assert_eq!(combined.document().page_count(), 4);
    assert_eq!(combined.events().pages()[1].timestamp(), 2000);
}

#[test]
fn verify_detects_tampering() {
    let fx = Fixture::new();

    let out = fx
        .run(Command::Verify {
            file: "lecture.lrec".into(),
        })
        .unwrap();
    assert!(out.contains("ok, 3 pages"), "{}", out);

    let mut bytes = fs::read(fx.path("lecture.lrec")).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(fx.path("lecture.lrec"), bytes).unwrap();

    let result = fx.run(Command::Verify {
        file: "lecture.lrec".into(),
    });
    assert!(matches!(
        result,
        Err(RecordingFileError::ChecksumMismatch { .. })
    ));
}

#[test]
fn info_json() {
    let fx = Fixture::new();

    let out = fx
        .run(Command::Info {
            file: "lecture.lrec".into(),
            json: true,
        })
        .unwrap();

    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["checksumValid"], true);
    assert_eq!(report["header"]["duration"], 10_000);
    assert_eq!(report["header"]["checksum"].as_str().map(str::len), Some(40));
}

#[test]
fn pages_json() {
    let fx = Fixture::new();

    let out = fx
        .run(Command::Pages {
            file: "lecture.lrec".into(),
            json: true,
        })
        .unwrap();

    let pages: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(pages.as_array().map(Vec::len), Some(3));
    assert_eq!(pages[1]["startMs"], 3000);
    assert_eq!(pages[2]["lengthMs"], 3000);
    assert_eq!(pages[0]["actionsByKind"]["Key"], 1);
}

#[test]
fn list_configured_directory() {
    let fx = Fixture::new();
    fx.write("other.lrec.gz", &lecture(&[0], 1000));
    fs::write(fx.path("notes.txt"), "not a recording").unwrap();

    let out = fx
        .run(Command::List {
            dir: None,
            json: true,
        })
        .unwrap();

    let listed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let mut names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["filename"].as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["lecture.lrec", "other.lrec.gz"]);
}

#[test]
fn apply_script() {
    let fx = Fixture::new();
    fs::write(
        fx.path("edits.json"),
        r#"[
            {"op": "cut", "start": 0, "end": 1000},
            {"op": "deletePage", "page": 2},
            {"op": "undo"}
        ]"#,
    )
    .unwrap();

    fx.run(Command::Apply {
        file: "lecture.lrec".into(),
        script: fx.path("edits.json"),
        output: in_place(),
    })
    .unwrap();

    let edited = fx.read("lecture.lrec");
    assert_eq!(edited.duration(), 9000);
    assert_eq!(edited.events().len(), 3);
}

#[test]
fn missing_recording() {
    let fx = Fixture::new();
    let result = fx.run(Command::Info {
        file: "absent.lrec".into(),
        json: false,
    });
    assert!(matches!(result, Err(RecordingFileError::NotFound(_))));
}
