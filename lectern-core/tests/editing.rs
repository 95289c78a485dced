//! Cross-stream editing scenarios.

use lectern_core::action::tool_payload;
use lectern_core::{
    ActionKind, AudioFormat, DefaultActionFactory, EditableStream, PagedDocument, PenPoint,
    PlaybackAction, RecordedAction, RecordedEvents, RecordedPage, Recording, RecordingHeader,
    WavAudio,
};

fn point(n: f32) -> PenPoint {
    PenPoint::new(n, n * 2.0, 0.5)
}

/// Three pages; page 1 has a stroke crossing 6000 ms.
fn lecture() -> Recording {
    let mut events = RecordedEvents::new();

    let mut intro = RecordedPage::new(0, 0);
    intro.add_playback_action(RecordedAction::boxed(ActionKind::Key, 500));

    let mut body = RecordedPage::new(1, 4000);
    body.add_static_action(RecordedAction::boxed(ActionKind::Latex, 0));
    body.add_playback_action(RecordedAction::boxed(ActionKind::Pen, 5000));
    body.add_playback_action(Box::new(RecordedAction::new(
        ActionKind::ToolBegin,
        5000,
        tool_payload(point(0.0)),
    )));
    for (i, t) in [5500, 6500, 7000].iter().enumerate() {
        body.add_playback_action(RecordedAction::tool(
            ActionKind::ToolExecute,
            *t,
            point(i as f32 + 1.0),
        ));
    }
    body.add_playback_action(RecordedAction::tool(ActionKind::ToolEnd, 7500, point(9.0)));

    let mut outro = RecordedPage::new(2, 9000);
    outro.add_playback_action(RecordedAction::boxed(ActionKind::ZoomOut, 9500));

    events.add_page(intro);
    events.add_page(body);
    events.add_page(outro);

    Recording::new(
        RecordingHeader::with_duration(12_000),
        events,
        Box::new(PagedDocument::new(vec![
            b"intro".to_vec(),
            b"body".to_vec(),
            b"outro".to_vec(),
        ])),
        Box::new(WavAudio::silence(AudioFormat::pcm(8000, 1, 16), 12_000)),
    )
}

fn kinds_and_times(page: &RecordedPage) -> Vec<(ActionKind, i32)> {
    page.playback_actions()
        .iter()
        .map(|a| (a.kind(), a.timestamp()))
        .collect()
}

#[test]
fn test_cut_repairs_stroke_and_shifts_later_pages() {
    let mut rec = lecture();
    rec.cut(6000, 8000).unwrap();

    let pages = rec.events().pages();
    assert_eq!(rec.events().timetable(), vec![(0, 0), (1, 4000), (2, 7000)]);
    assert_eq!(
        kinds_and_times(&pages[1]),
        vec![
            (ActionKind::Pen, 5000),
            (ActionKind::ToolBegin, 5000),
            (ActionKind::ToolExecute, 5500),
            (ActionKind::ToolEnd, 6000),
        ]
    );
    assert_eq!(kinds_and_times(&pages[2]), vec![(ActionKind::ZoomOut, 7500)]);
    assert_eq!(rec.duration(), 10_000);
}

#[test]
fn test_cut_undo_restores_every_stream() {
    let mut rec = lecture();
    let events_before = rec.events().to_bytes();
    let audio_before = rec.audio().to_bytes();
    let hash = rec.state_hash();

    rec.cut(3000, 9500).unwrap();
    assert_eq!(rec.events().len(), 2);
    assert_eq!(rec.document().page_count(), 2);

    rec.undo().unwrap();
    assert_eq!(rec.events().to_bytes(), events_before);
    assert_eq!(rec.audio().to_bytes(), audio_before);
    assert_eq!(rec.document().page_count(), 3);
    assert_eq!(rec.state_hash(), hash);
}

#[test]
fn test_edited_events_survive_encoding() {
    let mut rec = lecture();
    rec.cut(5200, 6800).unwrap();
    rec.delete_page(0).unwrap();

    let bytes = rec.events().to_bytes();
    let parsed = RecordedEvents::parse(&bytes, &DefaultActionFactory).unwrap();
    assert_eq!(&parsed, rec.events());
    assert_eq!(parsed.pages()[0].number(), 0);
}

#[test]
fn test_insert_then_cut_back_out() {
    let mut rec = lecture();
    let mut clip = lecture();
    clip.cut(1000, 12_000).unwrap();
    assert_eq!(clip.duration(), 1000);

    rec.insert(&clip, 0.5).unwrap();
    assert_eq!(rec.duration(), 13_000);
    assert_eq!(rec.header().duration, 13_000);

    // The clip went in at 6000 ms, splitting page 1.
    let timetable = rec.events().timetable();
    assert_eq!(timetable[2], (2, 6000));
    assert_eq!(rec.events().len(), rec.document().page_count());

    rec.undo().unwrap();
    assert_eq!(rec.duration(), 12_000);
    assert_eq!(rec.events().len(), 3);
    assert_eq!(rec.document().page_count(), 3);
}

#[test]
fn test_redo_cleared_by_new_edit() {
    let mut rec = lecture();
    rec.cut(0, 1000).unwrap();
    rec.undo().unwrap();
    assert!(rec.has_redo_actions());

    rec.cut(2000, 3000).unwrap();
    assert!(!rec.has_redo_actions());
}
