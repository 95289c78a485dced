//! The recording: four time-aligned streams edited together.
//!
//! ```text
//!   Recording
//!   ├── header    duration, chunk lengths        EditHeaderAction
//!   ├── events    pages of timed actions          EventsEdit
//!   ├── document  one slide per page number       DocumentEdit
//!   └── audio     PCM frames                      AudioEdit
//! ```
//!
//! A user-level edit (cut, delete page, insert) is planned first: one action
//! per affected stream. The actions then run in a fixed order, header,
//! events, document, audio, and each lands on its own stream's history. The
//! recording logs which streams each transaction touched, so undo and redo
//! step exactly those histories together.
//!
//! If a step fails, the streams already edited in that transaction are
//! undone again before the error is returned. Audio actions are built before
//! anything executes so format errors are caught up front.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::audio::{AudioStream, RecordedAudio};
use crate::document::{DocumentStream, RecordedDocument};
use crate::edit::{
    AudioEdit, DeleteAudioAction, DeleteDocumentAction, DeleteEventsAction, DeletePageAction,
    DocumentEdit, EditHeaderAction, EventsEdit, InsertAudioAction, InsertDocumentAction,
    InsertEventsAction, ShiftEventsAction,
};
use crate::error::EditError;
use crate::events::RecordedEvents;
use crate::header::RecordingHeader;
use crate::interval::Interval;
use crate::stream::{EditableStream, RecordedStream};

/// Default distance in milliseconds within which an insert point snaps to a
/// page boundary.
pub const DEFAULT_SNAP_MARGIN: i32 = 250;

/// What a change notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContentKind {
    All,
    Header,
    Audio,
    Document,
    EventsAdded,
    EventsChanged,
    EventsRemoved,
}

pub type ListenerId = usize;

type ChangeListener = Box<dyn FnMut(&Recording, ContentKind) + Send>;

/// One planned stream edit.
enum StreamEdit {
    Header(EditHeaderAction),
    Events(EventsEdit),
    Document(DocumentEdit),
    Audio(AudioEdit),
}

impl StreamEdit {
    fn stream(&self) -> Streams {
        match self {
            StreamEdit::Header(_) => Streams::HEADER,
            StreamEdit::Events(_) => Streams::EVENTS,
            StreamEdit::Document(_) => Streams::DOCUMENT,
            StreamEdit::Audio(_) => Streams::AUDIO,
        }
    }
}

bitflags! {
    /// Streams touched by one transaction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Streams: u8 {
        const HEADER = 0b0001;
        const EVENTS = 0b0010;
        const DOCUMENT = 0b0100;
        const AUDIO = 0b1000;
    }
}

/// Order in which undo and redo visit the streams.
const STEP_ORDER: [Streams; 4] = [
    Streams::EVENTS,
    Streams::DOCUMENT,
    Streams::AUDIO,
    Streams::HEADER,
];

pub struct Recording {
    header: RecordedStream<RecordingHeader>,
    events: RecordedStream<RecordedEvents>,
    document: RecordedStream<RecordedDocument>,
    audio: RecordedStream<RecordedAudio>,
    camera_name: Vec<u8>,
    tool_demo: Vec<u8>,
    snap_margin: i32,
    undo_log: Vec<Streams>,
    redo_log: Vec<Streams>,
    listeners: Vec<(ListenerId, ChangeListener)>,
    next_listener_id: ListenerId,
}

impl Recording {
    pub fn new(
        header: RecordingHeader,
        events: RecordedEvents,
        document: Box<dyn DocumentStream>,
        audio: Box<dyn AudioStream>,
    ) -> Self {
        Self::from_streams(
            header,
            events,
            RecordedDocument::new(document),
            RecordedAudio::new(audio),
        )
    }

    /// Assemble a recording from already decoded streams.
    pub fn from_streams(
        header: RecordingHeader,
        events: RecordedEvents,
        document: RecordedDocument,
        audio: RecordedAudio,
    ) -> Self {
        Self {
            header: RecordedStream::new(header),
            events: RecordedStream::new(events),
            document: RecordedStream::new(document),
            audio: RecordedStream::new(audio),
            camera_name: Vec::new(),
            tool_demo: Vec::new(),
            snap_margin: DEFAULT_SNAP_MARGIN,
            undo_log: Vec::new(),
            redo_log: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Attach the opaque camera file name and tool demo chunks.
    pub fn with_attachments(mut self, camera_name: Vec<u8>, tool_demo: Vec<u8>) -> Self {
        self.camera_name = camera_name;
        self.tool_demo = tool_demo;
        self
    }

    pub fn with_snap_margin(mut self, margin: i32) -> Self {
        self.snap_margin = margin.max(0);
        self
    }

    pub fn header(&self) -> &RecordingHeader {
        self.header.get()
    }

    pub fn events(&self) -> &RecordedEvents {
        self.events.get()
    }

    pub fn document(&self) -> &RecordedDocument {
        self.document.get()
    }

    pub fn audio(&self) -> &RecordedAudio {
        self.audio.get()
    }

    pub fn camera_name(&self) -> &[u8] {
        &self.camera_name
    }

    pub fn tool_demo(&self) -> &[u8] {
        &self.tool_demo
    }

    pub fn snap_margin(&self) -> i32 {
        self.snap_margin
    }

    /// Length of the audio stream in milliseconds.
    pub fn duration(&self) -> i64 {
        self.audio.get().length_in_millis()
    }

    pub fn get_page_index(&self, time: i32, margin: i32) -> Option<usize> {
        self.events.get().page_index(time, margin)
    }

    pub fn add_change_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Recording, ContentKind) + Send + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let len = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != len
    }

    fn fire_change(&mut self, kind: ContentKind) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(self, kind);
        }
        // Keep listeners registered from inside a callback.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }

    fn checked_interval(&self, start: i64, end: i64) -> Result<Interval<i32>, EditError> {
        let duration = self.duration();
        let invalid = EditError::InvalidInterval {
            start,
            end,
            duration,
        };
        if start < 0 || end > duration || start >= end || end > i32::MAX as i64 {
            return Err(invalid);
        }
        Ok(Interval::new(start as i32, end as i32))
    }

    fn fraction_to_time(&self, fraction: f64) -> i64 {
        (fraction.clamp(0.0, 1.0) * self.duration() as f64) as i64
    }

    /// Remove `[start, end)` milliseconds from every stream.
    pub fn cut(&mut self, start: i64, end: i64) -> Result<(), EditError> {
        let interval = self.checked_interval(start.min(end), start.max(end))?;
        let duration = self.duration();
        info!("cut {} ms from {} ms recording", interval, duration);

        let (events_action, document_action) = plan_cut(self.events.get(), interval, duration);
        let page_count = events_action.removed_pages().len();

        self.commit(vec![
            StreamEdit::Header(EditHeaderAction::new(-(interval.length() as i64))),
            StreamEdit::Events(events_action.into()),
            StreamEdit::Document(document_action.into()),
            StreamEdit::Audio(DeleteAudioAction::new(interval.to_i64()).into()),
        ])?;

        info!("cut {} done, {} pages removed", interval, page_count);
        self.fire_change(ContentKind::All);
        Ok(())
    }

    /// Cut between two relative positions in `[0, 1]`.
    pub fn cut_fraction(&mut self, start: f64, end: f64) -> Result<(), EditError> {
        let start_time = self.fraction_to_time(start.min(end));
        let end_time = self.fraction_to_time(start.max(end));
        self.cut(start_time, end_time)
    }

    /// Remove a page together with the time it was showing.
    pub fn delete_page(&mut self, number: i32) -> Result<(), EditError> {
        let events = self.events.get();
        let index = events
            .position(number)
            .ok_or(EditError::PageNotFound(number))?;
        if events.len() == 1 {
            return Err(EditError::Failure(
                "cannot delete the only page of a recording".into(),
            ));
        }

        let start = events.pages()[index].timestamp() as i64;
        let end = events
            .pages()
            .get(index + 1)
            .map(|p| p.timestamp() as i64)
            .unwrap_or_else(|| self.duration());
        let interval = Interval::new(start, end.max(start));
        let doc_index = usize::try_from(number).map_err(|_| EditError::PageNotFound(number))?;

        info!("delete page {} showing {}", number, interval);

        let mut document_action = DeleteDocumentAction::new();
        document_action.remove_page(doc_index);

        let event_interval = Interval::new(start as i32, interval.end() as i32);
        self.commit(vec![
            StreamEdit::Header(EditHeaderAction::new(-interval.length())),
            StreamEdit::Events(DeletePageAction::new(number, event_interval).into()),
            StreamEdit::Document(document_action.into()),
            StreamEdit::Audio(DeleteAudioAction::new(interval).into()),
        ])?;

        self.fire_change(ContentKind::All);
        Ok(())
    }

    /// Splice `other` in at a relative position in `[0, 1]`.
    ///
    /// Positions within the snap margin of a page boundary land exactly on
    /// it; anywhere else the page showing at that time is split in two.
    pub fn insert(&mut self, other: &Recording, start: f64) -> Result<(), EditError> {
        let duration = self.duration();
        let insert_duration = other.duration();
        let margin = self.snap_margin;
        let mut time = self.fraction_to_time(start) as i32;

        let events = self.events.get();
        let mut index = events
            .page_index(time, margin)
            .ok_or_else(|| EditError::Failure(format!("no page at {} ms", time)))?;
        let page_time = events
            .pages()
            .get(index)
            .map(|p| p.timestamp())
            .ok_or(EditError::IndexOutOfRange {
                index,
                len: events.len(),
            })?;

        if (page_time - time).abs() < margin {
            debug!("insert time {} ms snapped to page {} at {} ms", time, index, page_time);
            time = page_time;
        }
        let at_end = (duration - time as i64).abs() < margin as i64;
        if at_end {
            time = duration as i32;
            index += 1;
        }
        let split = page_time != time && !at_end;

        info!(
            "insert {} ms recording at {} ms (page index {}, split {})",
            insert_duration, time, index, split
        );

        let audio_action =
            InsertAudioAction::new(self.audio.get().stream(), other.audio().stream(), time as i64)?;
        let document = other.document().document();
        let document_pages = (0..document.page_count())
            .filter_map(|i| document.page(i).map(<[u8]>::to_vec))
            .collect();

        self.commit(vec![
            StreamEdit::Header(EditHeaderAction::new(insert_duration)),
            StreamEdit::Events(
                InsertEventsAction::new(
                    other.events().pages().to_vec(),
                    split,
                    time,
                    index,
                    insert_duration as i32,
                )
                .into(),
            ),
            StreamEdit::Document(InsertDocumentAction::new(document_pages, split, index).into()),
            StreamEdit::Audio(audio_action.into()),
        ])?;

        self.fire_change(ContentKind::All);
        Ok(())
    }

    /// Insert audio at a relative position, moving later events out of the way.
    pub fn insert_audio(&mut self, audio: &dyn AudioStream, start: f64) -> Result<(), EditError> {
        let time = self.fraction_to_time(start);
        let length = audio.length_in_millis();
        let audio_action = InsertAudioAction::new(self.audio.get().stream(), audio, time)?;

        info!("insert {} ms of audio at {} ms", length, time);

        self.commit(vec![
            StreamEdit::Header(EditHeaderAction::new(length)),
            StreamEdit::Events(
                ShiftEventsAction::new(Interval::new(time as i32, (time + length) as i32)).into(),
            ),
            StreamEdit::Audio(audio_action.into()),
        ])?;

        self.fire_change(ContentKind::All);
        Ok(())
    }

    /// Execute planned edits in order, each onto its own stream's history.
    ///
    /// On failure the streams changed so far are undone again.
    fn commit(&mut self, edits: Vec<StreamEdit>) -> Result<(), EditError> {
        let mut applied = Streams::empty();
        for edit in edits {
            let stream = edit.stream();
            let result = match edit {
                StreamEdit::Header(a) => self.header.apply(a),
                StreamEdit::Events(a) => self.events.apply(a),
                StreamEdit::Document(a) => self.document.apply(a),
                StreamEdit::Audio(a) => self.audio.apply(a),
            };
            if let Err(e) = result {
                if !applied.is_empty() {
                    warn!("{:?} edit failed, rolling back {:?}: {}", stream, applied, e);
                    let (undone, rollback) = self.step(applied, true);
                    if let Err(rollback) = rollback {
                        let stuck = applied.difference(undone);
                        error!("rollback failed, {:?} still edited: {}", stuck, rollback);
                        self.undo_log.push(stuck);
                    }
                    self.clear_redo();
                }
                return Err(e);
            }
            applied |= stream;
        }

        self.clear_redo();
        self.undo_log.push(applied);
        Ok(())
    }

    fn clear_redo(&mut self) {
        self.header.clear_redo();
        self.events.clear_redo();
        self.document.clear_redo();
        self.audio.clear_redo();
        self.redo_log.clear();
    }

    /// Undo or redo the latest action of each stream in `streams`.
    ///
    /// Stops at the first failure; returns the streams that were stepped.
    fn step(&mut self, streams: Streams, undo: bool) -> (Streams, Result<(), EditError>) {
        let mut done = Streams::empty();
        for stream in STEP_ORDER {
            if !streams.contains(stream) {
                continue;
            }
            let result = if stream == Streams::EVENTS {
                step_stream(&mut self.events, undo)
            } else if stream == Streams::DOCUMENT {
                step_stream(&mut self.document, undo)
            } else if stream == Streams::AUDIO {
                step_stream(&mut self.audio, undo)
            } else {
                step_stream(&mut self.header, undo)
            };
            match result {
                Ok(true) => done |= stream,
                Ok(false) => {
                    let e = EditError::Failure(format!("{:?} history is empty", stream));
                    return (done, Err(e));
                }
                Err(e) => return (done, Err(e)),
            }
        }
        (done, Ok(()))
    }

    pub fn has_undo_actions(&self) -> bool {
        !self.undo_log.is_empty()
    }

    pub fn has_redo_actions(&self) -> bool {
        !self.redo_log.is_empty()
    }

    /// Undo the last transaction.
    ///
    /// If a stream fails to undo, the streams already undone become a
    /// redoable transaction of their own and the rest stay undoable.
    pub fn undo(&mut self) -> Result<(), EditError> {
        let Some(streams) = self.undo_log.pop() else {
            return Ok(());
        };
        let (done, result) = self.step(streams, true);
        if !done.is_empty() {
            self.redo_log.push(done);
        }
        if let Err(e) = result {
            error!("undo stopped, {:?} not undone: {}", streams.difference(done), e);
            self.undo_log.push(streams.difference(done));
            return Err(e);
        }
        debug!("undo {:?}, duration now {} ms", streams, self.duration());
        self.fire_change(ContentKind::All);
        Ok(())
    }

    /// Redo the last undone transaction.
    pub fn redo(&mut self) -> Result<(), EditError> {
        let Some(streams) = self.redo_log.pop() else {
            return Ok(());
        };
        let (done, result) = self.step(streams, false);
        if !done.is_empty() {
            self.undo_log.push(done);
        }
        if let Err(e) = result {
            error!("redo stopped, {:?} not redone: {}", streams.difference(done), e);
            self.redo_log.push(streams.difference(done));
            return Err(e);
        }
        debug!("redo {:?}, duration now {} ms", streams, self.duration());
        self.fire_change(ContentKind::All);
        Ok(())
    }

    /// Combined hash of all stream contents.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.header.state_hash().hash(&mut hasher);
        self.events.state_hash().hash(&mut hasher);
        self.document.state_hash().hash(&mut hasher);
        self.audio.state_hash().hash(&mut hasher);
        hasher.finish()
    }

    /// Deep copy of the streams, without history or listeners.
    pub fn try_clone(&self) -> Recording {
        Recording {
            header: RecordedStream::new(self.header.get().clone()),
            events: RecordedStream::new(self.events.get().clone()),
            document: RecordedStream::new(self.document.get().try_clone()),
            audio: RecordedStream::new(self.audio.get().try_clone()),
            camera_name: self.camera_name.clone(),
            tool_demo: self.tool_demo.clone(),
            snap_margin: self.snap_margin,
            undo_log: Vec::new(),
            redo_log: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Release all streams, including the document.
    pub fn close(self) {
        debug!(
            "closing recording ({} pages, {} ms)",
            self.events.get().len(),
            self.duration()
        );
    }
}

impl fmt::Debug for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recording")
            .field("header", &self.header)
            .field("events", &self.events)
            .field("document", &self.document)
            .field("audio", &self.audio)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn step_stream<S: EditableStream>(
    stream: &mut RecordedStream<S>,
    undo: bool,
) -> Result<bool, EditError> {
    if undo {
        stream.undo()
    } else {
        stream.redo()
    }
}

/// Decide which pages a cut removes, clips, or moves.
///
/// Walks the pages in order; the first matching rule wins:
///
/// 1. The page starts inside the cut and so does the next one (or it is the
///    last of several pages and the cut reaches the end): remove it.
/// 2. The page starts inside the cut: clip its start, move it to the cut
///    start, stop.
/// 3. The next page starts inside the cut: clip this page's tail.
/// 4. The cut lies within this page: clip the cut, stop.
///
/// Page boundaries are compared inclusively so a page whose successor
/// begins exactly at the cut end counts as fully covered.
fn plan_cut(
    events: &RecordedEvents,
    interval: Interval<i32>,
    duration: i64,
) -> (DeleteEventsAction, DeleteDocumentAction) {
    let mut events_action = DeleteEventsAction::new(interval);
    let mut document_action = DeleteDocumentAction::new();

    let timetable = events.timetable();
    let count = timetable.len();
    let reaches_end = interval.end() as i64 == duration;

    for (i, (number, time)) in timetable.iter().copied().enumerate() {
        let next = timetable.get(i + 1).map(|(_, t)| *t);
        let next_inside = next.map(|t| interval.encloses(t)).unwrap_or(false);
        let is_last = i + 1 == count;

        if interval.encloses(time) {
            if next_inside || (is_last && count > 1 && reaches_end) {
                debug!("cut removes page {}", number);
                events_action.remove_recorded_page(number);
                if let Ok(index) = usize::try_from(number) {
                    document_action.remove_page(index);
                }
            } else {
                debug!("cut moves page {} to {} ms", number, interval.start());
                events_action.change_recorded_page(number, Interval::new(time, interval.end()));
                events_action.set_shift_page(number);
                break;
            }
        } else if let (true, Some(next)) = (next_inside, next) {
            debug!("cut clips the tail of page {}", number);
            events_action.change_recorded_page(number, Interval::new(interval.start(), next));
        } else if time < interval.start()
            && (is_last || next.map(|t| interval.end() < t).unwrap_or(true))
        {
            debug!("cut clips the middle of page {}", number);
            events_action.change_recorded_page(number, interval);
            break;
        }
    }

    (events_action, document_action)
}
