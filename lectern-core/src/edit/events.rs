use log::debug;

use crate::error::EditError;
use crate::events::RecordedEvents;
use crate::history::EditAction;
use crate::interval::Interval;
use crate::page::RecordedPage;

/// Run `edit` against the pages, restoring them if it fails.
///
/// Returns the pre-image on success.
fn with_backup<F>(events: &mut RecordedEvents, edit: F) -> Result<Vec<RecordedPage>, EditError>
where
    F: FnOnce(&mut RecordedEvents) -> Result<(), EditError>,
{
    let backup = events.pages().to_vec();
    match edit(events) {
        Ok(()) => Ok(backup),
        Err(e) => {
            *events.pages_mut() = backup;
            Err(e)
        }
    }
}

fn restore(events: &mut RecordedEvents, backup: &mut Option<Vec<RecordedPage>>) -> Result<(), EditError> {
    let pages = backup.take().ok_or(EditError::NotExecuted)?;
    *events.pages_mut() = pages;
    Ok(())
}

/// Close the numbering gaps left by removed pages.
fn close_number_gaps(events: &mut RecordedEvents, removed: &[i32]) {
    for page in events.pages_mut() {
        let below = removed.iter().filter(|n| **n < page.number()).count() as i32;
        page.set_number(page.number() - below);
    }
}

/// Moves every page and action at or after `interval.start` later by the
/// interval length.
#[derive(Debug, Clone)]
pub struct ShiftEventsAction {
    interval: Interval<i32>,
    backup: Option<Vec<RecordedPage>>,
}

impl ShiftEventsAction {
    pub fn new(interval: Interval<i32>) -> Self {
        Self {
            interval,
            backup: None,
        }
    }
}

impl EditAction<RecordedEvents> for ShiftEventsAction {
    fn execute(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        let interval = self.interval;
        self.backup = Some(with_backup(events, |events| {
            for page in events.pages_mut() {
                page.shift_right(interval);
            }
            Ok(())
        })?);
        Ok(())
    }

    fn undo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        restore(events, &mut self.backup)
    }

    fn redo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        self.execute(events)
    }
}

/// Removes the events inside an interval.
///
/// Built up by the cut planner: whole pages to remove, pages to clip, and
/// at most one page that moves to the start of the interval.
#[derive(Debug, Clone)]
pub struct DeleteEventsAction {
    interval: Interval<i32>,
    removed_pages: Vec<i32>,
    page_changes: Vec<(i32, Interval<i32>)>,
    shift_page: Option<i32>,
    backup: Option<Vec<RecordedPage>>,
}

impl DeleteEventsAction {
    pub fn new(interval: Interval<i32>) -> Self {
        Self {
            interval,
            removed_pages: Vec::new(),
            page_changes: Vec::new(),
            shift_page: None,
            backup: None,
        }
    }

    pub fn remove_recorded_page(&mut self, number: i32) {
        self.removed_pages.push(number);
    }

    pub fn change_recorded_page(&mut self, number: i32, interval: Interval<i32>) {
        self.page_changes.push((number, interval));
    }

    pub fn set_shift_page(&mut self, number: i32) {
        self.shift_page = Some(number);
    }

    pub fn removed_pages(&self) -> &[i32] {
        &self.removed_pages
    }

    fn apply(&self, events: &mut RecordedEvents) -> Result<(), EditError> {
        for number in &self.removed_pages {
            events.remove_page(*number)?;
        }

        for (number, interval) in &self.page_changes {
            events
                .page_mut(*number)
                .ok_or(EditError::PageNotFound(*number))?
                .cut(*interval);
        }

        if let Some(number) = self.shift_page {
            events
                .page_mut(number)
                .ok_or(EditError::PageNotFound(number))?
                .set_timestamp(self.interval.start());
        }

        for page in events.pages_mut() {
            page.shift(self.interval);
        }
        close_number_gaps(events, &self.removed_pages);
        Ok(())
    }
}

impl EditAction<RecordedEvents> for DeleteEventsAction {
    fn execute(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        debug!(
            "delete events {}: remove {:?}, clip {:?}, shift {:?}",
            self.interval, self.removed_pages, self.page_changes, self.shift_page
        );
        self.backup = Some(with_backup(events, |events| self.apply(events))?);
        Ok(())
    }

    fn undo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        restore(events, &mut self.backup)
    }

    fn redo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        self.execute(events)
    }
}

/// Splices the pages of another recording in at `time`.
#[derive(Debug, Clone)]
pub struct InsertEventsAction {
    pages: Vec<RecordedPage>,
    split: bool,
    time: i32,
    index: usize,
    duration: i32,
    backup: Option<Vec<RecordedPage>>,
}

impl InsertEventsAction {
    /// Insert `pages` (timed from zero) before the page at `index`, or split
    /// that page at `time` and insert after its first half when `split` is set.
    /// Everything from `time` on moves `duration` ms later.
    pub fn new(pages: Vec<RecordedPage>, split: bool, time: i32, index: usize, duration: i32) -> Self {
        Self {
            pages,
            split,
            time,
            index,
            duration,
            backup: None,
        }
    }

    fn apply(&self, events: &mut RecordedEvents) -> Result<(), EditError> {
        let len = events.len();
        let mut at = self.index;

        if self.split {
            let page = events
                .pages_mut()
                .get_mut(at)
                .ok_or(EditError::IndexOutOfRange { index: at, len })?;
            let tail = page.split(self.time);
            at += 1;
            events.insert_page(at, tail)?;
        } else if at > len {
            return Err(EditError::IndexOutOfRange { index: at, len });
        }

        let gap = Interval::new(self.time, self.time + self.duration);
        for page in events.pages_mut() {
            page.shift_right(gap);
        }

        let offset = Interval::new(0, self.time);
        for (i, page) in self.pages.iter().enumerate() {
            let mut page = page.clone();
            page.shift_right(offset);
            events.insert_page(at + i, page)?;
        }

        events.renumber();
        Ok(())
    }
}

impl EditAction<RecordedEvents> for InsertEventsAction {
    fn execute(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        debug!(
            "insert {} pages at {} ms (index {}, split {})",
            self.pages.len(),
            self.time,
            self.index,
            self.split
        );
        self.backup = Some(with_backup(events, |events| self.apply(events))?);
        Ok(())
    }

    fn undo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        restore(events, &mut self.backup)
    }

    fn redo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        self.execute(events)
    }
}

/// Removes one page and the time it was showing.
#[derive(Debug, Clone)]
pub struct DeletePageAction {
    number: i32,
    interval: Interval<i32>,
    backup: Option<Vec<RecordedPage>>,
}

impl DeletePageAction {
    pub fn new(number: i32, interval: Interval<i32>) -> Self {
        Self {
            number,
            interval,
            backup: None,
        }
    }

    fn apply(&self, events: &mut RecordedEvents) -> Result<(), EditError> {
        events.remove_page(self.number)?;
        for page in events.pages_mut() {
            page.cut(self.interval);
            page.shift(self.interval);
        }
        close_number_gaps(events, &[self.number]);
        Ok(())
    }
}

impl EditAction<RecordedEvents> for DeletePageAction {
    fn execute(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        debug!("delete page {} showing {}", self.number, self.interval);
        self.backup = Some(with_backup(events, |events| self.apply(events))?);
        Ok(())
    }

    fn undo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        restore(events, &mut self.backup)
    }

    fn redo(&mut self, events: &mut RecordedEvents) -> Result<(), EditError> {
        self.execute(events)
    }
}
