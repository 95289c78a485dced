//! The events stream: every recorded page in order.
//!
//! Encoded as the plain concatenation of page records. Page numbers are
//! identifiers shared with the document stream; removing a page does not
//! renumber the others.

use crate::action::ActionFactory;
use crate::codec::ByteReader;
use crate::edit::EventsEdit;
use crate::error::{EditError, ParseError};
use crate::page::RecordedPage;
use crate::stream::EditableStream;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordedEvents {
    pages: Vec<RecordedPage>,
}

impl RecordedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: Vec<RecordedPage>) -> Self {
        Self { pages }
    }

    pub fn parse(data: &[u8], factory: &dyn ActionFactory) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(data);
        let mut pages = Vec::new();
        while reader.has_remaining() {
            pages.push(RecordedPage::read_from(&mut reader, factory)?);
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, number: i32) -> Option<&RecordedPage> {
        self.pages.iter().find(|p| p.number() == number)
    }

    pub fn page_mut(&mut self, number: i32) -> Option<&mut RecordedPage> {
        self.pages.iter_mut().find(|p| p.number() == number)
    }

    pub fn position(&self, number: i32) -> Option<usize> {
        self.pages.iter().position(|p| p.number() == number)
    }

    pub fn add_page(&mut self, page: RecordedPage) {
        self.pages.push(page);
    }

    pub fn insert_page(&mut self, index: usize, page: RecordedPage) -> Result<(), EditError> {
        if index > self.pages.len() {
            return Err(EditError::IndexOutOfRange {
                index,
                len: self.pages.len(),
            });
        }
        self.pages.insert(index, page);
        Ok(())
    }

    /// Remove the page carrying `number`.
    pub fn remove_page(&mut self, number: i32) -> Result<RecordedPage, EditError> {
        let index = self.position(number).ok_or(EditError::PageNotFound(number))?;
        Ok(self.pages.remove(index))
    }

    /// Number each page by its position.
    pub fn renumber(&mut self) {
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.set_number(i as i32);
        }
    }

    pub(crate) fn pages_mut(&mut self) -> &mut Vec<RecordedPage> {
        &mut self.pages
    }

    /// `(number, timestamp)` of each page, in stream order.
    pub fn timetable(&self) -> Vec<(i32, i32)> {
        self.pages
            .iter()
            .map(|p| (p.number(), p.timestamp()))
            .collect()
    }

    /// Index of the page showing at `time`.
    ///
    /// A time within `margin` of the next page's start snaps to that page.
    /// The last page extends to infinity.
    pub fn page_index(&self, time: i32, margin: i32) -> Option<usize> {
        for (i, page) in self.pages.iter().enumerate() {
            let next = self
                .pages
                .get(i + 1)
                .map(|p| p.timestamp())
                .unwrap_or(i32::MAX);

            if (next as i64 - time as i64).abs() < margin as i64 {
                return Some(i + 1);
            }
            if time >= page.timestamp() && time < next {
                return Some(i);
            }
        }
        None
    }
}

impl EditableStream for RecordedEvents {
    type Edit = EventsEdit;
    type Context = dyn ActionFactory;

    fn parse_with(data: &[u8], factory: &Self::Context) -> Result<Self, ParseError> {
        RecordedEvents::parse(data, factory)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.pages.iter().map(|p| p.encoded_len()).sum());
        for page in &self.pages {
            buf.extend_from_slice(&page.to_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, DefaultActionFactory, RecordedAction};

    fn events(timestamps: &[i32]) -> RecordedEvents {
        let mut events = RecordedEvents::new();
        for (i, ts) in timestamps.iter().enumerate() {
            let mut page = RecordedPage::new(i as i32, *ts);
            page.add_playback_action(RecordedAction::boxed(ActionKind::Key, *ts + 10));
            events.add_page(page);
        }
        events
    }

    #[test]
    fn test_events_roundtrip() {
        let events = events(&[0, 5000, 9000]);
        let bytes = events.to_bytes();
        let parsed = RecordedEvents::parse(&bytes, &DefaultActionFactory).unwrap();
        assert_eq!(parsed, events);
    }

    #[test]
    fn test_reparse_through_stream_trait() {
        let events = events(&[0, 4000]);
        let parsed = <RecordedEvents as EditableStream>::parse_with(
            &events.to_bytes(),
            &DefaultActionFactory,
        )
        .unwrap();
        assert_eq!(parsed, events);
        assert_eq!(parsed.state_hash(), events.state_hash());
    }

    #[test]
    fn test_empty_events() {
        let parsed = RecordedEvents::parse(&[], &DefaultActionFactory).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_truncated_events_rejected() {
        let bytes = events(&[0, 5000]).to_bytes();
        let result = RecordedEvents::parse(&bytes[..bytes.len() - 3], &DefaultActionFactory);
        assert!(matches!(result, Err(ParseError::MalformedRecording(_))));
    }

    #[test]
    fn test_remove_keeps_numbers() {
        let mut events = events(&[0, 5000, 9000]);
        let removed = events.remove_page(1).unwrap();
        assert_eq!(removed.timestamp(), 5000);
        assert_eq!(events.timetable(), vec![(0, 0), (2, 9000)]);
        assert_eq!(events.remove_page(1), Err(EditError::PageNotFound(1)));

        events.renumber();
        assert_eq!(events.timetable(), vec![(0, 0), (1, 9000)]);
    }

    #[test]
    fn test_page_index() {
        let events = events(&[0, 5000, 9000]);
        assert_eq!(events.page_index(100, 250), Some(0));
        assert_eq!(events.page_index(6000, 250), Some(1));
        assert_eq!(events.page_index(20_000, 250), Some(2));
        assert_eq!(events.page_index(-5, 0), None);
    }

    #[test]
    fn test_page_index_snaps_from_both_sides() {
        let events = events(&[0, 5000, 9000]);
        assert_eq!(events.page_index(4800, 250), Some(1));
        assert_eq!(events.page_index(5200, 250), Some(1));
        assert_eq!(events.page_index(8760, 250), Some(2));
        assert_eq!(events.page_index(4700, 250), Some(0));
    }

    #[test]
    fn test_insert_page_out_of_range() {
        let mut events = events(&[0]);
        assert_eq!(
            events.insert_page(5, RecordedPage::new(1, 0)),
            Err(EditError::IndexOutOfRange { index: 5, len: 1 })
        );
    }
}
