//! Page summaries for the `pages` command.

use serde::Serialize;
use std::collections::BTreeMap;

use lectern_core::{ActionKind, RecordedPage, Recording, ToolContext};

/// Counts actions by kind while a page is replayed.
#[derive(Debug, Default)]
pub struct ActionTally {
    counts: BTreeMap<String, usize>,
}

impl ToolContext for ActionTally {
    fn apply(&mut self, kind: ActionKind, _timestamp: i32, _payload: &[u8]) {
        *self.counts.entry(kind.to_string()).or_default() += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub number: i32,
    pub start_ms: i32,
    /// Time until the next page, or the end of the recording
    pub length_ms: i64,
    pub static_actions: usize,
    pub playback_actions: usize,
    pub actions_by_kind: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_bytes: Option<usize>,
}

impl PageSummary {
    fn new(page: &RecordedPage, end: i64, document_bytes: Option<usize>) -> Self {
        let mut tally = ActionTally::default();
        page.replay(&mut tally, i32::MAX);

        Self {
            number: page.number(),
            start_ms: page.timestamp(),
            length_ms: end - page.timestamp() as i64,
            static_actions: page.static_actions().len(),
            playback_actions: page.playback_actions().len(),
            actions_by_kind: tally.counts,
            document_bytes,
        }
    }
}

pub fn summarize(recording: &Recording) -> Vec<PageSummary> {
    let pages = recording.events().pages();
    let document = recording.document().document();

    pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let end = pages
                .get(i + 1)
                .map(|next| next.timestamp() as i64)
                .unwrap_or_else(|| recording.duration());
            let document_bytes = usize::try_from(page.number())
                .ok()
                .and_then(|n| document.page(n))
                .map(<[u8]>::len);
            PageSummary::new(page, end, document_bytes)
        })
        .collect()
}
