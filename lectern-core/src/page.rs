//! One page of recorded actions and its binary chunk.
//!
//! ```text
//! +-----------+---------+---------+-------------+---------+---------------+------------+
//! | size: i32 | num:i32 | ts: i32 | static: i32 | records | playback: i32 | records    |
//! +-----------+---------+---------+-------------+---------+---------------+------------+
//! ```
//!
//! `size` counts every byte after itself, so a page is self-delimiting inside
//! the events stream.

use std::collections::HashSet;

use log::debug;

use crate::action::{decode_actions, encode_actions, ActionFactory, PlaybackAction, ToolContext};
use crate::action::{ActionKind, PenPoint};
use crate::codec::{len_i32, put_i32, ByteReader};
use crate::error::ParseError;
use crate::interval::Interval;

/// Fixed part of a page record: size, number, timestamp and both chunk sizes.
pub const PAGE_HEADER_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordedPage {
    number: i32,
    timestamp: i32,
    static_actions: Vec<Box<dyn PlaybackAction>>,
    playback_actions: Vec<Box<dyn PlaybackAction>>,
}

impl RecordedPage {
    pub fn new(number: i32, timestamp: i32) -> Self {
        Self {
            number,
            timestamp,
            ..Default::default()
        }
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn set_number(&mut self, number: i32) {
        self.number = number;
    }

    pub fn timestamp(&self) -> i32 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: i32) {
        self.timestamp = timestamp;
    }

    pub fn static_actions(&self) -> &[Box<dyn PlaybackAction>] {
        &self.static_actions
    }

    pub fn playback_actions(&self) -> &[Box<dyn PlaybackAction>] {
        &self.playback_actions
    }

    pub fn add_static_action(&mut self, action: Box<dyn PlaybackAction>) {
        self.static_actions.push(action);
    }

    pub fn add_playback_action(&mut self, action: Box<dyn PlaybackAction>) {
        self.playback_actions.push(action);
    }

    /// Encoded size including the leading size field.
    pub fn encoded_len(&self) -> usize {
        PAGE_HEADER_SIZE
            + self.static_actions.iter().map(|a| a.to_bytes().len()).sum::<usize>()
            + self.playback_actions.iter().map(|a| a.to_bytes().len()).sum::<usize>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let static_chunk = encode_actions(&self.static_actions);
        let playback_chunk = encode_actions(&self.playback_actions);
        let total = PAGE_HEADER_SIZE + static_chunk.len() + playback_chunk.len();

        let mut buf = Vec::with_capacity(total);
        put_i32(&mut buf, len_i32(total - 4));
        put_i32(&mut buf, self.number);
        put_i32(&mut buf, self.timestamp);
        put_i32(&mut buf, len_i32(static_chunk.len()));
        buf.extend_from_slice(&static_chunk);
        put_i32(&mut buf, len_i32(playback_chunk.len()));
        buf.extend_from_slice(&playback_chunk);
        buf
    }

    /// Parse a single page record, including its leading size field.
    pub fn parse(data: &[u8], factory: &dyn ActionFactory) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(data);
        let page = Self::read_from(&mut reader, factory)?;
        if reader.has_remaining() {
            return Err(ParseError::MalformedRecording(format!(
                "{} trailing bytes after page {}",
                reader.remaining(),
                page.number
            )));
        }
        Ok(page)
    }

    pub(crate) fn read_from(
        reader: &mut ByteReader<'_>,
        factory: &dyn ActionFactory,
    ) -> Result<Self, ParseError> {
        let size = reader.read_len("page size")?;
        let body = reader.read_bytes(size, "page body")?;
        let mut body = ByteReader::new(body);

        let number = body.read_i32("page number")?;
        let timestamp = body.read_i32("page timestamp")?;

        let static_len = body.read_len("static chunk size")?;
        let static_actions = decode_actions(body.read_bytes(static_len, "static chunk")?, factory)?;

        let playback_len = body.read_len("playback chunk size")?;
        let playback_actions =
            decode_actions(body.read_bytes(playback_len, "playback chunk")?, factory)?;

        if body.has_remaining() {
            return Err(ParseError::MalformedRecording(format!(
                "page {} declares {} bytes but its chunks end {} bytes early",
                number,
                size,
                body.remaining()
            )));
        }

        Ok(Self {
            number,
            timestamp,
            static_actions,
            playback_actions,
        })
    }

    /// Execute static actions, then every playback action up to `until`.
    pub fn replay(&self, context: &mut dyn ToolContext, until: i32) {
        for action in &self.static_actions {
            action.execute(context);
        }
        for action in self
            .playback_actions
            .iter()
            .take_while(|a| a.timestamp() <= until)
        {
            action.execute(context);
        }
    }

    /// Move the page and its playback actions at or after `interval.end`
    /// earlier by the interval length.
    pub fn shift(&mut self, interval: Interval<i32>) {
        let len = interval.length();
        if self.timestamp >= interval.end() {
            self.timestamp -= len;
        }
        for action in &mut self.playback_actions {
            if action.timestamp() >= interval.end() {
                action.shift(len);
            }
        }
    }

    /// Move the page and its playback actions at or after `interval.start`
    /// later by the interval length.
    pub fn shift_right(&mut self, interval: Interval<i32>) {
        let len = interval.length();
        if self.timestamp >= interval.start() {
            self.timestamp += len;
        }
        for action in &mut self.playback_actions {
            if action.timestamp() >= interval.start() {
                action.shift(-len);
            }
        }
    }

    /// Split the page at `time`.
    ///
    /// Playback actions at or after `time` move to the returned page. Its
    /// static actions are this page's static actions followed by copies of
    /// the playback actions that stayed behind, so both fragments start out
    /// showing the same content.
    pub fn split(&mut self, time: i32) -> RecordedPage {
        let at = self
            .playback_actions
            .iter()
            .position(|a| a.timestamp() >= time)
            .unwrap_or(self.playback_actions.len());
        let tail = self.playback_actions.split_off(at);

        let static_actions = self
            .static_actions
            .iter()
            .chain(self.playback_actions.iter())
            .cloned()
            .collect();

        RecordedPage {
            number: self.number + 1,
            timestamp: time,
            static_actions,
            playback_actions: tail,
        }
    }

    /// Remove the playback actions inside `interval`, repairing any tool
    /// gesture the cut would otherwise leave dangling.
    pub fn cut(&mut self, interval: Interval<i32>) {
        if interval.is_empty() {
            return;
        }

        let actions = &mut self.playback_actions;
        let gestures = find_gestures(actions);
        let region = |a: &dyn PlaybackAction| {
            if a.timestamp() < interval.start() {
                Region::Before
            } else if interval.contains(a.timestamp()) {
                Region::Inside
            } else {
                Region::After
            }
        };

        // A ToolBegin always shares the fate of the tool action it follows.
        let mut removed: Vec<bool> = actions
            .iter()
            .map(|a| region(a.as_ref()) == Region::Inside)
            .collect();
        for g in &gestures {
            removed[g.begin] = removed[g.tool];
        }

        let Some(last_removed) = removed.iter().rposition(|r| *r) else {
            return;
        };
        let insert_at = removed[..last_removed].iter().filter(|r| !**r).count();

        let mut closing: Vec<Box<dyn PlaybackAction>> = Vec::new();
        let mut carried: Vec<Vec<Box<dyn PlaybackAction>>> = Vec::new();
        let mut reopened: Vec<Box<dyn PlaybackAction>> = Vec::new();
        let mut view_extended = false;

        let gesture_of = |index: usize| {
            gestures
                .iter()
                .find(|g| g.tool == index || g.end == Some(index))
        };
        let in_gesture: HashSet<usize> = gestures
            .iter()
            .flat_map(|g| {
                [g.tool, g.begin]
                    .into_iter()
                    .chain(g.executes.iter().copied())
                    .chain(g.end)
            })
            .collect();

        for index in (0..actions.len()).filter(|i| removed[*i]) {
            let action = &actions[index];

            if let Some(g) = gesture_of(index) {
                let tool_kind = actions[g.tool].kind();
                let tool_region = region(actions[g.tool].as_ref());

                if g.tool == index {
                    let closed_inside = g
                        .end
                        .map(|e| region(actions[e].as_ref()) == Region::Inside)
                        .unwrap_or(false);

                    if closed_inside {
                        if tool_kind.is_view_tool() {
                            let mut state = vec![actions[g.tool].clone(), actions[g.begin].clone()];
                            if let Some(e) = g.executes.last() {
                                state.push(actions[*e].clone());
                            }
                            if let Some(e) = g.end {
                                state.push(actions[e].clone());
                            }
                            carried.push(state);
                        }
                    } else {
                        let mut tool = actions[g.tool].clone();
                        let mut begin = actions[g.begin].clone();
                        tool.set_timestamp(interval.end());
                        begin.set_timestamp(interval.end());
                        if !tool_kind.is_view_tool() {
                            let after = g
                                .executes
                                .iter()
                                .find(|e| region(actions[**e].as_ref()) == Region::After);
                            let inside = g
                                .executes
                                .iter()
                                .rev()
                                .find(|e| region(actions[**e].as_ref()) == Region::Inside);
                            if let Some(p) = after.or(inside).and_then(|e| actions[*e].point()) {
                                begin.set_point(p);
                            }
                        }
                        reopened.push(tool);
                        reopened.push(begin);
                    }
                } else if tool_region == Region::Before {
                    let mut end = action.clone();
                    end.set_timestamp(interval.start());
                    closing.push(end);
                }
                continue;
            }

            if in_gesture.contains(&index) {
                continue;
            }

            match action.kind() {
                ActionKind::ZoomOut => carried.push(vec![action.clone()]),
                ActionKind::ExtendView => {
                    // A second ExtendView restores the original view.
                    carried.clear();
                    if view_extended {
                        view_extended = false;
                    } else {
                        carried.push(vec![action.clone()]);
                        view_extended = true;
                    }
                }
                _ => {}
            }
        }

        // Gestures begun before the cut with nothing drawn before it restart
        // at the cut start from the first point drawn inside it.
        let mut restarted: Vec<(usize, usize, Option<PenPoint>)> = Vec::new();
        for g in &gestures {
            if region(actions[g.tool].as_ref()) != Region::Before {
                continue;
            }
            let has_prefix = g
                .executes
                .iter()
                .any(|e| region(actions[*e].as_ref()) == Region::Before);
            let first_inside = g
                .executes
                .iter()
                .find(|e| region(actions[**e].as_ref()) == Region::Inside);
            if let (false, Some(e)) = (has_prefix, first_inside) {
                let point = if actions[g.tool].kind().is_view_tool() {
                    None
                } else {
                    actions[*e].point()
                };
                restarted.push((g.tool, g.begin, point));
            }
        }
        for (tool, begin, point) in restarted {
            actions[tool].set_timestamp(interval.start());
            actions[begin].set_timestamp(interval.start());
            if let Some(p) = point {
                actions[begin].set_point(p);
            }
        }

        for state in &mut carried {
            for action in state.iter_mut() {
                action.set_timestamp(interval.end());
            }
        }

        debug!(
            "cut {} on page {}: removed {} actions, reinserted {}",
            interval,
            self.number,
            removed.iter().filter(|r| **r).count(),
            closing.len() + carried.iter().map(Vec::len).sum::<usize>() + reopened.len()
        );

        let kept: Vec<Box<dyn PlaybackAction>> = std::mem::take(actions)
            .into_iter()
            .zip(removed)
            .filter_map(|(action, removed)| (!removed).then_some(action))
            .collect();

        let mut result = Vec::with_capacity(kept.len() + closing.len() + reopened.len());
        let mut kept = kept.into_iter();
        result.extend(kept.by_ref().take(insert_at));
        result.extend(closing);
        result.extend(carried.into_iter().flatten());
        result.extend(reopened);
        result.extend(kept);
        self.playback_actions = result;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Before,
    Inside,
    After,
}

/// Indices of one `tool, ToolBegin, ToolExecute*, ToolEnd` run.
#[derive(Debug)]
struct Gesture {
    tool: usize,
    begin: usize,
    executes: Vec<usize>,
    end: Option<usize>,
}

fn find_gestures(actions: &[Box<dyn PlaybackAction>]) -> Vec<Gesture> {
    let mut gestures = Vec::new();
    let mut open: Option<Gesture> = None;
    let mut i = 0;

    while i < actions.len() {
        let kind = actions[i].kind();
        let next_begins = actions
            .get(i + 1)
            .map(|a| a.kind() == ActionKind::ToolBegin)
            .unwrap_or(false);

        if !kind.is_tool_drag() && next_begins {
            if let Some(g) = open.take() {
                gestures.push(g);
            }
            open = Some(Gesture {
                tool: i,
                begin: i + 1,
                executes: Vec::new(),
                end: None,
            });
            i += 2;
            continue;
        }

        match (kind, open.as_mut()) {
            (ActionKind::ToolExecute, Some(g)) => g.executes.push(i),
            (ActionKind::ToolEnd, Some(g)) => {
                g.end = Some(i);
                if let Some(g) = open.take() {
                    gestures.push(g);
                }
            }
            _ => {}
        }
        i += 1;
    }

    if let Some(g) = open {
        gestures.push(g);
    }
    gestures
}
