//! Playback actions recorded on a page.
//!
//! Each action is one record in a page's action chunk:
//!
//! ```text
//! +--------------+---------+-------------+-----------------------+
//! | length: i32  | kind:u8 | ts: i32     | payload (length - 5)  |
//! +--------------+---------+-------------+-----------------------+
//! ```
//!
//! `length` counts everything after itself. Kind bytes this crate does not
//! know are kept as [`ActionKind::Other`] and written back unchanged.
//!
//! Tool drag actions (`ToolBegin`, `ToolExecute`, `ToolEnd`) carry a pen
//! point in their payload:
//!
//! ```text
//! flags: i32 [key event: i32, i32, u8 if flags & KEY_EVENT] x: f32 y: f32 pressure: f32
//! ```

use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

use crate::codec::{len_i32, put_i32, ByteReader};
use crate::error::ParseError;

/// Size of the kind byte plus the timestamp.
pub const RECORD_HEADER_SIZE: usize = 5;

/// Size of an optional key event inside a tool drag payload.
const KEY_EVENT_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    Pen,
    Highlighter,
    Pointer,
    Arrow,
    Line,
    Rectangle,
    Ellipse,
    ClearShapes,
    Undo,
    Redo,
    Key,
    Clone,
    Select,
    SelectGroup,
    Latex,
    LatexFontChange,
    Text,
    TextChange,
    TextFontChange,
    TextLocationChange,
    TextRemove,
    TextSelection,
    ToolBegin,
    ToolExecute,
    ToolEnd,
    Panning,
    ExtendView,
    Zoom,
    ZoomOut,
    Rubber,
    /// A kind byte with no known meaning, preserved verbatim.
    Other(u8),
}

const KNOWN_KINDS: [ActionKind; 30] = [
    ActionKind::Pen,
    ActionKind::Highlighter,
    ActionKind::Pointer,
    ActionKind::Arrow,
    ActionKind::Line,
    ActionKind::Rectangle,
    ActionKind::Ellipse,
    ActionKind::ClearShapes,
    ActionKind::Undo,
    ActionKind::Redo,
    ActionKind::Key,
    ActionKind::Clone,
    ActionKind::Select,
    ActionKind::SelectGroup,
    ActionKind::Latex,
    ActionKind::LatexFontChange,
    ActionKind::Text,
    ActionKind::TextChange,
    ActionKind::TextFontChange,
    ActionKind::TextLocationChange,
    ActionKind::TextRemove,
    ActionKind::TextSelection,
    ActionKind::ToolBegin,
    ActionKind::ToolExecute,
    ActionKind::ToolEnd,
    ActionKind::Panning,
    ActionKind::ExtendView,
    ActionKind::Zoom,
    ActionKind::ZoomOut,
    ActionKind::Rubber,
];

impl ActionKind {
    pub fn as_byte(self) -> u8 {
        match self {
            ActionKind::Other(b) => b,
            known => KNOWN_KINDS
                .iter()
                .position(|k| *k == known)
                .map(|i| i as u8)
                .unwrap_or(u8::MAX),
        }
    }

    /// Kinds that change the page viewport rather than its content.
    pub fn is_view_tool(self) -> bool {
        matches!(self, ActionKind::Zoom | ActionKind::Panning)
    }

    pub fn is_tool_drag(self) -> bool {
        matches!(
            self,
            ActionKind::ToolBegin | ActionKind::ToolExecute | ActionKind::ToolEnd
        )
    }
}

impl From<u8> for ActionKind {
    fn from(b: u8) -> Self {
        KNOWN_KINDS
            .get(b as usize)
            .copied()
            .unwrap_or(ActionKind::Other(b))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Other(b) => write!(f, "Other({})", b),
            known => write!(f, "{:?}", known),
        }
    }
}

bitflags! {
    /// Leading flags word of a tool drag payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionFlags: i32 {
        const KEY_EVENT = 0b0000_0001;
    }
}

impl Default for ActionFlags {
    fn default() -> Self {
        ActionFlags::empty()
    }
}

/// Pen position and pressure of a tool drag action.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PenPoint {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

impl PenPoint {
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }
}

fn point_offset(payload: &[u8]) -> Option<usize> {
    let flags = payload.get(0..4)?;
    let flags = ActionFlags::from_bits_retain(i32::from_be_bytes([
        flags[0], flags[1], flags[2], flags[3],
    ]));
    let offset = if flags.contains(ActionFlags::KEY_EVENT) {
        4 + KEY_EVENT_SIZE
    } else {
        4
    };
    if payload.len() < offset + 12 {
        return None;
    }
    Some(offset)
}

/// Pen point stored in a tool drag payload, if the payload holds one.
pub fn read_tool_point(payload: &[u8]) -> Option<PenPoint> {
    let offset = point_offset(payload)?;
    let f = |i: usize| {
        let b = &payload[offset + i * 4..offset + i * 4 + 4];
        f32::from_be_bytes([b[0], b[1], b[2], b[3]])
    };
    Some(PenPoint::new(f(0), f(1), f(2)))
}

/// Overwrite the pen point of a tool drag payload in place.
pub fn write_tool_point(payload: &mut [u8], point: PenPoint) -> bool {
    let Some(offset) = point_offset(payload) else {
        return false;
    };
    payload[offset..offset + 4].copy_from_slice(&point.x.to_be_bytes());
    payload[offset + 4..offset + 8].copy_from_slice(&point.y.to_be_bytes());
    payload[offset + 8..offset + 12].copy_from_slice(&point.pressure.to_be_bytes());
    true
}

/// Build a tool drag payload without a key event.
pub fn tool_payload(point: PenPoint) -> Vec<u8> {
    let mut payload = Vec::with_capacity(16);
    put_i32(&mut payload, ActionFlags::empty().bits());
    payload.extend_from_slice(&point.x.to_be_bytes());
    payload.extend_from_slice(&point.y.to_be_bytes());
    payload.extend_from_slice(&point.pressure.to_be_bytes());
    payload
}

/// Receives actions during replay.
pub trait ToolContext {
    fn apply(&mut self, kind: ActionKind, timestamp: i32, payload: &[u8]);
}

/// A single timestamped action on a page.
pub trait PlaybackAction: fmt::Debug + Send + Sync {
    fn kind(&self) -> ActionKind;

    fn timestamp(&self) -> i32;

    fn set_timestamp(&mut self, timestamp: i32);

    fn payload(&self) -> &[u8];

    /// Pen point for tool drag actions; `None` for everything else.
    fn point(&self) -> Option<PenPoint>;

    /// Returns false when the action carries no point.
    fn set_point(&mut self, point: PenPoint) -> bool;

    fn clone_action(&self) -> Box<dyn PlaybackAction>;

    /// Move the action `delta` milliseconds earlier.
    fn shift(&mut self, delta: i32) {
        let ts = self.timestamp();
        self.set_timestamp(ts - delta);
    }

    fn execute(&self, context: &mut dyn ToolContext) {
        context.apply(self.kind(), self.timestamp(), self.payload());
    }

    fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(4 + RECORD_HEADER_SIZE + payload.len());
        put_i32(&mut buf, len_i32(RECORD_HEADER_SIZE + payload.len()));
        buf.push(self.kind().as_byte());
        put_i32(&mut buf, self.timestamp());
        buf.extend_from_slice(payload);
        buf
    }
}

impl Clone for Box<dyn PlaybackAction> {
    fn clone(&self) -> Self {
        self.clone_action()
    }
}

impl PartialEq for dyn PlaybackAction {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.timestamp() == other.timestamp()
            && self.payload() == other.payload()
    }
}

/// Default action representation: kind, time and the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAction {
    kind: ActionKind,
    timestamp: i32,
    payload: Vec<u8>,
}

impl RecordedAction {
    pub fn new(kind: ActionKind, timestamp: i32, payload: Vec<u8>) -> Self {
        Self {
            kind,
            timestamp,
            payload,
        }
    }

    pub fn boxed(kind: ActionKind, timestamp: i32) -> Box<dyn PlaybackAction> {
        Box::new(Self::new(kind, timestamp, Vec::new()))
    }

    pub fn tool(kind: ActionKind, timestamp: i32, point: PenPoint) -> Box<dyn PlaybackAction> {
        Box::new(Self::new(kind, timestamp, tool_payload(point)))
    }
}

impl PlaybackAction for RecordedAction {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    fn timestamp(&self) -> i32 {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: i32) {
        self.timestamp = timestamp;
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn point(&self) -> Option<PenPoint> {
        if self.kind.is_tool_drag() {
            read_tool_point(&self.payload)
        } else {
            None
        }
    }

    fn set_point(&mut self, point: PenPoint) -> bool {
        self.kind.is_tool_drag() && write_tool_point(&mut self.payload, point)
    }

    fn clone_action(&self) -> Box<dyn PlaybackAction> {
        Box::new(self.clone())
    }
}

/// Turns decoded records into actions.
pub trait ActionFactory {
    fn create_action(
        &self,
        kind: u8,
        timestamp: i32,
        payload: Vec<u8>,
    ) -> Result<Box<dyn PlaybackAction>, ParseError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultActionFactory;

impl ActionFactory for DefaultActionFactory {
    fn create_action(
        &self,
        kind: u8,
        timestamp: i32,
        payload: Vec<u8>,
    ) -> Result<Box<dyn PlaybackAction>, ParseError> {
        Ok(Box::new(RecordedAction::new(
            ActionKind::from(kind),
            timestamp,
            payload,
        )))
    }
}

/// Serialize a list of actions as one chunk.
pub fn encode_actions(actions: &[Box<dyn PlaybackAction>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for action in actions {
        buf.extend_from_slice(&action.to_bytes());
    }
    buf
}

/// Decode records until `chunk` is exhausted.
pub fn decode_actions(
    chunk: &[u8],
    factory: &dyn ActionFactory,
) -> Result<Vec<Box<dyn PlaybackAction>>, ParseError> {
    let mut reader = ByteReader::new(chunk);
    let mut actions = Vec::new();

    while reader.has_remaining() {
        let length = reader.read_len("action length")?;
        if length < RECORD_HEADER_SIZE {
            return Err(ParseError::MalformedRecording(format!(
                "action record length {} is shorter than its header",
                length
            )));
        }
        let kind = reader.read_u8("action kind")?;
        let timestamp = reader.read_i32("action timestamp")?;
        let payload = reader.read_bytes(length - RECORD_HEADER_SIZE, "action payload")?;
        actions.push(factory.create_action(kind, timestamp, payload.to_vec())?);
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<(ActionKind, i32)>);

    impl ToolContext for Collect {
        fn apply(&mut self, kind: ActionKind, timestamp: i32, _payload: &[u8]) {
            self.0.push((kind, timestamp));
        }
    }

    #[test]
    fn test_kind_bytes() {
        assert_eq!(ActionKind::from(0), ActionKind::Pen);
        assert_eq!(ActionKind::from(22), ActionKind::ToolBegin);
        assert_eq!(ActionKind::from(29), ActionKind::Rubber);
        assert_eq!(ActionKind::from(200), ActionKind::Other(200));
        for b in 0..=u8::MAX {
            assert_eq!(ActionKind::from(b).as_byte(), b);
        }
    }

    #[test]
    fn test_record_layout() {
        let action = RecordedAction::new(ActionKind::Pen, 1000, vec![7, 8]);
        let bytes = action.to_bytes();
        assert_eq!(bytes.len(), 4 + 5 + 2);
        assert_eq!(&bytes[0..4], &7i32.to_be_bytes());
        assert_eq!(bytes[4], 0);
        assert_eq!(&bytes[5..9], &1000i32.to_be_bytes());
        assert_eq!(&bytes[9..], &[7, 8]);
    }

    #[test]
    fn test_unknown_kind_preserved() {
        let action = RecordedAction::new(ActionKind::Other(99), 5, vec![1, 2, 3]);
        let chunk = encode_actions(&[Box::new(action)]);
        let decoded = decode_actions(&chunk, &DefaultActionFactory).unwrap();
        assert_eq!(decoded[0].kind(), ActionKind::Other(99));
        assert_eq!(encode_actions(&decoded), chunk);
    }

    #[test]
    fn test_truncated_record_is_malformed() {
        let chunk = RecordedAction::new(ActionKind::Pen, 0, vec![1, 2, 3]).to_bytes();
        let result = decode_actions(&chunk[..chunk.len() - 1], &DefaultActionFactory);
        assert!(matches!(result, Err(ParseError::MalformedRecording(_))));
    }

    #[test]
    fn test_tool_point() {
        let p = PenPoint::new(0.25, 0.5, 1.0);
        let mut action = RecordedAction::new(ActionKind::ToolExecute, 10, tool_payload(p));
        assert_eq!(action.point(), Some(p));

        let q = PenPoint::new(0.75, 0.125, 0.5);
        assert!(action.set_point(q));
        assert_eq!(action.point(), Some(q));

        let mut pen = RecordedAction::new(ActionKind::Pen, 10, tool_payload(p));
        assert_eq!(pen.point(), None);
        assert!(!pen.set_point(q));
    }

    #[test]
    fn test_tool_point_after_key_event() {
        let mut payload = Vec::new();
        put_i32(&mut payload, ActionFlags::KEY_EVENT.bits());
        payload.extend_from_slice(&[0u8; KEY_EVENT_SIZE]);
        payload.extend_from_slice(&1.5f32.to_be_bytes());
        payload.extend_from_slice(&2.5f32.to_be_bytes());
        payload.extend_from_slice(&0.5f32.to_be_bytes());

        let action = RecordedAction::new(ActionKind::ToolBegin, 0, payload);
        assert_eq!(action.point(), Some(PenPoint::new(1.5, 2.5, 0.5)));
    }

    #[test]
    fn test_shift_moves_earlier() {
        let mut action = RecordedAction::new(ActionKind::Pen, 1000, Vec::new());
        action.shift(300);
        assert_eq!(action.timestamp(), 700);
        action.shift(-500);
        assert_eq!(action.timestamp(), 1200);
    }

    #[test]
    fn test_execute_forwards_to_context() {
        let mut ctx = Collect::default();
        RecordedAction::new(ActionKind::Zoom, 42, Vec::new()).execute(&mut ctx);
        assert_eq!(ctx.0, vec![(ActionKind::Zoom, 42)]);
    }
}
