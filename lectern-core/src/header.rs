//! Fixed-layout recording header.
//!
//! ```text
//! offset  size  field
//! ------  ----  ---------------------------
//!      0     4  format marker ("LECT")
//!      4     4  format version
//!      8     8  duration in milliseconds
//!     16    20  SHA-1 of every chunk after the header
//!     36     4  events chunk length
//!     40     4  document chunk length
//!     44     4  audio chunk length
//!     48     4  camera file name length
//!     52     4  tool demo chunk length
//! ```
//!
//! All integers are big-endian.

use serde::{Deserialize, Serialize};

use crate::codec::put_i32;
use crate::error::ParseError;

/// "LECT"
pub const FORMAT_MARKER: u32 = 0x4C45_4354;

/// Version written by this crate.
pub const FORMAT_VERSION: i32 = 3;

pub const CHECKSUM_SIZE: usize = 20;

/// Raw header as laid out on disk.
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
struct RawHeader {
    marker: [u8; 4],
    version: [u8; 4],
    duration: [u8; 8],
    checksum: [u8; CHECKSUM_SIZE],
    events_length: [u8; 4],
    document_length: [u8; 4],
    audio_length: [u8; 4],
    camera_name_length: [u8; 4],
    tool_demo_length: [u8; 4],
}

/// Header size in bytes
pub const HEADER_SIZE: usize = std::mem::size_of::<RawHeader>();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingHeader {
    pub version: i32,
    /// Duration in milliseconds
    pub duration: i64,
    #[serde(with = "hex_checksum")]
    pub checksum: [u8; CHECKSUM_SIZE],
    pub events_length: i32,
    pub document_length: i32,
    pub audio_length: i32,
    pub camera_name_length: i32,
    pub tool_demo_length: i32,
}

impl Default for RecordingHeader {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            duration: 0,
            checksum: [0; CHECKSUM_SIZE],
            events_length: 0,
            document_length: 0,
            audio_length: 0,
            camera_name_length: 0,
            tool_demo_length: 0,
        }
    }
}

impl RecordingHeader {
    pub fn with_duration(duration: i64) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    /// Parse the header from the start of `data`.
    ///
    /// Only the marker is validated; lengths are taken as they are.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < HEADER_SIZE {
            return Err(ParseError::TooShort {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let raw: RawHeader = bincode::deserialize(&data[..HEADER_SIZE])?;

        let marker = u32::from_be_bytes(raw.marker);
        if marker != FORMAT_MARKER {
            return Err(ParseError::InvalidFormat {
                expected: FORMAT_MARKER,
                actual: marker,
            });
        }

        Ok(Self {
            version: i32::from_be_bytes(raw.version),
            duration: i64::from_be_bytes(raw.duration),
            checksum: raw.checksum,
            events_length: i32::from_be_bytes(raw.events_length),
            document_length: i32::from_be_bytes(raw.document_length),
            audio_length: i32::from_be_bytes(raw.audio_length),
            camera_name_length: i32::from_be_bytes(raw.camera_name_length),
            tool_demo_length: i32::from_be_bytes(raw.tool_demo_length),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.extend_from_slice(&FORMAT_MARKER.to_be_bytes());
        put_i32(&mut buf, self.version);
        buf.extend_from_slice(&self.duration.to_be_bytes());
        buf.extend_from_slice(&self.checksum);
        put_i32(&mut buf, self.events_length);
        put_i32(&mut buf, self.document_length);
        put_i32(&mut buf, self.audio_length);
        put_i32(&mut buf, self.camera_name_length);
        put_i32(&mut buf, self.tool_demo_length);
        buf
    }

    /// Sum of all chunk lengths following the header.
    pub fn body_length(&self) -> i64 {
        [
            self.events_length,
            self.document_length,
            self.audio_length,
            self.camera_name_length,
            self.tool_demo_length,
        ]
        .iter()
        .map(|l| *l as i64)
        .sum()
    }
}

/// Lowercase hex, as checksums are shown to users.
pub fn checksum_hex(checksum: &[u8]) -> String {
    checksum.iter().map(|b| format!("{:02x}", b)).collect()
}

mod hex_checksum {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(checksum: &[u8; 20], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::checksum_hex(checksum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordingHeader {
        RecordingHeader {
            version: FORMAT_VERSION,
            duration: 93_500,
            checksum: [0xAB; CHECKSUM_SIZE],
            events_length: 1024,
            document_length: 2048,
            audio_length: 4096,
            camera_name_length: 0,
            tool_demo_length: 12,
        }
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 56);
        assert_eq!(sample().to_bytes().len(), HEADER_SIZE);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample();
        let parsed = RecordingHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_layout_is_big_endian() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0..4], b"LECT");
        assert_eq!(&bytes[8..16], &93_500i64.to_be_bytes());
        assert_eq!(&bytes[36..40], &1024i32.to_be_bytes());
        assert_eq!(&bytes[52..56], &12i32.to_be_bytes());
    }

    #[test]
    fn test_bad_marker_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        match RecordingHeader::parse(&bytes) {
            Err(ParseError::InvalidFormat { expected, actual }) => {
                assert_eq!(expected, FORMAT_MARKER);
                assert_eq!(actual, u32::from_be_bytes(*b"XECT"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_short_buffer_rejected() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            RecordingHeader::parse(&bytes[..40]),
            Err(ParseError::TooShort {
                expected: 56,
                actual: 40
            })
        ));
    }

    #[test]
    fn test_body_length() {
        assert_eq!(sample().body_length(), 1024 + 2048 + 4096 + 12);
    }

    #[test]
    fn test_checksum_hex() {
        assert_eq!(checksum_hex(&[0x00, 0xab, 0x10]), "00ab10");
        assert_eq!(checksum_hex(&[]), "");
    }

    #[test]
    fn test_json_checksum_is_hex() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["checksum"], checksum_hex(&[0xAB; CHECKSUM_SIZE]));
        assert_eq!(json["duration"], 93_500);
    }
}
