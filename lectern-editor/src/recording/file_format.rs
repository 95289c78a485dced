//! Recording container files.
//!
//! A container is the 56-byte header followed by the chunks in fixed order:
//! events, document, audio, camera name, tool demo. The header's lengths give
//! each chunk's size and its checksum is the SHA-1 of everything after it.

use std::io::{Read, Write};

use log::{debug, warn};
use sha1::{Digest, Sha1};

use lectern_core::header::CHECKSUM_SIZE;
use lectern_core::{
    checksum_hex, ActionFactory, EditableStream, ParseError, RecordedAudio, RecordedDocument, RecordedEvents,
    Recording, RecordingHeader, FORMAT_VERSION, HEADER_SIZE,
};

use super::RecordingFileError;

/// Extension of recording containers
pub const RECORDING_EXTENSION: &str = "lrec";

/// Extension of gzip-compressed containers, without the leading dot
pub const COMPRESSED_EXTENSION: &str = "lrec.gz";

/// SHA-1 over `chunks`, in order.
pub fn compute_checksum(chunks: &[&[u8]]) -> [u8; CHECKSUM_SIZE] {
    let mut hasher = Sha1::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// A container split into its raw chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingFile {
    pub header: RecordingHeader,
    pub events: Vec<u8>,
    pub document: Vec<u8>,
    pub audio: Vec<u8>,
    pub camera_name: Vec<u8>,
    pub tool_demo: Vec<u8>,
}

impl RecordingFile {
    /// Split `data` into chunks using the header's lengths.
    ///
    /// Fails with `MalformedRecording` when the data is shorter than the
    /// lengths claim. Bytes past the last chunk are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RecordingFileError> {
        let header = RecordingHeader::parse(data)?;

        let lengths = [
            ("events", header.events_length),
            ("document", header.document_length),
            ("audio", header.audio_length),
            ("camera name", header.camera_name_length),
            ("tool demo", header.tool_demo_length),
        ];

        let mut chunks = Vec::with_capacity(lengths.len());
        let mut offset = HEADER_SIZE;
        for (name, length) in lengths {
            let length = usize::try_from(length).map_err(|_| {
                ParseError::MalformedRecording(format!("negative {} length {}", name, length))
            })?;
            let end = offset
                .checked_add(length)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| {
                    ParseError::MalformedRecording(format!(
                        "{} chunk needs {} bytes at offset {}, file has {}",
                        name,
                        length,
                        offset,
                        data.len()
                    ))
                })?;
            chunks.push(data[offset..end].to_vec());
            offset = end;
        }

        if offset < data.len() {
            warn!("Ignoring {} bytes after the last chunk", data.len() - offset);
        }

        let mut chunks = chunks.into_iter();
        let mut next = || chunks.next().unwrap_or_default();
        Ok(Self {
            header,
            events: next(),
            document: next(),
            audio: next(),
            camera_name: next(),
            tool_demo: next(),
        })
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self, RecordingFileError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Encode the streams of `recording`.
    ///
    /// The header is rewritten: current format version, exact chunk lengths
    /// and a fresh checksum. The duration is taken from the recording.
    pub fn from_recording(recording: &Recording) -> Result<Self, RecordingFileError> {
        let mut file = Self {
            header: recording.header().clone(),
            events: recording.events().to_bytes(),
            document: recording.document().to_bytes(),
            audio: recording.audio().to_bytes(),
            camera_name: recording.camera_name().to_vec(),
            tool_demo: recording.tool_demo().to_vec(),
        };
        file.seal()?;
        Ok(file)
    }

    /// Set version, lengths and checksum from the current chunks.
    pub fn seal(&mut self) -> Result<(), RecordingFileError> {
        self.header.version = FORMAT_VERSION;
        self.header.events_length = chunk_length("events", &self.events)?;
        self.header.document_length = chunk_length("document", &self.document)?;
        self.header.audio_length = chunk_length("audio", &self.audio)?;
        self.header.camera_name_length = chunk_length("camera name", &self.camera_name)?;
        self.header.tool_demo_length = chunk_length("tool demo", &self.tool_demo)?;
        self.header.checksum = self.checksum();
        Ok(())
    }

    /// Checksum of the chunks as they are now.
    pub fn checksum(&self) -> [u8; CHECKSUM_SIZE] {
        compute_checksum(&self.chunks())
    }

    pub fn verify_checksum(&self) -> Result<(), RecordingFileError> {
        let actual = self.checksum();
        if actual != self.header.checksum {
            return Err(RecordingFileError::ChecksumMismatch {
                expected: checksum_hex(&self.header.checksum),
                actual: checksum_hex(&actual),
            });
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), RecordingFileError> {
        writer.write_all(&self.header.to_bytes())?;
        for chunk in self.chunks() {
            writer.write_all(chunk)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.body_len());
        buf.extend_from_slice(&self.header.to_bytes());
        for chunk in self.chunks() {
            buf.extend_from_slice(chunk);
        }
        buf
    }

    /// Chunks in file order.
    fn chunks(&self) -> [&[u8]; 5] {
        [
            &self.events,
            &self.document,
            &self.audio,
            &self.camera_name,
            &self.tool_demo,
        ]
    }

    fn body_len(&self) -> usize {
        self.chunks().iter().map(|c| c.len()).sum()
    }

    /// Decode every stream into an editable recording.
    ///
    /// An empty audio chunk becomes an empty stream in the default format.
    pub fn into_recording(
        self,
        factory: &(dyn ActionFactory + 'static),
    ) -> Result<Recording, RecordingFileError> {
        let events = RecordedEvents::parse_with(&self.events, factory)?;
        let document = RecordedDocument::parse_with(&self.document, &())?;
        let audio = RecordedAudio::parse_with(&self.audio, &())?;

        debug!(
            "Decoded recording: {} pages, {} document pages, {} ms audio",
            events.len(),
            document.page_count(),
            audio.length_in_millis()
        );

        Ok(Recording::from_streams(self.header, events, document, audio)
            .with_attachments(self.camera_name, self.tool_demo))
    }
}

fn chunk_length(name: &str, chunk: &[u8]) -> Result<i32, RecordingFileError> {
    i32::try_from(chunk.len()).map_err(|_| {
        RecordingFileError::TooLarge(format!("{} chunk of {} bytes", name, chunk.len()))
    })
}
