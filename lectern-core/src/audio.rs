//! Audio stream of a recording.
//!
//! The engine only needs to measure audio and move sample ranges around, so
//! it talks to audio through [`AudioStream`]. [`WavAudio`] is the in-memory
//! PCM implementation used for recordings stored as RIFF/WAVE.

use std::fmt;
use std::ops::Range;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::codec::ByteReader;
use crate::edit::AudioEdit;
use crate::error::{EditError, ParseError};
use crate::interval::Interval;
use crate::stream::EditableStream;

const RIFF: [u8; 4] = *b"RIFF";
const WAVE: [u8; 4] = *b"WAVE";
const FMT: [u8; 4] = *b"fmt ";
const DATA: [u8; 4] = *b"data";

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Canonical header size written by [`WavAudio::to_bytes`].
pub const WAV_HEADER_SIZE: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    /// WAVE format tag (1 = PCM, 3 = float)
    pub encoding: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn pcm(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            encoding: WAVE_FORMAT_PCM,
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Bytes per sample frame across all channels.
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize).div_ceil(8)
    }

    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.block_align()
    }

    /// Frame-aligned byte offset of `millis`.
    pub fn millis_to_bytes(&self, millis: i64) -> usize {
        let frames = millis.max(0) as u128 * self.sample_rate as u128 / 1000;
        frames as usize * self.block_align()
    }

    pub fn bytes_to_millis(&self, bytes: usize) -> i64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0;
        }
        (bytes as u128 * 1000 / rate as u128) as i64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::pcm(44_100, 1, 16)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {} bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// Sample storage the editor can cut and splice.
pub trait AudioStream: fmt::Debug + Send + Sync {
    fn format(&self) -> AudioFormat;

    /// Raw sample frames.
    fn samples(&self) -> &[u8];

    fn length_in_millis(&self) -> i64 {
        self.format().bytes_to_millis(self.samples().len())
    }

    /// Frame-aligned byte offset of `millis`, clamped to the stream.
    fn byte_offset(&self, millis: i64) -> usize {
        self.format()
            .millis_to_bytes(millis)
            .min(self.samples().len())
    }

    /// Remove a byte range of whole frames and return it.
    fn remove_bytes(&mut self, range: Range<usize>) -> Result<Vec<u8>, EditError>;

    /// Insert whole frames, already in this stream's format, at a byte offset.
    fn insert_bytes(&mut self, offset: usize, frames: &[u8]) -> Result<(), EditError>;

    /// Remove the frames inside `interval` and return them.
    fn delete(&mut self, interval: Interval<i64>) -> Result<Vec<u8>, EditError> {
        let duration = self.length_in_millis();
        if interval.start() < 0 || interval.start() > duration {
            return Err(EditError::InvalidInterval {
                start: interval.start(),
                end: interval.end(),
                duration,
            });
        }
        let range = self.byte_offset(interval.start())..self.byte_offset(interval.end());
        self.remove_bytes(range)
    }

    /// Insert frames at `millis`.
    fn insert(&mut self, millis: i64, frames: &[u8]) -> Result<(), EditError> {
        let duration = self.length_in_millis();
        if millis < 0 || millis > duration {
            return Err(EditError::InvalidInterval {
                start: millis,
                end: millis,
                duration,
            });
        }
        let offset = self.byte_offset(millis);
        self.insert_bytes(offset, frames)
    }

    fn to_bytes(&self) -> Vec<u8>;

    fn clone_stream(&self) -> Box<dyn AudioStream>;
}

/// The `fmt ` chunk body (little-endian).
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
struct FmtChunk {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    _byte_rate: u32,
    _block_align: u16,
    bits_per_sample: u16,
}

const FMT_CHUNK_SIZE: usize = std::mem::size_of::<FmtChunk>();

/// PCM audio held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavAudio {
    format: AudioFormat,
    data: Vec<u8>,
}

impl WavAudio {
    pub fn new(format: AudioFormat, data: Vec<u8>) -> Self {
        Self { format, data }
    }

    /// Silence of the given length.
    pub fn silence(format: AudioFormat, millis: i64) -> Self {
        Self {
            format,
            data: vec![0; format.millis_to_bytes(millis)],
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < 12 {
            return Err(ParseError::TooShort {
                expected: 12,
                actual: data.len(),
            });
        }
        if data[0..4] != RIFF || data[8..12] != WAVE {
            return Err(ParseError::InvalidFormat {
                expected: u32::from_be_bytes(RIFF),
                actual: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            });
        }

        let mut reader = ByteReader::new(&data[12..]);
        let mut format = None;
        let mut samples = None;

        while reader.remaining() >= 8 {
            let id = reader.read_bytes(4, "wave chunk id")?;
            let size = reader.read_bytes(4, "wave chunk size")?;
            let size = u32::from_le_bytes([size[0], size[1], size[2], size[3]]) as usize;
            let body = reader.read_bytes(size, "wave chunk")?;
            if size % 2 == 1 && reader.has_remaining() {
                reader.read_u8("wave chunk padding")?;
            }

            if id == FMT {
                if body.len() < FMT_CHUNK_SIZE {
                    return Err(ParseError::TooShort {
                        expected: FMT_CHUNK_SIZE,
                        actual: body.len(),
                    });
                }
                let fmt: FmtChunk = bincode::deserialize(&body[..FMT_CHUNK_SIZE])?;
                let encoding = fmt.audio_format;
                if encoding != WAVE_FORMAT_PCM && encoding != WAVE_FORMAT_IEEE_FLOAT {
                    return Err(ParseError::MalformedRecording(format!(
                        "unsupported wave encoding {}",
                        encoding
                    )));
                }
                format = Some(AudioFormat {
                    encoding,
                    channels: fmt.channels,
                    sample_rate: fmt.sample_rate,
                    bits_per_sample: fmt.bits_per_sample,
                });
            } else if id == DATA {
                samples = Some(body.to_vec());
            }
        }

        match (format, samples) {
            (Some(format), Some(data)) => Ok(Self { format, data }),
            (None, _) => Err(ParseError::MalformedRecording(
                "wave audio has no fmt chunk".into(),
            )),
            (_, None) => Err(ParseError::MalformedRecording(
                "wave audio has no data chunk".into(),
            )),
        }
    }
}

impl AudioStream for WavAudio {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn samples(&self) -> &[u8] {
        &self.data
    }

    fn remove_bytes(&mut self, range: Range<usize>) -> Result<Vec<u8>, EditError> {
        let align = self.format.block_align().max(1);
        if range.start > range.end || range.end > self.data.len() {
            return Err(EditError::IndexOutOfRange {
                index: range.end,
                len: self.data.len(),
            });
        }
        if range.start % align != 0 || range.end % align != 0 {
            return Err(EditError::Failure(format!(
                "byte range {:?} splits a {}-byte frame",
                range, align
            )));
        }
        Ok(self.data.drain(range).collect())
    }

    fn insert_bytes(&mut self, offset: usize, frames: &[u8]) -> Result<(), EditError> {
        let align = self.format.block_align();
        if align == 0 || frames.len() % align != 0 {
            return Err(EditError::IncompatibleAudio(format!(
                "{} bytes is not a whole number of {}-byte frames",
                frames.len(),
                align
            )));
        }
        if offset > self.data.len() {
            return Err(EditError::IndexOutOfRange {
                index: offset,
                len: self.data.len(),
            });
        }
        self.data.splice(offset..offset, frames.iter().copied());
        Ok(())
    }

    fn to_bytes(&self) -> Vec<u8> {
        let f = &self.format;
        let data_len = self.data.len() as u32;
        let mut buf = Vec::with_capacity(WAV_HEADER_SIZE + self.data.len());
        buf.extend_from_slice(&RIFF);
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(&WAVE);
        buf.extend_from_slice(&FMT);
        buf.extend_from_slice(&(FMT_CHUNK_SIZE as u32).to_le_bytes());
        buf.extend_from_slice(&f.encoding.to_le_bytes());
        buf.extend_from_slice(&f.channels.to_le_bytes());
        buf.extend_from_slice(&f.sample_rate.to_le_bytes());
        buf.extend_from_slice(&(f.byte_rate() as u32).to_le_bytes());
        buf.extend_from_slice(&(f.block_align() as u16).to_le_bytes());
        buf.extend_from_slice(&f.bits_per_sample.to_le_bytes());
        buf.extend_from_slice(&DATA);
        buf.extend_from_slice(&data_len.to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    fn clone_stream(&self) -> Box<dyn AudioStream> {
        Box::new(self.clone())
    }
}

/// The audio stream of a recording.
#[derive(Debug)]
pub struct RecordedAudio {
    stream: Box<dyn AudioStream>,
}

impl RecordedAudio {
    pub fn new(stream: Box<dyn AudioStream>) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> &dyn AudioStream {
        self.stream.as_ref()
    }

    pub(crate) fn stream_mut(&mut self) -> &mut dyn AudioStream {
        self.stream.as_mut()
    }

    pub fn length_in_millis(&self) -> i64 {
        self.stream.length_in_millis()
    }

    pub fn try_clone(&self) -> Self {
        Self {
            stream: self.stream.clone_stream(),
        }
    }
}

impl EditableStream for RecordedAudio {
    type Edit = AudioEdit;
    type Context = ();

    /// An empty chunk is an empty stream in the default format.
    fn parse_with(data: &[u8], _: &()) -> Result<Self, ParseError> {
        let wav = if data.is_empty() {
            debug!("Recording has no audio chunk");
            WavAudio::new(AudioFormat::default(), Vec::new())
        } else {
            WavAudio::parse(data)?
        };
        Ok(Self::new(Box::new(wav)))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.stream.to_bytes()
    }
}
