//! Big-endian primitives shared by the stream codecs.

use crate::error::ParseError;

/// Cursor over an immutable byte buffer.
///
/// Every read is bounds-checked; running past the end yields
/// [`ParseError::MalformedRecording`] naming what was being read.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8], ParseError> {
        if len > self.remaining() {
            return Err(ParseError::MalformedRecording(format!(
                "{} needs {} bytes at offset {}, only {} left",
                what,
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self, what: &str) -> Result<u8, ParseError> {
        Ok(self.read_bytes(1, what)?[0])
    }

    pub(crate) fn read_i32(&mut self, what: &str) -> Result<i32, ParseError> {
        let b = self.read_bytes(4, what)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read an `i32` length field and reject negative values.
    pub(crate) fn read_len(&mut self, what: &str) -> Result<usize, ParseError> {
        let len = self.read_i32(what)?;
        if len < 0 {
            return Err(ParseError::MalformedRecording(format!(
                "negative {}: {}",
                what, len
            )));
        }
        Ok(len as usize)
    }
}

pub(crate) fn put_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Convert a chunk size to the `i32` used on the wire.
pub(crate) fn len_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_past_end_is_malformed() {
        let mut reader = ByteReader::new(&[0, 0, 0]);
        match reader.read_i32("page number") {
            Err(ParseError::MalformedRecording(msg)) => assert!(msg.contains("page number")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_negative_length_rejected() {
        let data = (-1i32).to_be_bytes();
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_len("chunk size"),
            Err(ParseError::MalformedRecording(_))
        ));
    }

    #[test]
    fn test_reads_big_endian() {
        let mut buf = Vec::new();
        put_i32(&mut buf, 0x0102_0304);
        assert_eq!(buf, vec![1, 2, 3, 4]);
        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_i32("value").unwrap(), 0x0102_0304);
        assert!(!reader.has_remaining());
    }
}
