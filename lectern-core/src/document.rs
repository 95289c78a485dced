//! Document stream: the slides shown during a recording.
//!
//! Page content is opaque to the engine. [`PagedDocument`] stores it as a
//! list of length-prefixed blobs:
//!
//! ```text
//! count: i32 | (len: i32, bytes)*
//! ```

use std::fmt;

use crate::codec::{len_i32, put_i32, ByteReader};
use crate::edit::DocumentEdit;
use crate::error::{EditError, ParseError};
use crate::stream::EditableStream;

pub trait DocumentStream: fmt::Debug + Send + Sync {
    fn page_count(&self) -> usize;

    fn page(&self, index: usize) -> Option<&[u8]>;

    /// Insert a page at `index`; `index == page_count()` appends.
    fn create_page(&mut self, index: usize, content: Vec<u8>) -> Result<(), EditError>;

    fn remove_page(&mut self, index: usize) -> Result<Vec<u8>, EditError>;

    fn to_bytes(&self) -> Vec<u8>;

    fn clone_stream(&self) -> Box<dyn DocumentStream>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PagedDocument {
    pages: Vec<Vec<u8>>,
}

impl PagedDocument {
    pub fn new(pages: Vec<Vec<u8>>) -> Self {
        Self { pages }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        let mut reader = ByteReader::new(data);
        let count = reader.read_len("document page count")?;
        let mut pages = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let len = reader.read_len("document page size")?;
            pages.push(reader.read_bytes(len, "document page")?.to_vec());
        }
        if reader.has_remaining() {
            return Err(ParseError::MalformedRecording(format!(
                "{} trailing bytes after {} document pages",
                reader.remaining(),
                count
            )));
        }
        Ok(Self { pages })
    }
}

impl DocumentStream for PagedDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Option<&[u8]> {
        self.pages.get(index).map(Vec::as_slice)
    }

    fn create_page(&mut self, index: usize, content: Vec<u8>) -> Result<(), EditError> {
        if index > self.pages.len() {
            return Err(EditError::IndexOutOfRange {
                index,
                len: self.pages.len(),
            });
        }
        self.pages.insert(index, content);
        Ok(())
    }

    fn remove_page(&mut self, index: usize) -> Result<Vec<u8>, EditError> {
        if index >= self.pages.len() {
            return Err(EditError::IndexOutOfRange {
                index,
                len: self.pages.len(),
            });
        }
        Ok(self.pages.remove(index))
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.pages.iter().map(|p| p.len() + 4).sum::<usize>());
        put_i32(&mut buf, len_i32(self.pages.len()));
        for page in &self.pages {
            put_i32(&mut buf, len_i32(page.len()));
            buf.extend_from_slice(page);
        }
        buf
    }

    fn clone_stream(&self) -> Box<dyn DocumentStream> {
        Box::new(self.clone())
    }
}

/// The document stream of a recording.
#[derive(Debug)]
pub struct RecordedDocument {
    document: Box<dyn DocumentStream>,
}

impl RecordedDocument {
    pub fn new(document: Box<dyn DocumentStream>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &dyn DocumentStream {
        self.document.as_ref()
    }

    pub(crate) fn document_mut(&mut self) -> &mut dyn DocumentStream {
        self.document.as_mut()
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    pub fn try_clone(&self) -> Self {
        Self {
            document: self.document.clone_stream(),
        }
    }
}

impl EditableStream for RecordedDocument {
    type Edit = DocumentEdit;
    type Context = ();

    fn parse_with(data: &[u8], _: &()) -> Result<Self, ParseError> {
        Ok(Self::new(Box::new(PagedDocument::parse(data)?)))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.document.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> PagedDocument {
        PagedDocument::new(vec![b"intro".to_vec(), b"proof".to_vec(), vec![]])
    }

    #[test]
    fn test_document_roundtrip() {
        let bytes = doc().to_bytes();
        assert_eq!(&bytes[0..4], &3i32.to_be_bytes());
        assert_eq!(PagedDocument::parse(&bytes).unwrap(), doc());
    }

    #[test]
    fn test_reparse_through_stream_trait() {
        let bytes = doc().to_bytes();
        let parsed = <RecordedDocument as EditableStream>::parse_with(&bytes, &()).unwrap();
        assert_eq!(parsed.page_count(), 3);
        assert_eq!(parsed.document().page(1), Some(&b"proof"[..]));
        assert_eq!(EditableStream::to_bytes(&parsed), bytes);
    }

    #[test]
    fn test_empty_chunk_is_empty_document() {
        assert_eq!(PagedDocument::parse(&[]).unwrap().page_count(), 0);
    }

    #[test]
    fn test_truncated_document_rejected() {
        let bytes = doc().to_bytes();
        assert!(matches!(
            PagedDocument::parse(&bytes[..10]),
            Err(ParseError::MalformedRecording(_))
        ));
    }

    #[test]
    fn test_create_and_remove() {
        let mut doc = doc();
        doc.create_page(1, b"lemma".to_vec()).unwrap();
        assert_eq!(doc.page(1), Some(&b"lemma"[..]));
        assert_eq!(doc.remove_page(0).unwrap(), b"intro".to_vec());
        assert_eq!(doc.page_count(), 3);
        assert!(matches!(
            doc.remove_page(3),
            Err(EditError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }
}
