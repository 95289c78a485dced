use log::debug;

use crate::document::RecordedDocument;
use crate::error::EditError;
use crate::history::EditAction;

/// Removes document pages by index.
#[derive(Debug, Clone, Default)]
pub struct DeleteDocumentAction {
    pages: Vec<usize>,
    removed: Option<Vec<(usize, Vec<u8>)>>,
}

impl DeleteDocumentAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_page(&mut self, index: usize) {
        self.pages.push(index);
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }
}

impl EditAction<RecordedDocument> for DeleteDocumentAction {
    fn execute(&mut self, doc: &mut RecordedDocument) -> Result<(), EditError> {
        let mut indices = self.pages.clone();
        indices.sort_unstable();
        indices.dedup();

        // Remove from the back so earlier indices stay valid.
        let mut removed = Vec::with_capacity(indices.len());
        for index in indices.into_iter().rev() {
            match doc.document_mut().remove_page(index) {
                Ok(content) => removed.push((index, content)),
                Err(e) => {
                    for (index, content) in removed.into_iter().rev() {
                        doc.document_mut().create_page(index, content)?;
                    }
                    return Err(e);
                }
            }
        }
        debug!("removed document pages {:?}", self.pages);
        self.removed = Some(removed);
        Ok(())
    }

    fn undo(&mut self, doc: &mut RecordedDocument) -> Result<(), EditError> {
        let removed = self.removed.take().ok_or(EditError::NotExecuted)?;
        for (index, content) in removed.into_iter().rev() {
            doc.document_mut().create_page(index, content)?;
        }
        Ok(())
    }

    fn redo(&mut self, doc: &mut RecordedDocument) -> Result<(), EditError> {
        self.execute(doc)
    }
}

/// Inserts the pages of another document.
#[derive(Debug, Clone)]
pub struct InsertDocumentAction {
    pages: Vec<Vec<u8>>,
    split: bool,
    index: usize,
    inserted: Option<(usize, usize)>,
}

impl InsertDocumentAction {
    /// With `split`, the page at `index` is duplicated first and the new
    /// pages go between the two copies.
    pub fn new(pages: Vec<Vec<u8>>, split: bool, index: usize) -> Self {
        Self {
            pages,
            split,
            index,
            inserted: None,
        }
    }
}

impl EditAction<RecordedDocument> for InsertDocumentAction {
    fn execute(&mut self, doc: &mut RecordedDocument) -> Result<(), EditError> {
        let document = doc.document_mut();
        let mut at = self.index;
        let mut count = 0;

        if self.split {
            let copy = document
                .page(at)
                .map(<[u8]>::to_vec)
                .ok_or(EditError::IndexOutOfRange {
                    index: at,
                    len: document.page_count(),
                })?;
            at += 1;
            document.create_page(at, copy)?;
            count += 1;
        }

        for (i, page) in self.pages.iter().enumerate() {
            if let Err(e) = document.create_page(at + i, page.clone()) {
                for _ in 0..count {
                    document.remove_page(at)?;
                }
                return Err(e);
            }
            count += 1;
        }

        debug!("inserted {} document pages at {}", count, self.index);
        self.inserted = Some((at, count));
        Ok(())
    }

    fn undo(&mut self, doc: &mut RecordedDocument) -> Result<(), EditError> {
        let (first, count) = self.inserted.take().ok_or(EditError::NotExecuted)?;
        for _ in 0..count {
            doc.document_mut().remove_page(first)?;
        }
        Ok(())
    }

    fn redo(&mut self, doc: &mut RecordedDocument) -> Result<(), EditError> {
        self.execute(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PagedDocument;

    fn doc(n: u8) -> RecordedDocument {
        RecordedDocument::new(Box::new(PagedDocument::new(
            (0..n).map(|i| vec![i]).collect(),
        )))
    }

    fn contents(doc: &RecordedDocument) -> Vec<u8> {
        let d = doc.document();
        (0..d.page_count()).map(|i| d.page(i).unwrap()[0]).collect()
    }

    #[test]
    fn test_delete_document_pages() {
        let mut doc = doc(4);
        let mut action = DeleteDocumentAction::new();
        action.remove_page(1);
        action.remove_page(3);

        action.execute(&mut doc).unwrap();
        assert_eq!(contents(&doc), vec![0, 2]);
        action.undo(&mut doc).unwrap();
        assert_eq!(contents(&doc), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_failed_delete_restores_pages() {
        let mut doc = doc(2);
        let mut action = DeleteDocumentAction::new();
        action.remove_page(1);
        action.remove_page(5);
        assert!(action.execute(&mut doc).is_err());
        assert_eq!(contents(&doc), vec![0, 1]);
    }

    #[test]
    fn test_insert_document_split() {
        let mut doc = doc(3);
        let mut action = InsertDocumentAction::new(vec![vec![7], vec![8]], true, 1);

        action.execute(&mut doc).unwrap();
        assert_eq!(contents(&doc), vec![0, 1, 7, 8, 1, 2]);
        action.undo(&mut doc).unwrap();
        assert_eq!(contents(&doc), vec![0, 1, 2]);
    }

    #[test]
    fn test_insert_document_append() {
        let mut doc = doc(2);
        let mut action = InsertDocumentAction::new(vec![vec![9]], false, 2);
        action.execute(&mut doc).unwrap();
        assert_eq!(contents(&doc), vec![0, 1, 9]);
    }
}
