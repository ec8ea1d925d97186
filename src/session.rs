//! Holder for the current document.
//!
//! Exactly one [`DocumentRecord`] is current at a time. Readers get a shared
//! handle to an immutable record; `set` swaps in a new record wholesale, so
//! a reader holding the old handle keeps a consistent view.

use std::sync::{Arc, RwLock};

use crate::models::DocumentRecord;

#[derive(Debug, Default)]
pub struct DocumentSession {
    current: RwLock<Arc<DocumentRecord>>,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current record. The previous record is dropped once no
    /// reader holds it.
    pub fn set(&self, record: DocumentRecord) -> Arc<DocumentRecord> {
        let record = Arc::new(record);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = record.clone();
        record
    }

    /// The current record, or an empty record if nothing was loaded yet.
    pub fn get(&self) -> Arc<DocumentRecord> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_before_set_is_empty() {
        let session = DocumentSession::new();
        assert!(session.get().is_empty());
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let session = DocumentSession::new();
        session.set(DocumentRecord::new("a.docx", b"one".to_vec()).with_source_url("https://x/a"));
        let held = session.get();

        session.set(DocumentRecord::blank("New_Document.xlsx"));
        let current = session.get();

        assert_eq!(held.file_name, "a.docx");
        assert_eq!(held.source_url.as_deref(), Some("https://x/a"));
        assert_eq!(current.file_name, "New_Document.xlsx");
        assert!(current.source_url.is_none());
        assert!(current.is_blank());
    }
}
