use crate::document::Document;
use crate::types::DocumentId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) docs: HashMap<DocumentId, Document>,
    /// Insertion order; find results follow it when no sort is given.
    pub(crate) order: Vec<DocumentId>,
}

impl Inner {
    pub(crate) fn ordered(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.docs.get(id))
    }
}

/// Failures armed by tests to exercise error propagation.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub(crate) fail_next_find: bool,
    pub(crate) saves_before_failure: Option<usize>,
}

/// In-process collection implementing `DocumentStore`.
pub struct MemoryCollection {
    name: String,
    pub(crate) inner: RwLock<Inner>,
    pub(crate) faults: Mutex<Faults>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Inner::default()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Store a document as-is, replacing any document with the same id.
    pub fn insert_document(&self, document: Document) -> DocumentId {
        let id = document.id.clone();
        let mut inner = self.inner.write();
        if inner.docs.insert(id.clone(), document).is_none() {
            inner.order.push(id.clone());
        }
        id
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.inner.read().docs.get(id).cloned()
    }

    pub fn get_all_documents(&self) -> Vec<Document> {
        self.inner.read().ordered().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().docs.is_empty()
    }

    pub fn name_str(&self) -> &str {
        &self.name
    }

    /// Make the next `find` fail with a store error.
    pub fn fail_next_find(&self) {
        self.faults.lock().fail_next_find = true;
    }

    /// Let `n` more saves succeed, then fail every following save.
    pub fn fail_saves_after(&self, n: usize) {
        self.faults.lock().saves_before_failure = Some(n);
    }
}
