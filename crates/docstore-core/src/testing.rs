//! In-memory host collaborators for tests and demos.
//!
//! Enabled with the `test-helpers` feature.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::LookupError;
use crate::lookup::DocumentLookup;
use crate::options::UpdateOptions;
use crate::resource::{
    Document, DocumentCollection, EmbeddedDocument, Identified, ListenerRegistry,
};

/// A set of document ids acting as the authoritative collection.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    ids: RefCell<HashSet<String>>,
}

impl MemoryCollection {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn insert(&self, id: impl Into<String>) {
        self.ids.borrow_mut().insert(id.into());
    }

    pub fn remove(&self, id: &str) -> bool {
        self.ids.borrow_mut().remove(id)
    }
}

impl DocumentCollection for MemoryCollection {
    fn has(&self, id: &str) -> bool {
        self.ids.borrow().contains(id)
    }
}

/// Embedded document with an id and kind.
#[derive(Debug, Clone)]
pub struct TestEmbedded {
    id: String,
    kind: String,
}

impl TestEmbedded {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            kind: kind.into(),
        })
    }
}

impl Identified for TestEmbedded {
    fn id(&self) -> &str {
        &self.id
    }
}

impl EmbeddedDocument for TestEmbedded {
    fn kind(&self) -> &str {
        &self.kind
    }
}

/// A host document backed by a [`MemoryCollection`].
#[derive(Debug)]
pub struct TestDocument {
    id: String,
    collection: Option<Rc<MemoryCollection>>,
    listeners: ListenerRegistry,
    embedded: RefCell<HashMap<String, Vec<Rc<TestEmbedded>>>>,
}

impl TestDocument {
    /// A document that belongs to no collection.
    #[must_use]
    pub fn detached(id: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            collection: None,
            listeners: ListenerRegistry::new(),
            embedded: RefCell::new(HashMap::new()),
        })
    }

    /// A document inserted into `collection`.
    #[must_use]
    pub fn in_collection(id: impl Into<String>, collection: &Rc<MemoryCollection>) -> Rc<Self> {
        let id = id.into();
        collection.insert(id.clone());
        Rc::new(Self {
            id,
            collection: Some(Rc::clone(collection)),
            listeners: ListenerRegistry::new(),
            embedded: RefCell::new(HashMap::new()),
        })
    }

    /// Remove from the collection, then notify listeners.
    pub fn delete(&self) {
        if let Some(collection) = &self.collection {
            collection.remove(&self.id);
        }
        self.listeners.notify_remove();
    }

    /// Broadcast an update to listeners.
    pub fn update(&self, options: &UpdateOptions) {
        self.listeners.notify_update(options);
    }

    /// Replace the embedded documents of `kind`.
    pub fn set_embedded(&self, kind: &str, items: Vec<Rc<TestEmbedded>>) {
        self.embedded.borrow_mut().insert(kind.to_owned(), items);
    }
}

impl Identified for TestDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for TestDocument {
    fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    fn collection(&self) -> Option<Rc<dyn DocumentCollection>> {
        self.collection
            .as_ref()
            .map(|c| Rc::clone(c) as Rc<dyn DocumentCollection>)
    }

    fn embedded(&self, kind: &str) -> Vec<Rc<dyn EmbeddedDocument>> {
        self.embedded
            .borrow()
            .get(kind)
            .map(|items| {
                items
                    .iter()
                    .map(|item| Rc::clone(item) as Rc<dyn EmbeddedDocument>)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// UUID lookup over a fixed map of documents.
#[derive(Debug, Default)]
pub struct MemoryLookup {
    documents: RefCell<HashMap<String, Rc<TestDocument>>>,
    failing: Cell<bool>,
    calls: Cell<u32>,
}

impl MemoryLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uuid: impl Into<String>, document: Rc<TestDocument>) {
        self.documents.borrow_mut().insert(uuid.into(), document);
    }

    /// Make every subsequent lookup fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Number of lookups performed.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl DocumentLookup<TestDocument> for MemoryLookup {
    async fn lookup(&self, uuid: &str) -> Result<Option<Rc<TestDocument>>, LookupError> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.get() {
            return Err(LookupError::Backend("lookup disabled".into()));
        }
        if !uuid.contains('.') {
            return Err(LookupError::Malformed(uuid.to_owned()));
        }
        Ok(self.documents.borrow().get(uuid).cloned())
    }
}
