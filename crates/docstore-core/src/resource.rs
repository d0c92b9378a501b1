#![forbid(unsafe_code)]

//! Externally owned documents and their typed listener registry.
//!
//! A host document owns a [`ListenerRegistry`]: a table from
//! [`ListenerKey`] to a [`ResourceListener`]. Each store registers itself
//! under its own key, so any number of stores can watch the same document
//! without colliding. The host drives the table with
//! [`ListenerRegistry::notify_remove`] and [`ListenerRegistry::notify_update`].
//!
//! # Invariants
//!
//! 1. A key maps to at most one listener; registering an existing key
//!    replaces the previous listener.
//! 2. Notification order is registration order.
//! 3. Listeners may unregister themselves (or others) while being notified;
//!    the registry never holds a borrow across a listener call.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::logging::trace;
use crate::options::UpdateOptions;

/// Anything with a stable string identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

impl<T: Identified + ?Sized> Identified for Rc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }
}

/// The authoritative collection a document belongs to.
pub trait DocumentCollection {
    /// Membership test by document id.
    fn has(&self, id: &str) -> bool;
}

/// An embedded child document (e.g. an item owned by an actor).
pub trait EmbeddedDocument: Identified {
    /// Embedded collection name, e.g. `"Item"`.
    fn kind(&self) -> &str;
}

/// An externally owned, mutable document a store can wrap.
pub trait Document: Identified + 'static {
    /// The listener table stores register themselves in.
    fn listeners(&self) -> &ListenerRegistry;

    /// The collection this document lives in, if any.
    ///
    /// A document with no collection is treated as removed when a delete
    /// notification arrives.
    fn collection(&self) -> Option<Rc<dyn DocumentCollection>>;

    /// Current embedded documents of the given kind.
    fn embedded(&self, kind: &str) -> Vec<Rc<dyn EmbeddedDocument>> {
        let _ = kind;
        Vec::new()
    }
}

/// Callbacks a document invokes on registered listeners.
pub trait ResourceListener {
    /// The document may have been removed from its collection.
    fn on_remove(&self);

    /// The document broadcast a generic update.
    fn on_update(&self, options: &UpdateOptions);
}

/// Registration token for a [`ListenerRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerKey(String);

impl ListenerKey {
    /// Generate a unique key of the form `<prefix>-<uuid v4>`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", uuid::Uuid::new_v4()))
    }

    /// Wrap an explicit key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Entry = (ListenerKey, Rc<dyn ResourceListener>);

/// Per-document table of listeners keyed by [`ListenerKey`].
#[derive(Default)]
pub struct ListenerRegistry {
    entries: RefCell<Vec<Entry>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        f.debug_struct("ListenerRegistry")
            .field("keys", &entries.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `key`, returning the listener it replaced.
    pub fn register(
        &self,
        key: ListenerKey,
        listener: Rc<dyn ResourceListener>,
    ) -> Option<Rc<dyn ResourceListener>> {
        let mut entries = self.entries.borrow_mut();
        if let Some((_, slot)) = entries.iter_mut().find(|(k, _)| *k == key) {
            trace!(key = %key, "listener replaced");
            return Some(std::mem::replace(slot, listener));
        }
        entries.push((key, listener));
        None
    }

    /// Remove the listener under `key`. Returns whether one was present.
    pub fn unregister(&self, key: &ListenerKey) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        entries.len() != before
    }

    #[must_use]
    pub fn contains(&self, key: &ListenerKey) -> bool {
        self.entries.borrow().iter().any(|(k, _)| k == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Registered keys in registration order.
    #[must_use]
    pub fn keys(&self) -> Vec<ListenerKey> {
        self.entries.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Tell every listener the document may have been removed.
    pub fn notify_remove(&self) {
        for listener in self.snapshot() {
            listener.on_remove();
        }
    }

    /// Broadcast a generic update to every listener.
    pub fn notify_update(&self, options: &UpdateOptions) {
        for listener in self.snapshot() {
            listener.on_update(options);
        }
    }

    fn snapshot(&self) -> Vec<Rc<dyn ResourceListener>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }
}
