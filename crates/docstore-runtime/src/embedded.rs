#![forbid(unsafe_code)]

//! Stores over a document's embedded collections, keyed by kind.
//!
//! An [`EmbeddedStoreManager`] is owned by a
//! [`DocumentStore`](crate::document::DocumentStore) and constructed on first
//! access. Each kind (`"Item"`, `"ActiveEffect"`, ...) gets one
//! [`EmbeddedStore`], reconciled against whatever the resolver reports for
//! the currently held document.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use docstore_core::{EmbeddedDocument, Identified};
use indexmap::IndexMap;
use tracing::debug;

use crate::collection::KeyedCollectionStore;
use crate::selection::Selectable;

/// UI state for one embedded document.
pub struct EmbeddedState {
    document: Rc<dyn EmbeddedDocument>,
    selected: Cell<bool>,
}

impl EmbeddedState {
    #[must_use]
    pub fn new(document: Rc<dyn EmbeddedDocument>) -> Self {
        Self {
            document,
            selected: Cell::new(false),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Rc<dyn EmbeddedDocument> {
        &self.document
    }
}

impl fmt::Debug for EmbeddedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedState")
            .field("id", &self.document.id())
            .field("kind", &self.document.kind())
            .field("selected", &self.selected.get())
            .finish()
    }
}

impl Identified for EmbeddedState {
    fn id(&self) -> &str {
        self.document.id()
    }
}

impl Selectable for EmbeddedState {
    fn is_selected(&self) -> bool {
        self.selected.get()
    }

    fn set_selected(&self, selected: bool) {
        self.selected.set(selected);
    }
}

/// Keyed store of one embedded collection.
pub type EmbeddedStore = KeyedCollectionStore<Rc<dyn EmbeddedDocument>, EmbeddedState>;

type Resolver = dyn Fn(&str) -> Vec<Rc<dyn EmbeddedDocument>>;

/// Lazily created embedded stores, one per kind.
pub struct EmbeddedStoreManager {
    resolver: Box<Resolver>,
    stores: RefCell<IndexMap<String, EmbeddedStore>>,
}

impl fmt::Debug for EmbeddedStoreManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedStoreManager")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl EmbeddedStoreManager {
    /// `resolver(kind)` returns the current embedded documents of `kind`.
    #[must_use]
    pub fn new(resolver: impl Fn(&str) -> Vec<Rc<dyn EmbeddedDocument>> + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            stores: RefCell::new(IndexMap::new()),
        }
    }

    /// Get or create the store for `kind`, refreshed from the resolver.
    pub fn create(&self, kind: &str) -> EmbeddedStore {
        let existing = self.stores.borrow().get(kind).cloned();
        let store = match existing {
            Some(store) => store,
            None => {
                let store = EmbeddedStore::new(|document: &Rc<dyn EmbeddedDocument>| {
                    EmbeddedState::new(Rc::clone(document))
                });
                self.stores
                    .borrow_mut()
                    .insert(kind.to_owned(), store.clone());
                store
            }
        };
        store.reconcile((self.resolver)(kind));
        store
    }

    /// The store for `kind`, if one was created.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<EmbeddedStore> {
        self.stores.borrow().get(kind).cloned()
    }

    /// Refresh the store for `kind`. Returns whether one exists.
    pub fn update(&self, kind: &str) -> bool {
        let Some(store) = self.get(kind) else {
            return false;
        };
        debug!(kind, "refreshing embedded store");
        store.reconcile((self.resolver)(kind));
        true
    }

    /// Refresh every store, e.g. after the held document changed.
    pub fn refresh_all(&self) {
        for kind in self.kinds() {
            self.update(&kind);
        }
    }

    /// Drop the store for `kind`. Returns whether one existed.
    pub fn destroy(&self, kind: &str) -> bool {
        self.stores.borrow_mut().shift_remove(kind).is_some()
    }

    /// Kinds with a live store, in creation order.
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.stores.borrow().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::testing::TestEmbedded;

    fn manager(source: Rc<RefCell<Vec<Rc<TestEmbedded>>>>) -> EmbeddedStoreManager {
        EmbeddedStoreManager::new(move |kind| {
            source
                .borrow()
                .iter()
                .filter(|item| item.kind() == kind)
                .map(|item| Rc::clone(item) as Rc<dyn EmbeddedDocument>)
                .collect()
        })
    }

    #[test]
    fn create_reconciles_and_reuses() {
        let source = Rc::new(RefCell::new(vec![
            TestEmbedded::new("i1", "Item"),
            TestEmbedded::new("e1", "Effect"),
        ]));
        let manager = manager(Rc::clone(&source));

        let items = manager.create("Item");
        assert_eq!(items.len(), 1);
        assert!(items.get("i1").is_some());

        let again = manager.create("Item");
        assert!(Rc::ptr_eq(
            &items.get("i1").unwrap(),
            &again.get("i1").unwrap()
        ));
        assert_eq!(manager.kinds(), vec!["Item".to_owned()]);
    }

    #[test]
    fn update_only_touches_existing_kinds() {
        let source = Rc::new(RefCell::new(vec![TestEmbedded::new("i1", "Item")]));
        let manager = manager(Rc::clone(&source));
        assert!(!manager.update("Item"));

        let items = manager.create("Item");
        source.borrow_mut().push(TestEmbedded::new("i2", "Item"));
        assert!(manager.update("Item"));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn destroy_forgets_kind() {
        let manager = manager(Rc::new(RefCell::new(Vec::new())));
        let _ = manager.create("Item");
        assert!(manager.destroy("Item"));
        assert!(!manager.destroy("Item"));
        assert!(manager.get("Item").is_none());
    }
}
