#![forbid(unsafe_code)]

//! Reactive wrapper around one externally owned document.
//!
//! # Design
//!
//! [`DocumentStore<D>`] holds zero or one `Rc<D>` and registers itself in
//! the held document's [`ListenerRegistry`](docstore_core::ListenerRegistry)
//! under a key generated once per store. The document drives the store
//! through that registration:
//!
//! ```text
//! host document ──notify_update──▶ StoreListener ──▶ broadcast(doc, options)
//!               ──notify_remove──▶ StoreListener ──▶ confirm gone? ──▶ broadcast(None, delete)
//!                                                                  ──▶ delete callback
//! ```
//!
//! # Invariants
//!
//! 1. At most one document is held; `set` unregisters from the old document
//!    before registering on the new one.
//! 2. Every subscriber receives `(current, {action: subscribe})` before any
//!    later broadcast.
//! 3. A delete notice for a document still present in its collection
//!    changes nothing and broadcasts nothing.
//! 4. A lookup whose result arrives after a newer `set` or a newer lookup
//!    started is discarded; the most recent request wins.
//! 5. Notices are honored only from the document currently held; a notice
//!    still being dispatched by a document the store already left is ignored.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Invalid document | Empty id | `StoreError::InvalidArgument`, state untouched |
//! | Options not an object | `set_with_value(doc, json!(3))` | `StoreError::InvalidArgument` |
//! | Lookup miss / error | Unknown uuid, backend failure | `false`, logged at debug |
//! | Store dropped without `destroy` | Owner forgot | Registration removed on drop |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use docstore_core::{
    Action, Document, DocumentLookup, ListenerKey, ParseDataTransferOptions, ResourceListener,
    StoreError, TransferParser, UpdateOptions,
};
use serde_json::Value;
use tracing::{debug, debug_span, trace};

use crate::embedded::EmbeddedStoreManager;
use crate::reactive::subscribers::{SubscriberList, Unsubscribe};

const KEY_PREFIX: &str = "docstore";

/// Handler type for document subscribers.
pub type DocumentHandler<D> = dyn Fn(Option<&Rc<D>>, &UpdateOptions);

/// Action invoked once when the held document is confirmed deleted.
pub type DeleteCallback = Rc<dyn Fn()>;

/// Configuration for a [`DocumentStore`].
#[derive(Clone, Default)]
pub struct DocumentStoreOptions {
    delete: Option<DeleteCallback>,
}

impl fmt::Debug for DocumentStoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStoreOptions")
            .field("delete", &self.delete.is_some())
            .finish()
    }
}

impl DocumentStoreOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delete callback.
    #[must_use]
    pub fn with_delete(mut self, delete: impl Fn() + 'static) -> Self {
        self.delete = Some(Rc::new(delete));
        self
    }

    #[must_use]
    pub fn delete(&self) -> Option<&DeleteCallback> {
        self.delete.as_ref()
    }

    /// Options from a host-supplied JSON value.
    ///
    /// The value must be an object. JSON cannot carry a callable, so a
    /// non-null `delete` entry is rejected.
    pub fn from_value(value: &Value) -> Result<Self, StoreError> {
        let Some(map) = value.as_object() else {
            return Err(StoreError::invalid_argument(
                "configure",
                "'options' is not a plain object",
            ));
        };
        match map.get("delete") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(_) => Err(StoreError::invalid_argument(
                "configure",
                "'delete' attribute in options is not a function",
            )),
        }
    }
}

struct DocumentState<D> {
    document: Option<Rc<D>>,
    update_options: Option<UpdateOptions>,
    delete: Option<DeleteCallback>,
    generation: u64,
    embedded: Option<Rc<EmbeddedStoreManager>>,
}

struct DocumentInner<D: Document> {
    key: ListenerKey,
    state: RefCell<DocumentState<D>>,
    subscribers: SubscriberList<DocumentHandler<D>>,
}

impl<D: Document> Drop for DocumentInner<D> {
    fn drop(&mut self) {
        if let Some(document) = self.state.get_mut().document.take() {
            document.listeners().unregister(&self.key);
        }
    }
}

/// Registration placed in the document's listener table.
struct StoreListener<D: Document> {
    inner: Weak<DocumentInner<D>>,
    document: Weak<D>,
}

impl<D: Document> StoreListener<D> {
    /// The store, if it still holds the document this listener was
    /// registered on.
    fn target(&self) -> Option<(DocumentStore<D>, Rc<D>)> {
        let store = DocumentStore {
            inner: self.inner.upgrade()?,
        };
        let document = self.document.upgrade()?;
        let held = store.get()?;
        if !Rc::ptr_eq(&held, &document) {
            trace!(id = document.id(), "ignoring notice from a document no longer held");
            return None;
        }
        Some((store, document))
    }
}

impl<D: Document> ResourceListener for StoreListener<D> {
    fn on_remove(&self) {
        if let Some((store, document)) = self.target() {
            store.handle_removed(&document);
        }
    }

    fn on_update(&self, options: &UpdateOptions) {
        if let Some((store, _)) = self.target() {
            store.handle_update(options);
        }
    }
}

/// Subscribe/notify wrapper around zero or one document.
///
/// Cloning creates a new handle to the **same** store.
pub struct DocumentStore<D: Document> {
    inner: Rc<DocumentInner<D>>,
}

impl<D: Document> Clone for DocumentStore<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Document> fmt::Debug for DocumentStore<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("DocumentStore")
            .field("key", &self.inner.key)
            .field("document", &state.document.as_ref().map(|d| d.id().to_owned()))
            .field("generation", &state.generation)
            .field("subscriber_count", &self.inner.subscribers.len())
            .finish()
    }
}

impl<D: Document> Default for DocumentStore<D> {
    fn default() -> Self {
        Self::new(DocumentStoreOptions::default())
    }
}

impl<D: Document> DocumentStore<D> {
    /// An empty store.
    #[must_use]
    pub fn new(options: DocumentStoreOptions) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                key: ListenerKey::generate(KEY_PREFIX),
                state: RefCell::new(DocumentState {
                    document: None,
                    update_options: None,
                    delete: options.delete,
                    generation: 0,
                    embedded: None,
                }),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    /// A store already holding `document`.
    pub fn with_document(
        document: Rc<D>,
        options: DocumentStoreOptions,
    ) -> Result<Self, StoreError> {
        let store = Self::new(options);
        store.set(Some(document), UpdateOptions::new())?;
        Ok(store)
    }

    /// The key this store registers under.
    #[must_use]
    pub fn listener_key(&self) -> &ListenerKey {
        &self.inner.key
    }

    /// The held document.
    #[must_use]
    pub fn get(&self) -> Option<Rc<D>> {
        self.inner.state.borrow().document.clone()
    }

    /// Options passed with the last update; empty when none.
    #[must_use]
    pub fn update_options(&self) -> UpdateOptions {
        self.inner
            .state
            .borrow()
            .update_options
            .clone()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Replace the delete callback. Last write wins; `None` clears it.
    pub fn configure(&self, options: DocumentStoreOptions) {
        self.inner.state.borrow_mut().delete = options.delete;
    }

    /// Hold `document` (or nothing) and broadcast.
    pub fn set(&self, document: Option<Rc<D>>, options: UpdateOptions) -> Result<(), StoreError> {
        if let Some(document) = &document {
            validate(document.as_ref())?;
        }
        let _span = debug_span!("document.set", key = %self.inner.key).entered();

        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.generation += 1;
            state.document.take()
        };
        debug!(
            previous = ?previous.as_ref().map(|d| d.id()),
            next = ?document.as_ref().map(|d| d.id()),
            "document set"
        );
        if let Some(previous) = previous {
            previous.listeners().unregister(&self.inner.key);
        }
        if let Some(document) = &document {
            let listener: Rc<dyn ResourceListener> = Rc::new(StoreListener {
                inner: Rc::downgrade(&self.inner),
                document: Rc::downgrade(document),
            });
            document
                .listeners()
                .register(self.inner.key.clone(), listener);
        }

        let embedded = {
            let mut state = self.inner.state.borrow_mut();
            state.document = document;
            state.update_options = Some(options.clone());
            state.embedded.clone()
        };

        self.broadcast(&options);
        if let Some(embedded) = embedded {
            embedded.refresh_all();
        }
        Ok(())
    }

    /// [`set`](Self::set) with host-supplied JSON options.
    pub fn set_with_value(
        &self,
        document: Option<Rc<D>>,
        options: Value,
    ) -> Result<(), StoreError> {
        self.set(document, UpdateOptions::try_from(options)?)
    }

    /// Look up `uuid` and hold the result.
    ///
    /// Resolves `false` without raising when the uuid is empty, the lookup
    /// fails or finds nothing, or a newer `set` or `set_from_uuid` started
    /// while the lookup was in flight. A request starts when the returned
    /// future is first polled.
    pub async fn set_from_uuid<L>(&self, lookup: &L, uuid: &str, options: UpdateOptions) -> bool
    where
        L: DocumentLookup<D>,
    {
        if uuid.is_empty() {
            return false;
        }
        let ticket = {
            let mut state = self.inner.state.borrow_mut();
            state.generation += 1;
            state.generation
        };

        let document = match lookup.lookup(uuid).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(uuid, "lookup found no document");
                return false;
            }
            Err(err) => {
                debug!(uuid, error = %err, "lookup failed");
                return false;
            }
        };

        if self.inner.state.borrow().generation != ticket {
            debug!(uuid, "discarding stale lookup result");
            return false;
        }
        match self.set(Some(document), options) {
            Ok(()) => true,
            Err(err) => {
                debug!(uuid, error = %err, "lookup result rejected");
                false
            }
        }
    }

    /// Extract a uuid from a drag-and-drop payload and hold its document.
    pub async fn set_from_data_transfer<L, P>(
        &self,
        lookup: &L,
        parser: &P,
        data: &Value,
        transfer: &ParseDataTransferOptions,
        options: UpdateOptions,
    ) -> bool
    where
        L: DocumentLookup<D>,
        P: TransferParser,
    {
        match parser.uuid_from(data, transfer) {
            Some(uuid) => self.set_from_uuid(lookup, &uuid, options).await,
            None => {
                trace!("no uuid in transfer payload");
                false
            }
        }
    }

    /// Subscribe to changes. The handler is invoked immediately with
    /// `(current, {action: subscribe})`.
    pub fn subscribe(
        &self,
        handler: impl Fn(Option<&Rc<D>>, &UpdateOptions) + 'static,
    ) -> Unsubscribe {
        self.subscribe_shared(Rc::new(handler))
    }

    /// Like [`subscribe`](Self::subscribe) for an already shared handler;
    /// subscribing the same `Rc` twice yields two independent slots.
    pub fn subscribe_shared(&self, handler: Rc<DocumentHandler<D>>) -> Unsubscribe {
        let unsubscribe = self.inner.subscribers.push(Rc::clone(&handler));
        let document = self.get();
        handler(
            document.as_ref(),
            &UpdateOptions::for_action(Action::Subscribe),
        );
        unsubscribe
    }

    /// Stores over the held document's embedded collections, created on
    /// first access.
    pub fn embedded(&self) -> Rc<EmbeddedStoreManager> {
        let existing = self.inner.state.borrow().embedded.clone();
        if let Some(manager) = existing {
            return manager;
        }

        let weak = Rc::downgrade(&self.inner);
        let manager = Rc::new(EmbeddedStoreManager::new(move |kind| {
            let Some(inner) = weak.upgrade() else {
                return Vec::new();
            };
            let document = inner.state.borrow().document.clone();
            document.map(|d| d.embedded(kind)).unwrap_or_default()
        }));
        self.inner.state.borrow_mut().embedded = Some(Rc::clone(&manager));
        manager
    }

    /// Detach from the held document and drop every subscriber.
    ///
    /// The store must not be reused afterwards.
    pub fn destroy(&self) {
        let document = {
            let mut state = self.inner.state.borrow_mut();
            state.delete = None;
            state.embedded = None;
            state.document.take()
        };
        if let Some(document) = document {
            document.listeners().unregister(&self.inner.key);
        }
        self.inner.subscribers.clear();
        debug!(key = %self.inner.key, "document store destroyed");
    }

    fn broadcast(&self, options: &UpdateOptions) {
        let document = self.get();
        self.inner
            .subscribers
            .for_each(|handler| handler(document.as_ref(), options));
    }

    fn handle_removed(&self, document: &Rc<D>) {
        let still_present = document
            .collection()
            .is_some_and(|collection| collection.has(document.id()));
        if still_present {
            trace!(id = document.id(), "ignoring delete notice for live document");
            return;
        }

        debug!(id = document.id(), "held document deleted");
        document.listeners().unregister(&self.inner.key);
        let delete = {
            let mut state = self.inner.state.borrow_mut();
            state.document = None;
            state.delete.clone()
        };

        self.broadcast(&UpdateOptions::for_action(Action::Delete));
        if let Some(delete) = delete {
            delete();
        }
        self.inner.state.borrow_mut().update_options = None;
    }

    fn handle_update(&self, options: &UpdateOptions) {
        let embedded = {
            let mut state = self.inner.state.borrow_mut();
            state.update_options = Some(options.clone());
            state.embedded.clone()
        };
        self.broadcast(options);

        let Some(embedded) = embedded else {
            return;
        };
        if let Some(kind) = options.render_context().and_then(embedded_kind) {
            debug!(
                render_context = ?options.render_context(),
                kind,
                "embedded collection changed"
            );
            embedded.update(kind);
        }
    }
}

/// `"createItem"` / `"deleteItem"` → `"Item"`.
fn embedded_kind(render_context: &str) -> Option<&str> {
    render_context
        .strip_prefix("create")
        .or_else(|| render_context.strip_prefix("delete"))
        .filter(|kind| !kind.is_empty())
}

fn validate<D: Document>(document: &D) -> Result<(), StoreError> {
    if document.id().is_empty() {
        return Err(StoreError::invalid_argument(
            "set",
            "'document' is not a valid document (empty id)",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selectable;
    use docstore_core::testing::{MemoryCollection, TestDocument};
    use std::cell::Cell;

    #[test]
    fn embedded_kind_parses_render_context() {
        assert_eq!(embedded_kind("createItem"), Some("Item"));
        assert_eq!(embedded_kind("deleteActiveEffect"), Some("ActiveEffect"));
        assert_eq!(embedded_kind("updateItem"), None);
        assert_eq!(embedded_kind("create"), None);
    }

    #[test]
    fn options_from_value() {
        assert!(DocumentStoreOptions::from_value(&serde_json::json!({})).is_ok());
        assert!(DocumentStoreOptions::from_value(&serde_json::json!({ "delete": null })).is_ok());
        assert!(DocumentStoreOptions::from_value(&serde_json::json!({ "delete": 1 })).is_err());
        assert!(DocumentStoreOptions::from_value(&serde_json::json!([])).is_err());
    }

    #[test]
    fn empty_id_is_rejected_and_state_untouched() {
        let store: DocumentStore<TestDocument> = DocumentStore::default();
        let good = TestDocument::detached("a");
        store.set(Some(Rc::clone(&good)), UpdateOptions::new()).unwrap();

        let err = store
            .set(Some(TestDocument::detached("")), UpdateOptions::new())
            .unwrap_err();
        assert_eq!(err.operation(), "set");
        assert!(Rc::ptr_eq(&store.get().unwrap(), &good));
        assert!(good.listeners().contains(store.listener_key()));
    }

    #[test]
    fn drop_without_destroy_unregisters() {
        let doc = TestDocument::detached("a");
        let store = DocumentStore::with_document(Rc::clone(&doc), DocumentStoreOptions::new())
            .unwrap();
        assert_eq!(doc.listeners().len(), 1);
        drop(store);
        assert!(doc.listeners().is_empty());
    }

    #[test]
    fn update_notice_refreshes_embedded_on_create_context() {
        let collection = MemoryCollection::new();
        let doc = TestDocument::in_collection("actor", &collection);
        let store = DocumentStore::with_document(Rc::clone(&doc), DocumentStoreOptions::new())
            .unwrap();

        let items = store.embedded().create("Item");
        assert!(items.is_empty());

        let broadcasts = Rc::new(Cell::new(0u32));
        let b = Rc::clone(&broadcasts);
        let _unsub = items.subscribe(move |_| b.set(b.get() + 1));

        doc.set_embedded("Item", vec![docstore_core::testing::TestEmbedded::new("i1", "Item")]);
        doc.update(&UpdateOptions::new().with_render_context("createItem"));
        assert_eq!(items.len(), 1);
        assert_eq!(broadcasts.get(), 2);

        doc.update(&UpdateOptions::new().with_render_context("updateActor"));
        assert_eq!(broadcasts.get(), 2);
        assert_eq!(
            store.update_options().render_context(),
            Some("updateActor")
        );
    }

    #[test]
    fn update_notice_refreshes_embedded_on_delete_context() {
        use docstore_core::testing::TestEmbedded;

        let doc = TestDocument::detached("actor");
        doc.set_embedded("Item", vec![TestEmbedded::new("i1", "Item")]);
        doc.set_embedded("ActiveEffect", vec![TestEmbedded::new("e1", "ActiveEffect")]);
        let store = DocumentStore::with_document(Rc::clone(&doc), DocumentStoreOptions::new())
            .unwrap();
        let manager = store.embedded();
        let items = manager.create("Item");
        let effects = manager.create("ActiveEffect");
        let sword = items.get("i1").unwrap();
        items.selected().add(&sword);

        doc.set_embedded("Item", Vec::new());
        doc.set_embedded("ActiveEffect", Vec::new());
        doc.update(&UpdateOptions::new().with_render_context("deleteItem"));

        assert!(items.is_empty());
        assert!(items.selected().is_empty());
        assert!(!sword.is_selected());
        assert_eq!(effects.len(), 1);
    }
}
