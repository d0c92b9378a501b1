#![forbid(unsafe_code)]

//! Keyed collection store: stable per-item state across refreshes.
//!
//! # Design
//!
//! [`KeyedCollectionStore<T, S>`] maps item ids to wrapped item states
//! `Rc<S>` built by a factory from raw items `T`. The owner drives it with
//! [`reconcile`](KeyedCollectionStore::reconcile); the store then broadcasts
//! the ordered snapshot to its subscribers.
//!
//! ```text
//! reconcile([a, b])      map: {a: A, b: B}        snapshot: [A, B]
//! B selected
//! reconcile([b, c])      map: {b: B, c: C'}       snapshot: [B, C']
//!                        A dropped, B reused (still selected), C' created
//! ```
//!
//! # Invariants
//!
//! 1. After `reconcile(items)` the key set equals the id set of `items`.
//! 2. A state whose id persists across reconciles is the same `Rc`.
//! 3. The snapshot preserves insertion order of surviving entries; new ids
//!    are appended in input order. Duplicate ids in one input keep the first.
//! 4. Every reconcile broadcasts, even when the key set is unchanged.
//! 5. Dropped states leave the selection set with their flag cleared.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use docstore_core::Identified;
use indexmap::IndexMap;
use tracing::{debug_span, trace, warn};

use crate::reactive::position::{PositionUpdate, Positioned};
use crate::reactive::subscribers::{SubscriberList, Unsubscribe};
use crate::selection::{Selectable, SelectionSet};

/// Handler type for collection subscribers.
pub type CollectionHandler<S> = dyn Fn(&[Rc<S>]);

struct CollectionInner<T, S> {
    items: RefCell<IndexMap<String, Rc<S>>>,
    snapshot: RefCell<Rc<[Rc<S>]>>,
    selection: SelectionSet<S>,
    subscribers: SubscriberList<CollectionHandler<S>>,
    factory: Box<dyn Fn(&T) -> S>,
}

/// Id-keyed map of item states with ordered snapshot broadcast.
///
/// Cloning creates a new handle to the **same** store.
pub struct KeyedCollectionStore<T, S> {
    inner: Rc<CollectionInner<T, S>>,
}

impl<T, S> Clone for KeyedCollectionStore<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, S: Selectable> fmt::Debug for KeyedCollectionStore<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCollectionStore")
            .field("ids", &self.inner.items.borrow().keys().collect::<Vec<_>>())
            .field("selected", &self.inner.selection.len())
            .field("subscriber_count", &self.inner.subscribers.len())
            .finish()
    }
}

impl<T, S> KeyedCollectionStore<T, S>
where
    T: Identified + 'static,
    S: Selectable + 'static,
{
    /// Create an empty store whose item states are built by `factory`.
    #[must_use]
    pub fn new(factory: impl Fn(&T) -> S + 'static) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                items: RefCell::new(IndexMap::new()),
                snapshot: RefCell::new(Rc::from(Vec::new())),
                selection: SelectionSet::new(),
                subscribers: SubscriberList::new(),
                factory: Box::new(factory),
            }),
        }
    }

    /// Bring the map in line with `items` and broadcast the new snapshot.
    ///
    /// The factory runs outside any internal borrow, so it may read the
    /// store.
    pub fn reconcile<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let _span = debug_span!("collection.reconcile").entered();
        let items: Vec<T> = items.into_iter().collect();

        let missing: Vec<&T> = {
            let map = self.inner.items.borrow();
            let mut seen = HashSet::new();
            items
                .iter()
                .filter(|item| !map.contains_key(item.id()) && seen.insert(item.id()))
                .collect()
        };
        let created = missing.len();
        let fresh: Vec<(String, Rc<S>)> = missing
            .into_iter()
            .map(|item| (item.id().to_owned(), Rc::new((self.inner.factory)(item))))
            .collect();

        let present: HashSet<&str> = items.iter().map(|item| item.id()).collect();
        let (snapshot, removed) = {
            let mut map = self.inner.items.borrow_mut();
            for (id, state) in fresh {
                map.entry(id).or_insert(state);
            }
            let before = map.len();
            map.retain(|id, _| present.contains(id.as_str()));
            let removed = before - map.len();
            let snapshot: Rc<[Rc<S>]> = map.values().cloned().collect();
            (snapshot, removed)
        };

        if removed > 0 {
            let map = self.inner.items.borrow();
            let live: HashSet<*const S> = map.values().map(Rc::as_ptr).collect();
            drop(map);
            self.inner
                .selection
                .retain(|state| live.contains(&Rc::as_ptr(state)));
        }

        trace!(created, removed, total = snapshot.len(), "reconciled");
        *self.inner.snapshot.borrow_mut() = Rc::clone(&snapshot);
        self.inner.subscribers.for_each(|handler| handler(&snapshot));
    }

    /// Subscribe to snapshot broadcasts. The handler is invoked immediately
    /// with the current snapshot.
    pub fn subscribe(&self, handler: impl Fn(&[Rc<S>]) + 'static) -> Unsubscribe {
        self.subscribe_shared(Rc::new(handler))
    }

    /// Like [`subscribe`](Self::subscribe) for an already shared handler;
    /// subscribing the same `Rc` twice yields two independent slots.
    pub fn subscribe_shared(&self, handler: Rc<CollectionHandler<S>>) -> Unsubscribe {
        let unsubscribe = self.inner.subscribers.push(Rc::clone(&handler));
        let snapshot = self.snapshot();
        handler(&snapshot);
        unsubscribe
    }

    /// The selection facet.
    #[must_use]
    pub fn selected(&self) -> &SelectionSet<S> {
        &self.inner.selection
    }

    /// The current ordered snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Rc<[Rc<S>]> {
        Rc::clone(&self.inner.snapshot.borrow())
    }

    /// Item state for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Rc<S>> {
        self.inner.items.borrow().get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T, S> KeyedCollectionStore<T, S>
where
    T: Identified + 'static,
    S: Selectable + Positioned + 'static,
{
    /// Move every selected item by `(dx, dy)`.
    ///
    /// A direct mutation of each item's position; the store itself does not
    /// broadcast.
    pub fn drag_by(&self, dx: f64, dy: f64) {
        let update = PositionUpdate::relative(dx, dy);
        for state in self.inner.selection.items() {
            if let Err(err) = state.position().set(&update) {
                warn!(error = %err, "drag update rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::position::{Position, PositionStore};
    use std::cell::Cell;

    #[derive(Debug, Clone)]
    struct Raw(&'static str);

    impl Identified for Raw {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[derive(Debug)]
    struct State {
        id: String,
        selected: Cell<bool>,
        position: PositionStore,
    }

    impl Selectable for State {
        fn is_selected(&self) -> bool {
            self.selected.get()
        }

        fn set_selected(&self, selected: bool) {
            self.selected.set(selected);
        }
    }

    impl Positioned for State {
        fn position(&self) -> &PositionStore {
            &self.position
        }
    }

    fn store() -> KeyedCollectionStore<Raw, State> {
        KeyedCollectionStore::new(|raw: &Raw| State {
            id: raw.0.to_owned(),
            selected: Cell::new(false),
            position: PositionStore::default(),
        })
    }

    fn ids(snapshot: &[Rc<State>]) -> Vec<String> {
        snapshot.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn reconcile_reuses_persisting_state() {
        let store = store();
        store.reconcile([Raw("a"), Raw("b")]);
        let b = store.get("b").unwrap();
        store.selected().add(&b);

        store.reconcile([Raw("b"), Raw("c")]);
        assert!(Rc::ptr_eq(&b, &store.get("b").unwrap()));
        assert!(b.is_selected());
        assert!(store.get("a").is_none());
        assert_eq!(ids(&store.snapshot()), vec!["b", "c"]);
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let store = store();
        store.reconcile([Raw("a"), Raw("b"), Raw("c")]);
        store.reconcile([Raw("c"), Raw("a"), Raw("d")]);
        assert_eq!(ids(&store.snapshot()), vec!["a", "c", "d"]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let created = Rc::new(Cell::new(0u32));
        let created_clone = Rc::clone(&created);
        let store = KeyedCollectionStore::new(move |raw: &Raw| {
            created_clone.set(created_clone.get() + 1);
            State {
                id: raw.0.to_owned(),
                selected: Cell::new(false),
                position: PositionStore::default(),
            }
        });
        store.reconcile([Raw("a"), Raw("a")]);
        assert_eq!(created.get(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn broadcasts_even_when_unchanged() {
        let store = store();
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let _unsub = store.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));
        assert_eq!(calls.get(), 1);

        store.reconcile([Raw("a")]);
        store.reconcile([Raw("a")]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn removed_state_leaves_selection() {
        let store = store();
        store.reconcile([Raw("a"), Raw("b")]);
        let a = store.get("a").unwrap();
        store.selected().add(&a);

        store.reconcile([Raw("b")]);
        assert!(!a.is_selected());
        assert!(store.selected().is_empty());
    }

    #[test]
    fn drag_moves_selected_only() {
        let store = store();
        store.reconcile([Raw("a"), Raw("b")]);
        let a = store.get("a").unwrap();
        let b = store.get("b").unwrap();
        store.selected().add(&a);

        store.drag_by(4.0, -2.0);
        store.drag_by(1.0, 0.0);
        assert_eq!(a.position().get(), Position::new(5.0, -2.0));
        assert_eq!(b.position().get(), Position::new(0.0, 0.0));
    }

    #[test]
    fn empty_reconcile_clears_map() {
        let store = store();
        store.reconcile([Raw("a")]);
        store.reconcile(Vec::<Raw>::new());
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn debug_reports_ids_and_counts() {
        let store = store();
        store.reconcile([Raw("a"), Raw("b")]);
        let a = store.get("a").unwrap();
        store.selected().add(&a);

        let text = format!("{store:?}");
        assert!(text.contains(r#"ids: ["a", "b"]"#), "{text}");
        assert!(text.contains("selected: 1"), "{text}");
        assert!(text.contains("subscriber_count: 0"), "{text}");
    }
}
