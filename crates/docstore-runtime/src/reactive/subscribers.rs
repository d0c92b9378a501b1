#![forbid(unsafe_code)]

//! Ordered subscriber lists with explicit unsubscription.
//!
//! # Design
//!
//! [`SubscriberList<F>`] stores `Rc<F>` handlers (usually `F = dyn Fn(..)`)
//! tagged with a unique [`SubscriberId`]. Pushing returns an
//! [`Unsubscribe`] handle that removes exactly that entry, so the same
//! handler pushed twice occupies two slots and each handle removes its own.
//!
//! # Invariants
//!
//! 1. Handlers are invoked in registration order.
//! 2. Broadcast iterates a snapshot taken at broadcast start; an entry
//!    removed mid-broadcast is skipped, an entry added mid-broadcast is not
//!    visited by that broadcast.
//! 3. No borrow is held while a handler runs, so handlers may subscribe,
//!    unsubscribe, or read the owning store.
//! 4. Unsubscribing twice, or after the list is gone, is a no-op.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identity of one subscription slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

struct Slot<F: ?Sized> {
    id: SubscriberId,
    /// Cleared on removal; broadcast snapshots share it.
    live: Rc<Cell<bool>>,
    handler: Rc<F>,
}

struct Entries<F: ?Sized> {
    next_id: u64,
    slots: Vec<Slot<F>>,
}

impl<F: ?Sized> Entries<F> {
    fn remove(&mut self, id: SubscriberId) -> bool {
        match self.slots.iter().position(|slot| slot.id == id) {
            Some(index) => {
                self.slots.remove(index).live.set(false);
                true
            }
            None => false,
        }
    }
}

/// Ordered list of subscriber handlers.
///
/// Cloning a `SubscriberList` creates a new handle to the **same** list.
pub struct SubscriberList<F: ?Sized> {
    entries: Rc<RefCell<Entries<F>>>,
}

impl<F: ?Sized> Clone for SubscriberList<F> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<F: ?Sized> Default for SubscriberList<F> {
    fn default() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Entries {
                next_id: 0,
                slots: Vec::new(),
            })),
        }
    }
}

impl<F: ?Sized> fmt::Debug for SubscriberList<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}

impl<F: ?Sized> SubscriberList<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the slot `id`. Returns whether it was present.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.entries.borrow_mut().remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.borrow().slots.iter().any(|slot| slot.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().slots.is_empty()
    }

    /// Drop every handler.
    pub fn clear(&self) {
        for slot in self.entries.borrow_mut().slots.drain(..) {
            slot.live.set(false);
        }
    }

    /// Invoke `call` with every handler still subscribed, in order.
    pub fn for_each(&self, mut call: impl FnMut(&F)) {
        let snapshot: Vec<(Rc<Cell<bool>>, Rc<F>)> = self
            .entries
            .borrow()
            .slots
            .iter()
            .map(|slot| (Rc::clone(&slot.live), Rc::clone(&slot.handler)))
            .collect();

        for (live, handler) in snapshot {
            if live.get() {
                call(&handler);
            }
        }
    }
}

impl<F: ?Sized + 'static> SubscriberList<F> {
    /// Append a handler. The returned handle removes this slot only.
    pub fn push(&self, handler: Rc<F>) -> Unsubscribe {
        let id = {
            let mut entries = self.entries.borrow_mut();
            let id = SubscriberId(entries.next_id);
            entries.next_id += 1;
            entries.slots.push(Slot {
                id,
                live: Rc::new(Cell::new(true)),
                handler,
            });
            id
        };
        let weak: Weak<RefCell<Entries<F>>> = Rc::downgrade(&self.entries);
        Unsubscribe::new(id, move || {
            if let Some(entries) = weak.upgrade() {
                entries.borrow_mut().remove(id);
            }
        })
    }
}

/// Handle returned by `subscribe`; removes the subscription when invoked.
///
/// Dropping the handle does **not** unsubscribe. Use
/// [`Unsubscribe::into_guard`] for drop-to-unsubscribe behavior.
#[derive(Clone)]
#[must_use = "the handler stays subscribed until unsubscribe() is called"]
pub struct Unsubscribe {
    id: SubscriberId,
    detach: Rc<dyn Fn()>,
}

impl Unsubscribe {
    fn new(id: SubscriberId, detach: impl Fn() + 'static) -> Self {
        Self {
            id,
            detach: Rc::new(detach),
        }
    }

    /// Remove the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        (self.detach)();
    }

    /// The slot this handle removes.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Convert into an RAII guard that unsubscribes on drop.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { handle: self }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}

/// RAII guard for a subscription.
///
/// Dropping the guard removes the handler from its list.
#[derive(Debug)]
pub struct SubscriptionGuard {
    handle: Unsubscribe,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}
