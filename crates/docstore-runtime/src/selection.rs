#![forbid(unsafe_code)]

//! Selection set with exclusive and additive selection.
//!
//! The set is the source of truth; each member's `selected` flag is the
//! observable projection of membership. Membership is by identity
//! (`Rc::ptr_eq`), not by id, so two distinct item states with the same id
//! are distinct members.
//!
//! # Invariants
//!
//! 1. `item.is_selected()` is true iff `item` is a member.
//! 2. `set(x)` leaves exactly one member and never clears `x`'s flag on the
//!    way.
//!
//! There is no broadcast: callers re-render through the owning store's own
//! notifications or by polling flags.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Item states carrying a `selected` flag.
pub trait Selectable {
    fn is_selected(&self) -> bool;
    fn set_selected(&self, selected: bool);
}

/// Identity set of selected item states.
pub struct SelectionSet<S> {
    items: RefCell<Vec<Rc<S>>>,
}

impl<S> Default for SelectionSet<S> {
    fn default() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
        }
    }
}

impl<S> fmt::Debug for SelectionSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionSet")
            .field("len", &self.items.borrow().len())
            .finish()
    }
}

impl<S: Selectable> SelectionSet<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `item`. Idempotent.
    pub fn add(&self, item: &Rc<S>) {
        {
            let mut items = self.items.borrow_mut();
            if !items.iter().any(|entry| Rc::ptr_eq(entry, item)) {
                items.push(Rc::clone(item));
            }
        }
        item.set_selected(true);
    }

    /// Remove `item` if present. Returns whether it was a member.
    pub fn remove(&self, item: &Rc<S>) -> bool {
        let removed = {
            let mut items = self.items.borrow_mut();
            let before = items.len();
            items.retain(|entry| !Rc::ptr_eq(entry, item));
            items.len() != before
        };
        if removed {
            item.set_selected(false);
        }
        removed
    }

    /// Deselect everything.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.items.borrow_mut());
        for entry in &previous {
            entry.set_selected(false);
        }
    }

    /// Exclusive select: `item` becomes the only member.
    pub fn set(&self, item: &Rc<S>) {
        item.set_selected(true);
        let previous = std::mem::replace(&mut *self.items.borrow_mut(), vec![Rc::clone(item)]);
        for entry in previous.iter().filter(|entry| !Rc::ptr_eq(entry, item)) {
            entry.set_selected(false);
        }
    }

    #[must_use]
    pub fn contains(&self, item: &Rc<S>) -> bool {
        self.items.borrow().iter().any(|entry| Rc::ptr_eq(entry, item))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Members in selection order.
    #[must_use]
    pub fn items(&self) -> Vec<Rc<S>> {
        self.items.borrow().clone()
    }

    /// Drop members rejected by `keep`, clearing their flags.
    pub(crate) fn retain(&self, mut keep: impl FnMut(&Rc<S>) -> bool) {
        let dropped: Vec<Rc<S>> = {
            let mut items = self.items.borrow_mut();
            let (kept, dropped): (Vec<Rc<S>>, Vec<Rc<S>>) =
                std::mem::take(&mut *items).into_iter().partition(|e| keep(e));
            *items = kept;
            dropped
        };
        for entry in &dropped {
            entry.set_selected(false);
        }
    }
}
