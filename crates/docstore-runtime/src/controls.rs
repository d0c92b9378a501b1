#![forbid(unsafe_code)]

//! On-screen control handles for positioning UI elements.
//!
//! A [`ControlState`] wraps one component with a `selected` flag and a
//! [`PositionStore`]. [`ControlsStore`] is the keyed collection of them:
//! the layer that owns the components calls `reconcile` whenever its
//! component list changes, and drags move every selected control.

use std::cell::Cell;
use std::fmt;

use docstore_core::Identified;

use crate::collection::KeyedCollectionStore;
use crate::reactive::position::{Position, PositionStore, Positioned};
use crate::selection::Selectable;

/// Per-control UI state.
pub struct ControlState<C> {
    id: String,
    component: C,
    selected: Cell<bool>,
    position: PositionStore,
}

impl<C> fmt::Debug for ControlState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlState")
            .field("id", &self.id)
            .field("selected", &self.selected.get())
            .field("position", &self.position.get())
            .finish()
    }
}

impl<C: Identified> ControlState<C> {
    /// Wrap `component` at the origin, unselected.
    #[must_use]
    pub fn new(component: C) -> Self {
        Self::with_position(component, Position::default())
    }

    #[must_use]
    pub fn with_position(component: C, position: Position) -> Self {
        Self {
            id: component.id().to_owned(),
            component,
            selected: Cell::new(false),
            position: PositionStore::new(position),
        }
    }

    /// The wrapped component.
    #[must_use]
    pub fn component(&self) -> &C {
        &self.component
    }
}

impl<C> Identified for ControlState<C> {
    fn id(&self) -> &str {
        &self.id
    }
}

impl<C> Selectable for ControlState<C> {
    fn is_selected(&self) -> bool {
        self.selected.get()
    }

    fn set_selected(&self, selected: bool) {
        self.selected.set(selected);
    }
}

impl<C> Positioned for ControlState<C> {
    fn position(&self) -> &PositionStore {
        &self.position
    }
}

/// Keyed collection of [`ControlState`]s.
pub type ControlsStore<C> = KeyedCollectionStore<C, ControlState<C>>;

impl<C> Default for KeyedCollectionStore<C, ControlState<C>>
where
    C: Identified + Clone + 'static,
{
    fn default() -> Self {
        Self::new(|component: &C| ControlState::new(component.clone()))
    }
}
