#![forbid(unsafe_code)]

//! Runtime: subscribe/notify stores over externally owned state.
//!
//! # Role in docstore
//! `docstore-runtime` turns the collaborator contracts of `docstore-core`
//! into reactive stores a declarative UI can subscribe to.
//!
//! # Primary responsibilities
//! - **[`DocumentStore`]**: wraps zero or one document, follows its updates
//!   and deletion, and supports lookup by UUID or drag-and-drop payload.
//! - **[`KeyedCollectionStore`]** / **[`ControlsStore`]**: id-keyed item
//!   states that survive refreshes, with selection and dragging.
//! - **[`SelectionSet`]**: exclusive and additive selection.
//! - **[`EmbeddedStoreManager`]**: per-kind stores over a document's embedded
//!   collections.
//!
//! Everything is single-threaded and synchronous except UUID lookup.

pub mod collection;
pub mod controls;
pub mod document;
pub mod embedded;
pub mod reactive;
pub mod selection;

pub use collection::{CollectionHandler, KeyedCollectionStore};
pub use controls::{ControlState, ControlsStore};
pub use document::{DeleteCallback, DocumentHandler, DocumentStore, DocumentStoreOptions};
pub use embedded::{EmbeddedState, EmbeddedStore, EmbeddedStoreManager};
pub use reactive::{
    Position, PositionStore, PositionUpdate, Positioned, SubscriberId, SubscriberList,
    SubscriptionGuard, Unsubscribe,
};
pub use selection::{Selectable, SelectionSet};
