#![cfg_attr(not(test), forbid(unsafe_code))]

//! Core: collaborator contracts for docstore reactive stores.
//!
//! # Role in docstore
//! `docstore-core` is the boundary layer. It defines what a store expects
//! from the host: documents with a typed listener table, the collection used
//! to confirm deletions, asynchronous UUID lookup, and drag-and-drop payload
//! parsing. The reactive stores themselves live in `docstore-runtime`.
//!
//! # Primary responsibilities
//! - **Documents**: [`Document`], [`DocumentCollection`], [`EmbeddedDocument`].
//! - **Listener registry**: [`ListenerRegistry`] keyed by [`ListenerKey`].
//! - **Update metadata**: [`UpdateOptions`] and [`Action`].
//! - **Lookup**: [`DocumentLookup`] and [`TransferParser`].
//! - **Errors**: [`StoreError`] and [`LookupError`].

pub mod error;
pub mod logging;
pub mod lookup;
pub mod options;
pub mod resource;
pub mod transfer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use error::{LookupError, StoreError};
pub use lookup::DocumentLookup;
pub use options::{Action, UpdateOptions};
pub use resource::{
    Document, DocumentCollection, EmbeddedDocument, Identified, ListenerKey, ListenerRegistry,
    ResourceListener,
};
pub use transfer::{ParseDataTransferOptions, TransferParser, UuidTransferParser};
