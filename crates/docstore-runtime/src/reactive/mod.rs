#![forbid(unsafe_code)]

//! Reactive primitives shared by every store.
//!
//! - [`SubscriberList`]: ordered handler list with snapshot broadcast.
//! - [`Unsubscribe`]: explicit, idempotent unsubscribe handle.
//! - [`SubscriptionGuard`]: RAII guard that unsubscribes on drop.
//! - [`PositionStore`]: version-tracked control position.
//!
//! # Architecture
//!
//! All primitives use `Rc` + `RefCell`/`Cell` for single-threaded shared
//! ownership. No borrow is held while a handler runs.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A subscriber receives the current value when it subscribes.
//! 3. An unsubscribed handler is never invoked again, even if it was removed
//!    in the middle of a broadcast.

pub mod position;
pub mod subscribers;

pub use position::{Position, PositionStore, PositionUpdate, Positioned, signed_delta};
pub use subscribers::{SubscriberId, SubscriberList, SubscriptionGuard, Unsubscribe};
