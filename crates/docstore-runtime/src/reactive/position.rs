#![forbid(unsafe_code)]

//! Version-tracked position value for on-screen controls.
//!
//! # Design
//!
//! [`PositionStore`] wraps a [`Position`] in shared, reference-counted
//! storage. Updates arrive as [`PositionUpdate`]s whose fields are strings:
//! a leading `+` or `-` means "adjust by", a leading `=` or a bare number
//! means "move to".
//! When the resulting position differs from the current one, the version is
//! bumped and subscribers are notified in registration order.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on each value-changing update.
//! 2. An update that leaves the position unchanged is a no-op.
//! 3. An update is applied atomically: if either field fails to parse,
//!    nothing changes.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Malformed field | `"abc"`, `"+"`, `"=-"`, `"NaN"` | `StoreError::InvalidArgument` |

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use docstore_core::StoreError;
use serde::{Deserialize, Serialize};

use super::subscribers::{SubscriberList, Unsubscribe};

/// Absolute on-screen position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub left: f64,
    pub top: f64,
}

impl Position {
    #[must_use]
    pub const fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }
}

/// String-valued position update.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub left: Option<String>,
    pub top: Option<String>,
}

impl PositionUpdate {
    /// Relative adjustment by `(dx, dy)`.
    #[must_use]
    pub fn relative(dx: f64, dy: f64) -> Self {
        Self {
            left: Some(signed_delta(dx)),
            top: Some(signed_delta(dy)),
        }
    }

    /// Absolute move to `(left, top)`. Values carry an `=` prefix so a
    /// negative target is not read as an adjustment.
    #[must_use]
    pub fn absolute(left: f64, top: f64) -> Self {
        Self {
            left: Some(format!("={left}")),
            top: Some(format!("={top}")),
        }
    }
}

/// Format a delta so the positioning layer reads it as relative:
/// non-negative values get a `+` prefix.
#[must_use]
pub fn signed_delta(delta: f64) -> String {
    if delta < 0.0 {
        delta.to_string()
    } else {
        format!("+{}", delta.abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Adjustment {
    To(f64),
    By(f64),
}

impl Adjustment {
    fn parse(field: &str, raw: &str) -> Result<Self, StoreError> {
        let raw = raw.trim();
        let (relative, number) = match raw.strip_prefix('=') {
            Some(rest) => (false, rest),
            None => (raw.starts_with('+') || raw.starts_with('-'), raw),
        };
        let value: f64 = number.parse().map_err(|_| {
            StoreError::invalid_argument(
                "position.set",
                format!("'{field}' value {raw:?} is not a number"),
            )
        })?;
        if !value.is_finite() {
            return Err(StoreError::invalid_argument(
                "position.set",
                format!("'{field}' value {raw:?} is not finite"),
            ));
        }
        Ok(if relative { Self::By(value) } else { Self::To(value) })
    }

    fn apply(self, current: f64) -> f64 {
        match self {
            Self::To(value) => value,
            Self::By(delta) => current + delta,
        }
    }
}

fn parse_field(field: &str, raw: Option<&String>) -> Result<Option<Adjustment>, StoreError> {
    raw.map(|raw| Adjustment::parse(field, raw)).transpose()
}

struct PositionInner {
    value: Cell<Position>,
    version: Cell<u64>,
    subscribers: SubscriberList<dyn Fn(&Position)>,
}

/// A shared, version-tracked position with change notification.
///
/// Cloning a `PositionStore` creates a new handle to the **same** position.
#[derive(Clone)]
pub struct PositionStore {
    inner: Rc<PositionInner>,
}

impl fmt::Debug for PositionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionStore")
            .field("value", &self.inner.value.get())
            .field("version", &self.inner.version.get())
            .field("subscriber_count", &self.inner.subscribers.len())
            .finish()
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new(Position::default())
    }
}

impl PositionStore {
    #[must_use]
    pub fn new(position: Position) -> Self {
        Self {
            inner: Rc::new(PositionInner {
                value: Cell::new(position),
                version: Cell::new(0),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> Position {
        self.inner.value.get()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Apply an update. Returns whether the position changed.
    pub fn set(&self, update: &PositionUpdate) -> Result<bool, StoreError> {
        let left = parse_field("left", update.left.as_ref())?;
        let top = parse_field("top", update.top.as_ref())?;

        let current = self.get();
        let next = Position {
            left: left.map_or(current.left, |adj| adj.apply(current.left)),
            top: top.map_or(current.top, |adj| adj.apply(current.top)),
        };
        Ok(self.replace(next))
    }

    /// Replace the position outright. Returns whether it changed.
    pub fn replace(&self, position: Position) -> bool {
        if self.inner.value.get() == position {
            return false;
        }
        self.inner.value.set(position);
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.subscribers.for_each(|handler| handler(&position));
        true
    }

    /// Subscribe to position changes. The handler is invoked immediately
    /// with the current position.
    pub fn subscribe(&self, handler: impl Fn(&Position) + 'static) -> Unsubscribe {
        let handler: Rc<dyn Fn(&Position)> = Rc::new(handler);
        let unsubscribe = self.inner.subscribers.push(Rc::clone(&handler));
        handler(&self.get());
        unsubscribe
    }
}

/// Item states that carry a [`PositionStore`].
pub trait Positioned {
    fn position(&self) -> &PositionStore;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn signed_delta_prefixes_non_negative() {
        assert_eq!(signed_delta(5.0), "+5");
        assert_eq!(signed_delta(0.0), "+0");
        assert_eq!(signed_delta(-0.0), "+0");
        assert_eq!(signed_delta(-3.0), "-3");
        assert_eq!(signed_delta(2.5), "+2.5");
    }

    #[test]
    fn relative_and_absolute_updates() {
        let store = PositionStore::new(Position::new(10.0, 20.0));
        assert!(store.set(&PositionUpdate::relative(5.0, -4.0)).unwrap());
        assert_eq!(store.get(), Position::new(15.0, 16.0));

        assert!(store.set(&PositionUpdate::absolute(1.0, 2.0)).unwrap());
        assert_eq!(store.get(), Position::new(1.0, 2.0));
        assert_eq!(store.version(), 2);

        assert!(store.set(&PositionUpdate::absolute(-7.0, 0.5)).unwrap());
        assert_eq!(store.get(), Position::new(-7.0, 0.5));

        let bare = PositionUpdate {
            left: Some("12".into()),
            top: Some("=-1".into()),
        };
        assert!(store.set(&bare).unwrap());
        assert_eq!(store.get(), Position::new(12.0, -1.0));
    }

    #[test]
    fn partial_update_keeps_other_field() {
        let store = PositionStore::new(Position::new(3.0, 4.0));
        let update = PositionUpdate {
            left: Some("+1".into()),
            top: None,
        };
        store.set(&update).unwrap();
        assert_eq!(store.get(), Position::new(4.0, 4.0));
    }

    #[test]
    fn no_change_no_version_bump() {
        let store = PositionStore::new(Position::new(3.0, 4.0));
        assert!(!store.set(&PositionUpdate::relative(0.0, 0.0)).unwrap());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn malformed_update_changes_nothing() {
        let store = PositionStore::new(Position::new(3.0, 4.0));
        let update = PositionUpdate {
            left: Some("+2".into()),
            top: Some("north".into()),
        };
        let err = store.set(&update).unwrap_err();
        assert!(err.to_string().contains("'top'"));
        assert_eq!(store.get(), Position::new(3.0, 4.0));

        let nan = PositionUpdate {
            left: Some("NaN".into()),
            top: None,
        };
        assert!(store.set(&nan).is_err());
    }

    #[test]
    fn subscribers_see_current_then_changes() {
        let store = PositionStore::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let handle = store.subscribe(move |p| seen_clone.borrow_mut().push(*p));

        store.set(&PositionUpdate::relative(1.0, 1.0)).unwrap();
        handle.unsubscribe();
        store.set(&PositionUpdate::relative(1.0, 1.0)).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)]
        );
    }

    #[test]
    fn clone_shares_state() {
        let a = PositionStore::default();
        let b = a.clone();
        a.replace(Position::new(9.0, 9.0));
        assert_eq!(b.get(), Position::new(9.0, 9.0));
        assert_eq!(b.version(), 1);
    }
}
