//! Error taxonomy for store operations.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Malformed argument | Bad options shape, invalid document, bad position value | `StoreError::InvalidArgument`, raised synchronously |
//! | Lookup miss | Unknown or malformed UUID, backend failure | `LookupError`, swallowed by lookup-driven setters |
//! | Stale delete notice | Document still present in its collection | Ignored, no error |

use std::fmt;

/// Errors raised synchronously at a store call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An argument had the wrong shape or type.
    InvalidArgument {
        /// The operation that rejected the argument (e.g. `"set"`).
        operation: &'static str,
        /// Human-readable description of what was wrong.
        reason: String,
    },
}

impl StoreError {
    /// Build a [`StoreError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            reason: reason.into(),
        }
    }

    /// The operation that produced this error.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::InvalidArgument { operation, .. } => operation,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { operation, reason } => {
                write!(f, "{operation}: invalid argument: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors reported by a [`DocumentLookup`](crate::lookup::DocumentLookup).
///
/// These never escape a store: lookup-driven setters log them and resolve to
/// `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The identifier could not be parsed.
    Malformed(String),
    /// The backing service failed.
    Backend(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(uuid) => write!(f, "malformed uuid: {uuid}"),
            Self::Backend(msg) => write!(f, "lookup backend error: {msg}"),
        }
    }
}

impl std::error::Error for LookupError {}
