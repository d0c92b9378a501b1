//! Structured logging re-exports.
//!
//! Stores log through `tracing`; the host decides whether a subscriber is
//! installed. Re-exported so downstream crates share one macro set.

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
