//! Asynchronous document lookup by UUID.

use std::future::Future;
use std::rc::Rc;

use crate::error::LookupError;

/// Resolves a UUID to a document.
///
/// `Ok(None)` means the document does not exist (yet). Implementations may
/// return [`LookupError::Malformed`] for identifiers they cannot parse.
///
/// The returned future is not required to be `Send`; stores are
/// single-threaded.
pub trait DocumentLookup<D: ?Sized> {
    fn lookup(&self, uuid: &str) -> impl Future<Output = Result<Option<Rc<D>>, LookupError>>;
}
