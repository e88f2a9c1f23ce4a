//! Error reporting port

use crate::domain::result::Error;

/// Destination for errors that must not interrupt the caller
///
/// The session subscription reports failed token exchanges here and keeps
/// running. Implementations must never panic or block.
pub trait ErrorSink: Send + Sync {
    fn report(&self, context: &str, error: &Error);
}
