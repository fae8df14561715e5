//! Unified error type.

use std::fmt;

/// The error type returned by [`Router::handle`](crate::Router::handle).
///
/// An unmatched route is not an error: it is a `404` [`Response`](crate::Response)
/// produced by the fallback stack. `Error` is reserved for routing
/// misconfiguration that must stay loud.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// No route and no fallback stack matched the normalised path. Every
    /// router registers a catch-all stack for its own base path, so this
    /// means the routing tables were built incorrectly.
    MissingStack { path: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStack { path } => {
                write!(f, "no middleware stack registered for `{path}`")
            }
        }
    }
}

impl std::error::Error for Error {}
