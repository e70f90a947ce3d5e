//! Error types
//!
//! Range errors map to 416, stream errors abort the response in flight,
//! store errors are turned into 404/500 by the request handler.

use std::io;

use thiserror::Error;

/// Failure to turn a `Range` header into a usable range set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Header does not follow `bytes=<spec>(,<spec>)*`
    #[error("malformed range header: {0}")]
    Malformed(String),

    /// Syntactically fine but not servable against the artifact length
    #[error("range not satisfiable: {0}")]
    Unsatisfiable(String),
}

/// Failure while copying artifact bytes to the client
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("source ended after skipping {skipped} of {requested} bytes")]
    SkipShortfall { requested: u64, skipped: u64 },

    #[error("{missing} of {requested} bytes could not be written to client")]
    Shortfall { requested: u64, missing: u64 },

    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Failure to open an artifact from the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("invalid artifact name: {0}")]
    InvalidName(String),

    #[error("artifact store I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Whether the failure should be reported to the client as 404
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidName(_))
    }
}
