//! Request handler module
//!
//! Routes requests to the artifact download and checksum handlers.

pub mod artifacts;
pub mod body;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
