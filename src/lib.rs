//! Range-aware artifact download server
//!
//! [`http`] holds the protocol core: `Range` parsing, `If-Range` evaluation,
//! `Content-Disposition` filename encoding, bounded copying with progress and
//! the response framer for full, single-range, multipart and 416 responses.
//! The remaining modules put it behind a hyper server serving artifacts from
//! a directory.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod store;
