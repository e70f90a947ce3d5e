//! Artifact store module
//!
//! The download path only needs an opened byte stream plus metadata; where
//! artifacts live is behind the [`ArtifactStore`] trait.

mod fs;

use std::io::Read;

pub use fs::FsArtifactStore;

use crate::error::StoreError;
use crate::http::ArtifactMetadata;

/// An artifact opened for one download
///
/// The reader is owned by the request that opened it and closed when dropped.
pub struct OpenedArtifact {
    pub metadata: ArtifactMetadata,
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for OpenedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedArtifact")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Lookup of stored artifacts by name
pub trait ArtifactStore: Send + Sync {
    /// Metadata of an artifact without opening it for reading
    fn metadata(&self, name: &str) -> Result<ArtifactMetadata, StoreError>;

    /// Open an artifact for a download, positioned at its first byte
    fn open(&self, name: &str) -> Result<OpenedArtifact, StoreError>;
}
