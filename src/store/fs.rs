//! Filesystem artifact store
//!
//! Serves the regular files of one directory. Content hashes are SHA-256,
//! computed on first access and cached until the file size or modification
//! time changes.

use std::fs::File;
use std::io::{self, ErrorKind, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::SystemTime;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ArtifactStore, OpenedArtifact};
use crate::error::StoreError;
use crate::http::ArtifactMetadata;

#[derive(Debug, Clone)]
struct CachedHash {
    size: u64,
    modified: Option<SystemTime>,
    hash: String,
}

/// Artifact store backed by a directory
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    hashes: DashMap<String, CachedHash>,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hashes: DashMap::new(),
        }
    }

    /// Resolve an artifact name to a path inside the root
    fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn content_hash(
        &self,
        name: &str,
        file: &mut File,
        size: u64,
        modified: Option<SystemTime>,
    ) -> io::Result<String> {
        if let Some(cached) = self.hashes.get(name) {
            if cached.size == size && cached.modified == modified {
                return Ok(cached.hash.clone());
            }
        }

        debug!("Hashing artifact '{name}'");
        let mut hasher = Sha256::new();
        io::copy(file, &mut hasher)?;
        file.seek(SeekFrom::Start(0))?;
        let hash = format!("{:x}", hasher.finalize());

        self.hashes.insert(
            name.to_string(),
            CachedHash {
                size,
                modified,
                hash: hash.clone(),
            },
        );
        Ok(hash)
    }

    /// Open an artifact once and describe it from that same handle
    ///
    /// The returned file is positioned at its first byte.
    fn inspect(&self, name: &str) -> Result<(File, ArtifactMetadata), StoreError> {
        let path = self.path_of(name)?;
        let mut file = File::open(&path).map_err(|e| not_found_or_io(name, e))?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let size = meta.len();
        let last_modified = meta.modified().ok();
        let content_hash = self.content_hash(name, &mut file, size, last_modified)?;

        Ok((
            file,
            ArtifactMetadata {
                size,
                content_hash,
                last_modified,
            },
        ))
    }
}

fn not_found_or_io(name: &str, e: io::Error) -> StoreError {
    if e.kind() == ErrorKind::NotFound {
        StoreError::NotFound(name.to_string())
    } else {
        StoreError::Io(e)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn metadata(&self, name: &str) -> Result<ArtifactMetadata, StoreError> {
        self.inspect(name).map(|(_, metadata)| metadata)
    }

    fn open(&self, name: &str) -> Result<OpenedArtifact, StoreError> {
        let (file, metadata) = self.inspect(name)?;
        Ok(OpenedArtifact {
            metadata,
            reader: Box::new(file),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    fn store_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, FsArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = FsArtifactStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_metadata() {
        let (_dir, store) = store_with(&[("hello.bin", b"hello")]);
        let meta = store.metadata("hello.bin").unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(
            meta.content_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(meta.last_modified.is_some());
    }

    #[test]
    fn test_open_reads_content() {
        let (_dir, store) = store_with(&[("fw.bin", b"firmware")]);
        let mut opened = store.open("fw.bin").unwrap();
        let mut content = String::new();
        opened.reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "firmware");
        assert_eq!(opened.metadata.size, 8);
    }

    #[test]
    fn test_open_describes_the_served_bytes() {
        let (_dir, store) = store_with(&[("hello.bin", b"hello")]);
        // Hash computed while opening must leave the reader at the start
        let mut opened = store.open("hello.bin").unwrap();
        let mut content = Vec::new();
        opened.reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"hello");
        assert_eq!(opened.metadata.size, content.len() as u64);
        assert_eq!(
            opened.metadata.content_hash,
            format!("{:x}", Sha256::digest(&content))
        );
    }

    #[test]
    fn test_missing_artifact() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(store.open("nope.bin"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_directory_is_not_an_artifact() {
        let (dir, store) = store_with(&[]);
        fs::create_dir(dir.path().join("sub")).unwrap();
        assert!(matches!(store.metadata("sub"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (_dir, store) = store_with(&[]);
        for name in ["", ".", "..", "../etc/passwd", "a/b", "a\\b"] {
            assert!(
                matches!(store.open(name), Err(StoreError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_hash_refreshed_after_change() {
        let (dir, store) = store_with(&[("a.bin", b"one")]);
        let first = store.metadata("a.bin").unwrap().content_hash;
        assert_eq!(store.metadata("a.bin").unwrap().content_hash, first);

        fs::write(dir.path().join("a.bin"), b"changed").unwrap();
        let second = store.metadata("a.bin").unwrap().content_hash;
        assert_ne!(first, second);
    }
}
