// Application state module
// Holds configuration and the artifact store shared by all connections

use std::sync::Arc;

use tokio::sync::Notify;

use super::types::Config;
use crate::store::{ArtifactStore, FsArtifactStore};

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ArtifactStore>,
    pub shutdown_signal: Arc<Notify>,
}

impl AppState {
    /// Create state serving artifacts from the configured directory
    pub fn new(config: &Config) -> Self {
        let store = FsArtifactStore::new(&config.artifacts.root);
        Self::with_store(config, Arc::new(store))
    }

    /// Create state with a custom artifact store
    pub fn with_store(config: &Config, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            config: config.clone(),
            store,
            shutdown_signal: Arc::new(Notify::new()),
        }
    }
}
