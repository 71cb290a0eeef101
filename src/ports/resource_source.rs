use async_trait::async_trait;
use eyre::Result;
use tokio::sync::mpsc;

use crate::config::models::ResourceManifest;

/// Trait for sources of complete resource snapshots (a manifest file, a
/// cluster watcher) that can signal when the snapshot has changed.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Load the current snapshot.
    async fn load(&self) -> Result<ResourceManifest>;

    /// Return a channel that signals when the snapshot has changed.
    /// The receiver should trigger a reload by calling `load`.
    fn watch(&self) -> mpsc::Receiver<()>;
}
