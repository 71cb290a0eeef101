use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use eyre::{Context, Result};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{
    config::{loader::load_manifest, models::ResourceManifest},
    core::events::{ResourceEvent, diff_manifests},
    ports::{CredentialDecryptor, ResourceSource},
};

/// Resource source backed by a manifest file that is watched for changes.
///
/// Credential revisions pass through a [`CredentialDecryptor`] on every load.
/// The last good snapshot is kept so that [`FileResourceSource::reload`] can
/// turn a file change into whole-resource events.
pub struct FileResourceSource {
    path: PathBuf,
    decryptor: Arc<dyn CredentialDecryptor>,
    current: ArcSwap<ResourceManifest>,
    // Kept alive for as long as the source exists
    _watcher: Option<notify::RecommendedWatcher>,
    update_tx: mpsc::Sender<()>,
    // Taken once by `watch()`
    update_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl FileResourceSource {
    pub fn new(path: impl Into<PathBuf>, decryptor: Arc<dyn CredentialDecryptor>) -> Result<Self> {
        let (tx, rx) = mpsc::channel(1);

        let mut source = Self {
            path: path.into(),
            decryptor,
            current: ArcSwap::from_pointee(ResourceManifest::default()),
            _watcher: None,
            update_tx: tx,
            update_rx: std::sync::Mutex::new(Some(rx)),
        };

        source.init_watcher()?;
        Ok(source)
    }

    fn init_watcher(&mut self) -> Result<()> {
        let tx = self.update_tx.clone();
        let manifest_filename = self
            .path
            .file_name()
            .ok_or_else(|| eyre::eyre!("Invalid manifest path: {}", self.path.display()))?
            .to_owned();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        if (event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove())
                            && event
                                .paths
                                .iter()
                                .any(|p| p.file_name() == Some(&manifest_filename))
                        {
                            tracing::debug!("Manifest changed: {:?}", event.kind);
                            // A pending signal already covers this change
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => tracing::error!("File watch error: {:?}", e),
                }
            })?;

        let watch_dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch manifest directory")?;

        self._watcher = Some(watcher);
        Ok(())
    }

    /// The last snapshot accepted by [`FileResourceSource::reload`].
    pub fn current(&self) -> Arc<ResourceManifest> {
        self.current.load_full()
    }

    /// Re-read the manifest and return the events that turn the previous
    /// snapshot into the new one.
    ///
    /// A manifest that fails to load or decrypt leaves the previous snapshot
    /// in place. The first call diffs against an empty snapshot, so it yields
    /// one `Added` event per resource.
    pub async fn reload(&self) -> Result<Vec<ResourceEvent>> {
        let next = Arc::new(self.load().await?);
        let previous = self.current.swap(Arc::clone(&next));
        let events = diff_manifests(&previous, &next);
        tracing::info!(
            path = %self.path.display(),
            events = events.len(),
            "manifest reloaded"
        );
        Ok(events)
    }
}

#[async_trait]
impl ResourceSource for FileResourceSource {
    async fn load(&self) -> Result<ResourceManifest> {
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid path"))?;
        let mut manifest = load_manifest(path_str).await?;

        manifest.credentials = manifest
            .credentials
            .into_iter()
            .map(|sealed| self.decryptor.decrypt(sealed))
            .collect::<Result<Vec<_>, _>>()
            .wrap_err_with(|| format!("Failed to decrypt credentials in {}", self.path.display()))?;

        Ok(manifest)
    }

    fn watch(&self) -> mpsc::Receiver<()> {
        let taken = match self.update_rx.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        taken.unwrap_or_else(|| {
            tracing::warn!("manifest watch channel was already taken");
            // A receiver whose sender is gone reports closed immediately.
            mpsc::channel(1).1
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::tempdir;
    use tokio::time::{Duration, sleep};

    use super::*;
    use crate::adapters::decryptor::PlaintextDecryptor;

    const INITIAL: &str = r#"{
        "routes": [
            {"name": "orders", "namespace": "shop", "sourcePath": "/orders",
             "targetPath": "/", "targetBackend": "orders:8080"}
        ],
        "credentials": [
            {"name": "alice", "namespace": "shop", "revisions": ["k1"]}
        ]
    }"#;

    const UPDATED: &str = r#"{
        "routes": [
            {"name": "orders", "namespace": "shop", "sourcePath": "/v2/orders",
             "targetPath": "/", "targetBackend": "orders:8080"}
        ],
        "credentials": [
            {"name": "alice", "namespace": "shop", "revisions": ["k1"]}
        ]
    }"#;

    fn write_manifest(path: &Path, contents: &str) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    #[tokio::test]
    async fn test_reload_diffs_snapshots() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("manifest.json");
        write_manifest(&file_path, INITIAL)?;

        let source = FileResourceSource::new(&file_path, Arc::new(PlaintextDecryptor))?;
        let events = source.reload().await?;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.action() == "added"));

        let mut rx = source.watch();

        // Sleep briefly so the rewrite lands after the watcher is armed
        sleep(Duration::from_millis(100)).await;
        write_manifest(&file_path, UPDATED)?;

        let notification = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(notification.is_ok(), "Timed out waiting for manifest update");

        let events = source.reload().await?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action(), "updated");
        assert_eq!(source.current().routes[0].source_path, "/v2/orders");
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_manifest_keeps_previous_snapshot() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("manifest.json");
        write_manifest(&file_path, INITIAL)?;

        let source = FileResourceSource::new(&file_path, Arc::new(PlaintextDecryptor))?;
        source.reload().await?;

        write_manifest(
            &file_path,
            r#"{"credentials": [{"name": "bob", "namespace": "shop", "revisions": [""]}]}"#,
        )?;
        assert!(source.reload().await.is_err());
        assert_eq!(source.current().credentials[0].name, "alice");
        Ok(())
    }
}
