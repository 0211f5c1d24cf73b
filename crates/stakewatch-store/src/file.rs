//! JSON-file snapshot store.
//!
//! One file per network (`coinbase-cache-<network>.json`) under a configured
//! directory. Saves are atomic: the snapshot is written to a sibling `.tmp`
//! file and renamed over the live one, so a crash mid-write never leaves a
//! partially-written snapshot observable to the next load.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use stakewatch_core::error::MonitorError;
use stakewatch_core::snapshot::{CoinbaseSnapshot, SnapshotStore};

/// File-backed snapshot store.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the live snapshot file for a network.
    pub fn path_for(&self, network: &str) -> PathBuf {
        self.dir.join(format!("coinbase-cache-{network}.json"))
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self, network: &str) -> Result<Option<CoinbaseSnapshot>, MonitorError> {
        let path = self.path_for(network);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(MonitorError::Store(format!("read {}: {err}", path.display()))),
        };

        let snapshot: CoinbaseSnapshot =
            serde_json::from_slice(&bytes).map_err(|err| MonitorError::CacheCorrupt {
                network: network.to_string(),
                reason: format!("unparseable snapshot at {}: {err}", path.display()),
            })?;
        snapshot.validate()?;

        if snapshot.network != network {
            return Err(MonitorError::CacheCorrupt {
                network: network.to_string(),
                reason: format!("snapshot names network '{}'", snapshot.network),
            });
        }
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CoinbaseSnapshot) -> Result<String, MonitorError> {
        let path = self.path_for(&snapshot.network);
        let tmp = Self::tmp_path(&path);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| MonitorError::Store(format!("mkdir {}: {err}", self.dir.display())))?;

        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| MonitorError::Store(format!("serialize snapshot: {err}")))?;

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|err| MonitorError::Store(format!("write {}: {err}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| MonitorError::Store(format!("rename {}: {err}", path.display())))?;

        Ok(path.display().to_string())
    }

    async fn delete(&self, network: &str) -> Result<(), MonitorError> {
        let path = self.path_for(network);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MonitorError::Store(format!(
                "remove {}: {err}",
                path.display()
            ))),
        }
    }
}
