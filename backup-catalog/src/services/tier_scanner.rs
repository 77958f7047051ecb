//! Lists a tier directory and reads every archive in it concurrently.

use crate::config::BackupsRoot;
use crate::error::{CatalogError, Result};
use crate::models::{ArchiveRecord, Tier};
use crate::services::manifest_reader::ManifestReader;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TierScanner {
    root: BackupsRoot,
    reader: ManifestReader,
    read_timeout: Option<Duration>,
}

impl TierScanner {
    pub fn new(root: BackupsRoot) -> Self {
        Self {
            root,
            reader: ManifestReader::new(),
            read_timeout: None,
        }
    }

    pub fn with_reader(mut self, reader: ManifestReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn tier_dir(&self, tier: Tier) -> Result<PathBuf> {
        self.root.tier_dir(tier)
    }

    /// Reads every archive directly inside `dir`.
    ///
    /// Only a failure to list `dir` is returned as an error. Archives that
    /// cannot be read come back as degraded records without a timestamp.
    pub async fn scan_tier(&self, dir: &Path) -> Result<Vec<ArchiveRecord>> {
        let containers = list_containers(dir).await?;
        tracing::debug!(path = %dir.display(), archives = containers.len(), "Scanning tier");

        let reads = containers.into_iter().map(|path| self.read_one(path));
        let records = join_all(reads).await;

        let degraded = records.iter().filter(|r| r.degraded).count();
        tracing::info!(
            path = %dir.display(),
            archives = records.len(),
            degraded,
            "Tier scan complete"
        );
        Ok(records)
    }

    async fn read_one(&self, path: PathBuf) -> ArchiveRecord {
        let reader = self.reader.clone();
        let task_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || reader.read_manifest(&task_path));

        let joined = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(path = %path.display(), timeout_ms = limit.as_millis() as u64, "Archive read timed out");
                    return ArchiveRecord::degraded(&path, None);
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "Archive unreadable");
                ArchiveRecord::degraded(&path, None)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Archive read task failed");
                ArchiveRecord::degraded(&path, None)
            }
        }
    }
}

/// Immediate non-directory entries of `dir`.
async fn list_containers(dir: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |source: std::io::Error| CatalogError::TierUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut containers = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        let is_dir = match entry.file_type().await {
            Ok(ft) if ft.is_symlink() => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false),
            Ok(ft) => ft.is_dir(),
            Err(_) => false,
        };
        if is_dir {
            tracing::debug!(path = %path.display(), "Skipping sub-directory");
        } else {
            containers.push(path);
        }
    }
    Ok(containers)
}
