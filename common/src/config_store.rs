// Persisted job document: {"sync_jobs": [ ... ]}
// A missing or unreadable document loads as an empty job set.

use crate::errors::ConfigStoreError;
use crate::models::SyncJob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct JobDocument {
    #[serde(default)]
    sync_jobs: Vec<SyncJob>,
}

/// Reads and writes the job document at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the job set, absorbing every error into an empty set
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Vec<SyncJob> {
        match self.try_load().await {
            Ok(jobs) => {
                info!(job_count = jobs.len(), "Loaded sync jobs");
                jobs
            }
            Err(e) => {
                warn!(error = %e, "Error loading sync jobs, starting with an empty job set");
                Vec::new()
            }
        }
    }

    /// Load the job set, reporting why it could not be read
    ///
    /// A file that does not exist is not an error: it yields no jobs.
    pub async fn try_load(&self) -> Result<Vec<SyncJob>, ConfigStoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Job file does not exist yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ConfigStoreError::Io {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        let document: JobDocument =
            serde_json::from_slice(&raw).map_err(|source| ConfigStoreError::Json {
                path: self.path.display().to_string(),
                source,
            })?;

        Ok(document.sync_jobs)
    }

    /// Write the job set, creating missing parent directories first
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place so a crash never leaves a truncated document behind.
    #[instrument(skip(self, jobs), fields(path = %self.path.display(), job_count = jobs.len()))]
    pub async fn save(&self, jobs: &[SyncJob]) -> Result<(), ConfigStoreError> {
        let io_error = |source: std::io::Error| ConfigStoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let document = JobDocument {
            sync_jobs: jobs.to_vec(),
        };
        let payload =
            serde_json::to_vec_pretty(&document).map_err(|source| ConfigStoreError::Json {
                path: self.path.display().to_string(),
                source,
            })?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, payload).await.map_err(io_error)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(io_error)?;

        info!("Saved sync jobs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.is_empty());
        assert!(store.try_load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = ConfigStore::new(&path);
        assert!(store.load().await.is_empty());
        assert!(matches!(
            store.try_load().await,
            Err(ConfigStoreError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn test_document_without_jobs_key_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, b"{}").await.unwrap();

        assert!(ConfigStore::new(&path).try_load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rsync-tray").join("config.json");
        let store = ConfigStore::new(&path);

        let jobs = vec![SyncJob::new("docs", "/tmp/src", "/tmp/dst").with_auto_sync(30)];
        store.save(&jobs).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.load().await, jobs);
    }

    #[tokio::test]
    async fn test_saved_document_shape() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store
            .save(&[SyncJob::new("docs", "/tmp/src", "/tmp/dst")])
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sync_jobs": [{
                    "name": "docs",
                    "source_dir": "/tmp/src",
                    "dest_dir": "/tmp/dst",
                    "options": ["-av", "--delete"],
                    "auto_sync": false,
                    "interval": 60
                }]
            })
        );
    }
}
