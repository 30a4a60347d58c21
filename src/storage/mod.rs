//! Persistence of finished investigation records.

use crate::types::{AppError, InvestigationRecord, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const RESULTS_FILE: &str = "results.json";

/// Run directories tried per timestamp before giving up.
const MAX_RUN_DIRS: u32 = 1000;

/// Receives frozen records after a run.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a record and return where it went.
    async fn store(&self, record: &InvestigationRecord) -> Result<PathBuf>;
}

/// Writes pretty JSON under a dated directory tree:
/// `<root>/<YYYY-MM-DD>/<YYYY-MM-DD_HH-MM-SS>/results.json`.
///
/// Run directories are created exclusively. A second record stored within the
/// same second lands in `<YYYY-MM-DD_HH-MM-SS>_2`, then `_3`, and so on; an
/// existing `results.json` is never overwritten.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Preferred path for a record created at `timestamp`.
    pub fn path_for(&self, timestamp: DateTime<Utc>) -> PathBuf {
        self.day_dir(timestamp)
            .join(timestamp.format("%Y-%m-%d_%H-%M-%S").to_string())
            .join(RESULTS_FILE)
    }

    fn day_dir(&self, timestamp: DateTime<Utc>) -> PathBuf {
        self.root.join(timestamp.format("%Y-%m-%d").to_string())
    }

    /// Create a run directory that no other store call owns.
    async fn claim_run_dir(&self, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        let day = self.day_dir(timestamp);
        tokio::fs::create_dir_all(&day).await.map_err(|e| {
            AppError::Storage(format!("Failed to create {}: {}", day.display(), e))
        })?;

        let stem = timestamp.format("%Y-%m-%d_%H-%M-%S").to_string();
        for attempt in 1..=MAX_RUN_DIRS {
            let dir = match attempt {
                1 => day.join(&stem),
                n => day.join(format!("{}_{}", stem, n)),
            };
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(AppError::Storage(format!(
                        "Failed to create {}: {}",
                        dir.display(),
                        e
                    )));
                }
            }
        }

        Err(AppError::Storage(format!(
            "No free run directory for {} under {}",
            stem,
            day.display()
        )))
    }
}

#[async_trait]
impl RecordSink for JsonFileSink {
    async fn store(&self, record: &InvestigationRecord) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::Storage(format!("Failed to serialize record: {}", e)))?;

        let path = self.claim_run_dir(record.timestamp).await?.join(RESULTS_FILE);
        let write_err = |e: std::io::Error| {
            AppError::Storage(format!("Failed to write {}: {}", path.display(), e))
        };

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(write_err)?;
        file.write_all(&json).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        tracing::info!(path = %path.display(), "investigation record saved");
        Ok(path)
    }
}
