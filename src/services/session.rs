//! Session cache for the registry.
//!
//! Snapshots hold extracted text, status and metadata, never file bytes.
//! Loading is infallible from the caller's point of view: anything that
//! cannot be decoded becomes an empty registry.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ErrorCategory};
use crate::models::FileRecord;
use crate::services::registry::FileRegistry;

const SNAPSHOT_VERSION: u32 = 1;

const INTERRUPTED_MESSAGE: &str = "extraction interrupted";

#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<FileRecord>,
}

#[derive(Debug, Clone)]
pub struct SessionCodec {
    quota_bytes: usize,
}

impl SessionCodec {
    pub fn new(quota_bytes: usize) -> Self {
        Self { quota_bytes }
    }

    /// Serializes the registry. Fails, without touching the registry, when
    /// the snapshot does not fit in the quota.
    pub fn save(&self, registry: &FileRegistry) -> AppResult<Vec<u8>> {
        let snapshot = SessionSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            entries: registry
                .entries_in_order()
                .map(|(_, record)| record.clone())
                .collect(),
        };
        let blob = serde_json::to_vec(&snapshot)?;
        if blob.len() > self.quota_bytes {
            return Err(AppError::QuotaExceeded {
                size: blob.len(),
                quota: self.quota_bytes,
            });
        }
        Ok(blob)
    }

    /// Rebuilds a registry from a snapshot.
    ///
    /// Records that were still in flight when the snapshot was taken are
    /// turned into errors, since nothing will ever settle them.
    pub fn load(&self, blob: Option<&[u8]>) -> FileRegistry {
        let Some(blob) = blob else {
            debug!("No session snapshot found, starting empty");
            return FileRegistry::new();
        };

        let snapshot: SessionSnapshot = match serde_json::from_slice(blob) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to decode session snapshot: {} (starting empty)", e);
                return FileRegistry::new();
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                "Unsupported session snapshot version {} (starting empty)",
                snapshot.version
            );
            return FileRegistry::new();
        }

        let mut registry = FileRegistry::new();
        for mut record in snapshot.entries {
            if !record.status().is_terminal() {
                record.mark_failed(ErrorCategory::ExtractionFailure, INTERRUPTED_MESSAGE);
            }
            if !registry.insert(record) {
                warn!("Duplicate name in session snapshot, keeping the first entry");
            }
        }

        info!(
            "Restored {} files from session snapshot saved at {}",
            registry.len(),
            snapshot.saved_at
        );
        registry
    }
}

/// Key-value storage backing the session cache.
pub trait SessionStore: Send + Sync {
    fn read(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    fn write(&self, key: &str, blob: &[u8]) -> AppResult<()>;

    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Keeps snapshots in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, blob: &[u8]) -> AppResult<()> {
        self.entries.lock().insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a session directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, blob: &[u8]) -> AppResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::persistence(format!(
                "could not create session directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;
        // Replaced atomically via a sibling temp file.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
