//! Persistent set of feed item identities already announced.
//!
//! Owned by the feed poller alone, so it needs no lock. The in-memory set
//! is authoritative; the file is a snapshot written after every poll cycle
//! and at shutdown:
//!
//! ```json
//! {"seen_articles": ["<sha256 hex>", ...], "last_update": "2024-05-01T12:00:00Z"}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    seen_articles: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_update: Option<OffsetDateTime>,
}

/// Identities of items that were already emitted. Never shrinks.
#[derive(Debug)]
pub struct SeenItemStore {
    path: PathBuf,
    seen: HashSet<String>,
}

impl SeenItemStore {
    /// An empty store that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seen: HashSet::new(),
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No seen-item store yet, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read seen-item store, starting empty");
                return Self::empty(path);
            }
        };

        match serde_json::from_slice::<StoreFile>(&raw) {
            Ok(file) => {
                let seen: HashSet<String> = file.seen_articles.into_iter().collect();
                info!(path = %path.display(), items = seen.len(), "Loaded seen-item store");
                Self { path, seen }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt seen-item store, starting empty");
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    /// Record `identity`; `true` when it was not present before.
    pub fn insert(&mut self, identity: impl Into<String>) -> bool {
        self.seen.insert(identity.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Write a snapshot atomically: temp file, then rename over the target.
    pub async fn save(&self) -> Result<(), StoreError> {
        let mut seen_articles: Vec<String> = self.seen.iter().cloned().collect();
        seen_articles.sort_unstable();
        let file = StoreFile {
            seen_articles,
            last_update: Some(OffsetDateTime::now_utc()),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
