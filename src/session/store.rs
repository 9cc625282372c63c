//! Key-value session persistence for the store-backed strategy.
//!
//! The gate only reads, the login flow only writes; the store serializes
//! its own writes behind an internal lock.

use crate::config::write_atomic;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn has_key(&self, key: &str) -> Result<bool>;
    async fn set_key(&self, key: &str, value: &str) -> Result<()>;
}

/// JSON-file-backed store. Loaded once at startup; every write persists the
/// whole map atomically.
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileSessionStore {
    /// Open the store, starting empty when the file does not exist yet.
    /// # Errors
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)
                .with_context(|| format!("Invalid session store file: {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Unable to read session store: {}", path.display()))
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let data =
            serde_json::to_vec_pretty(entries).context("Unable to serialize session store")?;
        write_atomic(&self.path, &data)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().await.contains_key(key))
    }

    async fn set_key(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }
}
