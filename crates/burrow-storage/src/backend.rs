use crate::{FileStore, InMemoryStore, PostgresStore};
use burrow_core::error::Result;
use burrow_core::Store;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// The storage backend chosen for a process.
///
/// A database DSN wins over a file path, and a file path wins over the
/// in-memory default. Empty values count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File { path: PathBuf },
    Database { dsn: String },
}

impl StorageBackend {
    pub fn select(dsn: Option<&str>, file: Option<&Path>) -> Self {
        if let Some(dsn) = dsn.filter(|dsn| !dsn.trim().is_empty()) {
            return StorageBackend::Database {
                dsn: dsn.to_string(),
            };
        }

        if let Some(path) = file.filter(|path| !path.as_os_str().is_empty()) {
            return StorageBackend::File {
                path: path.to_path_buf(),
            };
        }

        StorageBackend::Memory
    }

    /// Opens the backend, bootstrapping its schema or replaying its file.
    pub async fn open(&self) -> Result<Arc<dyn Store>> {
        let store: Arc<dyn Store> = match self {
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
            StorageBackend::File { path } => Arc::new(FileStore::open(path)?),
            StorageBackend::Database { dsn } => Arc::new(PostgresStore::connect(dsn).await?),
        };

        info!(backend = %self, "storage opened");
        Ok(store)
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::File { path } => write!(f, "file ({})", path.display()),
            // the DSN may carry credentials
            StorageBackend::Database { .. } => f.write_str("database"),
        }
    }
}
