use crate::memory::InMemoryStore;
use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    AddValue, DeletionRequest, InternalStats, ShortCode, Store, StoreError, UrlRecord, UserUrl,
};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Append-only JSON-lines file backed store.
///
/// Records live in an [`InMemoryStore`]; every insert and every soft delete
/// is also appended to the file as one JSON object per line. Opening the
/// store replays the file in order, so the last line written for a short
/// code wins.
///
/// All mutations go through the journal lock, which also owns the
/// sequence counter. File order and sequence order therefore agree. A
/// mutation whose journal append fails is not kept in the index.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    index: InMemoryStore,
    journal: Mutex<Journal>,
}

#[derive(Debug)]
struct Journal {
    file: File,
    /// Length of the file up to the last complete append.
    len: u64,
    last_sequence: i64,
}

impl Journal {
    /// Writes `records` as one unbuffered chunk. On failure the file is cut
    /// back to its previous length so no partial line survives.
    fn append(&mut self, records: &[UrlRecord]) -> Result<()> {
        let mut chunk = Vec::new();
        for record in records {
            serde_json::to_writer(&mut chunk, record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            chunk.push(b'\n');
        }

        if let Err(err) = self.file.write_all(&chunk).and_then(|()| self.file.flush()) {
            if let Err(truncate) = self.file.set_len(self.len) {
                warn!(error = %truncate, len = self.len, "cannot truncate storage file after failed append");
            }
            return Err(err.into());
        }

        self.len += chunk.len() as u64;
        Ok(())
    }
}

impl FileStore {
    /// Opens (creating if needed) the storage file at `path` and replays it.
    ///
    /// Fails with [`StoreError::Bootstrap`] if the file cannot be opened or
    /// contains a line that is not a valid record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StoreError::Bootstrap(format!("cannot open {}: {e}", path.display()))
            })?;

        let records = replay(&file, &path)?;
        let len = file
            .metadata()
            .map_err(|e| StoreError::Bootstrap(format!("cannot stat {}: {e}", path.display())))?
            .len();
        let index = InMemoryStore::from_records(records);
        let last_sequence = index.last_sequence();

        info!(
            path = %path.display(),
            records = index.len(),
            last_sequence,
            "replayed storage file"
        );

        Ok(Self {
            path,
            index,
            journal: Mutex::new(Journal {
                file,
                len,
                last_sequence,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn replay(file: &File, path: &Path) -> Result<Vec<UrlRecord>> {
    let mut records = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            StoreError::Bootstrap(format!("cannot read {}: {e}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let record: UrlRecord = serde_json::from_str(&line).map_err(|e| {
            StoreError::Bootstrap(format!(
                "invalid record on line {} of {}: {e}",
                index + 1,
                path.display()
            ))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[async_trait]
impl Store for FileStore {
    async fn get_original_url(&self, code: &ShortCode) -> Result<String> {
        self.index.get_original_url(code).await
    }

    async fn add_value(&self, params: AddValue) -> Result<String> {
        if params.original_url.is_empty() {
            return Err(StoreError::EmptyOriginalUrl);
        }

        let short_url = params.short_code.to_url(&params.base_url);
        let mut journal = self.journal.lock();

        let record = UrlRecord {
            sequence_id: journal.last_sequence + 1,
            short_code: params.short_code,
            original_url: params.original_url,
            owner_id: params.owner_id,
            deleted: false,
        };

        self.index.try_insert(record.clone(), &params.base_url)?;
        if let Err(err) = journal.append(std::slice::from_ref(&record)) {
            self.index.remove(&record);
            return Err(err);
        }
        journal.last_sequence = record.sequence_id;

        debug!(short_url = %short_url, sequence_id = record.sequence_id, "appended url to file");
        Ok(short_url)
    }

    async fn get_user_urls(&self, owner_id: &str, base_url: &str) -> Result<Vec<UserUrl>> {
        self.index.get_user_urls(owner_id, base_url).await
    }

    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()> {
        let mut journal = self.journal.lock();

        let changed = self.index.deletable(batch);
        if changed.is_empty() {
            return Ok(());
        }

        journal.append(&changed)?;
        self.index.apply_deletes(&changed);
        debug!(deleted = changed.len(), "appended soft deletes to file");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_internal_stats(&self) -> Result<InternalStats> {
        self.index.get_internal_stats().await
    }
}
