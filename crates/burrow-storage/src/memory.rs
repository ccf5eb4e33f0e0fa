use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    AddValue, DeletionRequest, InternalStats, ShortCode, Store, StoreError, UrlRecord, UserUrl,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, trace};

/// In-memory implementation of the [`Store`] trait using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking.
///
/// A second map indexes records by original URL so a URL that was already
/// shortened is reported as a conflict instead of getting a second code.
/// When both maps are locked, `originals` is always taken first.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, UrlRecord>,
    originals: DashMap<String, ShortCode>,
    sequence: AtomicI64,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from previously persisted records.
    ///
    /// Later records for the same short code replace earlier ones. When two
    /// codes share an original URL the first one stays canonical.
    pub(crate) fn from_records(records: impl IntoIterator<Item = UrlRecord>) -> Self {
        let store = Self::new();
        let mut max_sequence = 0;

        for record in records {
            max_sequence = max_sequence.max(record.sequence_id);
            store
                .originals
                .entry(record.original_url.clone())
                .or_insert_with(|| record.short_code.clone());
            store
                .records
                .insert(record.short_code.as_str().to_owned(), record);
        }

        store.sequence.store(max_sequence, Ordering::SeqCst);
        store
    }

    /// Highest sequence id handed out so far.
    pub fn last_sequence(&self) -> i64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn next_sequence(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Inserts `record` unless its original URL or short code is taken.
    pub(crate) fn try_insert(&self, record: UrlRecord, base_url: &str) -> Result<()> {
        let original = match self.originals.entry(record.original_url.clone()) {
            Entry::Occupied(existing) => {
                return Err(StoreError::Conflict {
                    short_url: existing.get().to_url(base_url),
                });
            }
            Entry::Vacant(vacant) => vacant,
        };

        let code = record.short_code.clone();
        match self.records.entry(code.as_str().to_owned()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateShortCode(code.into_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(record);
            }
        }

        original.insert(code);
        Ok(())
    }

    /// Undoes a [`try_insert`](Self::try_insert) whose persistence failed.
    pub(crate) fn remove(&self, record: &UrlRecord) {
        self.originals
            .remove_if(&record.original_url, |_, code| *code == record.short_code);
        self.records.remove(record.short_code.as_str());
    }

    /// Returns the live records `batch` would delete, already flagged as
    /// deleted. Nothing is changed.
    pub(crate) fn deletable(&self, batch: &[DeletionRequest]) -> Vec<UrlRecord> {
        let mut seen = HashSet::new();
        let mut changed = Vec::new();

        for request in batch {
            for (owner_id, code) in request.pairs() {
                let Some(record) = self.records.get(code.as_str()) else {
                    continue;
                };

                if record.is_owned_by(owner_id)
                    && record.is_live()
                    && seen.insert(code.as_str().to_owned())
                {
                    let mut deleted = record.value().clone();
                    deleted.deleted = true;
                    changed.push(deleted);
                }
            }
        }

        changed
    }

    /// Flags every record in `records` as deleted.
    pub(crate) fn apply_deletes(&self, records: &[UrlRecord]) {
        for deleted in records {
            if let Some(mut record) = self.records.get_mut(deleted.short_code.as_str()) {
                record.deleted = true;
            }
        }
    }

    /// Marks matching live records as deleted and returns the updated
    /// records.
    pub(crate) fn mark_deleted(&self, batch: &[DeletionRequest]) -> Vec<UrlRecord> {
        let changed = self.deletable(batch);
        self.apply_deletes(&changed);
        changed
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_original_url(&self, code: &ShortCode) -> Result<String> {
        let Some(record) = self.records.get(code.as_str()) else {
            trace!(code = %code, "short code not found");
            return Err(StoreError::NotFound(code.to_string()));
        };

        if !record.is_live() {
            return Err(StoreError::Gone(code.to_string()));
        }

        Ok(record.original_url.clone())
    }

    async fn add_value(&self, params: AddValue) -> Result<String> {
        if params.original_url.is_empty() {
            return Err(StoreError::EmptyOriginalUrl);
        }

        let short_url = params.short_code.to_url(&params.base_url);
        let record = UrlRecord {
            sequence_id: self.next_sequence(),
            short_code: params.short_code,
            original_url: params.original_url,
            owner_id: params.owner_id,
            deleted: false,
        };

        self.try_insert(record, &params.base_url)?;
        debug!(short_url = %short_url, "stored url in memory");
        Ok(short_url)
    }

    async fn get_user_urls(&self, owner_id: &str, base_url: &str) -> Result<Vec<UserUrl>> {
        let mut owned: Vec<(i64, UserUrl)> = self
            .records
            .iter()
            .filter(|record| record.is_owned_by(owner_id))
            .map(|record| {
                (
                    record.sequence_id,
                    UserUrl {
                        short_url: record.short_code.to_url(base_url),
                        original_url: record.original_url.clone(),
                    },
                )
            })
            .collect();

        owned.sort_by_key(|(sequence_id, _)| *sequence_id);
        Ok(owned.into_iter().map(|(_, url)| url).collect())
    }

    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()> {
        let changed = self.mark_deleted(batch);
        debug!(deleted = changed.len(), "soft-deleted urls in memory");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_internal_stats(&self) -> Result<InternalStats> {
        let owners: HashSet<String> = self
            .records
            .iter()
            .map(|record| record.owner_id.clone())
            .collect();

        Ok(InternalStats {
            urls: self.records.len() as u64,
            users: owners.len() as u64,
        })
    }
}
