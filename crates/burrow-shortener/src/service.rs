use crate::deletion::DeletionQueue;
use crate::error::{Result, ShortenerError};
use burrow_core::{AddValue, DeletionRequest, InternalStats, ShortCode, Store, StoreError, UserUrl};
use burrow_generator::Generator;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Number of fresh codes tried when a generated code is already taken.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Result of shortening one URL.
///
/// A conflict is not an error here: `short_url` then points at the record
/// that already exists for the original URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub short_url: String,
    pub conflict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// One entry per processed item, in request order. When `conflict` is
    /// set the last entry is the conflicting one and later items were not
    /// processed.
    pub results: Vec<BatchResult>,
    pub conflict: bool,
}

/// Shortening, lookup and deletion on top of a [`Store`].
///
/// Codes come from the configured [`Generator`]. A generated code that is
/// already taken is replaced by a fresh one a bounded number of times.
/// Deletions are not applied here; they are queued for the deletion
/// pipeline.
pub struct ShortenerService<G> {
    store: Arc<dyn Store>,
    generator: G,
    base_url: String,
    deletions: DeletionQueue,
}

impl<G: Generator> ShortenerService<G> {
    pub fn new(
        store: Arc<dyn Store>,
        generator: G,
        base_url: impl Into<String>,
        deletions: DeletionQueue,
    ) -> Self {
        Self {
            store,
            generator,
            base_url: base_url.into(),
            deletions,
        }
    }

    /// Checks that `url` is an absolute URL with a scheme and a host.
    ///
    /// Control characters are rejected outright: the parser would drop
    /// them, but the stored URL keeps them and cannot be sent back in a
    /// `Location` header.
    fn validate_url(url: &str) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
        }
        if url.chars().any(char::is_control) {
            return Err(ShortenerError::InvalidUrl(format!(
                "{}: contains control characters",
                url.escape_debug()
            )));
        }

        let parsed = Url::parse(url).map_err(|e| ShortenerError::InvalidUrl(format!("{url}: {e}")))?;
        if !parsed.has_host() {
            return Err(ShortenerError::InvalidUrl(format!("{url}: missing host")));
        }

        Ok(())
    }

    pub async fn shorten(&self, original_url: &str, owner_id: &str) -> Result<Shortened> {
        Self::validate_url(original_url)?;
        let original_url = original_url.trim();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let short_code = self.generator.generate();
            let params = AddValue {
                original_url: original_url.to_string(),
                base_url: self.base_url.clone(),
                short_code,
                owner_id: owner_id.to_string(),
            };

            match self.store.add_value(params).await {
                Ok(short_url) => {
                    return Ok(Shortened {
                        short_url,
                        conflict: false,
                    })
                }
                Err(StoreError::Conflict { short_url }) => {
                    debug!(%short_url, "original url already shortened");
                    return Ok(Shortened {
                        short_url,
                        conflict: true,
                    });
                }
                Err(StoreError::DuplicateShortCode(code)) => {
                    warn!(%code, attempt, "generated short code already taken");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::Unavailable(format!(
            "no free short code after {MAX_CODE_ATTEMPTS} attempts"
        ))
        .into())
    }

    /// Shortens `items` in order and stops at the first conflict.
    ///
    /// Every URL is validated before anything is stored. Items shortened
    /// before a conflict stay stored.
    pub async fn shorten_batch(&self, items: Vec<BatchItem>, owner_id: &str) -> Result<BatchOutcome> {
        if items.is_empty() {
            return Err(ShortenerError::InvalidRequest("empty batch".to_string()));
        }
        for item in &items {
            Self::validate_url(&item.original_url)?;
        }

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let shortened = self.shorten(&item.original_url, owner_id).await?;
            results.push(BatchResult {
                correlation_id: item.correlation_id,
                short_url: shortened.short_url,
            });

            if shortened.conflict {
                return Ok(BatchOutcome {
                    results,
                    conflict: true,
                });
            }
        }

        Ok(BatchOutcome {
            results,
            conflict: false,
        })
    }

    /// Returns the original URL behind `code`.
    pub async fn resolve(&self, code: &str) -> Result<String> {
        let code = ShortCode::new(code)?;
        Ok(self.store.get_original_url(&code).await?)
    }

    pub async fn user_urls(&self, owner_id: &str) -> Result<Vec<UserUrl>> {
        Ok(self.store.get_user_urls(owner_id, &self.base_url).await?)
    }

    /// Queues the soft deletion of `codes` owned by `owner_id`.
    ///
    /// Returns once the request is accepted by the pipeline, not once the
    /// records are deleted.
    pub async fn request_deletion(&self, owner_id: &str, codes: Vec<String>) -> Result<()> {
        if codes.is_empty() {
            return Err(ShortenerError::InvalidRequest(
                "no short codes to delete".to_string(),
            ));
        }

        let short_codes = codes
            .into_iter()
            .map(ShortCode::new)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.deletions
            .enqueue(DeletionRequest::new(owner_id, short_codes))
            .await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }

    pub async fn stats(&self) -> Result<InternalStats> {
        Ok(self.store.get_internal_stats().await?)
    }
}
