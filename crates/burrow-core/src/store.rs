use crate::error::Result;
use crate::model::{AddValue, DeletionRequest, InternalStats, UserUrl};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// The storage contract every backend satisfies.
///
/// Implementations must be safe to share between concurrent request
/// handlers and the deletion worker.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Resolves a short code to its original URL.
    ///
    /// Returns `Err(NotFound)` for unknown codes and `Err(Gone)` for
    /// soft-deleted ones.
    async fn get_original_url(&self, code: &ShortCode) -> Result<String>;

    /// Persists a new record and returns its full short URL.
    ///
    /// Returns `Err(EmptyOriginalUrl)` without storing anything when the
    /// original URL is empty, and `Err(Conflict)` carrying the existing
    /// short URL when the original URL was already shortened.
    async fn add_value(&self, params: AddValue) -> Result<String>;

    /// Lists every record owned by `owner_id`, with codes expanded to full
    /// URLs using `base_url`.
    async fn get_user_urls(&self, owner_id: &str, base_url: &str) -> Result<Vec<UserUrl>>;

    /// Soft-deletes every `(owner, code)` pair of the batch that matches a
    /// record. Pairs that match nothing are ignored.
    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    async fn get_internal_stats(&self) -> Result<InternalStats>;
}
