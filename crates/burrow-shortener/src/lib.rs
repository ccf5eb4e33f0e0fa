//! URL shortener service and the asynchronous deletion pipeline.
//!
//! The service validates input, generates short codes and talks to a
//! [`Store`](burrow_core::Store). Deletions are queued and applied in
//! batches by a single background worker.

pub mod deletion;
pub mod error;
pub mod service;

pub use deletion::{DeletionConfig, DeletionPipeline, DeletionQueue, DeletionWorker, PipelineState};
pub use error::{PipelineError, Result, ShortenerError};
pub use service::{BatchItem, BatchOutcome, BatchResult, Shortened, ShortenerService};
