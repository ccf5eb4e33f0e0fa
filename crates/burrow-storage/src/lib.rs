//! Storage backends for the Burrow URL shortener.
//!
//! Every backend implements [`Store`]. [`StorageBackend`] picks one from
//! the resolved configuration and opens it once at startup.

pub mod backend;
pub mod file;
pub mod memory;
pub mod postgres;

pub use backend::StorageBackend;
pub use burrow_core::error::Result;
pub use burrow_core::{Store, StoreError};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
