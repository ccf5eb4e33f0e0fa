//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the storage contract shared by every backend
//! (memory, file, PostgreSQL) and the models that flow through it.

pub mod error;
pub mod model;
pub mod shortcode;
pub mod store;

pub use error::{CoreError, StoreError};
pub use model::{AddValue, DeletionRequest, InternalStats, UrlRecord, UserUrl};
pub use shortcode::ShortCode;
pub use store::Store;
