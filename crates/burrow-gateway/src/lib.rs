//! HTTP front end of the Burrow URL shortener.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod model;
pub mod state;
pub mod subnet;

pub use app::App;
pub use state::AppState;
