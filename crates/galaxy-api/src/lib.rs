//! # galaxy-api
//!
//! HTTP surface of the neuro-galaxy service: the layout of the persisted
//! note store, ad-hoc layouts, note ingestion, and similarity queries.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{cors_layer, router};
pub use state::AppState;
