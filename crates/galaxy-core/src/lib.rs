//! # galaxy-core
//!
//! Core types, traits, and abstractions for the neuro-galaxy layout service.
//!
//! This crate provides the foundational data structures (notes, layout nodes,
//! similarity results), the error taxonomy, and the backend traits that the
//! other galaxy crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
