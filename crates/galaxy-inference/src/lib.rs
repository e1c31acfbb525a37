//! # galaxy-inference
//!
//! Embedding and generation backends for neuro-galaxy.
//!
//! This crate provides:
//! - Ollama implementation of [`EmbeddingBackend`] and [`GenerationBackend`] (default)
//! - Deterministic mock embedder for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `mock`: Enable [`mock::MockEmbeddingBackend`]
//!
//! # Example
//!
//! ```rust,no_run
//! use galaxy_inference::OllamaBackend;
//! use galaxy_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     backend.probe().await.expect("embedding model must be reachable");
//!     let texts = vec!["Hello".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use galaxy_core::{EmbeddingBackend, GenerationBackend};

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
