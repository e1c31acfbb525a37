//! Core traits for neuro-galaxy abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Embedding, Note};

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Persisted, append-only note collection.
///
/// Ids are assigned by append order and never reused or renumbered.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes in id order.
    async fn list(&self) -> Result<Vec<Note>>;

    /// Append texts, assigning the next sequential ids. Returns the new notes.
    async fn append(&self, texts: Vec<String>) -> Result<Vec<Note>>;

    /// Number of stored notes.
    async fn count(&self) -> Result<usize>;
}

// =============================================================================
// INFERENCE BACKEND TRAITS
// =============================================================================

/// Backend for generating embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns one vector per input text, in input order. Either every text
    /// is embedded or the call fails; there are no partial results.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
