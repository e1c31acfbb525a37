//! Mock inference backends for deterministic testing.
//!
//! [`MockEmbeddingBackend`] derives embeddings from the words of a text, so
//! texts that share words are close in cosine space and the same text always
//! yields the same vector.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use galaxy_core::EmbeddingBackend;
//! use galaxy_inference::mock::MockEmbeddingBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockEmbeddingBackend::new().with_dimension(64);
//!     let vectors = backend.embed_texts(&["test text".to_string()]).await.unwrap();
//!     assert_eq!(vectors[0].len(), 64);
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use galaxy_core::{Embedding, EmbeddingBackend, Error, GenerationBackend, Result};

/// Mock embedding backend for testing.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    dimension: usize,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    texts_embedded: Arc<AtomicUsize>,
}

impl MockEmbeddingBackend {
    /// Create a new mock backend with the default 384 dimensions.
    pub fn new() -> Self {
        Self {
            dimension: galaxy_core::defaults::EMBED_DIMENSION,
            failing: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
            texts_embedded: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension.max(1);
        self
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed_texts` calls that reached the backend.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts embedded across all successful calls.
    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    /// Deterministic bag-of-words embedding of `text`.
    ///
    /// Each lowercase alphanumeric word is hashed into one bucket; the result
    /// is L2-normalized. A text without words maps to the zero vector.
    pub fn embedding_for(text: &str, dimension: usize) -> Embedding {
        let mut vec = vec![0.0f32; dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(bytes) % dimension as u64) as usize;
            vec[idx] += 1.0;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vec.iter_mut() {
                *x /= norm;
            }
        }
        vec
    }
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Embedding("mock backend failure".to_string()));
        }
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| Self::embedding_for(t, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

/// Mock generation backend returning a fixed response.
#[derive(Clone)]
pub struct MockGenerationBackend {
    response: Option<String>,
    prompts: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockGenerationBackend {
    /// Always answer with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            prompts: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Fail every generation request.
    pub fn failing() -> Self {
        Self {
            response: None,
            prompts: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.response
            .clone()
            .ok_or_else(|| Error::Inference("mock generation failure".to_string()))
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let a = MockEmbeddingBackend::embedding_for("I love cats", 64);
        let b = MockEmbeddingBackend::embedding_for("I love cats", 64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_embedding_is_unit_length() {
        let v = MockEmbeddingBackend::embedding_for("Stock market crashed", 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_more_similar() {
        let cats = MockEmbeddingBackend::embedding_for("I love cats", 384);
        let dogs = MockEmbeddingBackend::embedding_for("I love dogs", 384);
        let stocks = MockEmbeddingBackend::embedding_for("Stock market crashed", 384);
        assert!(cosine(&cats, &dogs) > cosine(&cats, &stocks));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = MockEmbeddingBackend::embedding_for("  ...  ", 16);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_counts_calls_and_texts() {
        let backend = MockEmbeddingBackend::new().with_dimension(8);
        let texts = vec!["a b".to_string(), "c".to_string()];
        let vectors = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 8);
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.texts_embedded(), 2);
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let backend = MockEmbeddingBackend::new();
        backend.set_failing(true);
        let err = backend.embed_texts(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(backend.texts_embedded(), 0);

        backend.set_failing(false);
        assert!(backend.embed_texts(&["x".to_string()]).await.is_ok());
    }

    #[tokio::test]
    async fn test_generation_mock_records_prompts() {
        let backend = MockGenerationBackend::with_response("Space Travel");
        assert_eq!(backend.generate("name this").await.unwrap(), "Space Travel");
        assert_eq!(backend.prompts(), vec!["name this".to_string()]);

        let failing = MockGenerationBackend::failing();
        assert!(failing.generate("x").await.is_err());
    }
}
