//! Centralized default constants for the neuro-galaxy service.
//!
//! **This module is the single source of truth** for shared default values.
//! Environment-driven configuration in the other crates falls back to these.

// =============================================================================
// SERVER
// =============================================================================

/// Default listen host.
pub const HOST: &str = "0.0.0.0";

/// Default listen port.
pub const PORT: u16 = 8000;

/// Default location of the persisted note store.
pub const NOTES_FILE: &str = "data/notes.json";

/// Browser origins allowed by default (Vite and CRA dev servers).
pub const CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model name (Ollama build of all-MiniLM-L6-v2).
pub const EMBED_MODEL: &str = "all-minilm";

/// Default embedding vector dimension for all-minilm.
pub const EMBED_DIMENSION: usize = 384;

/// Default generation model used for LLM cluster naming.
pub const GEN_MODEL: &str = "llama3.1:8b";

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout for generation requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 60;

/// Maximum texts sent to the embedding endpoint in one request.
pub const EMBED_BATCH_SIZE: usize = 64;

// =============================================================================
// LAYOUT
// =============================================================================

/// Default number of topic clusters (K).
pub const CLUSTER_COUNT: usize = 5;

/// Seed for clustering and layout randomness.
pub const SEED: u64 = 42;

/// Number of k-means restarts; the lowest-inertia run wins.
pub const KMEANS_RESTARTS: usize = 10;

/// Maximum Lloyd iterations per k-means run.
pub const KMEANS_MAX_ITERATIONS: usize = 100;

/// Spatializer neighborhood size before clamping to `n - 1`.
pub const LAYOUT_NEIGHBORS: usize = 10;

/// Minimum separation between points in the final layout.
pub const LAYOUT_MIN_DIST: f32 = 0.3;

/// Radius the 3D layout is scaled to.
pub const LAYOUT_SPREAD: f32 = 10.0;

/// Refinement epochs run over the neighborhood graph.
pub const LAYOUT_EPOCHS: usize = 200;

/// Minimum centroid cosine similarity for a cluster to inherit a previous index.
pub const CATEGORY_MATCH_THRESHOLD: f32 = 0.8;

// =============================================================================
// SIMILARITY
// =============================================================================

/// Default number of neighbors returned by a similarity query.
pub const SIMILAR_TOP_K: usize = 3;

/// Notes sampled per cluster when prompting an LLM for a cluster name.
pub const LABEL_SAMPLE_SIZE: usize = 3;
