//! # galaxy-layout
//!
//! The semantic layout core of neuro-galaxy.
//!
//! Turns the full note set into 3D nodes with topic categories:
//!
//! 1. Embed every note (reusing memoized vectors for unchanged notes)
//! 2. Cluster the embeddings with seeded k-means (`K` clamped to the note count)
//! 3. Reduce the embeddings to 3D with a neighborhood-preserving layout
//! 4. Name each cluster from its member notes
//! 5. Atomically publish the result into the [`LayoutCache`]
//!
//! Similarity queries rank cached embeddings by cosine similarity.

pub mod cache;
pub mod clustering;
pub mod config;
pub mod labels;
pub mod memo;
pub mod pipeline;
pub mod similarity;
pub mod spatial;

pub use cache::{layout_fingerprint, LayoutCache, LayoutSnapshot};
pub use clustering::{cluster, effective_k, Clustering, KMeansConfig};
pub use config::{ClusterNamer, PipelineConfig};
pub use labels::{ClusterLabeler, LlmLabeler, TermLabeler};
pub use memo::EmbeddingMemo;
pub use pipeline::{GalaxyPipeline, LayoutResult};
pub use similarity::{cosine_similarity, find_similar};
pub use spatial::{reduce_to_3d, LayoutParams};
