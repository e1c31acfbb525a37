//! Galaxy pipeline orchestration.
//!
//! [`GalaxyPipeline::process_notes`] recomputes the whole layout from the
//! given note list and publishes it into the [`LayoutCache`] only when every
//! stage succeeded. [`GalaxyPipeline::ensure_current`] is the cache-aware
//! entry point: it reuses the cached layout when it was computed from exactly
//! the same notes and recomputes otherwise.
//!
//! Recomputations are serialized by one async mutex, which also owns the
//! embedding memo. The consistency check is repeated after acquiring it, so
//! concurrent callers waiting on the same change recompute only once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use galaxy_core::{
    ClusterNames, Embedding, EmbeddingBackend, Error, GenerationBackend, Node, Note, NoteId,
    Result, SimilarityResult,
};

use crate::cache::{LayoutCache, LayoutSnapshot};
use crate::clustering::{self, align_to_previous};
use crate::config::{ClusterNamer, PipelineConfig};
use crate::labels::{fallback_label, ClusterLabeler, LlmLabeler, TermLabeler};
use crate::memo::EmbeddingMemo;
use crate::similarity::{self, check_embeddings};
use crate::spatial;

/// Nodes and cluster names of one layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    pub nodes: Vec<Node>,
    pub cluster_names: ClusterNames,
}

impl LayoutResult {
    pub fn from_snapshot(snapshot: Option<&LayoutSnapshot>) -> Self {
        match snapshot {
            Some(s) => Self {
                nodes: s.nodes().to_vec(),
                cluster_names: s.cluster_names().clone(),
            },
            None => Self::default(),
        }
    }
}

/// Orchestrates embedding, clustering, layout, and labeling over a note set.
pub struct GalaxyPipeline {
    embedder: Arc<dyn EmbeddingBackend>,
    labeler: Arc<dyn ClusterLabeler>,
    config: PipelineConfig,
    cache: LayoutCache,
    recompute: Mutex<EmbeddingMemo>,
}

impl GalaxyPipeline {
    /// Pipeline with term-based cluster labels.
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, config: PipelineConfig) -> Self {
        Self {
            embedder,
            labeler: Arc::new(TermLabeler::new()),
            config,
            cache: LayoutCache::new(),
            recompute: Mutex::new(EmbeddingMemo::new()),
        }
    }

    /// Pipeline whose labeler follows `config.namer`.
    ///
    /// `ClusterNamer::Llm` without a generator falls back to term labels.
    pub fn from_config(
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Option<Arc<dyn GenerationBackend>>,
        config: PipelineConfig,
    ) -> Self {
        let labeler: Arc<dyn ClusterLabeler> = match (config.namer, generator) {
            (ClusterNamer::Llm, Some(generator)) => {
                Arc::new(LlmLabeler::new(generator).with_sample_size(config.label_sample_size))
            }
            (ClusterNamer::Llm, None) => {
                warn!("LLM cluster naming requested without a generation backend, using terms");
                Arc::new(TermLabeler::new())
            }
            (ClusterNamer::Terms, _) => Arc::new(TermLabeler::new()),
        };
        Self::new(embedder, config).with_labeler(labeler)
    }

    pub fn with_labeler(mut self, labeler: Arc<dyn ClusterLabeler>) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    pub fn labeler_name(&self) -> &str {
        self.labeler.name()
    }

    /// Recompute the layout for `notes` from scratch and publish it.
    ///
    /// An empty list clears the cache. On failure the previous cache stays
    /// in place and an [`Error::Pipeline`] is returned.
    pub async fn process_notes(&self, notes: &[Note]) -> Result<LayoutResult> {
        let mut memo = self.recompute.lock().await;
        let snapshot = self.recompute_locked(&mut memo, notes).await?;
        Ok(LayoutResult::from_snapshot(snapshot.as_deref()))
    }

    /// Cached layout for `notes`, recomputing if the cache is empty or was
    /// built from a different note set. `None` when `notes` is empty.
    pub async fn ensure_current(&self, notes: &[Note]) -> Result<Option<Arc<LayoutSnapshot>>> {
        if let Some(snapshot) = self.current_snapshot(notes).await {
            return Ok(Some(snapshot));
        }

        let mut memo = self.recompute.lock().await;
        if let Some(snapshot) = self.current_snapshot(notes).await {
            debug!("Layout recomputed by a concurrent request");
            return Ok(Some(snapshot));
        }
        self.recompute_locked(&mut memo, notes).await
    }

    /// [`ensure_current`](Self::ensure_current) as a [`LayoutResult`].
    pub async fn layout(&self, notes: &[Note]) -> Result<LayoutResult> {
        let snapshot = self.ensure_current(notes).await?;
        Ok(LayoutResult::from_snapshot(snapshot.as_deref()))
    }

    /// Notes most similar to `note_id` within `notes`.
    ///
    /// An id that is not in `notes` fails with [`Error::UnknownNoteId`]
    /// before any recomputation.
    pub async fn find_similar(
        &self,
        notes: &[Note],
        note_id: NoteId,
        top_k: i64,
    ) -> Result<Vec<SimilarityResult>> {
        if !notes.iter().any(|n| n.id == note_id) {
            return Err(Error::UnknownNoteId(note_id));
        }
        let snapshot = self
            .ensure_current(notes)
            .await?
            .ok_or(Error::EmbeddingsUnavailable)?;
        similarity::find_similar(&snapshot, note_id, top_k)
    }

    /// Similarity query against whatever layout is cached, without recomputing.
    pub async fn find_similar_cached(
        &self,
        note_id: NoteId,
        top_k: i64,
    ) -> Result<Vec<SimilarityResult>> {
        let snapshot = self
            .cache
            .snapshot()
            .await
            .ok_or(Error::EmbeddingsUnavailable)?;
        similarity::find_similar(&snapshot, note_id, top_k)
    }

    async fn current_snapshot(&self, notes: &[Note]) -> Option<Arc<LayoutSnapshot>> {
        self.cache
            .snapshot()
            .await
            .filter(|s| !s.is_empty() && s.matches(notes))
    }

    #[instrument(skip(self, memo, notes), fields(subsystem = "layout", component = "pipeline", op = "process_notes", note_count = notes.len()))]
    async fn recompute_locked(
        &self,
        memo: &mut EmbeddingMemo,
        notes: &[Note],
    ) -> Result<Option<Arc<LayoutSnapshot>>> {
        let start = Instant::now();

        if notes.is_empty() {
            self.cache.invalidate().await;
            memo.clear();
            debug!("No notes, layout cleared");
            return Ok(None);
        }

        let mut seen = HashSet::with_capacity(notes.len());
        if let Some(dup) = notes.iter().find(|n| !seen.insert(n.id)) {
            return Err(Error::InvalidInput(format!("duplicate note id {}", dup.id)));
        }

        let (embeddings, reused) = self
            .embed(memo, notes)
            .await
            .map_err(|e| Error::pipeline("embed", e))?;

        let mut clustering = clustering::cluster(&embeddings, &self.config.kmeans())
            .map_err(|e| Error::pipeline("cluster", e))?;
        if self.config.stable_categories {
            if let Some(previous) = self.cache.snapshot().await {
                clustering = align_to_previous(
                    clustering,
                    previous.centroids(),
                    self.config.category_match_threshold,
                );
            }
        }

        let coords = spatial::reduce_to_3d(&embeddings, &self.config.layout())
            .map_err(|e| Error::pipeline("reduce", e))?;

        let cluster_names = self
            .labeler
            .label_clusters(notes, &clustering.assignments)
            .await
            .map_err(|e| Error::pipeline("label", e))?;

        let nodes: Vec<Node> = notes
            .iter()
            .zip(clustering.assignments.iter())
            .zip(coords.iter())
            .map(|((note, &category), point)| Node {
                id: note.id,
                label: note.text.clone(),
                x: point[0],
                y: point[1],
                z: point[2],
                category,
                cluster_label: cluster_names
                    .get(&category)
                    .cloned()
                    .unwrap_or_else(|| fallback_label(category)),
            })
            .collect();

        let clusters = clustering.num_clusters();
        let snapshot = Arc::new(
            LayoutSnapshot::new(notes, embeddings, nodes, cluster_names, clustering.centroids)
                .map_err(|e| Error::pipeline("publish", e))?,
        );

        memo.reset_to(notes, &snapshot_embeddings(&snapshot));
        self.cache.replace(snapshot.clone()).await;

        info!(
            subsystem = "layout",
            op = "process_notes",
            note_count = notes.len(),
            cluster_count = clusters,
            reused_count = reused,
            labeler = self.labeler.name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Layout recomputed"
        );
        Ok(Some(snapshot))
    }

    /// Embeddings for `notes` in order, reusing memoized vectors.
    /// Returns the embeddings and how many were reused.
    async fn embed(&self, memo: &EmbeddingMemo, notes: &[Note]) -> Result<(Vec<Embedding>, usize)> {
        let (mut known, missing) = memo.lookup(notes);
        let reused = notes.len() - missing.len();

        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&pos| notes[pos].text.clone()).collect();
            let fresh = self.embedder.embed_texts(&texts).await?;
            if fresh.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    fresh.len()
                )));
            }
            for (pos, embedding) in missing.into_iter().zip(fresh) {
                known[pos] = Some(embedding);
            }
        }

        let embeddings: Vec<Embedding> = known
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::Internal("missing embedding after lookup".to_string()))?;
        check_embeddings(&embeddings)?;

        debug!(
            embedded = notes.len() - reused,
            reused,
            model = self.embedder.model_name(),
            "Embeddings ready"
        );
        Ok((embeddings, reused))
    }
}

fn snapshot_embeddings(snapshot: &LayoutSnapshot) -> Vec<Embedding> {
    snapshot.entries().map(|(_, e)| e.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_inference::mock::MockEmbeddingBackend;

    fn pipeline(backend: &MockEmbeddingBackend) -> GalaxyPipeline {
        GalaxyPipeline::new(Arc::new(backend.clone()), PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_memo_skips_unchanged_notes() {
        let backend = MockEmbeddingBackend::new().with_dimension(64);
        let pipeline = pipeline(&backend);

        let first = galaxy_core::notes_from_texts(&["alpha beta", "gamma delta"]);
        pipeline.process_notes(&first).await.unwrap();
        assert_eq!(backend.texts_embedded(), 2);

        let second =
            galaxy_core::notes_from_texts(&["alpha beta", "gamma delta", "epsilon zeta"]);
        pipeline.process_notes(&second).await.unwrap();
        assert_eq!(backend.texts_embedded(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let backend = MockEmbeddingBackend::new();
        let pipeline = pipeline(&backend);
        let notes = vec![Note::new(1, "a"), Note::new(1, "b")];
        let err = pipeline.process_notes(&notes).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_from_config_llm_without_generator_uses_terms() {
        let config = PipelineConfig {
            namer: ClusterNamer::Llm,
            ..PipelineConfig::default()
        };
        let pipeline =
            GalaxyPipeline::from_config(Arc::new(MockEmbeddingBackend::new()), None, config);
        assert_eq!(pipeline.labeler_name(), "terms");
    }

    #[tokio::test]
    async fn test_find_similar_cached_requires_layout() {
        let pipeline = pipeline(&MockEmbeddingBackend::new());
        let err = pipeline.find_similar_cached(0, 3).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingsUnavailable));
    }
}
