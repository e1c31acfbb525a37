//! Cosine similarity ranking over the cached embeddings.

use std::cmp::Ordering;

use tracing::{debug, instrument};

use galaxy_core::{Embedding, Error, NoteId, Result, SimilarityResult};

use crate::cache::LayoutSnapshot;

/// Cosine similarity of two vectors in `[-1, 1]`.
///
/// Defined as 0 when either vector has zero norm or the lengths differ.
/// Accumulates in f64 so `similarity(a, b) == similarity(b, a)` exactly.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// L2-normalized f64 copy of `v`. A zero vector stays zero.
pub(crate) fn normalized(v: &[f32]) -> Vec<f64> {
    let norm = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|&x| x as f64 / norm).collect()
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Check that all embeddings share one non-zero dimension and are finite.
///
/// Returns the common dimension (0 for an empty set).
pub(crate) fn check_embeddings(embeddings: &[Embedding]) -> Result<usize> {
    let Some(first) = embeddings.first() else {
        return Ok(0);
    };
    let dimension = first.len();
    if dimension == 0 {
        return Err(Error::InvalidInput("embedding has zero dimension".to_string()));
    }
    for (i, e) in embeddings.iter().enumerate() {
        if e.len() != dimension {
            return Err(Error::InvalidInput(format!(
                "embedding {} has dimension {}, expected {}",
                i,
                e.len(),
                dimension
            )));
        }
        if e.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "embedding {} contains non-finite values",
                i
            )));
        }
    }
    Ok(dimension)
}

/// Rank every other cached note by cosine similarity to `note_id`.
///
/// Results are sorted by descending similarity with ties broken by ascending
/// note id, and truncated to `top_k`. `top_k <= 0` yields an empty list.
///
/// # Errors
///
/// - [`Error::EmbeddingsUnavailable`] if the snapshot is empty
/// - [`Error::UnknownNoteId`] if `note_id` is not in the snapshot
#[instrument(skip(snapshot), fields(subsystem = "layout", component = "similarity", op = "find_similar", result_count = tracing::field::Empty))]
pub fn find_similar(
    snapshot: &LayoutSnapshot,
    note_id: NoteId,
    top_k: i64,
) -> Result<Vec<SimilarityResult>> {
    if snapshot.is_empty() {
        return Err(Error::EmbeddingsUnavailable);
    }
    let target = snapshot
        .embedding(note_id)
        .ok_or(Error::UnknownNoteId(note_id))?;

    if top_k <= 0 {
        tracing::Span::current().record("result_count", 0);
        return Ok(Vec::new());
    }

    let mut results: Vec<SimilarityResult> = snapshot
        .entries()
        .filter(|(node, _)| node.id != note_id)
        .map(|(node, embedding)| SimilarityResult {
            id: node.id,
            label: node.label.clone(),
            similarity_score: cosine_similarity(target, embedding),
            category: node.category,
            cluster_label: node.cluster_label.clone(),
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(usize::try_from(top_k).unwrap_or(usize::MAX));

    tracing::Span::current().record("result_count", results.len());
    debug!(note_id, top_k, result_count = results.len(), "Similar notes ranked");
    Ok(results)
}
