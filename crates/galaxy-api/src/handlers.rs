//! Request handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use galaxy_core::{notes_from_texts, ClusterNames, Error, Node, SimilarityResult};
use galaxy_layout::LayoutResult;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, NoteIdPath};
use crate::state::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub notes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SimilarQuery {
    pub top_k: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AddNotesResponse {
    pub message: String,
    pub total_notes: usize,
    pub nodes: Vec<Node>,
    pub cluster_names: ClusterNames,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub similar_notes: Vec<SimilarityResult>,
}

/// Reject blank texts; an empty list is fine.
fn validate_texts(texts: &[String]) -> ApiResult<()> {
    if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest(format!("Note at index {pos} is empty")));
    }
    Ok(())
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Neuro-Galaxy API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let notes = state.notes.count().await?;
    let cached_nodes = state.pipeline.cache().len().await;
    Ok(Json(json!({
        "status": "ok",
        "notes": notes,
        "cached_nodes": cached_nodes,
    })))
}

/// Lay out an ad-hoc note list without touching the store.
#[instrument(skip_all, fields(subsystem = "api", op = "process", note_count = req.notes.len()))]
pub async fn process(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NotesRequest>,
) -> ApiResult<Json<LayoutResult>> {
    validate_texts(&req.notes)?;
    let notes = notes_from_texts(&req.notes);
    let result = state.pipeline.process_notes(&notes).await?;
    Ok(Json(result))
}

/// Layout of the persisted store, recomputed only when the store changed.
#[instrument(skip_all, fields(subsystem = "api", op = "list_nodes"))]
pub async fn list_nodes(State(state): State<AppState>) -> ApiResult<Json<LayoutResult>> {
    let notes = state.notes.list().await?;
    let result = state.pipeline.layout(&notes).await?;
    debug!(node_count = result.nodes.len(), "Serving layout");
    Ok(Json(result))
}

#[instrument(skip_all, fields(subsystem = "api", op = "add_notes", note_count = req.notes.len()))]
pub async fn add_notes(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NotesRequest>,
) -> ApiResult<Json<AddNotesResponse>> {
    validate_texts(&req.notes)?;
    let added = state.notes.append(req.notes).await?;
    let notes = state.notes.list().await?;
    info!(added = added.len(), total = notes.len(), "Notes appended");

    let layout = state.pipeline.layout(&notes).await?;
    Ok(Json(AddNotesResponse {
        message: format!("Added {} note(s)", added.len()),
        total_notes: notes.len(),
        nodes: layout.nodes,
        cluster_names: layout.cluster_names,
    }))
}

/// Ranked neighbors of one stored note.
///
/// When the layout cannot be brought up to date, the last published layout
/// still answers for notes it contains.
#[instrument(skip(state, query), fields(subsystem = "api", op = "similar"))]
pub async fn similar(
    State(state): State<AppState>,
    NoteIdPath(note_id): NoteIdPath,
    ApiQuery(query): ApiQuery<SimilarQuery>,
) -> ApiResult<Json<SimilarResponse>> {
    let top_k = query.top_k.unwrap_or(state.default_top_k);
    let notes = state.notes.list().await?;
    let similar_notes = match state.pipeline.find_similar(&notes, note_id, top_k).await {
        Ok(results) => results,
        Err(err @ Error::Pipeline(_)) => {
            match state.pipeline.find_similar_cached(note_id, top_k).await {
                Ok(stale) => {
                    warn!(note_id, error = %err, "Layout recompute failed, serving cached neighbors");
                    stale
                }
                Err(_) => return Err(err.into()),
            }
        }
        Err(err) => return Err(err.into()),
    };
    Ok(Json(SimilarResponse { similar_notes }))
}
