//! Shared handler state.

use std::sync::Arc;

use galaxy_core::NoteRepository;
use galaxy_layout::GalaxyPipeline;

#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    pub pipeline: Arc<GalaxyPipeline>,
    /// `top_k` used when a similarity request omits it.
    pub default_top_k: i64,
}

impl AppState {
    pub fn new(notes: Arc<dyn NoteRepository>, pipeline: Arc<GalaxyPipeline>) -> Self {
        Self {
            notes,
            pipeline,
            default_top_k: galaxy_core::defaults::SIMILAR_TOP_K as i64,
        }
    }

    pub fn with_default_top_k(mut self, top_k: i64) -> Self {
        self.default_top_k = top_k;
        self
    }
}
