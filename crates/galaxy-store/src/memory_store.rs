//! In-memory note store. Data is lost on restart.

use async_trait::async_trait;
use tokio::sync::RwLock;

use galaxy_core::{Note, NoteId, NoteRepository, Result};

/// In-memory [`NoteRepository`] implementation for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: RwLock<Vec<Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `texts`, numbered from 0.
    pub fn with_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self {
            notes: RwLock::new(galaxy_core::notes_from_texts(texts)),
        }
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteStore {
    async fn list(&self) -> Result<Vec<Note>> {
        Ok(self.notes.read().await.clone())
    }

    async fn append(&self, texts: Vec<String>) -> Result<Vec<Note>> {
        let mut notes = self.notes.write().await;
        let first_id = notes.len() as NoteId;
        let added: Vec<Note> = texts
            .into_iter()
            .enumerate()
            .map(|(i, t)| Note::new(first_id + i as NoteId, t))
            .collect();
        notes.extend(added.iter().cloned());
        Ok(added)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.notes.read().await.len())
    }
}
