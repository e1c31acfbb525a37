//! JSON-file note store.
//!
//! ## Example
//!
//! ```rust,no_run
//! use galaxy_core::NoteRepository;
//! use galaxy_store::FileNoteStore;
//!
//! # async fn demo() -> galaxy_core::Result<()> {
//! let store = FileNoteStore::new("data/notes.json");
//! let added = store.append(vec!["I love cats".to_string()]).await?;
//! let all = store.list().await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use galaxy_core::{notes_from_texts, Error, Note, NoteId, NoteRepository, Result};

/// On-disk document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct NotesFile {
    #[serde(default)]
    notes: Vec<String>,
}

/// Note store backed by a single JSON file.
///
/// Writes are atomic (temp file + rename) and serialized behind an async
/// mutex so concurrent appends cannot interleave read-modify-write cycles.
pub struct FileNoteStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_texts(&self) -> Result<Vec<String>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "file_store: read failed");
                return Err(Error::Storage(format!(
                    "Error loading notes from {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }

        let doc: NotesFile = serde_json::from_slice(&data).map_err(|e| {
            Error::Storage(format!(
                "Error loading notes from {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(doc.notes)
    }

    async fn write_texts(&self, notes: Vec<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    warn!(parent = %parent.display(), error = %e, "file_store: create_dir_all failed");
                    e
                })?;
            }
        }

        let body = serde_json::to_vec_pretty(&NotesFile { notes })?;

        // Atomic write: temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_store: File::create failed");
            e
        })?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %self.path.display(), error = %e, "file_store: rename failed");
            e
        })?;
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for FileNoteStore {
    async fn list(&self) -> Result<Vec<Note>> {
        let texts = self.read_texts().await?;
        Ok(notes_from_texts(&texts))
    }

    #[instrument(skip(self, texts), fields(subsystem = "store", component = "file_store", op = "append", input_count = texts.len()))]
    async fn append(&self, texts: Vec<String>) -> Result<Vec<Note>> {
        let _guard = self.write_lock.lock().await;

        let mut existing = self.read_texts().await?;
        let first_id = existing.len() as NoteId;
        let added: Vec<Note> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Note::new(first_id + i as NoteId, t.clone()))
            .collect();

        if texts.is_empty() {
            return Ok(added);
        }

        existing.extend(texts);
        let total = existing.len();
        self.write_texts(existing).await?;

        debug!(added = added.len(), total, path = %self.path.display(), "Notes appended");
        Ok(added)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read_texts().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileNoteStore::new(dir.path().join("notes.json"));
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "  \n").unwrap();
        let store = FileNoteStore::new(path);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileNoteStore::new(path);
        let err = store.list().await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_empty_append_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = FileNoteStore::new(&path);
        let added = store.append(vec![]).await.unwrap();
        assert!(added.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = FileNoteStore::new(&path);
        store.append(vec!["a".to_string()]).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
