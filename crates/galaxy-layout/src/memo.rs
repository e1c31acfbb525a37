//! Per-note embedding memo.
//!
//! Keeps embeddings keyed by note id together with a hash of the text that
//! produced them, so unchanged notes are not re-embedded on every
//! recomputation. Clustering and reduction still run over the whole set.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use galaxy_core::{Embedding, Note, NoteId};

/// Hex SHA-256 of a note text.
pub fn text_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Clone)]
struct MemoEntry {
    text_hash: String,
    embedding: Embedding,
}

/// Embeddings of previously processed notes.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingMemo {
    entries: HashMap<NoteId, MemoEntry>,
}

impl EmbeddingMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized embedding for `note`, if its text is unchanged.
    pub fn get(&self, note: &Note) -> Option<&Embedding> {
        self.entries
            .get(&note.id)
            .filter(|e| e.text_hash == text_hash(&note.text))
            .map(|e| &e.embedding)
    }

    /// Split `notes` into known embeddings (by position) and positions still to embed.
    pub fn lookup(&self, notes: &[Note]) -> (Vec<Option<Embedding>>, Vec<usize>) {
        let mut known = Vec::with_capacity(notes.len());
        let mut missing = Vec::new();
        for (pos, note) in notes.iter().enumerate() {
            match self.get(note) {
                Some(embedding) => known.push(Some(embedding.clone())),
                None => {
                    known.push(None);
                    missing.push(pos);
                }
            }
        }
        (known, missing)
    }

    pub fn insert(&mut self, note: &Note, embedding: Embedding) {
        self.entries.insert(
            note.id,
            MemoEntry {
                text_hash: text_hash(&note.text),
                embedding,
            },
        );
    }

    /// Replace the memo contents with exactly `notes` and their `embeddings`.
    pub fn reset_to(&mut self, notes: &[Note], embeddings: &[Embedding]) {
        self.entries.clear();
        for (note, embedding) in notes.iter().zip(embeddings.iter()) {
            self.insert(note, embedding.clone());
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_hash_is_stable_hex() {
        let h = text_hash("I love cats");
        assert_eq!(h.len(), 64);
        assert_eq!(h, text_hash("I love cats"));
        assert_ne!(h, text_hash("I love dogs"));
    }

    #[test]
    fn test_lookup_splits_known_and_missing() {
        let mut memo = EmbeddingMemo::new();
        let notes = galaxy_core::notes_from_texts(&["a", "b", "c"]);
        memo.insert(&notes[0], vec![1.0]);
        memo.insert(&notes[2], vec![3.0]);

        let (known, missing) = memo.lookup(&notes);
        assert_eq!(known, vec![Some(vec![1.0]), None, Some(vec![3.0])]);
        assert_eq!(missing, vec![1]);
    }

    #[test]
    fn test_changed_text_is_a_miss() {
        let mut memo = EmbeddingMemo::new();
        memo.insert(&Note::new(0, "before"), vec![1.0]);
        assert!(memo.get(&Note::new(0, "before")).is_some());
        assert!(memo.get(&Note::new(0, "after")).is_none());
    }

    #[test]
    fn test_reset_to_prunes_departed_notes() {
        let mut memo = EmbeddingMemo::new();
        memo.insert(&Note::new(0, "a"), vec![1.0]);
        memo.insert(&Note::new(7, "gone"), vec![7.0]);

        memo.reset_to(&[Note::new(0, "a")], &[vec![1.0]]);
        assert_eq!(memo.len(), 1);
        assert!(memo.get(&Note::new(7, "gone")).is_none());

        memo.clear();
        assert!(memo.is_empty());
    }
}
