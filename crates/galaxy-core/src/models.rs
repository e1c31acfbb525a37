//! Data model shared by the store, the layout pipeline, and the API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Note identifier. Assigned by append order in the note store, never reused.
pub type NoteId = u64;

/// Dense semantic embedding of a note's text.
pub type Embedding = Vec<f32>;

/// Category index to human-readable cluster label for one pipeline run.
pub type ClusterNames = BTreeMap<usize, String>;

/// A persisted text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
}

impl Note {
    pub fn new(id: NoteId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Build notes from raw texts, numbering them by position.
pub fn notes_from_texts<S: AsRef<str>>(texts: &[S]) -> Vec<Note> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Note::new(i as NoteId, t.as_ref()))
        .collect()
}

/// One point of the galaxy layout, 1:1 with a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NoteId,
    /// The note text.
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub category: usize,
    pub cluster_label: String,
}

/// A ranked neighbor returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub id: NoteId,
    pub label: String,
    /// Raw cosine similarity in `[-1, 1]`.
    pub similarity_score: f32,
    pub category: usize,
    pub cluster_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_from_texts_numbers_by_position() {
        let notes = notes_from_texts(&["a", "b", "c"]);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0], Note::new(0, "a"));
        assert_eq!(notes[2], Note::new(2, "c"));
    }

    #[test]
    fn test_node_wire_shape() {
        let node = Node {
            id: 7,
            label: "I love cats".to_string(),
            x: 1.0,
            y: -2.0,
            z: 0.5,
            category: 1,
            cluster_label: "Pets Cats".to_string(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["label"], "I love cats");
        assert_eq!(json["x"], 1.0);
        assert_eq!(json["y"], -2.0);
        assert_eq!(json["z"], 0.5);
        assert_eq!(json["category"], 1);
        assert_eq!(json["cluster_label"], "Pets Cats");
    }

    #[test]
    fn test_similarity_result_wire_shape() {
        let result = SimilarityResult {
            id: 1,
            label: "I love dogs".to_string(),
            similarity_score: 0.5,
            category: 0,
            cluster_label: "Pets".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert!(keys.contains(&"similarity_score"));
        assert!(keys.contains(&"cluster_label"));
        assert_eq!(json["similarity_score"], 0.5);
    }

    #[test]
    fn test_cluster_names_serialize_with_string_keys() {
        let mut names = ClusterNames::new();
        names.insert(0, "Space Travel".to_string());
        names.insert(2, "Cooking".to_string());
        let json = serde_json::to_string(&names).unwrap();
        assert_eq!(json, r#"{"0":"Space Travel","2":"Cooking"}"#);
    }
}
