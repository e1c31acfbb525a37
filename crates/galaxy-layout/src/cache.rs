//! Process-wide layout cache.
//!
//! Holds the most recent successful pipeline output as an immutable
//! [`LayoutSnapshot`]. Readers clone the `Arc` under a read lock; the pipeline
//! swaps in a complete new snapshot under the write lock, so a reader sees
//! either the fully-old or the fully-new layout.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use galaxy_core::{ClusterNames, Embedding, Error, Node, Note, NoteId, Result};

/// Fingerprint of a note set: hex SHA-256 over every `(id, text)` pair in order.
///
/// Two note lists with the same fingerprint have identical membership and text.
pub fn layout_fingerprint(notes: &[Note]) -> String {
    let mut hasher = Sha256::new();
    for note in notes {
        hasher.update(note.id.to_le_bytes());
        hasher.update((note.text.len() as u64).to_le_bytes());
        hasher.update(note.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// One complete pipeline result.
#[derive(Debug, Clone)]
pub struct LayoutSnapshot {
    fingerprint: String,
    nodes: Vec<Node>,
    embeddings: Vec<Embedding>,
    index: HashMap<NoteId, usize>,
    cluster_names: ClusterNames,
    centroids: Vec<Embedding>,
}

impl LayoutSnapshot {
    /// Build a snapshot from parallel `notes`, `embeddings`, and `nodes`.
    ///
    /// `centroids[i]` is the centroid of category `i`.
    pub fn new(
        notes: &[Note],
        embeddings: Vec<Embedding>,
        nodes: Vec<Node>,
        cluster_names: ClusterNames,
        centroids: Vec<Embedding>,
    ) -> Result<Self> {
        if embeddings.len() != notes.len() || nodes.len() != notes.len() {
            return Err(Error::Internal(format!(
                "layout snapshot size mismatch: {} notes, {} embeddings, {} nodes",
                notes.len(),
                embeddings.len(),
                nodes.len()
            )));
        }

        let mut index = HashMap::with_capacity(notes.len());
        for (pos, (note, node)) in notes.iter().zip(nodes.iter()).enumerate() {
            if note.id != node.id {
                return Err(Error::Internal(format!(
                    "layout snapshot node {} does not match note {}",
                    node.id, note.id
                )));
            }
            if index.insert(note.id, pos).is_some() {
                return Err(Error::InvalidInput(format!("duplicate note id {}", note.id)));
            }
        }

        Ok(Self {
            fingerprint: layout_fingerprint(notes),
            nodes,
            embeddings,
            index,
            cluster_names,
            centroids,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn embedding(&self, id: NoteId) -> Option<&Embedding> {
        self.index.get(&id).map(|&pos| &self.embeddings[pos])
    }

    /// Nodes paired with the embedding that produced them.
    pub fn entries(&self) -> impl Iterator<Item = (&Node, &Embedding)> {
        self.nodes.iter().zip(self.embeddings.iter())
    }

    pub fn cluster_names(&self) -> &ClusterNames {
        &self.cluster_names
    }

    pub fn centroids(&self) -> &[Embedding] {
        &self.centroids
    }

    /// Whether this snapshot was computed from exactly `notes`.
    pub fn matches(&self, notes: &[Note]) -> bool {
        self.nodes.len() == notes.len() && self.fingerprint == layout_fingerprint(notes)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Shared handle to the current layout.
#[derive(Clone, Default)]
pub struct LayoutCache {
    inner: Arc<RwLock<Option<Arc<LayoutSnapshot>>>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if any.
    pub async fn snapshot(&self) -> Option<Arc<LayoutSnapshot>> {
        self.inner.read().await.clone()
    }

    /// Replace the whole layout.
    pub async fn replace(&self, snapshot: Arc<LayoutSnapshot>) {
        let nodes = snapshot.len();
        *self.inner.write().await = Some(snapshot);
        debug!(nodes, "Layout cache replaced");
    }

    /// Drop the current layout.
    pub async fn invalidate(&self) {
        let previous = self.inner.write().await.take();
        if previous.is_some() {
            debug!("Layout cache invalidated");
        }
    }

    /// Number of cached nodes (0 when empty).
    pub async fn len(&self) -> usize {
        self.inner.read().await.as_ref().map_or(0, |s| s.len())
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NoteId, text: &str) -> Node {
        Node {
            id,
            label: text.to_string(),
            x: id as f32,
            y: 0.0,
            z: 0.0,
            category: 0,
            cluster_label: "Category 0".to_string(),
        }
    }

    fn snapshot(texts: &[&str]) -> LayoutSnapshot {
        let notes = galaxy_core::notes_from_texts(texts);
        let nodes = notes.iter().map(|n| node(n.id, &n.text)).collect();
        let embeddings = notes.iter().map(|n| vec![n.id as f32, 1.0]).collect();
        LayoutSnapshot::new(&notes, embeddings, nodes, ClusterNames::new(), Vec::new()).unwrap()
    }

    #[test]
    fn test_fingerprint_depends_on_ids_and_text() {
        let a = galaxy_core::notes_from_texts(&["x", "y"]);
        let b = galaxy_core::notes_from_texts(&["x", "z"]);
        let c = vec![Note::new(0, "x"), Note::new(2, "y")];
        assert_eq!(layout_fingerprint(&a), layout_fingerprint(&a.clone()));
        assert_ne!(layout_fingerprint(&a), layout_fingerprint(&b));
        assert_ne!(layout_fingerprint(&a), layout_fingerprint(&c));
    }

    #[test]
    fn test_fingerprint_is_not_fooled_by_concatenation() {
        let a = vec![Note::new(0, "ab"), Note::new(1, "c")];
        let b = vec![Note::new(0, "a"), Note::new(1, "bc")];
        assert_ne!(layout_fingerprint(&a), layout_fingerprint(&b));
    }

    #[test]
    fn test_snapshot_lookup() {
        let s = snapshot(&["I love cats", "I love dogs"]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.embedding(1).unwrap(), &vec![1.0, 1.0]);
        assert!(s.embedding(2).is_none());
        assert_eq!(s.nodes()[1].label, "I love dogs");
    }

    #[test]
    fn test_snapshot_rejects_size_mismatch() {
        let notes = galaxy_core::notes_from_texts(&["a", "b"]);
        let err = LayoutSnapshot::new(
            &notes,
            vec![vec![1.0]],
            vec![node(0, "a"), node(1, "b")],
            ClusterNames::new(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_snapshot_rejects_duplicate_ids() {
        let notes = vec![Note::new(3, "a"), Note::new(3, "b")];
        let err = LayoutSnapshot::new(
            &notes,
            vec![vec![1.0], vec![1.0]],
            vec![node(3, "a"), node(3, "b")],
            ClusterNames::new(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_cache_replace_and_invalidate() {
        let cache = LayoutCache::new();
        assert!(cache.snapshot().await.is_none());
        assert!(cache.is_empty().await);

        let notes = galaxy_core::notes_from_texts(&["a", "b"]);
        cache.replace(Arc::new(snapshot(&["a", "b"]))).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.snapshot().await.unwrap().matches(&notes));

        let grown = galaxy_core::notes_from_texts(&["a", "b", "c"]);
        assert!(!cache.snapshot().await.unwrap().matches(&grown));

        cache.invalidate().await;
        assert!(cache.snapshot().await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_readers_keep_old_snapshot_across_replace() {
        let cache = LayoutCache::new();
        cache.replace(Arc::new(snapshot(&["old"]))).await;
        let held = cache.snapshot().await.unwrap();

        cache.replace(Arc::new(snapshot(&["new", "newer"]))).await;
        assert_eq!(held.nodes()[0].label, "old");
        assert_eq!(cache.snapshot().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = LayoutCache::new();
        let other = cache.clone();
        cache.replace(Arc::new(snapshot(&["a"]))).await;
        assert_eq!(other.len().await, 1);
    }
}
