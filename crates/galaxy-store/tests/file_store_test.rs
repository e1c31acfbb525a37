//! File-backed note store integration tests.

use std::sync::Arc;

use galaxy_core::{Note, NoteId, NoteRepository};
use galaxy_store::FileNoteStore;

#[tokio::test]
async fn test_append_then_list_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("notes.json");

    let store = FileNoteStore::new(&path);
    let added = store
        .append(vec!["I love cats".to_string(), "I love dogs".to_string()])
        .await
        .unwrap();
    assert_eq!(added[0], Note::new(0, "I love cats"));
    assert_eq!(added[1], Note::new(1, "I love dogs"));

    // A fresh handle sees the persisted notes.
    let reopened = FileNoteStore::new(&path);
    let notes = reopened.list().await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].text, "I love dogs");
}

#[tokio::test]
async fn test_ids_continue_after_existing_notes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, r#"{"notes": ["first", "second"]}"#).unwrap();

    let store = FileNoteStore::new(&path);
    let added = store.append(vec!["third".to_string()]).await.unwrap();
    assert_eq!(added, vec![Note::new(2, "third")]);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_on_disk_format_is_notes_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");

    let store = FileNoteStore::new(&path);
    store.append(vec!["Stock market crashed".to_string()]).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({"notes": ["Stock market crashed"]}));
}

#[tokio::test]
async fn test_concurrent_appends_never_reuse_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileNoteStore::new(dir.path().join("notes.json")));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.append(vec![format!("note {i}")]).await.unwrap()
        }));
    }

    let mut ids: Vec<NoteId> = Vec::new();
    for handle in handles {
        ids.extend(handle.await.unwrap().into_iter().map(|n| n.id));
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..8).collect::<Vec<NoteId>>());
    assert_eq!(store.count().await.unwrap(), 8);
}
