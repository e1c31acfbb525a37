//! # galaxy-store
//!
//! Persisted note store for neuro-galaxy.
//!
//! Notes are plain texts keyed by their append position. The file-backed
//! store keeps the on-disk format `{"notes": ["text", ...]}`; the in-memory
//! store backs tests and ephemeral runs.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileNoteStore;
pub use memory_store::MemoryNoteStore;
