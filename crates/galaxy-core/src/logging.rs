//! Structured logging schema and field name constants for neuro-galaxy.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query the same keys across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), recomputation completions |
//! | DEBUG | Decision points, cache hits/misses, config choices |
//! | TRACE | Per-item iteration (k-means restarts, layout epochs) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "layout", "store", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pipeline", "kmeans", "spatializer", "ollama", "file_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process_notes", "find_similar", "embed_texts", "append"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of notes in the working set.
pub const NOTE_COUNT: &str = "note_count";

/// Number of clusters produced.
pub const CLUSTER_COUNT: &str = "cluster_count";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Number of embeddings served from the memo instead of the model.
pub const REUSED_COUNT: &str = "reused_count";

/// Every field name above, for schema checks.
pub const ALL_FIELDS: &[&str] = &[
    SUBSYSTEM,
    COMPONENT,
    OPERATION,
    NOTE_ID,
    NOTE_COUNT,
    CLUSTER_COUNT,
    DURATION_MS,
    RESULT_COUNT,
    INPUT_COUNT,
    REUSED_COUNT,
];
