//! Error taxonomy for the response engine
//!
//! Construction errors (`ConfigurationConflict`, `StoreUnavailable`) are
//! fatal: the engine is never built. Per-call errors (`MissingTeachTarget`,
//! `EmptyStore`) fail that call only and leave the engine usable.

use std::path::PathBuf;

/// Errors produced by the engine and its knowledge store.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Mutually exclusive configuration options were both supplied.
    #[error("configuration conflict: {0}")]
    ConfigurationConflict(&'static str),

    /// The backing model document could not be located or parsed.
    #[error("model '{model}' unavailable at {}: {reason}", path.display())]
    StoreUnavailable {
        model: String,
        path: PathBuf,
        reason: String,
    },

    /// Manual-teach mode was invoked without the required output.
    #[error("manual teach requires an output phrase")]
    MissingTeachTarget,

    /// A random key or fallback was requested from a store with no entries.
    #[error("knowledge store has no entries")]
    EmptyStore,

    /// Writing the store document or its backup failed.
    #[error("failed to persist knowledge store: {0}")]
    Persist(#[from] std::io::Error),

    /// Serializing the store document failed.
    #[error("failed to serialize knowledge store: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
