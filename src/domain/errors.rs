// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed errors for the failure modes a run can hit. The
// application layer wraps these in anyhow with extra context;
// nothing here is ever retried.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::parameter::Source;

pub type FinetuneResult<T> = Result<T, FinetuneError>;

#[derive(Debug, Error)]
pub enum FinetuneError {
    /// Invalid settings or missing inputs, raised before training starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The iterator was asked for more batches than its source holds.
    #[error("{origin} data exhausted after {consumed} batches")]
    Exhausted { origin: Source, consumed: usize },

    #[error("dataset iterator used before reset")]
    NotReset,

    #[error("cannot load sample {index}: {reason}")]
    Data { index: usize, reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record error: {0}")]
    Record(String),
}

impl FinetuneError {
    pub fn config(msg: impl Into<String>) -> Self {
        FinetuneError::Configuration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FinetuneError::Io { path: path.into(), source }
    }
}
