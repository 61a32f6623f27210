use thiserror::Error;

use crate::filters::FilterKind;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {kind:?} value {value}: {reason}")]
    InvalidParameter {
        kind: FilterKind,
        value: f32,
        reason: &'static str,
    },

    #[error("pixel data length {actual} doesn't match expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("failed to spawn filter worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("filter run panicked: {0}")]
    RunPanicked(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
