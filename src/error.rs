use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the prediction entry points.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("input could not be decoded: {0:#}")]
    Decode(anyhow::Error),

    #[error("video yielded no readable frames")]
    EmptyInput,

    #[error("classifier returned {actual} scores but the vocabulary has {expected} labels")]
    VocabularyMismatch { expected: usize, actual: usize },

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),
}

impl PredictError {
    /// Errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Decode(_) | PredictError::EmptyInput)
    }
}

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vocabulary {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("vocabulary is empty")]
    Empty,

    #[error("label {label:?} appears at both index {first} and {second}")]
    Duplicate {
        label: String,
        first: usize,
        second: usize,
    },

    #[error("model checksum mismatch: vocabulary expects {expected}, model file hashes to {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}
