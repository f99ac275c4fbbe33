use std::path::PathBuf;
use thiserror::Error;

use crate::phoneme_ids::Phoneme;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Model or phonemizer resource is missing or corrupt. The owning instance is unusable.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("input has {len} characters, the model accepts at most {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("model produced {actual} predictions for {expected} input characters")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("phoneme {0:?} has no id")]
    MissingPhoneme(Phoneme),

    #[error("phonemizer failed: {0}")]
    Phonemizer(#[source] anyhow::Error),

    #[error("phonemizer is not initialized")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid voice config: {0}")]
    Config(#[from] serde_json::Error),
}
