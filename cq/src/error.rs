//! Concordance error types

use cwb_cl::CorpusError;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors that can occur while building a concordance page
#[derive(Debug, Error)]
pub enum ConcordanceError {
    #[error("Invalid argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Timestamp {value:?} at position {position} is not an integer")]
    InvalidTimestamp { value: String, position: usize },

    #[error("Query engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),
}

impl ConcordanceError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString) -> Self {
        ConcordanceError::InvalidArgument {
            name,
            value: value.to_string(),
        }
    }
}
