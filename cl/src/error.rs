//! Corpus access error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading corpus data
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Registry directory not found: {0}")]
    RegistryNotFound(PathBuf),

    #[error("Corpus {name} not found in registry {registry}")]
    CorpusNotFound { name: String, registry: PathBuf },

    #[error("Registry file {path}:{line}: {message}")]
    Registry { path: PathBuf, line: usize, message: String },

    #[error("Attribute {name} is not declared for corpus {corpus}")]
    AttributeNotFound { corpus: String, name: String },

    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    #[error("Position {position} out of range for attribute {name} (size {size})")]
    PositionOutOfRange { name: String, position: usize, size: usize },

    #[error("Corrupt data file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CorpusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CorpusError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CorpusError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
