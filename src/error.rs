//! Error types for the import pipeline.
//!
//! Only I/O, parsing and configuration failures are represented here. Misuse of
//! the in-memory API (mismatched shapes, duplicate selection indices, a split
//! fraction outside `[0, 1]`) panics at the call site instead.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("could not write npy file: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("could not read npy file: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Malformed bag-of-words input, `line` is 1-based (0 when the whole file is at fault).
    #[error("{path}:{line}: {message}")]
    Format {
        path: String,
        line: usize,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn format(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        PipelineError::Format {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
