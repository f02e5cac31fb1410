//! Error types for linkscan core

use thiserror::Error;

/// Result type alias using linkscan Error
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal investigation errors and ambient failures
#[derive(Error, Debug)]
pub enum Error {
    /// The backend could not be reached or answered with an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend reply broke the JSON contract
    #[error("Contract violation: {message}")]
    Contract {
        message: String,
        /// Raw backend text, kept for diagnostics
        raw: String,
    },

    #[error("Investigation exceeded the limit of {0} iterations")]
    IterationLimit(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn contract(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Contract {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Raw backend payload attached to a contract violation
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            Self::Contract { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Tool-specific errors, recovered into the next turn's payload
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
