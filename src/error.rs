use reqwest::StatusCode;
use std::path::PathBuf;

/// Failure talking to the metadata API. Every variant names the operation
/// that produced it so call sites can log a useful diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum RemoteFetchError {
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{operation}: JSON parse failed: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation}: invalid movie id {id}")]
    InvalidId { operation: &'static str, id: u32 },
}

impl RemoteFetchError {
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteFetchError::Transport { operation, .. }
            | RemoteFetchError::Status { operation, .. }
            | RemoteFetchError::Decode { operation, .. }
            | RemoteFetchError::InvalidId { operation, .. } => operation,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read favorites from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write favorites to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored favorites are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
