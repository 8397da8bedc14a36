use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors produced while generating, signing or publishing provenance.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An I/O failure tied to a specific file or directory.
    #[error("{context}: {source}")]
    FileIo {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Signing error: {0}")]
    Signing(String),

    /// HTTP failures and unexpected status codes from the release service.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps an I/O error with a message naming the path involved.
    pub fn file_io(context: impl AsRef<str>, path: &Path, source: io::Error) -> Self {
        Error::FileIo {
            context: format!("{} {}", context.as_ref(), path.display()),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
