//! Error types for message materialization and bounce classification

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the library.
///
/// Malformed mail content never produces one of these: decode failures are
/// contained inside the part tree and unrecognized bounces are `None`.
#[derive(Error, Debug)]
pub enum BounceError {
    /// The raw message could not be split into parts
    #[error("Failed to parse message structure: {0}")]
    Structure(String),

    /// The status code table could not be read
    #[error("Failed to read status code table '{}': {source}", path.display())]
    StatusTableIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A status code table line is not a `code=description` pair
    #[error("Invalid status code entry at line {line}: {content}")]
    InvalidStatusEntry { line: usize, content: String },

    /// A bounce body pattern failed to compile
    #[error("Invalid bounce pattern {name}: {source}")]
    InvalidPattern {
        name: String,
        source: regex::Error,
    },

    /// Configuration could not be deserialized
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for library operations
pub type Result<T> = std::result::Result<T, BounceError>;
