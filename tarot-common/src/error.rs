//! Storage and configuration errors shared by the tarot crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure at the record-store or configuration boundary
///
/// A missing record is not an error: stores return `Ok(None)`. `NotFound`
/// is reserved for operations that need something to exist first, such as
/// a correction whose annotation record is absent or a missing image folder.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a record file or folder
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a value as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record is not UTF-8 JSON of the expected shape
    #[error("Malformed record {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// Unreadable or invalid config file
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad record key, or an operation the record's state forbids
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Poisoned lock in an in-memory store
    #[error("Internal error: {0}")]
    Internal(String),
}
