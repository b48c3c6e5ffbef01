//! Error types for tarot-vision
//!
//! Pure components (comparator, selector) never fail. Failures live at the
//! storage boundary (`tarot_common::Error`), the review merge rules
//! ([`ReviewError`]), the external vision model ([`ModelError`]) and the
//! batch driver ([`WorkflowError`]).

use thiserror::Error;

use crate::models::RecognitionSlot;

/// A review operation that the merge rules reject
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// Commit with nothing in the working set
    #[error("Cannot save an empty review: select at least one card")]
    EmptyWorkingSet,

    /// Positions are 1-based
    #[error("Invalid position {0}: positions start at 1")]
    InvalidPosition(u32),

    /// Edit or delete of a position the working set does not hold
    #[error("No card at position {0}")]
    NoCardAtPosition(u32),

    /// Pull of a position the recognition does not report
    #[error("The {slot:?} recognition has no card at position {position}")]
    RecognitionCardMissing { slot: RecognitionSlot, position: u32 },

    /// Pull of a card whose names are both missing
    #[error("The card at position {0} has no name information")]
    UnidentifiedCard(u32),

    /// Manual entry with no name at all
    #[error("A card needs at least one name")]
    MissingName,
}

/// Failure reported by the external vision model
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Connection reset, DNS failure, ...
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429 or provider rate limit
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other provider error (bad key, malformed response, ...)
    #[error("Model API error: {0}")]
    Api(String),
}

impl ModelError {
    /// Network, rate-limit and timeout failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_) | Self::Timeout(_))
    }
}

/// Batch driver failure
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Task or label storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] tarot_common::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The single-batch gate is closed
    #[error("Another annotation task is already pending or running")]
    TaskAlreadyRunning,
}

/// Result type for the batch driver
pub type WorkflowResult<T> = Result<T, WorkflowError>;
