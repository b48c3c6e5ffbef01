//! Progress events for batch annotation runs
//!
//! The batch driver publishes one event per lifecycle step; front ends (CLI
//! progress output, a future status endpoint) subscribe through [`EventBus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Batch annotation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnnotationEvent {
    /// Task moved to Running
    TaskStarted {
        task_id: String,
        model_id: String,
        total_images: usize,
        timestamp: DateTime<Utc>,
    },

    /// Dual recognition of one image started
    ImageStarted {
        task_id: String,
        filename: String,
        /// 0-based index within this run
        index: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Both recognitions finished and the annotation record was saved
    ImageCompleted {
        task_id: String,
        filename: String,
        has_difference: bool,
        difference_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Image could not be annotated; the batch continues
    ImageFailed {
        task_id: String,
        filename: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Task reached a terminal state
    TaskFinished {
        task_id: String,
        /// Terminal status name ("completed", "failed", "cancelled")
        status: String,
        success_count: usize,
        failure_count: usize,
        difference_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl AnnotationEvent {
    /// Task id carried by every event variant
    pub fn task_id(&self) -> &str {
        match self {
            Self::TaskStarted { task_id, .. }
            | Self::ImageStarted { task_id, .. }
            | Self::ImageCompleted { task_id, .. }
            | Self::ImageFailed { task_id, .. }
            | Self::TaskFinished { task_id, .. } => task_id,
        }
    }
}

/// Fan-out of [`AnnotationEvent`]s to any number of listeners
///
/// Clones share one channel. A listener that falls more than the buffer
/// size behind skips the oldest events (`RecvError::Lagged`).
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnnotationEvent>,
}

impl EventBus {
    /// `buffer` events are kept for slow listeners
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self { tx }
    }

    /// Listen from now on; earlier events are not replayed
    pub fn subscribe(&self) -> broadcast::Receiver<AnnotationEvent> {
        self.tx.subscribe()
    }

    /// Publish to every listener, returning how many there were
    ///
    /// Fails when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AnnotationEvent,
    ) -> Result<usize, broadcast::error::SendError<AnnotationEvent>> {
        self.tx.send(event)
    }

    /// Publish, dropping the event when nobody is listening
    pub fn emit_lossy(&self, event: AnnotationEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event listeners");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
