//! Batch annotation task state
//!
//! A task moves PENDING → RUNNING → COMPLETED | FAILED | CANCELLED. Each
//! image's progress entry is updated in place as its two recognitions
//! finish; `processed_images` is always recounted from those entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Batch task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, driver not yet started
    Pending,
    /// Driver is processing images
    Running,
    /// Every image was attempted
    Completed,
    /// Fatal error, or at least one image failed
    Failed,
    /// Stopped by an external signal
    Cancelled,
}

impl TaskStatus {
    /// Pending or Running; used by the single-batch gate
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Progress of one image within a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProgress {
    pub filename: String,
    pub first_done: bool,
    pub second_done: bool,
    pub has_difference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageProgress {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            first_done: false,
            second_done: false,
            has_difference: false,
            error: None,
        }
    }

    /// Both recognitions finished
    pub fn is_processed(&self) -> bool {
        self.first_done && self.second_done
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub success_count: usize,
    pub failure_count: usize,
    pub difference_count: usize,
    /// Elapsed time in milliseconds
    pub total_time: i64,
}

/// One batch run across many images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub model_id: String,
    pub total_images: usize,
    /// Derived from `progress`; see [`AnnotationTask::recount_processed`]
    pub processed_images: usize,
    pub current_image: Option<String>,
    pub progress: Vec<ImageProgress>,
    pub summary: TaskSummary,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub errors: Vec<String>,
    /// OS process driving the batch, if it runs out of process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
}

impl AnnotationTask {
    /// New pending task with one untouched progress entry per image
    pub fn new(model_id: impl Into<String>, images: &[String]) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            status: TaskStatus::Pending,
            model_id: model_id.into(),
            total_images: images.len(),
            processed_images: 0,
            current_image: None,
            progress: images.iter().map(ImageProgress::new).collect(),
            summary: TaskSummary::default(),
            start_time: Utc::now(),
            end_time: None,
            errors: Vec::new(),
            process_id: None,
        }
    }

    /// Recount processed images from the progress entries
    pub fn recount_processed(&mut self) -> usize {
        self.processed_images = self.progress.iter().filter(|p| p.is_processed()).count();
        self.processed_images
    }

    /// Progress entry for `filename` (linear scan)
    pub fn image_mut(&mut self, filename: &str) -> Option<&mut ImageProgress> {
        self.progress.iter_mut().find(|p| p.filename == filename)
    }

    /// Percentage of processed images (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        if self.total_images == 0 {
            0.0
        } else {
            (self.processed_images as f64 / self.total_images as f64) * 100.0
        }
    }

    /// Stamp the end time and elapsed milliseconds
    pub fn stamp_end(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
        self.summary.total_time = (end_time - self.start_time).num_milliseconds();
    }
}

/// Shallow update of named task fields; `None` leaves a field untouched
///
/// `processed_images` and `progress` are deliberately absent: they change
/// only through per-image updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    /// `Some(None)` clears the current image pointer
    pub current_image: Option<Option<String>>,
    pub summary: Option<TaskSummary>,
    pub errors: Option<Vec<String>>,
    pub process_id: Option<u32>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn current_image(filename: impl Into<String>) -> Self {
        Self {
            current_image: Some(Some(filename.into())),
            ..Self::default()
        }
    }

    pub fn apply(self, task: &mut AnnotationTask) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(current_image) = self.current_image {
            task.current_image = current_image;
        }
        if let Some(summary) = self.summary {
            task.summary = summary;
        }
        if let Some(errors) = self.errors {
            task.errors = errors;
        }
        if let Some(process_id) = self.process_id {
            task.process_id = Some(process_id);
        }
    }
}

/// Shallow update of one image's progress entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageProgressUpdate {
    pub first_done: Option<bool>,
    pub second_done: Option<bool>,
    pub has_difference: Option<bool>,
    /// `Some(None)` clears a previous error
    pub error: Option<Option<String>>,
}

impl ImageProgressUpdate {
    pub fn first_done() -> Self {
        Self {
            first_done: Some(true),
            ..Self::default()
        }
    }

    pub fn second_done() -> Self {
        Self {
            second_done: Some(true),
            ..Self::default()
        }
    }

    pub fn has_difference(value: bool) -> Self {
        Self {
            has_difference: Some(value),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(Some(message.into())),
            ..Self::default()
        }
    }

    pub fn apply(self, progress: &mut ImageProgress) {
        if let Some(value) = self.first_done {
            progress.first_done = value;
        }
        if let Some(value) = self.second_done {
            progress.second_done = value;
        }
        if let Some(value) = self.has_difference {
            progress.has_difference = value;
        }
        if let Some(error) = self.error {
            progress.error = error;
        }
    }
}
