//! Batch annotation driver
//!
//! Runs dual recognition over every image of a task, one image at a time:
//! 1. Read the image, first recognition → `firstDone`
//! 2. Pause, second recognition → `secondDone`
//! 3. Compare, select the provisional label, save the annotation record
//!
//! A failing image is recorded on the task and the batch moves on. Task
//! store failures are fatal and leave the task Failed. Cancellation (the
//! token, or the task record marked Cancelled by another process) is checked
//! between images; the token is also raced against model calls and pauses.
//! Images already saved stay valid.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tarot_common::config::AnnotationConfig;
use tarot_common::events::{AnnotationEvent, EventBus};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::images::{list_images, select_images};
use crate::error::{ModelError, WorkflowError, WorkflowResult};
use crate::models::{
    AnnotationRecord, AnnotationTask, ImageProgressUpdate, RecognitionResult, TaskStatus,
    TaskSummary, TaskUpdate,
};
use crate::services::{parse_recognition, ImageInput, VisionModel, RECOGNITION_PROMPT};
use crate::store::{LabelStore, TaskStore};
use crate::utils::{call_with_retry, RetryPolicy};

/// Batch run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Images skipped from the start of the sorted folder listing
    pub start: usize,
    pub skip_existing: bool,
    /// Pause between images
    pub image_delay: Duration,
    /// Pause between the two recognitions of one image
    pub dual_delay: Duration,
    pub retry: RetryPolicy,
    pub prompt: String,
}

impl BatchOptions {
    pub fn from_config(config: &AnnotationConfig) -> Self {
        Self {
            start: 0,
            skip_existing: config.skip_existing,
            image_delay: Duration::from_millis(config.image_delay_ms),
            dual_delay: Duration::from_millis(config.dual_delay_ms),
            retry: RetryPolicy::new(config.max_retries),
            prompt: RECOGNITION_PROMPT.to_string(),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&AnnotationConfig::default())
    }
}

/// Final counters of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub task_id: String,
    pub status: TaskStatus,
    pub summary: TaskSummary,
}

enum ImageOutcome {
    Annotated(AnnotationRecord),
    Failed(String),
    Cancelled,
}

pub struct BatchAnnotator {
    model: Arc<dyn VisionModel>,
    tasks: TaskStore,
    labels: LabelStore,
    images_dir: PathBuf,
    events: EventBus,
    options: BatchOptions,
}

impl BatchAnnotator {
    pub fn new(
        model: Arc<dyn VisionModel>,
        tasks: TaskStore,
        labels: LabelStore,
        images_dir: impl Into<PathBuf>,
        events: EventBus,
        options: BatchOptions,
    ) -> Self {
        Self {
            model,
            tasks,
            labels,
            images_dir: images_dir.into(),
            events,
            options,
        }
    }

    /// Create a task for the images still to annotate
    ///
    /// Refused while another task is Pending or Running. The check and the
    /// creation are separate store calls, so two concurrent callers can both
    /// pass the check.
    pub fn start_batch(&self) -> WorkflowResult<AnnotationTask> {
        if self.tasks.has_running_task()? {
            return Err(WorkflowError::TaskAlreadyRunning);
        }

        let images = select_images(
            list_images(&self.images_dir)?,
            self.options.start,
            self.options.skip_existing,
            &self.labels,
        )?;
        Ok(self.tasks.create_task(self.model.model_id(), &images)?)
    }

    /// Drive a task to a terminal state
    ///
    /// Images whose progress entry is already complete are not redone.
    pub async fn run(
        &self,
        task_id: &str,
        cancel: CancellationToken,
    ) -> WorkflowResult<BatchOutcome> {
        match self.drive(task_id, &cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let message = err.to_string();
                error!(task_id, "Annotation task aborted: {}", message);
                if let Err(e) = self.tasks.complete_task(task_id, false, Some(message.as_str())) {
                    warn!(task_id, "Could not record task failure: {}", e);
                }
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> WorkflowResult<BatchOutcome> {
        let task = self
            .tasks
            .update_task_progress(
                task_id,
                TaskUpdate {
                    status: Some(TaskStatus::Running),
                    process_id: Some(std::process::id()),
                    ..TaskUpdate::default()
                },
            )?
            .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))?;

        let work: Vec<String> = task
            .progress
            .iter()
            .filter(|p| !p.is_processed())
            .map(|p| p.filename.clone())
            .collect();

        info!(
            task_id,
            model_id = %task.model_id,
            images = work.len(),
            "Annotation task started"
        );
        self.events.emit_lossy(AnnotationEvent::TaskStarted {
            task_id: task_id.to_string(),
            model_id: task.model_id.clone(),
            total_images: work.len(),
            timestamp: Utc::now(),
        });

        let mut summary = task.summary;
        let mut errors = task.errors;
        let mut cancelled = false;

        for (index, filename) in work.iter().enumerate() {
            if cancel.is_cancelled() || self.cancelled_externally(task_id)? {
                cancelled = true;
                break;
            }

            self.events.emit_lossy(AnnotationEvent::ImageStarted {
                task_id: task_id.to_string(),
                filename: filename.clone(),
                index,
                total: work.len(),
                timestamp: Utc::now(),
            });

            match self.annotate_image(task_id, &task.model_id, filename, cancel).await? {
                ImageOutcome::Annotated(record) => {
                    summary.success_count += 1;
                    if record.has_difference {
                        summary.difference_count += 1;
                    }
                    self.tasks.update_task_progress(
                        task_id,
                        TaskUpdate {
                            summary: Some(summary),
                            ..TaskUpdate::default()
                        },
                    )?;

                    info!(
                        task_id,
                        "[{}/{}] {}: {} cards, {} difference(s)",
                        index + 1,
                        work.len(),
                        filename,
                        record.final_label.total_cards,
                        record.differences.len()
                    );
                    self.events.emit_lossy(AnnotationEvent::ImageCompleted {
                        task_id: task_id.to_string(),
                        filename: filename.clone(),
                        has_difference: record.has_difference,
                        difference_count: record.differences.len(),
                        timestamp: Utc::now(),
                    });
                }
                ImageOutcome::Failed(message) => {
                    error!(task_id, filename = %filename, "Image annotation failed: {}", message);
                    summary.failure_count += 1;
                    errors.push(format!("{}: {}", filename, message));
                    self.tasks.update_task_progress(
                        task_id,
                        TaskUpdate {
                            summary: Some(summary),
                            errors: Some(errors.clone()),
                            ..TaskUpdate::default()
                        },
                    )?;
                    self.tasks.update_image_progress(
                        task_id,
                        filename,
                        ImageProgressUpdate::error(message.clone()),
                    )?;
                    self.events.emit_lossy(AnnotationEvent::ImageFailed {
                        task_id: task_id.to_string(),
                        filename: filename.clone(),
                        error: message,
                        timestamp: Utc::now(),
                    });
                }
                ImageOutcome::Cancelled => {
                    cancelled = true;
                    break;
                }
            }

            if index + 1 < work.len() && !pause(self.options.image_delay, cancel).await {
                cancelled = true;
                break;
            }
        }

        let finished = if cancelled {
            self.tasks.cancel_task(task_id)?
        } else {
            self.tasks.complete_task(task_id, summary.failure_count == 0, None)?
        }
        .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))?;

        self.events.emit_lossy(AnnotationEvent::TaskFinished {
            task_id: task_id.to_string(),
            status: finished.status.as_str().to_string(),
            success_count: finished.summary.success_count,
            failure_count: finished.summary.failure_count,
            difference_count: finished.summary.difference_count,
            timestamp: Utc::now(),
        });

        Ok(BatchOutcome {
            task_id: task_id.to_string(),
            status: finished.status,
            summary: finished.summary,
        })
    }

    async fn annotate_image(
        &self,
        task_id: &str,
        model_id: &str,
        filename: &str,
        cancel: &CancellationToken,
    ) -> WorkflowResult<ImageOutcome> {
        self.tasks
            .update_task_progress(task_id, TaskUpdate::current_image(filename))?;

        let image = match ImageInput::load(&self.images_dir.join(filename)).await {
            Ok(image) => image,
            Err(e) => return Ok(ImageOutcome::Failed(format!("Failed to read image: {}", e))),
        };

        let first = match self.recognize(&image, cancel).await {
            Some(Ok(result)) => result,
            Some(Err(e)) => return Ok(ImageOutcome::Failed(e.to_string())),
            None => return Ok(ImageOutcome::Cancelled),
        };
        self.tasks
            .update_image_progress(task_id, filename, ImageProgressUpdate::first_done())?;

        if !pause(self.options.dual_delay, cancel).await {
            return Ok(ImageOutcome::Cancelled);
        }

        let second = match self.recognize(&image, cancel).await {
            Some(Ok(result)) => result,
            Some(Err(e)) => return Ok(ImageOutcome::Failed(e.to_string())),
            None => return Ok(ImageOutcome::Cancelled),
        };
        self.tasks
            .update_image_progress(task_id, filename, ImageProgressUpdate::second_done())?;

        let record =
            AnnotationRecord::from_recognitions(filename, model_id, first, second, Utc::now());
        if record.has_difference {
            self.tasks.update_image_progress(
                task_id,
                filename,
                ImageProgressUpdate::has_difference(true),
            )?;
        }

        if let Err(e) = self.labels.save_annotation(&record) {
            return Ok(ImageOutcome::Failed(format!("Failed to save annotation: {}", e)));
        }
        Ok(ImageOutcome::Annotated(record))
    }

    /// The task record was marked Cancelled by another process
    fn cancelled_externally(&self, task_id: &str) -> WorkflowResult<bool> {
        let status = self.tasks.load_task(task_id)?.map(|t| t.status);
        if status == Some(TaskStatus::Cancelled) {
            info!(task_id, "Task was cancelled externally");
            return Ok(true);
        }
        Ok(false)
    }

    /// One recognition call; `None` when cancelled first
    async fn recognize(
        &self,
        image: &ImageInput,
        cancel: &CancellationToken,
    ) -> Option<Result<RecognitionResult, ModelError>> {
        let call = call_with_retry(
            self.model.as_ref(),
            image,
            &self.options.prompt,
            self.options.retry,
        );

        tokio::select! {
            _ = cancel.cancelled() => None,
            response = call => Some(response.map(|r| {
                parse_recognition(&r.text).with_timing(r.latency_ms, Utc::now())
            })),
        }
    }
}

/// Sleep unless cancelled; false when cancelled
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
