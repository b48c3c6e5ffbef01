//! Annotation task store
//!
//! One record per task id, keyed `<task id>.json`. Every mutating operation
//! is a read-modify-write of that record. Unknown task ids come back as
//! `Ok(None)`; storage failures propagate.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tarot_common::{Error, Result};
use tracing::{debug, info, warn};

use super::record_store::{get_json, put_json, validate_key, RecordStore};
use crate::models::{AnnotationTask, ImageProgressUpdate, TaskStatus, TaskUpdate};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Cleanup age for a retention of `days`, saturating for huge values
pub const fn task_max_age(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
}

#[derive(Clone)]
pub struct TaskStore {
    records: Arc<dyn RecordStore>,
}

impl TaskStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Create a pending task with one untouched progress entry per image
    pub fn create_task(&self, model_id: &str, images: &[String]) -> Result<AnnotationTask> {
        let task = AnnotationTask::new(model_id, images);
        put_json(self.records.as_ref(), &task_key(&task.task_id), &task)?;

        info!(
            task_id = %task.task_id,
            model_id,
            total_images = task.total_images,
            "Created annotation task"
        );
        Ok(task)
    }

    /// Load a task; a malformed record is logged and treated as absent
    pub fn load_task(&self, task_id: &str) -> Result<Option<AnnotationTask>> {
        let key = task_key(task_id);
        if validate_key(&key).is_err() {
            return Ok(None);
        }

        match get_json::<AnnotationTask>(self.records.as_ref(), &key) {
            Ok(task) => Ok(task),
            Err(e @ Error::MalformedRecord { .. }) => {
                warn!(task_id, "Skipping task record: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Shallow-merge named fields into a task
    pub fn update_task_progress(
        &self,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Option<AnnotationTask>> {
        self.modify(task_id, |task| {
            update.apply(task);
            true
        })
    }

    /// Merge fields into one image's progress entry and recount processed
    /// images
    ///
    /// `None` when either the task or the filename is unknown.
    pub fn update_image_progress(
        &self,
        task_id: &str,
        filename: &str,
        update: ImageProgressUpdate,
    ) -> Result<Option<AnnotationTask>> {
        self.modify(task_id, |task| match task.image_mut(filename) {
            Some(progress) => {
                update.apply(progress);
                task.recount_processed();
                true
            }
            None => {
                debug!(task_id = %task.task_id, filename, "No progress entry for image");
                false
            }
        })
    }

    /// Mark a task Completed or Failed
    ///
    /// Stamps the end time and elapsed time, clears the current image and
    /// appends `error` to the error list.
    pub fn complete_task(
        &self,
        task_id: &str,
        success: bool,
        error: Option<&str>,
    ) -> Result<Option<AnnotationTask>> {
        let status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        let task = self.finish(task_id, status, error)?;

        if let Some(task) = &task {
            info!(
                task_id,
                status = status.as_str(),
                success_count = task.summary.success_count,
                failure_count = task.summary.failure_count,
                total_time_ms = task.summary.total_time,
                "Annotation task finished"
            );
        }
        Ok(task)
    }

    /// Mark a task Cancelled; progress already recorded is kept
    pub fn cancel_task(&self, task_id: &str) -> Result<Option<AnnotationTask>> {
        let task = self.finish(task_id, TaskStatus::Cancelled, None)?;
        if let Some(task) = &task {
            info!(
                task_id,
                processed_images = task.processed_images,
                total_images = task.total_images,
                "Annotation task cancelled"
            );
        }
        Ok(task)
    }

    /// Record the OS process driving a task
    pub fn set_process_id(&self, task_id: &str, process_id: u32) -> Result<Option<AnnotationTask>> {
        self.update_task_progress(
            task_id,
            TaskUpdate {
                process_id: Some(process_id),
                ..TaskUpdate::default()
            },
        )
    }

    /// All readable tasks, newest first
    pub fn list_tasks(&self) -> Result<Vec<AnnotationTask>> {
        let mut tasks = Vec::new();
        for key in self.records.keys()? {
            let Some(task_id) = key.strip_suffix(".json") else {
                continue;
            };
            if let Some(task) = self.load_task(task_id)? {
                tasks.push(task);
            }
        }

        tasks.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(tasks)
    }

    /// True when any task is Pending or Running
    ///
    /// This is a cooperative gate, not a lock: two callers that both check
    /// before either creates its task will both see `false` and both start.
    pub fn has_running_task(&self) -> Result<bool> {
        Ok(self.list_tasks()?.iter().any(|t| t.status.is_active()))
    }

    /// Delete task records last written more than `max_age` ago
    pub fn clean_old_tasks(&self, max_age: Duration) -> Result<usize> {
        self.clean_old_tasks_at(max_age, SystemTime::now())
    }

    /// [`Self::clean_old_tasks`] against an explicit clock
    pub fn clean_old_tasks_at(&self, max_age: Duration, now: SystemTime) -> Result<usize> {
        let mut deleted = 0;
        for key in self.records.keys()? {
            let Some(modified) = self.records.modified_at(&key)? else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age && self.records.delete(&key)? {
                debug!(key = %key, age_secs = age.as_secs(), "Deleted old task record");
                deleted += 1;
            }
        }

        if deleted > 0 {
            info!("Cleaned {} old annotation task(s)", deleted);
        }
        Ok(deleted)
    }

    /// Delete a finished task
    ///
    /// `Ok(false)` for unknown ids; Pending and Running tasks are refused.
    pub fn delete_task(&self, task_id: &str) -> Result<bool> {
        let Some(task) = self.load_task(task_id)? else {
            return Ok(false);
        };
        if task.status.is_active() {
            return Err(Error::InvalidInput(format!(
                "Task {} is {} and cannot be deleted",
                task_id,
                task.status.as_str()
            )));
        }

        let deleted = self.records.delete(&task_key(task_id))?;
        if deleted {
            info!(task_id, "Deleted annotation task");
        }
        Ok(deleted)
    }

    fn finish(
        &self,
        task_id: &str,
        status: TaskStatus,
        error: Option<&str>,
    ) -> Result<Option<AnnotationTask>> {
        self.modify(task_id, |task| {
            task.status = status;
            task.current_image = None;
            if let Some(error) = error {
                task.errors.push(error.to_string());
            }
            task.stamp_end(Utc::now());
            true
        })
    }

    /// Read-modify-write; `change` returns false to abandon the write
    fn modify<F>(&self, task_id: &str, change: F) -> Result<Option<AnnotationTask>>
    where
        F: FnOnce(&mut AnnotationTask) -> bool,
    {
        let Some(mut task) = self.load_task(task_id)? else {
            return Ok(None);
        };
        if !change(&mut task) {
            return Ok(None);
        }
        put_json(self.records.as_ref(), &task_key(task_id), &task)?;
        Ok(Some(task))
    }
}

fn task_key(task_id: &str) -> String {
    format!("{}.json", task_id)
}
