//! Record persistence
//!
//! Tasks, annotation records and corrected labels are JSON documents in
//! three sibling namespaces of a [`RecordStore`].

pub mod labels;
pub mod record_store;
pub mod tasks;

use std::sync::Arc;
use tarot_common::config::DataLayout;

pub use labels::{label_key, LabelStore, ReconcileReport, ReviewItem, ReviewQueue, ReviewState};
pub use record_store::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use tasks::{task_max_age, TaskStore};

/// File-backed stores for a data folder
pub fn open_stores(layout: &DataLayout) -> (TaskStore, LabelStore) {
    let tasks = TaskStore::new(Arc::new(FileRecordStore::new(layout.tasks_dir())));
    let labels = LabelStore::new(
        Arc::new(FileRecordStore::new(layout.labels_dir())),
        Arc::new(FileRecordStore::new(layout.corrections_dir())),
    );
    (tasks, labels)
}
