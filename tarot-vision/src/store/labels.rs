//! Annotation and correction label store
//!
//! Machine annotation records and human-reviewed labels live in two sibling
//! namespaces under the same key, derived from the image filename. A
//! correction never overwrites the machine record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tarot_common::{Error, Result};
use tracing::{info, warn};

use super::record_store::{get_json, put_json, RecordStore};
use crate::models::{AnnotationRecord, CorrectedLabel, DifferenceStats};

/// Extensions replaced by `.json` when deriving a label key
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Label key for an image: `IMG_01.JPG` → `IMG_01.json`
///
/// Other extensions are kept and `.json` is appended.
pub fn label_key(filename: &str) -> String {
    if let Some((stem, extension)) = filename.rsplit_once('.') {
        if !stem.is_empty()
            && IMAGE_EXTENSIONS
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension))
        {
            return format!("{}.json", stem);
        }
    }
    format!("{}.json", filename)
}

/// Review state of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    Pending,
    Reviewed,
}

/// One entry of the review queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub filename: String,
    pub status: ReviewState,
    pub has_difference: bool,
    pub difference_count: usize,
    /// A Critical difference is present
    pub requires_attention: bool,
    pub timestamp: DateTime<Utc>,
    pub total_cards: usize,
}

/// Review queue summary, ordered by label key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueue {
    pub total_images: usize,
    pub reviewed_images: usize,
    pub pending_images: usize,
    pub images: Vec<ReviewItem>,
}

/// Counts from [`LabelStore::reconcile_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub examined: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct LabelStore {
    annotations: Arc<dyn RecordStore>,
    corrections: Arc<dyn RecordStore>,
}

impl LabelStore {
    pub fn new(annotations: Arc<dyn RecordStore>, corrections: Arc<dyn RecordStore>) -> Self {
        Self {
            annotations,
            corrections,
        }
    }

    pub fn save_annotation(&self, record: &AnnotationRecord) -> Result<()> {
        let key = label_key(&record.filename);
        put_json(self.annotations.as_ref(), &key, record)?;
        info!(
            filename = %record.filename,
            status = ?record.status,
            differences = record.differences.len(),
            "Saved annotation record"
        );
        Ok(())
    }

    pub fn load_annotation(&self, filename: &str) -> Result<Option<AnnotationRecord>> {
        get_json(self.annotations.as_ref(), &label_key(filename))
    }

    pub fn has_annotation(&self, filename: &str) -> Result<bool> {
        Ok(self.annotations.get(&label_key(filename))?.is_some())
    }

    /// Store a reviewed label; refused when no machine record exists for it
    pub fn save_correction(&self, label: &CorrectedLabel) -> Result<()> {
        let key = label_key(&label.filename);
        if self.annotations.get(&key)?.is_none() {
            return Err(Error::NotFound(format!(
                "No annotation record for {}",
                label.filename
            )));
        }

        put_json(self.corrections.as_ref(), &key, label)?;
        info!(
            filename = %label.filename,
            cards = label.corrected_label.total_cards,
            reviewed_by = %label.review_info.reviewed_by,
            "Saved corrected label"
        );
        Ok(())
    }

    pub fn load_correction(&self, filename: &str) -> Result<Option<CorrectedLabel>> {
        get_json(self.corrections.as_ref(), &label_key(filename))
    }

    /// Every annotated image with its review state
    ///
    /// Unreadable annotation records are logged and left out.
    pub fn review_list(&self) -> Result<ReviewQueue> {
        let reviewed_keys = self.corrections.keys()?;
        let mut queue = ReviewQueue::default();

        for key in self.annotations.keys()? {
            let record: AnnotationRecord = match get_json(self.annotations.as_ref(), &key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e @ Error::MalformedRecord { .. }) => {
                    warn!("Skipping annotation record: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let status = if reviewed_keys.binary_search(&key).is_ok() {
                queue.reviewed_images += 1;
                ReviewState::Reviewed
            } else {
                ReviewState::Pending
            };

            queue.images.push(ReviewItem {
                status,
                has_difference: record.has_difference,
                difference_count: record.differences.len(),
                requires_attention: DifferenceStats::from_differences(&record.differences)
                    .requires_attention(),
                timestamp: record.timestamp,
                total_cards: record.final_label.total_cards,
                filename: record.filename,
            });
        }

        queue.total_images = queue.images.len();
        queue.pending_images = queue.total_images - queue.reviewed_images;
        Ok(queue)
    }

    /// First pending image after `filename` in queue order
    ///
    /// When `filename` is not in the queue, the first pending image.
    pub fn next_pending_after(&self, filename: &str) -> Result<Option<String>> {
        let queue = self.review_list()?;
        let start = queue
            .images
            .iter()
            .position(|item| item.filename == filename)
            .map(|index| index + 1)
            .unwrap_or(0);

        Ok(queue.images[start..]
            .iter()
            .find(|item| item.status == ReviewState::Pending)
            .map(|item| item.filename.clone()))
    }

    /// Recompute differences, provisional label and status of every stored
    /// annotation record
    ///
    /// Only records that change are rewritten, so a second run updates
    /// nothing.
    pub fn reconcile_all(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for key in self.annotations.keys()? {
            let mut record: AnnotationRecord = match get_json(self.annotations.as_ref(), &key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e @ Error::MalformedRecord { .. }) => {
                    warn!("Skipping annotation record: {}", e);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            report.examined += 1;
            if record.reconcile() {
                put_json(self.annotations.as_ref(), &key, &record)?;
                report.updated += 1;
            }
        }

        info!(
            examined = report.examined,
            updated = report.updated,
            skipped = report.skipped,
            "Reconciled annotation records"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_key() {
        assert_eq!(label_key("IMG_0001.JPG"), "IMG_0001.json");
        assert_eq!(label_key("spread.webp"), "spread.json");
        assert_eq!(label_key("photo.jpeg"), "photo.json");
        assert_eq!(label_key("notes.txt"), "notes.txt.json");
        assert_eq!(label_key(".jpg"), ".jpg.json");
        assert_eq!(label_key("noext"), "noext.json");
    }
}
