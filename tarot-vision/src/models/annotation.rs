//! Persisted machine annotation for one image

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::CardLabel;
use super::difference::Difference;
use super::recognition::RecognitionResult;
use crate::services::{compare_recognitions, select_final_label};

/// Which recognition a label or card came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionSlot {
    First,
    Second,
}

/// Origin of a label or of a corrected card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    First,
    Second,
    Manual,
}

impl From<RecognitionSlot> for LabelSource {
    fn from(slot: RecognitionSlot) -> Self {
        match slot {
            RecognitionSlot::First => LabelSource::First,
            RecognitionSlot::Second => LabelSource::Second,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    /// Both recognitions agree
    Annotated,
    /// A human confirmed the label
    Verified,
    /// The recognitions disagree somewhere
    Conflict,
}

impl AnnotationStatus {
    /// Status implied by the comparison outcome
    pub fn derived(has_difference: bool) -> Self {
        if has_difference {
            Self::Conflict
        } else {
            Self::Annotated
        }
    }
}

/// Provisional label picked by the selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalLabel {
    pub cards: Vec<CardLabel>,
    pub total_cards: usize,
    pub source: LabelSource,
}

/// Outcome of dual recognition for one image
///
/// Never rewritten by human review: corrections are stored separately
/// under the same key so the machine disagreement trail stays intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub model_id: String,
    pub first_annotation: RecognitionResult,
    pub second_annotation: RecognitionResult,
    pub has_difference: bool,
    pub differences: Vec<Difference>,
    pub final_label: FinalLabel,
    pub status: AnnotationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AnnotationRecord {
    /// Compare the two recognitions, pick the provisional label and derive
    /// the record status
    pub fn from_recognitions(
        filename: impl Into<String>,
        model_id: impl Into<String>,
        first: RecognitionResult,
        second: RecognitionResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let comparison = compare_recognitions(&first, &second);
        let selection = select_final_label(&first, &second, &comparison.differences);

        Self {
            filename: filename.into(),
            timestamp,
            model_id: model_id.into(),
            first_annotation: first,
            second_annotation: second,
            has_difference: comparison.has_difference,
            differences: comparison.differences,
            final_label: FinalLabel {
                total_cards: selection.cards.len(),
                cards: selection.cards,
                source: selection.source.into(),
            },
            status: AnnotationStatus::derived(comparison.has_difference),
            notes: None,
        }
    }

    /// Recompute differences, provisional label and status from the stored
    /// recognitions
    ///
    /// A Verified status and a manually authored final label are kept.
    /// Returns true if anything changed.
    pub fn reconcile(&mut self) -> bool {
        let comparison = compare_recognitions(&self.first_annotation, &self.second_annotation);
        let mut changed = false;

        if comparison.differences != self.differences
            || comparison.has_difference != self.has_difference
        {
            self.differences = comparison.differences;
            self.has_difference = comparison.has_difference;
            changed = true;
        }

        if self.final_label.source != LabelSource::Manual {
            let selection = select_final_label(
                &self.first_annotation,
                &self.second_annotation,
                &self.differences,
            );
            let label = FinalLabel {
                total_cards: selection.cards.len(),
                cards: selection.cards,
                source: selection.source.into(),
            };
            if label != self.final_label {
                self.final_label = label;
                changed = true;
            }
        }

        if self.status != AnnotationStatus::Verified {
            let status = AnnotationStatus::derived(self.has_difference);
            if status != self.status {
                self.status = status;
                changed = true;
            }
        }

        changed
    }
}
