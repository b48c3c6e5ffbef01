//! Human-reviewed label for one image

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::annotation::{AnnotationRecord, LabelSource};
use super::card::{CardLabel, LabelOrientation};
use super::difference::Difference;
use super::recognition::RecognitionResult;

/// Format version written into every corrected label
pub const CORRECTION_FORMAT_VERSION: &str = "1.0";

/// One card of a reviewed label
///
/// `edited` is true when a reviewer changed the card after pulling it from a
/// recognition, and always true for manually authored cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedCard {
    pub position: u32,

    #[serde(rename = "cardNameCn")]
    pub name_local: String,

    #[serde(rename = "cardNameEn")]
    pub name_canonical: String,

    pub orientation: LabelOrientation,

    pub source: LabelSource,

    pub edited: bool,
}

impl CorrectedCard {
    /// Label form of this card
    pub fn to_label(&self) -> CardLabel {
        CardLabel {
            position: self.position,
            name_local: self.name_local.clone(),
            name_canonical: self.name_canonical.clone(),
            orientation: self.orientation,
        }
    }
}

/// The machine record as it stood when the review was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalAnnotation {
    pub first_annotation: RecognitionResult,
    pub second_annotation: RecognitionResult,
    pub has_difference: bool,
    pub differences: Vec<Difference>,
}

impl From<&AnnotationRecord> for OriginalAnnotation {
    fn from(record: &AnnotationRecord) -> Self {
        Self {
            first_annotation: record.first_annotation.clone(),
            second_annotation: record.second_annotation.clone(),
            has_difference: record.has_difference,
            differences: record.differences.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedCards {
    pub cards: Vec<CorrectedCard>,
    /// Always the number of reviewed cards, never a recognition's total
    pub total_cards: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Verified,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInfo {
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Authoritative reviewed label, stored beside the machine record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedLabel {
    pub filename: String,
    pub original_annotation: OriginalAnnotation,
    pub corrected_label: CorrectedCards,
    pub review_info: ReviewInfo,
    pub version: String,
}
