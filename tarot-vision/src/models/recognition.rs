//! One recognition attempt of a photo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::card::{CardPosition, Confidence};

/// Full result of one recognition call
///
/// `cards` keeps detection order. `total_cards` is what the model reported
/// and may disagree with `cards.len()`; that disagreement is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub cards: Vec<CardPosition>,

    pub total_cards: u32,

    /// Model's free-text rationale, or a parser note
    #[serde(rename = "reason", default)]
    pub rationale: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// Call latency in milliseconds
    #[serde(rename = "responseTime", default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RecognitionResult {
    /// Zero-card recognition; a valid result, not an error
    pub fn empty(rationale: impl Into<String>) -> Self {
        Self {
            cards: Vec::new(),
            total_cards: 0,
            rationale: rationale.into(),
            raw_response: None,
            response_time_ms: None,
            timestamp: None,
        }
    }

    /// Attach call metadata once the recognition call has returned
    pub fn with_timing(mut self, response_time_ms: u64, timestamp: DateTime<Utc>) -> Self {
        self.response_time_ms = Some(response_time_ms);
        self.timestamp = Some(timestamp);
        self
    }

    /// Number of cards the model marked as high confidence
    pub fn high_confidence_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| c.confidence == Confidence::High)
            .count()
    }

    /// First card carrying `position`, if any
    pub fn card_at(&self, position: u32) -> Option<&CardPosition> {
        self.cards.iter().find(|c| c.position == position)
    }

    /// Cards keyed by their `position` field
    ///
    /// Duplicated positions keep the first card in detection order; see
    /// [`Self::duplicate_positions`].
    pub fn position_map(&self) -> BTreeMap<u32, &CardPosition> {
        let mut map = BTreeMap::new();
        for card in &self.cards {
            map.entry(card.position).or_insert(card);
        }
        map
    }

    /// Positions reported more than once (a data-quality defect)
    pub fn duplicate_positions(&self) -> Vec<u32> {
        let mut seen = BTreeMap::new();
        for card in &self.cards {
            *seen.entry(card.position).or_insert(0usize) += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(position, _)| position)
            .collect()
    }
}
