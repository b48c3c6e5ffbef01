//! Recognition and store fixtures

use std::sync::Arc;
use tarot_vision::models::{CardPosition, Confidence, Orientation, RecognitionResult};
use tarot_vision::store::{LabelStore, MemoryRecordStore, TaskStore};

/// Card identified by its canonical name only
pub fn card(
    position: u32,
    canonical: &str,
    orientation: Orientation,
    confidence: Confidence,
) -> CardPosition {
    CardPosition {
        position,
        name_local: None,
        name_canonical: Some(canonical.to_string()),
        orientation,
        confidence,
        analysis: None,
    }
}

/// Card identified by its local name only
pub fn local_card(
    position: u32,
    local: &str,
    orientation: Orientation,
    confidence: Confidence,
) -> CardPosition {
    CardPosition {
        position,
        name_local: Some(local.to_string()),
        name_canonical: None,
        orientation,
        confidence,
        analysis: None,
    }
}

/// Recognition whose reported total equals its card count
pub fn recognition(cards: Vec<CardPosition>) -> RecognitionResult {
    let total = cards.len() as u32;
    recognition_with_total(cards, total)
}

pub fn recognition_with_total(cards: Vec<CardPosition>, total_cards: u32) -> RecognitionResult {
    let mut result = RecognitionResult::empty("fixture");
    result.cards = cards;
    result.total_cards = total_cards;
    result
}

/// In-memory task and label stores, plus the raw task backend
pub fn memory_stores() -> (Arc<MemoryRecordStore>, TaskStore, LabelStore) {
    let task_records = Arc::new(MemoryRecordStore::new());
    let tasks = TaskStore::new(task_records.clone());
    let labels = LabelStore::new(
        Arc::new(MemoryRecordStore::new()),
        Arc::new(MemoryRecordStore::new()),
    );
    (task_records, tasks, labels)
}
