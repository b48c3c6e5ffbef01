//! Comparator and Selector Tests
//! Test File: comparison_tests.rs

mod helpers;

use chrono::Utc;
use helpers::{card, local_card, recognition, recognition_with_total};
use std::collections::BTreeSet;
use tarot_vision::models::Confidence::{High, Low, Medium};
use tarot_vision::models::Orientation::{Reversed, Unknown, Upright};
use tarot_vision::models::{
    AnnotationRecord, AnnotationStatus, CardPosition, DifferenceKind, LabelOrientation,
    LabelSource, RecognitionResult, RecognitionSlot, Severity,
};
use tarot_vision::services::{compare_recognitions, select_final_label};

fn detected(
    first: &RecognitionResult,
    second: &RecognitionResult,
) -> BTreeSet<(DifferenceKind, Option<u32>)> {
    compare_recognitions(first, second)
        .differences
        .iter()
        .map(|d| (d.kind, d.position))
        .collect()
}

/// A messy pair exercising every difference kind
fn messy_pair() -> (RecognitionResult, RecognitionResult) {
    let first = recognition_with_total(
        vec![
            card(1, "The Fool", Upright, High),
            card(2, "The Star", Upright, High),
            card(3, "The Moon", Unknown, Medium),
            card(4, "The Sun", Upright, High),
        ],
        5,
    );
    let second = recognition(vec![
        card(3, "the  moon", Reversed, Low),
        card(1, "The Fool", Reversed, High),
        card(2, "The Tower", Upright, High),
    ]);
    (first, second)
}

/// TC-CMP-001: Comparison is deterministic
#[test]
fn tc_cmp_001_deterministic() {
    let (first, second) = messy_pair();

    let a = compare_recognitions(&first, &second);
    let b = compare_recognitions(&first, &second);

    assert_eq!(a, b);
    assert!(a.has_difference);
}

/// TC-CMP-002: Swapping arguments detects the same disagreements
#[test]
fn tc_cmp_002_symmetric_detection() {
    let (first, second) = messy_pair();

    let forward = detected(&first, &second);
    let backward = detected(&second, &first);

    assert_eq!(forward, backward);
    assert_eq!(
        forward,
        BTreeSet::from([
            (DifferenceKind::CardCountMismatch, None),
            (DifferenceKind::OrientationMismatch, Some(1)),
            (DifferenceKind::CardNameMismatch, Some(2)),
            (DifferenceKind::ConfidenceMismatch, Some(3)),
            (DifferenceKind::PositionMissing, Some(4)),
        ])
    );
}

/// TC-CMP-003: Swapping arguments can change the selection
#[test]
fn tc_cmp_003_asymmetric_selection() {
    let first = recognition(vec![card(1, "The Fool", Upright, High)]);
    let second = recognition(vec![card(1, "The Sun", Upright, High)]);
    let differences = compare_recognitions(&first, &second).differences;

    // Tie in high-confidence counts: the first argument always wins
    let forward = select_final_label(&first, &second, &differences);
    let backward = select_final_label(&second, &first, &differences);

    assert_eq!(forward.source, RecognitionSlot::First);
    assert_eq!(backward.source, RecognitionSlot::First);
    assert_ne!(forward.cards, backward.cards);
}

/// TC-CMP-004: Identical recognitions agree and the first is selected
#[test]
fn tc_cmp_004_no_difference_round_trip() {
    let cards = vec![
        card(1, "The Fool", Upright, High),
        local_card(2, "星星", Reversed, Low),
    ];
    let first = recognition(cards.clone());
    let second = recognition(cards);

    let comparison = compare_recognitions(&first, &second);
    assert!(!comparison.has_difference);
    assert!(comparison.differences.is_empty());

    let selection = select_final_label(&first, &second, &comparison.differences);
    assert_eq!(selection.source, RecognitionSlot::First);
    assert_eq!(selection.cards.len(), 2);
    assert_eq!(selection.cards[1].name_local, "星星");
    assert_eq!(selection.cards[1].orientation, LabelOrientation::Reversed);
}

/// TC-CMP-005: Count mismatch is independent of position checks
#[test]
fn tc_cmp_005_count_mismatch_independent() {
    // Given: equal reported totals but one card short on the first side
    let first = recognition_with_total(
        vec![card(1, "The Fool", Upright, High), card(2, "The Star", Upright, High)],
        3,
    );
    let second = recognition_with_total(
        vec![
            card(1, "The Fool", Upright, High),
            card(2, "The Star", Upright, High),
            card(3, "The Moon", Upright, High),
        ],
        3,
    );

    // Then: no count mismatch, but position 3 is missing from the first
    let comparison = compare_recognitions(&first, &second);
    assert_eq!(comparison.differences.len(), 1);
    assert_eq!(comparison.differences[0].kind, DifferenceKind::PositionMissing);
    assert_eq!(comparison.differences[0].position, Some(3));

    // Given: the same cards with unequal totals
    let first = recognition_with_total(first.cards, 2);

    // Then: both differences are reported, count first
    let comparison = compare_recognitions(&first, &second);
    let kinds: Vec<_> = comparison.differences.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DifferenceKind::CardCountMismatch, DifferenceKind::PositionMissing]
    );
    assert_eq!(comparison.differences[0].position, None);
    assert_eq!(comparison.differences[0].first, serde_json::json!(2));
    assert_eq!(comparison.differences[0].second, serde_json::json!(3));
}

/// TC-CMP-006: Either name channel is enough to match
#[test]
fn tc_cmp_006_name_match_or_channel() {
    // One channel populated on each side, different channels: no match
    let first = recognition(vec![local_card(1, "愚者", Upright, High)]);
    let second = recognition(vec![card(1, "The Fool", Upright, High)]);

    let comparison = compare_recognitions(&first, &second);
    assert_eq!(comparison.differences.len(), 1);
    assert_eq!(comparison.differences[0].kind, DifferenceKind::CardNameMismatch);
    assert_eq!(comparison.differences[0].severity, Severity::Critical);

    // Same canonical name, differing or missing local names: match
    let with_local = CardPosition {
        name_local: Some("愚人".to_string()),
        ..card(1, "The Fool", Upright, High)
    };
    let other_local = CardPosition {
        name_local: Some("愚者".to_string()),
        ..card(1, "  the FOOL ", Upright, High)
    };
    let plain = card(1, "The Fool", Upright, High);

    let with_local = recognition(vec![with_local]);
    assert!(!compare_recognitions(&with_local, &recognition(vec![other_local])).has_difference);
    assert!(!compare_recognitions(&with_local, &recognition(vec![plain])).has_difference);
}

/// TC-CMP-007: Empty names never match each other
#[test]
fn tc_cmp_007_unidentified_cards_mismatch() {
    let blank = CardPosition {
        name_local: Some("  ".to_string()),
        name_canonical: None,
        ..card(1, "", Upright, High)
    };
    let first = recognition(vec![blank.clone()]);
    let second = recognition(vec![blank]);

    let comparison = compare_recognitions(&first, &second);
    assert_eq!(comparison.differences.len(), 1);
    assert_eq!(comparison.differences[0].kind, DifferenceKind::CardNameMismatch);
}

/// TC-CMP-008: Positions are matched by field, not array index
#[test]
fn tc_cmp_008_keyed_by_position_field() {
    let first = recognition(vec![
        card(1, "The Fool", Upright, High),
        card(2, "The Star", Upright, High),
    ]);
    let second = recognition(vec![
        card(2, "The Star", Upright, High),
        card(1, "The Fool", Upright, High),
    ]);

    assert!(!compare_recognitions(&first, &second).has_difference);
}

/// TC-CMP-009: Empty recognitions
#[test]
fn tc_cmp_009_empty_inputs() {
    let empty = recognition(vec![]);
    let one = recognition(vec![card(1, "The Fool", Upright, High)]);

    assert!(!compare_recognitions(&empty, &empty).has_difference);

    let comparison = compare_recognitions(&empty, &one);
    let kinds: Vec<_> = comparison.differences.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DifferenceKind::CardCountMismatch, DifferenceKind::PositionMissing]
    );

    let selection = select_final_label(&empty, &empty, &[]);
    assert!(selection.cards.is_empty());
    assert_eq!(selection.source, RecognitionSlot::First);
}

/// TC-E2E-001: Orientation-only disagreement
#[test]
fn tc_e2e_001_orientation_disagreement() {
    let first = recognition(vec![card(1, "The Fool", Upright, High)]);
    let second = recognition(vec![card(1, "The Fool", Reversed, High)]);

    let comparison = compare_recognitions(&first, &second);
    assert!(comparison.has_difference);
    assert_eq!(comparison.differences.len(), 1);
    assert_eq!(comparison.differences[0].kind, DifferenceKind::OrientationMismatch);
    assert_eq!(comparison.differences[0].severity, Severity::Major);

    let selection = select_final_label(&first, &second, &comparison.differences);
    assert_eq!(selection.source, RecognitionSlot::First);
    assert_eq!(selection.cards[0].orientation, LabelOrientation::Upright);
}

/// TC-E2E-002: Count mismatch with a missing third position
#[test]
fn tc_e2e_002_count_and_position() {
    let first = recognition(vec![
        card(1, "The Fool", Upright, High),
        card(2, "The Star", Upright, High),
    ]);
    let second = recognition(vec![
        card(1, "The Fool", Upright, High),
        card(2, "The Star", Upright, High),
        card(3, "The Moon", Upright, High),
    ]);

    let comparison = compare_recognitions(&first, &second);
    assert_eq!(comparison.differences.len(), 2);
    assert_eq!(comparison.differences[0].kind, DifferenceKind::CardCountMismatch);
    assert_eq!(comparison.differences[1].kind, DifferenceKind::PositionMissing);
    assert_eq!(comparison.differences[1].position, Some(3));
    assert!(comparison.differences[1].description.contains("first"));
    assert!(comparison.differences[1].first.is_null());

    // Second has more high-confidence cards, so it becomes the provisional label
    let selection = select_final_label(&first, &second, &comparison.differences);
    assert_eq!(selection.source, RecognitionSlot::Second);
    assert_eq!(selection.cards.len(), 3);
}

/// TC-REC-001: Annotation record derives status from differences
#[test]
fn tc_rec_001_record_status() {
    let agree = AnnotationRecord::from_recognitions(
        "a.jpg",
        "model-x",
        recognition(vec![card(1, "The Fool", Unknown, High)]),
        recognition(vec![card(1, "The Fool", Reversed, High)]),
        Utc::now(),
    );
    assert_eq!(agree.status, AnnotationStatus::Annotated);
    assert_eq!(agree.final_label.source, LabelSource::First);
    assert_eq!(agree.final_label.total_cards, 1);
    assert_eq!(agree.final_label.cards[0].orientation, LabelOrientation::Upright);

    // Confidence-only disagreement still flags a conflict
    let minor = AnnotationRecord::from_recognitions(
        "b.jpg",
        "model-x",
        recognition(vec![card(1, "The Fool", Upright, High)]),
        recognition(vec![card(1, "The Fool", Upright, Low)]),
        Utc::now(),
    );
    assert_eq!(minor.status, AnnotationStatus::Conflict);
    assert!(minor.has_difference);
}

/// TC-REC-002: Reconcile is idempotent and keeps verified status
#[test]
fn tc_rec_002_reconcile() {
    let mut record = AnnotationRecord::from_recognitions(
        "a.jpg",
        "model-x",
        recognition(vec![card(1, "The Fool", Upright, High)]),
        recognition(vec![card(1, "The Sun", Upright, High)]),
        Utc::now(),
    );
    assert!(!record.reconcile());

    // Stale stored differences are recomputed
    record.differences.clear();
    record.has_difference = false;
    record.status = AnnotationStatus::Annotated;
    assert!(record.reconcile());
    assert_eq!(record.status, AnnotationStatus::Conflict);
    assert!(!record.reconcile());

    record.status = AnnotationStatus::Verified;
    assert!(!record.reconcile());
    assert_eq!(record.status, AnnotationStatus::Verified);
}
