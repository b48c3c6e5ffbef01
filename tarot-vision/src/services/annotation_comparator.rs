//! Annotation comparator
//!
//! Detects disagreements between two recognitions of the same image. Pure
//! and deterministic: the same pair always yields the same list, in the same
//! order (count first, then positions ascending).
//!
//! Per position the checks cascade. A missing card stops there; a name
//! mismatch makes orientation and confidence meaningless, so they are only
//! compared for the same card, and confidence only when orientation agrees.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::{CardPosition, Difference, DifferenceKind, RecognitionResult};

/// Outcome of comparing two recognitions
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Exactly `!differences.is_empty()`
    pub has_difference: bool,
    pub differences: Vec<Difference>,
}

/// Compare two recognitions of one image
pub fn compare_recognitions(first: &RecognitionResult, second: &RecognitionResult) -> Comparison {
    let mut differences = Vec::new();

    if first.total_cards != second.total_cards {
        differences.push(Difference::new(
            DifferenceKind::CardCountMismatch,
            None,
            format!(
                "Card count differs: first recognition reports {}, second reports {}",
                first.total_cards, second.total_cards
            ),
            json!(first.total_cards),
            json!(second.total_cards),
        ));
    }

    for (slot, result) in [("first", first), ("second", second)] {
        let duplicates = result.duplicate_positions();
        if !duplicates.is_empty() {
            warn!(
                "{} recognition reports duplicate positions {:?}; comparing the first card at each",
                slot, duplicates
            );
        }
    }

    let first_cards = first.position_map();
    let second_cards = second.position_map();
    let max_position = first.cards.len().max(second.cards.len()) as u32;

    for position in 1..=max_position {
        match (first_cards.get(&position), second_cards.get(&position)) {
            (Some(a), Some(b)) => compare_cards(position, a, b, &mut differences),
            (a, b) => {
                let missing_from = match (a, b) {
                    (None, None) => "both recognitions",
                    (None, _) => "the first recognition",
                    _ => "the second recognition",
                };
                differences.push(Difference::new(
                    DifferenceKind::PositionMissing,
                    Some(position),
                    format!("Position {} is missing from {}", position, missing_from),
                    card_value(a.copied()),
                    card_value(b.copied()),
                ));
            }
        }
    }

    debug!(
        differences = differences.len(),
        "Compared recognitions ({} vs {} cards)",
        first.cards.len(),
        second.cards.len()
    );

    Comparison {
        has_difference: !differences.is_empty(),
        differences,
    }
}

fn compare_cards(position: u32, a: &CardPosition, b: &CardPosition, out: &mut Vec<Difference>) {
    if !is_same_card(a, b) {
        out.push(Difference::new(
            DifferenceKind::CardNameMismatch,
            Some(position),
            format!(
                "Position {} card differs: \"{}\" vs \"{}\"",
                position,
                a.display_name(),
                b.display_name()
            ),
            json!({ "cardNameCn": a.name_local, "cardNameEn": a.name_canonical }),
            json!({ "cardNameCn": b.name_local, "cardNameEn": b.name_canonical }),
        ));
        return;
    }

    if a.orientation.is_resolved() && b.orientation.is_resolved() && a.orientation != b.orientation
    {
        out.push(Difference::new(
            DifferenceKind::OrientationMismatch,
            Some(position),
            format!(
                "Position {} orientation differs: {} vs {}",
                position,
                a.orientation.as_str(),
                b.orientation.as_str()
            ),
            json!(a.orientation),
            json!(b.orientation),
        ));
        return;
    }

    if a.confidence != b.confidence {
        out.push(Difference::new(
            DifferenceKind::ConfidenceMismatch,
            Some(position),
            format!(
                "Position {} confidence differs: {} vs {}",
                position,
                a.confidence.as_str(),
                b.confidence.as_str()
            ),
            json!(a.confidence),
            json!(b.confidence),
        ));
    }
}

/// Either name channel agrees, compared after [`normalize_name`], and is
/// non-empty
pub fn is_same_card(a: &CardPosition, b: &CardPosition) -> bool {
    channel_matches(a.name_local.as_deref(), b.name_local.as_deref())
        || channel_matches(a.name_canonical.as_deref(), b.name_canonical.as_deref())
}

fn channel_matches(a: Option<&str>, b: Option<&str>) -> bool {
    let a = normalize_name(a.unwrap_or_default());
    !a.is_empty() && a == normalize_name(b.unwrap_or_default())
}

/// Lowercase, trim and collapse internal whitespace runs to one space
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn card_value(card: Option<&CardPosition>) -> Value {
    card.and_then(|c| serde_json::to_value(c).ok())
        .unwrap_or(Value::Null)
}
