//! Final-label selector
//!
//! Picks the provisional label for an image from its two recognitions.
//! Agreement and ties resolve to the first recognition; the second wins only
//! with strictly more high-confidence cards.

use tracing::debug;

use crate::models::{CardLabel, Difference, RecognitionResult, RecognitionSlot};

/// Chosen label cards and the recognition they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub cards: Vec<CardLabel>,
    pub source: RecognitionSlot,
}

/// Select the provisional label
///
/// Cards keep detection order. Unknown orientations become Upright.
pub fn select_final_label(
    first: &RecognitionResult,
    second: &RecognitionResult,
    differences: &[Difference],
) -> Selection {
    let source = if differences.is_empty() {
        RecognitionSlot::First
    } else {
        let first_high = first.high_confidence_count();
        let second_high = second.high_confidence_count();
        debug!(first_high, second_high, "Selecting label by high-confidence count");

        if second_high > first_high {
            RecognitionSlot::Second
        } else {
            RecognitionSlot::First
        }
    };

    let chosen = match source {
        RecognitionSlot::First => first,
        RecognitionSlot::Second => second,
    };

    Selection {
        cards: chosen.cards.iter().map(|c| c.to_label()).collect(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardPosition, Confidence, DifferenceKind, LabelOrientation, Orientation};
    use serde_json::json;

    fn recognition(name: &str, confidences: &[Confidence]) -> RecognitionResult {
        let mut result = RecognitionResult::empty("");
        result.cards = confidences
            .iter()
            .enumerate()
            .map(|(i, confidence)| CardPosition {
                position: i as u32 + 1,
                name_local: None,
                name_canonical: Some(name.to_string()),
                orientation: Orientation::Unknown,
                confidence: *confidence,
                analysis: None,
            })
            .collect();
        result.total_cards = result.cards.len() as u32;
        result
    }

    fn some_difference() -> Vec<Difference> {
        vec![Difference::new(DifferenceKind::CardCountMismatch, None, "count", json!(1), json!(2))]
    }

    #[test]
    fn test_no_differences_prefers_first_even_if_second_is_more_confident() {
        let first = recognition("The Fool", &[Confidence::Low]);
        let second = recognition("The Fool", &[Confidence::High]);

        let selection = select_final_label(&first, &second, &[]);
        assert_eq!(selection.source, RecognitionSlot::First);
        assert_eq!(selection.cards[0].orientation, LabelOrientation::Upright);
    }

    #[test]
    fn test_second_wins_only_when_strictly_more_confident() {
        let first = recognition("The Fool", &[Confidence::High, Confidence::Low]);
        let tied = recognition("The Sun", &[Confidence::Low, Confidence::High]);
        let better = recognition("The Moon", &[Confidence::High, Confidence::High]);

        assert_eq!(
            select_final_label(&first, &tied, &some_difference()).source,
            RecognitionSlot::First
        );

        let selection = select_final_label(&first, &better, &some_difference());
        assert_eq!(selection.source, RecognitionSlot::Second);
        assert_eq!(selection.cards[0].name_canonical, "The Moon");
        assert_eq!(selection.cards[0].name_local, "");
    }
}
