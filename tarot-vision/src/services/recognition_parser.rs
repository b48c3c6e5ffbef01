//! Recognition parser
//!
//! Turns raw vision-model output into a [`RecognitionResult`]. Never fails:
//! malformed output degrades to a best-effort or empty recognition and the
//! rationale records what happened.
//!
//! # Algorithm
//! 1. Find a JSON object (inside a ```json fence, else the outermost `{...}`)
//! 2. Map its `cards` array (or a legacy single-card object) into cards
//! 3. Otherwise scan the text for `牌名: local / canonical` lines, inferring
//!    orientation from nearby keywords, with Low confidence
//! 4. Otherwise return an empty recognition

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{CardPosition, Confidence, Orientation, RecognitionResult};

/// Rationale recorded for results recovered by the text fallback
pub const FALLBACK_RATIONALE: &str = "Parsed from text fallback";

/// Rationale recorded when nothing could be extracted
pub const EMPTY_RATIONALE: &str = "Failed to parse response";

/// Characters inspected on each side of a fallback match for orientation
const ORIENTATION_CONTEXT_CHARS: usize = 50;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid fenced JSON regex"));

static BARE_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid bare JSON regex"));

/// `第1张: 牌名: 愚者 / The Fool`, `Card 2 - Name: 星星 / The Star`,
/// `牌名：恋人/The Lovers`
static CARD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:第|(?i:card|position|#))?\s*(\d+)\s*[张:：.)\-]?\s*)?(?:牌名|(?i:card\s+name|name))\s*[：:]\s*(.+?)\s*[/\\]\s*(.+?)\s*(?:\n|$)",
    )
    .expect("valid card line regex")
});

/// Parse raw model output into a recognition
pub fn parse_recognition(response: &str) -> RecognitionResult {
    let mut result = parse_json(response)
        .or_else(|| parse_text_fallback(response))
        .unwrap_or_else(|| RecognitionResult::empty(EMPTY_RATIONALE));

    debug!(
        cards = result.cards.len(),
        total_cards = result.total_cards,
        rationale = %result.rationale,
        "Parsed recognition response"
    );

    result.raw_response = Some(response.to_string());
    result
}

fn parse_json(response: &str) -> Option<RecognitionResult> {
    let candidate = FENCED_JSON
        .captures(response)
        .and_then(|c| c.get(1))
        .or_else(|| BARE_JSON.find(response))?
        .as_str();

    let parsed: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            debug!("Recognition JSON did not parse, trying text fallback: {}", e);
            return None;
        }
    };
    let object = parsed.as_object()?;

    let rationale = object
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(cards) = object.get("cards").and_then(Value::as_array) {
        let cards: Vec<CardPosition> = cards
            .iter()
            .enumerate()
            .map(|(index, card)| card_from_json(card, index))
            .collect();

        let total_cards = object
            .get("totalCards")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(cards.len() as u32);

        return Some(RecognitionResult {
            cards,
            total_cards,
            rationale,
            raw_response: None,
            response_time_ms: None,
            timestamp: None,
        });
    }

    // Legacy single-card format
    if text_field(object, "cardNameCn").is_some() || text_field(object, "cardNameEn").is_some() {
        let card = card_from_object(object, 1);
        return Some(RecognitionResult {
            cards: vec![card],
            total_cards: 1,
            rationale,
            raw_response: None,
            response_time_ms: None,
            timestamp: None,
        });
    }

    None
}

fn card_from_json(card: &Value, index: usize) -> CardPosition {
    let default_position = (index + 1) as u32;
    match card.as_object() {
        Some(object) => {
            let position = object
                .get("position")
                .and_then(Value::as_u64)
                .filter(|p| *p >= 1)
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(default_position);
            card_from_object(object, position)
        }
        None => CardPosition {
            position: default_position,
            name_local: None,
            name_canonical: None,
            orientation: Orientation::Unknown,
            confidence: Confidence::Medium,
            analysis: None,
        },
    }
}

fn card_from_object(object: &Map<String, Value>, position: u32) -> CardPosition {
    CardPosition {
        position,
        name_local: text_field(object, "cardNameCn"),
        name_canonical: text_field(object, "cardNameEn"),
        orientation: object
            .get("orientation")
            .and_then(Value::as_str)
            .map(Orientation::from_keyword)
            .unwrap_or_default(),
        confidence: object
            .get("confidence")
            .and_then(Value::as_str)
            .and_then(Confidence::from_keyword)
            .unwrap_or(Confidence::Medium),
        analysis: text_field(object, "analysisWhichCard"),
    }
}

/// Non-blank string field, trimmed
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_text_fallback(response: &str) -> Option<RecognitionResult> {
    let mut cards = Vec::new();
    let mut next_position = 1u32;

    for captures in CARD_LINE.captures_iter(response) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let position = captures
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(next_position);

        let context =
            context_window(response, whole.start(), whole.end(), ORIENTATION_CONTEXT_CHARS);

        cards.push(CardPosition {
            position,
            name_local: captures.get(2).map(|m| m.as_str().trim().to_string()),
            name_canonical: captures.get(3).map(|m| m.as_str().trim().to_string()),
            orientation: orientation_from_text(context),
            confidence: Confidence::Low,
            analysis: None,
        });
        next_position += 1;
    }

    if cards.is_empty() {
        return None;
    }

    Some(RecognitionResult {
        total_cards: cards.len() as u32,
        cards,
        rationale: FALLBACK_RATIONALE.to_string(),
        raw_response: None,
        response_time_ms: None,
        timestamp: None,
    })
}

/// Reversed keywords win over upright ones
fn orientation_from_text(text: &str) -> Orientation {
    let lower = text.to_lowercase();
    if text.contains("逆位") || lower.contains("reversed") {
        Orientation::Reversed
    } else if text.contains("正位") || lower.contains("upright") {
        Orientation::Upright
    } else {
        Orientation::Unknown
    }
}

/// Slice of `text` extending `radius` characters around the byte range
fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    &text[from..to]
}
