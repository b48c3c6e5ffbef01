//! Card-level types shared by recognitions, labels and corrections
//!
//! Field names follow the stored JSON documents (`cardNameCn` holds the
//! local-language name, `cardNameEn` the canonical English name) so existing
//! label files load unchanged.

use serde::{Deserialize, Serialize};

/// Card orientation as reported by a recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    Reversed,
    /// Model could not tell, or reported something unrecognized
    #[default]
    Unknown,
}

impl Orientation {
    /// Map a model keyword to an orientation; anything else is `Unknown`
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "upright" => Self::Upright,
            "reversed" => Self::Reversed,
            _ => Self::Unknown,
        }
    }

    /// True for Upright and Reversed
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Commit to one of the two label states
    ///
    /// `Unknown` becomes `Upright`. This is a lossy default: a persisted
    /// label cannot carry an unresolved orientation.
    pub fn to_label(self) -> LabelOrientation {
        match self {
            Self::Reversed => LabelOrientation::Reversed,
            Self::Upright | Self::Unknown => LabelOrientation::Upright,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upright => "upright",
            Self::Reversed => "reversed",
            Self::Unknown => "unknown",
        }
    }
}

/// Orientation of a persisted label (never unknown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrientation {
    Upright,
    Reversed,
}

impl From<LabelOrientation> for Orientation {
    fn from(value: LabelOrientation) -> Self {
        match value {
            LabelOrientation::Upright => Orientation::Upright,
            LabelOrientation::Reversed => Orientation::Reversed,
        }
    }
}

/// Model-reported confidence for one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Map a model keyword to a confidence level
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One recognized card at a position within a spread
///
/// `position` is 1-based. Both names absent means the model failed to
/// identify the card at that position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPosition {
    pub position: u32,

    #[serde(rename = "cardNameCn")]
    pub name_local: Option<String>,

    #[serde(rename = "cardNameEn")]
    pub name_canonical: Option<String>,

    #[serde(default)]
    pub orientation: Orientation,

    pub confidence: Confidence,

    /// Free-text reasoning the model gave for this card
    #[serde(
        rename = "analysisWhichCard",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis: Option<String>,
}

impl CardPosition {
    /// At least one name channel carries a non-blank value
    pub fn is_identified(&self) -> bool {
        has_text(&self.name_local) || has_text(&self.name_canonical)
    }

    /// Name for human-facing messages: local name first, then canonical
    pub fn display_name(&self) -> &str {
        self.name_local
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.name_canonical.as_deref().filter(|n| !n.trim().is_empty()))
            .unwrap_or("?")
    }

    /// Project into label form (drops confidence, resolves orientation)
    pub fn to_label(&self) -> CardLabel {
        CardLabel {
            position: self.position,
            name_local: self.name_local.clone().unwrap_or_default(),
            name_canonical: self.name_canonical.clone().unwrap_or_default(),
            orientation: self.orientation.to_label(),
        }
    }
}

/// One card of a persisted label (no confidence, resolved orientation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLabel {
    pub position: u32,

    #[serde(rename = "cardNameCn")]
    pub name_local: String,

    #[serde(rename = "cardNameEn")]
    pub name_canonical: String,

    pub orientation: LabelOrientation,
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(
        local: Option<&str>,
        canonical: Option<&str>,
        orientation: Orientation,
    ) -> CardPosition {
        CardPosition {
            position: 1,
            name_local: local.map(String::from),
            name_canonical: canonical.map(String::from),
            orientation,
            confidence: Confidence::High,
            analysis: None,
        }
    }

    #[test]
    fn test_unknown_orientation_projects_to_upright() {
        let label = card(Some("愚者"), None, Orientation::Unknown).to_label();
        assert_eq!(label.orientation, LabelOrientation::Upright);
        assert_eq!(label.name_local, "愚者");
        assert_eq!(label.name_canonical, "");
    }

    #[test]
    fn test_blank_names_are_unidentified() {
        assert!(!card(None, None, Orientation::Upright).is_identified());
        assert!(!card(Some("  "), Some(""), Orientation::Upright).is_identified());
        assert!(card(None, Some("The Fool"), Orientation::Upright).is_identified());
    }

    #[test]
    fn test_display_name_prefers_local() {
        assert_eq!(card(Some("愚者"), Some("The Fool"), Orientation::Upright).display_name(), "愚者");
        assert_eq!(
            card(Some(""), Some("The Fool"), Orientation::Upright).display_name(),
            "The Fool"
        );
        assert_eq!(card(None, None, Orientation::Upright).display_name(), "?");
    }

    #[test]
    fn test_stored_field_names() {
        let reversed = card(Some("愚者"), Some("The Fool"), Orientation::Reversed);
        let json = serde_json::to_value(reversed).unwrap();
        assert_eq!(json["cardNameCn"], "愚者");
        assert_eq!(json["cardNameEn"], "The Fool");
        assert_eq!(json["orientation"], "reversed");
        assert_eq!(json["confidence"], "high");
        assert!(json.get("analysisWhichCard").is_none());
    }

    #[test]
    fn test_keywords() {
        assert_eq!(Orientation::from_keyword(" Reversed "), Orientation::Reversed);
        assert_eq!(Orientation::from_keyword("sideways"), Orientation::Unknown);
        assert_eq!(Confidence::from_keyword("HIGH"), Some(Confidence::High));
        assert_eq!(Confidence::from_keyword("certain"), None);
    }
}
