//! Detected disagreements between two recognitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of disagreement was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifferenceKind {
    /// Self-reported totals differ
    #[serde(rename = "cardCount")]
    CardCountMismatch,
    /// A position is present in only one recognition
    #[serde(rename = "position")]
    PositionMissing,
    /// Neither name channel agrees
    #[serde(rename = "cardName")]
    CardNameMismatch,
    /// Both orientations resolved and different
    #[serde(rename = "orientation")]
    OrientationMismatch,
    /// Confidence levels differ (informational)
    #[serde(rename = "confidence")]
    ConfidenceMismatch,
}

impl DifferenceKind {
    /// Severity attached to every difference of this kind
    pub fn severity(self) -> Severity {
        match self {
            Self::CardCountMismatch | Self::PositionMissing | Self::CardNameMismatch => {
                Severity::Critical
            }
            Self::OrientationMismatch => Severity::Major,
            Self::ConfidenceMismatch => Severity::Minor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

/// One disagreement, with the two raw values that were compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    #[serde(rename = "type")]
    pub kind: DifferenceKind,

    /// Absent only for card count mismatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,

    pub severity: Severity,

    pub description: String,

    pub first: Value,

    pub second: Value,
}

impl Difference {
    /// Build a difference whose severity follows from its kind
    pub fn new(
        kind: DifferenceKind,
        position: Option<u32>,
        description: impl Into<String>,
        first: Value,
        second: Value,
    ) -> Self {
        Self {
            kind,
            position,
            severity: kind.severity(),
            description: description.into(),
            first,
            second,
        }
    }
}

/// Difference counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferenceStats {
    #[serde(rename = "criticalCount")]
    pub critical: usize,
    #[serde(rename = "majorCount")]
    pub major: usize,
    #[serde(rename = "minorCount")]
    pub minor: usize,
}

impl DifferenceStats {
    pub fn from_differences(differences: &[Difference]) -> Self {
        let mut stats = Self::default();
        for difference in differences {
            match difference.severity {
                Severity::Critical => stats.critical += 1,
                Severity::Major => stats.major += 1,
                Severity::Minor => stats.minor += 1,
            }
        }
        stats
    }

    /// A reviewer must look at this image before the label is trusted
    pub fn requires_attention(&self) -> bool {
        self.critical > 0
    }

    pub fn total(&self) -> usize {
        self.critical + self.major + self.minor
    }
}
