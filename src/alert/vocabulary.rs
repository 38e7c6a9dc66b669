//! Translation between the canonical risk scale and the vocabularies used
//! by other parts of the system.
//!
//! Prediction records use `none/low/moderate/high/critical`; the map legend
//! uses `low/moderate/high/severe/extreme`. Both collapse onto the
//! four-level canonical scale.

use crate::model::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    /// `low/moderate/high/extreme`.
    Canonical,
    /// `none/low/moderate/high/critical`.
    Prediction,
    /// `low/moderate/high/severe/extreme`.
    FiveBand,
}

impl Vocabulary {
    /// Label a consumer of this vocabulary expects for `level`.
    pub fn to_external(&self, level: RiskLevel) -> &'static str {
        match (self, level) {
            (Vocabulary::Prediction, RiskLevel::Extreme) => "critical",
            (_, level) => level.as_str(),
        }
    }

    /// Reads a label from this vocabulary. Case-insensitive.
    pub fn from_external(&self, label: &str) -> Option<RiskLevel> {
        let label = label.trim().to_ascii_lowercase();
        let level = match (self, label.as_str()) {
            (_, "low") => RiskLevel::Low,
            (_, "moderate") => RiskLevel::Moderate,
            (_, "high") => RiskLevel::High,
            (Vocabulary::Canonical | Vocabulary::FiveBand, "extreme") => RiskLevel::Extreme,
            (Vocabulary::Prediction, "none") => RiskLevel::Low,
            (Vocabulary::Prediction, "critical") => RiskLevel::Extreme,
            (Vocabulary::FiveBand, "severe") => RiskLevel::Extreme,
            _ => return None,
        };
        Some(level)
    }

    /// Every label this vocabulary can produce or accept.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Vocabulary::Canonical => &["low", "moderate", "high", "extreme"],
            Vocabulary::Prediction => &["none", "low", "moderate", "high", "critical"],
            Vocabulary::FiveBand => &["low", "moderate", "high", "severe", "extreme"],
        }
    }
}
