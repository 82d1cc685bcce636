//! Core domain types for extracted rosters.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Schema labels
// ---------------------------------------------------------------------------

/// Label preceding the person's name in a detail panel.
pub const LABEL_NAME: &str = "Name";
/// Label preceding the team.
pub const LABEL_TEAM: &str = "Team";
/// Label preceding the region.
pub const LABEL_REGION: &str = "Region";
/// Label preceding the center of excellence.
pub const LABEL_CENTER_OF_EXCELLENCE: &str = "Center of Excellence";
/// Label preceding the investment strategy.
pub const LABEL_INVESTMENT_STRATEGY: &str = "Investment Strategy";

/// The fixed label vocabulary of a detail panel, in display order.
pub const SCHEMA_LABELS: [&str; 5] = [
    LABEL_NAME,
    LABEL_TEAM,
    LABEL_REGION,
    LABEL_CENTER_OF_EXCELLENCE,
    LABEL_INVESTMENT_STRATEGY,
];

/// Returns `true` if `text` is exactly one of the reserved schema labels.
pub fn is_schema_label(text: &str) -> bool {
    SCHEMA_LABELS.contains(&text)
}

// ---------------------------------------------------------------------------
// PersonRecord
// ---------------------------------------------------------------------------

/// One person extracted from a detail panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    /// Display name. A record without a name is never emitted.
    pub name: String,
    pub team: String,
    pub region: String,
    pub center_of_excellence: String,
    pub investment_strategy: String,
    /// Free-text biography; empty when the panel had none.
    #[serde(default)]
    pub description: String,
}

impl PersonRecord {
    /// A record is valid once it carries a non-empty name.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// First `max_chars` characters of the description, for log lines.
    pub fn description_preview(&self, max_chars: usize) -> String {
        self.description.chars().take(max_chars).collect()
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one scrape run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> PersonRecord {
        PersonRecord {
            name: "Alice Moreau".into(),
            team: "Alpha".into(),
            region: "EMEA".into(),
            center_of_excellence: "Digital".into(),
            investment_strategy: "Growth Equity".into(),
            description: "Operator and advisor.".into(),
        }
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(alice()).expect("serialize");
        let keys: Vec<&str> = json
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert!(keys.contains(&"centerOfExcellence"));
        assert!(keys.contains(&"investmentStrategy"));
        assert!(keys.contains(&"description"));
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn record_validity_requires_name() {
        assert!(alice().is_valid());

        let nameless = PersonRecord {
            name: "   ".into(),
            ..alice()
        };
        assert!(!nameless.is_valid());
        assert!(!PersonRecord::default().is_valid());
    }

    #[test]
    fn description_preview_is_char_safe() {
        let record = PersonRecord {
            description: "Zürich-based investor".into(),
            ..alice()
        };
        assert_eq!(record.description_preview(6), "Zürich");
    }

    #[test]
    fn schema_label_matching_is_exact() {
        assert!(is_schema_label("Center of Excellence"));
        assert!(!is_schema_label("Team "));
        assert!(!is_schema_label("team"));
    }

    #[test]
    fn run_id_is_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
