//! Canonical assessment catalogue offered to the model in step 2.
use serde::{Deserialize, Serialize};

const EXTERNAL: &[&str] = &[
    "Market size & demand growth",
    "Competitive intensity",
    "Customer adoption/dependency",
    "Regulatory/contracting environment",
];

const INTERNAL: &[&str] = &[
    "Profitability & cost structure",
    "Capabilities / Fit with core business",
    "Organizational readiness",
];

const OPTIONAL: &[&str] = &[
    "Bargaining leverage potential",
    "Strategic optionality",
    "Partnerships / Ecosystem / Brand / Talent",
];

/// Assessment labels grouped the way the workflow presents them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalCategories {
    #[serde(default)]
    pub external: Vec<String>,
    #[serde(default)]
    pub internal: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
}

impl CanonicalCategories {
    /// The built-in catalogue.
    pub fn standard() -> Self {
        fn owned(labels: &[&str]) -> Vec<String> {
            labels.iter().map(|label| label.to_string()).collect()
        }
        Self {
            external: owned(EXTERNAL),
            internal: owned(INTERNAL),
            optional: owned(OPTIONAL),
        }
    }
}

impl Default for CanonicalCategories {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalogue_has_ten_distinct_labels() {
        let catalogue = CanonicalCategories::standard();
        let labels: std::collections::BTreeSet<&String> = catalogue
            .external
            .iter()
            .chain(&catalogue.internal)
            .chain(&catalogue.optional)
            .collect();
        assert_eq!(labels.len(), 10);
        assert!(catalogue
            .external
            .contains(&"Competitive intensity".to_string()));
    }

    #[test]
    fn partial_catalogue_file_defaults_missing_groups() {
        let parsed: CanonicalCategories =
            serde_json::from_str(r#"{"external": ["Market size & demand growth"]}"#).unwrap();
        assert_eq!(parsed.external.len(), 1);
        assert!(parsed.internal.is_empty());
        assert!(parsed.optional.is_empty());
    }
}
