//! Workflow step identifiers.
//!
//! Every envelope names exactly one step, and every step maps to exactly one
//! response schema in the registry.
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifies which workflow stage an envelope (and its schema) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepId {
    /// Clarify the strategic situation.
    #[serde(rename = "step_1_clarify")]
    Clarify,
    /// Recommend assessments from the canonical catalogue.
    #[serde(rename = "step_2_assessment_toggle")]
    AssessmentToggle,
    /// Plan sub-assessments for the selected assessments.
    #[serde(rename = "step_3_subassessments")]
    Subassessments,
    /// Reframe a raw prompt and list what it is missing.
    #[serde(rename = "prompt_doctor")]
    PromptDoctor,
}

impl StepId {
    pub const ALL: [StepId; 4] = [
        StepId::Clarify,
        StepId::AssessmentToggle,
        StepId::Subassessments,
        StepId::PromptDoctor,
    ];

    /// Wire name used in envelopes and schema lookups.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clarify => "step_1_clarify",
            Self::AssessmentToggle => "step_2_assessment_toggle",
            Self::Subassessments => "step_3_subassessments",
            Self::PromptDoctor => "prompt_doctor",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        StepId::ALL
            .into_iter()
            .find(|step| step.as_str() == trimmed)
            .ok_or_else(|| ProtocolError::UnknownStep(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for step in StepId::ALL {
            assert_eq!(step.as_str().parse::<StepId>().unwrap(), step);
            let json = serde_json::to_value(step).unwrap();
            assert_eq!(json, serde_json::Value::String(step.to_string()));
        }
    }

    #[test]
    fn unknown_step_name_is_rejected() {
        let err = "step_4_synthesis".parse::<StepId>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownStep(name) if name == "step_4_synthesis"));
    }
}
