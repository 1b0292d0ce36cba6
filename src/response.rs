//! Field projection and typed step responses.
//!
//! The model is untrusted: its reply is first projected onto the envelope's
//! `fields`, then validated structurally, and only then decoded into the
//! step's typed response.
use crate::error::ProtocolError;
use crate::schema::Schema;
use crate::step::StepId;
use crate::validate::{validate, Violation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keep only the keys named in `fields`; values are left untouched.
pub fn enforce(raw: &Map<String, Value>, fields: &[String]) -> Map<String, Value> {
    raw.iter()
        .filter(|(key, _)| fields.iter().any(|field| field == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Keys of `raw` that projection onto `fields` would discard.
pub fn dropped_fields(raw: &Map<String, Value>, fields: &[String]) -> Vec<String> {
    raw.keys()
        .filter(|key| !fields.iter().any(|field| field == *key))
        .cloned()
        .collect()
}

/// Low/medium/high rating used for priorities and effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step1Response {
    pub brief_summary: String,
    pub assumption_gaps: Vec<String>,
    pub clarifying_questions: Vec<String>,
    pub defer_to_next_step_signal: bool,
    pub initial_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_horizon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_outcomes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAssessment {
    pub id: String,
    pub label: String,
    pub reason: String,
    pub priority: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step2Response {
    pub brief_summary: String,
    pub recommended_assessments: Vec<RecommendedAssessment>,
    pub clarifying_questions: Vec<String>,
    pub defer_to_next_step_signal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subassessment {
    pub name: String,
    pub why_it_matters: String,
    pub required_inputs: Vec<String>,
    pub effort: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step3Response {
    pub brief_summary: String,
    pub subassessments_by_assessment: BTreeMap<String, Vec<Subassessment>>,
    pub clarifying_questions: Vec<String>,
    pub defer_to_next_step_signal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDoctorResponse {
    pub reframed_prompt: String,
    pub missing_elements: Vec<String>,
    pub confirm_question: String,
}

/// A validated reply, typed by step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepResponse {
    Clarify(Step1Response),
    AssessmentToggle(Step2Response),
    Subassessments(Step3Response),
    PromptDoctor(PromptDoctorResponse),
}

impl StepResponse {
    pub fn step(&self) -> StepId {
        match self {
            Self::Clarify(_) => StepId::Clarify,
            Self::AssessmentToggle(_) => StepId::AssessmentToggle,
            Self::Subassessments(_) => StepId::Subassessments,
            Self::PromptDoctor(_) => StepId::PromptDoctor,
        }
    }

    /// Whether the model signalled that the workflow may advance.
    pub fn defer_to_next_step(&self) -> bool {
        match self {
            Self::Clarify(response) => response.defer_to_next_step_signal,
            Self::AssessmentToggle(response) => response.defer_to_next_step_signal,
            Self::Subassessments(response) => response.defer_to_next_step_signal,
            Self::PromptDoctor(_) => false,
        }
    }
}

/// Outcome of checking one projected reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Checked {
    Valid(StepResponse),
    Invalid(Violation),
}

/// Validate a projected reply and decode it into the step's typed response.
pub fn check(schema: &Schema, filtered: &Map<String, Value>) -> Checked {
    if let Err(violation) = validate(schema, filtered) {
        return Checked::Invalid(violation);
    }
    match decode(schema.step, filtered) {
        Ok(response) => Checked::Valid(response),
        Err(err) => Checked::Invalid(Violation {
            path: "$".to_string(),
            message: err.to_string(),
        }),
    }
}

fn decode(step: StepId, filtered: &Map<String, Value>) -> Result<StepResponse, ProtocolError> {
    let value = Value::Object(filtered.clone());
    let decoded = match step {
        StepId::Clarify => serde_json::from_value(value).map(StepResponse::Clarify),
        StepId::AssessmentToggle => {
            serde_json::from_value(value).map(StepResponse::AssessmentToggle)
        }
        StepId::Subassessments => serde_json::from_value(value).map(StepResponse::Subassessments),
        StepId::PromptDoctor => serde_json::from_value(value).map(StepResponse::PromptDoctor),
    };
    decoded.map_err(|err| ProtocolError::SchemaViolation {
        step,
        detail: err.to_string(),
    })
}
