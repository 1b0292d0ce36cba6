//! Request envelopes sent to the completion model.
//!
//! Each workflow step has one pure builder. The envelope's `fields` list is
//! the projection contract: whatever the model returns, callers only ever see
//! keys named there.
use crate::canonical::CanonicalCategories;
use crate::error::ProtocolError;
use crate::step::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single directive a corrective retry carries in `constraints.do`.
pub const CORRECTIVE_DIRECTIVE: &str =
    "Return JSON that exactly matches the step schema and the 'fields' keys only.";

/// Speaker of a prior conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn, passed through to the model verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Advisory behavior directives for the model. Not enforced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub max_chars: u32,
    #[serde(rename = "do", default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<String>,
    #[serde(rename = "dont", default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<String>,
}

impl Constraints {
    fn new(style: &str, max_chars: u32, must: &[&str], must_not: &[&str]) -> Self {
        Self {
            style: Some(style.to_string()),
            max_chars,
            must: strings(must),
            must_not: strings(must_not),
        }
    }
}

/// Presentation hints for selection-style steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiHints {
    pub selection_mode: String,
    pub return_ids_instead_of_labels: bool,
}

/// Structured request payload for one workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<Value>,
    pub step: StepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<ChatTurn>,
    pub constraints: Constraints,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<CanonicalCategories>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_hints: Option<UiHints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_assessments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_prompt: Option<String>,
    /// Sampling temperature for the first attempt; the configured default
    /// applies when unset. Never sent to the model.
    #[serde(skip)]
    pub temperature: Option<f32>,
}

impl Envelope {
    fn base(step: StepId, constraints: Constraints, fields: &[&str]) -> Self {
        Self {
            project_context: None,
            step,
            user_input: None,
            conversation_history: Vec::new(),
            constraints,
            fields: strings(fields),
            canonical: None,
            ui_hints: None,
            selected_assessments: None,
            raw_prompt: None,
            temperature: None,
        }
    }

    /// Parse an envelope supplied as JSON (for example from a file).
    pub fn from_json(value: Value) -> Result<Self, ProtocolError> {
        let step = value
            .get("step")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidEnvelope("missing `step`".to_string()))?;
        step.parse::<StepId>()?;
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|err| ProtocolError::InvalidEnvelope(err.to_string()))?;
        envelope.check()?;
        Ok(envelope)
    }

    /// Enforce the non-empty `fields` invariant.
    pub fn check(&self) -> Result<(), ProtocolError> {
        if self.fields.iter().all(|field| field.trim().is_empty()) {
            return Err(ProtocolError::InvalidEnvelope(format!(
                "{} envelope declares no fields",
                self.step
            )));
        }
        Ok(())
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Step 1: clarify the strategic situation, optionally over several rounds.
pub fn step1_clarify(
    project_context: Value,
    user_input: impl Into<String>,
    conversation_history: Vec<ChatTurn>,
) -> Envelope {
    let constraints = Constraints::new(
        "comprehensive-summary",
        1000,
        &[
            "provide a well-written, comprehensive summary of the strategic situation",
            "ask up to 3 targeted clarifying questions ONLY about Step 1 fields: focus_area, purpose, industry, geography, time_horizon, decision_outcomes",
            "focus decision_outcomes on clear statements of decisions that will be supported by the analysis",
            "end with guidance for user clarification if questions are asked",
        ],
        &[
            "no recommendations",
            "no assessment suggestions yet",
            "no questions about analysis methods or assessment types",
            "no questions about Step 2 or Step 3 topics",
        ],
    );
    let mut envelope = Envelope::base(
        StepId::Clarify,
        constraints,
        &[
            "brief_summary",
            "assumption_gaps",
            "clarifying_questions",
            "defer_to_next_step_signal",
            "initial_response",
            "focus_area",
            "purpose",
            "industry",
            "geography",
            "time_horizon",
            "decision_outcomes",
        ],
    );
    envelope.project_context = Some(project_context);
    envelope.user_input = Some(user_input.into());
    envelope.conversation_history = conversation_history;
    envelope
}

/// Step 2: recommend assessments from the canonical catalogue.
pub fn step2_assessment_toggle(
    project_context: Value,
    user_input: impl Into<String>,
    canonical: CanonicalCategories,
) -> Envelope {
    let constraints = Constraints::new("concise-bullets", 1200, &[], &["no subassessments yet"]);
    let mut envelope = Envelope::base(
        StepId::AssessmentToggle,
        constraints,
        &[
            "brief_summary",
            "recommended_assessments",
            "clarifying_questions",
            "defer_to_next_step_signal",
        ],
    );
    envelope.project_context = Some(project_context);
    envelope.user_input = Some(user_input.into());
    envelope.canonical = Some(canonical);
    envelope.ui_hints = Some(UiHints {
        selection_mode: "toggle".to_string(),
        return_ids_instead_of_labels: true,
    });
    envelope
}

/// Step 3: plan sub-assessments for the assessments the user kept.
pub fn step3_subassessments(
    project_context: Value,
    user_input: impl Into<String>,
    selected_assessments: Vec<String>,
) -> Envelope {
    let constraints = Constraints::new(
        "table-ish",
        1500,
        &["return short why + required_inputs + effort"],
        &[],
    );
    let mut envelope = Envelope::base(
        StepId::Subassessments,
        constraints,
        &[
            "brief_summary",
            "subassessments_by_assessment",
            "clarifying_questions",
            "defer_to_next_step_signal",
        ],
    );
    envelope.project_context = Some(project_context);
    envelope.user_input = Some(user_input.into());
    envelope.selected_assessments = Some(selected_assessments);
    envelope
}

/// Reframe a raw prompt and ask one confirming question.
pub fn prompt_doctor(raw_prompt: impl Into<String>) -> Envelope {
    let constraints = Constraints::new("tight-paragraph", 500, &[], &[]);
    let mut envelope = Envelope::base(
        StepId::PromptDoctor,
        constraints,
        &["reframed_prompt", "missing_elements", "confirm_question"],
    );
    envelope.raw_prompt = Some(raw_prompt.into());
    envelope
}

/// Copy of `original` whose `constraints.do` demands exact conformance.
pub fn corrective_envelope(original: &Envelope) -> Envelope {
    let mut corrected = original.clone();
    corrected.constraints.must = vec![CORRECTIVE_DIRECTIVE.to_string()];
    corrected
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
