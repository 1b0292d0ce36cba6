//! Step orchestration with a single corrective retry.
//!
//! ```text
//! Requested -> FirstAttempt -> Accepted
//!                           -> RetryRequested -> Accepted
//!                                             -> Failed
//! ```
//!
//! The first attempt runs at the envelope's temperature (or the configured
//! default). A reply that fails validation after projection triggers exactly
//! one corrective attempt at temperature 0 with a narrowed `do` list. Transport
//! and parse failures are never retried.
use crate::client::{CompletionClient, CompletionProvider, OpenAiProvider};
use crate::config::ProtocolConfig;
use crate::envelope::{corrective_envelope, Envelope};
use crate::error::ProtocolError;
use crate::response::{check, dropped_fields, enforce, Checked, StepResponse};
use crate::schema::{Schema, SchemaRegistry};
use crate::validate::Violation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Temperature of the corrective attempt.
pub const RETRY_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Initial,
    Corrective,
}

impl std::fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Corrective => write!(f, "corrective"),
        }
    }
}

/// Record of one completion call and how its reply fared.
#[derive(Debug, Clone)]
pub struct StepAttempt {
    pub kind: AttemptKind,
    pub envelope: Envelope,
    pub temperature: f32,
    pub duration: Duration,
    pub raw_text: String,
    /// Reply keys discarded by field projection.
    pub dropped_fields: Vec<String>,
    /// `None` when the projected reply was accepted.
    pub violation: Option<Violation>,
}

/// Accepted result of a step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub response: StepResponse,
    /// Projected reply, restricted to the envelope's fields.
    pub filtered: Map<String, Value>,
    pub attempts: Vec<StepAttempt>,
}

impl StepOutcome {
    pub fn retried(&self) -> bool {
        self.attempts.len() > 1
    }
}

struct Attempt {
    record: StepAttempt,
    filtered: Map<String, Value>,
    checked: Checked,
}

/// Runs workflow steps against a completion provider.
///
/// Holds only immutable state, so one runner may serve concurrent callers.
pub struct StepRunner {
    config: ProtocolConfig,
    registry: SchemaRegistry,
    client: CompletionClient,
}

impl StepRunner {
    pub fn new(
        config: ProtocolConfig,
        registry: SchemaRegistry,
        provider: Box<dyn CompletionProvider>,
    ) -> Self {
        let client = CompletionClient::new(provider, &config);
        Self {
            config,
            registry,
            client,
        }
    }

    /// Runner backed by the OpenAI-compatible HTTP provider.
    pub fn from_config(config: ProtocolConfig) -> Result<Self, ProtocolError> {
        let provider = OpenAiProvider::from_config(&config)?;
        Ok(Self::new(
            config,
            SchemaRegistry::builtin(),
            Box::new(provider),
        ))
    }

    /// Run one step: at most two completion calls.
    pub fn run_step(&self, envelope: &Envelope) -> Result<StepOutcome, ProtocolError> {
        self.run_step_with(envelope, |_| {})
    }

    /// Like [`run_step`](Self::run_step), reporting each attempt as it finishes.
    pub fn run_step_with(
        &self,
        envelope: &Envelope,
        mut on_attempt: impl FnMut(&StepAttempt),
    ) -> Result<StepOutcome, ProtocolError> {
        envelope.check()?;
        let schema = self.registry.get(envelope.step)?;
        let temperature = envelope.temperature.unwrap_or(self.config.temperature);

        let first = self.attempt(AttemptKind::Initial, envelope.clone(), schema, temperature)?;
        on_attempt(&first.record);
        let violation = match first.checked {
            Checked::Valid(response) => {
                return Ok(StepOutcome {
                    response,
                    filtered: first.filtered,
                    attempts: vec![first.record],
                });
            }
            Checked::Invalid(violation) => violation,
        };
        tracing::warn!(
            step = %envelope.step,
            %violation,
            "response failed validation; issuing corrective retry"
        );

        let retry = self.attempt(
            AttemptKind::Corrective,
            corrective_envelope(envelope),
            schema,
            RETRY_TEMPERATURE,
        )?;
        on_attempt(&retry.record);
        match retry.checked {
            Checked::Valid(response) => {
                tracing::info!(step = %envelope.step, "corrective retry accepted");
                Ok(StepOutcome {
                    response,
                    filtered: retry.filtered,
                    attempts: vec![first.record, retry.record],
                })
            }
            Checked::Invalid(retry_violation) => {
                tracing::warn!(
                    step = %envelope.step,
                    first = %violation,
                    retry = %retry_violation,
                    "corrective retry failed validation"
                );
                Err(ProtocolError::SchemaViolation {
                    step: envelope.step,
                    detail: retry_violation.to_string(),
                })
            }
        }
    }

    fn attempt(
        &self,
        kind: AttemptKind,
        envelope: Envelope,
        schema: &Schema,
        temperature: f32,
    ) -> Result<Attempt, ProtocolError> {
        let completion = self.client.complete(
            &envelope.conversation_history,
            &envelope,
            schema,
            temperature,
        )?;
        let dropped = dropped_fields(&completion.raw, &envelope.fields);
        if !dropped.is_empty() {
            tracing::debug!(
                step = %envelope.step,
                %kind,
                dropped = ?dropped,
                "dropped undeclared response fields"
            );
        }
        let filtered = enforce(&completion.raw, &envelope.fields);
        let checked = check(schema, &filtered);
        let violation = match &checked {
            Checked::Valid(_) => None,
            Checked::Invalid(violation) => Some(violation.clone()),
        };
        Ok(Attempt {
            record: StepAttempt {
                kind,
                envelope,
                temperature,
                duration: completion.duration,
                raw_text: completion.text,
                dropped_fields: dropped,
                violation,
            },
            filtered,
            checked,
        })
    }
}
