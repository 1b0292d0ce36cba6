use crate::step::StepId;

/// Failures surfaced by the protocol layer.
///
/// Only `SchemaViolation` is recoverable, and only once, through the
/// corrective retry in the step runner.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion output is not a JSON object: {0}")]
    Parse(String),
    #[error("response for {step} violates its schema: {detail}")]
    SchemaViolation { step: StepId, detail: String },
    #[error("no schema registered for step `{0}`")]
    UnknownStep(String),
    #[error("malformed envelope: {0}")]
    InvalidEnvelope(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProtocolError {
    /// Short machine-readable kind, logged by the CLI when a step fails.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_failure",
            Self::Parse(_) => "parse_failure",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::UnknownStep(_) => "unknown_step",
            Self::InvalidEnvelope(_) => "invalid_envelope",
            Self::Config(_) => "config",
        }
    }
}
