//! Structured-response protocol layer for the Mentat strategy workflow.
//!
//! Envelopes describe what a step asks of the model, schemas describe what a
//! step accepts back, and [`StepRunner::run_step`] mediates between the two
//! with one corrective retry.
pub mod canonical;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod orchestrator;
pub mod response;
pub mod schema;
pub mod step;
pub mod transcript;
pub mod validate;

pub use canonical::CanonicalCategories;
pub use client::{
    ChatMessage, CompletionClient, CompletionProvider, CompletionRequest, MessageRole,
    OpenAiProvider, OutputMode,
};
pub use config::{ProtocolConfig, ResponseFormat};
pub use envelope::{
    corrective_envelope, prompt_doctor, step1_clarify, step2_assessment_toggle,
    step3_subassessments, ChatTurn, Constraints, Envelope, Role, CORRECTIVE_DIRECTIVE,
};
pub use error::ProtocolError;
pub use orchestrator::{AttemptKind, StepAttempt, StepOutcome, StepRunner, RETRY_TEMPERATURE};
pub use response::{enforce, StepResponse};
pub use schema::{Schema, SchemaRegistry};
pub use step::StepId;
pub use validate::{validate, Violation};
