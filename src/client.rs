//! Completion client and provider boundary.
//!
//! The client owns the message protocol: a fixed system instruction, the
//! caller's prior turns verbatim, then the serialized envelope as the final
//! user turn. Transport lives behind [`CompletionProvider`], so the step runner
//! can be driven by any backend (or a scripted fake in tests).
//!
//! # Output parsing
//!
//! Providers are asked for JSON output, but replies wrapped in markdown code
//! fences are still accepted. Anything else that is not a JSON object is a
//! parse failure; it is never retried here.
use crate::config::{ProtocolConfig, ResponseFormat};
use crate::envelope::{ChatTurn, Envelope, Role};
use crate::error::ProtocolError;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Output constraint requested from the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    JsonObject,
    JsonSchema { name: String, schema: Value },
}

/// One provider call: ordered messages at a sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub output: OutputMode,
}

/// Synchronous completion backend. Returns the model's raw text.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProtocolError>;
}

impl<P: CompletionProvider + ?Sized> CompletionProvider for Arc<P> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProtocolError> {
        (**self).complete(request)
    }
}

/// Parsed reply from a single completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub raw: Map<String, Value>,
    pub text: String,
    pub duration: Duration,
}

pub struct CompletionClient {
    provider: Box<dyn CompletionProvider>,
    system_prompt: String,
    response_format: ResponseFormat,
}

impl CompletionClient {
    pub fn new(provider: Box<dyn CompletionProvider>, config: &ProtocolConfig) -> Self {
        Self {
            provider,
            system_prompt: config.system_prompt.clone(),
            response_format: config.response_format,
        }
    }

    /// Perform exactly one provider call for `envelope` and parse its reply.
    pub fn complete(
        &self,
        history: &[ChatTurn],
        envelope: &Envelope,
        schema: &Schema,
        temperature: f32,
    ) -> Result<Completion, ProtocolError> {
        let messages = build_messages(&self.system_prompt, history, envelope)?;
        let prompt_bytes: usize = messages.iter().map(|message| message.content.len()).sum();
        let output = match self.response_format {
            ResponseFormat::JsonObject => OutputMode::JsonObject,
            ResponseFormat::JsonSchema => OutputMode::JsonSchema {
                name: schema.step.as_str().to_string(),
                schema: schema.to_json_schema(),
            },
        };
        let request = CompletionRequest {
            messages,
            temperature,
            output,
        };

        let start = Instant::now();
        let text = self.provider.complete(&request)?;
        let duration = start.elapsed();
        tracing::info!(
            step = %envelope.step,
            temperature,
            elapsed_ms = duration.as_millis() as u64,
            prompt_bytes,
            response_bytes = text.len(),
            "completion call finished"
        );

        let raw = parse_completion(&text)?;
        Ok(Completion {
            raw,
            text,
            duration,
        })
    }
}

/// System instruction, prior turns verbatim, then the envelope as user turn.
pub fn build_messages(
    system_prompt: &str,
    history: &[ChatTurn],
    envelope: &Envelope,
) -> Result<Vec<ChatMessage>, ProtocolError> {
    let payload = serde_json::to_string(envelope)
        .map_err(|err| ProtocolError::InvalidEnvelope(format!("serialize envelope: {err}")))?;
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: MessageRole::System,
        content: system_prompt.to_string(),
    });
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: turn.role.into(),
        content: turn.content.clone(),
    }));
    messages.push(ChatMessage {
        role: MessageRole::User,
        content: payload,
    });
    Ok(messages)
}

/// Parse model output as a JSON object.
pub fn parse_completion(text: &str) -> Result<Map<String, Value>, ProtocolError> {
    // A bare object wins; fences inside string values must not be stripped.
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(map);
    }
    let json_text = extract_json(text);
    if json_text.is_empty() {
        return Err(ProtocolError::Parse("empty response".to_string()));
    }
    match serde_json::from_str::<Value>(json_text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProtocolError::Parse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(err) => Err(ProtocolError::Parse(format!(
            "{err}; first 200 chars: {}",
            text.chars().take(200).collect::<String>()
        ))),
    }
}

/// Strip markdown code fences the model may wrap around its JSON.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        // Skip language identifier if present
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    text
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// OpenAI-compatible chat-completions backend over blocking HTTP.
pub struct OpenAiProvider {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Build a provider from config, reading the API key from the environment.
    pub fn from_config(config: &ProtocolConfig) -> Result<Self, ProtocolError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ProtocolError::Config(format!("{} is not set", config.api_key_env))
            })?;
        Ok(Self::new(config, api_key))
    }

    pub fn new(config: &ProtocolConfig, api_key: String) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let response_format = match &request.output {
            OutputMode::JsonObject => json!({ "type": "json_object" }),
            OutputMode::JsonSchema { name, schema } => json!({
                "type": "json_schema",
                "json_schema": { "name": name, "schema": schema, "strict": false },
            }),
        };
        json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "response_format": response_format,
        })
    }
}

impl CompletionProvider for OpenAiProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProtocolError> {
        let body = self.request_body(request);
        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&body)
            .map_err(|err| ProtocolError::Transport(format!("POST {}: {err}", self.endpoint)))?;
        let completion: ChatCompletionResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| ProtocolError::Transport(format!("decode provider response: {err}")))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProtocolError::Transport("provider returned no message content".to_string()))
    }
}
