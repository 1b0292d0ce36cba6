//! Shared test infrastructure for integration tests.

use mentat::{CompletionProvider, CompletionRequest, ProtocolError};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Provider that replays canned replies in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProtocolError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProtocolError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[Value]) -> Self {
        Self::new(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProtocolError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(ProtocolError::Transport("script exhausted".to_string())))
    }
}

pub fn project_context() -> Value {
    json!({
        "title": "Logistics unit review",
        "purpose": "Strategic options review",
        "industry": "Transportation & logistics",
        "geography": "US",
        "time_horizon": "12-24 months",
        "decision_outcomes": ["Sell", "Retain & optimize"]
    })
}

/// A Step 1 reply with every required key.
pub fn step1_reply() -> Value {
    json!({
        "brief_summary": "The company is weighing a divestiture of its logistics unit.",
        "assumption_gaps": ["Unit profitability", "Buyer interest"],
        "clarifying_questions": ["Which geographies does the unit serve?"],
        "defer_to_next_step_signal": false,
        "initial_response": "I've analyzed your situation; please review the summary below.",
        "focus_area": "Logistics unit",
        "purpose": "Decide whether to divest",
        "industry": "Logistics",
        "geography": "United States",
        "time_horizon": "12-24 months",
        "decision_outcomes": ["Whether to divest the logistics unit"]
    })
}

pub fn without(mut value: Value, key: &str) -> Value {
    value
        .as_object_mut()
        .expect("reply object")
        .remove(key);
    value
}

pub fn with(mut value: Value, key: &str, extra: Value) -> Value {
    value
        .as_object_mut()
        .expect("reply object")
        .insert(key.to_string(), extra);
    value
}

/// The serialized envelope carried by the final user message of a request.
pub fn sent_envelope(request: &CompletionRequest) -> Value {
    let last = request.messages.last().expect("at least one message");
    serde_json::from_str(&last.content).expect("envelope JSON")
}
