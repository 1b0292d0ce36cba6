//! JSONL transcript of step attempts.
//!
//! One line per completion call, appended as attempts finish:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"step":"step_1_clarify","kind":"initial","outcome":"rejected",...}
//! {"schema_version":1,"ts":1707900004100,"step":"step_1_clarify","kind":"corrective","outcome":"accepted",...}
//! ```
use crate::orchestrator::{AttemptKind, StepAttempt};
use crate::step::StepId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Current schema version for transcript entries.
pub const TRANSCRIPT_SCHEMA_VERSION: u32 = 1;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub schema_version: u32,

    /// Unix timestamp in milliseconds when the entry was written.
    pub ts: u64,

    pub step: StepId,

    pub kind: AttemptKind,

    pub temperature: f32,

    pub duration_ms: u64,

    pub outcome: AttemptOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub dropped_fields: Vec<String>,

    /// First characters of the raw reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
}

impl TranscriptEntry {
    pub fn from_attempt(attempt: &StepAttempt) -> Self {
        let preview: String = attempt.raw_text.chars().take(PREVIEW_CHARS).collect();
        let preview = if preview.len() < attempt.raw_text.len() {
            format!("{preview}...")
        } else {
            preview
        };
        Self {
            schema_version: TRANSCRIPT_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            step: attempt.envelope.step,
            kind: attempt.kind,
            temperature: attempt.temperature,
            duration_ms: attempt.duration.as_millis() as u64,
            outcome: if attempt.violation.is_some() {
                AttemptOutcome::Rejected
            } else {
                AttemptOutcome::Accepted
            },
            violation: attempt.violation.as_ref().map(ToString::to_string),
            dropped_fields: attempt.dropped_fields.clone(),
            response_preview: (!preview.is_empty()).then_some(preview),
        }
    }
}

/// Append an entry to the transcript at `path`.
pub fn append_transcript(path: &Path, entry: &TranscriptEntry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create transcript directory {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open transcript for append: {}", path.display()))?;

    let line = serde_json::to_string(entry).context("serialize transcript entry")?;
    writeln!(file, "{line}").context("write transcript entry")?;

    Ok(())
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
