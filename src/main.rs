use anyhow::{Context, Result};
use clap::Parser;
use mentat::transcript::{append_transcript, TranscriptEntry};
use mentat::{
    prompt_doctor, step1_clarify, step2_assessment_toggle, step3_subassessments,
    CanonicalCategories, ChatTurn, Envelope, ProtocolConfig, SchemaRegistry, StepId, StepRunner,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let envelope = match args.command {
        Command::Schema(schema_args) => return print_schema(&schema_args.step),
        Command::Clarify(clarify) => {
            let history: Vec<ChatTurn> = match clarify.history.as_deref() {
                Some(path) => load_json(path)?,
                None => Vec::new(),
            };
            step1_clarify(load_json(&clarify.context)?, clarify.input, history)
        }
        Command::Assess(assess) => {
            let canonical: CanonicalCategories = match assess.canonical.as_deref() {
                Some(path) => load_json(path)?,
                None => CanonicalCategories::standard(),
            };
            step2_assessment_toggle(load_json(&assess.context)?, assess.input, canonical)
        }
        Command::Subassess(subassess) => step3_subassessments(
            load_json(&subassess.context)?,
            subassess.input,
            subassess.selected,
        ),
        Command::Doctor(doctor) => prompt_doctor(doctor.prompt),
        Command::Run(run) => {
            let value: Value = load_json(&run.envelope)?;
            Envelope::from_json(value)
                .with_context(|| format!("load envelope {}", run.envelope.display()))?
        }
    };

    if args.dry_run {
        print_json(&envelope)?;
        return Ok(());
    }

    let config = ProtocolConfig::load(args.config.as_deref())?;
    let runner = StepRunner::from_config(config)?;
    let log = args.log.as_deref();
    let outcome = runner
        .run_step_with(&envelope, |attempt| {
            let Some(path) = log else {
                return;
            };
            if let Err(err) = append_transcript(path, &TranscriptEntry::from_attempt(attempt)) {
                tracing::warn!(error = %err, "failed to append transcript entry");
            }
        })
        .inspect_err(|err| {
            tracing::error!(step = %envelope.step, kind = err.kind(), "step failed");
        })?;
    print_json(&outcome.filtered)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_schema(step: &str) -> Result<()> {
    let step: StepId = step.parse()?;
    let registry = SchemaRegistry::builtin();
    print_json(&registry.get(step)?.to_json_schema())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse JSON {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output JSON")?;
    println!("{text}");
    Ok(())
}
