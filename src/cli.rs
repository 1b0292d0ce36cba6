//! CLI argument parsing for the `mentat` binary.
//!
//! The CLI is a thin wrapper: it builds an envelope from files and flags,
//! runs one step, and prints the projected response as JSON.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mentat",
    version,
    about = "Run one structured Mentat workflow step against a completion model",
    after_help = "Examples:\n  mentat clarify --context project.json --input \"We are exploring whether to divest a logistics unit\"\n  mentat assess --context project.json --input \"Customer dependency matters\"\n  mentat subassess --context project.json --input \"Go deeper\" --selected \"Competitive intensity\"\n  mentat doctor --prompt \"help me think about selling the unit\"\n  mentat run --envelope envelope.json --log transcript.jsonl\n  mentat schema step_2_assessment_toggle",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON config file (defaults to $MENTAT_CONFIG, then the per-user config)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Print the envelope that would be sent and exit without calling the model
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Append a JSONL transcript entry for every completion attempt
    #[arg(long, value_name = "PATH", global = true)]
    pub log: Option<PathBuf>,

    /// Emit debug-level logs on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Clarify(ClarifyArgs),
    Assess(AssessArgs),
    Subassess(SubassessArgs),
    Doctor(DoctorArgs),
    Run(RunArgs),
    Schema(SchemaArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Step 1: clarify the strategic situation")]
pub struct ClarifyArgs {
    /// Project context JSON (opaque to the protocol)
    #[arg(long, value_name = "FILE")]
    pub context: PathBuf,

    /// Latest user message
    #[arg(long, value_name = "TEXT")]
    pub input: String,

    /// Prior turns as a JSON array of {"role", "content"} objects
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Step 2: recommend assessments from the canonical catalogue")]
pub struct AssessArgs {
    /// Project context JSON (opaque to the protocol)
    #[arg(long, value_name = "FILE")]
    pub context: PathBuf,

    /// Latest user message
    #[arg(long, value_name = "TEXT")]
    pub input: String,

    /// Catalogue JSON with external/internal/optional label lists
    #[arg(long, value_name = "FILE")]
    pub canonical: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Step 3: plan sub-assessments for selected assessments")]
pub struct SubassessArgs {
    /// Project context JSON (opaque to the protocol)
    #[arg(long, value_name = "FILE")]
    pub context: PathBuf,

    /// Latest user message
    #[arg(long, value_name = "TEXT")]
    pub input: String,

    /// Selected assessment label (repeatable)
    #[arg(long = "selected", value_name = "LABEL", required = true)]
    pub selected: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Reframe a raw prompt and list what it is missing")]
pub struct DoctorArgs {
    /// Raw prompt text
    #[arg(long, value_name = "TEXT")]
    pub prompt: String,
}

#[derive(Parser, Debug)]
#[command(about = "Run a pre-built envelope")]
pub struct RunArgs {
    /// Envelope JSON
    #[arg(long, value_name = "FILE")]
    pub envelope: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Print a step's response schema as JSON Schema")]
pub struct SchemaArgs {
    /// Step identifier (e.g. step_1_clarify)
    #[arg(value_name = "STEP")]
    pub step: String,
}
