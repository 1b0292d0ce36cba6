use serde_json::{json, Value};
use std::path::Path;
use std::process::{Command, Output};

fn mentat(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mentat"))
        .args(args)
        .env_remove("MENTAT_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("run mentat")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout JSON")
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).expect("serialize")).expect("write");
}

#[test]
fn schema_command_prints_step2_json_schema() {
    let output = mentat(&["schema", "step_2_assessment_toggle"]);
    assert!(output.status.success());

    let schema = stdout_json(&output);
    assert_eq!(schema["type"], json!("object"));
    assert_eq!(schema["additionalProperties"], json!(false));
    assert_eq!(
        schema["properties"]["recommended_assessments"]["maxItems"],
        json!(10)
    );
}

#[test]
fn schema_command_rejects_unknown_step() {
    let output = mentat(&["schema", "step_4_final_report"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("step_4_final_report"), "stderr: {stderr}");
}

#[test]
fn doctor_dry_run_prints_envelope_without_calling_model() {
    let output = mentat(&[
        "doctor",
        "--prompt",
        "help me think about selling the unit",
        "--dry-run",
    ]);
    assert!(output.status.success());

    let envelope = stdout_json(&output);
    assert_eq!(envelope["step"], json!("prompt_doctor"));
    assert_eq!(
        envelope["raw_prompt"],
        json!("help me think about selling the unit")
    );
    assert_eq!(
        envelope["fields"],
        json!(["reframed_prompt", "missing_elements", "confirm_question"])
    );
}

#[test]
fn clarify_dry_run_embeds_context_and_history() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let context_path = temp_dir.path().join("project.json");
    let history_path = temp_dir.path().join("history.json");
    write_json(&context_path, &json!({"title": "Logistics unit review"}));
    write_json(
        &history_path,
        &json!([
            {"role": "user", "content": "We are exploring whether to divest a logistics unit"},
            {"role": "assistant", "content": "Which geographies does the unit serve?"}
        ]),
    );

    let output = mentat(&[
        "--dry-run",
        "clarify",
        "--context",
        context_path.to_str().expect("utf-8 path"),
        "--input",
        "Only the US.",
        "--history",
        history_path.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let envelope = stdout_json(&output);
    assert_eq!(envelope["step"], json!("step_1_clarify"));
    assert_eq!(envelope["project_context"]["title"], json!("Logistics unit review"));
    assert_eq!(envelope["user_input"], json!("Only the US."));
    assert_eq!(envelope["conversation_history"][1]["role"], json!("assistant"));
    assert_eq!(envelope["constraints"]["max_chars"], json!(1000));
}

#[test]
fn run_rejects_envelope_with_unknown_step() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let envelope_path = temp_dir.path().join("envelope.json");
    write_json(
        &envelope_path,
        &json!({
            "step": "step_9_unknown",
            "constraints": {"max_chars": 100},
            "fields": ["brief_summary"]
        }),
    );

    let output = mentat(&[
        "run",
        "--envelope",
        envelope_path.to_str().expect("utf-8 path"),
        "--dry-run",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("step_9_unknown"), "stderr: {stderr}");
}

#[test]
fn missing_api_key_fails_before_any_request() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let config_path = temp_dir.path().join("config.json");
    write_json(
        &config_path,
        &json!({"api_key_env": "MENTAT_TEST_KEY_THAT_IS_NOT_SET"}),
    );

    let output = Command::new(env!("CARGO_BIN_EXE_mentat"))
        .args(["--config", config_path.to_str().expect("utf-8 path")])
        .args(["doctor", "--prompt", "help me think about selling the unit"])
        .env_remove("MENTAT_TEST_KEY_THAT_IS_NOT_SET")
        .output()
        .expect("run mentat");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("MENTAT_TEST_KEY_THAT_IS_NOT_SET is not set"),
        "stderr: {stderr}"
    );
}

#[test]
fn failed_step_logs_error_kind() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let config_path = temp_dir.path().join("config.json");
    write_json(
        &config_path,
        &json!({
            "api_base": "http://127.0.0.1:9/v1",
            "api_key_env": "MENTAT_TEST_UNREACHABLE_KEY"
        }),
    );

    let output = Command::new(env!("CARGO_BIN_EXE_mentat"))
        .args(["--config", config_path.to_str().expect("utf-8 path")])
        .args(["doctor", "--prompt", "help me think about selling the unit"])
        .env("MENTAT_TEST_UNREACHABLE_KEY", "sk-test")
        .env_remove("RUST_LOG")
        .output()
        .expect("run mentat");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("transport_failure"), "stderr: {stderr}");
    assert!(stderr.contains("step failed"), "stderr: {stderr}");
}
