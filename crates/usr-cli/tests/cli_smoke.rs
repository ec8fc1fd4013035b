//! End-to-end checks of the `usr` binary against the baseline matrix
//! fixtures shipped with the kernel crate.

use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const GENERATED_AT: &str = "2026-10-01T00:00:00Z";

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "usr-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../usr-kernel/tests/fixtures")
}

fn matrix_dir() -> String {
    fixtures_dir().join("matrix").display().to_string()
}

fn observed(name: &str) -> String {
    fixtures_dir()
        .join("observed")
        .join(format!("{name}.json"))
        .display()
        .to_string()
}

fn usr_command<I, S>(args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(env!("CARGO_BIN_EXE_usr"));
    command.args(args).env_remove("USR_LOG").env_remove("RUST_LOG");
    command
}

fn run_usr<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    usr_command(args)
        .output()
        .expect("usr command should execute")
}

/// `<command> --matrix-dir <baseline> --generated-at <fixed> --json <extra...>`
fn run_on_baseline(command: &str, extra: &[&str]) -> Output {
    let matrix = matrix_dir();
    let mut args = vec![
        command,
        "--matrix-dir",
        matrix.as_str(),
        "--generated-at",
        GENERATED_AT,
        "--json",
    ];
    args.extend_from_slice(extra);
    run_usr(args)
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn bundle_check_accepts_the_baseline_matrix() {
    let output = run_on_baseline("bundle-check", &["--require-all"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["ok"], Value::Bool(true));
    assert_eq!(payload["rows"].as_array().map(Vec::len), Some(29));
}

#[test]
fn bundle_check_fails_for_a_missing_directory() {
    let output = run_usr(["bundle-check", "--matrix-dir", "/nonexistent/usr-matrix"]);
    assert_failure(&output);
    assert!(
        stderr_text(&output).contains("matrix directory not found"),
        "{}",
        stderr_text(&output)
    );
}

#[test]
fn text_output_summarises_the_catalog() {
    let matrix = matrix_dir();
    let output = run_usr(["catalog-check", "--matrix-dir", matrix.as_str()]);
    assert_success(&output);
    let text = stdout_text(&output);
    assert!(text.contains("usr catalog-check"), "{text}");
    assert!(text.contains("Result: pass"), "{text}");
    assert!(text.contains("Languages: 8"), "{text}");
}

#[test]
fn report_commands_emit_envelopes_with_the_run_context() {
    let output = run_on_baseline(
        "fixture-governance-check",
        &["--lane", "nightly", "--run-id", "run-smoke"],
    );
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-validation-report");
    assert_eq!(payload["generatedAt"], GENERATED_AT);
    assert_eq!(payload["lane"], "nightly");
    assert_eq!(payload["runId"], "run-smoke");
    assert_eq!(payload["status"], "pass");
}

#[test]
fn observed_evidence_commands_pass_on_the_baseline() {
    let security = observed("security-results");
    let metrics = observed("lane-metrics");
    let benchmarks = observed("benchmark-results");
    let scenarios = observed("failure-injection-results");
    let cases: [(&str, Vec<&str>, &str); 4] = [
        (
            "security-gate-check",
            vec!["--results", security.as_str()],
            "usr-validation-report",
        ),
        (
            "observability-rollup",
            vec!["--lane-metrics", metrics.as_str()],
            "usr-observability-rollup",
        ),
        (
            "benchmark-check",
            vec!["--results", benchmarks.as_str()],
            "usr-benchmark-regression-summary",
        ),
        (
            "failure-injection-check",
            vec!["--results", scenarios.as_str(), "--strict", "--strict-enum"],
            "usr-failure-injection-report",
        ),
    ];
    for (command, extra, artifact_id) in cases {
        let output = run_on_baseline(command, &extra);
        assert_success(&output);
        let payload = parse_json_stdout(&output);
        assert_eq!(payload["artifactId"], artifact_id, "{command}");
    }
}

#[test]
fn conformance_summary_requires_a_conformance_lane() {
    let output = run_on_baseline("conformance-summary", &["--level", "C4"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-conformance-summary");
    assert_eq!(payload["summary"]["conformanceLane"], "conformance");

    let output = run_on_baseline("conformance-summary", &["--level", "C4", "--known-lane", "ci"]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["status"], "fail");
    assert!(payload["summary"]["conformanceLane"].is_null());
}

#[test]
fn conformance_summary_rejects_unknown_levels() {
    let output = run_on_baseline("conformance-summary", &["--level", "C9"]);
    assert_failure(&output);
    assert!(
        stderr_text(&output).contains("unknown conformance level: C9"),
        "{}",
        stderr_text(&output)
    );
}

#[test]
fn matrix_contract_commands_pass_on_the_baseline() {
    for command in ["harness-check", "edge-contract-check"] {
        let output = run_on_baseline(command, &[]);
        assert_success(&output);
        let payload = parse_json_stdout(&output);
        assert_eq!(payload["ok"], Value::Bool(true), "{command}");
    }

    let output = run_on_baseline("backcompat-check", &["--strict-enum"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-backcompat-matrix-results");
    assert_eq!(payload["summary"]["strictEnum"], Value::Bool(true));
    assert_eq!(payload["rows"].as_array().map(Vec::len), Some(12));
}

#[test]
fn edge_contract_check_reports_endpoint_violations() {
    let temp = TempDirGuard::new("edges");
    let edges_path = temp.path().join("edges.json");
    fs::write(
        &edges_path,
        r#"[{"edgeUid": "edge64:v1:0011aa22bb33cc44", "kind": "calls", "status": "resolved",
            "source": {"entity": "node", "uid": "n64:v1:1111aa22bb33cc44"}}]"#,
    )
    .expect("edges should be written");
    let edges = edges_path.display().to_string();

    let output = run_on_baseline("edge-contract-check", &["--edges", edges.as_str()]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(
        payload["errors"],
        serde_json::json!(["edge[0] resolved edge must include target ref"])
    );
}

#[test]
fn capability_transition_check_applies_reason_code_membership() {
    let temp = TempDirGuard::new("transition");
    let path = temp.path().join("transition.json");
    fs::write(
        &path,
        r#"{"from": "supported", "to": "partial", "diagnostic": "USR-W-CAPABILITY-DOWNGRADED", "reasonCode": "USR-R-NEW-REASON"}"#,
    )
    .expect("transition should be written");
    let path = path.display().to_string();

    let output = run_usr(["capability-transition-check", path.as_str(), "--json"]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(
        payload["errors"],
        serde_json::json!(["reasonCode unknown reason code: USR-R-NEW-REASON"])
    );

    let output = run_usr([
        "capability-transition-check",
        path.as_str(),
        "--lenient-reason-code",
        "--json",
    ]);
    assert_success(&output);
}

#[test]
fn promotion_readiness_surfaces_external_blockers() {
    let output = run_on_baseline("promotion-readiness", &[]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["blocked"], Value::Bool(false));

    let output = run_on_baseline(
        "promotion-readiness",
        &["--failing-gate", "qg-resolution", "--missing-artifact", "ops-cutover:usr-cutover-plan.json"],
    );
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["blocked"], Value::Bool(true));
    assert_eq!(
        payload["blockers"],
        serde_json::json!([
            "failing-gate:qg-resolution",
            "missing-artifact:ops-cutover:usr-cutover-plan.json"
        ])
    );
    assert_eq!(payload["readiness"]["testRolloutBlocked"], Value::Bool(false));
}

#[test]
fn scope_flag_is_echoed_into_the_envelope() {
    let output = run_on_baseline("operational-readiness", &["--scope", "language:python"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["scope"]["scopeType"], "language");
    assert_eq!(payload["scope"]["scopeId"], "python");

    let output = run_on_baseline("operational-readiness", &["--scope", "python"]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("expected TYPE:ID"));
}

#[test]
fn operational_readiness_counts_missing_reports_in_a_directory() {
    let output = run_on_baseline("operational-readiness", &[]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-operational-readiness-validation");
    assert_eq!(payload["scope"]["scopeType"], "lane");

    let reports = TempDirGuard::new("reports");
    let reports_dir = reports.path().display().to_string();
    let output = run_on_baseline("operational-readiness", &["--reports-dir", reports_dir.as_str()]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["status"], "fail");
    assert_eq!(payload["summary"]["blocked"], Value::Bool(true));
}

#[test]
fn scorecard_lists_readiness_gates_first() {
    let output = run_on_baseline("scorecard", &[]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-release-readiness-scorecard");
    assert_eq!(payload["rows"][0]["id"], "test-rollout");
    assert_eq!(payload["rows"][0]["rowType"], "readiness-gate");
}

#[test]
fn waiver_expiry_view_fails_once_blocking_waivers_lapse() {
    let output = run_on_baseline("waiver-report", &["--view", "active"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-waiver-active-report");

    let matrix = matrix_dir();
    let output = run_usr([
        "waiver-report",
        "--matrix-dir",
        matrix.as_str(),
        "--generated-at",
        "2027-01-15T00:00:00Z",
        "--view",
        "expiry",
        "--json",
    ]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-waiver-expiry-report");
    assert_eq!(payload["rows"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        payload["blockingFindings"][0]["message"],
        "waiver-rust-interprocedural waiver is expired at evaluationTime=2027-01-15T00:00:00.000Z"
    );
}

fn feature_flag_row<'a>(payload: &'a Value, key: &str) -> &'a Value {
    payload["rows"]
        .as_array()
        .and_then(|rows| rows.iter().find(|row| row["key"] == key))
        .unwrap_or_else(|| panic!("missing feature flag row {key}: {payload}"))
}

#[test]
fn config_resolve_layers_file_then_argv_overrides() {
    let layers = observed("config-layers");
    let output = run_on_baseline(
        "config-resolve",
        &[
            "--layers",
            layers.as_str(),
            "--set",
            "usr.parser.maxSegmentMs=3000",
        ],
    );
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["artifactId"], "usr-feature-flag-state");

    let segment = feature_flag_row(&payload, "usr.parser.maxSegmentMs");
    assert_eq!(segment["value"], 3000);
    assert_eq!(segment["source"], "argv");
    let level = feature_flag_row(&payload, "usr.reporting.level");
    assert_eq!(level["value"], "verbose");
    assert_eq!(level["source"], "env");
}

#[test]
fn config_resolve_reads_the_env_layer_from_process_variables() {
    let matrix = matrix_dir();
    let output = usr_command([
        "config-resolve",
        "--matrix-dir",
        matrix.as_str(),
        "--generated-at",
        GENERATED_AT,
        "--env-layer",
        "--json",
    ])
    .env("USR_CFG_USR__REPORTING__LEVEL", "minimal")
    .output()
    .expect("usr command should execute");
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let level = feature_flag_row(&payload, "usr.reporting.level");
    assert_eq!(level["value"], "minimal");
    assert_eq!(level["source"], "env");
}

#[test]
fn config_resolve_out_of_range_overrides_block_only_in_strict_mode() {
    let output = run_on_baseline("config-resolve", &["--set", "usr.parser.maxSegmentMs=5"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["status"], "warn");
    assert_eq!(feature_flag_row(&payload, "usr.parser.maxSegmentMs")["source"], "default");

    let output = run_on_baseline(
        "config-resolve",
        &["--set", "usr.parser.maxSegmentMs=5", "--strict"],
    );
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["status"], "fail");
    assert_eq!(
        payload["blockingFindings"][0]["message"],
        "invalid runtime config value for usr.parser.maxSegmentMs at argv: value 5 below minValue 100"
    );
}

#[test]
fn toml_config_supplies_defaults_that_flags_override() {
    let temp = TempDirGuard::new("config");
    let config_path = temp.path().join("usr.toml");
    fs::write(
        &config_path,
        format!(
            "matrixDir = {:?}\nlane = \"nightly\"\nproducerId = \"usr-smoke\"\n",
            matrix_dir()
        ),
    )
    .expect("config should be written");
    let config = config_path.display().to_string();

    let output = run_usr([
        "ownership-check",
        "--config",
        config.as_str(),
        "--generated-at",
        GENERATED_AT,
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["lane"], "nightly");
    assert_eq!(payload["producerId"], "usr-smoke");

    let output = run_usr([
        "ownership-check",
        "--config",
        config.as_str(),
        "--lane",
        "ci",
        "--json",
    ]);
    assert_success(&output);
    assert_eq!(parse_json_stdout(&output)["lane"], "ci");
}

#[test]
fn invalid_toml_config_exits_with_an_error() {
    let temp = TempDirGuard::new("bad-config");
    let config_path = temp.path().join("usr.toml");
    fs::write(&config_path, "matrixDir = [unterminated\n").expect("config should be written");
    let config = config_path.display().to_string();

    let output = run_usr(["bundle-check", "--config", config.as_str()]);
    assert_failure(&output);
    assert!(
        stderr_text(&output).contains("invalid toml at"),
        "{}",
        stderr_text(&output)
    );
}

#[test]
fn validate_file_uses_the_file_name_or_report_id() {
    let path = fixtures_dir()
        .join("matrix/usr-slo-budgets.json")
        .display()
        .to_string();
    let output = run_usr(["validate-file", path.as_str(), "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["target"], "usr-slo-budgets.json");

    let output = run_usr([
        "validate-file",
        path.as_str(),
        "--report",
        "usr-validation-report",
        "--json",
    ]);
    assert_failure(&output);
    assert_eq!(parse_json_stdout(&output)["ok"], Value::Bool(false));
}

#[test]
fn audit_reports_check_lists_every_missing_report() {
    let temp = TempDirGuard::new("audit");
    let dir = temp.path().display().to_string();
    let output = run_usr(["audit-reports-check", dir.as_str(), "--json"]);
    assert_failure(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["errors"].as_array().map(Vec::len), Some(9));
    assert_eq!(
        payload["errors"][0],
        "missing required audit report payload: usr-conformance-summary"
    );
}

#[test]
fn audit_reports_check_accepts_reports_emitted_by_the_cli() {
    let temp = TempDirGuard::new("audit-roundtrip");
    let security = observed("security-results");
    let benchmarks = observed("benchmark-results");
    let scenarios = observed("failure-injection-results");
    let runs: [(&str, Vec<&str>, &str); 9] = [
        ("conformance-summary", vec!["--level", "C4"], "usr-conformance-summary"),
        ("security-gate-check", vec!["--results", security.as_str()], "usr-validation-report"),
        ("scorecard", vec![], "usr-release-readiness-scorecard"),
        ("config-resolve", vec![], "usr-feature-flag-state"),
        (
            "failure-injection-check",
            vec!["--results", scenarios.as_str()],
            "usr-failure-injection-report",
        ),
        (
            "benchmark-check",
            vec!["--results", benchmarks.as_str()],
            "usr-benchmark-regression-summary",
        ),
        ("threat-model-check", vec![], "usr-threat-model-coverage-report"),
        ("waiver-report", vec!["--view", "active"], "usr-waiver-active-report"),
        ("waiver-report", vec!["--view", "expiry"], "usr-waiver-expiry-report"),
    ];
    for (command, extra, artifact_id) in runs {
        let output = run_on_baseline(command, &extra);
        assert_success(&output);
        fs::write(temp.path().join(format!("{artifact_id}.json")), &output.stdout)
            .expect("report should be written");
    }

    let dir = temp.path().display().to_string();
    let output = run_usr(["audit-reports-check", dir.as_str()]);
    assert_success(&output);
    assert!(stdout_text(&output).contains("Present: 9"), "{}", stdout_text(&output));
}

#[test]
fn code_check_applies_grammar_and_strict_membership() {
    let output = run_usr(["code-check", "USR-E-NOT-A-REAL-CODE", "--json"]);
    assert_success(&output);

    let output = run_usr(["code-check", "USR-E-NOT-A-REAL-CODE", "--strict-enum", "--json"]);
    assert_failure(&output);
    assert_eq!(
        parse_json_stdout(&output)["errors"][0],
        "unknown diagnostic code: USR-E-NOT-A-REAL-CODE"
    );

    let output = run_usr(["code-check", "usr-r-lowercase", "--kind", "reason"]);
    assert_failure(&output);
    assert!(
        stdout_text(&output).contains("reason code does not match canonical grammar"),
        "{}",
        stdout_text(&output)
    );
}
