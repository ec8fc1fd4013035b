//! Failure-injection scenario evaluation.
//!
//! Every matrix row is replayed in strict and non-strict mode. Both runs must
//! reach the expected outcome, carry the required diagnostics and reason
//! codes, and for blocking scenarios leave recovery evidence behind.

use crate::codes::{validate_diagnostic_code, validate_reason_code};
use crate::findings::Findings;
use crate::registry::FailureInjectionRow;
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::FAILURE_INJECTION_MATRIX;
use crate::schema::reports::FAILURE_INJECTION_REPORT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// What a single scenario run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioObservation {
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
    #[serde(default)]
    pub reason_codes: Vec<String>,
    #[serde(default)]
    pub recovery_evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioMode {
    Strict,
    NonStrict,
}

impl ScenarioMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::NonStrict => "non-strict",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureInjectionResultRow {
    pub id: String,
    pub fault_class: String,
    pub injection_layer: String,
    pub blocking: bool,
    pub strict_expected_outcome: String,
    pub non_strict_expected_outcome: String,
    pub strict_observed_outcome: Option<String>,
    pub non_strict_observed_outcome: Option<String>,
    pub strict_recovery_evidence_count: usize,
    pub non_strict_recovery_evidence_count: usize,
    pub pass: bool,
    pub errors: Vec<String>,
}

/// Strict and non-strict observations, each keyed by scenario id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResults {
    #[serde(default)]
    pub strict: BTreeMap<String, ScenarioObservation>,
    #[serde(default)]
    pub non_strict: BTreeMap<String, ScenarioObservation>,
}

impl ScenarioResults {
    fn by_mode(&self, mode: ScenarioMode) -> &BTreeMap<String, ScenarioObservation> {
        match mode {
            ScenarioMode::Strict => &self.strict,
            ScenarioMode::NonStrict => &self.non_strict,
        }
    }
}

const MODES: [ScenarioMode; 2] = [ScenarioMode::Strict, ScenarioMode::NonStrict];

fn expected_outcome(row: &FailureInjectionRow, mode: ScenarioMode) -> &str {
    match mode {
        ScenarioMode::Strict => &row.strict_expected_outcome,
        ScenarioMode::NonStrict => &row.non_strict_expected_outcome,
    }
}

fn empty() -> &'static ScenarioObservation {
    static EMPTY: ScenarioObservation = ScenarioObservation {
        outcome: None,
        diagnostics: Vec::new(),
        reason_codes: Vec::new(),
        recovery_evidence: Vec::new(),
    };
    &EMPTY
}

fn check_scenario(
    row: &FailureInjectionRow,
    observed: [Option<&ScenarioObservation>; 2],
    strict_enum: bool,
) -> Findings {
    let mut findings = Findings::new();
    for (mode, observation) in MODES.iter().zip(observed) {
        if observation.is_none() {
            findings.error(format!("missing {} scenario result", mode.as_str()));
        }
    }
    for (mode, observation) in MODES.iter().zip(observed) {
        let Some(observation) = observation else {
            continue;
        };
        let expected = expected_outcome(row, *mode);
        if observation.outcome.as_deref() != Some(expected) {
            findings.error(format!(
                "{} outcome mismatch: expected {expected}, received {}",
                mode.as_str(),
                observation.outcome.as_deref().unwrap_or("none")
            ));
        }
    }

    let observed = observed.map(|observation| observation.unwrap_or(empty()));
    for code in &row.required_diagnostics {
        for (mode, observation) in MODES.iter().zip(observed) {
            if !observation.diagnostics.contains(code) {
                findings.error(format!(
                    "{} diagnostics missing required code {code}",
                    mode.as_str()
                ));
            }
        }
    }
    for code in &row.required_reason_codes {
        for (mode, observation) in MODES.iter().zip(observed) {
            if !observation.reason_codes.contains(code) {
                findings.error(format!(
                    "{} reasonCodes missing required code {code}",
                    mode.as_str()
                ));
            }
        }
    }

    if row.blocking {
        for (mode, observation) in MODES.iter().zip(observed) {
            if observation.recovery_evidence.is_empty() {
                findings.error(format!(
                    "{} recoveryEvidence missing for blocking scenario",
                    mode.as_str()
                ));
            }
        }
        for artifact in &row.required_recovery_artifacts {
            for (mode, observation) in MODES.iter().zip(observed) {
                if !observation.recovery_evidence.contains(artifact) {
                    findings.error(format!(
                        "{} recoveryEvidence missing required artifact {artifact}",
                        mode.as_str()
                    ));
                }
            }
        }
    }

    for (mode, observation) in MODES.iter().zip(observed) {
        for code in &observation.diagnostics {
            let outcome = validate_diagnostic_code(code, strict_enum);
            if !outcome.ok {
                findings.error(format!(
                    "{} diagnostic invalid: {}",
                    mode.as_str(),
                    outcome.errors.join("; ")
                ));
            }
        }
        for code in &observation.reason_codes {
            let outcome = validate_reason_code(code, strict_enum);
            if !outcome.ok {
                findings.error(format!(
                    "{} reasonCode invalid: {}",
                    mode.as_str(),
                    outcome.errors.join("; ")
                ));
            }
        }
    }
    findings
}

pub fn evaluate_failure_injection_scenarios(
    schemas: &SchemaRegistry,
    matrix: &Value,
    results: &ScenarioResults,
    strict_enum: bool,
) -> Validation<FailureInjectionResultRow> {
    let scenarios = match schemas.project::<FailureInjectionRow>(FAILURE_INJECTION_MATRIX, matrix) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let matrix_ids: BTreeSet<&str> = scenarios.iter().map(|row| row.id.as_str()).collect();

    let mut findings = Findings::new();
    for mode in MODES {
        for id in results.by_mode(mode).keys() {
            if !matrix_ids.contains(id.as_str()) {
                findings.warning(format!(
                    "{} scenario result does not map to matrix row: {id}",
                    mode.as_str()
                ));
            }
        }
    }

    let mut rows = Vec::with_capacity(scenarios.len());
    for row in &scenarios {
        let observed = MODES.map(|mode| results.by_mode(mode).get(&row.id));
        let checked = check_scenario(row, observed, strict_enum);
        let pass = checked.is_ok();
        let checked = checked.prefixed(&row.id);
        findings.errors.extend(checked.errors.iter().cloned());
        let [strict, non_strict] = observed;
        rows.push(FailureInjectionResultRow {
            id: row.id.clone(),
            fault_class: row.fault_class.clone(),
            injection_layer: row.injection_layer.clone(),
            blocking: row.blocking,
            strict_expected_outcome: row.strict_expected_outcome.clone(),
            non_strict_expected_outcome: row.non_strict_expected_outcome.clone(),
            strict_observed_outcome: strict.and_then(|observed| observed.outcome.clone()),
            non_strict_observed_outcome: non_strict.and_then(|observed| observed.outcome.clone()),
            strict_recovery_evidence_count: strict.map_or(0, |observed| observed.recovery_evidence.len()),
            non_strict_recovery_evidence_count: non_strict
                .map_or(0, |observed| observed.recovery_evidence.len()),
            pass,
            errors: checked.errors,
        });
    }

    tracing::debug!(
        scenarios = rows.len(),
        strict_results = results.strict.len(),
        non_strict_results = results.non_strict.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "evaluated failure-injection scenarios"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: FAILURE_INJECTION_REPORT,
    producer_id: "usr-failure-injection-evaluator",
    run_id: "run-usr-failure-injection-report",
    finding_class: "failure-injection",
};

pub fn build_failure_injection_report(
    schemas: &SchemaRegistry,
    matrix: &Value,
    results: &ScenarioResults,
    strict_mode: bool,
    strict_enum: bool,
    ctx: &ReportContext,
) -> BuiltReport<FailureInjectionResultRow> {
    let validation = evaluate_failure_injection_scenarios(schemas, matrix, results, strict_enum);
    let (pass_count, fail_count) = pass_fail(&validation.rows, |row| row.pass);
    let blocking_failures = validation
        .rows
        .iter()
        .filter(|row| row.blocking && !row.pass)
        .count();

    let mut summary = Map::new();
    summary.insert("strictMode".into(), json!(strict_mode));
    summary.insert("scenarioCount".into(), json!(validation.rows.len()));
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert("blockingFailureCount".into(), json!(blocking_failures));
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));
    BuiltReport::from_validation(validation, ctx, &REPORT_KIND, &Scope::global(), summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Value>) -> Value {
        json!({
            "schemaVersion": "usr-registry-1.0.0",
            "registryId": "usr-failure-injection-matrix",
            "generatedAt": "2026-02-12T00:00:00Z",
            "generatedBy": "test",
            "rows": rows
        })
    }

    fn parser_timeout() -> Value {
        json!({
            "id": "fi-parser-timeout",
            "faultClass": "parser-timeout",
            "injectionLayer": "parser",
            "strictExpectedOutcome": "fail-closed",
            "nonStrictExpectedOutcome": "degrade-with-diagnostics",
            "requiredDiagnostics": ["USR-E-PARSER-FAILED"],
            "requiredReasonCodes": ["USR-R-PARSER-TIMEOUT"],
            "rollbackTriggerConsecutiveFailures": 2,
            "requiredRecoveryArtifacts": ["usr-failure-injection-recovery.json"],
            "blocking": true
        })
    }

    fn observation(outcome: &str) -> ScenarioObservation {
        ScenarioObservation {
            outcome: Some(outcome.to_string()),
            diagnostics: vec!["USR-E-PARSER-FAILED".to_string()],
            reason_codes: vec!["USR-R-PARSER-TIMEOUT".to_string()],
            recovery_evidence: vec!["usr-failure-injection-recovery.json".to_string()],
        }
    }

    fn passing_results() -> ScenarioResults {
        ScenarioResults {
            strict: BTreeMap::from([("fi-parser-timeout".to_string(), observation("fail-closed"))]),
            non_strict: BTreeMap::from([(
                "fi-parser-timeout".to_string(),
                observation("degrade-with-diagnostics"),
            )]),
        }
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn matching_observations_pass() {
        let result = evaluate_failure_injection_scenarios(
            &schemas(),
            &matrix(vec![parser_timeout()]),
            &passing_results(),
            true,
        );
        assert!(result.ok, "{:?}", result.errors);
        assert_eq!(result.rows[0].strict_recovery_evidence_count, 1);
    }

    #[test]
    fn missing_non_strict_result_cascades() {
        let mut results = passing_results();
        results.non_strict.clear();
        results
            .strict
            .insert("fi-unknown".to_string(), observation("fail-closed"));
        let result = evaluate_failure_injection_scenarios(
            &schemas(),
            &matrix(vec![parser_timeout()]),
            &results,
            true,
        );
        assert_eq!(
            result.warnings,
            vec!["strict scenario result does not map to matrix row: fi-unknown"]
        );
        assert_eq!(
            result.errors,
            vec![
                "fi-parser-timeout missing non-strict scenario result",
                "fi-parser-timeout non-strict diagnostics missing required code USR-E-PARSER-FAILED",
                "fi-parser-timeout non-strict reasonCodes missing required code USR-R-PARSER-TIMEOUT",
                "fi-parser-timeout non-strict recoveryEvidence missing for blocking scenario",
                "fi-parser-timeout non-strict recoveryEvidence missing required artifact usr-failure-injection-recovery.json",
            ]
        );
        assert_eq!(result.rows[0].non_strict_observed_outcome, None);
    }

    #[test]
    fn outcome_mismatch_and_unknown_codes() {
        let mut results = passing_results();
        let strict = results
            .strict
            .get_mut("fi-parser-timeout")
            .expect("strict observation");
        strict.outcome = Some("degrade-with-diagnostics".to_string());
        strict.diagnostics.push("USR-E-NOT-LISTED".to_string());
        let result = evaluate_failure_injection_scenarios(
            &schemas(),
            &matrix(vec![parser_timeout()]),
            &results,
            true,
        );
        assert_eq!(
            result.errors,
            vec![
                "fi-parser-timeout strict outcome mismatch: expected fail-closed, received degrade-with-diagnostics",
                "fi-parser-timeout strict diagnostic invalid: unknown diagnostic code: USR-E-NOT-LISTED",
            ]
        );

        let relaxed = evaluate_failure_injection_scenarios(
            &schemas(),
            &matrix(vec![parser_timeout()]),
            &results,
            false,
        );
        assert_eq!(relaxed.errors.len(), 1);
    }

    #[test]
    fn non_blocking_scenarios_skip_recovery_evidence() {
        let mut row = parser_timeout();
        row["blocking"] = json!(false);
        let mut results = passing_results();
        for observation in results.strict.values_mut().chain(results.non_strict.values_mut()) {
            observation.recovery_evidence.clear();
        }
        let result =
            evaluate_failure_injection_scenarios(&schemas(), &matrix(vec![row]), &results, true);
        assert!(result.ok, "{:?}", result.errors);
    }

    #[test]
    fn report_carries_strict_mode_and_counts() {
        let report = build_failure_injection_report(
            &schemas(),
            &matrix(vec![parser_timeout()]),
            &ScenarioResults::default(),
            true,
            true,
            &ReportContext::new("2026-02-12T00:00:00Z"),
        );
        assert!(!report.ok);
        assert_eq!(report.payload.summary["strictMode"], json!(true));
        assert_eq!(report.payload.summary["blockingFailureCount"], json!(1));
        assert_eq!(report.payload.status.as_str(), "fail");
        let check = schemas().validate_report(FAILURE_INJECTION_REPORT, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }

    #[test]
    fn scenario_results_deserialize_with_defaults() {
        let results: ScenarioResults = serde_json::from_value(json!({
            "strict": {"fi-a": {"outcome": "fail-closed"}},
            "nonStrict": {}
        }))
        .expect("results should deserialize");
        assert_eq!(results.strict["fi-a"].diagnostics, Vec::<String>::new());
    }
}
