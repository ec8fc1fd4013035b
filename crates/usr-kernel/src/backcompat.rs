//! Backward-compatibility scenario matrix.
//!
//! Each row pins how a reader of some USR version handles a payload from a
//! producer version. The matrix must carry the canonical `BC-001..BC-012`
//! scenarios, and each row's diagnostics must agree with its expected
//! outcome.

use crate::codes::validate_diagnostic_code;
use crate::findings::Findings;
use crate::fixture_governance::validation_summary;
use crate::registry::{BackcompatRow, ExpectedOutcome, ReaderMode, key_counts};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation};
use crate::schema::SchemaRegistry;
use crate::schema::registries::BACKCOMPAT_MATRIX;
use crate::schema::reports::BACKCOMPAT_MATRIX_RESULTS;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const REQUIRED_SCENARIO_IDS: [&str; 12] = [
    "BC-001", "BC-002", "BC-003", "BC-004", "BC-005", "BC-006", "BC-007", "BC-008", "BC-009",
    "BC-010", "BC-011", "BC-012",
];

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^usr-\d+\.\d+\.\d+$").expect("version regex must compile"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackcompatResultRow {
    pub id: String,
    pub producer_version: String,
    pub reader_versions: Vec<String>,
    pub reader_mode: ReaderMode,
    pub fixture_family: String,
    pub expected_outcome: ExpectedOutcome,
    pub required_diagnostics: Vec<String>,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn check_versions(row: &BackcompatRow, findings: &mut Findings) {
    if !version_re().is_match(&row.producer_version) {
        findings.error(format!(
            "producerVersion {} does not match usr-<major>.<minor>.<patch>",
            row.producer_version
        ));
    }
    if row.reader_versions.is_empty() {
        findings.error("readerVersions must not be empty");
    }
    let mut seen = BTreeSet::new();
    for version in &row.reader_versions {
        if !version_re().is_match(version) {
            findings.error(format!(
                "readerVersion {version} does not match usr-<major>.<minor>.<patch>"
            ));
        }
        if !seen.insert(version.as_str()) {
            findings.error(format!("readerVersions repeats {version}"));
        }
    }
}

fn check_outcome(row: &BackcompatRow, findings: &mut Findings) {
    let requires_error = row
        .required_diagnostics
        .iter()
        .any(|code| code.starts_with("USR-E-"));
    let requires_advisory = row
        .required_diagnostics
        .iter()
        .any(|code| code.starts_with("USR-W-") || code.starts_with("USR-I-"));
    match row.expected_outcome {
        ExpectedOutcome::Reject if !requires_error => {
            findings.error("reject scenarios must require a USR-E-* diagnostic");
        }
        ExpectedOutcome::Accept | ExpectedOutcome::AcceptWithAdapter if requires_error => {
            findings.error("accepting scenarios must not require USR-E-* diagnostics");
        }
        _ => {}
    }
    if row.expected_outcome == ExpectedOutcome::AcceptWithAdapter {
        if row.reader_mode == ReaderMode::Strict {
            findings.error("accept-with-adapter requires a non-strict reader");
        }
        if !requires_advisory {
            findings.error("accept-with-adapter scenarios must require a USR-W-* or USR-I-* diagnostic");
        }
    }
    if row.reader_mode == ReaderMode::Strict && !row.blocking {
        findings.error("strict-reader scenarios must be blocking");
    }
}

/// A non-strict adapter scenario should have a strict reader rejecting the
/// same producer and fixture family.
fn has_strict_counterpart(row: &BackcompatRow, rows: &[BackcompatRow]) -> bool {
    rows.iter().any(|other| {
        other.reader_mode == ReaderMode::Strict
            && other.expected_outcome == ExpectedOutcome::Reject
            && other.producer_version == row.producer_version
            && other.fixture_family == row.fixture_family
            && other
                .reader_versions
                .iter()
                .any(|version| row.reader_versions.contains(version))
    })
}

fn check_scenario(
    row: &BackcompatRow,
    duplicate: bool,
    rows: &[BackcompatRow],
    strict_enum: bool,
) -> Findings {
    let mut findings = Findings::new();
    if duplicate {
        findings.error("scenario id must be unique");
    }
    check_versions(row, &mut findings);
    for code in &row.required_diagnostics {
        let outcome = validate_diagnostic_code(code, strict_enum);
        for error in outcome.errors {
            findings.error(format!("requiredDiagnostics {code}: {error}"));
        }
    }
    check_outcome(row, &mut findings);
    if row.expected_outcome == ExpectedOutcome::AcceptWithAdapter
        && row.reader_mode == ReaderMode::NonStrict
        && !has_strict_counterpart(row, rows)
    {
        findings.warning(format!(
            "adapter scenario has no strict reject counterpart for fixtureFamily {}",
            row.fixture_family
        ));
    }
    findings
}

/// Row checks plus presence of every required scenario. With `strict_enum`
/// required diagnostics must be canonical codes, otherwise only the
/// grammar is checked.
pub fn validate_backcompat_matrix_coverage(
    schemas: &SchemaRegistry,
    backcompat_matrix: &Value,
    strict_enum: bool,
) -> Validation<BackcompatResultRow> {
    let scenarios = match schemas.project::<BackcompatRow>(BACKCOMPAT_MATRIX, backcompat_matrix) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let counts = key_counts(scenarios.iter().map(|row| row.id.as_str()));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        let duplicate = counts.get(scenario.id.as_str()).copied().unwrap_or(0) > 1;
        let checked = check_scenario(scenario, duplicate, &scenarios, strict_enum);
        let pass = checked.is_ok();
        let checked = checked.prefixed(&scenario.id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(BackcompatResultRow {
            id: scenario.id.clone(),
            producer_version: scenario.producer_version.clone(),
            reader_versions: scenario.reader_versions.clone(),
            reader_mode: scenario.reader_mode,
            fixture_family: scenario.fixture_family.clone(),
            expected_outcome: scenario.expected_outcome,
            required_diagnostics: scenario.required_diagnostics.clone(),
            blocking: scenario.blocking,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
        });
    }
    for scenario_id in missing_required_scenarios(&rows) {
        findings.error(format!("missing required backcompat scenario {scenario_id}"));
    }

    tracing::debug!(
        scenarios = rows.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated backcompat matrix"
    );
    Validation::from_findings(findings, rows)
}

fn missing_required_scenarios(rows: &[BackcompatResultRow]) -> Vec<&'static str> {
    REQUIRED_SCENARIO_IDS
        .into_iter()
        .filter(|id| !rows.iter().any(|row| row.id == *id))
        .collect()
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: BACKCOMPAT_MATRIX_RESULTS,
    producer_id: "usr-backcompat-matrix-validator",
    run_id: "run-usr-backcompat-matrix-results",
    finding_class: "backcompat",
};

pub fn build_backcompat_matrix_report(
    schemas: &SchemaRegistry,
    backcompat_matrix: &Value,
    strict_enum: bool,
    ctx: &ReportContext,
) -> BuiltReport<BackcompatResultRow> {
    let validation = validate_backcompat_matrix_coverage(schemas, backcompat_matrix, strict_enum);
    let mut summary = validation_summary("backcompat-matrix", &validation, |row| row.pass);
    let count = |mode: ReaderMode| validation.rows.iter().filter(|row| row.reader_mode == mode).count();
    let reader_versions: BTreeSet<&str> = validation
        .rows
        .iter()
        .flat_map(|row| row.reader_versions.iter().map(String::as_str))
        .collect();
    summary.insert("strictEnum".into(), json!(strict_enum));
    summary.insert("strictScenarioCount".into(), json!(count(ReaderMode::Strict)));
    summary.insert("nonStrictScenarioCount".into(), json!(count(ReaderMode::NonStrict)));
    summary.insert(
        "blockingScenarioCount".into(),
        json!(validation.rows.iter().filter(|row| row.blocking).count()),
    );
    summary.insert("requiredScenarioCount".into(), json!(REQUIRED_SCENARIO_IDS.len()));
    summary.insert(
        "missingRequiredScenarioCount".into(),
        json!(missing_required_scenarios(&validation.rows).len()),
    );
    summary.insert("readerVersions".into(), json!(reader_versions));
    BuiltReport::from_validation(validation, ctx, &REPORT_KIND, &Scope::global(), summary)
}
