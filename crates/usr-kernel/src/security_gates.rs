//! Security gate and redaction rule evidence.
//!
//! Observed gate results are looked up by row id first, then by the gate's
//! `check` name. Redaction results are looked up by id, then by `class`.

use crate::findings::{Findings, Severity};
use crate::registry::{RedactionRuleRow, SecurityGateRow};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{REDACTION_RULES, SECURITY_GATES};
use crate::schema::reports::VALIDATION_REPORT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// One observed security gate outcome: a bare boolean or an object
/// carrying `pass` or `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GateObservation {
    Flag(bool),
    Detail {
        #[serde(default)]
        pass: Option<bool>,
        #[serde(default)]
        status: Option<String>,
    },
}

impl GateObservation {
    /// `None` when the observation carries no usable outcome.
    pub fn passed(&self) -> Option<bool> {
        match self {
            Self::Flag(pass) => Some(*pass),
            Self::Detail {
                pass: Some(pass), ..
            } => Some(*pass),
            Self::Detail {
                pass: None,
                status: Some(status),
            } => Some(status.eq_ignore_ascii_case("pass")),
            Self::Detail { .. } => None,
        }
    }
}

/// One observed redaction outcome: a bare boolean or an object carrying
/// `pass` and/or a `misses` count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RedactionObservation {
    Flag(bool),
    Detail {
        #[serde(default)]
        pass: Option<bool>,
        #[serde(default)]
        misses: Option<f64>,
    },
}

impl RedactionObservation {
    /// `(pass, misses)`; `pass` is `None` when no outcome can be derived.
    pub fn outcome(&self) -> (Option<bool>, Option<f64>) {
        match self {
            Self::Flag(true) => (Some(true), Some(0.0)),
            Self::Flag(false) => (Some(false), None),
            Self::Detail {
                pass: Some(pass),
                misses,
            } => (Some(*pass), *misses),
            Self::Detail {
                pass: None,
                misses: Some(misses),
            } => (Some(*misses <= 0.0), Some(*misses)),
            Self::Detail { .. } => (None, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityRowType {
    SecurityGate,
    RedactionRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityResultRow {
    pub row_type: SecurityRowType,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub blocking: bool,
    pub pass: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misses: Option<f64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn lookup<'a, T>(observed: &'a BTreeMap<String, T>, id: &str, alias: &str) -> Option<&'a T> {
    observed.get(id).or_else(|| observed.get(alias))
}

fn gate_row(row: &SecurityGateRow, observed: Option<&GateObservation>) -> SecurityResultRow {
    let blocking = row.blocking || row.enforcement == "strict";
    let severity = Severity::blocking_if(blocking);
    let mut findings = Findings::new();
    match observed.and_then(GateObservation::passed) {
        None => findings.push(
            severity,
            format!("missing security-gate result for {} ({})", row.id, row.check),
        ),
        Some(false) => findings.push(
            severity,
            format!("security-gate failed for {} ({})", row.id, row.check),
        ),
        Some(true) => {}
    }
    SecurityResultRow {
        row_type: SecurityRowType::SecurityGate,
        id: row.id.clone(),
        check: Some(row.check.clone()),
        scope: Some(row.scope.clone()),
        enforcement: Some(row.enforcement.clone()),
        class: None,
        blocking,
        pass: findings.is_ok(),
        misses: None,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

fn redaction_row(
    row: &RedactionRuleRow,
    observed: Option<&RedactionObservation>,
) -> SecurityResultRow {
    let severity = Severity::blocking_if(row.blocking);
    let mut findings = Findings::new();
    let (pass, misses) = observed.map_or((None, None), RedactionObservation::outcome);
    match pass {
        None => findings.push(
            severity,
            format!("missing redaction result for {} ({})", row.id, row.class),
        ),
        Some(false) => {
            let suffix = misses.map(|count| format!(" misses={count}")).unwrap_or_default();
            findings.push(
                severity,
                format!("redaction rule failed for {} ({}){suffix}", row.id, row.class),
            );
        }
        Some(true) => {}
    }
    SecurityResultRow {
        row_type: SecurityRowType::RedactionRule,
        id: row.id.clone(),
        check: None,
        scope: None,
        enforcement: None,
        class: Some(row.class.clone()),
        blocking: row.blocking,
        pass: findings.is_ok(),
        misses,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

/// Gate rows are blocking when flagged so or enforced `strict`; redaction
/// rows only when flagged. Non-blocking misses and failures are warnings.
pub fn validate_security_gate_controls(
    schemas: &SchemaRegistry,
    security_gates: &Value,
    redaction_rules: &Value,
    gate_results: &BTreeMap<String, GateObservation>,
    redaction_results: &BTreeMap<String, RedactionObservation>,
) -> Validation<SecurityResultRow> {
    let gates = match schemas.project::<SecurityGateRow>(SECURITY_GATES, security_gates) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let redactions = match schemas.project::<RedactionRuleRow>(REDACTION_RULES, redaction_rules) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let mut rows = Vec::with_capacity(gates.len() + redactions.len());
    for gate in &gates {
        rows.push(gate_row(gate, lookup(gate_results, &gate.id, &gate.check)));
    }
    for rule in &redactions {
        rows.push(redaction_row(rule, lookup(redaction_results, &rule.id, &rule.class)));
    }

    let mut findings = Findings::new();
    for row in &rows {
        findings.errors.extend(row.errors.iter().cloned());
        findings.warnings.extend(row.warnings.iter().cloned());
    }
    tracing::debug!(
        gates = gates.len(),
        redactions = redactions.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated security gate controls"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: VALIDATION_REPORT,
    producer_id: "usr-security-gate-validator",
    run_id: "run-usr-security-gate-validation",
    finding_class: "security-gate",
};

pub fn build_security_gate_validation_report(
    schemas: &SchemaRegistry,
    security_gates: &Value,
    redaction_rules: &Value,
    gate_results: &BTreeMap<String, GateObservation>,
    redaction_results: &BTreeMap<String, RedactionObservation>,
    ctx: &ReportContext,
) -> BuiltReport<SecurityResultRow> {
    let validation = validate_security_gate_controls(
        schemas,
        security_gates,
        redaction_rules,
        gate_results,
        redaction_results,
    );
    let count_type = |row_type: SecurityRowType| {
        validation
            .rows
            .iter()
            .filter(|row| row.row_type == row_type)
            .count()
    };
    let (pass_count, fail_count) = pass_fail(&validation.rows, |row| row.pass);
    let blocking_failures = validation
        .rows
        .iter()
        .filter(|row| row.blocking && !row.pass)
        .count();

    let mut summary = Map::new();
    summary.insert("rowCount".into(), json!(validation.rows.len()));
    summary.insert(
        "securityGateRowCount".into(),
        json!(count_type(SecurityRowType::SecurityGate)),
    );
    summary.insert(
        "redactionRuleRowCount".into(),
        json!(count_type(SecurityRowType::RedactionRule)),
    );
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert("blockingFailureCount".into(), json!(blocking_failures));
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));
    BuiltReport::from_validation(
        validation,
        ctx,
        &REPORT_KIND,
        &Scope::lane(&ctx.lane),
        summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(id: &str, rows: Vec<Value>) -> Value {
        json!({
            "schemaVersion": "usr-registry-1.0.0",
            "registryId": id,
            "generatedAt": "2026-02-12T00:00:00Z",
            "generatedBy": "test",
            "rows": rows
        })
    }

    fn gates() -> Value {
        registry(
            "usr-security-gates",
            vec![
                json!({"id": "security-gate-runtime-exec", "check": "runtime_exec_disallowed", "scope": "runtime", "enforcement": "strict", "blocking": true}),
                json!({"id": "security-gate-path-traversal", "check": "path_traversal_guard", "scope": "filesystem", "enforcement": "advisory", "blocking": false}),
            ],
        )
    }

    fn redactions() -> Value {
        registry(
            "usr-redaction-rules",
            vec![
                json!({"id": "redact-private-key", "class": "private-key-material", "replacement": "[REDACTED]", "appliesTo": ["diagnostics"], "blocking": true}),
                json!({"id": "redact-email", "class": "email-address", "replacement": "[EMAIL]", "appliesTo": ["reports"], "blocking": false}),
            ],
        )
    }

    fn all_passing() -> (BTreeMap<String, GateObservation>, BTreeMap<String, RedactionObservation>) {
        let gate_results = serde_json::from_value(json!({
            "runtime_exec_disallowed": {"pass": true},
            "path_traversal_guard": true
        }))
        .expect("gate results should parse");
        let redaction_results = serde_json::from_value(json!({
            "private-key-material": {"pass": true, "misses": 0},
            "redact-email": {"misses": 0}
        }))
        .expect("redaction results should parse");
        (gate_results, redaction_results)
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn observations_decode_every_shape() {
        let status: GateObservation =
            serde_json::from_value(json!({"status": "PASS"})).expect("status form");
        assert_eq!(status.passed(), Some(true));
        let empty: GateObservation = serde_json::from_value(json!({})).expect("empty form");
        assert_eq!(empty.passed(), None);
        let misses: RedactionObservation =
            serde_json::from_value(json!({"misses": 2})).expect("misses form");
        assert_eq!(misses.outcome(), (Some(false), Some(2.0)));
        assert_eq!(RedactionObservation::Flag(true).outcome(), (Some(true), Some(0.0)));
    }

    #[test]
    fn passing_evidence_is_clean() {
        let (gate_results, redaction_results) = all_passing();
        let result = validate_security_gate_controls(
            &schemas(),
            &gates(),
            &redactions(),
            &gate_results,
            &redaction_results,
        );
        assert!(result.ok, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.rows.len(), 4);
    }

    #[test]
    fn blocking_failures_error_and_advisory_failures_warn() {
        let (mut gate_results, mut redaction_results) = all_passing();
        gate_results.insert("runtime_exec_disallowed".into(), GateObservation::Flag(false));
        gate_results.remove("path_traversal_guard");
        redaction_results.insert(
            "private-key-material".into(),
            RedactionObservation::Detail {
                pass: Some(false),
                misses: Some(1.0),
            },
        );
        let result = validate_security_gate_controls(
            &schemas(),
            &gates(),
            &redactions(),
            &gate_results,
            &redaction_results,
        );
        assert_eq!(
            result.errors,
            vec![
                "security-gate failed for security-gate-runtime-exec (runtime_exec_disallowed)",
                "redaction rule failed for redact-private-key (private-key-material) misses=1",
            ]
        );
        assert_eq!(
            result.warnings,
            vec!["missing security-gate result for security-gate-path-traversal (path_traversal_guard)"]
        );
    }

    #[test]
    fn strict_enforcement_blocks_even_without_flag() {
        let mut payload = gates();
        payload["rows"][0]["blocking"] = json!(false);
        let (mut gate_results, redaction_results) = all_passing();
        gate_results.clear();
        let result = validate_security_gate_controls(
            &schemas(),
            &payload,
            &redactions(),
            &gate_results,
            &redaction_results,
        );
        assert_eq!(
            result.errors,
            vec!["missing security-gate result for security-gate-runtime-exec (runtime_exec_disallowed)"]
        );
        assert!(result.rows[0].blocking);
    }

    #[test]
    fn report_counts_row_types() {
        let (gate_results, redaction_results) = all_passing();
        let report = build_security_gate_validation_report(
            &schemas(),
            &gates(),
            &redactions(),
            &gate_results,
            &redaction_results,
            &ReportContext::new("2026-02-12T00:00:00Z").with_lane("ci-long"),
        );
        assert!(report.ok);
        assert_eq!(report.payload.summary["securityGateRowCount"], json!(2));
        assert_eq!(report.payload.summary["redactionRuleRowCount"], json!(2));
        assert_eq!(report.payload.scope, Scope::lane("ci-long"));
        let check = schemas().validate_report(VALIDATION_REPORT, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }
}
