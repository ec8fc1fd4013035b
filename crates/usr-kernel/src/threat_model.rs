//! Threat model coverage: every threat must name controls and fixtures that
//! exist in the governed registries.

use crate::findings::{Findings, Severity};
use crate::registry::{
    AlertPolicyRow, FixtureGovernanceRow, RedactionRuleRow, SecurityGateRow,
    Severity as ThreatSeverity, ThreatModelRow, key_counts,
};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{
    ALERT_POLICIES, FIXTURE_GOVERNANCE, REDACTION_RULES, SECURITY_GATES, THREAT_MODEL_MATRIX,
};
use crate::schema::reports::THREAT_MODEL_COVERAGE_REPORT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Registries a threat model is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ThreatModelInputs<'a> {
    pub threat_model: &'a Value,
    pub fixture_governance: &'a Value,
    pub security_gates: &'a Value,
    pub alert_policies: &'a Value,
    pub redaction_rules: &'a Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    SecurityGate,
    RedactionRule,
    AlertPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThreatCoverageRow {
    pub id: String,
    pub threat_class: String,
    pub attack_surface: String,
    pub severity: ThreatSeverity,
    pub blocking: bool,
    pub control_count: usize,
    pub fixture_count: usize,
    pub missing_controls: Vec<String>,
    pub missing_fixtures: Vec<String>,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

struct Controls {
    /// Control id to its kind and whether it blocks on failure.
    by_id: BTreeMap<String, (ControlKind, bool)>,
    fixtures: BTreeMap<String, bool>,
}

impl Controls {
    fn load(
        schemas: &SchemaRegistry,
        inputs: &ThreatModelInputs<'_>,
    ) -> Result<Self, Vec<String>> {
        let gates = schemas
            .project::<SecurityGateRow>(SECURITY_GATES, inputs.security_gates)?
            .rows;
        let redactions = schemas
            .project::<RedactionRuleRow>(REDACTION_RULES, inputs.redaction_rules)?
            .rows;
        let alerts = schemas
            .project::<AlertPolicyRow>(ALERT_POLICIES, inputs.alert_policies)?
            .rows;
        let fixtures = schemas
            .project::<FixtureGovernanceRow>(FIXTURE_GOVERNANCE, inputs.fixture_governance)?
            .rows;

        let mut by_id = BTreeMap::new();
        for gate in gates {
            let blocking = gate.blocking || gate.enforcement == "strict";
            by_id.insert(gate.id, (ControlKind::SecurityGate, blocking));
        }
        for rule in redactions {
            by_id.insert(rule.id, (ControlKind::RedactionRule, rule.blocking));
        }
        for alert in alerts {
            by_id.insert(alert.id, (ControlKind::AlertPolicy, alert.blocking));
        }
        Ok(Self {
            by_id,
            fixtures: fixtures
                .into_iter()
                .map(|row| (row.fixture_id, row.blocking))
                .collect(),
        })
    }
}

fn check_threat(row: &ThreatModelRow, duplicate: bool, controls: &Controls) -> ThreatCoverageRow {
    let severity = Severity::blocking_if(row.blocking);
    let mut findings = Findings::new();
    if duplicate {
        findings.error("threat model id must be unique");
    }
    if row.severity == ThreatSeverity::Critical && !row.blocking {
        findings.error("critical threats must be blocking");
    }

    if row.required_controls.is_empty() {
        findings.push(severity, "requiredControls must not be empty");
    }
    let missing_controls: Vec<String> = row
        .required_controls
        .iter()
        .filter(|control| !controls.by_id.contains_key(control.as_str()))
        .cloned()
        .collect();
    for control in &missing_controls {
        findings.push(severity, format!("references unknown control {control}"));
    }
    let known_controls: Vec<(ControlKind, bool)> = row
        .required_controls
        .iter()
        .filter_map(|control| controls.by_id.get(control.as_str()).copied())
        .collect();
    if row.blocking
        && !known_controls.is_empty()
        && known_controls.iter().all(|(_, blocking)| !blocking)
    {
        findings.warning("blocking threat is covered only by non-blocking controls");
    }

    if row.required_fixtures.is_empty() {
        findings.push(severity, "requiredFixtures must not be empty");
    }
    let missing_fixtures: Vec<String> = row
        .required_fixtures
        .iter()
        .filter(|fixture| !controls.fixtures.contains_key(fixture.as_str()))
        .cloned()
        .collect();
    for fixture in &missing_fixtures {
        findings.push(severity, format!("references unknown fixture {fixture}"));
    }

    let pass = findings.is_ok();
    let findings = findings.prefixed(&row.id);
    ThreatCoverageRow {
        id: row.id.clone(),
        threat_class: row.threat_class.clone(),
        attack_surface: row.attack_surface.clone(),
        severity: row.severity,
        blocking: row.blocking,
        control_count: row.required_controls.len(),
        fixture_count: row.required_fixtures.len(),
        missing_controls,
        missing_fixtures,
        pass,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

/// Checks each threat's controls against security gates, redaction rules,
/// and alert policies, and its fixtures against fixture governance.
pub fn validate_threat_model_coverage(
    schemas: &SchemaRegistry,
    inputs: &ThreatModelInputs<'_>,
) -> Validation<ThreatCoverageRow> {
    let threats = match schemas.project::<ThreatModelRow>(THREAT_MODEL_MATRIX, inputs.threat_model)
    {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let controls = match Controls::load(schemas, inputs) {
        Ok(controls) => controls,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let counts = key_counts(threats.iter().map(|row| row.id.as_str()));
    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(threats.len());
    for row in &threats {
        let duplicate = counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        let checked = check_threat(row, duplicate, &controls);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(checked);
    }

    tracing::debug!(
        threats = rows.len(),
        controls = controls.by_id.len(),
        fixtures = controls.fixtures.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated threat model coverage"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: THREAT_MODEL_COVERAGE_REPORT,
    producer_id: "usr-threat-model-coverage-evaluator",
    run_id: "run-usr-threat-model-coverage",
    finding_class: "threat-model",
};

pub fn build_threat_model_coverage_report(
    schemas: &SchemaRegistry,
    inputs: &ThreatModelInputs<'_>,
    ctx: &ReportContext,
) -> BuiltReport<ThreatCoverageRow> {
    let validation = validate_threat_model_coverage(schemas, inputs);
    let rows = &validation.rows;
    let (pass_count, fail_count) = pass_fail(rows, |row| row.pass);

    let mut summary = Map::new();
    summary.insert("rowCount".into(), json!(rows.len()));
    summary.insert(
        "criticalThreatCount".into(),
        json!(rows.iter().filter(|row| row.severity == ThreatSeverity::Critical).count()),
    );
    summary.insert(
        "blockingThreatCount".into(),
        json!(rows.iter().filter(|row| row.blocking).count()),
    );
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert(
        "missingControlCount".into(),
        json!(rows.iter().map(|row| row.missing_controls.len()).sum::<usize>()),
    );
    summary.insert(
        "missingFixtureCount".into(),
        json!(rows.iter().map(|row| row.missing_fixtures.len()).sum::<usize>()),
    );
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));
    BuiltReport::from_validation(validation, ctx, &REPORT_KIND, &Scope::global(), summary)
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

    fn threat(id: &str, controls: &[&str], fixtures: &[&str], severity: &str) -> Value {
        json!({
            "id": id,
            "threatClass": id.trim_start_matches("threat-"),
            "attackSurface": "runtime",
            "requiredControls": controls,
            "requiredFixtures": fixtures,
            "severity": severity,
            "blocking": true
        })
    }

    fn fixture(id: &str) -> Value {
        json!({
            "fixtureId": id,
            "profileType": "cross-cutting",
            "profileId": "failure-injection",
            "conformanceLevels": ["C4"],
            "families": ["failure-injection"],
            "owner": "usr-security",
            "reviewers": ["usr-architecture", "usr-security"],
            "stabilityClass": "stable",
            "mutationPolicy": "require-review",
            "goldenRequired": true,
            "blocking": true
        })
    }

    struct Fixture {
        threats: Value,
        fixtures: Value,
        gates: Value,
        alerts: Value,
        redactions: Value,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                threats: registry(
                    "usr-threat-model-matrix",
                    vec![
                        threat(
                            "threat-untrusted-execution",
                            &["security-gate-runtime-sandbox"],
                            &["usr::failure-injection::runtime-exec-001"],
                            "critical",
                        ),
                        threat(
                            "threat-resource-exhaustion",
                            &["alert-memory-peak"],
                            &["usr::failure-injection::resource-budget-001"],
                            "high",
                        ),
                        threat(
                            "threat-sensitive-data-leakage",
                            &["redact-auth-token"],
                            &["usr::failure-injection::runtime-exec-001"],
                            "critical",
                        ),
                    ],
                ),
                fixtures: registry(
                    "usr-fixture-governance",
                    vec![
                        fixture("usr::failure-injection::runtime-exec-001"),
                        fixture("usr::failure-injection::resource-budget-001"),
                    ],
                ),
                gates: registry(
                    "usr-security-gates",
                    vec![json!({"id": "security-gate-runtime-sandbox", "check": "runtime_exec_disallowed", "scope": "runtime", "enforcement": "strict", "blocking": true})],
                ),
                alerts: registry(
                    "usr-alert-policies",
                    vec![json!({"id": "alert-memory-peak", "metric": "lane_peak_memory_mb", "threshold": 4096, "comparator": ">", "window": "5m", "severity": "high", "escalationPolicyId": "esc-slo-budget-breach", "blocking": true})],
                ),
                redactions: registry(
                    "usr-redaction-rules",
                    vec![json!({"id": "redact-auth-token", "class": "auth-token", "replacement": "[REDACTED_TOKEN]", "appliesTo": ["report.payload"], "blocking": true})],
                ),
            }
        }

        fn inputs(&self) -> ThreatModelInputs<'_> {
            ThreatModelInputs {
                threat_model: &self.threats,
                fixture_governance: &self.fixtures,
                security_gates: &self.gates,
                alert_policies: &self.alerts,
                redaction_rules: &self.redactions,
            }
        }
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn controls_resolve_across_registries() {
        let fixture = Fixture::new();
        let result = validate_threat_model_coverage(&schemas(), &fixture.inputs());
        assert!(result.ok, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.rows.len(), 3);
    }

    #[test]
    fn missing_control_and_fixture_block() {
        let mut fixture = Fixture::new();
        fixture.gates["rows"] = json!([]);
        fixture.threats["rows"][1]["requiredFixtures"] = json!(["usr::failure-injection::unknown-001"]);
        let result = validate_threat_model_coverage(&schemas(), &fixture.inputs());
        assert_eq!(
            result.errors,
            vec![
                "threat-untrusted-execution references unknown control security-gate-runtime-sandbox",
                "threat-resource-exhaustion references unknown fixture usr::failure-injection::unknown-001",
            ]
        );
        assert_eq!(
            result.rows[0].missing_controls,
            vec!["security-gate-runtime-sandbox"]
        );
    }

    #[test]
    fn critical_threats_must_block_even_when_advisory() {
        let mut fixture = Fixture::new();
        fixture.threats["rows"][2]["blocking"] = json!(false);
        fixture.threats["rows"][2]["requiredControls"] = json!(["redact-unknown"]);
        let result = validate_threat_model_coverage(&schemas(), &fixture.inputs());
        assert_eq!(
            result.errors,
            vec!["threat-sensitive-data-leakage critical threats must be blocking"]
        );
        assert_eq!(
            result.warnings,
            vec!["threat-sensitive-data-leakage references unknown control redact-unknown"]
        );
    }

    #[test]
    fn non_blocking_controls_are_advisory() {
        let mut fixture = Fixture::new();
        fixture.alerts["rows"][0]["blocking"] = json!(false);
        let result = validate_threat_model_coverage(&schemas(), &fixture.inputs());
        assert!(result.ok, "{:?}", result.errors);
        assert_eq!(
            result.warnings,
            vec!["threat-resource-exhaustion blocking threat is covered only by non-blocking controls"]
        );
    }

    #[test]
    fn report_counts_missing_references() {
        let mut fixture = Fixture::new();
        fixture.redactions["rows"] = json!([]);
        let report = build_threat_model_coverage_report(
            &schemas(),
            &fixture.inputs(),
            &ReportContext::new("2026-02-12T00:00:00Z"),
        );
        assert!(!report.ok);
        assert_eq!(report.payload.summary["missingControlCount"], json!(1));
        assert_eq!(report.payload.summary["criticalThreatCount"], json!(2));
        assert_eq!(report.payload.summary["failCount"], json!(1));
        let check =
            schemas().validate_report(THREAT_MODEL_COVERAGE_REPORT, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }
}
