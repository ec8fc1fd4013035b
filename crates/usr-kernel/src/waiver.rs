//! Waiver lifecycle evaluation against ownership and escalation governance.
//!
//! A waiver is expired once `allowedUntil <= evaluationTime` and expiring
//! soon within [`EXPIRY_WARNING_WINDOW_DAYS`] before that. The evaluation
//! time is always supplied by the caller.

use crate::findings::{Findings, Severity};
use crate::registry::{EscalationRow, OwnershipRow, WaiverRow, key_counts};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{ESCALATION_POLICY, OWNERSHIP_MATRIX, WAIVER_POLICY};
use crate::schema::reports::{WAIVER_ACTIVE_REPORT, WAIVER_EXPIRY_REPORT};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const WAIVER_SCOPE_TYPES: &[&str] = &[
    "artifact",
    "framework",
    "global",
    "lane",
    "language",
    "phase",
];

pub const DISALLOWED_WAIVER_CLASSES: &[&str] = &[
    "strict-security-bypass",
    "schema-contract-bypass",
    "redaction-bypass",
];

pub const EXPIRY_WARNING_WINDOW_DAYS: i64 = 14;

fn approver_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(usr|language|framework)-[a-z0-9]+(-[a-z0-9]+)*$")
            .expect("approver regex must compile")
    })
}

pub fn is_valid_approver(approver: &str) -> bool {
    approver_re().is_match(approver)
}

/// Parses an RFC 3339 timestamp, or a bare `YYYY-MM-DD` date at midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn days_rounded(delta_ms: i64) -> f64 {
    let days = delta_ms as f64 / 86_400_000.0;
    (days * 1000.0).round() / 1000.0
}

/// Where a waiver sits relative to the evaluation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryState {
    pub is_expired: bool,
    pub expires_soon: bool,
    pub expires_in_days: f64,
}

impl ExpiryState {
    pub fn at(allowed_until: DateTime<Utc>, evaluation_time: DateTime<Utc>) -> Self {
        let delta_ms = (allowed_until - evaluation_time).num_milliseconds();
        let is_expired = delta_ms <= 0;
        let window_ms = EXPIRY_WARNING_WINDOW_DAYS * 86_400_000;
        Self {
            is_expired,
            expires_soon: !is_expired && delta_ms <= window_ms,
            expires_in_days: days_rounded(delta_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaiverEvaluationRow {
    pub id: String,
    pub waiver_class: String,
    pub scope_type: String,
    pub scope_id: String,
    pub blocking: bool,
    pub allowed_until: String,
    pub is_expired: bool,
    pub expires_soon: bool,
    pub expires_in_days: Option<f64>,
    pub approvers: Vec<String>,
    pub required_compensating_controls: Vec<String>,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Inputs shared by the validator and both report views.
#[derive(Debug, Clone, Copy)]
pub struct WaiverInputs<'a> {
    pub waiver_policy: &'a Value,
    pub ownership_matrix: &'a Value,
    pub escalation_policy: &'a Value,
    pub evaluation_time: &'a str,
    pub strict_mode: bool,
}

/// Ownership roles, backup roles, and escalation approvers.
fn governance_approvers(
    ownership: &[OwnershipRow],
    escalation: &[EscalationRow],
) -> BTreeSet<String> {
    let mut approvers = BTreeSet::new();
    for row in ownership {
        approvers.insert(row.owner_role.clone());
        approvers.insert(row.backup_owner_role.clone());
    }
    for row in escalation {
        approvers.extend(row.required_approvers.iter().cloned());
    }
    approvers
}

/// `<reportId>.json` for every report schema plus declared evidence files.
fn known_compensating_artifacts(
    schemas: &SchemaRegistry,
    ownership: &[OwnershipRow],
) -> BTreeSet<String> {
    let mut artifacts: BTreeSet<String> = schemas
        .report_ids()
        .into_iter()
        .map(|id| format!("{id}.json"))
        .collect();
    for row in ownership {
        artifacts.extend(row.evidence_artifacts.iter().cloned());
    }
    artifacts
}

struct Governance {
    approvers: BTreeSet<String>,
    compensating: BTreeSet<String>,
}

fn evaluate_row(
    schemas: &SchemaRegistry,
    row: &WaiverRow,
    duplicate: bool,
    governance: &Governance,
    evaluation_time: DateTime<Utc>,
    strict_mode: bool,
) -> WaiverEvaluationRow {
    let mut findings = Findings::new();
    let escalate = Severity::blocking_if(strict_mode || row.blocking);

    if duplicate {
        findings.error("waiver id must be unique within waiver-policy matrix");
    }
    if !WAIVER_SCOPE_TYPES.contains(&row.scope_type.as_str()) {
        findings.error(format!("unsupported scopeType: {}", row.scope_type));
    }
    if row.scope_type == "artifact" && !schemas.is_known_report(&row.scope_id) {
        findings.error(format!(
            "artifact scopeId is not a known USR report artifact: {}",
            row.scope_id
        ));
    }
    if DISALLOWED_WAIVER_CLASSES.contains(&row.waiver_class.as_str()) {
        findings.error(format!(
            "waiverClass is disallowed by policy: {}",
            row.waiver_class
        ));
    }

    if row.approvers.is_empty() {
        findings.error("approvers must contain at least one approver role");
    }
    let distinct: BTreeSet<&String> = row.approvers.iter().collect();
    if distinct.len() != row.approvers.len() {
        findings.error("approvers must be unique within a waiver row");
    }
    for approver in &row.approvers {
        if !is_valid_approver(approver) {
            findings.error(format!(
                "approver id must match governance naming policy: {approver}"
            ));
        }
    }
    if row.blocking {
        if row.approvers.len() < 2 {
            findings.error("blocking waivers require at least two approvers");
        }
        if !row
            .approvers
            .iter()
            .any(|approver| governance.approvers.contains(approver))
        {
            findings.error(
                "blocking waivers require at least one approver in ownership/escalation governance roles",
            );
        }
    }

    if row.required_compensating_controls.is_empty() {
        findings.error("requiredCompensatingControls must include at least one evidence artifact");
    }
    for artifact in &row.required_compensating_controls {
        if !artifact.ends_with(".json") {
            findings.error(format!(
                "compensating control must reference a JSON evidence artifact: {artifact}"
            ));
            continue;
        }
        if !governance.compensating.contains(artifact) {
            findings.push(
                escalate,
                format!("compensating control does not map to a governed report artifact: {artifact}"),
            );
        }
    }

    let mut state = None;
    match parse_timestamp(&row.allowed_until) {
        None => findings.error(format!(
            "allowedUntil must be a valid ISO 8601 timestamp: {}",
            row.allowed_until
        )),
        Some(allowed_until) => {
            let expiry = ExpiryState::at(allowed_until, evaluation_time);
            if expiry.is_expired {
                findings.push(
                    escalate,
                    format!(
                        "waiver is expired at evaluationTime={}",
                        evaluation_time.to_rfc3339_opts(SecondsFormat::Millis, true)
                    ),
                );
            } else if expiry.expires_soon {
                findings.warning("waiver expires within 14 days and requires renewal planning");
            }
            state = Some(expiry);
        }
    }

    let pass = findings.is_ok();
    let findings = findings.prefixed(&row.id);
    WaiverEvaluationRow {
        id: row.id.clone(),
        waiver_class: row.waiver_class.clone(),
        scope_type: row.scope_type.clone(),
        scope_id: row.scope_id.clone(),
        blocking: row.blocking,
        allowed_until: row.allowed_until.clone(),
        is_expired: state.is_some_and(|s| s.is_expired),
        expires_soon: state.is_some_and(|s| s.expires_soon),
        expires_in_days: state.map(|s| s.expires_in_days),
        approvers: row.approvers.clone(),
        required_compensating_controls: row.required_compensating_controls.clone(),
        pass,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

/// Validates every waiver row. Schema failures in any of the three
/// registries short-circuit with that registry's errors.
pub fn validate_waiver_policy(
    schemas: &SchemaRegistry,
    inputs: &WaiverInputs<'_>,
) -> Validation<WaiverEvaluationRow> {
    let waivers = match schemas.project::<WaiverRow>(WAIVER_POLICY, inputs.waiver_policy) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let ownership = match schemas.project::<OwnershipRow>(OWNERSHIP_MATRIX, inputs.ownership_matrix)
    {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let escalation =
        match schemas.project::<EscalationRow>(ESCALATION_POLICY, inputs.escalation_policy) {
            Ok(registry) => registry.rows,
            Err(errors) => return Validation::schema_failure(errors),
        };
    let Some(evaluation_time) = parse_timestamp(inputs.evaluation_time) else {
        return Validation::schema_failure(vec![format!(
            "invalid evaluationTime timestamp: {}",
            inputs.evaluation_time
        )]);
    };

    let governance = Governance {
        approvers: governance_approvers(&ownership, &escalation),
        compensating: known_compensating_artifacts(schemas, &ownership),
    };
    let counts = key_counts(waivers.iter().map(|row| row.id.as_str()));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(waivers.len());
    for row in &waivers {
        let duplicate = counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        let evaluated = evaluate_row(
            schemas,
            row,
            duplicate,
            &governance,
            evaluation_time,
            inputs.strict_mode,
        );
        findings.errors.extend(evaluated.errors.iter().cloned());
        findings.warnings.extend(evaluated.warnings.iter().cloned());
        rows.push(evaluated);
    }

    tracing::debug!(
        waivers = rows.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "evaluated waiver policy"
    );
    Validation::from_findings(findings, rows)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWaiverRow {
    pub id: String,
    pub waiver_class: String,
    pub scope_type: String,
    pub scope_id: String,
    pub blocking: bool,
    pub allowed_until: String,
    pub expires_soon: bool,
    pub expires_in_days: Option<f64>,
    pub approvers: Vec<String>,
    pub required_compensating_controls: Vec<String>,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryWaiverRow {
    pub id: String,
    pub waiver_class: String,
    pub scope_type: String,
    pub scope_id: String,
    pub blocking: bool,
    pub allowed_until: String,
    pub is_expired: bool,
    pub expires_soon: bool,
    pub expires_in_days: Option<f64>,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

const ACTIVE_KIND: ReportKind = ReportKind {
    artifact_id: WAIVER_ACTIVE_REPORT,
    producer_id: "usr-waiver-policy-validator",
    run_id: "run-usr-waiver-active-report",
    finding_class: "waiver-policy",
};

const EXPIRY_KIND: ReportKind = ReportKind {
    artifact_id: WAIVER_EXPIRY_REPORT,
    producer_id: "usr-waiver-policy-validator",
    run_id: "run-usr-waiver-expiry-report",
    finding_class: "waiver-policy",
};

/// `usr-waiver-active-report`: unexpired waivers only. Findings still cover
/// every row.
pub fn build_waiver_active_report(
    schemas: &SchemaRegistry,
    inputs: &WaiverInputs<'_>,
    ctx: &ReportContext,
) -> BuiltReport<ActiveWaiverRow> {
    let validation = validate_waiver_policy(schemas, inputs);
    let waiver_count = validation.rows.len();
    let rows: Vec<ActiveWaiverRow> = validation
        .rows
        .iter()
        .filter(|row| !row.is_expired)
        .map(|row| ActiveWaiverRow {
            id: row.id.clone(),
            waiver_class: row.waiver_class.clone(),
            scope_type: row.scope_type.clone(),
            scope_id: row.scope_id.clone(),
            blocking: row.blocking,
            allowed_until: row.allowed_until.clone(),
            expires_soon: row.expires_soon,
            expires_in_days: row.expires_in_days,
            approvers: row.approvers.clone(),
            required_compensating_controls: row.required_compensating_controls.clone(),
            pass: row.pass,
            errors: row.errors.clone(),
            warnings: row.warnings.clone(),
        })
        .collect();

    let (_, fail_count) = pass_fail(&rows, |row| row.pass);
    let mut summary = Map::new();
    summary.insert("evaluationTime".into(), json!(inputs.evaluation_time));
    summary.insert("waiverCount".into(), json!(waiver_count));
    summary.insert("activeCount".into(), json!(rows.len()));
    summary.insert(
        "blockingActiveCount".into(),
        json!(rows.iter().filter(|row| row.blocking).count()),
    );
    summary.insert(
        "expiringSoonCount".into(),
        json!(rows.iter().filter(|row| row.expires_soon).count()),
    );
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));

    let projected = Validation {
        ok: validation.ok,
        errors: validation.errors,
        warnings: validation.warnings,
        rows,
    };
    BuiltReport::from_validation(projected, ctx, &ACTIVE_KIND, &Scope::global(), summary)
}

/// `usr-waiver-expiry-report`: every waiver annotated with its expiry state.
pub fn build_waiver_expiry_report(
    schemas: &SchemaRegistry,
    inputs: &WaiverInputs<'_>,
    ctx: &ReportContext,
) -> BuiltReport<ExpiryWaiverRow> {
    let validation = validate_waiver_policy(schemas, inputs);
    let rows: Vec<ExpiryWaiverRow> = validation
        .rows
        .iter()
        .map(|row| ExpiryWaiverRow {
            id: row.id.clone(),
            waiver_class: row.waiver_class.clone(),
            scope_type: row.scope_type.clone(),
            scope_id: row.scope_id.clone(),
            blocking: row.blocking,
            allowed_until: row.allowed_until.clone(),
            is_expired: row.is_expired,
            expires_soon: row.expires_soon,
            expires_in_days: row.expires_in_days,
            pass: row.pass,
            errors: row.errors.clone(),
            warnings: row.warnings.clone(),
        })
        .collect();

    let mut summary = Map::new();
    summary.insert("evaluationTime".into(), json!(inputs.evaluation_time));
    summary.insert("waiverCount".into(), json!(rows.len()));
    summary.insert(
        "expiredCount".into(),
        json!(rows.iter().filter(|row| row.is_expired).count()),
    );
    summary.insert(
        "expiringSoonCount".into(),
        json!(rows.iter().filter(|row| row.expires_soon).count()),
    );
    summary.insert(
        "blockingExpiredCount".into(),
        json!(rows.iter().filter(|row| row.blocking && row.is_expired).count()),
    );
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));

    let projected = Validation {
        ok: validation.ok,
        errors: validation.errors,
        warnings: validation.warnings,
        rows,
    };
    BuiltReport::from_validation(projected, ctx, &EXPIRY_KIND, &Scope::global(), summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVALUATION_TIME: &str = "2026-02-12T00:00:00Z";

    fn registry(id: &str, rows: Vec<Value>) -> Value {
        json!({
            "schemaVersion": "usr-registry-1.0.0",
            "registryId": id,
            "generatedAt": EVALUATION_TIME,
            "generatedBy": "test",
            "rows": rows
        })
    }

    fn waiver(id: &str, blocking: bool, approvers: &[&str], allowed_until: &str) -> Value {
        json!({
            "id": id,
            "waiverClass": "benchmark-overrun",
            "scopeType": "lane",
            "scopeId": "ci-long",
            "allowedUntil": allowed_until,
            "approvers": approvers,
            "requiredCompensatingControls": ["usr-benchmark-regression-summary.json"],
            "maxExtensions": 1,
            "blocking": blocking
        })
    }

    fn ownership() -> Value {
        registry(
            "usr-ownership-matrix",
            vec![json!({
                "id": "own-benchmark",
                "domain": "benchmark",
                "ownerRole": "usr-performance",
                "backupOwnerRole": "usr-operations",
                "escalationPolicyId": "esc-benchmark-regression",
                "evidenceArtifacts": ["usr-benchmark-summary.json"],
                "blocking": true
            })],
        )
    }

    fn escalation() -> Value {
        registry(
            "usr-escalation-policy",
            vec![json!({
                "id": "esc-benchmark-regression",
                "triggerClass": "benchmark-regression",
                "severity": "high",
                "requiredApprovers": ["usr-architecture"],
                "maxAckMinutes": 30,
                "maxResolutionMinutes": 240,
                "autoBlockPromotion": true
            })],
        )
    }

    fn evaluate(rows: Vec<Value>, strict_mode: bool) -> Validation<WaiverEvaluationRow> {
        let schemas = SchemaRegistry::build().expect("schemas should compile");
        let policy = registry("usr-waiver-policy", rows);
        let ownership = ownership();
        let escalation = escalation();
        validate_waiver_policy(
            &schemas,
            &WaiverInputs {
                waiver_policy: &policy,
                ownership_matrix: &ownership,
                escalation_policy: &escalation,
                evaluation_time: EVALUATION_TIME,
                strict_mode,
            },
        )
    }

    #[test]
    fn governed_waiver_passes() {
        let result = evaluate(
            vec![waiver(
                "waiver-a",
                true,
                &["usr-architecture", "usr-operations"],
                "2026-04-01T00:00:00Z",
            )],
            true,
        );
        assert!(result.ok, "{:?}", result.errors);
        assert_eq!(result.rows[0].expires_in_days, Some(48.0));
    }

    #[test]
    fn blocking_waiver_needs_two_approvers() {
        let result = evaluate(
            vec![waiver("waiver-a", true, &["usr-team-a"], "2026-04-01T00:00:00Z")],
            true,
        );
        assert!(!result.ok);
        assert!(
            result
                .errors
                .contains(&"waiver-a blocking waivers require at least two approvers".to_string())
        );
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let evaluation = parse_timestamp(EVALUATION_TIME).expect("timestamp");
        let at = ExpiryState::at(evaluation, evaluation);
        assert!(at.is_expired);
        let one_second_before = ExpiryState::at(
            evaluation + chrono::Duration::seconds(1),
            evaluation,
        );
        assert!(!one_second_before.is_expired);
        assert!(one_second_before.expires_soon);
    }

    #[test]
    fn expired_non_blocking_waiver_warns_outside_strict_mode() {
        let row = waiver(
            "waiver-b",
            false,
            &["usr-architecture"],
            "2026-01-01T00:00:00Z",
        );
        let relaxed = evaluate(vec![row.clone()], false);
        assert!(relaxed.ok);
        assert_eq!(
            relaxed.warnings,
            vec!["waiver-b waiver is expired at evaluationTime=2026-02-12T00:00:00.000Z"]
        );

        let strict = evaluate(vec![row], true);
        assert!(!strict.ok);
    }

    #[test]
    fn disallowed_class_always_errors() {
        let mut row = waiver("waiver-c", false, &["usr-architecture"], "2026-04-01");
        row["waiverClass"] = json!("redaction-bypass");
        let result = evaluate(vec![row], false);
        assert_eq!(
            result.errors,
            vec!["waiver-c waiverClass is disallowed by policy: redaction-bypass"]
        );
    }

    #[test]
    fn approver_pattern() {
        assert!(is_valid_approver("usr-architecture"));
        assert!(is_valid_approver("language-javascript-owners"));
        assert!(!is_valid_approver("team-a"));
        assert!(!is_valid_approver("usr-"));
        assert!(!is_valid_approver("usr-Arch"));
    }

    #[test]
    fn active_report_excludes_expired_rows() {
        let schemas = SchemaRegistry::build().expect("schemas should compile");
        let policy = registry(
            "usr-waiver-policy",
            vec![
                waiver("waiver-live", false, &["usr-architecture"], "2026-04-01T00:00:00Z"),
                waiver("waiver-old", false, &["usr-architecture"], "2026-01-01T00:00:00Z"),
            ],
        );
        let ownership = ownership();
        let escalation = escalation();
        let inputs = WaiverInputs {
            waiver_policy: &policy,
            ownership_matrix: &ownership,
            escalation_policy: &escalation,
            evaluation_time: EVALUATION_TIME,
            strict_mode: false,
        };
        let ctx = ReportContext::new(EVALUATION_TIME);

        let active = build_waiver_active_report(&schemas, &inputs, &ctx);
        assert_eq!(active.rows.len(), 1);
        assert_eq!(active.rows[0].id, "waiver-live");
        assert_eq!(active.payload.rows, crate::report::rows_to_values(&active.rows, &mut Vec::new()));
        assert_eq!(active.payload.summary["waiverCount"], json!(2));
        assert!(schemas.validate_report(WAIVER_ACTIVE_REPORT, &active.payload.to_value().expect("envelope serializes")).ok);

        let expiry = build_waiver_expiry_report(&schemas, &inputs, &ctx);
        assert_eq!(expiry.rows.len(), 2);
        assert_eq!(expiry.payload.summary["expiredCount"], json!(1));
        assert!(schemas.validate_report(WAIVER_EXPIRY_REPORT, &expiry.payload.to_value().expect("envelope serializes")).ok);
    }
}
