//! Operational readiness and the release readiness scorecard.
//!
//! Both layer policy-shape blockers on top of
//! [`crate::conformance::evaluate_promotion_readiness`].

use crate::conformance::{
    Blocker, ConformanceInputs, ExternalBlockers, Gate, LevelStatus, PromotionReadiness,
    ReadinessFlags, evaluate_promotion_readiness, union_blockers,
};
use crate::findings::Findings;
use crate::registry::{ConformanceLevel, OperationalPhase, OperationalReadinessRow, QualityGateRow};
use crate::report::{EvidenceEnvelope, ReportContext, ReportKind, Scope, rows_to_values};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{OPERATIONAL_READINESS_POLICY, QUALITY_GATES};
use crate::schema::reports::{OPERATIONAL_READINESS_VALIDATION, RELEASE_READINESS_SCORECARD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

pub const REQUIRED_OPERATIONAL_PHASES: [OperationalPhase; 4] = [
    OperationalPhase::PreCutover,
    OperationalPhase::Cutover,
    OperationalPhase::Incident,
    OperationalPhase::PostCutover,
];

pub const REQUIRED_BLOCKING_OPERATIONAL_PHASES: [OperationalPhase; 3] = [
    OperationalPhase::PreCutover,
    OperationalPhase::Cutover,
    OperationalPhase::Incident,
];

pub const REQUIRED_BLOCKING_QUALITY_DOMAINS: [&str; 4] =
    ["framework-binding", "minimum-slice", "provenance", "resolution"];

const OPERATIONAL_POLICY: &str = "operational-readiness-policy";
const QUALITY_POLICY: &str = "quality-gates-policy";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessRowType {
    OperationalPhase,
    QualityGate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessRow {
    pub row_type: ReadinessRowType,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<OperationalPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationalInputs<'a> {
    pub operational_readiness_policy: &'a Value,
    pub quality_gates: &'a Value,
    pub conformance: ConformanceInputs<'a>,
    pub missing_artifact_schemas: &'a [String],
    pub failing_blocking_gate_ids: &'a [String],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationalReadiness {
    pub ok: bool,
    pub blocked: bool,
    pub blockers: Vec<Blocker>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<ReadinessRow>,
    pub conformance_by_level: BTreeMap<ConformanceLevel, LevelStatus>,
    pub readiness: ReadinessFlags,
    #[serde(skip)]
    pub failing_blocking_gate_ids: Vec<String>,
}

impl OperationalReadiness {
    fn invalid(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            blocked: true,
            blockers: Vec::new(),
            errors,
            warnings: Vec::new(),
            rows: Vec::new(),
            conformance_by_level: BTreeMap::new(),
            readiness: ReadinessFlags::all_blocked(),
            failing_blocking_gate_ids: Vec::new(),
        }
    }

    pub fn blocker_strings(&self) -> Vec<String> {
        self.blockers.iter().map(ToString::to_string).collect()
    }
}

fn policy_blocker(policy: &'static str, subject: Option<&str>, reason: &'static str) -> Blocker {
    Blocker::Policy {
        policy,
        subject: subject.map(str::to_string),
        reason,
    }
}

fn has_duplicates(items: &[String]) -> bool {
    items.iter().collect::<BTreeSet<_>>().len() != items.len()
}

fn check_operational_row(row: &OperationalReadinessRow) -> ReadinessRow {
    let mut findings = Findings::new();
    if row.runbook_id.trim().is_empty() {
        findings.error("runbookId must be non-empty");
    }
    if row.required_roles.is_empty() {
        findings.error("must define at least one required role");
    } else if has_duplicates(&row.required_roles) {
        findings.error("requiredRoles must not contain duplicates");
    }
    if row.required_artifacts.is_empty() {
        findings.error("must define at least one required artifact");
    } else if has_duplicates(&row.required_artifacts) {
        findings.error("requiredArtifacts must not contain duplicates");
    }
    if row.max_recovery_minutes < row.max_response_minutes {
        findings.error("maxRecoveryMinutes must be >= maxResponseMinutes");
    }
    let findings = findings.prefixed(&row.id);
    ReadinessRow {
        row_type: ReadinessRowType::OperationalPhase,
        id: row.id.clone(),
        phase: Some(row.phase),
        domain: None,
        blocking: row.blocking,
        pass: findings.is_ok(),
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

fn check_quality_row(row: &QualityGateRow, failing: bool) -> ReadinessRow {
    let mut findings = Findings::new();
    if row.fixture_set_id.trim().is_empty() {
        findings.error("fixtureSetId must be non-empty");
    }
    if !row.threshold_value.is_finite() {
        findings.error("thresholdValue must be numeric");
    }
    let findings = findings.prefixed(&row.id);
    ReadinessRow {
        row_type: ReadinessRowType::QualityGate,
        id: row.id.clone(),
        phase: None,
        domain: Some(row.domain.clone()),
        blocking: row.blocking,
        pass: findings.is_ok() && !failing,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

/// Checks phase and quality-gate policy shape, then folds in promotion
/// readiness. Policy blockers precede promotion blockers.
pub fn evaluate_operational_readiness(
    schemas: &SchemaRegistry,
    inputs: &OperationalInputs<'_>,
) -> OperationalReadiness {
    let operational = match schemas
        .project::<OperationalReadinessRow>(OPERATIONAL_READINESS_POLICY, inputs.operational_readiness_policy)
    {
        Ok(registry) => registry.rows,
        Err(errors) => return OperationalReadiness::invalid(errors),
    };
    let quality = match schemas.project::<QualityGateRow>(QUALITY_GATES, inputs.quality_gates) {
        Ok(registry) => registry.rows,
        Err(errors) => return OperationalReadiness::invalid(errors),
    };

    let mut findings = Findings::new();
    let mut blockers = Vec::new();

    let phases: BTreeSet<OperationalPhase> = operational.iter().map(|row| row.phase).collect();
    for phase in REQUIRED_OPERATIONAL_PHASES {
        if !phases.contains(&phase) {
            findings.error(format!(
                "operational readiness policy missing required phase: {}",
                phase.as_str()
            ));
            blockers.push(policy_blocker(OPERATIONAL_POLICY, Some(phase.as_str()), "missing-phase"));
        }
    }

    for phase in REQUIRED_BLOCKING_OPERATIONAL_PHASES {
        let mut phase_rows = operational.iter().filter(|row| row.phase == phase).peekable();
        if phase_rows.peek().is_none() {
            findings.error(format!(
                "operational readiness policy missing phase rows for {}",
                phase.as_str()
            ));
            blockers.push(policy_blocker(
                OPERATIONAL_POLICY,
                Some(phase.as_str()),
                "missing-phase-rows",
            ));
            continue;
        }
        if !phase_rows.any(|row| row.blocking) {
            findings.error(format!(
                "operational readiness policy phase {} requires at least one blocking row",
                phase.as_str()
            ));
            blockers.push(policy_blocker(
                OPERATIONAL_POLICY,
                Some(phase.as_str()),
                "missing-blocking-row",
            ));
        }
    }

    let blocking_quality: Vec<&QualityGateRow> = quality.iter().filter(|row| row.blocking).collect();
    if blocking_quality.is_empty() {
        findings.error("quality gates policy must include blocking rows");
        blockers.push(policy_blocker(QUALITY_POLICY, None, "missing-blocking-rows"));
    }

    let blocking_domains: BTreeSet<&str> =
        blocking_quality.iter().map(|row| row.domain.as_str()).collect();
    for domain in REQUIRED_BLOCKING_QUALITY_DOMAINS {
        if !blocking_domains.contains(domain) {
            findings.error(format!("quality gates policy missing blocking domain: {domain}"));
            blockers.push(policy_blocker(
                QUALITY_POLICY,
                Some(domain),
                "missing-blocking-domain",
            ));
        }
    }

    let blocking_ids: BTreeSet<&str> = blocking_quality.iter().map(|row| row.id.as_str()).collect();
    let mut failing_ids = Vec::new();
    for gate_id in inputs.failing_blocking_gate_ids {
        if blocking_ids.contains(gate_id.as_str()) {
            failing_ids.push(gate_id.clone());
        } else {
            findings.warning(format!(
                "failing gate id does not map to blocking quality gate: {gate_id}"
            ));
        }
    }

    let promotion = evaluate_promotion_readiness(
        schemas,
        &inputs.conformance,
        &ExternalBlockers {
            failing_blocking_gate_ids: &failing_ids,
            missing_artifacts: inputs.missing_artifact_schemas,
        },
    );

    let mut rows: Vec<ReadinessRow> = operational.iter().map(check_operational_row).collect();
    let failing: BTreeSet<&str> = failing_ids.iter().map(String::as_str).collect();
    rows.extend(
        quality
            .iter()
            .map(|row| check_quality_row(row, failing.contains(row.id.as_str()))),
    );
    for row in &rows {
        findings.errors.extend(row.errors.iter().cloned());
        findings.warnings.extend(row.warnings.iter().cloned());
    }

    let PromotionReadiness {
        blockers: promotion_blockers,
        readiness,
        conformance_by_level,
        errors: promotion_errors,
        warnings: promotion_warnings,
        ..
    } = promotion;

    let blockers = union_blockers(blockers, promotion_blockers);
    findings.errors.extend(promotion_errors);
    findings.warnings.extend(promotion_warnings);

    let blocked = !blockers.is_empty() || !findings.errors.is_empty();
    tracing::debug!(
        rows = rows.len(),
        blockers = blockers.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "evaluated operational readiness"
    );
    OperationalReadiness {
        ok: !blocked,
        blocked,
        blockers,
        errors: findings.errors,
        warnings: findings.warnings,
        rows,
        conformance_by_level,
        readiness,
        failing_blocking_gate_ids: failing_ids,
    }
}

/// `<rowId>:<artifact>` for every required artifact that has no report schema.
pub fn missing_artifact_schemas(schemas: &SchemaRegistry, operational_policy: &Value) -> Vec<String> {
    let Ok(registry) =
        schemas.project::<OperationalReadinessRow>(OPERATIONAL_READINESS_POLICY, operational_policy)
    else {
        return Vec::new();
    };
    registry
        .rows
        .iter()
        .flat_map(|row| {
            row.required_artifacts
                .iter()
                .filter(|artifact| {
                    !schemas.is_known_report(artifact.strip_suffix(".json").unwrap_or(artifact))
                })
                .map(move |artifact| format!("{}:{artifact}", row.id))
        })
        .collect()
}

/// Report payload plus the evaluation it was built from.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport<R> {
    pub ok: bool,
    pub blocked: bool,
    pub blockers: Vec<Blocker>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<R>,
    pub payload: EvidenceEnvelope,
}

fn blocking_messages(evaluation: &OperationalReadiness) -> Vec<String> {
    let mut messages = evaluation.blocker_strings();
    messages.extend(evaluation.errors.iter().cloned());
    messages
}

fn shared_summary(evaluation: &OperationalReadiness) -> Map<String, Value> {
    let mut summary = Map::new();
    summary.insert("blocked".into(), json!(evaluation.blocked));
    summary.insert("blockerCount".into(), json!(evaluation.blockers.len()));
    summary.insert("errorCount".into(), json!(evaluation.errors.len()));
    summary.insert("warningCount".into(), json!(evaluation.warnings.len()));
    summary
}

const OPERATIONAL_KIND: ReportKind = ReportKind {
    artifact_id: OPERATIONAL_READINESS_VALIDATION,
    producer_id: "usr-operational-readiness-validator",
    run_id: "run-usr-operational-readiness-validation",
    finding_class: "operational-readiness",
};

pub fn build_operational_readiness_report(
    schemas: &SchemaRegistry,
    inputs: &OperationalInputs<'_>,
    ctx: &ReportContext,
) -> ReadinessReport<ReadinessRow> {
    let mut evaluation = evaluate_operational_readiness(schemas, inputs);
    let row_values = rows_to_values(&evaluation.rows, &mut evaluation.errors);
    evaluation.ok &= evaluation.errors.is_empty();
    let phase_rows = evaluation
        .rows
        .iter()
        .filter(|row| row.row_type == ReadinessRowType::OperationalPhase)
        .count();

    let mut summary = shared_summary(&evaluation);
    summary.insert("rowCount".into(), json!(evaluation.rows.len()));
    summary.insert("operationalPhaseRowCount".into(), json!(phase_rows));
    summary.insert(
        "qualityGateRowCount".into(),
        json!(evaluation.rows.len() - phase_rows),
    );
    summary.insert("readiness".into(), json!(evaluation.readiness));
    summary.insert(
        "conformanceByLevel".into(),
        json!(evaluation.conformance_by_level),
    );

    let payload = EvidenceEnvelope::build(
        ctx,
        &OPERATIONAL_KIND,
        &Scope::lane(&ctx.lane),
        summary,
        &blocking_messages(&evaluation),
        &evaluation.warnings,
        row_values,
    );
    ReadinessReport {
        ok: evaluation.ok,
        blocked: evaluation.blocked,
        blockers: evaluation.blockers,
        errors: evaluation.errors,
        warnings: evaluation.warnings,
        rows: evaluation.rows,
        payload,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScorecardRowType {
    ReadinessGate,
    QualityGate,
    OperationalPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScorecardRow {
    pub row_type: ScorecardRowType,
    pub id: String,
    pub levels: Vec<ConformanceLevel>,
    pub blocking: bool,
    pub pass: bool,
}

fn gate_id(gate: Gate) -> &'static str {
    match gate {
        Gate::TestRollout => "test-rollout",
        Gate::DeepConformance => "deep-conformance",
        Gate::FrameworkConformance => "framework-conformance",
    }
}

fn gate_blocked(flags: &ReadinessFlags, gate: Gate) -> bool {
    match gate {
        Gate::TestRollout => flags.test_rollout_blocked,
        Gate::DeepConformance => flags.deep_conformance_blocked,
        Gate::FrameworkConformance => flags.framework_conformance_blocked,
    }
}

const SCORECARD_KIND: ReportKind = ReportKind {
    artifact_id: RELEASE_READINESS_SCORECARD,
    producer_id: "usr-release-readiness-scorecard-builder",
    run_id: "run-usr-release-readiness-scorecard",
    finding_class: "release-readiness",
};

/// One row per readiness gate, then blocking quality gates, then
/// blocking operational phases.
pub fn build_release_readiness_scorecard(
    schemas: &SchemaRegistry,
    inputs: &OperationalInputs<'_>,
    ctx: &ReportContext,
) -> ReadinessReport<ScorecardRow> {
    let mut evaluation = evaluate_operational_readiness(schemas, inputs);

    let mut rows: Vec<ScorecardRow> = Gate::ALL
        .into_iter()
        .map(|gate| ScorecardRow {
            row_type: ScorecardRowType::ReadinessGate,
            id: gate_id(gate).to_string(),
            levels: gate.levels().to_vec(),
            blocking: true,
            pass: !gate_blocked(&evaluation.readiness, gate),
        })
        .collect();
    let failing: BTreeSet<&str> = evaluation
        .failing_blocking_gate_ids
        .iter()
        .map(String::as_str)
        .collect();
    rows.extend(
        evaluation
            .rows
            .iter()
            .filter(|row| row.blocking)
            .map(|row| ScorecardRow {
                row_type: match row.row_type {
                    ReadinessRowType::QualityGate => ScorecardRowType::QualityGate,
                    ReadinessRowType::OperationalPhase => ScorecardRowType::OperationalPhase,
                },
                id: row.id.clone(),
                levels: Vec::new(),
                blocking: true,
                pass: row.pass && !failing.contains(row.id.as_str()),
            }),
    );

    let row_values = rows_to_values(&rows, &mut evaluation.errors);
    evaluation.ok &= evaluation.errors.is_empty();

    let gate_pass = rows
        .iter()
        .filter(|row| row.row_type == ScorecardRowType::ReadinessGate && row.pass)
        .count();
    let failing_rows = rows.iter().filter(|row| !row.pass).count();

    let mut summary = shared_summary(&evaluation);
    summary.insert("releaseReady".into(), json!(evaluation.ok));
    summary.insert("rowCount".into(), json!(rows.len()));
    summary.insert("readinessGatePassCount".into(), json!(gate_pass));
    summary.insert(
        "readinessGateFailCount".into(),
        json!(Gate::ALL.len() - gate_pass),
    );
    summary.insert("failingRowCount".into(), json!(failing_rows));
    summary.insert(
        "failingBlockingGateCount".into(),
        json!(evaluation.failing_blocking_gate_ids.len()),
    );
    summary.insert("readiness".into(), json!(evaluation.readiness));
    summary.insert(
        "conformanceByLevel".into(),
        json!(evaluation.conformance_by_level),
    );

    let payload = EvidenceEnvelope::build(
        ctx,
        &SCORECARD_KIND,
        &Scope::lane(&ctx.lane),
        summary,
        &blocking_messages(&evaluation),
        &evaluation.warnings,
        row_values,
    );
    tracing::debug!(
        rows = rows.len(),
        failing = failing_rows,
        release_ready = evaluation.ok,
        "built release readiness scorecard"
    );
    ReadinessReport {
        ok: evaluation.ok,
        blocked: evaluation.blocked,
        blockers: evaluation.blockers,
        errors: evaluation.errors,
        warnings: evaluation.warnings,
        rows,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportStatus;

    fn registry(id: &str, rows: Vec<Value>) -> Value {
        json!({
            "schemaVersion": "usr-registry-1.0.0",
            "registryId": id,
            "generatedAt": "2026-02-12T00:00:00Z",
            "generatedBy": "test",
            "rows": rows
        })
    }

    fn phase_row(id: &str, phase: &str, blocking: bool) -> Value {
        json!({
            "id": id,
            "phase": phase,
            "runbookId": format!("runbook-{phase}"),
            "severityClass": "sev1",
            "requiredRoles": ["usr-operations"],
            "requiredArtifacts": ["usr-release-readiness-scorecard.json"],
            "communicationChannels": ["#usr-ops"],
            "maxResponseMinutes": 15,
            "maxRecoveryMinutes": 60,
            "blocking": blocking
        })
    }

    fn quality_row(id: &str, domain: &str) -> Value {
        json!({
            "id": id,
            "domain": domain,
            "scopeType": "global",
            "scopeId": "global",
            "metric": "accuracy",
            "thresholdOperator": ">=",
            "thresholdValue": 0.95,
            "fixtureSetId": format!("fixtures-{domain}"),
            "blocking": true
        })
    }

    struct Fixture {
        operational: Value,
        quality: Value,
        languages: Value,
        levels: Value,
        lanes: Vec<String>,
    }

    impl Fixture {
        fn baseline() -> Self {
            let languages = registry(
                "usr-language-profiles",
                vec![json!({
                    "id": "python",
                    "parserPreference": "native",
                    "requiredNodeKinds": ["module"],
                    "requiredEdgeKinds": ["contains"],
                    "requiredCapabilities": {},
                    "fallbackChain": ["native"],
                    "frameworkProfiles": [],
                    "requiredConformance": ["C0", "C1", "C2", "C3", "C4"]
                })],
            );
            let levels = registry(
                "usr-conformance-levels",
                vec![json!({
                    "profileType": "language",
                    "profileId": "python",
                    "requiredLevels": ["C0", "C1", "C2", "C3", "C4"],
                    "blockingLevels": ["C0", "C1", "C2", "C3", "C4"],
                    "requiredFixtureFamilies": ["golden", "resolution", "risk"]
                })],
            );
            Self {
                operational: registry(
                    "usr-operational-readiness-policy",
                    vec![
                        phase_row("op-pre", "pre-cutover", true),
                        phase_row("op-cut", "cutover", true),
                        phase_row("op-inc", "incident", true),
                        phase_row("op-post", "post-cutover", false),
                    ],
                ),
                quality: registry(
                    "usr-quality-gates",
                    REQUIRED_BLOCKING_QUALITY_DOMAINS
                        .iter()
                        .map(|domain| quality_row(&format!("qg-{domain}"), domain))
                        .collect(),
                ),
                languages,
                levels,
                lanes: vec!["conformance".to_string()],
            }
        }

        fn inputs<'a>(&'a self, failing: &'a [String]) -> OperationalInputs<'a> {
            OperationalInputs {
                operational_readiness_policy: &self.operational,
                quality_gates: &self.quality,
                conformance: ConformanceInputs {
                    language_profiles: &self.languages,
                    framework_profiles: &Value::Null,
                    conformance_levels: &self.levels,
                    known_lanes: &self.lanes,
                },
                missing_artifact_schemas: &[],
                failing_blocking_gate_ids: failing,
            }
        }
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn baseline_operational_readiness_passes() {
        let fixture = Fixture::baseline();
        let report = build_operational_readiness_report(
            &schemas(),
            &fixture.inputs(&[]),
            &ReportContext::new("2026-02-12T00:00:00Z").with_lane("ci"),
        );
        assert!(report.ok, "{:?} {:?}", report.errors, report.blockers);
        assert_eq!(report.payload.status, ReportStatus::Pass);
        assert_eq!(report.payload.scope, Scope::new("lane", "ci"));
        assert_eq!(report.payload.summary["operationalPhaseRowCount"], json!(4));
        assert_eq!(report.payload.summary["qualityGateRowCount"], json!(4));
        let check = schemas().validate_report(OPERATIONAL_READINESS_VALIDATION, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }

    #[test]
    fn missing_phase_and_domain_become_policy_blockers() {
        let mut fixture = Fixture::baseline();
        fixture.operational["rows"]
            .as_array_mut()
            .expect("rows")
            .retain(|row| row["phase"] != "incident");
        fixture.quality["rows"][0]["blocking"] = json!(false);
        let evaluation = evaluate_operational_readiness(&schemas(), &fixture.inputs(&[]));
        assert!(evaluation.blocked);
        assert_eq!(
            evaluation.blocker_strings(),
            vec![
                "operational-readiness-policy:incident:missing-phase",
                "operational-readiness-policy:incident:missing-phase-rows",
                "quality-gates-policy:framework-binding:missing-blocking-domain",
            ]
        );
        assert!(
            evaluation
                .errors
                .contains(&"operational readiness policy missing required phase: incident".to_string())
        );
    }

    #[test]
    fn phase_without_blocking_row_is_rejected() {
        let mut fixture = Fixture::baseline();
        fixture.operational["rows"][1]["blocking"] = json!(false);
        let evaluation = evaluate_operational_readiness(&schemas(), &fixture.inputs(&[]));
        assert_eq!(
            evaluation.errors,
            vec!["operational readiness policy phase cutover requires at least one blocking row"]
        );
    }

    #[test]
    fn unknown_failing_gate_is_a_warning() {
        let fixture = Fixture::baseline();
        let failing = vec!["qg-unknown".to_string()];
        let evaluation = evaluate_operational_readiness(&schemas(), &fixture.inputs(&failing));
        assert!(evaluation.ok);
        assert_eq!(
            evaluation.warnings,
            vec!["failing gate id does not map to blocking quality gate: qg-unknown"]
        );
    }

    #[test]
    fn row_shape_defects_are_prefixed_errors() {
        let mut fixture = Fixture::baseline();
        fixture.operational["rows"][0]["maxRecoveryMinutes"] = json!(5);
        fixture.operational["rows"][0]["requiredRoles"] = json!(["usr-operations", "usr-operations"]);
        let evaluation = evaluate_operational_readiness(&schemas(), &fixture.inputs(&[]));
        assert_eq!(
            evaluation.errors,
            vec![
                "op-pre requiredRoles must not contain duplicates",
                "op-pre maxRecoveryMinutes must be >= maxResponseMinutes",
            ]
        );
        assert!(!evaluation.rows[0].pass);
    }

    #[test]
    fn scorecard_fails_when_blocking_gate_fails() {
        let fixture = Fixture::baseline();
        let ctx = ReportContext::new("2026-02-12T00:00:00Z");

        let passing = build_release_readiness_scorecard(&schemas(), &fixture.inputs(&[]), &ctx);
        assert!(passing.ok);
        assert_eq!(passing.payload.summary["releaseReady"], json!(true));
        let check = schemas().validate_report(RELEASE_READINESS_SCORECARD, &passing.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);

        let failing_ids = vec!["qg-resolution".to_string()];
        let failing = build_release_readiness_scorecard(&schemas(), &fixture.inputs(&failing_ids), &ctx);
        assert!(!failing.ok);
        assert_eq!(failing.payload.status, ReportStatus::Fail);
        assert_eq!(failing.blockers[0].to_string(), "failing-gate:qg-resolution");
        let row = failing
            .rows
            .iter()
            .find(|row| row.id == "qg-resolution")
            .expect("quality gate row");
        assert!(!row.pass);
    }

    #[test]
    fn schema_failure_blocks_everything() {
        let mut fixture = Fixture::baseline();
        fixture.quality["rows"][0]["thresholdOperator"] = json!("~");
        let evaluation = evaluate_operational_readiness(&schemas(), &fixture.inputs(&[]));
        assert!(evaluation.blocked);
        assert_eq!(evaluation.readiness, ReadinessFlags::all_blocked());
        assert!(evaluation.errors[0].starts_with("/rows/0/thresholdOperator "));
    }

    #[test]
    fn artifacts_without_report_schema_are_listed() {
        let mut fixture = Fixture::baseline();
        fixture.operational["rows"][2]["requiredArtifacts"] =
            json!(["usr-release-readiness-scorecard.json", "usr-incident-timeline.json"]);
        assert_eq!(
            missing_artifact_schemas(&schemas(), &fixture.operational),
            vec!["op-inc:usr-incident-timeline.json"]
        );
    }
}
