//! Observability rollup: observed lane metrics against SLO budgets and
//! alert policies, plus hotspot ranking across batch lanes.

use crate::findings::{Findings, Severity};
use crate::registry::{AlertPolicyRow, SloBudgetRow};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{ALERT_POLICIES, SLO_BUDGETS};
use crate::schema::reports::OBSERVABILITY_ROLLUP;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Number of top-ranked batch lanes flagged as hotspots per metric.
pub const HOTSPOT_LIMIT: usize = 3;

const BATCH_PROFILE_SCOPE: &str = "batch";

/// Maps an alert policy metric onto the observed lane metric field.
pub fn alert_metric_field(metric: &str) -> Option<&'static str> {
    match metric {
        "capability_downgrade_rate" => Some("capabilityDowngradeRate"),
        "critical_diagnostic_count" => Some("criticalDiagnosticCount"),
        "lane_duration_ms" => Some("durationMs"),
        "lane_peak_memory_mb" => Some("peakMemoryMb"),
        "redaction_failure_count" => Some("redactionFailureCount"),
        "unknown_kind_rate" => Some("unknownKindRate"),
        "unresolved_reference_rate" => Some("unresolvedRate"),
        _ => None,
    }
}

/// Unknown comparators never trigger.
fn compare(left: f64, comparator: &str, right: f64) -> bool {
    match comparator {
        ">" => left > right,
        ">=" => left >= right,
        "<" => left < right,
        "<=" => left <= right,
        "==" => left == right,
        _ => false,
    }
}

fn metric(observed: &Value, field: &str) -> Option<f64> {
    observed.get(field).and_then(Value::as_f64).filter(|value| value.is_finite())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SloBudgetResult {
    pub lane_id: String,
    pub scope_id: String,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvaluationResult {
    pub id: String,
    pub alert_id: String,
    pub lane_id: String,
    pub metric: String,
    pub comparator: String,
    pub threshold: f64,
    pub observed_value: Option<f64>,
    pub severity: String,
    pub escalation_policy_id: String,
    pub blocking: bool,
    pub triggered: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchHotspotResult {
    pub id: String,
    pub lane_id: String,
    pub scope_id: String,
    pub duration_ms: Option<f64>,
    pub peak_memory_mb: Option<f64>,
    pub parser_time_per_segment_ms: Option<f64>,
    pub duration_rank: Option<usize>,
    pub memory_rank: Option<usize>,
    pub parser_time_rank: Option<usize>,
    pub is_duration_hotspot: bool,
    pub is_memory_hotspot: bool,
    pub is_parser_time_hotspot: bool,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rowType", rename_all = "kebab-case")]
pub enum ObservabilityRow {
    SloBudget(SloBudgetResult),
    AlertEvaluation(AlertEvaluationResult),
    BatchHotspot(BatchHotspotResult),
}

impl ObservabilityRow {
    pub fn pass(&self) -> bool {
        match self {
            Self::SloBudget(row) => row.pass,
            Self::AlertEvaluation(row) => row.pass,
            Self::BatchHotspot(row) => row.pass,
        }
    }

    pub fn blocking(&self) -> bool {
        match self {
            Self::SloBudget(row) => row.blocking,
            Self::AlertEvaluation(row) => row.blocking,
            Self::BatchHotspot(row) => row.blocking,
        }
    }
}

fn check_budget(budget: &SloBudgetRow, observed: Option<&Value>) -> Findings {
    let severity = Severity::blocking_if(budget.blocking);
    let mut findings = Findings::new();
    let Some(observed) = observed else {
        findings.push(
            severity,
            format!("missing observed lane metrics for laneId={}", budget.lane_id),
        );
        return findings;
    };

    let limits = [
        ("durationMs", "maxDurationMs", budget.max_duration_ms as f64),
        ("peakMemoryMb", "maxMemoryMb", budget.max_memory_mb as f64),
        (
            "parserTimePerSegmentMs",
            "maxParserTimePerSegmentMs",
            budget.max_parser_time_per_segment_ms as f64,
        ),
        ("unknownKindRate", "maxUnknownKindRate", budget.max_unknown_kind_rate),
        ("unresolvedRate", "maxUnresolvedRate", budget.max_unresolved_rate),
    ];
    for (field, limit_name, limit) in limits {
        match metric(observed, field) {
            None => findings.push(
                severity,
                format!("observed metric missing or non-numeric: {field}"),
            ),
            Some(value) if value > limit => findings.push(
                severity,
                format!("{field} exceeds slo {limit_name}: {value} > {limit}"),
            ),
            Some(_) => {}
        }
    }
    findings
}

fn evaluate_alert(
    alert: &AlertPolicyRow,
    field: &str,
    lane_id: &str,
    observed: &Value,
) -> AlertEvaluationResult {
    let severity = Severity::blocking_if(alert.blocking);
    let mut findings = Findings::new();
    let observed_value = metric(observed, field);
    let triggered =
        observed_value.is_some_and(|value| compare(value, &alert.comparator, alert.threshold));
    match observed_value {
        None => findings.push(
            severity,
            format!(
                "observed metric missing or non-numeric for alert {}: {}",
                alert.id, alert.metric
            ),
        ),
        Some(value) if triggered => findings.push(
            severity,
            format!(
                "alert triggered {} {} {} (observed={value})",
                alert.metric, alert.comparator, alert.threshold
            ),
        ),
        Some(_) => {}
    }
    let pass = findings.is_ok();
    let findings = findings.prefixed(&format!("{} {lane_id}", alert.id));
    AlertEvaluationResult {
        id: format!("{}::{lane_id}", alert.id),
        alert_id: alert.id.clone(),
        lane_id: lane_id.to_string(),
        metric: alert.metric.clone(),
        comparator: alert.comparator.clone(),
        threshold: alert.threshold,
        observed_value,
        severity: alert.severity.clone(),
        escalation_policy_id: alert.escalation_policy_id.clone(),
        blocking: alert.blocking,
        triggered,
        pass,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

/// Ranks rows by `value` descending, ties by lane id. Rows without the
/// metric stay unranked.
fn assign_rank(
    rows: &mut [BatchHotspotResult],
    value: fn(&BatchHotspotResult) -> Option<f64>,
    mark: fn(&mut BatchHotspotResult, usize),
) {
    let mut ranked: Vec<(usize, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| value(row).map(|metric| (index, metric)))
        .collect();
    ranked.sort_by(|(left_index, left), (right_index, right)| {
        right
            .partial_cmp(left)
            .unwrap_or(Ordering::Equal)
            .then_with(|| rows[*left_index].lane_id.cmp(&rows[*right_index].lane_id))
    });
    for (position, (index, _)) in ranked.into_iter().enumerate() {
        mark(&mut rows[index], position + 1);
    }
}

fn batch_hotspots(
    budgets: &[SloBudgetRow],
    observed_lane_metrics: &BTreeMap<String, Value>,
) -> Vec<BatchHotspotResult> {
    let mut rows: Vec<BatchHotspotResult> = budgets
        .iter()
        .filter(|budget| budget.profile_scope == BATCH_PROFILE_SCOPE)
        .map(|budget| {
            let observed = observed_lane_metrics.get(&budget.lane_id);
            let read = |field: &str| observed.and_then(|observed| metric(observed, field));
            BatchHotspotResult {
                id: format!("hotspot::{}", budget.lane_id),
                lane_id: budget.lane_id.clone(),
                scope_id: budget.scope_id.clone(),
                duration_ms: read("durationMs"),
                peak_memory_mb: read("peakMemoryMb"),
                parser_time_per_segment_ms: read("parserTimePerSegmentMs"),
                duration_rank: None,
                memory_rank: None,
                parser_time_rank: None,
                is_duration_hotspot: false,
                is_memory_hotspot: false,
                is_parser_time_hotspot: false,
                blocking: false,
                pass: true,
                errors: Vec::new(),
                warnings: Vec::new(),
            }
        })
        .collect();
    rows.sort_by(|left, right| left.lane_id.cmp(&right.lane_id));

    assign_rank(&mut rows, |row| row.duration_ms, |row, rank| {
        row.duration_rank = Some(rank);
        row.is_duration_hotspot = rank <= HOTSPOT_LIMIT;
    });
    assign_rank(&mut rows, |row| row.peak_memory_mb, |row, rank| {
        row.memory_rank = Some(rank);
        row.is_memory_hotspot = rank <= HOTSPOT_LIMIT;
    });
    assign_rank(&mut rows, |row| row.parser_time_per_segment_ms, |row, rank| {
        row.parser_time_rank = Some(rank);
        row.is_parser_time_hotspot = rank <= HOTSPOT_LIMIT;
    });
    rows
}

/// Rows come out as SLO budget rows, then alert rows per alert and lane,
/// then batch hotspot rows sorted by lane id.
pub fn evaluate_observability_rollup(
    schemas: &SchemaRegistry,
    slo_budgets: &Value,
    alert_policies: &Value,
    observed_lane_metrics: &BTreeMap<String, Value>,
) -> Validation<ObservabilityRow> {
    let budgets = match schemas.project::<SloBudgetRow>(SLO_BUDGETS, slo_budgets) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let alerts = match schemas.project::<AlertPolicyRow>(ALERT_POLICIES, alert_policies) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let mut findings = Findings::new();
    let mut rows = Vec::new();
    for budget in &budgets {
        let checked = check_budget(budget, observed_lane_metrics.get(&budget.lane_id));
        let pass = checked.is_ok();
        let checked = checked.prefixed(&budget.lane_id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(ObservabilityRow::SloBudget(SloBudgetResult {
            lane_id: budget.lane_id.clone(),
            scope_id: budget.scope_id.clone(),
            blocking: budget.blocking,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
        }));
    }

    for lane_id in observed_lane_metrics.keys() {
        if !budgets.iter().any(|budget| &budget.lane_id == lane_id) {
            findings.warning(format!(
                "observed lane metrics without matching slo budget row: {lane_id}"
            ));
        }
    }

    for alert in &alerts {
        let Some(field) = alert_metric_field(&alert.metric) else {
            findings.push(
                Severity::blocking_if(alert.blocking),
                format!("unsupported alert metric mapping: {}", alert.metric),
            );
            continue;
        };
        for (lane_id, observed) in observed_lane_metrics {
            let evaluated = evaluate_alert(alert, field, lane_id, observed);
            findings.errors.extend(evaluated.errors.iter().cloned());
            findings.warnings.extend(evaluated.warnings.iter().cloned());
            rows.push(ObservabilityRow::AlertEvaluation(evaluated));
        }
    }

    rows.extend(
        batch_hotspots(&budgets, observed_lane_metrics)
            .into_iter()
            .map(ObservabilityRow::BatchHotspot),
    );

    tracing::debug!(
        rows = rows.len(),
        lanes = observed_lane_metrics.len(),
        alerts = alerts.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "evaluated observability rollup"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: OBSERVABILITY_ROLLUP,
    producer_id: "usr-observability-rollup-evaluator",
    run_id: "run-usr-observability-rollup",
    finding_class: "observability",
};

pub fn build_observability_rollup_report(
    schemas: &SchemaRegistry,
    slo_budgets: &Value,
    alert_policies: &Value,
    observed_lane_metrics: &BTreeMap<String, Value>,
    ctx: &ReportContext,
) -> BuiltReport<ObservabilityRow> {
    let validation =
        evaluate_observability_rollup(schemas, slo_budgets, alert_policies, observed_lane_metrics);
    let rows = &validation.rows;
    let (pass_count, fail_count) = pass_fail(rows, ObservabilityRow::pass);
    let count = |predicate: fn(&ObservabilityRow) -> bool| rows.iter().filter(|row| predicate(row)).count();

    let mut summary = Map::new();
    summary.insert("rowCount".into(), json!(rows.len()));
    summary.insert(
        "sloBudgetRowCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::SloBudget(_)))),
    );
    summary.insert(
        "alertEvaluationRowCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::AlertEvaluation(_)))),
    );
    summary.insert(
        "batchHotspotRowCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::BatchHotspot(_)))),
    );
    summary.insert(
        "durationHotspotCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::BatchHotspot(hotspot) if hotspot.is_duration_hotspot))),
    );
    summary.insert(
        "memoryHotspotCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::BatchHotspot(hotspot) if hotspot.is_memory_hotspot))),
    );
    summary.insert(
        "parserTimeHotspotCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::BatchHotspot(hotspot) if hotspot.is_parser_time_hotspot))),
    );
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert(
        "blockingFailureCount".into(),
        json!(count(|row| row.blocking() && !row.pass())),
    );
    summary.insert(
        "alertTriggerCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::AlertEvaluation(alert) if alert.triggered))),
    );
    summary.insert(
        "blockingAlertTriggerCount".into(),
        json!(count(|row| matches!(row, ObservabilityRow::AlertEvaluation(alert) if alert.triggered && alert.blocking))),
    );
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));
    BuiltReport::from_validation(validation, ctx, &REPORT_KIND, &Scope::global(), summary)
}
