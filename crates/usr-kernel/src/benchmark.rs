//! Benchmark methodology and regression evaluation.
//!
//! Methodology checks the policy rows on their own and against the SLO
//! budget of their lane. Regression compares observed runs against both.

use crate::findings::{Findings, Severity};
use crate::registry::{BenchmarkPolicyRow, SloBudgetRow, key_counts};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{BENCHMARK_POLICY, SLO_BUDGETS};
use crate::schema::reports::BENCHMARK_REGRESSION_SUMMARY;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResultRow {
    pub id: String,
    pub lane_id: String,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// The observed run, echoed for regression rows.
    pub observed: Option<Value>,
}

/// SLO budget per lane. The first row for a lane wins; later ones only
/// produce a warning.
fn budgets_by_lane<'a>(
    budgets: &'a [SloBudgetRow],
    findings: &mut Findings,
) -> BTreeMap<&'a str, &'a SloBudgetRow> {
    let mut by_lane = BTreeMap::new();
    for budget in budgets {
        if by_lane.contains_key(budget.lane_id.as_str()) {
            findings.warning(format!(
                "duplicate slo budget lane row; first row retained for laneId={}",
                budget.lane_id
            ));
            continue;
        }
        by_lane.insert(budget.lane_id.as_str(), budget);
    }
    by_lane
}

fn load(
    schemas: &SchemaRegistry,
    benchmark_policy: &Value,
    slo_budgets: &Value,
) -> Result<(Vec<BenchmarkPolicyRow>, Vec<SloBudgetRow>), Vec<String>> {
    let policies = schemas
        .project::<BenchmarkPolicyRow>(BENCHMARK_POLICY, benchmark_policy)?
        .rows;
    let budgets = schemas.project::<SloBudgetRow>(SLO_BUDGETS, slo_budgets)?.rows;
    Ok((policies, budgets))
}

fn check_methodology(
    row: &BenchmarkPolicyRow,
    duplicate: bool,
    budget: Option<&SloBudgetRow>,
) -> Findings {
    let mut findings = Findings::new();
    if duplicate {
        findings.error("benchmark policy id must be unique");
    }
    if row.warmup_runs < 1 {
        findings.error("warmupRuns must be >= 1 for deterministic methodology");
    }
    if row.measure_runs < 3 {
        findings.error("measureRuns must be >= 3 for deterministic percentile confidence");
    }
    let targets = &row.percentile_targets;
    if !(targets.p50_duration_ms <= targets.p95_duration_ms
        && targets.p95_duration_ms <= targets.p99_duration_ms)
    {
        findings.error("percentileTargets must satisfy p50 <= p95 <= p99");
    }
    if row.max_variance_pct <= 0.0 || row.max_variance_pct > 100.0 {
        findings.error("maxVariancePct must be in (0, 100]");
    }

    match budget {
        None if row.blocking => findings.error(format!(
            "blocking benchmark row requires matching slo budget laneId={}",
            row.lane_id
        )),
        None => findings.warning(format!(
            "non-blocking benchmark row has no matching slo budget laneId={}",
            row.lane_id
        )),
        Some(budget) => {
            if row.max_peak_memory_mb > budget.max_memory_mb {
                findings.error(format!(
                    "benchmark maxPeakMemoryMb exceeds slo maxMemoryMb for laneId={}",
                    row.lane_id
                ));
            }
            if targets.p95_duration_ms > budget.max_duration_ms {
                findings.error(format!(
                    "benchmark p95DurationMs exceeds slo maxDurationMs for laneId={}",
                    row.lane_id
                ));
            }
        }
    }
    findings
}

fn methodology(
    policies: &[BenchmarkPolicyRow],
    budgets: &[SloBudgetRow],
) -> Validation<BenchmarkResultRow> {
    let mut findings = Findings::new();
    let by_lane = budgets_by_lane(budgets, &mut findings);
    let counts = key_counts(policies.iter().map(|row| row.id.as_str()));

    let mut rows = Vec::with_capacity(policies.len());
    for row in policies {
        let duplicate = counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        let checked = check_methodology(row, duplicate, by_lane.get(row.lane_id.as_str()).copied());
        let pass = checked.is_ok();
        let checked = checked.prefixed(&row.id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(BenchmarkResultRow {
            id: row.id.clone(),
            lane_id: row.lane_id.clone(),
            blocking: row.blocking,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
            observed: None,
        });
    }
    Validation::from_findings(findings, rows)
}

pub fn validate_benchmark_methodology(
    schemas: &SchemaRegistry,
    benchmark_policy: &Value,
    slo_budgets: &Value,
) -> Validation<BenchmarkResultRow> {
    let (policies, budgets) = match load(schemas, benchmark_policy, slo_budgets) {
        Ok(loaded) => loaded,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let validation = methodology(&policies, &budgets);
    tracing::debug!(
        rows = validation.rows.len(),
        errors = validation.errors.len(),
        warnings = validation.warnings.len(),
        "validated benchmark methodology"
    );
    validation
}

fn observed_number(observed: &Value, field: &str) -> Option<f64> {
    observed.get(field).and_then(Value::as_f64).filter(|value| value.is_finite())
}

fn check_regression(
    row: &BenchmarkPolicyRow,
    budget: Option<&SloBudgetRow>,
    observed: Option<&Value>,
) -> Findings {
    let severity = Severity::blocking_if(row.blocking);
    let mut findings = Findings::new();
    let Some(observed) = observed else {
        let kind = if row.blocking { "blocking" } else { "non-blocking" };
        findings.push(
            severity,
            format!("missing observed benchmark results for {kind} row"),
        );
        return findings;
    };

    let mut require = |field: &str| {
        let value = observed_number(observed, field);
        if value.is_none() {
            findings.push(severity, format!("observed {field} must be numeric"));
        }
        value
    };
    let p50 = require("p50DurationMs");
    let p95 = require("p95DurationMs");
    let p99 = require("p99DurationMs");
    let variance = require("variancePct");
    let peak_memory = require("peakMemoryMb");

    let targets = &row.percentile_targets;
    let limits = [
        ("p50DurationMs", p50, targets.p50_duration_ms as f64),
        ("p95DurationMs", p95, targets.p95_duration_ms as f64),
        ("p99DurationMs", p99, targets.p99_duration_ms as f64),
        ("variancePct", variance, row.max_variance_pct),
        ("peakMemoryMb", peak_memory, row.max_peak_memory_mb as f64),
    ];
    for (field, value, limit) in limits {
        if let Some(value) = value.filter(|value| *value > limit) {
            findings.push(severity, format!("{field} regression: {value} > {limit}"));
        }
    }

    if let Some(budget) = budget {
        if let Some(value) = p95.filter(|value| *value > budget.max_duration_ms as f64) {
            findings.push(
                severity,
                format!(
                    "p95DurationMs exceeds slo maxDurationMs: {value} > {}",
                    budget.max_duration_ms
                ),
            );
        }
        if let Some(value) = peak_memory.filter(|value| *value > budget.max_memory_mb as f64) {
            findings.push(
                severity,
                format!(
                    "peakMemoryMb exceeds slo maxMemoryMb: {value} > {}",
                    budget.max_memory_mb
                ),
            );
        }
    }
    findings
}

/// Methodology findings followed by per-row regression findings. A
/// regression row passes only with no errors and no warnings.
pub fn evaluate_benchmark_regression(
    schemas: &SchemaRegistry,
    benchmark_policy: &Value,
    slo_budgets: &Value,
    observed_results: &BTreeMap<String, Value>,
) -> Validation<BenchmarkResultRow> {
    let (policies, budgets) = match load(schemas, benchmark_policy, slo_budgets) {
        Ok(loaded) => loaded,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let methodology = methodology(&policies, &budgets);
    let mut findings = Findings {
        errors: methodology.errors,
        warnings: methodology.warnings,
    };
    let by_lane = budgets_by_lane(&budgets, &mut Findings::new());

    let mut rows = Vec::with_capacity(policies.len());
    for row in &policies {
        let observed = observed_results.get(&row.id);
        let checked = check_regression(row, by_lane.get(row.lane_id.as_str()).copied(), observed);
        let pass = checked.is_clean();
        let checked = checked.prefixed(&row.id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(BenchmarkResultRow {
            id: row.id.clone(),
            lane_id: row.lane_id.clone(),
            blocking: row.blocking,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
            observed: observed.cloned(),
        });
    }
    tracing::debug!(
        rows = rows.len(),
        observed = observed_results.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "evaluated benchmark regression"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: BENCHMARK_REGRESSION_SUMMARY,
    producer_id: "usr-benchmark-regression-evaluator",
    run_id: "run-usr-benchmark-regression",
    finding_class: "benchmark-regression",
};

pub fn build_benchmark_regression_report(
    schemas: &SchemaRegistry,
    benchmark_policy: &Value,
    slo_budgets: &Value,
    observed_results: &BTreeMap<String, Value>,
    ctx: &ReportContext,
) -> BuiltReport<BenchmarkResultRow> {
    let validation =
        evaluate_benchmark_regression(schemas, benchmark_policy, slo_budgets, observed_results);
    let (pass_count, fail_count) = pass_fail(&validation.rows, |row| row.pass);
    let blocking_failures = validation
        .rows
        .iter()
        .filter(|row| row.blocking && !row.pass)
        .count();

    let mut summary = Map::new();
    summary.insert("rowCount".into(), json!(validation.rows.len()));
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));
    summary.insert("blockingFailureCount".into(), json!(blocking_failures));
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

    fn policy() -> Value {
        registry(
            "usr-benchmark-policy",
            vec![
                json!({"id": "bench-core", "laneId": "ci", "datasetClass": "smoke", "hostClass": "standard-ci", "warmupRuns": 2, "measureRuns": 7, "percentileTargets": {"p50DurationMs": 1000, "p95DurationMs": 2000, "p99DurationMs": 3000}, "maxVariancePct": 10, "maxPeakMemoryMb": 1024, "blocking": true}),
                json!({"id": "bench-nightly", "laneId": "nightly", "datasetClass": "full", "hostClass": "standard-ci-long", "warmupRuns": 1, "measureRuns": 5, "percentileTargets": {"p50DurationMs": 5000, "p95DurationMs": 8000, "p99DurationMs": 9000}, "maxVariancePct": 20, "maxPeakMemoryMb": 2048, "blocking": false}),
            ],
        )
    }

    fn budget(lane: &str, max_duration: u64, max_memory: u64) -> Value {
        json!({
            "laneId": lane,
            "profileScope": "lane",
            "scopeId": lane,
            "maxDurationMs": max_duration,
            "maxMemoryMb": max_memory,
            "maxParserTimePerSegmentMs": 50,
            "maxUnknownKindRate": 0.02,
            "maxUnresolvedRate": 0.05,
            "blocking": true
        })
    }

    fn budgets() -> Value {
        registry(
            "usr-slo-budgets",
            vec![budget("ci", 2500, 2048), budget("nightly", 10000, 4096)],
        )
    }

    fn observed(p95: f64, memory: f64) -> Value {
        json!({"p50DurationMs": 900, "p95DurationMs": p95, "p99DurationMs": 2800, "variancePct": 5, "peakMemoryMb": memory})
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn methodology_passes_with_budgets() {
        let result = validate_benchmark_methodology(&schemas(), &policy(), &budgets());
        assert!(result.ok, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn methodology_flags_bad_targets_and_budget_overrun() {
        let mut payload = policy();
        payload["rows"][0]["measureRuns"] = json!(2);
        payload["rows"][0]["percentileTargets"]["p95DurationMs"] = json!(3500);
        payload["rows"][1]["laneId"] = json!("weekly");
        let result = validate_benchmark_methodology(&schemas(), &payload, &budgets());
        assert_eq!(
            result.errors,
            vec![
                "bench-core measureRuns must be >= 3 for deterministic percentile confidence",
                "bench-core percentileTargets must satisfy p50 <= p95 <= p99",
                "bench-core benchmark p95DurationMs exceeds slo maxDurationMs for laneId=ci",
            ]
        );
        assert_eq!(
            result.warnings,
            vec!["bench-nightly non-blocking benchmark row has no matching slo budget laneId=weekly"]
        );
    }

    #[test]
    fn duplicate_budget_lane_keeps_first_row() {
        let payload = registry(
            "usr-slo-budgets",
            vec![budget("ci", 2500, 2048), budget("ci", 100, 100), budget("nightly", 10000, 4096)],
        );
        let result = validate_benchmark_methodology(&schemas(), &policy(), &payload);
        assert!(result.ok, "{:?}", result.errors);
        assert_eq!(
            result.warnings,
            vec!["duplicate slo budget lane row; first row retained for laneId=ci"]
        );
    }

    #[test]
    fn regression_compares_against_targets_and_budget() {
        let observed_results = BTreeMap::from([
            ("bench-core".to_string(), observed(2600.0, 900.0)),
            ("bench-nightly".to_string(), json!({"p50DurationMs": 4000, "p95DurationMs": 7000, "p99DurationMs": 8000, "variancePct": 25, "peakMemoryMb": "n/a"})),
        ]);
        let result =
            evaluate_benchmark_regression(&schemas(), &policy(), &budgets(), &observed_results);
        assert_eq!(
            result.errors,
            vec![
                "bench-core p95DurationMs regression: 2600 > 2000",
                "bench-core p95DurationMs exceeds slo maxDurationMs: 2600 > 2500",
            ]
        );
        assert_eq!(
            result.warnings,
            vec![
                "bench-nightly observed peakMemoryMb must be numeric",
                "bench-nightly variancePct regression: 25 > 20",
            ]
        );
        assert!(!result.rows[1].pass);
    }

    #[test]
    fn missing_observations_follow_blocking_flag() {
        let result =
            evaluate_benchmark_regression(&schemas(), &policy(), &budgets(), &BTreeMap::new());
        assert_eq!(
            result.errors,
            vec!["bench-core missing observed benchmark results for blocking row"]
        );
        assert_eq!(
            result.warnings,
            vec!["bench-nightly missing observed benchmark results for non-blocking row"]
        );
    }

    #[test]
    fn report_summarises_regression_rows() {
        let observed_results = BTreeMap::from([
            ("bench-core".to_string(), observed(1800.0, 900.0)),
            ("bench-nightly".to_string(), observed(7000.0, 1500.0)),
        ]);
        let report = build_benchmark_regression_report(
            &schemas(),
            &policy(),
            &budgets(),
            &observed_results,
            &ReportContext::new("2026-02-12T00:00:00Z"),
        );
        assert!(report.ok, "{:?}", report.errors);
        assert_eq!(report.payload.summary["passCount"], json!(2));
        assert_eq!(report.payload.rows[0]["observed"]["p95DurationMs"], json!(1800.0));
        let check = schemas().validate_report(BENCHMARK_REGRESSION_SUMMARY, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }
}
