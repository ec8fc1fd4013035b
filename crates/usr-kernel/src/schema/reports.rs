//! Evidence-envelope schemas, one per report artifact id.

use serde_json::{Value, json};

pub const REPORT_SCHEMA_VERSION: &str = "usr-1.0.0";

pub const CONFORMANCE_SUMMARY: &str = "usr-conformance-summary";
pub const VALIDATION_REPORT: &str = "usr-validation-report";
pub const RELEASE_READINESS_SCORECARD: &str = "usr-release-readiness-scorecard";
pub const FEATURE_FLAG_STATE: &str = "usr-feature-flag-state";
pub const FAILURE_INJECTION_REPORT: &str = "usr-failure-injection-report";
pub const BENCHMARK_REGRESSION_SUMMARY: &str = "usr-benchmark-regression-summary";
pub const THREAT_MODEL_COVERAGE_REPORT: &str = "usr-threat-model-coverage-report";
pub const WAIVER_ACTIVE_REPORT: &str = "usr-waiver-active-report";
pub const WAIVER_EXPIRY_REPORT: &str = "usr-waiver-expiry-report";
pub const OPERATIONAL_READINESS_VALIDATION: &str = "usr-operational-readiness-validation";
pub const OBSERVABILITY_ROLLUP: &str = "usr-observability-rollup";
pub const BACKCOMPAT_MATRIX_RESULTS: &str = "usr-backcompat-matrix-results";

pub const REPORT_IDS: &[&str] = &[
    CONFORMANCE_SUMMARY,
    VALIDATION_REPORT,
    RELEASE_READINESS_SCORECARD,
    FEATURE_FLAG_STATE,
    FAILURE_INJECTION_REPORT,
    BENCHMARK_REGRESSION_SUMMARY,
    THREAT_MODEL_COVERAGE_REPORT,
    WAIVER_ACTIVE_REPORT,
    WAIVER_EXPIRY_REPORT,
    OPERATIONAL_READINESS_VALIDATION,
    OBSERVABILITY_ROLLUP,
    BACKCOMPAT_MATRIX_RESULTS,
];

/// Reports every audit bundle must carry.
pub const REQUIRED_AUDIT_REPORT_IDS: &[&str] = &[
    CONFORMANCE_SUMMARY,
    VALIDATION_REPORT,
    RELEASE_READINESS_SCORECARD,
    FEATURE_FLAG_STATE,
    FAILURE_INJECTION_REPORT,
    BENCHMARK_REGRESSION_SUMMARY,
    THREAT_MODEL_COVERAGE_REPORT,
    WAIVER_ACTIVE_REPORT,
    WAIVER_EXPIRY_REPORT,
];

fn finding_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["class", "message"],
        "properties": {
            "class": {"type": "string"},
            "message": {"type": "string"},
        },
    })
}

/// Envelope schema with `artifactId` pinned to `artifact_id`, or `None`
/// for an unknown id.
pub fn report_schema(artifact_id: &str) -> Option<Value> {
    if !REPORT_IDS.contains(&artifact_id) {
        return None;
    }
    Some(json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": format!("{artifact_id}.json"),
        "type": "object",
        "additionalProperties": false,
        "required": [
            "schemaVersion",
            "artifactId",
            "generatedAt",
            "producerId",
            "runId",
            "lane",
            "status",
            "scope",
            "summary",
            "blockingFindings",
            "advisoryFindings",
            "rows"
        ],
        "properties": {
            "schemaVersion": {"type": "string", "const": REPORT_SCHEMA_VERSION},
            "artifactId": {"type": "string", "const": artifact_id},
            "generatedAt": {"type": "string"},
            "producerId": {"type": "string"},
            "producerVersion": {"type": ["string", "null"]},
            "runId": {"type": "string"},
            "lane": {"type": "string"},
            "buildId": {"type": ["string", "null"]},
            "status": {"type": "string", "enum": ["pass", "warn", "fail", "error", "partial"]},
            "scope": {
                "type": "object",
                "additionalProperties": false,
                "required": ["scopeType", "scopeId"],
                "properties": {
                    "scopeType": {"type": "string"},
                    "scopeId": {"type": "string"},
                },
            },
            "summary": {"type": "object"},
            "blockingFindings": {"type": "array", "items": finding_schema()},
            "advisoryFindings": {"type": "array", "items": finding_schema()},
            "rows": {"type": "array", "items": {"type": "object"}},
        },
    }))
}
