//! Evidence envelope shared by every report builder.

use crate::findings::Findings;
use crate::schema::SchemaRegistry;
use crate::schema::reports::{REPORT_SCHEMA_VERSION, REQUIRED_AUDIT_REPORT_IDS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Warn,
    Fail,
    Error,
    Partial,
}

impl ReportStatus {
    /// `fail` on any blocking finding, else `warn` on any advisory one.
    pub fn derive(blocking: usize, advisory: usize) -> Self {
        if blocking > 0 {
            Self::Fail
        } else if advisory > 0 {
            Self::Warn
        } else {
            Self::Pass
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Error => "error",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub scope_type: String,
    pub scope_id: String,
}

impl Scope {
    pub fn new(scope_type: impl Into<String>, scope_id: impl Into<String>) -> Self {
        Self {
            scope_type: scope_type.into(),
            scope_id: scope_id.into(),
        }
    }

    pub fn global() -> Self {
        Self::new("global", "global")
    }

    pub fn lane(lane: &str) -> Self {
        Self::new("lane", lane)
    }

    /// Keeps the string fields of an object scope and fills the rest from
    /// `fallback`. Anything that is not an object becomes `fallback`.
    pub fn normalize(value: Option<&Value>, fallback: &Scope) -> Scope {
        let Some(Value::Object(map)) = value else {
            return fallback.clone();
        };
        let scope_type = map
            .get("scopeType")
            .and_then(Value::as_str)
            .unwrap_or(&fallback.scope_type);
        let scope_id = map
            .get("scopeId")
            .and_then(Value::as_str)
            .unwrap_or(&fallback.scope_id);
        Scope::new(scope_type, scope_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub class: String,
    pub message: String,
}

/// Caller-supplied envelope metadata. The kernel never reads the clock,
/// so `generated_at` is always explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub generated_at: String,
    pub producer_id: Option<String>,
    pub producer_version: Option<String>,
    pub run_id: Option<String>,
    pub lane: String,
    pub build_id: Option<String>,
    pub scope: Option<Value>,
}

impl ReportContext {
    pub fn new(generated_at: impl Into<String>) -> Self {
        Self {
            generated_at: generated_at.into(),
            producer_id: None,
            producer_version: None,
            run_id: None,
            lane: "ci".to_string(),
            build_id: None,
            scope: None,
        }
    }

    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = lane.into();
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_producer_id(mut self, producer_id: impl Into<String>) -> Self {
        self.producer_id = Some(producer_id.into());
        self
    }

    pub fn with_scope(mut self, scope: Value) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Fixed identity of one report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportKind {
    pub artifact_id: &'static str,
    pub producer_id: &'static str,
    pub run_id: &'static str,
    pub finding_class: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceEnvelope {
    pub schema_version: String,
    pub artifact_id: String,
    pub generated_at: String,
    pub producer_id: String,
    pub producer_version: Option<String>,
    pub run_id: String,
    pub lane: String,
    pub build_id: Option<String>,
    pub status: ReportStatus,
    pub scope: Scope,
    pub summary: Map<String, Value>,
    pub blocking_findings: Vec<Finding>,
    pub advisory_findings: Vec<Finding>,
    pub rows: Vec<Value>,
}

impl EvidenceEnvelope {
    /// Assembles an envelope. Status is derived from the finding lists.
    pub fn build(
        ctx: &ReportContext,
        kind: &ReportKind,
        fallback_scope: &Scope,
        summary: Map<String, Value>,
        blocking: &[String],
        advisory: &[String],
        rows: Vec<Value>,
    ) -> Self {
        let to_findings = |messages: &[String]| -> Vec<Finding> {
            messages
                .iter()
                .map(|message| Finding {
                    class: kind.finding_class.to_string(),
                    message: message.clone(),
                })
                .collect()
        };
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            artifact_id: kind.artifact_id.to_string(),
            generated_at: ctx.generated_at.clone(),
            producer_id: ctx
                .producer_id
                .clone()
                .unwrap_or_else(|| kind.producer_id.to_string()),
            producer_version: ctx.producer_version.clone(),
            run_id: ctx
                .run_id
                .clone()
                .unwrap_or_else(|| kind.run_id.to_string()),
            lane: ctx.lane.clone(),
            build_id: ctx.build_id.clone(),
            status: ReportStatus::derive(blocking.len(), advisory.len()),
            scope: Scope::normalize(ctx.scope.as_ref(), fallback_scope),
            summary,
            blocking_findings: to_findings(blocking),
            advisory_findings: to_findings(advisory),
            rows,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// `{ok, errors, warnings, rows}` produced by a row-oriented validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Validation<R> {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<R>,
}

impl<R> Validation<R> {
    pub fn from_findings(findings: Findings, rows: Vec<R>) -> Self {
        Self {
            ok: findings.is_ok(),
            errors: findings.errors,
            warnings: findings.warnings,
            rows,
        }
    }

    /// Short-circuit result for a payload that failed its schema.
    pub fn schema_failure(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            errors,
            warnings: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// A validation together with the envelope built from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuiltReport<R> {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<R>,
    pub payload: EvidenceEnvelope,
}

impl<R: Serialize> BuiltReport<R> {
    /// Envelope with the validation's errors as blocking findings and its
    /// warnings as advisory findings.
    pub fn from_validation(
        validation: Validation<R>,
        ctx: &ReportContext,
        kind: &ReportKind,
        fallback_scope: &Scope,
        summary: Map<String, Value>,
    ) -> Self {
        let mut validation = validation;
        let rows = rows_to_values(&validation.rows, &mut validation.errors);
        let payload = EvidenceEnvelope::build(
            ctx,
            kind,
            fallback_scope,
            summary,
            &validation.errors,
            &validation.warnings,
            rows,
        );
        Self {
            ok: validation.ok && validation.errors.is_empty(),
            errors: validation.errors,
            warnings: validation.warnings,
            rows: validation.rows,
            payload,
        }
    }
}

/// Encodes report rows. A row that fails to encode is left out and its
/// failure is appended to `errors`, which blocks the report.
pub fn rows_to_values<R: Serialize>(rows: &[R], errors: &mut Vec<String>) -> Vec<Value> {
    let mut values = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match serde_json::to_value(row) {
            Ok(value) => values.push(value),
            Err(err) => errors.push(format!("report row {index} failed to serialize: {err}")),
        }
    }
    values
}

/// Counts rows whose `pass` predicate holds; returns `(pass, fail)`.
pub fn pass_fail<R>(rows: &[R], pass: impl Fn(&R) -> bool) -> (usize, usize) {
    let passed = rows.iter().filter(|row| pass(row)).count();
    (passed, rows.len() - passed)
}

/// Rebuilds objects in key order. Without serde_json's `preserve_order`
/// feature `Map` is already sorted and this is a copy; with it (enabled by
/// any crate in the build) the rebuild is what makes the digest stable.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .map(|(key, item)| (key, canonicalize(item)))
                .collect();
            let mut out = Map::new();
            for (key, item) in sorted {
                out.insert(key.clone(), item);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}

/// `sha256:<hex>` over the key-sorted compact JSON encoding.
pub fn canonical_digest(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize(value).to_string().as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditReportRow {
    pub artifact_id: String,
    pub present: bool,
    pub pass: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditReportsOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
    pub rows: Vec<AuditReportRow>,
}

/// Checks that every required audit report is present and schema valid.
pub fn validate_required_audit_reports(
    schemas: &SchemaRegistry,
    reports: &BTreeMap<String, Value>,
) -> AuditReportsOutcome {
    let mut errors = Vec::new();
    let mut rows = Vec::new();
    for artifact_id in REQUIRED_AUDIT_REPORT_IDS {
        let Some(payload) = reports.get(*artifact_id) else {
            let message = format!("missing required audit report payload: {artifact_id}");
            errors.push(message.clone());
            rows.push(AuditReportRow {
                artifact_id: (*artifact_id).to_string(),
                present: false,
                pass: false,
                errors: vec![message],
            });
            continue;
        };
        let check = schemas.validate_report(artifact_id, payload);
        let row_errors: Vec<String> = check
            .errors
            .iter()
            .map(|message| format!("{artifact_id} {message}"))
            .collect();
        errors.extend(row_errors.iter().cloned());
        rows.push(AuditReportRow {
            artifact_id: (*artifact_id).to_string(),
            present: true,
            pass: check.ok,
            errors: row_errors,
        });
    }
    tracing::debug!(
        required = REQUIRED_AUDIT_REPORT_IDS.len(),
        errors = errors.len(),
        "checked required audit reports"
    );
    AuditReportsOutcome {
        ok: errors.is_empty(),
        errors,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KIND: ReportKind = ReportKind {
        artifact_id: "usr-validation-report",
        producer_id: "usr-test-producer",
        run_id: "run-usr-test",
        finding_class: "test",
    };

    #[test]
    fn status_is_derived_from_findings() {
        assert_eq!(ReportStatus::derive(0, 0), ReportStatus::Pass);
        assert_eq!(ReportStatus::derive(0, 2), ReportStatus::Warn);
        assert_eq!(ReportStatus::derive(1, 2), ReportStatus::Fail);
    }

    #[test]
    fn scope_normalizes_partial_and_non_object_input() {
        let fallback = Scope::global();
        assert_eq!(Scope::normalize(None, &fallback), fallback);
        assert_eq!(Scope::normalize(Some(&json!("lane")), &fallback), fallback);
        assert_eq!(
            Scope::normalize(Some(&json!({"scopeType": "lane", "scopeId": 7})), &fallback),
            Scope::new("lane", "global")
        );
    }

    #[test]
    fn envelope_uses_kind_defaults_and_validates() {
        let ctx = ReportContext::new("2026-02-12T00:00:00Z");
        let envelope = EvidenceEnvelope::build(
            &ctx,
            &KIND,
            &Scope::global(),
            Map::new(),
            &[],
            &["soft".to_string()],
            vec![json!({"id": "a"})],
        );
        assert_eq!(envelope.producer_id, "usr-test-producer");
        assert_eq!(envelope.run_id, "run-usr-test");
        assert_eq!(envelope.status, ReportStatus::Warn);
        assert_eq!(envelope.advisory_findings[0].class, "test");

        let schemas = SchemaRegistry::build().expect("schemas should compile");
        let check = schemas.validate_report("usr-validation-report", &envelope.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unencodable row"))
        }
    }

    #[test]
    fn unencodable_rows_block_the_report() {
        let mut errors = Vec::new();
        assert!(rows_to_values(&[Unencodable], &mut errors).is_empty());
        assert_eq!(errors, vec!["report row 0 failed to serialize: unencodable row"]);

        let validation = Validation::from_findings(Findings::new(), vec![Unencodable]);
        assert!(validation.ok);
        let report = BuiltReport::from_validation(
            validation,
            &ReportContext::new("2026-02-12T00:00:00Z"),
            &KIND,
            &Scope::global(),
            Map::new(),
        );
        assert!(!report.ok);
        assert!(report.payload.rows.is_empty());
        assert_eq!(report.payload.status, ReportStatus::Fail);
        assert_eq!(
            report.payload.blocking_findings[0].message,
            "report row 0 failed to serialize: unencodable row"
        );
    }

    #[test]
    fn canonical_digest_ignores_key_order() {
        let a = json!({"b": 1, "a": {"y": [1, 2], "x": null}});
        let b = json!({"a": {"x": null, "y": [1, 2]}, "b": 1});
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
        assert!(canonical_digest(&a).starts_with("sha256:"));
        assert_ne!(canonical_digest(&a), canonical_digest(&json!({"b": 2})));
    }

    #[test]
    fn required_audit_reports_flag_missing_payloads() {
        let schemas = SchemaRegistry::build().expect("schemas should compile");
        let outcome = validate_required_audit_reports(&schemas, &BTreeMap::new());
        assert!(!outcome.ok);
        assert_eq!(outcome.rows.len(), 9);
        assert_eq!(
            outcome.errors[0],
            "missing required audit report payload: usr-conformance-summary"
        );
        assert!(outcome.rows.iter().all(|row| !row.present));
    }
}
