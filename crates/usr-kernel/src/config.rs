//! Layered runtime-config resolution and feature-flag checks.
//!
//! Layers are always walked in the order `policyFile < env < argv`, and
//! unknown keys are reported before any override is applied, so the
//! result never depends on how the caller happened to order map keys.

use crate::findings::{CheckOutcome, Findings, Severity};
use crate::registry::{ConfigValueType, RuntimeConfigRow};
use crate::report::{EvidenceEnvelope, ReportContext, ReportKind, Scope};
use crate::schema::SchemaRegistry;
use crate::schema::registries::RUNTIME_CONFIG_POLICY;
use crate::schema::reports::FEATURE_FLAG_STATE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

pub const CUTOVER_ENABLED_KEY: &str = "usr.rollout.cutoverEnabled";
pub const SHADOW_READ_ENABLED_KEY: &str = "usr.rollout.shadowReadEnabled";
pub const STRICT_MODE_ENABLED_KEY: &str = "usr.strictMode.enabled";

pub const DEFAULT_SOURCE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    PolicyFile,
    Env,
    Argv,
}

impl Layer {
    /// Precedence order, lowest first.
    pub const ORDER: [Layer; 3] = [Layer::PolicyFile, Layer::Env, Layer::Argv];

    pub fn label(self) -> &'static str {
        match self {
            Self::PolicyFile => "policy-file",
            Self::Env => "env",
            Self::Argv => "argv",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            Self::PolicyFile => "policyFile",
            Self::Env => "env",
            Self::Argv => "argv",
        }
    }
}

/// The three raw override maps, each optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayers {
    #[serde(default)]
    pub policy_file: BTreeMap<String, Value>,
    #[serde(default)]
    pub env: BTreeMap<String, Value>,
    #[serde(default)]
    pub argv: BTreeMap<String, Value>,
}

impl ConfigLayers {
    /// Reads `{policyFile?, env?, argv?}`; layers that are not objects are
    /// treated as empty.
    pub fn from_value(value: &Value) -> Self {
        let read = |layer: Layer| -> BTreeMap<String, Value> {
            match value.get(layer.field()) {
                Some(Value::Object(map)) => map
                    .iter()
                    .map(|(key, item)| (key.clone(), item.clone()))
                    .collect(),
                _ => BTreeMap::new(),
            }
        };
        Self {
            policy_file: read(Layer::PolicyFile),
            env: read(Layer::Env),
            argv: read(Layer::Argv),
        }
    }

    pub fn layer(&self, layer: Layer) -> &BTreeMap<String, Value> {
        match layer {
            Layer::PolicyFile => &self.policy_file,
            Layer::Env => &self.env,
            Layer::Argv => &self.argv,
        }
    }

    pub fn layer_mut(&mut self, layer: Layer) -> &mut BTreeMap<String, Value> {
        match layer {
            Layer::PolicyFile => &mut self.policy_file,
            Layer::Env => &mut self.env,
            Layer::Argv => &mut self.argv,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub values: BTreeMap<String, Value>,
    pub applied_by_key: BTreeMap<String, String>,
}

impl ResolvedConfig {
    fn schema_failure(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            errors,
            warnings: Vec::new(),
            values: BTreeMap::new(),
            applied_by_key: BTreeMap::new(),
        }
    }

    fn merge(mut self, extra: CheckOutcome) -> Self {
        self.errors.extend(extra.errors);
        self.warnings.extend(extra.warnings);
        self.ok = self.errors.is_empty();
        self
    }
}

fn coerce_boolean(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Bool(flag) => Ok(Value::Bool(*flag)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Value::Bool(true)),
            "0" | "false" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("invalid boolean literal: {text}")),
        },
        _ => Err("expected boolean".to_string()),
    }
}

/// An integer override: its display form, its magnitude for bound checks,
/// and its exact value when it fits in an `i64`.
struct IntegerCandidate {
    literal: String,
    magnitude: f64,
    exact: Option<i64>,
}

impl IntegerCandidate {
    fn exact(value: i64) -> Self {
        Self {
            literal: value.to_string(),
            magnitude: value as f64,
            exact: Some(value),
        }
    }
}

fn integer_candidate(raw: &Value) -> Result<IntegerCandidate, String> {
    match raw {
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                return Ok(IntegerCandidate::exact(value));
            }
            let magnitude = number
                .as_f64()
                .filter(|value| value.is_finite() && value.fract() == 0.0)
                .ok_or_else(|| format!("expected integer, received {number}"))?;
            if magnitude.abs() < i64::MAX as f64 {
                return Ok(IntegerCandidate::exact(magnitude as i64));
            }
            Ok(IntegerCandidate {
                literal: number.to_string(),
                magnitude,
                exact: None,
            })
        }
        Value::String(text) => {
            let trimmed = text.trim();
            let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid integer literal: {text}"));
            }
            if let Ok(value) = trimmed.parse::<i64>() {
                return Ok(IntegerCandidate::exact(value));
            }
            let magnitude = trimmed
                .parse::<f64>()
                .map_err(|_| format!("invalid integer literal: {text}"))?;
            Ok(IntegerCandidate {
                literal: trimmed.to_string(),
                magnitude,
                exact: None,
            })
        }
        _ => Err("expected integer".to_string()),
    }
}

/// Bounds are checked before the `i64` fit, so an oversized literal fails
/// on `maxValue` or `minValue` when the row declares one.
fn coerce_integer(row: &RuntimeConfigRow, raw: &Value) -> Result<Value, String> {
    let candidate = integer_candidate(raw)?;
    if let Some(min) = row.min_value.filter(|min| candidate.magnitude < *min) {
        return Err(format!("value {} below minValue {min}", candidate.literal));
    }
    if let Some(max) = row.max_value.filter(|max| candidate.magnitude > *max) {
        return Err(format!("value {} above maxValue {max}", candidate.literal));
    }
    candidate
        .exact
        .map(|value| json!(value))
        .ok_or_else(|| format!("value {} outside the 64-bit integer range", candidate.literal))
}

fn coerce_enum(row: &RuntimeConfigRow, raw: &Value) -> Result<Value, String> {
    let Value::String(text) = raw else {
        return Err("expected enum string".to_string());
    };
    let permitted = row
        .allowed_values
        .as_ref()
        .is_none_or(|allowed| allowed.iter().any(|item| item == text));
    if !permitted {
        return Err(format!("value {text} not in allowedValues"));
    }
    Ok(Value::String(text.clone()))
}

/// Coerces one raw override according to the row's `valueType` and bounds.
pub fn coerce_value(row: &RuntimeConfigRow, raw: &Value) -> Result<Value, String> {
    match row.value_type {
        ConfigValueType::Boolean => coerce_boolean(raw),
        ConfigValueType::Integer => coerce_integer(row, raw),
        ConfigValueType::Enum => coerce_enum(row, raw),
    }
}

/// Policy rows keyed by `key`, first occurrence wins. Later duplicates are
/// reported and dropped.
fn unique_rows(rows: Vec<RuntimeConfigRow>, findings: &mut Findings) -> Vec<RuntimeConfigRow> {
    let mut seen = BTreeSet::new();
    let mut unique = Vec::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.key.clone()) {
            findings.error(format!(
                "duplicate runtime config key in policy: {}",
                row.key
            ));
            continue;
        }
        unique.push(row);
    }
    unique
}

fn resolve_rows(
    schemas: &SchemaRegistry,
    policy: &Value,
    layers: &ConfigLayers,
    strict_mode: bool,
) -> (Vec<RuntimeConfigRow>, ResolvedConfig) {
    let registry = match schemas.project::<RuntimeConfigRow>(RUNTIME_CONFIG_POLICY, policy) {
        Ok(registry) => registry,
        Err(errors) => return (Vec::new(), ResolvedConfig::schema_failure(errors)),
    };

    let mut findings = Findings::new();
    let rows = unique_rows(registry.rows, &mut findings);
    let known: BTreeSet<&str> = rows.iter().map(|row| row.key.as_str()).collect();

    for layer in Layer::ORDER {
        for key in layers.layer(layer).keys() {
            if !known.contains(key.as_str()) {
                findings.push(
                    Severity::blocking_if(strict_mode),
                    format!("unknown runtime config key at {}: {key}", layer.label()),
                );
            }
        }
    }

    let mut values = BTreeMap::new();
    let mut applied_by_key = BTreeMap::new();
    for row in &rows {
        values.insert(row.key.clone(), row.default_value.clone());
        applied_by_key.insert(row.key.clone(), DEFAULT_SOURCE.to_string());

        let severity = Severity::blocking_if(strict_mode && row.strict_mode_behavior == "disallow");
        for layer in Layer::ORDER {
            let Some(raw) = layers.layer(layer).get(&row.key) else {
                continue;
            };
            match coerce_value(row, raw) {
                Ok(value) => {
                    values.insert(row.key.clone(), value);
                    applied_by_key.insert(row.key.clone(), layer.label().to_string());
                }
                Err(reason) => findings.push(
                    severity,
                    format!(
                        "invalid runtime config value for {} at {}: {reason}",
                        row.key,
                        layer.label()
                    ),
                ),
            }
        }
    }

    tracing::debug!(
        keys = rows.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        strict_mode,
        "resolved runtime config"
    );

    let resolved = ResolvedConfig {
        ok: findings.is_ok(),
        errors: findings.errors,
        warnings: findings.warnings,
        values,
        applied_by_key,
    };
    (rows, resolved)
}

/// Resolves every policy key against the override layers.
pub fn resolve_runtime_config(
    schemas: &SchemaRegistry,
    policy: &Value,
    layers: &ConfigLayers,
    strict_mode: bool,
) -> ResolvedConfig {
    resolve_rows(schemas, policy, layers, strict_mode).1
}

/// Checks the closed set of feature-flag invariants over resolved values.
pub fn validate_feature_flag_conflicts(
    values: &BTreeMap<String, Value>,
    strict_mode: bool,
) -> CheckOutcome {
    let mut findings = Findings::new();
    let enabled = |key: &str| values.get(key) == Some(&Value::Bool(true));
    if enabled(CUTOVER_ENABLED_KEY) && enabled(SHADOW_READ_ENABLED_KEY) {
        findings.push(
            Severity::blocking_if(strict_mode),
            format!(
                "disallowed feature-flag conflict: {CUTOVER_ENABLED_KEY} and {SHADOW_READ_ENABLED_KEY} cannot both be true"
            ),
        );
    }
    if strict_mode && values.get(STRICT_MODE_ENABLED_KEY) == Some(&Value::Bool(false)) {
        findings.error(format!(
            "disallowed feature-flag value in strict mode: {STRICT_MODE_ENABLED_KEY} cannot be false"
        ));
    }
    findings.into_outcome()
}

/// Resolution plus feature-flag conflicts, merged into one record.
pub fn validate_runtime_config_resolution(
    schemas: &SchemaRegistry,
    policy: &Value,
    layers: &ConfigLayers,
    strict_mode: bool,
) -> ResolvedConfig {
    let resolved = resolve_runtime_config(schemas, policy, layers, strict_mode);
    let conflicts = validate_feature_flag_conflicts(&resolved.values, strict_mode);
    resolved.merge(conflicts)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlagRow {
    pub id: String,
    pub key: String,
    pub value: Value,
    pub source: String,
    pub value_type: ConfigValueType,
    pub rollout_class: String,
    pub strict_mode_behavior: String,
    pub requires_restart: bool,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlagReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub values: BTreeMap<String, Value>,
    pub applied_by_key: BTreeMap<String, String>,
    pub rows: Vec<FeatureFlagRow>,
    pub payload: EvidenceEnvelope,
}

const FEATURE_FLAG_KIND: ReportKind = ReportKind {
    artifact_id: FEATURE_FLAG_STATE,
    producer_id: "usr-runtime-config-validator",
    run_id: "run-usr-feature-flag-state",
    finding_class: "runtime-config",
};

/// Builds the `usr-feature-flag-state` report for one resolution.
pub fn build_feature_flag_state_report(
    schemas: &SchemaRegistry,
    policy: &Value,
    layers: &ConfigLayers,
    strict_mode: bool,
    ctx: &ReportContext,
) -> FeatureFlagReport {
    let (policy_rows, resolved) = resolve_rows(schemas, policy, layers, strict_mode);
    let conflicts = validate_feature_flag_conflicts(&resolved.values, strict_mode);
    let conflict_count = conflicts.errors.len() + conflicts.warnings.len();

    let mut errors = resolved.errors;
    errors.extend(conflicts.errors);
    let mut warnings = resolved.warnings;
    warnings.extend(conflicts.warnings);

    let rows: Vec<FeatureFlagRow> = policy_rows
        .into_iter()
        .map(|row| FeatureFlagRow {
            value: resolved.values.get(&row.key).cloned().unwrap_or(Value::Null),
            source: resolved
                .applied_by_key
                .get(&row.key)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            id: row.id,
            key: row.key,
            value_type: row.value_type,
            rollout_class: row.rollout_class,
            strict_mode_behavior: row.strict_mode_behavior,
            requires_restart: row.requires_restart,
            blocking: row.blocking,
        })
        .collect();

    let row_values = crate::report::rows_to_values(&rows, &mut errors);

    let mut summary = Map::new();
    summary.insert("strictMode".into(), json!(strict_mode));
    summary.insert("keyCount".into(), json!(rows.len()));
    summary.insert("errorCount".into(), json!(errors.len()));
    summary.insert("warningCount".into(), json!(warnings.len()));
    summary.insert("conflictCount".into(), json!(conflict_count));

    let payload = EvidenceEnvelope::build(
        ctx,
        &FEATURE_FLAG_KIND,
        &Scope::global(),
        summary,
        &errors,
        &warnings,
        row_values,
    );

    FeatureFlagReport {
        ok: errors.is_empty(),
        errors,
        warnings,
        values: resolved.values,
        applied_by_key: resolved.applied_by_key,
        rows,
        payload,
    }
}
