//! CLI defaults from an optional `usr.toml`, and the process-env config layer.

use crate::cli::RunArgs;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use usr_kernel::{ReportContext, Scope};

pub const DEFAULT_MATRIX_DIR: &str = "matrix";
pub const DEFAULT_LANE: &str = "ci";
pub const DEFAULT_KNOWN_LANES: [&str; 2] = ["ci", "conformance"];
pub const ENV_LAYER_PREFIX: &str = "USR_CFG_";

/// Contents of `usr.toml`. Every field is optional; flags win.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub matrix_dir: Option<String>,
    pub lane: Option<String>,
    pub run_id: Option<String>,
    pub producer_id: Option<String>,
    pub strict_mode: Option<bool>,
    pub known_lanes: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config at {}: {e}", path.display()))?;
        Self::parse(&text).map_err(|e| format!("invalid toml at {}: {e}", path.display()))
    }

    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Effective run settings after layering flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub matrix_dir: String,
    pub generated_at: String,
    pub lane: String,
    pub run_id: Option<String>,
    pub producer_id: Option<String>,
    pub scope: Option<Scope>,
    pub strict_mode: bool,
    pub known_lanes: Vec<String>,
    pub json: bool,
}

impl Settings {
    pub fn resolve(args: RunArgs, file: &FileConfig) -> Self {
        let known_lanes = if !args.known_lanes.is_empty() {
            args.known_lanes
        } else if let Some(lanes) = &file.known_lanes {
            lanes.clone()
        } else {
            DEFAULT_KNOWN_LANES.iter().map(|lane| lane.to_string()).collect()
        };
        Self {
            matrix_dir: args
                .matrix_dir
                .or_else(|| file.matrix_dir.clone())
                .unwrap_or_else(|| DEFAULT_MATRIX_DIR.to_string()),
            generated_at: args.generated_at.unwrap_or_else(now_timestamp),
            lane: args
                .lane
                .or_else(|| file.lane.clone())
                .unwrap_or_else(|| DEFAULT_LANE.to_string()),
            run_id: args.run_id.or_else(|| file.run_id.clone()),
            producer_id: args.producer_id.or_else(|| file.producer_id.clone()),
            scope: args.scope,
            strict_mode: args.strict.or(file.strict_mode).unwrap_or(false),
            known_lanes,
            json: args.json,
        }
    }

    pub fn report_context(&self) -> ReportContext {
        let mut ctx = ReportContext::new(self.generated_at.clone()).with_lane(self.lane.clone());
        if let Some(run_id) = &self.run_id {
            ctx = ctx.with_run_id(run_id.clone());
        }
        if let Some(producer_id) = &self.producer_id {
            ctx = ctx.with_producer_id(producer_id.clone());
        }
        if let Some(scope) = &self.scope {
            ctx = ctx.with_scope(json!({
                "scopeType": scope.scope_type,
                "scopeId": scope.scope_id,
            }));
        }
        ctx.producer_version = Some(env!("CARGO_PKG_VERSION").to_string());
        ctx
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the `env` layer from `USR_CFG_<NAME>` variables. `__` in `<NAME>`
/// stands for `.`; names matching a policy key case-insensitively take that
/// key's spelling, anything else passes through as written.
pub fn env_layer<I>(policy_keys: &[String], vars: I) -> BTreeMap<String, Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut layer = BTreeMap::new();
    for (name, value) in vars {
        let Some(raw_key) = name.strip_prefix(ENV_LAYER_PREFIX) else {
            continue;
        };
        if raw_key.is_empty() {
            continue;
        }
        let dotted = raw_key.replace("__", ".");
        let key = policy_keys
            .iter()
            .find(|known| known.eq_ignore_ascii_case(&dotted))
            .cloned()
            .unwrap_or(dotted);
        layer.insert(key, Value::String(value));
    }
    layer
}

/// Splits `key=value` argv overrides. Values stay strings for the resolver
/// to coerce.
pub fn argv_layer(overrides: &[String]) -> Result<BTreeMap<String, Value>, String> {
    let mut layer = BTreeMap::new();
    for item in overrides {
        let Some((key, value)) = item.split_once('=') else {
            return Err(format!("invalid --set override (expected KEY=VALUE): {item}"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("invalid --set override (empty key): {item}"));
        }
        layer.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_keys() -> Vec<String> {
        vec![
            "usr.rollout.cutoverEnabled".to_string(),
            "usr.parser.maxSegmentMs".to_string(),
        ]
    }

    #[test]
    fn file_config_rejects_unknown_fields() {
        let parsed = FileConfig::parse("matrixDir = \"m\"\nlane = \"nightly\"\n")
            .expect("known fields should parse");
        assert_eq!(parsed.matrix_dir.as_deref(), Some("m"));
        assert_eq!(parsed.lane.as_deref(), Some("nightly"));

        let err = FileConfig::parse("matrix_dir = \"m\"\n").expect_err("snake case is unknown");
        assert!(err.to_string().contains("unknown field"), "{err}");
    }

    #[test]
    fn flags_override_file_values() {
        let file = FileConfig {
            matrix_dir: Some("from-file".to_string()),
            lane: Some("nightly".to_string()),
            strict_mode: Some(true),
            known_lanes: Some(vec!["conformance-full".to_string()]),
            ..FileConfig::default()
        };
        let args = RunArgs {
            lane: Some("ci".to_string()),
            strict: Some(false),
            generated_at: Some("2026-02-12T00:00:00Z".to_string()),
            ..RunArgs::default()
        };
        let settings = Settings::resolve(args, &file);
        assert_eq!(settings.matrix_dir, "from-file");
        assert_eq!(settings.lane, "ci");
        assert!(!settings.strict_mode);
        assert_eq!(settings.known_lanes, vec!["conformance-full"]);
        assert_eq!(settings.generated_at, "2026-02-12T00:00:00Z");
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let settings = Settings::resolve(RunArgs::default(), &FileConfig::default());
        assert_eq!(settings.matrix_dir, DEFAULT_MATRIX_DIR);
        assert_eq!(settings.lane, DEFAULT_LANE);
        assert!(!settings.strict_mode);
        assert_eq!(settings.known_lanes, vec!["ci", "conformance"]);
        assert!(settings.generated_at.ends_with('Z'));
    }

    #[test]
    fn scope_flag_reaches_the_report_context() {
        let args = RunArgs {
            scope: Some(Scope::new("language", "python")),
            generated_at: Some("2026-02-12T00:00:00Z".to_string()),
            ..RunArgs::default()
        };
        let ctx = Settings::resolve(args, &FileConfig::default()).report_context();
        assert_eq!(
            ctx.scope,
            Some(json!({"scopeType": "language", "scopeId": "python"}))
        );

        let ctx = Settings::resolve(RunArgs::default(), &FileConfig::default()).report_context();
        assert_eq!(ctx.scope, None);
    }

    #[test]
    fn env_layer_maps_double_underscore_to_dots() {
        let vars = vec![
            ("USR_CFG_USR__ROLLOUT__CUTOVERENABLED".to_string(), "true".to_string()),
            ("USR_CFG_usr__unknown__flag".to_string(), "1".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];
        let layer = env_layer(&policy_keys(), vars);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer["usr.rollout.cutoverEnabled"], Value::String("true".into()));
        assert_eq!(layer["usr.unknown.flag"], Value::String("1".into()));
    }

    #[test]
    fn argv_overrides_require_key_value_pairs() {
        let layer = argv_layer(&["usr.parser.maxSegmentMs=2000".to_string()])
            .expect("override should parse");
        assert_eq!(layer["usr.parser.maxSegmentMs"], Value::String("2000".into()));

        let err = argv_layer(&["usr.parser.maxSegmentMs".to_string()]).expect_err("no '='");
        assert!(err.contains("expected KEY=VALUE"), "{err}");
    }
}
