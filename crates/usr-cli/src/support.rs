use crate::cli::{BlockerArgs, RunArgs};
use crate::config::{FileConfig, Settings};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use usr_kernel::registry::OperationalReadinessRow;
use usr_kernel::schema::registries::{
    CONFORMANCE_LEVELS, FRAMEWORK_PROFILES, LANGUAGE_PROFILES, OPERATIONAL_READINESS_POLICY,
};
use usr_kernel::{BuiltReport, ConformanceInputs, RegistryBundle, SchemaRegistry, Validation};

pub const FINDING_SAMPLE_LIMIT: usize = 25;

static FILE_CONFIG: OnceLock<FileConfig> = OnceLock::new();

/// Loads `--config` once at startup. Without a path the defaults apply.
pub fn init_file_config_or_exit(path: Option<&str>) {
    let config = match path {
        Some(path) => FileConfig::load(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        }),
        None => FileConfig::default(),
    };
    let _ = FILE_CONFIG.set(config);
}

pub fn settings(args: RunArgs) -> Settings {
    let file = FILE_CONFIG.get_or_init(FileConfig::default);
    Settings::resolve(args, file)
}

pub fn read_json_file_or_exit<T>(path: &str, label: &str) -> T
where
    T: DeserializeOwned,
{
    let bytes = fs::read(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {label} at {path}: {e}");
        std::process::exit(1);
    });
    serde_json::from_slice::<T>(&bytes).unwrap_or_else(|e| {
        eprintln!("error: failed to parse {label} JSON at {path}: {e}");
        std::process::exit(1);
    })
}

pub fn schemas_or_exit() -> SchemaRegistry {
    SchemaRegistry::build().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(2);
    })
}

pub fn load_bundle_or_exit(matrix_dir: &str) -> RegistryBundle {
    let dir = Path::new(matrix_dir);
    if !dir.is_dir() {
        eprintln!("error: matrix directory not found: {matrix_dir}");
        std::process::exit(1);
    }
    RegistryBundle::load_dir(dir).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn require_registry_or_exit<'a>(bundle: &'a RegistryBundle, registry_id: &str) -> &'a Value {
    bundle.require(registry_id).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

/// Framework profiles are optional: an absent registry restricts readiness
/// to language profiles.
pub fn conformance_inputs_or_exit<'a>(
    bundle: &'a RegistryBundle,
    known_lanes: &'a [String],
) -> ConformanceInputs<'a> {
    ConformanceInputs {
        language_profiles: require_registry_or_exit(bundle, LANGUAGE_PROFILES),
        framework_profiles: bundle.get_or_null(FRAMEWORK_PROFILES),
        conformance_levels: require_registry_or_exit(bundle, CONFORMANCE_LEVELS),
        known_lanes,
    }
}

/// `<rowId>:<artifact>` for each operational-policy artifact with no file
/// in `reports_dir`. Nothing is reported when the policy is absent or
/// fails its schema.
pub fn missing_report_artifacts(
    schemas: &SchemaRegistry,
    bundle: &RegistryBundle,
    reports_dir: &str,
) -> Vec<String> {
    let Some(policy) = bundle.get(OPERATIONAL_READINESS_POLICY) else {
        return Vec::new();
    };
    let Ok(registry) =
        schemas.project::<OperationalReadinessRow>(OPERATIONAL_READINESS_POLICY, policy)
    else {
        return Vec::new();
    };
    let dir = Path::new(reports_dir);
    registry
        .rows
        .iter()
        .flat_map(|row| {
            row.required_artifacts
                .iter()
                .filter(|artifact| !dir.join(artifact.as_str()).is_file())
                .map(move |artifact| format!("{}:{artifact}", row.id))
        })
        .collect()
}

/// `seed`, then `--missing-artifact` tokens, then artifacts missing from
/// `--reports-dir`, without repeats.
pub fn collect_missing_artifacts(
    schemas: &SchemaRegistry,
    bundle: &RegistryBundle,
    blockers: &BlockerArgs,
    seed: Vec<String>,
) -> Vec<String> {
    let from_dir = blockers
        .reports_dir
        .as_deref()
        .map(|dir| missing_report_artifacts(schemas, bundle, dir))
        .unwrap_or_default();
    let mut missing = seed;
    for artifact in blockers.missing_artifacts.iter().cloned().chain(from_dir) {
        if !missing.contains(&artifact) {
            missing.push(artifact);
        }
    }
    missing
}

pub fn print_json<T: Serialize>(value: &T, label: &str) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|err| {
        eprintln!("error: failed to render {label} payload: {err}");
        std::process::exit(2);
    });
    println!("{rendered}");
}

pub fn sample_with_truncation<T: Clone>(items: &[T], limit: usize) -> (Vec<T>, usize) {
    let sample: Vec<T> = items.iter().take(limit).cloned().collect();
    let truncated = items.len().saturating_sub(sample.len());
    (sample, truncated)
}

pub fn print_sample_block(header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let (sample, truncated) = sample_with_truncation(items, FINDING_SAMPLE_LIMIT);
    println!("  {header} (showing up to {}):", sample.len());
    for item in &sample {
        println!("    - {item}");
    }
    if truncated > 0 {
        println!("    - ... and {truncated} more");
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub fn pass_fail_label(ok: bool) -> &'static str {
    if ok { "pass" } else { "fail" }
}

/// Human summary: title, `Key: value` lines, then sampled findings.
pub fn print_summary(
    command: &str,
    ok: bool,
    details: &[(&str, String)],
    errors: &[String],
    warnings: &[String],
) {
    println!("usr {command}");
    println!("  Result: {}", pass_fail_label(ok));
    for (key, value) in details {
        println!("  {key}: {value}");
    }
    println!("  Errors: {}", errors.len());
    println!("  Warnings: {}", warnings.len());
    print_sample_block("Errors", errors);
    print_sample_block("Warnings", warnings);
}

pub fn exit_unless_ok(ok: bool) {
    if !ok {
        std::process::exit(1);
    }
}

/// Prints a row validation (JSON or summary) and exits 1 when not ok.
pub fn emit_validation<R: Serialize>(command: &str, validation: &Validation<R>, json_output: bool) {
    if json_output {
        print_json(validation, command);
    } else {
        print_summary(
            command,
            validation.ok,
            &[("Rows", validation.rows.len().to_string())],
            &validation.errors,
            &validation.warnings,
        );
    }
    exit_unless_ok(validation.ok);
}

/// Prints a report envelope (JSON or summary) and exits 1 when not ok.
pub fn emit_report<R: Serialize>(command: &str, report: &BuiltReport<R>, json_output: bool) {
    if json_output {
        print_json(&report.payload, command);
    } else {
        print_summary(
            command,
            report.ok,
            &[
                ("Artifact", report.payload.artifact_id.clone()),
                ("Status", report.payload.status.as_str().to_string()),
                ("Rows", report.rows.len().to_string()),
            ],
            &report.errors,
            &report.warnings,
        );
    }
    exit_unless_ok(report.ok);
}
