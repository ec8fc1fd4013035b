use clap::{Args, Parser, Subcommand, ValueEnum};
use usr_kernel::Scope;

#[derive(Parser)]
#[command(
    name = "usr",
    about = "USR governance: registry schemas, cross-registry checks, and promotion readiness",
    version
)]
pub struct Cli {
    /// Optional TOML file with defaults (matrixDir, lane, runId, producerId, strictMode, knownLanes)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Emit log lines as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads the registry bundle.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory holding `<registryId>.json` registry files
    #[arg(long)]
    pub matrix_dir: Option<String>,

    /// Report `generatedAt` and waiver evaluation time (RFC 3339, defaults to now)
    #[arg(long)]
    pub generated_at: Option<String>,

    /// Lane recorded on emitted reports
    #[arg(long)]
    pub lane: Option<String>,

    /// Run id recorded on emitted reports
    #[arg(long)]
    pub run_id: Option<String>,

    /// Producer id recorded on emitted reports
    #[arg(long)]
    pub producer_id: Option<String>,

    /// Report scope as `TYPE:ID`; each report falls back to its own scope
    #[arg(long, value_parser = parse_scope)]
    pub scope: Option<Scope>,

    /// Strict mode (`--strict`, `--strict=false`)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub strict: Option<bool>,

    /// Known CI lanes (repeatable)
    #[arg(long = "known-lane")]
    pub known_lanes: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_scope(raw: &str) -> Result<Scope, String> {
    match raw.split_once(':') {
        Some((scope_type, scope_id)) if !scope_type.is_empty() && !scope_id.is_empty() => {
            Ok(Scope::new(scope_type, scope_id))
        }
        _ => Err(format!("expected TYPE:ID, got {raw}")),
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one registry or report payload against its closed schema
    ValidateFile {
        /// Path to the JSON payload
        path: String,

        /// Validate as this report artifact id instead of a registry named by the file
        #[arg(long)]
        report: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Schema-validate every registry in the matrix directory
    BundleCheck {
        #[command(flatten)]
        run: RunArgs,

        /// Report registries missing from the directory as errors
        #[arg(long)]
        require_all: bool,
    },

    /// Check the language/framework catalog contract
    CatalogCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check the language batch shard DAG and partition
    BatchShardsCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check that the harness reaches every language and framework profile
    HarnessCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check the edge-kind constraint table against profiles, bridges, and provenance cases
    EdgeContractCheck {
        #[command(flatten)]
        run: RunArgs,

        /// JSON array of edges to check against the constraint table
        #[arg(long)]
        edges: Option<String>,
    },

    /// Check the backward-compatibility matrix and emit its results report
    BackcompatCheck {
        #[command(flatten)]
        run: RunArgs,

        /// Require diagnostic codes to be canonical
        #[arg(long)]
        strict_enum: bool,
    },

    /// Check language risk profile coverage
    RiskProfilesCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check fixture governance controls and emit a validation report
    FixtureGovernanceCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Check threat model coverage and emit a coverage report
    ThreatModelCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Evaluate security gate and redaction evidence
    SecurityGateCheck {
        #[command(flatten)]
        run: RunArgs,

        /// JSON file `{gates: {...}, redactions: {...}}` with observed outcomes
        #[arg(long)]
        results: String,
    },

    /// Validate benchmark methodology, or evaluate regressions with --results
    BenchmarkCheck {
        #[command(flatten)]
        run: RunArgs,

        /// JSON file of observed benchmark results keyed by benchmark id
        #[arg(long)]
        results: Option<String>,
    },

    /// Roll up SLO budgets and alert policies over observed lane metrics
    ObservabilityRollup {
        #[command(flatten)]
        run: RunArgs,

        /// JSON file of observed lane metrics keyed by lane id
        #[arg(long)]
        lane_metrics: String,
    },

    /// Evaluate failure-injection scenarios against observed outcomes
    FailureInjectionCheck {
        #[command(flatten)]
        run: RunArgs,

        /// JSON file `{strict: {...}, nonStrict: {...}}` keyed by scenario id
        #[arg(long)]
        results: String,

        /// Require diagnostic and reason codes to be canonical
        #[arg(long)]
        strict_enum: bool,
    },

    /// Check ownership and escalation linkage
    OwnershipCheck {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Evaluate waivers and emit the active or expiry report
    WaiverReport {
        #[command(flatten)]
        run: RunArgs,

        /// Report view
        #[arg(long, value_enum, default_value = "active")]
        view: WaiverViewArg,
    },

    /// Emit the conformance summary for one level
    ConformanceSummary {
        #[command(flatten)]
        run: RunArgs,

        /// Target conformance level (C0..C4)
        #[arg(long, default_value = "C0")]
        level: String,
    },

    /// Evaluate promotion readiness across the three conformance gates
    PromotionReadiness {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        blockers: BlockerArgs,
    },

    /// Evaluate operational readiness and emit its validation report
    OperationalReadiness {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        blockers: BlockerArgs,
    },

    /// Emit the release readiness scorecard
    Scorecard {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        blockers: BlockerArgs,
    },

    /// Resolve runtime config layers and emit the feature flag state report
    ConfigResolve {
        #[command(flatten)]
        run: RunArgs,

        /// JSON file `{policyFile?, env?, argv?}` with raw layer overrides
        #[arg(long)]
        layers: Option<String>,

        /// Build the env layer from USR_CFG_<KEY> variables (`.` written as `__`)
        #[arg(long)]
        env_layer: bool,

        /// argv layer override `key=value` (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Check that every required audit report in a directory is present and valid
    AuditReportsCheck {
        /// Directory holding `<artifactId>.json` report files
        dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a diagnostic or reason code against the canonical grammar
    CodeCheck {
        /// Code to check
        code: String,

        /// Code family
        #[arg(long, value_enum, default_value = "diagnostic")]
        kind: CodeKindArg,

        /// Also require membership in the canonical code set
        #[arg(long)]
        strict_enum: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a capability transition `{from, to, diagnostic, reasonCode?}` file
    CapabilityTransitionCheck {
        /// Path to the JSON transition
        path: String,

        /// Accept reason codes outside the canonical set if they match the grammar
        #[arg(long)]
        lenient_reason_code: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Externally observed blockers fed into readiness evaluation.
#[derive(Args, Debug, Clone, Default)]
pub struct BlockerArgs {
    /// Failing blocking gate id (repeatable)
    #[arg(long = "failing-gate")]
    pub failing_gates: Vec<String>,

    /// Missing artifact token (repeatable)
    #[arg(long = "missing-artifact")]
    pub missing_artifacts: Vec<String>,

    /// Directory of emitted reports; required artifacts absent from it count as missing
    #[arg(long)]
    pub reports_dir: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum WaiverViewArg {
    Active,
    Expiry,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CodeKindArg {
    Diagnostic,
    Reason,
}
