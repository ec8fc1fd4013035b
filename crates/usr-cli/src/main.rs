//! USR CLI: the `usr` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "USR_LOG";

fn init_logging(log_json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);
    support::init_file_config_or_exit(cli.config.as_deref());

    match cli.command {
        Commands::ValidateFile { path, report, json } => {
            commands::validate_file::run(path, report, json)
        }

        Commands::BundleCheck { run, require_all } => commands::bundle_check::run(run, require_all),

        Commands::CatalogCheck { run } => commands::catalog_check::run(run),

        Commands::BatchShardsCheck { run } => commands::batch_shards_check::run(run),

        Commands::HarnessCheck { run } => commands::harness_check::run(run),

        Commands::EdgeContractCheck { run, edges } => commands::edge_contract_check::run(run, edges),

        Commands::BackcompatCheck { run, strict_enum } => {
            commands::backcompat_check::run(run, strict_enum)
        }

        Commands::RiskProfilesCheck { run } => commands::risk_profiles_check::run(run),

        Commands::FixtureGovernanceCheck { run } => commands::fixture_governance_check::run(run),

        Commands::ThreatModelCheck { run } => commands::threat_model_check::run(run),

        Commands::SecurityGateCheck { run, results } => {
            commands::security_gate_check::run(run, results)
        }

        Commands::BenchmarkCheck { run, results } => commands::benchmark_check::run(run, results),

        Commands::ObservabilityRollup { run, lane_metrics } => {
            commands::observability_rollup::run(run, lane_metrics)
        }

        Commands::FailureInjectionCheck {
            run,
            results,
            strict_enum,
        } => commands::failure_injection_check::run(run, results, strict_enum),

        Commands::OwnershipCheck { run } => commands::ownership_check::run(run),

        Commands::WaiverReport { run, view } => commands::waiver_report::run(run, view),

        Commands::ConformanceSummary { run, level } => {
            commands::conformance_summary::run(run, level)
        }

        Commands::PromotionReadiness { run, blockers } => {
            commands::promotion_readiness::run(run, blockers)
        }

        Commands::OperationalReadiness { run, blockers } => {
            commands::operational_readiness::run(run, blockers)
        }

        Commands::Scorecard { run, blockers } => commands::scorecard::run(run, blockers),

        Commands::ConfigResolve {
            run,
            layers,
            env_layer,
            overrides,
        } => commands::config_resolve::run(commands::config_resolve::Args {
            run,
            layers,
            env_layer,
            overrides,
        }),

        Commands::AuditReportsCheck { dir, json } => commands::audit_reports_check::run(dir, json),

        Commands::CodeCheck {
            code,
            kind,
            strict_enum,
            json,
        } => commands::code_check::run(code, kind, strict_enum, json),

        Commands::CapabilityTransitionCheck {
            path,
            lenient_reason_code,
            json,
        } => commands::capability_transition_check::run(path, lenient_reason_code, json),
    }
}
