use crate::cli::RunArgs;
use crate::support::{
    emit_report, emit_validation, load_bundle_or_exit, read_json_file_or_exit,
    require_registry_or_exit, schemas_or_exit, settings,
};
use serde_json::Value;
use std::collections::BTreeMap;
use usr_kernel::benchmark::{build_benchmark_regression_report, validate_benchmark_methodology};
use usr_kernel::schema::registries::{BENCHMARK_POLICY, SLO_BUDGETS};

pub fn run(args: RunArgs, results_path: Option<String>) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let policy = require_registry_or_exit(&bundle, BENCHMARK_POLICY);
    let budgets = require_registry_or_exit(&bundle, SLO_BUDGETS);

    let Some(results_path) = results_path else {
        let validation = validate_benchmark_methodology(&schemas, policy, budgets);
        emit_validation("benchmark-check", &validation, settings.json);
        return;
    };

    let observed: BTreeMap<String, Value> =
        read_json_file_or_exit(&results_path, "benchmark results");
    let report = build_benchmark_regression_report(
        &schemas,
        policy,
        budgets,
        &observed,
        &settings.report_context(),
    );
    emit_report("benchmark-check", &report, settings.json);
}
