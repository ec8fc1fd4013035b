use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, read_json_file_or_exit, require_registry_or_exit,
    schemas_or_exit, settings,
};
use serde_json::Value;
use std::collections::BTreeMap;
use usr_kernel::observability::build_observability_rollup_report;
use usr_kernel::schema::registries::{ALERT_POLICIES, SLO_BUDGETS};

pub fn run(args: RunArgs, lane_metrics_path: String) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let metrics: BTreeMap<String, Value> =
        read_json_file_or_exit(&lane_metrics_path, "lane metrics");
    let schemas = schemas_or_exit();
    let report = build_observability_rollup_report(
        &schemas,
        require_registry_or_exit(&bundle, SLO_BUDGETS),
        require_registry_or_exit(&bundle, ALERT_POLICIES),
        &metrics,
        &settings.report_context(),
    );
    emit_report("observability-rollup", &report, settings.json);
}
