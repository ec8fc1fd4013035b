use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, read_json_file_or_exit, require_registry_or_exit,
    schemas_or_exit, settings,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use usr_kernel::schema::registries::{REDACTION_RULES, SECURITY_GATES};
use usr_kernel::security_gates::{
    GateObservation, RedactionObservation, build_security_gate_validation_report,
};

/// Observed outcomes keyed by gate id (or check) and rule id (or class).
#[derive(Debug, Default, Deserialize)]
struct SecurityResults {
    #[serde(default)]
    gates: BTreeMap<String, GateObservation>,
    #[serde(default)]
    redactions: BTreeMap<String, RedactionObservation>,
}

pub fn run(args: RunArgs, results_path: String) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let results: SecurityResults = read_json_file_or_exit(&results_path, "security results");
    let schemas = schemas_or_exit();
    let report = build_security_gate_validation_report(
        &schemas,
        require_registry_or_exit(&bundle, SECURITY_GATES),
        require_registry_or_exit(&bundle, REDACTION_RULES),
        &results.gates,
        &results.redactions,
        &settings.report_context(),
    );
    emit_report("security-gate-check", &report, settings.json);
}
