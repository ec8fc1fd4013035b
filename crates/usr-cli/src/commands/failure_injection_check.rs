use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, read_json_file_or_exit, require_registry_or_exit,
    schemas_or_exit, settings,
};
use usr_kernel::failure_injection::{ScenarioResults, build_failure_injection_report};
use usr_kernel::schema::registries::FAILURE_INJECTION_MATRIX;

pub fn run(args: RunArgs, results_path: String, strict_enum: bool) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let results: ScenarioResults = read_json_file_or_exit(&results_path, "failure-injection results");
    let schemas = schemas_or_exit();
    let report = build_failure_injection_report(
        &schemas,
        require_registry_or_exit(&bundle, FAILURE_INJECTION_MATRIX),
        &results,
        settings.strict_mode,
        strict_enum,
        &settings.report_context(),
    );
    emit_report("failure-injection-check", &report, settings.json);
}
