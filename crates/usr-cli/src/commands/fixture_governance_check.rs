use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::fixture_governance::build_fixture_governance_report;
use usr_kernel::schema::registries::FIXTURE_GOVERNANCE;

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let report = build_fixture_governance_report(
        &schemas,
        require_registry_or_exit(&bundle, FIXTURE_GOVERNANCE),
        &settings.report_context(),
    );
    emit_report("fixture-governance-check", &report, settings.json);
}
