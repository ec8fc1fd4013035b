use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::ownership::build_ownership_escalation_report;
use usr_kernel::schema::registries::{ESCALATION_POLICY, OWNERSHIP_MATRIX};

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let report = build_ownership_escalation_report(
        &schemas,
        require_registry_or_exit(&bundle, OWNERSHIP_MATRIX),
        require_registry_or_exit(&bundle, ESCALATION_POLICY),
        &settings.report_context(),
    );
    emit_report("ownership-check", &report, settings.json);
}
