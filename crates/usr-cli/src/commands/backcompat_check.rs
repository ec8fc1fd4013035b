use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::backcompat::build_backcompat_matrix_report;
use usr_kernel::schema::registries::BACKCOMPAT_MATRIX;

pub fn run(args: RunArgs, strict_enum: bool) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let report = build_backcompat_matrix_report(
        &schemas,
        require_registry_or_exit(&bundle, BACKCOMPAT_MATRIX),
        strict_enum,
        &settings.report_context(),
    );
    emit_report("backcompat-check", &report, settings.json);
}
