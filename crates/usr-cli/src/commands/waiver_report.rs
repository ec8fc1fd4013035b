use crate::cli::{RunArgs, WaiverViewArg};
use crate::support::{
    emit_report, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::schema::registries::{ESCALATION_POLICY, OWNERSHIP_MATRIX, WAIVER_POLICY};
use usr_kernel::waiver::{WaiverInputs, build_waiver_active_report, build_waiver_expiry_report};

pub fn run(args: RunArgs, view: WaiverViewArg) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let inputs = WaiverInputs {
        waiver_policy: require_registry_or_exit(&bundle, WAIVER_POLICY),
        ownership_matrix: require_registry_or_exit(&bundle, OWNERSHIP_MATRIX),
        escalation_policy: require_registry_or_exit(&bundle, ESCALATION_POLICY),
        evaluation_time: &settings.generated_at,
        strict_mode: settings.strict_mode,
    };
    let ctx = settings.report_context();
    match view {
        WaiverViewArg::Active => {
            let report = build_waiver_active_report(&schemas, &inputs, &ctx);
            emit_report("waiver-report", &report, settings.json);
        }
        WaiverViewArg::Expiry => {
            let report = build_waiver_expiry_report(&schemas, &inputs, &ctx);
            emit_report("waiver-report", &report, settings.json);
        }
    }
}
