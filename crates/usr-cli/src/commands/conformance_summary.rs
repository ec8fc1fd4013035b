use crate::cli::RunArgs;
use crate::support::{
    conformance_inputs_or_exit, emit_report, load_bundle_or_exit, schemas_or_exit, settings,
};
use usr_kernel::ConformanceLevel;
use usr_kernel::conformance::build_conformance_summary_report;

pub fn run(args: RunArgs, level: String) {
    let Some(target_level) = ConformanceLevel::parse(&level) else {
        eprintln!("error: unknown conformance level: {level} (expected C0..C4)");
        std::process::exit(1);
    };
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let inputs = conformance_inputs_or_exit(&bundle, &settings.known_lanes);
    let report = build_conformance_summary_report(
        &schemas,
        &inputs,
        target_level,
        &settings.report_context(),
    );
    emit_report("conformance-summary", &report, settings.json);
}
