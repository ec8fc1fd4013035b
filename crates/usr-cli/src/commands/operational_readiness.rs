use crate::cli::{BlockerArgs, RunArgs};
use crate::support::{
    collect_missing_artifacts, conformance_inputs_or_exit, exit_unless_ok, load_bundle_or_exit,
    print_json, print_summary, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::readiness::{
    OperationalInputs, build_operational_readiness_report, missing_artifact_schemas,
};
use usr_kernel::schema::registries::{OPERATIONAL_READINESS_POLICY, QUALITY_GATES};

pub fn run(args: RunArgs, blockers: BlockerArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let policy = require_registry_or_exit(&bundle, OPERATIONAL_READINESS_POLICY);

    let missing = collect_missing_artifacts(
        &schemas,
        &bundle,
        &blockers,
        missing_artifact_schemas(&schemas, policy),
    );
    let inputs = OperationalInputs {
        operational_readiness_policy: policy,
        quality_gates: require_registry_or_exit(&bundle, QUALITY_GATES),
        conformance: conformance_inputs_or_exit(&bundle, &settings.known_lanes),
        missing_artifact_schemas: &missing,
        failing_blocking_gate_ids: &blockers.failing_gates,
    };
    let report = build_operational_readiness_report(&schemas, &inputs, &settings.report_context());

    if settings.json {
        print_json(&report.payload, "operational-readiness");
    } else {
        let mut errors: Vec<String> = report.blockers.iter().map(ToString::to_string).collect();
        errors.extend(report.errors.iter().cloned());
        print_summary(
            "operational-readiness",
            report.ok,
            &[
                ("Artifact", report.payload.artifact_id.clone()),
                ("Status", report.payload.status.as_str().to_string()),
                ("Rows", report.rows.len().to_string()),
                ("Blockers", report.blockers.len().to_string()),
            ],
            &errors,
            &report.warnings,
        );
    }
    exit_unless_ok(report.ok);
}
