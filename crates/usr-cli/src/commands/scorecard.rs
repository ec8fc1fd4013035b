use crate::cli::{BlockerArgs, RunArgs};
use crate::support::{
    collect_missing_artifacts, conformance_inputs_or_exit, exit_unless_ok, load_bundle_or_exit,
    pass_fail_label, print_json, print_summary, require_registry_or_exit, schemas_or_exit,
    settings,
};
use usr_kernel::readiness::{
    OperationalInputs, build_release_readiness_scorecard, missing_artifact_schemas,
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
    let scorecard = build_release_readiness_scorecard(&schemas, &inputs, &settings.report_context());

    if settings.json {
        print_json(&scorecard.payload, "scorecard");
    } else {
        let gates: Vec<String> = scorecard
            .rows
            .iter()
            .map(|row| format!("{} {}", row.id, pass_fail_label(row.pass)))
            .collect();
        let mut errors: Vec<String> = scorecard.blockers.iter().map(ToString::to_string).collect();
        errors.extend(scorecard.errors.iter().cloned());
        print_summary(
            "scorecard",
            scorecard.ok,
            &[
                ("Status", scorecard.payload.status.as_str().to_string()),
                ("Rows", gates.join(", ")),
            ],
            &errors,
            &scorecard.warnings,
        );
    }
    exit_unless_ok(scorecard.ok);
}
