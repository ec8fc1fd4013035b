use crate::cli::{BlockerArgs, RunArgs};
use crate::support::{
    collect_missing_artifacts, conformance_inputs_or_exit, exit_unless_ok, load_bundle_or_exit,
    print_json, print_summary, schemas_or_exit, settings, yes_no,
};
use usr_kernel::conformance::{ExternalBlockers, evaluate_promotion_readiness};

pub fn run(args: RunArgs, blockers: BlockerArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let inputs = conformance_inputs_or_exit(&bundle, &settings.known_lanes);
    let missing_artifacts = collect_missing_artifacts(&schemas, &bundle, &blockers, Vec::new());
    let readiness = evaluate_promotion_readiness(
        &schemas,
        &inputs,
        &ExternalBlockers {
            failing_blocking_gate_ids: &blockers.failing_gates,
            missing_artifacts: &missing_artifacts,
        },
    );

    if settings.json {
        print_json(&readiness, "promotion-readiness");
    } else {
        let flags = readiness.readiness;
        let mut errors = readiness.blocker_strings();
        errors.extend(readiness.errors.iter().cloned());
        print_summary(
            "promotion-readiness",
            !readiness.blocked,
            &[
                ("Blockers", readiness.blockers.len().to_string()),
                ("Test rollout blocked", yes_no(flags.test_rollout_blocked).to_string()),
                (
                    "Deep conformance blocked",
                    yes_no(flags.deep_conformance_blocked).to_string(),
                ),
                (
                    "Framework conformance blocked",
                    yes_no(flags.framework_conformance_blocked).to_string(),
                ),
            ],
            &errors,
            &readiness.warnings,
        );
    }
    exit_unless_ok(!readiness.blocked);
}
