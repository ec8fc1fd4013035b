use crate::cli::RunArgs;
use crate::support::{
    emit_validation, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::batch_shards::{HarnessInputs, validate_matrix_driven_harness_coverage};
use usr_kernel::schema::registries::{
    FIXTURE_GOVERNANCE, FRAMEWORK_PROFILES, LANGUAGE_BATCH_SHARDS, LANGUAGE_PROFILES,
};

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let inputs = HarnessInputs {
        language_profiles: require_registry_or_exit(&bundle, LANGUAGE_PROFILES),
        framework_profiles: require_registry_or_exit(&bundle, FRAMEWORK_PROFILES),
        fixture_governance: require_registry_or_exit(&bundle, FIXTURE_GOVERNANCE),
        batch_shards: require_registry_or_exit(&bundle, LANGUAGE_BATCH_SHARDS),
    };
    let validation =
        validate_matrix_driven_harness_coverage(&schemas, &inputs, &settings.known_lanes);
    emit_validation("harness-check", &validation, settings.json);
}
