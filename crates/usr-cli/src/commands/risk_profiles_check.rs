use crate::cli::RunArgs;
use crate::support::{
    emit_validation, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::risk_profiles::validate_language_risk_profile_coverage;
use usr_kernel::schema::registries::{LANGUAGE_PROFILES, LANGUAGE_RISK_PROFILES};

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let validation = validate_language_risk_profile_coverage(
        &schemas,
        require_registry_or_exit(&bundle, LANGUAGE_PROFILES),
        require_registry_or_exit(&bundle, LANGUAGE_RISK_PROFILES),
    );
    emit_validation("risk-profiles-check", &validation, settings.json);
}
