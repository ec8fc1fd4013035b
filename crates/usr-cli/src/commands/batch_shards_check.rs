use crate::cli::RunArgs;
use crate::support::{
    emit_validation, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::batch_shards::validate_language_batch_shards;
use usr_kernel::schema::registries::{LANGUAGE_BATCH_SHARDS, LANGUAGE_PROFILES};

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let validation = validate_language_batch_shards(
        &schemas,
        require_registry_or_exit(&bundle, LANGUAGE_BATCH_SHARDS),
        require_registry_or_exit(&bundle, LANGUAGE_PROFILES),
    );
    emit_validation("batch-shards-check", &validation, settings.json);
}
