use crate::cli::RunArgs;
use crate::support::{
    emit_validation, load_bundle_or_exit, read_json_file_or_exit, require_registry_or_exit,
    schemas_or_exit, settings,
};
use serde_json::Value;
use usr_kernel::edges::{EdgeContractInputs, validate_edge_endpoints, validate_edge_kind_contract};
use usr_kernel::registry::EdgeKindConstraintRow;
use usr_kernel::schema::registries::{
    EDGE_KIND_CONSTRAINTS, EMBEDDING_BRIDGE_CASES, FRAMEWORK_PROFILES, GENERATED_PROVENANCE_CASES,
    LANGUAGE_PROFILES,
};

/// Checks the edge-kind contract; with `edges`, also checks each edge in
/// that file against the constraint table.
pub fn run(args: RunArgs, edges: Option<String>) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let constraints = require_registry_or_exit(&bundle, EDGE_KIND_CONSTRAINTS);
    let mut validation = validate_edge_kind_contract(
        &schemas,
        &EdgeContractInputs {
            edge_kind_constraints: constraints,
            language_profiles: require_registry_or_exit(&bundle, LANGUAGE_PROFILES),
            framework_profiles: require_registry_or_exit(&bundle, FRAMEWORK_PROFILES),
            embedding_bridge_cases: require_registry_or_exit(&bundle, EMBEDDING_BRIDGE_CASES),
            generated_provenance_cases: require_registry_or_exit(&bundle, GENERATED_PROVENANCE_CASES),
        },
    );

    if let Some(path) = edges {
        let payload: Value = read_json_file_or_exit(&path, "edges");
        match schemas.project::<EdgeKindConstraintRow>(EDGE_KIND_CONSTRAINTS, constraints) {
            Ok(registry) => {
                let outcome = validate_edge_endpoints(&payload, &registry.rows);
                tracing::debug!(errors = outcome.errors.len(), "checked edge endpoints");
                validation.ok &= outcome.ok;
                validation.errors.extend(outcome.errors);
            }
            Err(errors) => {
                validation.ok = false;
                validation.errors.extend(errors);
            }
        }
    }
    emit_validation("edge-contract-check", &validation, settings.json);
}
