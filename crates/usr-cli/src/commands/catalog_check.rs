use crate::cli::RunArgs;
use crate::support::{
    exit_unless_ok, load_bundle_or_exit, print_json, print_summary, require_registry_or_exit,
    schemas_or_exit, settings,
};
use usr_kernel::catalog::{CatalogInputs, validate_catalog_contract};
use usr_kernel::schema::registries::{
    CAPABILITY_MATRIX, FRAMEWORK_EDGE_CASES, FRAMEWORK_PROFILES, LANGUAGE_EMBEDDING_POLICY,
    LANGUAGE_PROFILES, LANGUAGE_VERSION_POLICY, NODE_KIND_MAPPING, PARSER_RUNTIME_LOCK,
};

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();

    let inputs = CatalogInputs {
        language_profiles: require_registry_or_exit(&bundle, LANGUAGE_PROFILES),
        framework_profiles: require_registry_or_exit(&bundle, FRAMEWORK_PROFILES),
        framework_edge_cases: require_registry_or_exit(&bundle, FRAMEWORK_EDGE_CASES),
        language_version_policy: require_registry_or_exit(&bundle, LANGUAGE_VERSION_POLICY),
        language_embedding_policy: require_registry_or_exit(&bundle, LANGUAGE_EMBEDDING_POLICY),
        capability_matrix: require_registry_or_exit(&bundle, CAPABILITY_MATRIX),
        parser_runtime_lock: require_registry_or_exit(&bundle, PARSER_RUNTIME_LOCK),
        node_kind_mapping: require_registry_or_exit(&bundle, NODE_KIND_MAPPING),
    };
    let contract = validate_catalog_contract(&schemas, &inputs);

    if settings.json {
        print_json(&contract, "catalog-check");
    } else {
        let metrics = &contract.metrics;
        print_summary(
            "catalog-check",
            contract.ok,
            &[
                ("Languages", metrics.languages.to_string()),
                ("Frameworks", metrics.frameworks.to_string()),
                ("Edge cases", metrics.edge_cases.to_string()),
                ("Capability rows", metrics.capability_rows.to_string()),
                ("Parser locks", metrics.parser_lock_rows.to_string()),
                ("Node kinds", metrics.node_kind_rows.to_string()),
            ],
            &contract.errors,
            &contract.warnings,
        );
    }
    exit_unless_ok(contract.ok);
}
