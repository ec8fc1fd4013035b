//! Language and framework catalog contract.
//!
//! Checks the profile catalogs against each other and against the policy
//! registries that must cover every language: version and embedding
//! policy, the capability matrix, parser runtime locks, and node-kind
//! mappings. Links between languages and frameworks must agree in both
//! directions.

use crate::codes::validate_diagnostic_code;
use crate::findings::Findings;
use crate::registry::{
    CapabilityMatrixRow, CapabilityState, FrameworkEdgeCaseRow, FrameworkProfileRow,
    LanguageEmbeddingPolicyRow, LanguageProfileRow, LanguageVersionPolicyRow, NodeKindMappingRow,
    ParserRuntimeLockRow, key_counts,
};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{
    CAPABILITY_MATRIX, FRAMEWORK_EDGE_CASES, FRAMEWORK_PROFILES, LANGUAGE_EMBEDDING_POLICY,
    LANGUAGE_PROFILES, LANGUAGE_VERSION_POLICY, NODE_KIND_MAPPING, PARSER_RUNTIME_LOCK,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Language id used by parser locks and node-kind mappings that apply to
/// every language.
pub const ANY_LANGUAGE: &str = "*";

const REQUIRED_BINDING_EDGE_KINDS: [&str; 2] = ["template_binds", "style_scopes"];
const ROUTE_EDGE_KIND: &str = "route_maps_to";

#[derive(Debug, Clone, Copy)]
pub struct CatalogInputs<'a> {
    pub language_profiles: &'a Value,
    pub framework_profiles: &'a Value,
    pub framework_edge_cases: &'a Value,
    pub language_version_policy: &'a Value,
    pub language_embedding_policy: &'a Value,
    pub capability_matrix: &'a Value,
    pub parser_runtime_lock: &'a Value,
    pub node_kind_mapping: &'a Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetrics {
    pub languages: usize,
    pub frameworks: usize,
    pub edge_cases: usize,
    pub capability_rows: usize,
    pub version_rows: usize,
    pub embedding_rows: usize,
    pub parser_lock_rows: usize,
    pub node_kind_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogContract {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: CatalogMetrics,
}

struct Catalog {
    languages: Vec<LanguageProfileRow>,
    frameworks: Vec<FrameworkProfileRow>,
    edge_cases: Vec<FrameworkEdgeCaseRow>,
    versions: Vec<LanguageVersionPolicyRow>,
    embeddings: Vec<LanguageEmbeddingPolicyRow>,
    capabilities: Vec<CapabilityMatrixRow>,
    parser_locks: Vec<ParserRuntimeLockRow>,
    node_kinds: Vec<NodeKindMappingRow>,
}

impl Catalog {
    fn load(schemas: &SchemaRegistry, inputs: &CatalogInputs<'_>) -> Result<Self, Vec<String>> {
        Ok(Self {
            languages: schemas.project(LANGUAGE_PROFILES, inputs.language_profiles)?.rows,
            frameworks: schemas.project(FRAMEWORK_PROFILES, inputs.framework_profiles)?.rows,
            edge_cases: schemas
                .project(FRAMEWORK_EDGE_CASES, inputs.framework_edge_cases)?
                .rows,
            versions: schemas
                .project(LANGUAGE_VERSION_POLICY, inputs.language_version_policy)?
                .rows,
            embeddings: schemas
                .project(LANGUAGE_EMBEDDING_POLICY, inputs.language_embedding_policy)?
                .rows,
            capabilities: schemas.project(CAPABILITY_MATRIX, inputs.capability_matrix)?.rows,
            parser_locks: schemas
                .project(PARSER_RUNTIME_LOCK, inputs.parser_runtime_lock)?
                .rows,
            node_kinds: schemas.project(NODE_KIND_MAPPING, inputs.node_kind_mapping)?.rows,
        })
    }

    fn metrics(&self) -> CatalogMetrics {
        CatalogMetrics {
            languages: self.languages.len(),
            frameworks: self.frameworks.len(),
            edge_cases: self.edge_cases.len(),
            capability_rows: self.capabilities.len(),
            version_rows: self.versions.len(),
            embedding_rows: self.embeddings.len(),
            parser_lock_rows: self.parser_locks.len(),
            node_kind_rows: self.node_kinds.len(),
        }
    }
}

fn capability_key(row: &CapabilityMatrixRow) -> String {
    format!(
        "{}::{}::{}",
        row.language_id,
        row.framework_profile.as_deref().unwrap_or("none"),
        row.capability
    )
}

fn node_kind_key(row: &NodeKindMappingRow) -> String {
    format!(
        "{}::{}::{}::{}",
        row.language_id,
        row.parser_source,
        row.raw_kind,
        row.language_version_selector.as_deref().unwrap_or(ANY_LANGUAGE)
    )
}

fn report_duplicates<'a>(
    keys: impl Iterator<Item = &'a str>,
    label: &str,
    findings: &mut Findings,
) {
    for (key, count) in key_counts(keys) {
        if count > 1 {
            findings.error(format!("duplicate {label}: {key}"));
        }
    }
}

fn check_frameworks(catalog: &Catalog, findings: &mut Findings) {
    let language_by_id: BTreeMap<&str, &LanguageProfileRow> = catalog
        .languages
        .iter()
        .map(|row| (row.id.as_str(), row))
        .collect();
    let framework_ids: BTreeSet<&str> = catalog.frameworks.iter().map(|row| row.id.as_str()).collect();
    let edge_case_by_id: BTreeMap<&str, &FrameworkEdgeCaseRow> = catalog
        .edge_cases
        .iter()
        .map(|row| (row.id.as_str(), row))
        .collect();

    for edge_case in &catalog.edge_cases {
        let Some(framework) = catalog
            .frameworks
            .iter()
            .find(|framework| framework.id == edge_case.framework_profile)
        else {
            findings.error(format!(
                "framework edge-case {} references unknown profile {}",
                edge_case.id, edge_case.framework_profile
            ));
            continue;
        };
        if !framework.edge_case_case_ids.contains(&edge_case.id) {
            findings.warning(format!(
                "framework edge-case {} is not listed in framework profile {} edgeCaseCaseIds",
                edge_case.id, framework.id
            ));
        }
    }

    for framework in &catalog.frameworks {
        let id = &framework.id;
        if framework.applies_to_languages.is_empty() {
            findings.error(format!("framework profile {id} has empty appliesToLanguages"));
        }
        for language_id in &framework.applies_to_languages {
            match language_by_id.get(language_id.as_str()) {
                None => findings.error(format!(
                    "framework profile {id} references unknown appliesToLanguage {language_id}"
                )),
                Some(language) if !language.framework_profiles.contains(id) => {
                    findings.error(format!(
                        "framework profile {id} applies to {language_id} but language profile does not list it"
                    ))
                }
                Some(_) => {}
            }
        }

        if framework.edge_case_case_ids.is_empty() {
            findings.error(format!("framework profile {id} has empty edgeCaseCaseIds"));
        }
        for case_id in &framework.edge_case_case_ids {
            match edge_case_by_id.get(case_id.as_str()) {
                None => findings.error(format!(
                    "framework profile {id} references unknown edge-case {case_id}"
                )),
                Some(edge_case) if edge_case.framework_profile != *id => findings.error(format!(
                    "framework profile {id} lists edge-case {case_id} owned by {}",
                    edge_case.framework_profile
                )),
                Some(_) => {}
            }
        }

        let edge_kinds = &framework.binding_semantics.required_edge_kinds;
        for kind in REQUIRED_BINDING_EDGE_KINDS {
            if !edge_kinds.iter().any(|item| item == kind) {
                findings.error(format!(
                    "framework profile {id} missing {kind} in bindingSemantics.requiredEdgeKinds"
                ));
            }
        }
        if framework.route_semantics.enabled && !edge_kinds.iter().any(|item| item == ROUTE_EDGE_KIND) {
            findings.error(format!(
                "framework profile {id} missing {ROUTE_EDGE_KIND} while routeSemantics.enabled is true"
            ));
        }
    }

    let mut referenced = BTreeSet::new();
    for language in &catalog.languages {
        for framework_id in &language.framework_profiles {
            referenced.insert(framework_id.as_str());
            let Some(framework) = catalog
                .frameworks
                .iter()
                .find(|framework| framework.id == *framework_id)
            else {
                findings.error(format!(
                    "language profile {} references unknown framework {framework_id}",
                    language.id
                ));
                continue;
            };
            if !framework.applies_to_languages.contains(&language.id) {
                findings.error(format!(
                    "language profile {} lists framework {framework_id} but framework does not apply to it",
                    language.id
                ));
            }
        }
    }
    for framework_id in framework_ids.difference(&referenced) {
        findings.warning(format!(
            "framework profile {framework_id} is not referenced by any language profile"
        ));
    }
}

fn check_policies(catalog: &Catalog, findings: &mut Findings) {
    let language_ids: BTreeSet<&str> = catalog.languages.iter().map(|row| row.id.as_str()).collect();

    let mut version_by_language = BTreeMap::new();
    for row in &catalog.versions {
        if version_by_language.insert(row.language_id.as_str(), row).is_some() {
            findings.error(format!(
                "duplicate version policy row for language {}",
                row.language_id
            ));
        }
        if !language_ids.contains(row.language_id.as_str()) {
            findings.error(format!(
                "version policy references unknown language {}",
                row.language_id
            ));
        }
    }

    let mut embedding_by_language = BTreeMap::new();
    for row in &catalog.embeddings {
        if embedding_by_language.insert(row.language_id.as_str(), row).is_some() {
            findings.error(format!(
                "duplicate embedding policy row for language {}",
                row.language_id
            ));
        }
        if !language_ids.contains(row.language_id.as_str()) {
            findings.error(format!(
                "embedding policy references unknown language {}",
                row.language_id
            ));
        }
        for embedded in &row.embedded_language_allowlist {
            if !language_ids.contains(embedded.as_str()) {
                findings.warning(format!(
                    "embedding policy for {} allows unknown language {embedded}",
                    row.language_id
                ));
            }
        }
    }

    for language in &catalog.languages {
        let id = &language.id;
        match version_by_language.get(id.as_str()) {
            None => findings.error(format!("language profile {id} missing version policy row")),
            Some(row) if language.language_version_policy.as_ref() != Some(&row.policy()) => {
                findings.error(format!(
                    "language profile {id} languageVersionPolicy does not match version policy row"
                ))
            }
            Some(_) => {}
        }
        match embedding_by_language.get(id.as_str()) {
            None => findings.error(format!("language profile {id} missing embedding policy row")),
            Some(row) if language.embedding_policy.as_ref() != Some(&row.policy()) => {
                findings.error(format!(
                    "language profile {id} embeddingPolicy does not match embedding policy row"
                ))
            }
            Some(_) => {}
        }
    }
}

fn check_capabilities(catalog: &Catalog, findings: &mut Findings) {
    let language_ids: BTreeSet<&str> = catalog.languages.iter().map(|row| row.id.as_str()).collect();
    let framework_ids: BTreeSet<&str> = catalog.frameworks.iter().map(|row| row.id.as_str()).collect();

    let keys: Vec<String> = catalog.capabilities.iter().map(capability_key).collect();
    report_duplicates(keys.iter().map(String::as_str), "capability matrix row", findings);

    let mut reported_unknown = BTreeSet::new();
    for (row, key) in catalog.capabilities.iter().zip(&keys) {
        if !language_ids.contains(row.language_id.as_str())
            && reported_unknown.insert(row.language_id.as_str())
        {
            findings.error(format!(
                "capability matrix references unknown language {}",
                row.language_id
            ));
        }
        if let Some(framework_id) = row
            .framework_profile
            .as_deref()
            .filter(|id| !framework_ids.contains(id))
        {
            findings.error(format!(
                "capability matrix row {key} references unknown framework {framework_id}"
            ));
        }

        if row.state == CapabilityState::Supported {
            continue;
        }
        if row.downgrade_diagnostics.is_empty() {
            findings.error(format!(
                "capability matrix row {key} with state {} requires downgradeDiagnostics",
                row.state.as_str()
            ));
        }
        for code in &row.downgrade_diagnostics {
            for message in validate_diagnostic_code(code, true).errors {
                findings.error(format!("capability matrix row {key} {message}"));
            }
        }
    }

    let language_states: BTreeMap<(&str, &str), CapabilityState> = catalog
        .capabilities
        .iter()
        .filter(|row| row.framework_profile.is_none())
        .map(|row| ((row.language_id.as_str(), row.capability.as_str()), row.state))
        .collect();
    for language in &catalog.languages {
        let id = language.id.as_str();
        if !catalog.capabilities.iter().any(|row| row.language_id == id) {
            findings.error(format!("language profile {id} missing capability matrix rows"));
            continue;
        }
        for (capability, state) in &language.required_capabilities {
            match language_states.get(&(id, capability.as_str())) {
                None => findings.error(format!(
                    "language profile {id} missing capability matrix row for {capability}"
                )),
                Some(matrix_state) if matrix_state != state => findings.error(format!(
                    "language profile {id} capability {capability} is {} but capability matrix declares {}",
                    state.as_str(),
                    matrix_state.as_str()
                )),
                Some(_) => {}
            }
        }
    }
}

fn check_parser_locks(catalog: &Catalog, findings: &mut Findings) {
    let keys: Vec<String> = catalog
        .parser_locks
        .iter()
        .map(|row| format!("{}::{}", row.parser_source, row.language_id))
        .collect();
    report_duplicates(keys.iter().map(String::as_str), "parser runtime lock", findings);

    let locked: BTreeSet<(&str, &str)> = catalog
        .parser_locks
        .iter()
        .map(|row| (row.parser_source.as_str(), row.language_id.as_str()))
        .collect();
    for language in &catalog.languages {
        for parser_source in &language.fallback_chain {
            let source = parser_source.as_str();
            if !locked.contains(&(source, language.id.as_str()))
                && !locked.contains(&(source, ANY_LANGUAGE))
            {
                findings.error(format!(
                    "language profile {} fallback parser {source} has no parser runtime lock",
                    language.id
                ));
            }
        }
    }
}

fn check_node_kinds(catalog: &Catalog, findings: &mut Findings) {
    let language_ids: BTreeSet<&str> = catalog.languages.iter().map(|row| row.id.as_str()).collect();
    let keys: Vec<String> = catalog.node_kinds.iter().map(node_kind_key).collect();
    report_duplicates(keys.iter().map(String::as_str), "node-kind mapping key", findings);

    let unknown: BTreeSet<&str> = catalog
        .node_kinds
        .iter()
        .map(|row| row.language_id.as_str())
        .filter(|id| *id != ANY_LANGUAGE && !language_ids.contains(id))
        .collect();
    for language_id in unknown {
        findings.error(format!(
            "node-kind mapping references unknown language {language_id}"
        ));
    }
}

/// Cross-checks the language and framework catalogs with their policy
/// registries. Any registry failing its schema short-circuits.
pub fn validate_catalog_contract(
    schemas: &SchemaRegistry,
    inputs: &CatalogInputs<'_>,
) -> CatalogContract {
    let catalog = match Catalog::load(schemas, inputs) {
        Ok(catalog) => catalog,
        Err(errors) => {
            return CatalogContract {
                ok: false,
                errors,
                warnings: Vec::new(),
                metrics: CatalogMetrics::default(),
            };
        }
    };

    let mut findings = Findings::new();
    report_duplicates(
        catalog.languages.iter().map(|row| row.id.as_str()),
        "language profile id",
        &mut findings,
    );
    report_duplicates(
        catalog.frameworks.iter().map(|row| row.id.as_str()),
        "framework profile id",
        &mut findings,
    );
    report_duplicates(
        catalog.edge_cases.iter().map(|row| row.id.as_str()),
        "framework edge-case id",
        &mut findings,
    );
    check_frameworks(&catalog, &mut findings);
    check_policies(&catalog, &mut findings);
    check_capabilities(&catalog, &mut findings);
    check_parser_locks(&catalog, &mut findings);
    check_node_kinds(&catalog, &mut findings);

    let metrics = catalog.metrics();
    tracing::debug!(
        languages = metrics.languages,
        frameworks = metrics.frameworks,
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated catalog contract"
    );
    CatalogContract {
        ok: findings.is_ok(),
        errors: findings.errors,
        warnings: findings.warnings,
        metrics,
    }
}
