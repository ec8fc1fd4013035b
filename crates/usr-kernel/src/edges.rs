//! Canonical ids, edge endpoints, and the edge-kind constraint table.
//!
//! The constraint table names which entity kinds may sit at either end of
//! each edge kind. Language and framework profiles, embedding bridges and
//! generated-provenance cases all refer to edge kinds by name, so the
//! table is also checked against each of them.

use crate::codes::validate_diagnostic_code;
use crate::findings::{CheckOutcome, Findings, Severity};
use crate::registry::{
    EdgeKindConstraintRow, EmbeddingBridgeCaseRow, FrameworkProfileRow, GeneratedProvenanceCaseRow,
    LanguageProfileRow, MappingExpectation, key_counts,
};
use crate::report::Validation;
use crate::schema::SchemaRegistry;
use crate::schema::registries::{
    EDGE_KIND_CONSTRAINTS, EMBEDDING_BRIDGE_CASES, FRAMEWORK_PROFILES, GENERATED_PROVENANCE_CASES,
    LANGUAGE_PROFILES,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Entity kinds an edge endpoint may reference.
pub const ENDPOINT_ENTITY_KINDS: [&str; 4] = ["document", "segment", "node", "symbol"];

/// Only this kind may point an entity at itself.
const SELF_EDGE_KIND: &str = "ast_parent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    DocUid,
    SegmentUid,
    NodeUid,
    SymbolUid,
    EdgeUid,
    RouteUid,
    ScopeUid,
    DiagnosticUid,
}

impl IdType {
    pub const ALL: [IdType; 8] = [
        IdType::DocUid,
        IdType::SegmentUid,
        IdType::NodeUid,
        IdType::SymbolUid,
        IdType::EdgeUid,
        IdType::RouteUid,
        IdType::ScopeUid,
        IdType::DiagnosticUid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocUid => "docUid",
            Self::SegmentUid => "segmentUid",
            Self::NodeUid => "nodeUid",
            Self::SymbolUid => "symbolUid",
            Self::EdgeUid => "edgeUid",
            Self::RouteUid => "routeUid",
            Self::ScopeUid => "scopeUid",
            Self::DiagnosticUid => "diagnosticUid",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id_type| id_type.as_str() == name)
    }

    /// Id type carried by an endpoint of the given entity kind.
    pub fn for_entity(entity: &str) -> Option<Self> {
        match entity {
            "document" => Some(Self::DocUid),
            "segment" => Some(Self::SegmentUid),
            "node" => Some(Self::NodeUid),
            "symbol" => Some(Self::SymbolUid),
            _ => None,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Self::DocUid => r"^doc64:v1:[a-f0-9]{16}$",
            Self::SegmentUid => r"^segu:v1:[a-f0-9]{16}$",
            Self::NodeUid => r"^n64:v1:[a-f0-9]{16}$",
            Self::SymbolUid => r"^symu:v1:[a-z0-9:_\-.]+$",
            Self::EdgeUid => r"^edge64:v1:[a-f0-9]{16}$",
            Self::RouteUid => r"^route64:v1:[a-f0-9]{16}$",
            Self::ScopeUid => r"^scope64:v1:[a-f0-9]{16}$",
            Self::DiagnosticUid => r"^diag64:v1:[a-f0-9]{16}$",
        }
    }

    fn regex(self) -> &'static Regex {
        static RE: OnceLock<Vec<Regex>> = OnceLock::new();
        let all = RE.get_or_init(|| {
            IdType::ALL
                .iter()
                .map(|id_type| Regex::new(id_type.pattern()).expect("canonical id regex must compile"))
                .collect()
        });
        &all[self as usize]
    }
}

pub fn validate_canonical_id(id_type: IdType, value: &Value) -> CheckOutcome {
    let Some(value) = value.as_str() else {
        return CheckOutcome::failed(vec![format!("{} must be a string", id_type.as_str())]);
    };
    if !id_type.regex().is_match(value) {
        return CheckOutcome::failed(vec![format!(
            "{} does not match canonical grammar",
            id_type.as_str()
        )]);
    }
    CheckOutcome::passed()
}

fn check_endpoint_ref(label: &str, endpoint: &Value, allowed: &[String], findings: &mut Findings) {
    let Some(endpoint) = endpoint.as_object() else {
        findings.error(format!("{label} ref must be an object"));
        return;
    };
    let Some(entity) = endpoint.get("entity").and_then(Value::as_str) else {
        findings.error(format!("{label}.entity must be a string"));
        return;
    };
    if !allowed.iter().any(|kind| kind == entity) {
        findings.error(format!("{label}.entity={entity} not allowed by edge-kind constraints"));
    }
    let Some(id_type) = IdType::for_entity(entity) else {
        findings.error(format!("{label}.entity={entity} has no canonical ID mapping"));
        return;
    };
    let uid = endpoint.get("uid").unwrap_or(&Value::Null);
    for error in validate_canonical_id(id_type, uid).errors {
        findings.error(format!("{label}.uid {error}"));
    }
}

fn present<'a>(edge: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    edge.get(key).filter(|value| !value.is_null())
}

/// Checks one edge against the constraint row for its kind. The kind is
/// read from `kind`, falling back to `edgeKind`.
pub fn validate_edge_endpoint(edge: &Value, constraints: &[EdgeKindConstraintRow]) -> CheckOutcome {
    let Some(edge) = edge.as_object() else {
        return CheckOutcome::failed(vec!["edge must be an object".to_string()]);
    };
    let mut findings = Findings::new();
    let edge_uid = edge.get("edgeUid").unwrap_or(&Value::Null);
    for error in validate_canonical_id(IdType::EdgeUid, edge_uid).errors {
        findings.error(format!("edgeUid {error}"));
    }

    let kind = edge
        .get("kind")
        .and_then(Value::as_str)
        .or_else(|| edge.get("edgeKind").and_then(Value::as_str));
    let Some(kind) = kind else {
        findings.error("edge kind must be provided as edge.kind or edge.edgeKind");
        return findings.into_outcome();
    };
    let Some(constraint) = constraints.iter().find(|row| row.edge_kind == kind) else {
        findings.error(format!("edge kind not present in constraint table: {kind}"));
        return findings.into_outcome();
    };

    let source = present(edge, "source");
    let target = present(edge, "target");
    if edge.get("status").and_then(Value::as_str) == Some("resolved") {
        if source.is_none() {
            findings.error("resolved edge must include source ref");
        }
        if target.is_none() {
            findings.error("resolved edge must include target ref");
        }
    }
    if let Some(source) = source {
        check_endpoint_ref("source", source, &constraint.source_entity_kinds, &mut findings);
    }
    if let Some(target) = target {
        check_endpoint_ref("target", target, &constraint.target_entity_kinds, &mut findings);
    }

    if let (Some(source), Some(target)) = (source, target) {
        let same_entity = source.get("entity") == target.get("entity");
        let same_uid = source.get("uid") == target.get("uid");
        if same_entity && same_uid {
            let reason = edge
                .get("attrs")
                .and_then(|attrs| attrs.get("selfLoopReason"))
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();
            if kind != SELF_EDGE_KIND {
                findings.error(format!("self-edge is only allowed for {SELF_EDGE_KIND}; received {kind}"));
            } else if reason.is_empty() {
                findings.error(format!("{SELF_EDGE_KIND} self-edge requires attrs.selfLoopReason"));
            }
        }
    }
    findings.into_outcome()
}

pub fn validate_edge_endpoints(edges: &Value, constraints: &[EdgeKindConstraintRow]) -> CheckOutcome {
    let Some(edges) = edges.as_array() else {
        return CheckOutcome::failed(vec!["edges must be an array".to_string()]);
    };
    let mut findings = Findings::new();
    for (index, edge) in edges.iter().enumerate() {
        for error in validate_edge_endpoint(edge, constraints).errors {
            findings.error(format!("edge[{index}] {error}"));
        }
    }
    findings.into_outcome()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeContractRowType {
    EdgeKind,
    EmbeddingBridge,
    GeneratedProvenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeContractResultRow {
    pub row_type: EdgeContractRowType,
    pub id: String,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeContractInputs<'a> {
    pub edge_kind_constraints: &'a Value,
    pub language_profiles: &'a Value,
    pub framework_profiles: &'a Value,
    pub embedding_bridge_cases: &'a Value,
    pub generated_provenance_cases: &'a Value,
}

struct EdgeContract {
    constraints: Vec<EdgeKindConstraintRow>,
    languages: Vec<LanguageProfileRow>,
    frameworks: Vec<FrameworkProfileRow>,
    bridges: Vec<EmbeddingBridgeCaseRow>,
    provenance: Vec<GeneratedProvenanceCaseRow>,
}

impl EdgeContract {
    fn load(schemas: &SchemaRegistry, inputs: &EdgeContractInputs<'_>) -> Result<Self, Vec<String>> {
        Ok(Self {
            constraints: schemas
                .project(EDGE_KIND_CONSTRAINTS, inputs.edge_kind_constraints)?
                .rows,
            languages: schemas.project(LANGUAGE_PROFILES, inputs.language_profiles)?.rows,
            frameworks: schemas.project(FRAMEWORK_PROFILES, inputs.framework_profiles)?.rows,
            bridges: schemas
                .project(EMBEDDING_BRIDGE_CASES, inputs.embedding_bridge_cases)?
                .rows,
            provenance: schemas
                .project(GENERATED_PROVENANCE_CASES, inputs.generated_provenance_cases)?
                .rows,
        })
    }

    fn constraint(&self, edge_kind: &str) -> Option<&EdgeKindConstraintRow> {
        self.constraints.iter().find(|row| row.edge_kind == edge_kind)
    }
}

fn check_constraint(row: &EdgeKindConstraintRow, duplicate: bool) -> Findings {
    let mut findings = Findings::new();
    if duplicate {
        findings.error("edgeKind must be unique");
    }
    for (field, kinds) in [
        ("sourceEntityKinds", &row.source_entity_kinds),
        ("targetEntityKinds", &row.target_entity_kinds),
    ] {
        if kinds.is_empty() {
            findings.error(format!("{field} must not be empty"));
        }
        for kind in kinds {
            if !ENDPOINT_ENTITY_KINDS.contains(&kind.as_str()) {
                findings.error(format!("{field} contains unknown entity kind {kind}"));
            }
        }
    }
    for attr in &row.required_attrs {
        if row.optional_attrs.contains(attr) {
            findings.error(format!("attr {attr} is both required and optional"));
        }
    }
    findings
}

fn check_diagnostics(codes: &[String], findings: &mut Findings) {
    for code in codes {
        for error in validate_diagnostic_code(code, true).errors {
            findings.error(format!("requiredDiagnostics {code}: {error}"));
        }
    }
}

fn check_bridge(
    row: &EmbeddingBridgeCaseRow,
    duplicate: bool,
    contract: &EdgeContract,
    known_languages: &BTreeSet<&str>,
) -> Findings {
    let severity = Severity::blocking_if(row.blocking);
    let mut findings = Findings::new();
    if duplicate {
        findings.error("id must be unique within embedding bridge cases");
    }
    for (field, language_id) in [
        ("sourceLanguageId", &row.source_language_id),
        ("targetLanguageId", &row.target_language_id),
    ] {
        if !known_languages.contains(language_id.as_str()) {
            findings.push(
                severity,
                format!("{field} {language_id} is not a known language profile"),
            );
        }
    }
    if row.required_edge_kinds.is_empty() {
        findings.push(severity, "requiredEdgeKinds must not be empty");
    }
    for edge_kind in &row.required_edge_kinds {
        if contract.constraint(edge_kind).is_none() {
            findings.error(format!("requiredEdgeKinds {edge_kind} has no edge-kind constraint"));
        }
    }
    check_diagnostics(&row.required_diagnostics, &mut findings);
    findings
}

fn check_provenance(
    row: &GeneratedProvenanceCaseRow,
    duplicate: bool,
    known_languages: &BTreeSet<&str>,
) -> Findings {
    let severity = Severity::blocking_if(row.blocking);
    let mut findings = Findings::new();
    if duplicate {
        findings.error("id must be unique within generated provenance cases");
    }
    if !known_languages.contains(row.language_id.as_str()) {
        findings.push(
            severity,
            format!("languageId {} is not a known language profile", row.language_id),
        );
    }
    if row.mapping_expectation != MappingExpectation::Exact && row.required_diagnostics.is_empty() {
        findings.push(
            severity,
            "inexact mapping expectations must require at least one diagnostic",
        );
    }
    check_diagnostics(&row.required_diagnostics, &mut findings);
    findings
}

/// Profile edge-kind references that have no constraint row. Framework
/// binding attrs must be declared on the constraint they bind through.
fn check_profile_references(contract: &EdgeContract, findings: &mut Findings) {
    for language in &contract.languages {
        for edge_kind in &language.required_edge_kinds {
            if contract.constraint(edge_kind).is_none() {
                findings.error(format!(
                    "{} requiredEdgeKinds {edge_kind} has no edge-kind constraint",
                    language.id
                ));
            }
        }
    }
    for framework in &contract.frameworks {
        let binding = &framework.binding_semantics;
        let bridge_kinds = framework
            .embedded_language_bridges
            .iter()
            .flat_map(|bridge| bridge.edge_kinds.iter());
        for edge_kind in binding.required_edge_kinds.iter().chain(bridge_kinds) {
            if contract.constraint(edge_kind).is_none() {
                findings.error(format!(
                    "{} references edge kind {edge_kind} with no edge-kind constraint",
                    framework.id
                ));
            }
        }
        for (edge_kind, attrs) in &binding.required_attrs {
            let Some(constraint) = contract.constraint(edge_kind) else {
                continue;
            };
            for attr in attrs {
                let declared = constraint.required_attrs.contains(attr)
                    || constraint.optional_attrs.contains(attr);
                if !declared {
                    findings.error(format!(
                        "{} bindingSemantics.requiredAttrs.{edge_kind} {attr} is not declared on the edge-kind constraint",
                        framework.id
                    ));
                }
            }
        }
    }
}

pub fn validate_edge_kind_contract(
    schemas: &SchemaRegistry,
    inputs: &EdgeContractInputs<'_>,
) -> Validation<EdgeContractResultRow> {
    let contract = match EdgeContract::load(schemas, inputs) {
        Ok(contract) => contract,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let known_languages: BTreeSet<&str> = contract
        .languages
        .iter()
        .map(|row| row.id.as_str())
        .collect();
    let kind_counts = key_counts(contract.constraints.iter().map(|row| row.edge_kind.as_str()));
    let bridge_counts = key_counts(contract.bridges.iter().map(|row| row.id.as_str()));
    let provenance_counts = key_counts(contract.provenance.iter().map(|row| row.id.as_str()));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(
        contract.constraints.len() + contract.bridges.len() + contract.provenance.len(),
    );
    let mut record = |row_type, id: &str, blocking, checked: Findings| {
        let pass = checked.is_ok();
        let checked = checked.prefixed(id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(EdgeContractResultRow {
            row_type,
            id: id.to_string(),
            blocking,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
        });
    };

    for row in &contract.constraints {
        let duplicate = kind_counts.get(row.edge_kind.as_str()).copied().unwrap_or(0) > 1;
        record(
            EdgeContractRowType::EdgeKind,
            &row.edge_kind,
            row.blocking,
            check_constraint(row, duplicate),
        );
    }
    for row in &contract.bridges {
        let duplicate = bridge_counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        record(
            EdgeContractRowType::EmbeddingBridge,
            &row.id,
            row.blocking,
            check_bridge(row, duplicate, &contract, &known_languages),
        );
    }
    for row in &contract.provenance {
        let duplicate = provenance_counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        record(
            EdgeContractRowType::GeneratedProvenance,
            &row.id,
            row.blocking,
            check_provenance(row, duplicate, &known_languages),
        );
    }
    check_profile_references(&contract, &mut findings);

    tracing::debug!(
        edge_kinds = contract.constraints.len(),
        bridges = contract.bridges.len(),
        provenance = contract.provenance.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated edge-kind contract"
    );
    Validation::from_findings(findings, rows)
}
