//! Typed registry documents and their row records.
//!
//! Payloads arrive as JSON, pass the closed schema check, and are then
//! projected into these structs (see [`crate::schema::SchemaRegistry::project`]).
//! Business rules only ever see the typed form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registry<R> {
    pub schema_version: String,
    pub registry_id: String,
    pub generated_at: String,
    pub generated_by: String,
    pub rows: Vec<R>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConformanceLevel {
    C0,
    C1,
    C2,
    C3,
    C4,
}

impl ConformanceLevel {
    pub const ALL: [ConformanceLevel; 5] = [
        ConformanceLevel::C0,
        ConformanceLevel::C1,
        ConformanceLevel::C2,
        ConformanceLevel::C3,
        ConformanceLevel::C4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::C0 => "C0",
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::C3 => "C3",
            Self::C4 => "C4",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

impl std::fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigValueType {
    Boolean,
    Integer,
    Enum,
}

impl ConfigValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityState {
    Supported,
    Partial,
    Unsupported,
}

impl CapabilityState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supported => "supported",
            Self::Partial => "partial",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FixtureProfileType {
    Language,
    Framework,
    CrossCutting,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Language,
    Framework,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StabilityClass {
    Stable,
    Volatile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MutationPolicy {
    RequireRfc,
    RequireReview,
    AllowGeneratedRefresh,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ShardScope {
    Foundation,
    LanguageBatch,
    Integration,
}

impl ShardScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::LanguageBatch => "language-batch",
            Self::Integration => "integration",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum OperationalPhase {
    PreCutover,
    Cutover,
    Incident,
    PostCutover,
}

impl OperationalPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreCutover => "pre-cutover",
            Self::Cutover => "cutover",
            Self::Incident => "incident",
            Self::PostCutover => "post-cutover",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfigRow {
    pub id: String,
    pub key: String,
    pub value_type: ConfigValueType,
    pub default_value: Value,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    pub rollout_class: String,
    pub strict_mode_behavior: String,
    pub requires_restart: bool,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureInjectionRow {
    pub id: String,
    pub fault_class: String,
    pub injection_layer: String,
    pub strict_expected_outcome: String,
    pub non_strict_expected_outcome: String,
    pub required_diagnostics: Vec<String>,
    pub required_reason_codes: Vec<String>,
    #[serde(default)]
    pub rollback_trigger_consecutive_failures: Option<u32>,
    #[serde(default)]
    pub required_recovery_artifacts: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixtureGovernanceRow {
    pub fixture_id: String,
    pub profile_type: FixtureProfileType,
    pub profile_id: String,
    pub conformance_levels: Vec<String>,
    pub families: Vec<String>,
    #[serde(default)]
    pub roadmap_tags: Vec<String>,
    pub owner: String,
    pub reviewers: Vec<String>,
    pub stability_class: StabilityClass,
    pub mutation_policy: MutationPolicy,
    pub golden_required: bool,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionPolicy {
    pub min_version: String,
    pub max_version: Option<String>,
    pub dialects: Vec<String>,
    pub feature_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingPolicy {
    pub can_host_embedded: bool,
    pub can_be_embedded: bool,
    pub embedded_language_allowlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProfileRow {
    pub id: String,
    pub parser_preference: String,
    #[serde(default)]
    pub language_version_policy: Option<VersionPolicy>,
    #[serde(default)]
    pub embedding_policy: Option<EmbeddingPolicy>,
    pub required_node_kinds: Vec<String>,
    pub required_edge_kinds: Vec<String>,
    pub required_capabilities: BTreeMap<String, CapabilityState>,
    pub fallback_chain: Vec<String>,
    pub framework_profiles: Vec<String>,
    pub required_conformance: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LanguageProfileRow {
    pub fn requires_level(&self, level: ConformanceLevel) -> bool {
        self.required_conformance
            .iter()
            .any(|item| item == level.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageVersionPolicyRow {
    pub language_id: String,
    pub min_version: String,
    pub max_version: Option<String>,
    pub dialects: Vec<String>,
    pub feature_flags: Vec<String>,
}

impl LanguageVersionPolicyRow {
    pub fn policy(&self) -> VersionPolicy {
        VersionPolicy {
            min_version: self.min_version.clone(),
            max_version: self.max_version.clone(),
            dialects: self.dialects.clone(),
            feature_flags: self.feature_flags.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEmbeddingPolicyRow {
    pub language_id: String,
    pub can_host_embedded: bool,
    pub can_be_embedded: bool,
    pub embedded_language_allowlist: Vec<String>,
}

impl LanguageEmbeddingPolicyRow {
    pub fn policy(&self) -> EmbeddingPolicy {
        EmbeddingPolicy {
            can_host_embedded: self.can_host_embedded,
            can_be_embedded: self.can_be_embedded,
            embedded_language_allowlist: self.embedded_language_allowlist.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeKindMappingRow {
    pub language_id: String,
    pub parser_source: String,
    pub raw_kind: String,
    pub normalized_kind: String,
    pub category: String,
    pub confidence: f64,
    pub priority: u32,
    pub provenance: String,
    pub language_version_selector: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParserRuntimeLockRow {
    pub parser_source: String,
    pub language_id: String,
    pub parser_name: String,
    pub parser_version: String,
    pub runtime_name: String,
    pub runtime_version: String,
    pub lock_reason: String,
    #[serde(default)]
    pub max_upgrade_budget_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchShardRow {
    pub id: String,
    pub lane_id: String,
    pub sequence: u32,
    pub scope_type: ShardScope,
    pub language_ids: Vec<String>,
    pub depends_on: Vec<String>,
    pub order_manifest: String,
    pub gate_id: String,
    pub required_conformance: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationRules {
    pub blocks: Vec<String>,
    pub ordering: Vec<String>,
    pub cross_block_linking: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingSemantics {
    pub required_edge_kinds: Vec<String>,
    pub required_attrs: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSemantics {
    pub enabled: bool,
    pub pattern_canon: String,
    pub runtime_sides: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HydrationSemantics {
    pub required: bool,
    pub boundary_signals: Vec<String>,
    pub ssr_csr_modes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedLanguageBridge {
    pub source_block: String,
    pub target_block: String,
    pub edge_kinds: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkProfileRow {
    pub id: String,
    pub detection_precedence: Vec<String>,
    pub applies_to_languages: Vec<String>,
    pub segmentation_rules: SegmentationRules,
    pub binding_semantics: BindingSemantics,
    pub route_semantics: RouteSemantics,
    pub hydration_semantics: HydrationSemantics,
    pub embedded_language_bridges: Vec<EmbeddedLanguageBridge>,
    pub edge_case_case_ids: Vec<String>,
    pub required_conformance: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkEdgeCaseRow {
    pub id: String,
    pub framework_profile: String,
    pub category: String,
    pub required_edge_kinds: Vec<String>,
    pub required_diagnostics: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RiskTaxonomy {
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
    pub sanitizers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RiskCapabilities {
    pub risk_local: CapabilityState,
    pub risk_interprocedural: CapabilityState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterproceduralGating {
    pub enabled_by_default: bool,
    pub min_evidence_kinds: Vec<String>,
    pub required_call_link_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeverityPolicy {
    pub levels: Vec<String>,
    pub default_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageRiskProfileRow {
    pub language_id: String,
    pub framework_profile: Option<String>,
    pub required: RiskTaxonomy,
    pub optional: RiskTaxonomy,
    pub unsupported: RiskTaxonomy,
    pub capabilities: RiskCapabilities,
    pub interprocedural_gating: InterproceduralGating,
    pub severity_policy: SeverityPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityMatrixRow {
    pub language_id: String,
    pub framework_profile: Option<String>,
    pub capability: String,
    pub state: CapabilityState,
    pub required_conformance: Vec<String>,
    pub downgrade_diagnostics: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeKindConstraintRow {
    pub edge_kind: String,
    pub source_entity_kinds: Vec<String>,
    pub target_entity_kinds: Vec<String>,
    pub required_attrs: Vec<String>,
    pub optional_attrs: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingBridgeCaseRow {
    pub id: String,
    pub container_kind: String,
    pub source_language_id: String,
    pub target_language_id: String,
    pub required_edge_kinds: Vec<String>,
    pub required_diagnostics: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MappingExpectation {
    Exact,
    Approximate,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProvenanceCaseRow {
    pub id: String,
    pub language_id: String,
    pub generation_kind: String,
    pub mapping_expectation: MappingExpectation,
    pub required_diagnostics: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReaderMode {
    Strict,
    NonStrict,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedOutcome {
    Accept,
    Reject,
    AcceptWithAdapter,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackcompatRow {
    pub id: String,
    pub producer_version: String,
    pub reader_versions: Vec<String>,
    pub reader_mode: ReaderMode,
    pub fixture_family: String,
    pub expected_outcome: ExpectedOutcome,
    pub required_diagnostics: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConformanceLevelRow {
    pub profile_type: ProfileType,
    pub profile_id: String,
    pub required_levels: Vec<String>,
    pub blocking_levels: Vec<String>,
    pub required_fixture_families: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRow {
    pub id: String,
    pub domain: String,
    pub owner_role: String,
    pub backup_owner_role: String,
    pub escalation_policy_id: String,
    pub evidence_artifacts: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRow {
    pub id: String,
    pub trigger_class: String,
    pub severity: Severity,
    pub required_approvers: Vec<String>,
    pub max_ack_minutes: u32,
    pub max_resolution_minutes: u32,
    pub auto_block_promotion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PercentileTargets {
    pub p50_duration_ms: u64,
    pub p95_duration_ms: u64,
    pub p99_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkPolicyRow {
    pub id: String,
    pub lane_id: String,
    pub dataset_class: String,
    pub host_class: String,
    pub warmup_runs: u32,
    pub measure_runs: u32,
    pub percentile_targets: PercentileTargets,
    pub max_variance_pct: f64,
    pub max_peak_memory_mb: u64,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SloBudgetRow {
    pub lane_id: String,
    pub profile_scope: String,
    pub scope_id: String,
    pub max_duration_ms: u64,
    pub max_memory_mb: u64,
    pub max_parser_time_per_segment_ms: u64,
    pub max_unknown_kind_rate: f64,
    pub max_unresolved_rate: f64,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGateRow {
    pub id: String,
    pub check: String,
    pub scope: String,
    pub enforcement: String,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertPolicyRow {
    pub id: String,
    pub metric: String,
    pub threshold: f64,
    pub comparator: String,
    pub window: String,
    pub severity: String,
    pub escalation_policy_id: String,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedactionRuleRow {
    pub id: String,
    pub class: String,
    pub replacement: String,
    pub applies_to: Vec<String>,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityGateRow {
    pub id: String,
    pub domain: String,
    pub scope_type: String,
    pub scope_id: String,
    pub metric: String,
    pub threshold_operator: String,
    pub threshold_value: f64,
    pub fixture_set_id: String,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationalReadinessRow {
    pub id: String,
    pub phase: OperationalPhase,
    pub runbook_id: String,
    pub severity_class: String,
    pub required_roles: Vec<String>,
    pub required_artifacts: Vec<String>,
    pub communication_channels: Vec<String>,
    pub max_response_minutes: u32,
    pub max_recovery_minutes: u32,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThreatModelRow {
    pub id: String,
    pub threat_class: String,
    pub attack_surface: String,
    pub required_controls: Vec<String>,
    pub required_fixtures: Vec<String>,
    pub severity: Severity,
    pub blocking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaiverRow {
    pub id: String,
    pub waiver_class: String,
    pub scope_type: String,
    pub scope_id: String,
    pub allowed_until: String,
    pub approvers: Vec<String>,
    pub required_compensating_controls: Vec<String>,
    pub max_extensions: u32,
    pub blocking: bool,
}

/// Occurrences of each row key, for uniqueness checks.
pub fn key_counts<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conformance_levels_order_and_parse() {
        assert!(ConformanceLevel::C0 < ConformanceLevel::C4);
        assert_eq!(ConformanceLevel::parse("C3"), Some(ConformanceLevel::C3));
        assert_eq!(ConformanceLevel::parse("C5"), None);
        assert_eq!(ConformanceLevel::C2.to_string(), "C2");
    }

    #[test]
    fn runtime_config_row_accepts_null_bounds() {
        let row: RuntimeConfigRow = serde_json::from_value(json!({
            "id": "cfg-a",
            "key": "usr.a",
            "valueType": "integer",
            "defaultValue": 5,
            "minValue": null,
            "maxValue": 10,
            "rolloutClass": "stable",
            "strictModeBehavior": "disallow",
            "requiresRestart": false,
            "blocking": true
        }))
        .expect("row should deserialize");
        assert_eq!(row.min_value, None);
        assert_eq!(row.max_value, Some(10.0));
        assert_eq!(row.allowed_values, None);
        assert_eq!(row.value_type, ConfigValueType::Integer);
    }

    #[test]
    fn percentile_targets_use_camel_case_wire_names() {
        let targets: PercentileTargets = serde_json::from_value(json!({
            "p50DurationMs": 1,
            "p95DurationMs": 2,
            "p99DurationMs": 3
        }))
        .expect("targets should deserialize");
        assert_eq!(targets.p99_duration_ms, 3);
    }
}
