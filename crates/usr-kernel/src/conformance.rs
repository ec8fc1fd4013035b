//! Conformance level coverage and promotion readiness.
//!
//! Coverage is computed per level `C0..C4` over every profile that requires
//! it. Promotion readiness groups the levels into three gates and collects
//! typed [`Blocker`]s. Blockers only turn into prefixed strings when they
//! are serialized into a report.

use crate::findings::Findings;
use crate::registry::{
    ConformanceLevel, ConformanceLevelRow, FrameworkProfileRow, LanguageProfileRow, ProfileType,
    key_counts,
};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{CONFORMANCE_LEVELS, FRAMEWORK_PROFILES, LANGUAGE_PROFILES};
use crate::schema::reports::CONFORMANCE_SUMMARY;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

pub const CONFORMANCE_LANE: &str = "conformance";

/// First lane named `conformance` or `conformance-*`.
pub fn resolve_conformance_lane(known_lanes: &[String]) -> Option<&str> {
    known_lanes
        .iter()
        .map(String::as_str)
        .find(|lane| *lane == CONFORMANCE_LANE || lane.starts_with("conformance-"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gate {
    TestRollout,
    DeepConformance,
    FrameworkConformance,
}

impl Gate {
    pub const ALL: [Gate; 3] = [
        Gate::TestRollout,
        Gate::DeepConformance,
        Gate::FrameworkConformance,
    ];

    pub fn for_level(level: ConformanceLevel) -> Self {
        match level {
            ConformanceLevel::C0 | ConformanceLevel::C1 => Self::TestRollout,
            ConformanceLevel::C2 | ConformanceLevel::C3 => Self::DeepConformance,
            ConformanceLevel::C4 => Self::FrameworkConformance,
        }
    }

    pub fn levels(self) -> &'static [ConformanceLevel] {
        match self {
            Self::TestRollout => &[ConformanceLevel::C0, ConformanceLevel::C1],
            Self::DeepConformance => &[ConformanceLevel::C2, ConformanceLevel::C3],
            Self::FrameworkConformance => &[ConformanceLevel::C4],
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::TestRollout => "missing-test-rollout-readiness",
            Self::DeepConformance => "missing-deep-conformance-readiness",
            Self::FrameworkConformance => "missing-framework-conformance-readiness",
        }
    }
}

/// Why a conformance level failed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LevelFailure {
    MissingConformanceLane,
    NoRequiredProfiles,
    FailingProfiles(Vec<String>),
    InvalidInput,
}

impl std::fmt::Display for LevelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingConformanceLane => f.write_str("missing-conformance-lane"),
            Self::NoRequiredProfiles => f.write_str("no-required-profiles"),
            Self::FailingProfiles(ids) => write!(f, "failing-profiles={}", ids.join(",")),
            Self::InvalidInput => f.write_str("invalid-input"),
        }
    }
}

/// A reason promotion is blocked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Blocker {
    FailingGate(String),
    MissingArtifact(String),
    Readiness {
        gate: Gate,
        level: ConformanceLevel,
        reason: LevelFailure,
    },
    /// A policy-shape defect raised by a later readiness stage.
    Policy {
        policy: &'static str,
        subject: Option<String>,
        reason: &'static str,
    },
}

impl Blocker {
    pub fn gate(&self) -> Option<Gate> {
        match self {
            Self::Readiness { gate, .. } => Some(*gate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Blocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailingGate(id) => write!(f, "failing-gate:{id}"),
            Self::MissingArtifact(id) => write!(f, "missing-artifact:{id}"),
            Self::Readiness {
                gate,
                level,
                reason,
            } => write!(f, "{}:{level}:{reason}", gate.prefix()),
            Self::Policy {
                policy,
                subject: Some(subject),
                reason,
            } => write!(f, "{policy}:{subject}:{reason}"),
            Self::Policy {
                policy,
                subject: None,
                reason,
            } => write!(f, "{policy}:{reason}"),
        }
    }
}

impl Serialize for Blocker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Appends `incoming` blockers not already present, keeping first-seen order.
pub fn union_blockers(mut blockers: Vec<Blocker>, incoming: Vec<Blocker>) -> Vec<Blocker> {
    for blocker in incoming {
        if !blockers.contains(&blocker) {
            blockers.push(blocker);
        }
    }
    blockers
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLevelRow {
    pub profile_type: ProfileType,
    pub profile_id: String,
    pub target_level: ConformanceLevel,
    pub requires_level: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelCoverage {
    pub target_level: ConformanceLevel,
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<ProfileLevelRow>,
    pub required_profile_count: usize,
    pub failing_profile_ids: Vec<String>,
    pub conformance_lane: Option<String>,
}

impl LevelCoverage {
    pub fn failure(&self) -> Option<LevelFailure> {
        if self.ok {
            return None;
        }
        if self.conformance_lane.is_none() {
            return Some(LevelFailure::MissingConformanceLane);
        }
        if !self.failing_profile_ids.is_empty() {
            return Some(LevelFailure::FailingProfiles(self.failing_profile_ids.clone()));
        }
        if self.required_profile_count == 0 {
            return Some(LevelFailure::NoRequiredProfiles);
        }
        Some(LevelFailure::InvalidInput)
    }

    fn invalid(target_level: ConformanceLevel, errors: Vec<String>) -> Self {
        Self {
            target_level,
            ok: false,
            errors,
            warnings: Vec::new(),
            rows: Vec::new(),
            required_profile_count: 0,
            failing_profile_ids: Vec::new(),
            conformance_lane: None,
        }
    }
}

/// Inputs for coverage and readiness. `framework_profiles` may be
/// `Value::Null` to restrict evaluation to language profiles.
#[derive(Debug, Clone, Copy)]
pub struct ConformanceInputs<'a> {
    pub language_profiles: &'a Value,
    pub framework_profiles: &'a Value,
    pub conformance_levels: &'a Value,
    pub known_lanes: &'a [String],
}

/// One profile as seen by the coverage check.
struct Profile<'a> {
    profile_type: ProfileType,
    id: &'a str,
    required_conformance: &'a [String],
    has_framework_overlays: bool,
}

struct Catalog {
    languages: Vec<LanguageProfileRow>,
    frameworks: Vec<FrameworkProfileRow>,
    levels: Vec<ConformanceLevelRow>,
}

impl Catalog {
    fn load(schemas: &SchemaRegistry, inputs: &ConformanceInputs<'_>) -> Result<Self, Vec<String>> {
        let languages = schemas
            .project::<LanguageProfileRow>(LANGUAGE_PROFILES, inputs.language_profiles)?
            .rows;
        let frameworks = if inputs.framework_profiles.is_null() {
            Vec::new()
        } else {
            schemas
                .project::<FrameworkProfileRow>(FRAMEWORK_PROFILES, inputs.framework_profiles)?
                .rows
        };
        let levels = schemas
            .project::<ConformanceLevelRow>(CONFORMANCE_LEVELS, inputs.conformance_levels)?
            .rows;
        Ok(Self {
            languages,
            frameworks,
            levels,
        })
    }

    fn profiles(&self) -> Vec<Profile<'_>> {
        let mut profiles: Vec<Profile<'_>> = self
            .languages
            .iter()
            .map(|row| Profile {
                profile_type: ProfileType::Language,
                id: &row.id,
                required_conformance: &row.required_conformance,
                has_framework_overlays: !row.framework_profiles.is_empty(),
            })
            .collect();
        profiles.extend(self.frameworks.iter().map(|row| Profile {
            profile_type: ProfileType::Framework,
            id: &row.id,
            required_conformance: &row.required_conformance,
            has_framework_overlays: true,
        }));
        profiles
    }

    fn coverage_rows(&self) -> BTreeMap<(ProfileKey, &str), &ConformanceLevelRow> {
        let mut rows = BTreeMap::new();
        for row in &self.levels {
            rows.entry((ProfileKey::from(row.profile_type), row.profile_id.as_str()))
                .or_insert(row);
        }
        rows
    }

    /// One error per coverage row whose `(profileType, profileId)` repeats,
    /// in row order. Only the first such row is used for coverage.
    fn duplicate_coverage_errors(&self) -> Vec<String> {
        let keys: Vec<String> = self
            .levels
            .iter()
            .map(|row| format!("{:?}:{}", ProfileKey::from(row.profile_type), row.profile_id))
            .collect();
        let counts = key_counts(keys.iter().map(String::as_str));
        self.levels
            .iter()
            .zip(&keys)
            .filter(|(_, key)| counts.get(key.as_str()).copied().unwrap_or(0) > 1)
            .map(|(row, _)| format!("{} duplicate conformance-level coverage row", row.profile_id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ProfileKey {
    Language,
    Framework,
}

impl From<ProfileType> for ProfileKey {
    fn from(value: ProfileType) -> Self {
        match value {
            ProfileType::Language => Self::Language,
            ProfileType::Framework => Self::Framework,
        }
    }
}

/// Fixture families a coverage row must list for `level`. Framework
/// profiles are overlays themselves and only owe the overlay family.
fn required_families(profile: &Profile<'_>, level: ConformanceLevel) -> Vec<&'static str> {
    if profile.profile_type == ProfileType::Framework {
        return vec!["framework-overlay"];
    }
    let mut families = vec!["golden"];
    match level {
        ConformanceLevel::C1 => families.push("resolution"),
        ConformanceLevel::C3 => families.push("risk"),
        ConformanceLevel::C4 if profile.has_framework_overlays => {
            families.push("framework-overlay")
        }
        _ => {}
    }
    families
}

fn check_profile(
    profile: &Profile<'_>,
    coverage: Option<&&ConformanceLevelRow>,
    level: ConformanceLevel,
) -> ProfileLevelRow {
    let requires_level = profile
        .required_conformance
        .iter()
        .any(|item| item == level.as_str());
    let mut findings = Findings::new();

    match coverage {
        None if requires_level => {
            findings.error(format!("missing conformance-level coverage row for {level}"));
        }
        None => {}
        Some(row) => {
            let declares = row.required_levels.iter().any(|item| item == level.as_str());
            let blocks = row.blocking_levels.iter().any(|item| item == level.as_str());
            if requires_level {
                if !declares {
                    findings.error(format!("conformance-level row must include {level} in requiredLevels"));
                }
                if !blocks {
                    findings.error(format!("conformance-level row must include {level} in blockingLevels"));
                }
                if row.required_fixture_families.is_empty() {
                    findings.error("requiredFixtureFamilies must not be empty");
                }
                for family in required_families(profile, level) {
                    if !row.required_fixture_families.iter().any(|item| item == family) {
                        findings.error(format!(
                            "requiredFixtureFamilies must include {family} for {level}"
                        ));
                    }
                }
            } else if declares {
                findings.warning(format!(
                    "conformance-level row declares {level} but profile requiredConformance does not"
                ));
            }
        }
    }

    let pass = findings.is_ok();
    let findings = findings.prefixed(profile.id);
    ProfileLevelRow {
        profile_type: profile.profile_type,
        profile_id: profile.id.to_string(),
        target_level: level,
        requires_level,
        pass,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

fn coverage_for(catalog: &Catalog, level: ConformanceLevel, lane: Option<&str>) -> LevelCoverage {
    let coverage_rows = catalog.coverage_rows();
    let mut findings = Findings::new();
    let mut rows = Vec::new();
    let mut required_profile_count = 0;
    let mut failing_profile_ids = Vec::new();

    if lane.is_none() {
        findings.error(format!(
            "{level} requires a conformance lane in knownLanes (conformance or conformance-*)"
        ));
    }
    for message in catalog.duplicate_coverage_errors() {
        findings.error(message);
    }

    for profile in catalog.profiles() {
        let key = (ProfileKey::from(profile.profile_type), profile.id);
        let row = check_profile(&profile, coverage_rows.get(&key), level);
        if row.requires_level {
            required_profile_count += 1;
            if !row.pass {
                failing_profile_ids.push(row.profile_id.clone());
            }
        }
        findings.errors.extend(row.errors.iter().cloned());
        findings.warnings.extend(row.warnings.iter().cloned());
        rows.push(row);
    }

    if required_profile_count == 0 {
        findings.error(format!("no profiles require conformance level {level}"));
    }

    tracing::debug!(
        level = %level,
        profiles = rows.len(),
        required = required_profile_count,
        failing = failing_profile_ids.len(),
        "computed conformance level coverage"
    );

    LevelCoverage {
        target_level: level,
        ok: findings.is_ok(),
        errors: findings.errors,
        warnings: findings.warnings,
        rows,
        required_profile_count,
        failing_profile_ids,
        conformance_lane: lane.map(str::to_string),
    }
}

/// Coverage of one conformance level across every profile.
pub fn validate_conformance_level_coverage(
    schemas: &SchemaRegistry,
    inputs: &ConformanceInputs<'_>,
    target_level: ConformanceLevel,
) -> LevelCoverage {
    match Catalog::load(schemas, inputs) {
        Ok(catalog) => coverage_for(
            &catalog,
            target_level,
            resolve_conformance_lane(inputs.known_lanes),
        ),
        Err(errors) => LevelCoverage::invalid(target_level, errors),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessFlags {
    pub test_rollout_blocked: bool,
    pub deep_conformance_blocked: bool,
    pub framework_conformance_blocked: bool,
}

impl ReadinessFlags {
    pub fn all_blocked() -> Self {
        Self {
            test_rollout_blocked: true,
            deep_conformance_blocked: true,
            framework_conformance_blocked: true,
        }
    }

    pub fn from_blockers(blockers: &[Blocker]) -> Self {
        let blocked = |gate: Gate| blockers.iter().any(|blocker| blocker.gate() == Some(gate));
        Self {
            test_rollout_blocked: blocked(Gate::TestRollout),
            deep_conformance_blocked: blocked(Gate::DeepConformance),
            framework_conformance_blocked: blocked(Gate::FrameworkConformance),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelStatus {
    pub pass: bool,
    pub required_profile_count: usize,
    pub failing_profile_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromotionReadiness {
    pub ok: bool,
    pub blocked: bool,
    pub blockers: Vec<Blocker>,
    pub readiness: ReadinessFlags,
    pub conformance_by_level: BTreeMap<ConformanceLevel, LevelStatus>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PromotionReadiness {
    pub(crate) fn invalid(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            blocked: true,
            blockers: Vec::new(),
            readiness: ReadinessFlags::all_blocked(),
            conformance_by_level: BTreeMap::new(),
            errors,
            warnings: Vec::new(),
        }
    }

    pub fn blocker_strings(&self) -> Vec<String> {
        self.blockers.iter().map(ToString::to_string).collect()
    }
}

/// Caller-supplied blocker tokens, passed through without interpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalBlockers<'a> {
    pub failing_blocking_gate_ids: &'a [String],
    pub missing_artifacts: &'a [String],
}

/// Groups level coverage into the three promotion gates.
pub fn evaluate_promotion_readiness(
    schemas: &SchemaRegistry,
    inputs: &ConformanceInputs<'_>,
    external: &ExternalBlockers<'_>,
) -> PromotionReadiness {
    let catalog = match Catalog::load(schemas, inputs) {
        Ok(catalog) => catalog,
        Err(errors) => return PromotionReadiness::invalid(errors),
    };
    let lane = resolve_conformance_lane(inputs.known_lanes);

    let mut blockers: Vec<Blocker> = external
        .failing_blocking_gate_ids
        .iter()
        .map(|id| Blocker::FailingGate(id.clone()))
        .collect();
    blockers = union_blockers(
        blockers,
        external
            .missing_artifacts
            .iter()
            .map(|id| Blocker::MissingArtifact(id.clone()))
            .collect(),
    );

    let mut warnings = Vec::new();
    let mut conformance_by_level = BTreeMap::new();
    for gate in Gate::ALL {
        for level in gate.levels() {
            let coverage = coverage_for(&catalog, *level, lane);
            warnings.extend(coverage.warnings.iter().cloned());
            conformance_by_level.insert(
                *level,
                LevelStatus {
                    pass: coverage.ok,
                    required_profile_count: coverage.required_profile_count,
                    failing_profile_count: coverage.failing_profile_ids.len(),
                    error_count: coverage.errors.len(),
                    warning_count: coverage.warnings.len(),
                },
            );
            if let Some(reason) = coverage.failure() {
                blockers = union_blockers(
                    blockers,
                    vec![Blocker::Readiness {
                        gate,
                        level: *level,
                        reason,
                    }],
                );
            }
        }
    }

    let readiness = ReadinessFlags::from_blockers(&blockers);
    let blocked = !blockers.is_empty();
    tracing::debug!(
        blockers = blockers.len(),
        test_rollout_blocked = readiness.test_rollout_blocked,
        deep_conformance_blocked = readiness.deep_conformance_blocked,
        framework_conformance_blocked = readiness.framework_conformance_blocked,
        "evaluated promotion readiness"
    );
    PromotionReadiness {
        ok: !blocked,
        blocked,
        blockers,
        readiness,
        conformance_by_level,
        errors: Vec::new(),
        warnings,
    }
}

const SUMMARY_KIND: ReportKind = ReportKind {
    artifact_id: CONFORMANCE_SUMMARY,
    producer_id: "usr-conformance-validator",
    run_id: "run-usr-conformance-summary",
    finding_class: "conformance",
};

/// `usr-conformance-summary` for one target level.
pub fn build_conformance_summary_report(
    schemas: &SchemaRegistry,
    inputs: &ConformanceInputs<'_>,
    target_level: ConformanceLevel,
    ctx: &ReportContext,
) -> BuiltReport<ProfileLevelRow> {
    let coverage = validate_conformance_level_coverage(schemas, inputs, target_level);
    let (pass_count, fail_count) = pass_fail(&coverage.rows, |row| row.pass);

    let mut summary = Map::new();
    summary.insert("targetLevel".into(), json!(target_level));
    summary.insert("profileCount".into(), json!(coverage.rows.len()));
    summary.insert(
        "requiredProfileCount".into(),
        json!(coverage.required_profile_count),
    );
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert("warningCount".into(), json!(coverage.warnings.len()));
    summary.insert("errorCount".into(), json!(coverage.errors.len()));
    summary.insert("conformanceLane".into(), json!(coverage.conformance_lane));

    let validation = Validation {
        ok: coverage.ok,
        errors: coverage.errors,
        warnings: coverage.warnings,
        rows: coverage.rows,
    };
    BuiltReport::from_validation(validation, ctx, &SUMMARY_KIND, &Scope::global(), summary)
}

/// Profiles named by coverage rows that no profile registry defines.
pub fn orphan_coverage_rows(
    schemas: &SchemaRegistry,
    inputs: &ConformanceInputs<'_>,
) -> Result<Vec<String>, Vec<String>> {
    let catalog = Catalog::load(schemas, inputs)?;
    let known: BTreeSet<(ProfileKey, &str)> = catalog
        .profiles()
        .iter()
        .map(|profile| (ProfileKey::from(profile.profile_type), profile.id))
        .collect();
    let check_frameworks = !inputs.framework_profiles.is_null();
    Ok(catalog
        .levels
        .iter()
        .filter(|row| check_frameworks || row.profile_type == ProfileType::Language)
        .filter(|row| !known.contains(&(ProfileKey::from(row.profile_type), row.profile_id.as_str())))
        .map(|row| row.profile_id.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(id: &str, rows: Vec<Value>) -> Value {
        json!({
            "schemaVersion": "usr-registry-1.0.0",
            "registryId": id,
            "generatedAt": "2026-02-12T00:00:00Z",
            "generatedBy": "test",
            "rows": rows
        })
    }

    fn language(id: &str, frameworks: &[&str]) -> Value {
        json!({
            "id": id,
            "parserPreference": "native",
            "requiredNodeKinds": ["module"],
            "requiredEdgeKinds": ["contains"],
            "requiredCapabilities": {"symbolGraph": "supported"},
            "fallbackChain": ["native", "heuristic"],
            "frameworkProfiles": frameworks,
            "requiredConformance": ["C0", "C1", "C2", "C3", "C4"]
        })
    }

    fn coverage(id: &str) -> Value {
        json!({
            "profileType": "language",
            "profileId": id,
            "requiredLevels": ["C0", "C1", "C2", "C3", "C4"],
            "blockingLevels": ["C0", "C1", "C2", "C3", "C4"],
            "requiredFixtureFamilies": ["golden", "resolution", "risk", "framework-overlay"]
        })
    }

    struct Fixture {
        languages: Value,
        levels: Value,
        lanes: Vec<String>,
    }

    impl Fixture {
        fn baseline() -> Self {
            Self {
                languages: registry(
                    "usr-language-profiles",
                    vec![language("javascript", &["react"]), language("python", &[])],
                ),
                levels: registry(
                    "usr-conformance-levels",
                    vec![coverage("javascript"), coverage("python")],
                ),
                lanes: vec!["ci".to_string(), "conformance-core".to_string()],
            }
        }

        fn inputs(&self) -> ConformanceInputs<'_> {
            ConformanceInputs {
                language_profiles: &self.languages,
                framework_profiles: &Value::Null,
                conformance_levels: &self.levels,
                known_lanes: &self.lanes,
            }
        }
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn baseline_promotion_is_unblocked() {
        let fixture = Fixture::baseline();
        let result =
            evaluate_promotion_readiness(&schemas(), &fixture.inputs(), &ExternalBlockers::default());
        assert!(!result.blocked, "{:?}", result.blocker_strings());
        assert!(result.ok);
        assert!(!result.readiness.test_rollout_blocked);
        assert!(!result.readiness.deep_conformance_blocked);
        assert!(!result.readiness.framework_conformance_blocked);
        assert_eq!(result.conformance_by_level.len(), 5);
    }

    #[test]
    fn failing_gate_is_first_blocker() {
        let fixture = Fixture::baseline();
        let gates = vec!["qg-resolution-accuracy".to_string()];
        let result = evaluate_promotion_readiness(
            &schemas(),
            &fixture.inputs(),
            &ExternalBlockers {
                failing_blocking_gate_ids: &gates,
                missing_artifacts: &[],
            },
        );
        assert!(result.blocked);
        assert_eq!(result.blocker_strings(), vec!["failing-gate:qg-resolution-accuracy"]);
        assert!(!result.readiness.test_rollout_blocked);
    }

    #[test]
    fn missing_required_level_blocks_its_gate() {
        let mut fixture = Fixture::baseline();
        fixture.levels["rows"][0]["requiredLevels"] = json!(["C1", "C2", "C3", "C4"]);
        let result =
            evaluate_promotion_readiness(&schemas(), &fixture.inputs(), &ExternalBlockers::default());
        assert!(result.readiness.test_rollout_blocked);
        assert!(!result.readiness.deep_conformance_blocked);
        assert_eq!(
            result.blocker_strings(),
            vec!["missing-test-rollout-readiness:C0:failing-profiles=javascript"]
        );
    }

    #[test]
    fn missing_conformance_lane_blocks_every_gate() {
        let mut fixture = Fixture::baseline();
        fixture.lanes = vec!["ci".to_string()];
        let result =
            evaluate_promotion_readiness(&schemas(), &fixture.inputs(), &ExternalBlockers::default());
        assert!(result.readiness.framework_conformance_blocked);
        assert!(
            result
                .blocker_strings()
                .contains(&"missing-framework-conformance-readiness:C4:missing-conformance-lane".to_string())
        );

        let c0 = validate_conformance_level_coverage(
            &schemas(),
            &fixture.inputs(),
            ConformanceLevel::C0,
        );
        assert!(!c0.ok);
        assert_eq!(c0.failure(), Some(LevelFailure::MissingConformanceLane));
    }

    #[test]
    fn overlay_family_required_only_for_profiles_with_frameworks() {
        let mut fixture = Fixture::baseline();
        fixture.levels["rows"][1]["requiredFixtureFamilies"] = json!(["golden", "resolution", "risk"]);
        let c4 = validate_conformance_level_coverage(
            &schemas(),
            &fixture.inputs(),
            ConformanceLevel::C4,
        );
        assert!(c4.ok, "{:?}", c4.errors);

        fixture.levels["rows"][0]["requiredFixtureFamilies"] = json!(["golden", "resolution", "risk"]);
        let c4 = validate_conformance_level_coverage(
            &schemas(),
            &fixture.inputs(),
            ConformanceLevel::C4,
        );
        assert_eq!(
            c4.errors,
            vec!["javascript requiredFixtureFamilies must include framework-overlay for C4"]
        );
    }

    #[test]
    fn dropped_profile_requirement_is_advisory() {
        let mut fixture = Fixture::baseline();
        fixture.languages["rows"][0]["requiredConformance"] = json!(["C0", "C1", "C2", "C3"]);
        let c4 = validate_conformance_level_coverage(
            &schemas(),
            &fixture.inputs(),
            ConformanceLevel::C4,
        );
        assert!(c4.ok);
        assert_eq!(c4.required_profile_count, 1);
        assert!(c4.warnings[0].starts_with("javascript "));
    }

    #[test]
    fn duplicate_coverage_rows_are_blocking() {
        let mut fixture = Fixture::baseline();
        let mut contradicting = coverage("python");
        contradicting["requiredLevels"] = json!([]);
        fixture.levels["rows"]
            .as_array_mut()
            .expect("rows array")
            .push(contradicting);
        let c0 = validate_conformance_level_coverage(
            &schemas(),
            &fixture.inputs(),
            ConformanceLevel::C0,
        );
        assert!(!c0.ok);
        assert_eq!(
            c0.errors,
            vec![
                "python duplicate conformance-level coverage row",
                "python duplicate conformance-level coverage row",
            ]
        );
        assert_eq!(c0.failure(), Some(LevelFailure::InvalidInput));
    }

    fn framework(id: &str, languages: &[&str]) -> Value {
        json!({
            "id": id,
            "detectionPrecedence": ["config-override", "package-signature"],
            "appliesToLanguages": languages,
            "segmentationRules": {"blocks": ["script"], "ordering": ["container-first"], "crossBlockLinking": []},
            "bindingSemantics": {"requiredEdgeKinds": ["template_binds", "style_scopes"], "requiredAttrs": {}},
            "routeSemantics": {"enabled": false, "patternCanon": "none", "runtimeSides": []},
            "hydrationSemantics": {"required": false, "boundarySignals": [], "ssrCsrModes": []},
            "embeddedLanguageBridges": [],
            "edgeCaseCaseIds": [],
            "requiredConformance": ["C4"]
        })
    }

    #[test]
    fn framework_profiles_owe_only_the_overlay_family() {
        let mut fixture = Fixture::baseline();
        fixture.levels["rows"]
            .as_array_mut()
            .expect("rows")
            .push(json!({
                "profileType": "framework",
                "profileId": "react",
                "requiredLevels": ["C4"],
                "blockingLevels": ["C4"],
                "requiredFixtureFamilies": ["framework-overlay", "embedded-bridge"]
            }));
        let frameworks = registry("usr-framework-profiles", vec![framework("react", &["javascript"])]);
        let inputs = ConformanceInputs {
            framework_profiles: &frameworks,
            ..fixture.inputs()
        };
        let c4 = validate_conformance_level_coverage(&schemas(), &inputs, ConformanceLevel::C4);
        assert!(c4.ok, "{:?}", c4.errors);
        assert_eq!(c4.required_profile_count, 3);

        let c0 = validate_conformance_level_coverage(&schemas(), &inputs, ConformanceLevel::C0);
        assert_eq!(c0.required_profile_count, 2);
        assert!(orphan_coverage_rows(&schemas(), &inputs).expect("valid").is_empty());
    }

    #[test]
    fn summary_report_validates() {
        let fixture = Fixture::baseline();
        let report = build_conformance_summary_report(
            &schemas(),
            &fixture.inputs(),
            ConformanceLevel::C0,
            &ReportContext::new("2026-02-12T00:00:00Z").with_lane("conformance-core"),
        );
        assert!(report.ok);
        assert_eq!(report.payload.summary["passCount"], json!(2));
        let check = schemas().validate_report(CONFORMANCE_SUMMARY, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }

    #[test]
    fn blocker_union_keeps_first_occurrence() {
        let merged = union_blockers(
            vec![Blocker::FailingGate("a".into())],
            vec![Blocker::FailingGate("a".into()), Blocker::MissingArtifact("x".into())],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].to_string(), "missing-artifact:x");
    }
}
