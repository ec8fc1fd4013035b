//! Language batch shard DAG.
//!
//! Shards form a fixed DAG: `B0` is the foundation, `B1..B7` are language
//! batches that each depend on `B0` alone, and `B8` integrates every
//! batch. Language batches partition the language profile ids between
//! them, each batch listing its ids in ascending order.
//!
//! [`validate_matrix_driven_harness_coverage`] checks that the harness the
//! shards drive can actually exercise every profile: each language needs a
//! batch and fixtures for the levels that batch gates on, and each
//! framework needs its own overlay fixtures.

use crate::conformance::resolve_conformance_lane;
use crate::findings::Findings;
use crate::registry::{
    BatchShardRow, ConformanceLevel, FixtureGovernanceRow, FixtureProfileType, FrameworkProfileRow,
    LanguageProfileRow, ShardScope, key_counts,
};
use crate::report::Validation;
use crate::schema::SchemaRegistry;
use crate::schema::registries::{
    FIXTURE_GOVERNANCE, FRAMEWORK_PROFILES, LANGUAGE_BATCH_SHARDS, LANGUAGE_PROFILES,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const FOUNDATION_SHARD: &str = "B0";
pub const INTEGRATION_SHARD: &str = "B8";
pub const LANGUAGE_BATCH_SHARD_IDS: [&str; 7] = ["B1", "B2", "B3", "B4", "B5", "B6", "B7"];

/// Canonical shard ids in sequence order.
pub fn canonical_shard_ids() -> Vec<&'static str> {
    let mut ids = vec![FOUNDATION_SHARD];
    ids.extend(LANGUAGE_BATCH_SHARD_IDS);
    ids.push(INTEGRATION_SHARD);
    ids
}

/// Scope and exact dependency set a canonical shard must declare.
pub fn canonical_shape(shard_id: &str) -> Option<(ShardScope, Vec<&'static str>)> {
    if shard_id == FOUNDATION_SHARD {
        return Some((ShardScope::Foundation, Vec::new()));
    }
    if shard_id == INTEGRATION_SHARD {
        return Some((ShardScope::Integration, LANGUAGE_BATCH_SHARD_IDS.to_vec()));
    }
    LANGUAGE_BATCH_SHARD_IDS
        .contains(&shard_id)
        .then(|| (ShardScope::LanguageBatch, vec![FOUNDATION_SHARD]))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchShardResultRow {
    pub id: String,
    pub scope_type: ShardScope,
    pub sequence: u32,
    pub language_count: usize,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn check_shard(
    row: &BatchShardRow,
    duplicate: bool,
    known_languages: &BTreeSet<&str>,
) -> BatchShardResultRow {
    let mut findings = Findings::new();
    if duplicate {
        findings.error("id must be unique within language batch shards");
    }

    let canonical = canonical_shard_ids();
    match canonical_shape(&row.id) {
        None => findings.error(format!(
            "is not a canonical batch shard id (expected one of {})",
            canonical.join(", ")
        )),
        Some((scope, depends_on)) => {
            if row.scope_type != scope {
                findings.error(format!(
                    "scopeType must be {} (received {})",
                    scope.as_str(),
                    row.scope_type.as_str()
                ));
            }
            let mut declared: Vec<&str> = row.depends_on.iter().map(String::as_str).collect();
            declared.sort_unstable();
            if declared != depends_on {
                findings.error(format!(
                    "dependsOn mismatch: expected [{}], received [{}]",
                    depends_on.join(", "),
                    row.depends_on.join(", ")
                ));
            }
            if let Some(position) = canonical
                .iter()
                .position(|id| *id == row.id)
                .filter(|position| row.sequence as usize != *position)
            {
                findings.error(format!("sequence must be {position}"));
            }
        }
    }

    if row.scope_type == ShardScope::LanguageBatch {
        if row.language_ids.is_empty() {
            findings.error("language-batch shards must assign at least one languageId");
        }
        if row.language_ids.windows(2).any(|pair| pair[0] >= pair[1]) {
            findings.error("languageIds must be sorted ascending");
        }
        for language_id in &row.language_ids {
            if !known_languages.contains(language_id.as_str()) {
                findings.error(format!("languageIds references unknown language {language_id}"));
            }
        }
    } else if !row.language_ids.is_empty() {
        findings.error(format!(
            "{} shards must not assign languageIds",
            row.scope_type.as_str()
        ));
    }

    if row.required_conformance.is_empty() {
        findings.warning("requiredConformance is empty");
    }
    for level in &row.required_conformance {
        if ConformanceLevel::parse(level).is_none() {
            findings.error(format!("requiredConformance contains unknown level {level}"));
        }
    }
    if row.gate_id.trim().is_empty() {
        findings.error("gateId must be non-empty");
    }
    if !row.order_manifest.ends_with(".json") {
        findings.warning("orderManifest should reference a .json manifest");
    }

    let pass = findings.is_ok();
    let findings = findings.prefixed(&row.id);
    BatchShardResultRow {
        id: row.id.clone(),
        scope_type: row.scope_type,
        sequence: row.sequence,
        language_count: row.language_ids.len(),
        pass,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

/// Every language id must be claimed by exactly one language-batch shard.
fn check_partition(
    shards: &[BatchShardRow],
    languages: &[LanguageProfileRow],
    findings: &mut Findings,
) {
    let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for shard in shards
        .iter()
        .filter(|shard| shard.scope_type == ShardScope::LanguageBatch)
    {
        for language_id in &shard.language_ids {
            owners
                .entry(language_id.as_str())
                .or_default()
                .push(shard.id.as_str());
        }
    }
    for (language_id, shard_ids) in &owners {
        if shard_ids.len() > 1 {
            findings.error(format!(
                "language {language_id} assigned to multiple shards: {}",
                shard_ids.join(", ")
            ));
        }
    }
    for language in languages {
        if !owners.contains_key(language.id.as_str()) {
            findings.error(format!(
                "language {} is not assigned to any language-batch shard",
                language.id
            ));
        }
    }
}

pub fn validate_language_batch_shards(
    schemas: &SchemaRegistry,
    batch_shards: &Value,
    language_profiles: &Value,
) -> Validation<BatchShardResultRow> {
    let shards = match schemas.project::<BatchShardRow>(LANGUAGE_BATCH_SHARDS, batch_shards) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let languages = match schemas.project::<LanguageProfileRow>(LANGUAGE_PROFILES, language_profiles) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let known_languages: BTreeSet<&str> = languages.iter().map(|row| row.id.as_str()).collect();
    let counts = key_counts(shards.iter().map(|row| row.id.as_str()));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(shards.len());
    for shard in &shards {
        let duplicate = counts.get(shard.id.as_str()).copied().unwrap_or(0) > 1;
        let checked = check_shard(shard, duplicate, &known_languages);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(checked);
    }
    for shard_id in canonical_shard_ids() {
        if !counts.contains_key(shard_id) {
            findings.error(format!("missing batch shard {shard_id}"));
        }
    }
    check_partition(&shards, &languages, &mut findings);

    tracing::debug!(
        shards = rows.len(),
        languages = languages.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated language batch shards"
    );
    Validation::from_findings(findings, rows)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HarnessProfileType {
    Language,
    Framework,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarnessCoverageRow {
    pub profile_type: HarnessProfileType,
    pub profile_id: String,
    pub shard_id: Option<String>,
    pub fixture_count: usize,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct HarnessInputs<'a> {
    pub language_profiles: &'a Value,
    pub framework_profiles: &'a Value,
    pub fixture_governance: &'a Value,
    pub batch_shards: &'a Value,
}

fn fixtures_for<'a>(
    fixtures: &'a [FixtureGovernanceRow],
    profile_type: FixtureProfileType,
    profile_id: &str,
) -> Vec<&'a FixtureGovernanceRow> {
    fixtures
        .iter()
        .filter(|row| row.profile_type == profile_type && row.profile_id == profile_id)
        .collect()
}

fn covers_level(fixtures: &[&FixtureGovernanceRow], level: &str) -> bool {
    fixtures
        .iter()
        .any(|row| row.conformance_levels.iter().any(|item| item == level))
}

fn check_language_harness(
    language: &LanguageProfileRow,
    shard: Option<&BatchShardRow>,
    fixtures: &[&FixtureGovernanceRow],
) -> Findings {
    let mut findings = Findings::new();
    match shard {
        None => findings.error("is not assigned to any language-batch shard"),
        Some(shard) => {
            for level in &shard.required_conformance {
                if !fixtures.is_empty() && !covers_level(fixtures, level) {
                    findings.error(format!(
                        "shard {} gates on {level} but no language fixture covers it",
                        shard.id
                    ));
                }
            }
        }
    }
    if fixtures.is_empty() {
        findings.error("has no language fixture governance rows");
    }
    if !language.framework_profiles.is_empty() && !language.requires_level(ConformanceLevel::C4) {
        findings.warning(format!(
            "declares framework profiles [{}] without requiring C4; framework harness coverage is downgraded",
            language.framework_profiles.join(", ")
        ));
    }
    findings
}

fn check_framework_harness(
    framework: &FrameworkProfileRow,
    known_languages: &BTreeSet<&str>,
    fixtures: &[&FixtureGovernanceRow],
) -> Findings {
    let mut findings = Findings::new();
    if fixtures.is_empty() {
        findings.error("has no framework fixture governance rows");
    } else if !covers_level(fixtures, ConformanceLevel::C4.as_str()) {
        findings.error("no framework fixture covers C4");
    }
    for language_id in &framework.applies_to_languages {
        if !known_languages.contains(language_id.as_str()) {
            findings.error(format!(
                "appliesToLanguages references unknown language {language_id}"
            ));
        }
    }
    if !framework.required_conformance.iter().any(|level| level == "C4") {
        findings.warning("requiredConformance does not include C4");
    }
    findings
}

/// Every language and framework profile must be reachable by the
/// matrix-driven harness through `known_lanes`, the batch shards, and the
/// fixture governance registry.
pub fn validate_matrix_driven_harness_coverage(
    schemas: &SchemaRegistry,
    inputs: &HarnessInputs<'_>,
    known_lanes: &[String],
) -> Validation<HarnessCoverageRow> {
    let languages = match schemas.project::<LanguageProfileRow>(LANGUAGE_PROFILES, inputs.language_profiles) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let frameworks = match schemas.project::<FrameworkProfileRow>(FRAMEWORK_PROFILES, inputs.framework_profiles) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let fixtures = match schemas.project::<FixtureGovernanceRow>(FIXTURE_GOVERNANCE, inputs.fixture_governance) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let shards = match schemas.project::<BatchShardRow>(LANGUAGE_BATCH_SHARDS, inputs.batch_shards) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let mut findings = Findings::new();
    if resolve_conformance_lane(known_lanes).is_none() {
        findings.error("no conformance lane among known lanes");
    }

    let known_languages: BTreeSet<&str> = languages.iter().map(|row| row.id.as_str()).collect();
    let mut rows = Vec::with_capacity(languages.len() + frameworks.len());
    let mut record = |profile_type, id: &str, shard_id: Option<String>, fixture_count, checked: Findings| {
        let pass = checked.is_ok();
        let checked = checked.prefixed(id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(HarnessCoverageRow {
            profile_type,
            profile_id: id.to_string(),
            shard_id,
            fixture_count,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
        });
    };

    for language in &languages {
        let shard = shards.iter().find(|shard| {
            shard.scope_type == ShardScope::LanguageBatch
                && shard.language_ids.iter().any(|id| *id == language.id)
        });
        let language_fixtures = fixtures_for(&fixtures, FixtureProfileType::Language, &language.id);
        record(
            HarnessProfileType::Language,
            &language.id,
            shard.map(|shard| shard.id.clone()),
            language_fixtures.len(),
            check_language_harness(language, shard, &language_fixtures),
        );
    }
    for framework in &frameworks {
        let framework_fixtures = fixtures_for(&fixtures, FixtureProfileType::Framework, &framework.id);
        record(
            HarnessProfileType::Framework,
            &framework.id,
            None,
            framework_fixtures.len(),
            check_framework_harness(framework, &known_languages, &framework_fixtures),
        );
    }

    tracing::debug!(
        languages = languages.len(),
        frameworks = frameworks.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated matrix-driven harness coverage"
    );
    Validation::from_findings(findings, rows)
}
