//! Language risk profile coverage.

use crate::findings::Findings;
use crate::registry::{
    CapabilityState, LanguageProfileRow, LanguageRiskProfileRow, RiskTaxonomy, key_counts,
};
use crate::report::Validation;
use crate::schema::SchemaRegistry;
use crate::schema::registries::{LANGUAGE_PROFILES, LANGUAGE_RISK_PROFILES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfileResultRow {
    pub language_id: String,
    pub framework_profile: Option<String>,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn risk_key(row: &LanguageRiskProfileRow) -> String {
    format!(
        "{}::{}",
        row.language_id,
        row.framework_profile.as_deref().unwrap_or("none")
    )
}

fn dimensions(taxonomy: &RiskTaxonomy) -> [(&'static str, &[String]); 3] {
    [
        ("sources", taxonomy.sources.as_slice()),
        ("sinks", taxonomy.sinks.as_slice()),
        ("sanitizers", taxonomy.sanitizers.as_slice()),
    ]
}

/// Overlaps between the required, optional, and unsupported buckets.
/// Always errors, whatever the row's other settings.
fn check_disjoint(row: &LanguageRiskProfileRow, findings: &mut Findings) {
    let buckets = [
        ("required", dimensions(&row.required)),
        ("optional", dimensions(&row.optional)),
        ("unsupported", dimensions(&row.unsupported)),
    ];
    for (left_index, (left_name, left)) in buckets.iter().enumerate() {
        for (right_name, right) in buckets.iter().skip(left_index + 1) {
            for ((dimension, left_items), (_, right_items)) in left.iter().zip(right.iter()) {
                let right_set: BTreeSet<&str> = right_items.iter().map(String::as_str).collect();
                let overlap: BTreeSet<&str> = left_items
                    .iter()
                    .map(String::as_str)
                    .filter(|item| right_set.contains(item))
                    .collect();
                if !overlap.is_empty() {
                    findings.error(format!(
                        "{dimension} overlap between {left_name} and {right_name}: {}",
                        overlap.into_iter().collect::<Vec<_>>().join(", ")
                    ));
                }
            }
        }
    }
}

fn check_gating(row: &LanguageRiskProfileRow, findings: &mut Findings) {
    let gating = &row.interprocedural_gating;
    let interprocedural = row.capabilities.risk_interprocedural;
    if interprocedural == CapabilityState::Unsupported && gating.enabled_by_default {
        findings.error(
            "interproceduralGating.enabledByDefault must be false when riskInterprocedural is unsupported",
        );
    }
    if interprocedural != CapabilityState::Unsupported && !gating.enabled_by_default {
        findings.warning(format!(
            "interproceduralGating disabled although riskInterprocedural is {}",
            interprocedural.as_str()
        ));
    }
    if gating.enabled_by_default {
        if gating.min_evidence_kinds.is_empty() {
            findings.error("interproceduralGating.minEvidenceKinds must not be empty when enabled");
        }
        if gating.required_call_link_confidence <= 0.0 {
            findings.error(
                "interproceduralGating.requiredCallLinkConfidence must be > 0 when enabled",
            );
        }
    }
    if row.capabilities.risk_local == CapabilityState::Unsupported
        && dimensions(&row.required)
            .iter()
            .any(|(_, items)| !items.is_empty())
    {
        findings.error("required taxonomy must be empty when riskLocal is unsupported");
    }

    let severity = &row.severity_policy;
    if severity.levels.is_empty() {
        findings.error("severityPolicy.levels must not be empty");
    } else if !severity.levels.contains(&severity.default_level) {
        findings.error(format!(
            "severityPolicy.defaultLevel {} is not listed in severityPolicy.levels",
            severity.default_level
        ));
    }
}

/// A language profile that declares a risk capability must agree with the
/// risk row.
fn check_capability_alignment(
    row: &LanguageRiskProfileRow,
    language: &LanguageProfileRow,
    findings: &mut Findings,
) {
    let declared = [
        ("riskLocal", row.capabilities.risk_local),
        ("riskInterprocedural", row.capabilities.risk_interprocedural),
    ];
    for (capability, state) in declared {
        if let Some(profile_state) = language
            .required_capabilities
            .get(capability)
            .filter(|profile_state| **profile_state != state)
        {
            findings.error(format!(
                "capabilities.{capability} is {} but language profile declares {}",
                state.as_str(),
                profile_state.as_str()
            ));
        }
    }
}

pub fn validate_language_risk_profile_coverage(
    schemas: &SchemaRegistry,
    language_profiles: &Value,
    language_risk_profiles: &Value,
) -> Validation<RiskProfileResultRow> {
    let languages = match schemas.project::<LanguageProfileRow>(LANGUAGE_PROFILES, language_profiles) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let risk_rows = match schemas
        .project::<LanguageRiskProfileRow>(LANGUAGE_RISK_PROFILES, language_risk_profiles)
    {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let language_by_id: BTreeMap<&str, &LanguageProfileRow> =
        languages.iter().map(|row| (row.id.as_str(), row)).collect();
    let keys: Vec<String> = risk_rows.iter().map(risk_key).collect();
    let counts = key_counts(keys.iter().map(String::as_str));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(risk_rows.len());
    for (row, key) in risk_rows.iter().zip(&keys) {
        let mut row_findings = Findings::new();
        if counts.get(key.as_str()).copied().unwrap_or(0) > 1 {
            row_findings.error("duplicate risk profile row");
        }
        match language_by_id.get(row.language_id.as_str()) {
            None => row_findings.error(format!("references unknown language {}", row.language_id)),
            Some(language) => {
                if let Some(framework_id) = row
                    .framework_profile
                    .as_ref()
                    .filter(|id| !language.framework_profiles.contains(id))
                {
                    row_findings.error(format!(
                        "framework overlay {framework_id} is not listed in language profile frameworkProfiles"
                    ));
                }
                if row.framework_profile.is_none() {
                    check_capability_alignment(row, language, &mut row_findings);
                }
            }
        }
        check_disjoint(row, &mut row_findings);
        check_gating(row, &mut row_findings);

        let pass = row_findings.is_ok();
        let row_findings = row_findings.prefixed(key);
        findings.errors.extend(row_findings.errors.iter().cloned());
        findings.warnings.extend(row_findings.warnings.iter().cloned());
        rows.push(RiskProfileResultRow {
            language_id: row.language_id.clone(),
            framework_profile: row.framework_profile.clone(),
            pass,
            errors: row_findings.errors,
            warnings: row_findings.warnings,
        });
    }

    let covered: BTreeSet<&str> = risk_rows
        .iter()
        .filter(|row| row.framework_profile.is_none())
        .map(|row| row.language_id.as_str())
        .collect();
    for language in &languages {
        if !covered.contains(language.id.as_str()) {
            findings.error(format!("missing risk profile row for language {}", language.id));
        }
    }

    tracing::debug!(
        rows = rows.len(),
        languages = languages.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated language risk profile coverage"
    );
    Validation::from_findings(findings, rows)
}
