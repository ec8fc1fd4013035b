//! Fixture ownership, reviewer coverage, and roadmap linkage controls.

use crate::findings::Findings;
use crate::registry::{
    FixtureGovernanceRow, FixtureProfileType, MutationPolicy, StabilityClass, key_counts,
};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation, pass_fail};
use crate::schema::SchemaRegistry;
use crate::schema::registries::FIXTURE_GOVERNANCE;
use crate::schema::reports::VALIDATION_REPORT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const ARCHITECTURE_REVIEWERS: [&str; 2] = ["usr-architecture", "usr-conformance"];

fn owner_prefix(profile_type: FixtureProfileType) -> &'static str {
    match profile_type {
        FixtureProfileType::Language => "language-",
        FixtureProfileType::Framework => "framework-",
        FixtureProfileType::CrossCutting => "usr-",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixtureGovernanceResultRow {
    pub fixture_id: String,
    pub profile_type: FixtureProfileType,
    pub profile_id: String,
    pub blocking: bool,
    pub mutation_policy: MutationPolicy,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn check_reviewers(row: &FixtureGovernanceRow, findings: &mut Findings) {
    if row.owner.trim().is_empty() {
        findings.error("owner must be non-empty");
    }
    if row.reviewers.is_empty() {
        findings.error("reviewers must contain at least one reviewer");
    }
    if row.reviewers.contains(&row.owner) {
        findings.warning("owner also appears in reviewers list");
    }

    if !row.blocking {
        return;
    }
    if row.reviewers.iter().all(|reviewer| *reviewer == row.owner) {
        findings.error("blocking fixture rows must include at least one reviewer distinct from owner");
    }
    let prefix = owner_prefix(row.profile_type);
    if !row.owner.starts_with(prefix) {
        findings.error(format!("blocking fixture row owner must use prefix {prefix}"));
    }
    if !row
        .reviewers
        .iter()
        .any(|reviewer| ARCHITECTURE_REVIEWERS.contains(&reviewer.as_str()))
    {
        findings.error(
            "blocking fixture rows must include usr-architecture or usr-conformance reviewer coverage",
        );
    }
}

fn check_linkage(row: &FixtureGovernanceRow, findings: &mut Findings) {
    if row.families.is_empty() {
        findings.error("families must include at least one fixture family");
    }
    if row.roadmap_tags.is_empty() {
        findings.error("roadmapTags must include at least one roadmap linkage tag");
    }

    let has_tag = |tag: &str| row.roadmap_tags.iter().any(|item| item == tag);
    match row.profile_type {
        FixtureProfileType::Language => {
            let tag = format!("appendix-c:{}", row.profile_id);
            if !has_tag(&tag) {
                findings.error(format!(
                    "language fixture rows must include appendix-c linkage tag for profile: {tag}"
                ));
            }
        }
        FixtureProfileType::Framework => {
            let tag = format!("appendix-d:{}", row.profile_id);
            if !has_tag(&tag) {
                findings.error(format!(
                    "framework fixture rows must include appendix-d linkage tag for profile: {tag}"
                ));
            }
        }
        FixtureProfileType::CrossCutting => {}
    }

    let has_c4 = row.conformance_levels.iter().any(|level| level == "C4");
    if row.conformance_levels.is_empty() {
        findings.error("conformanceLevels must include at least one level");
    }
    if row.profile_type == FixtureProfileType::Framework && !has_c4 {
        findings.error("framework fixture rows must include C4 in conformanceLevels");
    }
    let has_family = |family: &str| row.families.iter().any(|item| item == family);
    if has_family("framework-overlay") && !has_c4 {
        findings.error("framework-overlay families must include C4 conformance level");
    }
    if has_family("golden") && !row.golden_required {
        findings.error("golden family rows must set goldenRequired=true");
    }
}

fn check_row(row: &FixtureGovernanceRow, duplicate: bool) -> FixtureGovernanceResultRow {
    let mut findings = Findings::new();
    if duplicate {
        findings.error("fixtureId must be unique within fixture-governance matrix");
    }
    check_reviewers(row, &mut findings);
    check_linkage(row, &mut findings);

    if row.blocking && row.mutation_policy == MutationPolicy::AllowGeneratedRefresh {
        findings.error("blocking fixture rows cannot use mutationPolicy=allow-generated-refresh");
    }
    if row.blocking && row.stability_class == StabilityClass::Volatile {
        findings.warning("blocking fixture row marked volatile; ensure drift is intentionally managed");
    }
    if !["language-", "framework-", "usr-"]
        .iter()
        .any(|prefix| row.owner.starts_with(prefix))
    {
        findings.warning(
            "owner naming does not match expected prefix convention (language-/framework-/usr-)",
        );
    }

    let pass = findings.is_ok();
    let findings = findings.prefixed(&row.fixture_id);
    FixtureGovernanceResultRow {
        fixture_id: row.fixture_id.clone(),
        profile_type: row.profile_type,
        profile_id: row.profile_id.clone(),
        blocking: row.blocking,
        mutation_policy: row.mutation_policy,
        pass,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

pub fn validate_fixture_governance(
    schemas: &SchemaRegistry,
    fixture_governance: &Value,
) -> Validation<FixtureGovernanceResultRow> {
    let fixtures = match schemas.project::<FixtureGovernanceRow>(FIXTURE_GOVERNANCE, fixture_governance)
    {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let counts = key_counts(fixtures.iter().map(|row| row.fixture_id.as_str()));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(fixtures.len());
    for row in &fixtures {
        let checked = check_row(row, counts.get(row.fixture_id.as_str()).copied().unwrap_or(0) > 1);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(checked);
    }
    tracing::debug!(
        fixtures = rows.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated fixture governance"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: VALIDATION_REPORT,
    producer_id: "usr-fixture-governance-validator",
    run_id: "run-usr-fixture-governance-validation",
    finding_class: "fixture-governance",
};

/// Summary shared by every `usr-validation-report` producer.
pub(crate) fn validation_summary<R>(
    domain: &str,
    validation: &Validation<R>,
    pass: impl Fn(&R) -> bool,
) -> Map<String, Value> {
    let (pass_count, fail_count) = pass_fail(&validation.rows, pass);
    let mut summary = Map::new();
    summary.insert("validationDomain".into(), json!(domain));
    summary.insert("rowCount".into(), json!(validation.rows.len()));
    summary.insert("passCount".into(), json!(pass_count));
    summary.insert("failCount".into(), json!(fail_count));
    summary.insert("warningCount".into(), json!(validation.warnings.len()));
    summary.insert("errorCount".into(), json!(validation.errors.len()));
    summary
}

pub fn build_fixture_governance_report(
    schemas: &SchemaRegistry,
    fixture_governance: &Value,
    ctx: &ReportContext,
) -> BuiltReport<FixtureGovernanceResultRow> {
    let validation = validate_fixture_governance(schemas, fixture_governance);
    let summary = validation_summary("fixture-governance", &validation, |row| row.pass);
    BuiltReport::from_validation(validation, ctx, &REPORT_KIND, &Scope::global(), summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_row(id: &str) -> Value {
        json!({
            "fixtureId": id,
            "profileType": "language",
            "profileId": "python",
            "conformanceLevels": ["C0", "C1"],
            "families": ["golden", "resolution"],
            "roadmapTags": ["appendix-c:python"],
            "owner": "language-python",
            "reviewers": ["usr-architecture", "usr-conformance"],
            "stabilityClass": "stable",
            "mutationPolicy": "require-review",
            "goldenRequired": true,
            "blocking": true
        })
    }

    fn registry(rows: Vec<Value>) -> Value {
        json!({
            "schemaVersion": "usr-registry-1.0.0",
            "registryId": "usr-fixture-governance",
            "generatedAt": "2026-02-12T00:00:00Z",
            "generatedBy": "test",
            "rows": rows
        })
    }

    fn schemas() -> SchemaRegistry {
        SchemaRegistry::build().expect("schemas should compile")
    }

    #[test]
    fn governed_row_passes() {
        let result = validate_fixture_governance(&schemas(), &registry(vec![fixture_row("python::golden::001")]));
        assert!(result.ok, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn blocking_row_needs_prefixed_owner_and_architecture_review() {
        let mut row = fixture_row("python::golden::001");
        row["owner"] = json!("framework-react");
        row["reviewers"] = json!(["language-typescript"]);
        let result = validate_fixture_governance(&schemas(), &registry(vec![row]));
        assert_eq!(
            result.errors,
            vec![
                "python::golden::001 blocking fixture row owner must use prefix language-",
                "python::golden::001 blocking fixture rows must include usr-architecture or usr-conformance reviewer coverage",
            ]
        );
    }

    #[test]
    fn framework_rows_need_c4_and_appendix_d() {
        let mut row = fixture_row("react::overlay::001");
        row["profileType"] = json!("framework");
        row["profileId"] = json!("react");
        row["owner"] = json!("framework-react");
        row["families"] = json!(["framework-overlay"]);
        row["roadmapTags"] = json!(["appendix-c:react"]);
        let result = validate_fixture_governance(&schemas(), &registry(vec![row]));
        assert_eq!(
            result.errors,
            vec![
                "react::overlay::001 framework fixture rows must include appendix-d linkage tag for profile: appendix-d:react",
                "react::overlay::001 framework fixture rows must include C4 in conformanceLevels",
                "react::overlay::001 framework-overlay families must include C4 conformance level",
            ]
        );
    }

    #[test]
    fn duplicates_and_advisories() {
        let mut volatile = fixture_row("dup");
        volatile["stabilityClass"] = json!("volatile");
        volatile["reviewers"] = json!(["usr-architecture", "language-python"]);
        let result = validate_fixture_governance(&schemas(), &registry(vec![volatile, fixture_row("dup")]));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.ends_with("fixtureId must be unique within fixture-governance matrix")));
        assert_eq!(
            result.warnings,
            vec![
                "dup owner also appears in reviewers list",
                "dup blocking fixture row marked volatile; ensure drift is intentionally managed",
            ]
        );
    }

    #[test]
    fn generated_refresh_cannot_block() {
        let mut row = fixture_row("python::golden::001");
        row["mutationPolicy"] = json!("allow-generated-refresh");
        row["goldenRequired"] = json!(false);
        let result = validate_fixture_governance(&schemas(), &registry(vec![row]));
        assert_eq!(
            result.errors,
            vec![
                "python::golden::001 golden family rows must set goldenRequired=true",
                "python::golden::001 blocking fixture rows cannot use mutationPolicy=allow-generated-refresh",
            ]
        );
    }

    #[test]
    fn report_summarises_rows() {
        let mut failing = fixture_row("python::golden::002");
        failing["families"] = json!([]);
        let report = build_fixture_governance_report(
            &schemas(),
            &registry(vec![fixture_row("python::golden::001"), failing]),
            &ReportContext::new("2026-02-12T00:00:00Z"),
        );
        assert!(!report.ok);
        assert_eq!(report.payload.summary["validationDomain"], json!("fixture-governance"));
        assert_eq!(report.payload.summary["passCount"], json!(1));
        assert_eq!(report.payload.summary["failCount"], json!(1));
        assert_eq!(report.payload.blocking_findings[0].class, "fixture-governance");
        let check = schemas().validate_report(VALIDATION_REPORT, &report.payload.to_value().expect("envelope serializes"));
        assert!(check.ok, "{:?}", check.errors);
    }
}
