//! Ownership and escalation linkage.

use crate::findings::{Findings, Severity};
use crate::fixture_governance::validation_summary;
use crate::registry::{EscalationRow, OwnershipRow, Severity as EscalationSeverity, key_counts};
use crate::report::{BuiltReport, ReportContext, ReportKind, Scope, Validation};
use crate::schema::SchemaRegistry;
use crate::schema::registries::{ESCALATION_POLICY, OWNERSHIP_MATRIX};
use crate::schema::reports::{REPORT_IDS, VALIDATION_REPORT};
use crate::waiver::is_valid_approver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GovernanceRowType {
    Ownership,
    Escalation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceResultRow {
    pub row_type: GovernanceRowType,
    pub id: String,
    pub blocking: bool,
    pub pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn is_governed_report(artifact: &str) -> bool {
    artifact
        .strip_suffix(".json")
        .is_some_and(|id| REPORT_IDS.contains(&id))
}

fn check_ownership(
    row: &OwnershipRow,
    duplicate: bool,
    escalation_ids: &BTreeSet<&str>,
) -> Findings {
    let severity = Severity::blocking_if(row.blocking);
    let mut findings = Findings::new();
    if duplicate {
        findings.error("ownership id must be unique");
    }
    for (field, role) in [
        ("ownerRole", &row.owner_role),
        ("backupOwnerRole", &row.backup_owner_role),
    ] {
        if !is_valid_approver(role) {
            findings.error(format!("{field} {role} does not match governance naming"));
        }
    }
    if row.owner_role == row.backup_owner_role {
        findings.error("ownerRole and backupOwnerRole must differ");
    }
    if !escalation_ids.contains(row.escalation_policy_id.as_str()) {
        findings.push(
            severity,
            format!(
                "escalationPolicyId {} is not defined in escalation policy",
                row.escalation_policy_id
            ),
        );
    }
    if row.evidence_artifacts.is_empty() {
        findings.push(severity, "evidenceArtifacts must not be empty");
    }
    for artifact in &row.evidence_artifacts {
        if !artifact.ends_with(".json") {
            findings.error(format!("evidence artifact {artifact} must be a .json file"));
        } else if !is_governed_report(artifact) {
            findings.warning(format!(
                "evidence artifact {artifact} is not a governed report artifact"
            ));
        }
    }
    findings
}

fn check_escalation(row: &EscalationRow, duplicate: bool) -> Findings {
    let mut findings = Findings::new();
    if duplicate {
        findings.error("escalation policy id must be unique");
    }
    if row.required_approvers.is_empty() {
        findings.error("requiredApprovers must not be empty");
    }
    for approver in &row.required_approvers {
        if !is_valid_approver(approver) {
            findings.error(format!("approver {approver} does not match governance naming"));
        }
    }
    if row.max_resolution_minutes < row.max_ack_minutes {
        findings.error("maxResolutionMinutes must be >= maxAckMinutes");
    }
    if row.severity == EscalationSeverity::Critical && !row.auto_block_promotion {
        findings.error("critical escalations must set autoBlockPromotion");
    }
    findings
}

pub fn validate_ownership_escalation(
    schemas: &SchemaRegistry,
    ownership_matrix: &Value,
    escalation_policy: &Value,
) -> Validation<GovernanceResultRow> {
    let owners = match schemas.project::<OwnershipRow>(OWNERSHIP_MATRIX, ownership_matrix) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };
    let escalations = match schemas.project::<EscalationRow>(ESCALATION_POLICY, escalation_policy) {
        Ok(registry) => registry.rows,
        Err(errors) => return Validation::schema_failure(errors),
    };

    let escalation_ids: BTreeSet<&str> = escalations.iter().map(|row| row.id.as_str()).collect();
    let owner_counts = key_counts(owners.iter().map(|row| row.id.as_str()));
    let escalation_counts = key_counts(escalations.iter().map(|row| row.id.as_str()));

    let mut findings = Findings::new();
    let mut rows = Vec::with_capacity(owners.len() + escalations.len());
    let mut record = |row_type, id: &str, blocking, checked: Findings| {
        let pass = checked.is_ok();
        let checked = checked.prefixed(id);
        findings.errors.extend(checked.errors.iter().cloned());
        findings.warnings.extend(checked.warnings.iter().cloned());
        rows.push(GovernanceResultRow {
            row_type,
            id: id.to_string(),
            blocking,
            pass,
            errors: checked.errors,
            warnings: checked.warnings,
        });
    };

    for row in &owners {
        let duplicate = owner_counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        record(
            GovernanceRowType::Ownership,
            &row.id,
            row.blocking,
            check_ownership(row, duplicate, &escalation_ids),
        );
    }
    for row in &escalations {
        let duplicate = escalation_counts.get(row.id.as_str()).copied().unwrap_or(0) > 1;
        record(
            GovernanceRowType::Escalation,
            &row.id,
            row.auto_block_promotion,
            check_escalation(row, duplicate),
        );
    }

    tracing::debug!(
        owners = owners.len(),
        escalations = escalations.len(),
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        "validated ownership and escalation linkage"
    );
    Validation::from_findings(findings, rows)
}

const REPORT_KIND: ReportKind = ReportKind {
    artifact_id: VALIDATION_REPORT,
    producer_id: "usr-ownership-escalation-validator",
    run_id: "run-usr-ownership-escalation-validation",
    finding_class: "ownership-escalation",
};

pub fn build_ownership_escalation_report(
    schemas: &SchemaRegistry,
    ownership_matrix: &Value,
    escalation_policy: &Value,
    ctx: &ReportContext,
) -> BuiltReport<GovernanceResultRow> {
    let validation = validate_ownership_escalation(schemas, ownership_matrix, escalation_policy);
    let summary = validation_summary("ownership-escalation", &validation, |row| row.pass);
    BuiltReport::from_validation(validation, ctx, &REPORT_KIND, &Scope::global(), summary)
}
