//! Diagnostic and reason code grammar.

use crate::findings::{CheckOutcome, Findings};
use crate::registry::CapabilityState;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

pub const CANONICAL_DIAGNOSTIC_CODES: &[&str] = &[
    "USR-E-PARSER-UNAVAILABLE",
    "USR-E-PARSER-FAILED",
    "USR-E-SEGMENT-INVALID-RANGE",
    "USR-E-SCHEMA-VIOLATION",
    "USR-E-CAPABILITY-LOST",
    "USR-E-ID-GRAMMAR-VIOLATION",
    "USR-E-EDGE-ENDPOINT-INVALID",
    "USR-E-RANGE-MAPPING-FAILED",
    "USR-E-DETERMINISM-DRIFT",
    "USR-E-PROFILE-CONFLICT",
    "USR-E-SECURITY-GATE-FAILED",
    "USR-E-SLO-BUDGET-FAILED",
    "USR-E-SERIALIZATION-NONCANONICAL",
    "USR-W-PARTIAL-PARSE",
    "USR-W-CAPABILITY-DOWNGRADED",
    "USR-W-FRAMEWORK-PROFILE-INCOMPLETE",
    "USR-W-REFERENCE-AMBIGUOUS",
    "USR-W-RESOLUTION-CANDIDATE-CAPPED",
    "USR-W-HEURISTIC-BINDING",
    "USR-W-TRUNCATED-FLOW",
    "USR-W-CANONICALIZATION-FALLBACK",
    "USR-I-FALLBACK-HEURISTIC",
    "USR-I-LEGACY-ADAPTER-APPLIED",
    "USR-I-COMPAT-MINOR-IGNORED",
];

pub const CANONICAL_REASON_CODES: &[&str] = &[
    "USR-R-NAME-NOT-FOUND",
    "USR-R-MULTIPLE-CANDIDATES",
    "USR-R-SCOPE-MISMATCH",
    "USR-R-TYPE-MISMATCH",
    "USR-R-MODULE-NOT-LOADED",
    "USR-R-PARSER-TIMEOUT",
    "USR-R-PARSER-UNAVAILABLE",
    "USR-R-DYNAMIC-DISPATCH",
    "USR-R-FRAMEWORK-VIRTUAL-BINDING",
    "USR-R-ROUTE-PATTERN-CONFLICT",
    "USR-R-TEMPLATE-SLOT-LATE-BIND",
    "USR-R-STYLE-SCOPE-UNKNOWN",
    "USR-R-CROSS-LANG-BRIDGE-PARTIAL",
    "USR-R-HEURISTIC-ONLY",
    "USR-R-RESOLUTION-CONFLICT",
    "USR-R-REDACTION-REQUIRED",
    "USR-R-CANDIDATE-CAP-EXCEEDED",
    "USR-R-RESOURCE-BUDGET-EXCEEDED",
    "USR-R-SECURITY-GATE-BLOCKED",
    "USR-R-SERIALIZATION-INVALID",
];

fn diagnostic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^USR-[EWI]-[A-Z0-9-]+$").expect("diagnostic regex must compile"))
}

fn reason_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^USR-R-[A-Z0-9-]+$").expect("reason regex must compile"))
}

/// With `strict_enum`, the code must also be one of [`CANONICAL_DIAGNOSTIC_CODES`].
pub fn validate_diagnostic_code(code: &str, strict_enum: bool) -> CheckOutcome {
    if !diagnostic_re().is_match(code) {
        return CheckOutcome::failed(vec![
            "diagnostic code does not match canonical grammar".to_string(),
        ]);
    }
    if strict_enum && !CANONICAL_DIAGNOSTIC_CODES.contains(&code) {
        return CheckOutcome::failed(vec![format!("unknown diagnostic code: {code}")]);
    }
    CheckOutcome::passed()
}

/// With `strict_enum`, the code must also be one of [`CANONICAL_REASON_CODES`].
pub fn validate_reason_code(code: &str, strict_enum: bool) -> CheckOutcome {
    if !reason_re().is_match(code) {
        return CheckOutcome::failed(vec!["reason code does not match canonical grammar".to_string()]);
    }
    if strict_enum && !CANONICAL_REASON_CODES.contains(&code) {
        return CheckOutcome::failed(vec![format!("unknown reason code: {code}")]);
    }
    CheckOutcome::passed()
}

/// A capability moving between states, with the diagnostic that announces
/// it and an optional reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CapabilityTransition {
    pub from: CapabilityState,
    pub to: CapabilityState,
    pub diagnostic: String,
    #[serde(default)]
    pub reason_code: Option<String>,
}

/// The diagnostic must always be canonical; `strict_reason_code` applies
/// membership to the reason code as well.
pub fn validate_capability_transition(payload: &Value, strict_reason_code: bool) -> CheckOutcome {
    let transition = match CapabilityTransition::deserialize(payload) {
        Ok(transition) => transition,
        Err(err) => return CheckOutcome::failed(vec![format!("capability transition: {err}")]),
    };
    let mut findings = Findings::new();
    if transition.from == transition.to {
        findings.error(format!(
            "transition must change state (from and to are both {})",
            transition.from.as_str()
        ));
    }
    for error in validate_diagnostic_code(&transition.diagnostic, true).errors {
        findings.error(format!("diagnostic {error}"));
    }
    if let Some(reason_code) = &transition.reason_code {
        for error in validate_reason_code(reason_code, strict_reason_code).errors {
            findings.error(format!("reasonCode {error}"));
        }
    }
    findings.into_outcome()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_grammar_and_membership() {
        assert!(validate_diagnostic_code("USR-E-PARSER-FAILED", true).ok);
        assert!(validate_diagnostic_code("USR-E-NOT-LISTED", false).ok);
        assert_eq!(
            validate_diagnostic_code("USR-E-NOT-LISTED", true).errors,
            vec!["unknown diagnostic code: USR-E-NOT-LISTED"]
        );
        assert_eq!(
            validate_diagnostic_code("usr-e-parser-failed", false).errors,
            vec!["diagnostic code does not match canonical grammar"]
        );
        assert!(!validate_diagnostic_code("USR-R-NAME-NOT-FOUND", false).ok);
    }

    #[test]
    fn reason_grammar_and_membership() {
        assert!(validate_reason_code("USR-R-PARSER-TIMEOUT", true).ok);
        assert!(!validate_reason_code("USR-E-PARSER-FAILED", false).ok);
        assert_eq!(
            validate_reason_code("USR-R-SOMETHING-NEW", true).errors,
            vec!["unknown reason code: USR-R-SOMETHING-NEW"]
        );
    }

    #[test]
    fn canonical_sets_satisfy_their_grammar() {
        for code in CANONICAL_DIAGNOSTIC_CODES {
            assert!(diagnostic_re().is_match(code), "{code}");
        }
        for code in CANONICAL_REASON_CODES {
            assert!(reason_re().is_match(code), "{code}");
        }
    }

    #[test]
    fn capability_transitions() {
        use serde_json::json;

        let downgrade = json!({
            "from": "supported",
            "to": "partial",
            "diagnostic": "USR-W-CAPABILITY-DOWNGRADED",
            "reasonCode": "USR-R-PARSER-TIMEOUT"
        });
        assert!(validate_capability_transition(&downgrade, true).ok);

        let noncanonical = json!({
            "from": "supported",
            "to": "unsupported",
            "diagnostic": "USR-W-DEGRADED-CAPABILITY"
        });
        assert_eq!(
            validate_capability_transition(&noncanonical, true).errors,
            vec!["diagnostic unknown diagnostic code: USR-W-DEGRADED-CAPABILITY"]
        );

        let mut unknown_reason = downgrade.clone();
        unknown_reason["reasonCode"] = json!("USR-R-UNKNOWN-REASON");
        assert_eq!(
            validate_capability_transition(&unknown_reason, true).errors,
            vec!["reasonCode unknown reason code: USR-R-UNKNOWN-REASON"]
        );
        assert!(validate_capability_transition(&unknown_reason, false).ok);

        let mut unchanged = downgrade.clone();
        unchanged["to"] = json!("supported");
        assert_eq!(
            validate_capability_transition(&unchanged, true).errors,
            vec!["transition must change state (from and to are both supported)"]
        );

        let mut extra = downgrade;
        extra["note"] = json!("x");
        assert!(!validate_capability_transition(&extra, true).ok);
        assert!(!validate_capability_transition(&json!({"from": "supported"}), true).ok);
    }
}
