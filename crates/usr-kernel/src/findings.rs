//! Error/warning accumulation shared by every evaluator.

use serde::{Deserialize, Serialize};

/// Whether a finding blocks promotion or is advisory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// `Error` when `blocking`, otherwise `Warning`.
    pub fn blocking_if(blocking: bool) -> Self {
        if blocking {
            Self::Error
        } else {
            Self::Warning
        }
    }
}

/// Insertion-ordered errors and warnings for one validation step.
///
/// Steps build their own `Findings` and hand them back by value; callers
/// merge with [`Findings::extend`]. Nothing is shared across steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        match severity {
            Severity::Error => self.error(message),
            Severity::Warning => self.warning(message),
        }
    }

    pub fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when nothing at all was recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Prefixes every message with `"{prefix} "`, keeping order.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self {
            errors: self
                .errors
                .into_iter()
                .map(|message| format!("{prefix} {message}"))
                .collect(),
            warnings: self
                .warnings
                .into_iter()
                .map(|message| format!("{prefix} {message}"))
                .collect(),
        }
    }

    pub fn into_outcome(self) -> CheckOutcome {
        CheckOutcome {
            ok: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// The `{ok, errors, warnings}` record returned by relational checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckOutcome {
    pub fn passed() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            ok: false,
            errors,
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_keep_insertion_order() {
        let mut findings = Findings::new();
        findings.error("b");
        findings.warning("w1");
        findings.error("a");
        findings.push(Severity::blocking_if(false), "w2");
        assert_eq!(findings.errors, vec!["b", "a"]);
        assert_eq!(findings.warnings, vec!["w1", "w2"]);
        assert!(!findings.is_ok());
    }

    #[test]
    fn prefixed_applies_to_both_lists() {
        let mut findings = Findings::new();
        findings.error("broken");
        findings.warning("shaky");
        let prefixed = findings.prefixed("row-1");
        assert_eq!(prefixed.errors, vec!["row-1 broken"]);
        assert_eq!(prefixed.warnings, vec!["row-1 shaky"]);
    }

    #[test]
    fn outcome_ok_tracks_errors_only() {
        let mut findings = Findings::new();
        findings.warning("advisory");
        let outcome = findings.into_outcome();
        assert!(outcome.ok);
        assert_eq!(outcome.warnings.len(), 1);
    }
}
