use crate::cli::CodeKindArg;
use crate::support::{exit_unless_ok, print_json, print_summary};
use serde_json::json;
use usr_kernel::codes::{validate_diagnostic_code, validate_reason_code};

pub fn run(code: String, kind: CodeKindArg, strict_enum: bool, json_output: bool) {
    let (label, outcome) = match kind {
        CodeKindArg::Diagnostic => ("diagnostic", validate_diagnostic_code(&code, strict_enum)),
        CodeKindArg::Reason => ("reason", validate_reason_code(&code, strict_enum)),
    };

    if json_output {
        print_json(
            &json!({
                "code": code,
                "kind": label,
                "strictEnum": strict_enum,
                "ok": outcome.ok,
                "errors": outcome.errors,
            }),
            "code-check",
        );
    } else {
        print_summary(
            "code-check",
            outcome.ok,
            &[("Code", code.clone()), ("Kind", label.to_string())],
            &outcome.errors,
            &outcome.warnings,
        );
    }
    exit_unless_ok(outcome.ok);
}
