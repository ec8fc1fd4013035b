use crate::support::{exit_unless_ok, print_json, print_summary, read_json_file_or_exit};
use serde_json::{Value, json};
use usr_kernel::codes::validate_capability_transition;

pub fn run(path: String, lenient_reason_code: bool, json_output: bool) {
    let payload: Value = read_json_file_or_exit(&path, "capability transition");
    let strict_reason_code = !lenient_reason_code;
    let outcome = validate_capability_transition(&payload, strict_reason_code);

    if json_output {
        print_json(
            &json!({
                "path": path,
                "strictReasonCode": strict_reason_code,
                "ok": outcome.ok,
                "errors": outcome.errors,
            }),
            "capability-transition-check",
        );
    } else {
        print_summary(
            "capability-transition-check",
            outcome.ok,
            &[("File", path.clone())],
            &outcome.errors,
            &outcome.warnings,
        );
    }
    exit_unless_ok(outcome.ok);
}
