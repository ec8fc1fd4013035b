use crate::support::{
    exit_unless_ok, print_json, print_summary, read_json_file_or_exit, schemas_or_exit,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use usr_kernel::report::validate_required_audit_reports;

pub fn run(dir: String, json_output: bool) {
    let root = Path::new(&dir);
    if !root.is_dir() {
        eprintln!("error: reports directory not found: {dir}");
        std::process::exit(1);
    }
    let schemas = schemas_or_exit();

    let mut reports: BTreeMap<String, Value> = BTreeMap::new();
    for artifact_id in schemas.report_ids() {
        let path = root.join(format!("{artifact_id}.json"));
        if !path.is_file() {
            continue;
        }
        let payload: Value = read_json_file_or_exit(&path.to_string_lossy(), artifact_id);
        reports.insert(artifact_id.to_string(), payload);
    }
    let outcome = validate_required_audit_reports(&schemas, &reports);

    if json_output {
        print_json(&outcome, "audit-reports-check");
    } else {
        let present = outcome.rows.iter().filter(|row| row.present).count();
        print_summary(
            "audit-reports-check",
            outcome.ok,
            &[
                ("Reports dir", dir.clone()),
                ("Required", outcome.rows.len().to_string()),
                ("Present", present.to_string()),
            ],
            &outcome.errors,
            &[],
        );
    }
    exit_unless_ok(outcome.ok);
}
