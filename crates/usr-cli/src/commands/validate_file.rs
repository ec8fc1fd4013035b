use crate::support::{
    exit_unless_ok, print_json, print_summary, read_json_file_or_exit, schemas_or_exit,
};
use serde_json::{Value, json};
use std::path::Path;

pub fn run(path: String, report: Option<String>, json_output: bool) {
    let payload: Value = read_json_file_or_exit(&path, "payload");
    let schemas = schemas_or_exit();

    let (kind, target, check) = match report {
        Some(artifact_id) => {
            let check = schemas.validate_report(&artifact_id, &payload);
            ("report", artifact_id, check)
        }
        None => {
            let file_name = Path::new(&path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            let check = schemas.validate_file(&file_name, &payload);
            ("registry", file_name, check)
        }
    };

    if json_output {
        print_json(
            &json!({
                "path": path,
                "kind": kind,
                "target": target,
                "ok": check.ok,
                "errors": check.errors,
            }),
            "validate-file",
        );
    } else {
        print_summary(
            "validate-file",
            check.ok,
            &[("Path", path.clone()), ("Target", format!("{kind} {target}"))],
            &check.errors,
            &[],
        );
    }
    exit_unless_ok(check.ok);
}
