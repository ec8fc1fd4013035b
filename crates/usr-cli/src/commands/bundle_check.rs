use crate::cli::RunArgs;
use crate::support::{
    exit_unless_ok, load_bundle_or_exit, print_json, print_summary, schemas_or_exit, settings,
};

pub fn run(args: RunArgs, require_all: bool) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let check = bundle.validate(&schemas, require_all);

    if settings.json {
        print_json(&check, "bundle-check");
    } else {
        let invalid = check.rows.iter().filter(|row| row.present && !row.ok).count();
        print_summary(
            "bundle-check",
            check.ok,
            &[
                ("Matrix dir", settings.matrix_dir.clone()),
                ("Registries loaded", bundle.len().to_string()),
                ("Registries invalid", invalid.to_string()),
            ],
            &check.errors,
            &[],
        );
    }
    exit_unless_ok(check.ok);
}
