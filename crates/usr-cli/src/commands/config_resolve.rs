use crate::cli::RunArgs;
use crate::config::{argv_layer, env_layer};
use crate::support::{
    exit_unless_ok, load_bundle_or_exit, print_json, print_summary, read_json_file_or_exit,
    require_registry_or_exit, schemas_or_exit, settings,
};
use serde_json::Value;
use usr_kernel::config::build_feature_flag_state_report;
use usr_kernel::registry::RuntimeConfigRow;
use usr_kernel::schema::registries::RUNTIME_CONFIG_POLICY;
use usr_kernel::{ConfigLayers, Layer};

pub struct Args {
    pub run: RunArgs,
    pub layers: Option<String>,
    pub env_layer: bool,
    pub overrides: Vec<String>,
}

pub fn run(args: Args) {
    let settings = settings(args.run);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let policy = require_registry_or_exit(&bundle, RUNTIME_CONFIG_POLICY);

    let mut layers = match &args.layers {
        Some(path) => ConfigLayers::from_value(&read_json_file_or_exit::<Value>(path, "config layers")),
        None => ConfigLayers::default(),
    };
    if args.env_layer {
        let keys: Vec<String> = schemas
            .project::<RuntimeConfigRow>(RUNTIME_CONFIG_POLICY, policy)
            .map(|registry| registry.rows.into_iter().map(|row| row.key).collect())
            .unwrap_or_default();
        layers
            .layer_mut(Layer::Env)
            .extend(env_layer(&keys, std::env::vars()));
    }
    let argv = argv_layer(&args.overrides).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    layers.layer_mut(Layer::Argv).extend(argv);

    tracing::debug!(
        policy_file = layers.policy_file.len(),
        env = layers.env.len(),
        argv = layers.argv.len(),
        "assembled runtime config layers"
    );
    let report = build_feature_flag_state_report(
        &schemas,
        policy,
        &layers,
        settings.strict_mode,
        &settings.report_context(),
    );

    if settings.json {
        print_json(&report.payload, "config-resolve");
    } else {
        let mut details = vec![
            ("Status", report.payload.status.as_str().to_string()),
            ("Strict mode", settings.strict_mode.to_string()),
        ];
        for row in &report.rows {
            details.push(("Key", format!("{} = {} ({})", row.key, row.value, row.source)));
        }
        print_summary(
            "config-resolve",
            report.ok,
            &details,
            &report.errors,
            &report.warnings,
        );
    }
    exit_unless_ok(report.ok);
}
