use crate::cli::RunArgs;
use crate::support::{
    emit_report, load_bundle_or_exit, require_registry_or_exit, schemas_or_exit, settings,
};
use usr_kernel::schema::registries::{
    ALERT_POLICIES, FIXTURE_GOVERNANCE, REDACTION_RULES, SECURITY_GATES, THREAT_MODEL_MATRIX,
};
use usr_kernel::threat_model::{ThreatModelInputs, build_threat_model_coverage_report};

pub fn run(args: RunArgs) {
    let settings = settings(args);
    let bundle = load_bundle_or_exit(&settings.matrix_dir);
    let schemas = schemas_or_exit();
    let inputs = ThreatModelInputs {
        threat_model: require_registry_or_exit(&bundle, THREAT_MODEL_MATRIX),
        fixture_governance: require_registry_or_exit(&bundle, FIXTURE_GOVERNANCE),
        security_gates: require_registry_or_exit(&bundle, SECURITY_GATES),
        alert_policies: require_registry_or_exit(&bundle, ALERT_POLICIES),
        redaction_rules: require_registry_or_exit(&bundle, REDACTION_RULES),
    };
    let report = build_threat_model_coverage_report(&schemas, &inputs, &settings.report_context());
    emit_report("threat-model-check", &report, settings.json);
}
