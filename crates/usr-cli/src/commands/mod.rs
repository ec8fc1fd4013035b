pub mod audit_reports_check;
pub mod backcompat_check;
pub mod batch_shards_check;
pub mod benchmark_check;
pub mod bundle_check;
pub mod capability_transition_check;
pub mod catalog_check;
pub mod code_check;
pub mod config_resolve;
pub mod conformance_summary;
pub mod edge_contract_check;
pub mod failure_injection_check;
pub mod fixture_governance_check;
pub mod harness_check;
pub mod observability_rollup;
pub mod operational_readiness;
pub mod ownership_check;
pub mod promotion_readiness;
pub mod risk_profiles_check;
pub mod scorecard;
pub mod security_gate_check;
pub mod threat_model_check;
pub mod validate_file;
pub mod waiver_report;
