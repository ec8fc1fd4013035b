//! Closed row schemas for every USR matrix registry.

use serde_json::{Map, Value, json};

pub const REGISTRY_SCHEMA_VERSION: &str = "usr-registry-1.0.0";

pub const RUNTIME_CONFIG_POLICY: &str = "usr-runtime-config-policy";
pub const FAILURE_INJECTION_MATRIX: &str = "usr-failure-injection-matrix";
pub const FIXTURE_GOVERNANCE: &str = "usr-fixture-governance";
pub const LANGUAGE_PROFILES: &str = "usr-language-profiles";
pub const LANGUAGE_VERSION_POLICY: &str = "usr-language-version-policy";
pub const LANGUAGE_EMBEDDING_POLICY: &str = "usr-language-embedding-policy";
pub const NODE_KIND_MAPPING: &str = "usr-node-kind-mapping";
pub const EDGE_KIND_CONSTRAINTS: &str = "usr-edge-kind-constraints";
pub const PARSER_RUNTIME_LOCK: &str = "usr-parser-runtime-lock";
pub const LANGUAGE_BATCH_SHARDS: &str = "usr-language-batch-shards";
pub const FRAMEWORK_PROFILES: &str = "usr-framework-profiles";
pub const FRAMEWORK_EDGE_CASES: &str = "usr-framework-edge-cases";
pub const EMBEDDING_BRIDGE_CASES: &str = "usr-embedding-bridge-cases";
pub const GENERATED_PROVENANCE_CASES: &str = "usr-generated-provenance-cases";
pub const LANGUAGE_RISK_PROFILES: &str = "usr-language-risk-profiles";
pub const CAPABILITY_MATRIX: &str = "usr-capability-matrix";
pub const CONFORMANCE_LEVELS: &str = "usr-conformance-levels";
pub const BACKCOMPAT_MATRIX: &str = "usr-backcompat-matrix";
pub const OWNERSHIP_MATRIX: &str = "usr-ownership-matrix";
pub const ESCALATION_POLICY: &str = "usr-escalation-policy";
pub const BENCHMARK_POLICY: &str = "usr-benchmark-policy";
pub const SLO_BUDGETS: &str = "usr-slo-budgets";
pub const SECURITY_GATES: &str = "usr-security-gates";
pub const ALERT_POLICIES: &str = "usr-alert-policies";
pub const REDACTION_RULES: &str = "usr-redaction-rules";
pub const QUALITY_GATES: &str = "usr-quality-gates";
pub const OPERATIONAL_READINESS_POLICY: &str = "usr-operational-readiness-policy";
pub const THREAT_MODEL_MATRIX: &str = "usr-threat-model-matrix";
pub const WAIVER_POLICY: &str = "usr-waiver-policy";

fn string() -> Value {
    json!({"type": "string"})
}

fn boolean() -> Value {
    json!({"type": "boolean"})
}

fn string_array() -> Value {
    json!({"type": "array", "items": {"type": "string"}})
}

fn nullable_string() -> Value {
    json!({"type": ["string", "null"]})
}

fn integer_min(minimum: i64) -> Value {
    json!({"type": "integer", "minimum": minimum})
}

fn unit_interval() -> Value {
    json!({"type": "number", "minimum": 0, "maximum": 1})
}

fn enumerated(values: &[&str]) -> Value {
    json!({"type": "string", "enum": values})
}

/// Builds a closed object schema: every property listed, nothing else allowed.
fn closed(required: &[&str], properties: Vec<(&str, Value)>) -> Value {
    let mut props = Map::new();
    for (name, schema) in properties {
        props.insert(name.to_string(), schema);
    }
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": required,
        "properties": Value::Object(props),
    })
}

fn taxonomy_bucket() -> Value {
    closed(
        &["sources", "sinks", "sanitizers"],
        vec![
            ("sources", string_array()),
            ("sinks", string_array()),
            ("sanitizers", string_array()),
        ],
    )
}

fn capability_state() -> Value {
    enumerated(&["supported", "partial", "unsupported"])
}

fn language_version_policy_body() -> Vec<(&'static str, Value)> {
    vec![
        ("minVersion", string()),
        ("maxVersion", nullable_string()),
        ("dialects", string_array()),
        ("featureFlags", string_array()),
    ]
}

fn embedding_policy_body() -> Vec<(&'static str, Value)> {
    vec![
        ("canHostEmbedded", boolean()),
        ("canBeEmbedded", boolean()),
        ("embeddedLanguageAllowlist", string_array()),
    ]
}

/// Row schema for `registry_id`, or `None` for an unknown id.
pub fn row_schema(registry_id: &str) -> Option<Value> {
    let schema = match registry_id {
        RUNTIME_CONFIG_POLICY => closed(
            &[
                "id",
                "key",
                "valueType",
                "defaultValue",
                "rolloutClass",
                "strictModeBehavior",
                "requiresRestart",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("key", string()),
                ("valueType", enumerated(&["boolean", "integer", "enum"])),
                ("defaultValue", json!({})),
                ("minValue", json!({"type": ["number", "null"]})),
                ("maxValue", json!({"type": ["number", "null"]})),
                (
                    "allowedValues",
                    json!({"type": ["array", "null"], "items": {"type": "string"}}),
                ),
                ("rolloutClass", string()),
                ("strictModeBehavior", string()),
                ("requiresRestart", boolean()),
                ("blocking", boolean()),
            ],
        ),
        FAILURE_INJECTION_MATRIX => closed(
            &[
                "id",
                "faultClass",
                "injectionLayer",
                "strictExpectedOutcome",
                "nonStrictExpectedOutcome",
                "requiredDiagnostics",
                "requiredReasonCodes",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("faultClass", string()),
                ("injectionLayer", string()),
                ("strictExpectedOutcome", string()),
                ("nonStrictExpectedOutcome", string()),
                ("requiredDiagnostics", string_array()),
                ("requiredReasonCodes", string_array()),
                ("rollbackTriggerConsecutiveFailures", integer_min(1)),
                ("requiredRecoveryArtifacts", string_array()),
                ("blocking", boolean()),
            ],
        ),
        FIXTURE_GOVERNANCE => closed(
            &[
                "fixtureId",
                "profileType",
                "profileId",
                "conformanceLevels",
                "families",
                "owner",
                "reviewers",
                "stabilityClass",
                "mutationPolicy",
                "goldenRequired",
                "blocking",
            ],
            vec![
                ("fixtureId", string()),
                (
                    "profileType",
                    enumerated(&["language", "framework", "cross-cutting"]),
                ),
                ("profileId", string()),
                ("conformanceLevels", string_array()),
                ("families", string_array()),
                ("roadmapTags", string_array()),
                ("owner", string()),
                ("reviewers", string_array()),
                ("stabilityClass", enumerated(&["stable", "volatile"])),
                (
                    "mutationPolicy",
                    enumerated(&["require-rfc", "require-review", "allow-generated-refresh"]),
                ),
                ("goldenRequired", boolean()),
                ("blocking", boolean()),
            ],
        ),
        LANGUAGE_PROFILES => closed(
            &[
                "id",
                "parserPreference",
                "requiredNodeKinds",
                "requiredEdgeKinds",
                "requiredCapabilities",
                "fallbackChain",
                "frameworkProfiles",
                "requiredConformance",
            ],
            vec![
                ("id", string()),
                ("parserPreference", string()),
                (
                    "languageVersionPolicy",
                    closed(
                        &["minVersion", "maxVersion", "dialects", "featureFlags"],
                        language_version_policy_body(),
                    ),
                ),
                (
                    "embeddingPolicy",
                    closed(
                        &["canHostEmbedded", "canBeEmbedded", "embeddedLanguageAllowlist"],
                        embedding_policy_body(),
                    ),
                ),
                ("requiredNodeKinds", string_array()),
                ("requiredEdgeKinds", string_array()),
                (
                    "requiredCapabilities",
                    json!({"type": "object", "additionalProperties": capability_state()}),
                ),
                ("fallbackChain", string_array()),
                ("frameworkProfiles", string_array()),
                ("requiredConformance", string_array()),
                ("notes", string()),
            ],
        ),
        LANGUAGE_VERSION_POLICY => {
            let mut body = vec![("languageId", string())];
            body.extend(language_version_policy_body());
            closed(
                &[
                    "languageId",
                    "minVersion",
                    "maxVersion",
                    "dialects",
                    "featureFlags",
                ],
                body,
            )
        }
        LANGUAGE_EMBEDDING_POLICY => {
            let mut body = vec![("languageId", string())];
            body.extend(embedding_policy_body());
            closed(
                &[
                    "languageId",
                    "canHostEmbedded",
                    "canBeEmbedded",
                    "embeddedLanguageAllowlist",
                ],
                body,
            )
        }
        NODE_KIND_MAPPING => closed(
            &[
                "languageId",
                "parserSource",
                "rawKind",
                "normalizedKind",
                "category",
                "confidence",
                "priority",
                "provenance",
                "languageVersionSelector",
                "notes",
            ],
            vec![
                ("languageId", string()),
                ("parserSource", string()),
                ("rawKind", string()),
                ("normalizedKind", string()),
                ("category", string()),
                ("confidence", unit_interval()),
                ("priority", integer_min(0)),
                ("provenance", string()),
                ("languageVersionSelector", nullable_string()),
                ("notes", string()),
            ],
        ),
        EDGE_KIND_CONSTRAINTS => closed(
            &[
                "edgeKind",
                "sourceEntityKinds",
                "targetEntityKinds",
                "requiredAttrs",
                "optionalAttrs",
                "blocking",
            ],
            vec![
                ("edgeKind", string()),
                ("sourceEntityKinds", string_array()),
                ("targetEntityKinds", string_array()),
                ("requiredAttrs", string_array()),
                ("optionalAttrs", string_array()),
                ("blocking", boolean()),
            ],
        ),
        PARSER_RUNTIME_LOCK => closed(
            &[
                "parserSource",
                "languageId",
                "parserName",
                "parserVersion",
                "runtimeName",
                "runtimeVersion",
                "lockReason",
            ],
            vec![
                ("parserSource", string()),
                ("languageId", string()),
                ("parserName", string()),
                ("parserVersion", string()),
                ("runtimeName", string()),
                ("runtimeVersion", string()),
                ("lockReason", string()),
                ("maxUpgradeBudgetDays", integer_min(1)),
            ],
        ),
        LANGUAGE_BATCH_SHARDS => closed(
            &[
                "id",
                "laneId",
                "sequence",
                "scopeType",
                "languageIds",
                "dependsOn",
                "orderManifest",
                "gateId",
                "requiredConformance",
            ],
            vec![
                ("id", string()),
                ("laneId", string()),
                ("sequence", integer_min(0)),
                (
                    "scopeType",
                    enumerated(&["foundation", "language-batch", "integration"]),
                ),
                ("languageIds", string_array()),
                ("dependsOn", string_array()),
                ("orderManifest", string()),
                ("gateId", string()),
                ("requiredConformance", string_array()),
                ("notes", string()),
            ],
        ),
        FRAMEWORK_PROFILES => closed(
            &[
                "id",
                "detectionPrecedence",
                "appliesToLanguages",
                "segmentationRules",
                "bindingSemantics",
                "routeSemantics",
                "hydrationSemantics",
                "embeddedLanguageBridges",
                "edgeCaseCaseIds",
                "requiredConformance",
            ],
            vec![
                ("id", string()),
                ("detectionPrecedence", string_array()),
                ("appliesToLanguages", string_array()),
                (
                    "segmentationRules",
                    closed(
                        &["blocks", "ordering", "crossBlockLinking"],
                        vec![
                            ("blocks", string_array()),
                            ("ordering", string_array()),
                            ("crossBlockLinking", string_array()),
                        ],
                    ),
                ),
                (
                    "bindingSemantics",
                    closed(
                        &["requiredEdgeKinds", "requiredAttrs"],
                        vec![
                            ("requiredEdgeKinds", string_array()),
                            (
                                "requiredAttrs",
                                json!({"type": "object", "additionalProperties": string_array()}),
                            ),
                        ],
                    ),
                ),
                (
                    "routeSemantics",
                    closed(
                        &["enabled", "patternCanon", "runtimeSides"],
                        vec![
                            ("enabled", boolean()),
                            ("patternCanon", string()),
                            ("runtimeSides", string_array()),
                        ],
                    ),
                ),
                (
                    "hydrationSemantics",
                    closed(
                        &["required", "boundarySignals", "ssrCsrModes"],
                        vec![
                            ("required", boolean()),
                            ("boundarySignals", string_array()),
                            ("ssrCsrModes", string_array()),
                        ],
                    ),
                ),
                (
                    "embeddedLanguageBridges",
                    json!({
                        "type": "array",
                        "items": closed(
                            &["sourceBlock", "targetBlock", "edgeKinds"],
                            vec![
                                ("sourceBlock", string()),
                                ("targetBlock", string()),
                                ("edgeKinds", string_array()),
                            ],
                        ),
                    }),
                ),
                ("edgeCaseCaseIds", string_array()),
                ("requiredConformance", string_array()),
            ],
        ),
        FRAMEWORK_EDGE_CASES => closed(
            &[
                "id",
                "frameworkProfile",
                "category",
                "requiredEdgeKinds",
                "requiredDiagnostics",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("frameworkProfile", string()),
                ("category", string()),
                ("requiredEdgeKinds", string_array()),
                ("requiredDiagnostics", string_array()),
                ("blocking", boolean()),
            ],
        ),
        EMBEDDING_BRIDGE_CASES => closed(
            &[
                "id",
                "containerKind",
                "sourceLanguageId",
                "targetLanguageId",
                "requiredEdgeKinds",
                "requiredDiagnostics",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("containerKind", string()),
                ("sourceLanguageId", string()),
                ("targetLanguageId", string()),
                ("requiredEdgeKinds", string_array()),
                ("requiredDiagnostics", string_array()),
                ("blocking", boolean()),
            ],
        ),
        GENERATED_PROVENANCE_CASES => closed(
            &[
                "id",
                "languageId",
                "generationKind",
                "mappingExpectation",
                "requiredDiagnostics",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("languageId", string()),
                ("generationKind", string()),
                (
                    "mappingExpectation",
                    enumerated(&["exact", "approximate", "missing"]),
                ),
                ("requiredDiagnostics", string_array()),
                ("blocking", boolean()),
            ],
        ),
        LANGUAGE_RISK_PROFILES => closed(
            &[
                "languageId",
                "frameworkProfile",
                "required",
                "optional",
                "unsupported",
                "capabilities",
                "interproceduralGating",
                "severityPolicy",
            ],
            vec![
                ("languageId", string()),
                ("frameworkProfile", nullable_string()),
                ("required", taxonomy_bucket()),
                ("optional", taxonomy_bucket()),
                ("unsupported", taxonomy_bucket()),
                (
                    "capabilities",
                    closed(
                        &["riskLocal", "riskInterprocedural"],
                        vec![
                            ("riskLocal", capability_state()),
                            ("riskInterprocedural", capability_state()),
                        ],
                    ),
                ),
                (
                    "interproceduralGating",
                    closed(
                        &[
                            "enabledByDefault",
                            "minEvidenceKinds",
                            "requiredCallLinkConfidence",
                        ],
                        vec![
                            ("enabledByDefault", boolean()),
                            ("minEvidenceKinds", string_array()),
                            ("requiredCallLinkConfidence", unit_interval()),
                        ],
                    ),
                ),
                (
                    "severityPolicy",
                    closed(
                        &["levels", "defaultLevel"],
                        vec![("levels", string_array()), ("defaultLevel", string())],
                    ),
                ),
            ],
        ),
        CAPABILITY_MATRIX => closed(
            &[
                "languageId",
                "frameworkProfile",
                "capability",
                "state",
                "requiredConformance",
                "downgradeDiagnostics",
                "blocking",
            ],
            vec![
                ("languageId", string()),
                ("frameworkProfile", nullable_string()),
                ("capability", string()),
                ("state", capability_state()),
                ("requiredConformance", string_array()),
                ("downgradeDiagnostics", string_array()),
                ("blocking", boolean()),
            ],
        ),
        CONFORMANCE_LEVELS => closed(
            &[
                "profileType",
                "profileId",
                "requiredLevels",
                "blockingLevels",
                "requiredFixtureFamilies",
            ],
            vec![
                ("profileType", enumerated(&["language", "framework"])),
                ("profileId", string()),
                ("requiredLevels", string_array()),
                ("blockingLevels", string_array()),
                ("requiredFixtureFamilies", string_array()),
            ],
        ),
        BACKCOMPAT_MATRIX => closed(
            &[
                "id",
                "producerVersion",
                "readerVersions",
                "readerMode",
                "fixtureFamily",
                "expectedOutcome",
                "requiredDiagnostics",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("producerVersion", string()),
                ("readerVersions", string_array()),
                ("readerMode", enumerated(&["strict", "non-strict"])),
                ("fixtureFamily", string()),
                (
                    "expectedOutcome",
                    enumerated(&["accept", "reject", "accept-with-adapter"]),
                ),
                ("requiredDiagnostics", string_array()),
                ("blocking", boolean()),
            ],
        ),
        OWNERSHIP_MATRIX => closed(
            &[
                "id",
                "domain",
                "ownerRole",
                "backupOwnerRole",
                "escalationPolicyId",
                "evidenceArtifacts",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("domain", string()),
                ("ownerRole", string()),
                ("backupOwnerRole", string()),
                ("escalationPolicyId", string()),
                ("evidenceArtifacts", string_array()),
                ("blocking", boolean()),
            ],
        ),
        ESCALATION_POLICY => closed(
            &[
                "id",
                "triggerClass",
                "severity",
                "requiredApprovers",
                "maxAckMinutes",
                "maxResolutionMinutes",
                "autoBlockPromotion",
            ],
            vec![
                ("id", string()),
                ("triggerClass", string()),
                ("severity", enumerated(&["medium", "high", "critical"])),
                ("requiredApprovers", string_array()),
                ("maxAckMinutes", integer_min(1)),
                ("maxResolutionMinutes", integer_min(1)),
                ("autoBlockPromotion", boolean()),
            ],
        ),
        BENCHMARK_POLICY => closed(
            &[
                "id",
                "laneId",
                "datasetClass",
                "hostClass",
                "warmupRuns",
                "measureRuns",
                "percentileTargets",
                "maxVariancePct",
                "maxPeakMemoryMb",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("laneId", string()),
                ("datasetClass", string()),
                ("hostClass", string()),
                ("warmupRuns", integer_min(0)),
                ("measureRuns", integer_min(1)),
                (
                    "percentileTargets",
                    closed(
                        &["p50DurationMs", "p95DurationMs", "p99DurationMs"],
                        vec![
                            ("p50DurationMs", integer_min(1)),
                            ("p95DurationMs", integer_min(1)),
                            ("p99DurationMs", integer_min(1)),
                        ],
                    ),
                ),
                ("maxVariancePct", json!({"type": "number", "minimum": 0})),
                ("maxPeakMemoryMb", integer_min(1)),
                ("blocking", boolean()),
            ],
        ),
        SLO_BUDGETS => closed(
            &[
                "laneId",
                "profileScope",
                "scopeId",
                "maxDurationMs",
                "maxMemoryMb",
                "maxParserTimePerSegmentMs",
                "maxUnknownKindRate",
                "maxUnresolvedRate",
                "blocking",
            ],
            vec![
                ("laneId", string()),
                ("profileScope", string()),
                ("scopeId", string()),
                ("maxDurationMs", integer_min(1)),
                ("maxMemoryMb", integer_min(1)),
                ("maxParserTimePerSegmentMs", integer_min(1)),
                ("maxUnknownKindRate", unit_interval()),
                ("maxUnresolvedRate", unit_interval()),
                ("blocking", boolean()),
            ],
        ),
        SECURITY_GATES => closed(
            &["id", "check", "scope", "enforcement", "blocking"],
            vec![
                ("id", string()),
                ("check", string()),
                ("scope", string()),
                ("enforcement", string()),
                ("blocking", boolean()),
            ],
        ),
        ALERT_POLICIES => closed(
            &[
                "id",
                "metric",
                "threshold",
                "comparator",
                "window",
                "severity",
                "escalationPolicyId",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("metric", string()),
                ("threshold", json!({"type": "number"})),
                ("comparator", string()),
                ("window", string()),
                ("severity", string()),
                ("escalationPolicyId", string()),
                ("blocking", boolean()),
            ],
        ),
        REDACTION_RULES => closed(
            &["id", "class", "replacement", "appliesTo", "blocking"],
            vec![
                ("id", string()),
                ("class", string()),
                ("replacement", string()),
                ("appliesTo", string_array()),
                ("blocking", boolean()),
            ],
        ),
        QUALITY_GATES => closed(
            &[
                "id",
                "domain",
                "scopeType",
                "scopeId",
                "metric",
                "thresholdOperator",
                "thresholdValue",
                "fixtureSetId",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("domain", string()),
                ("scopeType", enumerated(&["global", "language", "framework"])),
                ("scopeId", string()),
                ("metric", string()),
                ("thresholdOperator", enumerated(&[">=", "<=", ">", "<", "=="])),
                ("thresholdValue", json!({"type": "number"})),
                ("fixtureSetId", string()),
                ("blocking", boolean()),
            ],
        ),
        OPERATIONAL_READINESS_POLICY => closed(
            &[
                "id",
                "phase",
                "runbookId",
                "severityClass",
                "requiredRoles",
                "requiredArtifacts",
                "communicationChannels",
                "maxResponseMinutes",
                "maxRecoveryMinutes",
                "blocking",
            ],
            vec![
                ("id", string()),
                (
                    "phase",
                    enumerated(&["pre-cutover", "cutover", "incident", "post-cutover"]),
                ),
                ("runbookId", string()),
                ("severityClass", string()),
                ("requiredRoles", string_array()),
                ("requiredArtifacts", string_array()),
                ("communicationChannels", string_array()),
                ("maxResponseMinutes", integer_min(1)),
                ("maxRecoveryMinutes", integer_min(1)),
                ("blocking", boolean()),
            ],
        ),
        THREAT_MODEL_MATRIX => closed(
            &[
                "id",
                "threatClass",
                "attackSurface",
                "requiredControls",
                "requiredFixtures",
                "severity",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("threatClass", string()),
                ("attackSurface", string()),
                ("requiredControls", string_array()),
                ("requiredFixtures", string_array()),
                ("severity", enumerated(&["medium", "high", "critical"])),
                ("blocking", boolean()),
            ],
        ),
        WAIVER_POLICY => closed(
            &[
                "id",
                "waiverClass",
                "scopeType",
                "scopeId",
                "allowedUntil",
                "approvers",
                "requiredCompensatingControls",
                "maxExtensions",
                "blocking",
            ],
            vec![
                ("id", string()),
                ("waiverClass", string()),
                ("scopeType", string()),
                ("scopeId", string()),
                ("allowedUntil", string()),
                ("approvers", string_array()),
                ("requiredCompensatingControls", string_array()),
                ("maxExtensions", integer_min(0)),
                ("blocking", boolean()),
            ],
        ),
        _ => return None,
    };
    Some(schema)
}

pub const REGISTRY_IDS: &[&str] = &[
    RUNTIME_CONFIG_POLICY,
    FAILURE_INJECTION_MATRIX,
    FIXTURE_GOVERNANCE,
    LANGUAGE_PROFILES,
    LANGUAGE_VERSION_POLICY,
    LANGUAGE_EMBEDDING_POLICY,
    NODE_KIND_MAPPING,
    EDGE_KIND_CONSTRAINTS,
    PARSER_RUNTIME_LOCK,
    LANGUAGE_BATCH_SHARDS,
    FRAMEWORK_PROFILES,
    FRAMEWORK_EDGE_CASES,
    EMBEDDING_BRIDGE_CASES,
    GENERATED_PROVENANCE_CASES,
    LANGUAGE_RISK_PROFILES,
    CAPABILITY_MATRIX,
    CONFORMANCE_LEVELS,
    BACKCOMPAT_MATRIX,
    OWNERSHIP_MATRIX,
    ESCALATION_POLICY,
    BENCHMARK_POLICY,
    SLO_BUDGETS,
    SECURITY_GATES,
    ALERT_POLICIES,
    REDACTION_RULES,
    QUALITY_GATES,
    OPERATIONAL_READINESS_POLICY,
    THREAT_MODEL_MATRIX,
    WAIVER_POLICY,
];

/// Full registry document schema: envelope plus the row schema.
pub fn registry_schema(registry_id: &str) -> Option<Value> {
    let rows = row_schema(registry_id)?;
    Some(json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": format!("{registry_id}.json"),
        "type": "object",
        "additionalProperties": false,
        "required": ["schemaVersion", "registryId", "generatedAt", "generatedBy", "rows"],
        "properties": {
            "schemaVersion": {"type": "string", "const": REGISTRY_SCHEMA_VERSION},
            "registryId": {"type": "string", "const": registry_id},
            "generatedAt": string(),
            "generatedBy": string(),
            "rows": {"type": "array", "items": rows},
        },
    }))
}
