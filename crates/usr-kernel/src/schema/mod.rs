//! Compiled validators for every registry and report schema.
//!
//! A [`SchemaRegistry`] is built once and then only read. Every evaluator
//! takes it by reference.

pub mod registries;
pub mod reports;

use crate::error::UsrError;
use crate::registry::Registry;
use jsonschema::{Draft, Validator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of one structural check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCheck {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl SchemaCheck {
    fn pass() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
        }
    }

    fn fail(errors: Vec<String>) -> Self {
        Self { ok: false, errors }
    }
}

pub struct SchemaRegistry {
    registries: BTreeMap<&'static str, Validator>,
    reports: BTreeMap<&'static str, Validator>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("registries", &self.registries.keys().collect::<Vec<_>>())
            .field("reports", &self.reports.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn compile(schema_id: &str, schema: &Value) -> Result<Validator, UsrError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| UsrError::SchemaCompile {
            schema_id: schema_id.to_string(),
            message: err.to_string(),
        })
}

fn run(validator: &Validator, payload: &Value) -> SchemaCheck {
    let errors: Vec<String> = validator
        .iter_errors(payload)
        .map(|err| {
            let path = err.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            format!("{path} {err}")
        })
        .collect();
    if errors.is_empty() {
        SchemaCheck::pass()
    } else {
        SchemaCheck::fail(errors)
    }
}

impl SchemaRegistry {
    /// Compiles every built-in registry and report schema.
    pub fn build() -> Result<Self, UsrError> {
        let mut registries = BTreeMap::new();
        for id in registries::REGISTRY_IDS {
            let schema = registries::registry_schema(id)
                .ok_or_else(|| UsrError::UnknownRegistry((*id).to_string()))?;
            registries.insert(*id, compile(id, &schema)?);
        }
        let mut reports = BTreeMap::new();
        for id in reports::REPORT_IDS {
            let schema = reports::report_schema(id)
                .ok_or_else(|| UsrError::UnknownReport((*id).to_string()))?;
            reports.insert(*id, compile(id, &schema)?);
        }
        tracing::debug!(
            registries = registries.len(),
            reports = reports.len(),
            "compiled USR schemas"
        );
        Ok(Self {
            registries,
            reports,
        })
    }

    pub fn validate_registry(&self, registry_id: &str, payload: &Value) -> SchemaCheck {
        match self.registries.get(registry_id) {
            Some(validator) => run(validator, payload),
            None => SchemaCheck::fail(vec![
                UsrError::UnknownRegistry(registry_id.to_string()).to_string(),
            ]),
        }
    }

    /// Same as [`Self::validate_registry`], keyed by `<registryId>.json`.
    pub fn validate_file(&self, file_name: &str, payload: &Value) -> SchemaCheck {
        let registry_id = file_name.strip_suffix(".json").unwrap_or(file_name);
        self.validate_registry(registry_id, payload)
    }

    pub fn validate_report(&self, artifact_id: &str, payload: &Value) -> SchemaCheck {
        match self.reports.get(artifact_id) {
            Some(validator) => run(validator, payload),
            None => SchemaCheck::fail(vec![
                UsrError::UnknownReport(artifact_id.to_string()).to_string(),
            ]),
        }
    }

    pub fn registry_ids(&self) -> Vec<&'static str> {
        self.registries.keys().copied().collect()
    }

    pub fn report_ids(&self) -> Vec<&'static str> {
        self.reports.keys().copied().collect()
    }

    pub fn is_known_report(&self, artifact_id: &str) -> bool {
        self.reports.contains_key(artifact_id)
    }

    /// Validates `payload` and deserialises it into typed rows.
    ///
    /// Schema failures come back as the formatted schema errors. A payload
    /// that passes the schema but still cannot be deserialised is reported
    /// as a single projection error string.
    pub fn project<R: DeserializeOwned>(
        &self,
        registry_id: &str,
        payload: &Value,
    ) -> Result<Registry<R>, Vec<String>> {
        let check = self.validate_registry(registry_id, payload);
        if !check.ok {
            tracing::warn!(
                registry = registry_id,
                errors = check.errors.len(),
                "registry failed schema validation"
            );
            return Err(check.errors);
        }
        serde_json::from_value(payload.clone()).map_err(|err| {
            vec![
                UsrError::Projection {
                    registry_id: registry_id.to_string(),
                    message: err.to_string(),
                }
                .to_string(),
            ]
        })
    }
}
