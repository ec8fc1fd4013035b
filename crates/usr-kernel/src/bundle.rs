//! Registry bundles: a directory holding `<registryId>.json` files.

use crate::error::UsrError;
use crate::report::canonical_digest;
use crate::schema::SchemaRegistry;
use crate::schema::registries::REGISTRY_IDS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Registry payloads loaded from one directory, keyed by registry id.
///
/// Only files named after a known registry id are read. Anything else in
/// the directory is ignored.
#[derive(Debug, Clone)]
pub struct RegistryBundle {
    dir: PathBuf,
    registries: BTreeMap<&'static str, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub registry_id: String,
    pub present: bool,
    pub ok: bool,
    pub digest: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleCheck {
    pub ok: bool,
    pub errors: Vec<String>,
    pub rows: Vec<BundleEntry>,
}

fn read_json(path: &Path) -> Result<Value, UsrError> {
    let text = fs::read_to_string(path).map_err(|source| UsrError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| UsrError::ParseJson {
        path: path.display().to_string(),
        source,
    })
}

impl RegistryBundle {
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, UsrError> {
        let dir = dir.as_ref();
        let mut registries = BTreeMap::new();
        for id in REGISTRY_IDS {
            let path = dir.join(format!("{id}.json"));
            if !path.is_file() {
                continue;
            }
            registries.insert(*id, read_json(&path)?);
        }
        tracing::debug!(
            dir = %dir.display(),
            registries = registries.len(),
            "loaded registry bundle"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            registries,
        })
    }

    /// Builds a bundle from payloads already in memory. Unknown ids are
    /// dropped.
    pub fn from_payloads(payloads: impl IntoIterator<Item = (String, Value)>) -> Self {
        let registries = payloads
            .into_iter()
            .filter_map(|(id, payload)| {
                REGISTRY_IDS
                    .iter()
                    .find(|known| **known == id)
                    .map(|known| (*known, payload))
            })
            .collect();
        Self {
            dir: PathBuf::new(),
            registries,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, registry_id: &str) -> Option<&Value> {
        self.registries.get(registry_id)
    }

    /// Payload for `registry_id`, or `Value::Null` when absent. Validators
    /// that treat a registry as optional skip a null payload.
    pub fn get_or_null(&self, registry_id: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.registries.get(registry_id).unwrap_or(&NULL)
    }

    pub fn require(&self, registry_id: &str) -> Result<&Value, UsrError> {
        self.get(registry_id).ok_or_else(|| UsrError::MissingRegistry {
            registry_id: registry_id.to_string(),
            dir: self.dir.display().to_string(),
        })
    }

    pub fn registry_ids(&self) -> Vec<&'static str> {
        self.registries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Canonical SHA-256 digest per loaded registry.
    pub fn digests(&self) -> BTreeMap<&'static str, String> {
        self.registries
            .iter()
            .map(|(id, payload)| (*id, canonical_digest(payload)))
            .collect()
    }

    /// Schema-validates every known registry id. Missing registries are
    /// reported only when `require_all` is set.
    pub fn validate(&self, schemas: &SchemaRegistry, require_all: bool) -> BundleCheck {
        let mut errors = Vec::new();
        let mut rows = Vec::with_capacity(REGISTRY_IDS.len());
        for id in REGISTRY_IDS {
            let Some(payload) = self.registries.get(id) else {
                if require_all {
                    errors.push(format!("missing registry payload: {id}"));
                }
                rows.push(BundleEntry {
                    registry_id: (*id).to_string(),
                    present: false,
                    ok: !require_all,
                    digest: None,
                    errors: Vec::new(),
                });
                continue;
            };
            let check = schemas.validate_registry(id, payload);
            errors.extend(check.errors.iter().map(|error| format!("{id} {error}")));
            rows.push(BundleEntry {
                registry_id: (*id).to_string(),
                present: true,
                ok: check.ok,
                digest: Some(canonical_digest(payload)),
                errors: check.errors,
            });
        }
        tracing::debug!(
            registries = self.registries.len(),
            errors = errors.len(),
            "validated registry bundle"
        );
        BundleCheck {
            ok: errors.is_empty(),
            errors,
            rows,
        }
    }
}
