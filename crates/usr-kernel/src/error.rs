//! Error types for USR kernel infrastructure failures.
//!
//! Policy violations are never errors at this level: evaluators return
//! result records carrying `errors`/`warnings`. `UsrError` covers the
//! failures that prevent an evaluation from running at all.

/// Errors arising from loading, compiling, or projecting registries.
#[derive(Debug, thiserror::Error)]
pub enum UsrError {
    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json at {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A built-in schema failed to compile. Indicates a defect in the
    /// schema catalog, not in caller input.
    #[error("failed to compile schema {schema_id}: {message}")]
    SchemaCompile { schema_id: String, message: String },

    #[error("unknown USR matrix registry: {0}")]
    UnknownRegistry(String),

    #[error("unknown USR report schema: {0}")]
    UnknownReport(String),

    #[error("registry {registry_id} not found in bundle {dir}")]
    MissingRegistry { registry_id: String, dir: String },

    /// A schema-valid payload could not be deserialised into its typed row.
    #[error("failed to project {registry_id} rows: {message}")]
    Projection {
        registry_id: String,
        message: String,
    },
}
