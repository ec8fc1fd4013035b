//! # USR Kernel
//!
//! Governance over the USR matrix registries: closed schemas for every
//! registry and report, a layered runtime-configuration resolver,
//! cross-registry validators, waiver lifecycle evaluation, and promotion
//! readiness.
//!
//! Every evaluator is a pure function of caller-supplied payloads, layers,
//! and timestamps. Policy violations come back as `errors`/`warnings` on the
//! result record; [`UsrError`] is reserved for failures that stop an
//! evaluation from running at all.
//!
//! ## Architecture
//!
//! ```text
//! SchemaRegistry        ← compiled registry + report schemas
//!     │
//! Registry<Row>         ← typed projection of a schema-valid payload
//!     │
//! validators            ← catalog, shards, edges, backcompat, risk, threat, …
//!     │
//! readiness             ← conformance coverage, promotion, operations
//!     │
//! EvidenceEnvelope      ← report payload shared by every builder
//! ```

pub mod backcompat;
pub mod batch_shards;
pub mod benchmark;
pub mod bundle;
pub mod catalog;
pub mod codes;
pub mod config;
pub mod conformance;
pub mod edges;
pub mod error;
pub mod failure_injection;
pub mod findings;
pub mod fixture_governance;
pub mod observability;
pub mod ownership;
pub mod readiness;
pub mod registry;
pub mod report;
pub mod risk_profiles;
pub mod schema;
pub mod security_gates;
pub mod threat_model;
pub mod waiver;

pub use bundle::RegistryBundle;
pub use config::{ConfigLayers, Layer, ResolvedConfig};
pub use conformance::{Blocker, ConformanceInputs, Gate, PromotionReadiness};
pub use error::UsrError;
pub use findings::{CheckOutcome, Findings, Severity};
pub use registry::{ConformanceLevel, Registry};
pub use report::{BuiltReport, EvidenceEnvelope, ReportContext, ReportStatus, Scope, Validation};
pub use schema::{SchemaCheck, SchemaRegistry};
