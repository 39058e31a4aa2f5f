//! Add-on Manifest Core - Manifest Validation Engine
//!
//! # Pipeline
//! 1. Version dispatch (manifestVersion 1 or 2, nothing else)
//! 2. Schema conformance against the per-version JSON Schema
//! 3. Policy rules in the context of the caller's authorization info
//! 4. One result: structural errors first, then policy errors
//!
//! Validation is pure. It never mutates the document and keeps no state
//! between calls beyond the compiled schemas.

pub mod codes;
pub mod host;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod schema;
pub mod validation;

pub use codes::ErrorCode;
pub use manifest::{AddOnManifest, EntryPointRef, ManifestError, ManifestVersion};
pub use pipeline::{
    check_entry_files, read_manifest, validate_manifest, ManifestValidator, PipelineError,
    MANIFEST_FILE,
};
pub use rules::{RuleContext, RuleEngine, SemanticRule};
pub use schema::{SchemaError, SchemaRepository};
pub use validation::{aggregate, AdditionalInfo, ErrorDetail, ValidationResult};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
