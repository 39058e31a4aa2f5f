//! Schema Repository and structural validation
//!
//! One JSON Schema per manifest version, embedded at build time and
//! compiled once. Compiled schemas are never mutated after creation.

use std::fmt;

use jsonschema::error::{TypeKind, ValidationError, ValidationErrorKind};
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::manifest::ManifestVersion;
use crate::validation::{AdditionalInfo, ErrorDetail};

const MANIFEST_V1_SCHEMA: &str = include_str!("../schemas/manifest.v1.json");
const MANIFEST_V2_SCHEMA: &str = include_str!("../schemas/manifest.v2.json");

/// Reported through `ErrorCode::AdditionPropertyExperimentalApis` instead.
const REMOVED_REQUIREMENT: &str = "experimentalApis";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("manifest v{version} schema is not valid JSON: {source}")]
    Parse {
        version: u8,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest v{version} schema failed to compile: {reason}")]
    Compile { version: u8, reason: String },
}

/// Compiled schemas, one per supported manifest version.
pub struct SchemaRepository {
    v1: JSONSchema,
    v2: JSONSchema,
}

impl SchemaRepository {
    pub fn compile() -> Result<Self, SchemaError> {
        Ok(Self {
            v1: compile_schema(ManifestVersion::V1)?,
            v2: compile_schema(ManifestVersion::V2)?,
        })
    }

    /// Raw schema document for a version.
    pub fn source(version: ManifestVersion) -> &'static str {
        match version {
            ManifestVersion::V1 => MANIFEST_V1_SCHEMA,
            ManifestVersion::V2 => MANIFEST_V2_SCHEMA,
        }
    }

    pub fn get(&self, version: ManifestVersion) -> &JSONSchema {
        match version {
            ManifestVersion::V1 => &self.v1,
            ManifestVersion::V2 => &self.v2,
        }
    }

    /// Check `document` against the schema for `version`.
    ///
    /// Errors under `properties` follow the key order of `document`, not
    /// the order the schema declares them in. Developer add-ons are not
    /// required to carry a top-level `id`.
    pub fn validate(
        &self,
        document: &Value,
        version: ManifestVersion,
        info: &AdditionalInfo,
    ) -> Vec<ErrorDetail> {
        let errors: Vec<ErrorDetail> = match self.get(version).validate(document) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.flat_map(|error| to_details(&error)).collect(),
        };

        let errors: Vec<ErrorDetail> = errors
            .into_iter()
            .filter(|detail| !(info.is_developer_add_on && is_missing_root_id(detail)))
            .collect();

        debug!(
            manifest_version = version.as_u8(),
            count = errors.len(),
            "structural validation finished"
        );
        errors
    }
}

impl fmt::Debug for SchemaRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRepository")
            .field("versions", &[1u8, 2u8])
            .finish_non_exhaustive()
    }
}

fn compile_schema(version: ManifestVersion) -> Result<JSONSchema, SchemaError> {
    let raw: Value = serde_json::from_str(SchemaRepository::source(version)).map_err(|source| {
        SchemaError::Parse {
            version: version.as_u8(),
            source,
        }
    })?;

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&raw)
        .map_err(|e| SchemaError::Compile {
            version: version.as_u8(),
            reason: e.to_string(),
        })
}

fn is_missing_root_id(detail: &ErrorDetail) -> bool {
    detail.instance_path.is_empty()
        && detail.keyword == "required"
        && detail.params.get("missingProperty").and_then(Value::as_str) == Some("id")
}

/// Translate one schema violation into error records.
///
/// Additional-property violations fan out into one record per property.
fn to_details(error: &ValidationError<'_>) -> Vec<ErrorDetail> {
    let path = error.instance_path.to_string();

    let detail = match &error.kind {
        ValidationErrorKind::Type { kind } => match kind {
            TypeKind::Single(expected) => ErrorDetail::new(
                path,
                "type",
                json!({ "type": expected.to_string() }),
                format!("must be {}", expected),
            ),
            TypeKind::Multiple(_) => ErrorDetail::new(path, "type", json!({}), error.to_string()),
        },
        ValidationErrorKind::Required { property } => {
            let property = property.as_str().unwrap_or_default();
            ErrorDetail::missing_property(path, property)
        }
        ValidationErrorKind::Pattern { pattern } => ErrorDetail::new(
            path,
            "pattern",
            json!({ "pattern": pattern }),
            format!("must match pattern \"{}\"", pattern),
        ),
        ValidationErrorKind::Enum { options } => ErrorDetail::new(
            path,
            "enum",
            json!({ "allowedValues": options }),
            "must be equal to one of the allowed values",
        ),
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            return unexpected
                .iter()
                .filter(|name| !(path == "/requirements" && name.as_str() == REMOVED_REQUIREMENT))
                .map(|name| {
                    ErrorDetail::new(
                        path.clone(),
                        "additionalProperties",
                        json!({ "additionalProperty": name }),
                        "must NOT have additional properties",
                    )
                })
                .collect();
        }
        ValidationErrorKind::MinItems { limit } => ErrorDetail::new(
            path,
            "minItems",
            json!({ "limit": limit }),
            format!("must NOT have fewer than {} items", limit),
        ),
        ValidationErrorKind::MinLength { limit } => ErrorDetail::new(
            path,
            "minLength",
            json!({ "limit": limit }),
            format!("must NOT have fewer than {} characters", limit),
        ),
        ValidationErrorKind::MaxLength { limit } => ErrorDetail::new(
            path,
            "maxLength",
            json!({ "limit": limit }),
            format!("must NOT have more than {} characters", limit),
        ),
        ValidationErrorKind::Minimum { limit } => ErrorDetail::new(
            path,
            "minimum",
            json!({ "comparison": ">=", "limit": limit }),
            format!("must be >= {}", limit),
        ),
        ValidationErrorKind::Maximum { limit } => ErrorDetail::new(
            path,
            "maximum",
            json!({ "comparison": "<=", "limit": limit }),
            format!("must be <= {}", limit),
        ),
        _ => ErrorDetail::new(path, "schema", json!({}), error.to_string()),
    };

    vec![detail]
}
