//! Validation Pipeline - Single Entry Point
//!
//! dispatch -> schema -> rules -> aggregate. Typed manifests are only
//! handed out after the full pipeline has passed.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::codes::ErrorCode;
use crate::manifest::{AddOnManifest, ManifestError, ManifestVersion};
use crate::report::render_line;
use crate::rules::{RuleContext, RuleEngine};
use crate::schema::{SchemaError, SchemaRepository};
use crate::validation::{aggregate, AdditionalInfo, ErrorDetail, ValidationResult};

/// File name of the manifest inside an add-on output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

static DEFAULT_VALIDATOR: Lazy<ManifestValidator> = Lazy::new(|| {
    ManifestValidator::new().expect("embedded manifest schemas must compile")
});

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ManifestError),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// The manifest validator - compiled schemas plus the rule engine.
///
/// Holds no per-call state; share one instance freely across threads.
#[derive(Debug)]
pub struct ManifestValidator {
    schemas: SchemaRepository,
    rules: RuleEngine,
}

impl ManifestValidator {
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self {
            schemas: SchemaRepository::compile()?,
            rules: RuleEngine::new(),
        })
    }

    /// Process-wide validator, compiled on first use.
    pub fn shared() -> &'static ManifestValidator {
        &DEFAULT_VALIDATOR
    }

    /// Validate a candidate manifest.
    ///
    /// `None` means there was nothing to validate and yields a failed
    /// result without details. Never mutates `document`.
    pub fn validate(&self, document: Option<&Value>, info: &AdditionalInfo) -> ValidationResult {
        let Some(document) = document else {
            debug!(source_id = %info.source_id, "no manifest to validate");
            return ValidationResult::absent();
        };

        let version = match ManifestVersion::detect(document) {
            Ok(version) => version,
            Err(detail) => {
                debug!(source_id = %info.source_id, keyword = %detail.keyword, "manifest version dispatch failed");
                return ValidationResult::failure(vec![detail]);
            }
        };

        let structural = self.schemas.validate(document, version, info);
        let semantic = self.rules.evaluate(&RuleContext::new(document, version, info));

        debug!(
            source_id = %info.source_id,
            manifest_version = version.as_u8(),
            structural = structural.len(),
            semantic = semantic.len(),
            "manifest validated"
        );

        aggregate(structural, semantic)
    }

    /// Read, validate and type the manifest in `dir`.
    ///
    /// Validation always runs; a failing manifest is never typed.
    pub fn load_manifest(
        &self,
        dir: &Path,
        info: &AdditionalInfo,
    ) -> Result<AddOnManifest, PipelineError> {
        let document = read_manifest(dir)?;
        let result = self.validate(Some(&document), info);

        if !result.is_success() {
            let messages: Vec<_> = result.errors().iter().map(render_line).collect();
            return Err(PipelineError::ValidationFailed(messages.join("; ")));
        }

        Ok(AddOnManifest::from_value(&document)?)
    }
}

/// Validate with the process-wide validator.
pub fn validate_manifest(document: Option<&Value>, info: &AdditionalInfo) -> ValidationResult {
    ManifestValidator::shared().validate(document, info)
}

/// Read `<dir>/manifest.json` as strict JSON.
pub fn read_manifest(dir: &Path) -> Result<Value, PipelineError> {
    let path = dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            PipelineError::ManifestNotFound(path.clone())
        } else {
            PipelineError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Check that every file an entry point references exists under `root`.
///
/// Absolute paths and paths with `..` are reported as missing; they never
/// resolve inside the add-on directory.
pub fn check_entry_files(manifest: &AddOnManifest, root: &Path) -> Vec<ErrorDetail> {
    let mut missing = vec![];

    for (index, entry) in manifest.entry_points().iter().enumerate() {
        for (field, file) in entry.files() {
            if is_contained(file) && root.join(file).is_file() {
                continue;
            }
            warn!(entry = entry.id, file, "entrypoint file missing");
            missing.push(
                ErrorDetail::from_code(
                    ErrorCode::MissingEntryFile,
                    format!("/entryPoints/{}/{}", index, field),
                )
                .with_params(json!({ "path": file })),
            );
        }
    }

    missing
}

fn is_contained(file: &str) -> bool {
    let path = Path::new(file);
    path.is_relative()
        && !path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
}
