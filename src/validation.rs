//! Validation results - one error shape for schema and policy failures
//!
//! Structural errors and semantic errors are both `ErrorDetail`s.
//! The aggregator concatenates them, structural first.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::codes::ErrorCode;

/// Caller-supplied authorization context. Not part of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub is_developer_add_on: bool,
}

impl AdditionalInfo {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Self::default()
        }
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn developer(mut self, is_developer_add_on: bool) -> Self {
        self.is_developer_add_on = is_developer_add_on;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// JSON Pointer into the document; empty for the root.
    pub instance_path: String,
    pub keyword: String,
    pub params: Value,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(
        instance_path: impl Into<String>,
        keyword: impl Into<String>,
        params: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            instance_path: instance_path.into(),
            keyword: keyword.into(),
            params,
            message: message.into(),
        }
    }

    /// Policy error for a named code, with empty params.
    pub fn from_code(code: ErrorCode, instance_path: impl Into<String>) -> Self {
        Self::new(
            instance_path,
            code.as_str(),
            Value::Object(Map::new()),
            code.message(),
        )
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Named identifier for policy errors; `None` for schema keywords.
    pub fn code(&self) -> Option<ErrorCode> {
        self.keyword.parse().ok()
    }

    pub fn is_code(&self, code: ErrorCode) -> bool {
        self.code() == Some(code)
    }

    pub(crate) fn missing_property(instance_path: impl Into<String>, property: &str) -> Self {
        Self::new(
            instance_path,
            "required",
            json!({ "missingProperty": property }),
            format!("must have required property '{}'", property),
        )
    }
}

/// Outcome of one validation call.
///
/// `success == true` implies `error_details` is absent. A failed result with
/// no details means there was no document to validate at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_details: Option<Vec<ErrorDetail>>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error_details: None,
        }
    }

    /// Failure shape for "nothing to validate".
    pub fn absent() -> Self {
        Self {
            success: false,
            error_details: None,
        }
    }

    pub fn failure(errors: Vec<ErrorDetail>) -> Self {
        if errors.is_empty() {
            return Self::success();
        }
        Self {
            success: false,
            error_details: Some(errors),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error_details(&self) -> Option<&[ErrorDetail]> {
        self.error_details.as_deref()
    }

    pub fn errors(&self) -> &[ErrorDetail] {
        self.error_details().unwrap_or(&[])
    }

    pub fn first_error(&self) -> Option<&ErrorDetail> {
        self.errors().first()
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors().iter().any(|e| e.is_code(code))
    }

    pub fn into_errors(self) -> Vec<ErrorDetail> {
        self.error_details.unwrap_or_default()
    }
}

/// Merge structural and semantic errors. Structural errors come first.
pub fn aggregate(structural: Vec<ErrorDetail>, semantic: Vec<ErrorDetail>) -> ValidationResult {
    let mut errors = structural;
    errors.extend(semantic);
    ValidationResult::failure(errors)
}
