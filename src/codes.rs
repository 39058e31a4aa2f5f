//! Named error identifiers for manifest policy failures.
//!
//! Semantic errors are keyed by identity, not by message text. The
//! identifier travels in `ErrorDetail::keyword` so the serialized shape
//! stays identical to structural errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidManifestVersion,
    EmptyEntrypoint,
    EmptyIcon,
    AdditionPropertyExperimentalApis,
    RestrictedPrivilegedApis,
    RestrictedContentHubEntrypoint,
    InvalidClipboardPermission,
    RestrictedFormsSandboxProperty,
    InvalidHostDomain,
    ExclusiveScriptDocumentSandbox,
    MissingEntryFile,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 11] = [
        ErrorCode::InvalidManifestVersion,
        ErrorCode::EmptyEntrypoint,
        ErrorCode::EmptyIcon,
        ErrorCode::AdditionPropertyExperimentalApis,
        ErrorCode::RestrictedPrivilegedApis,
        ErrorCode::RestrictedContentHubEntrypoint,
        ErrorCode::InvalidClipboardPermission,
        ErrorCode::RestrictedFormsSandboxProperty,
        ErrorCode::InvalidHostDomain,
        ErrorCode::ExclusiveScriptDocumentSandbox,
        ErrorCode::MissingEntryFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidManifestVersion => "InvalidManifestVersion",
            ErrorCode::EmptyEntrypoint => "EmptyEntrypoint",
            ErrorCode::EmptyIcon => "EmptyIcon",
            ErrorCode::AdditionPropertyExperimentalApis => "AdditionPropertyExperimentalApis",
            ErrorCode::RestrictedPrivilegedApis => "RestrictedPrivilegedApis",
            ErrorCode::RestrictedContentHubEntrypoint => "RestrictedContentHubEntrypoint",
            ErrorCode::InvalidClipboardPermission => "InvalidClipboardPermission",
            ErrorCode::RestrictedFormsSandboxProperty => "RestrictedFormsSandboxProperty",
            ErrorCode::InvalidHostDomain => "InvalidHostDomain",
            ErrorCode::ExclusiveScriptDocumentSandbox => "ExclusiveScriptDocumentSandbox",
            ErrorCode::MissingEntryFile => "MissingEntryFile",
        }
    }

    /// Human-readable message shown to add-on developers.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidManifestVersion => "Invalid manifest version",
            ErrorCode::EmptyEntrypoint => "At least one entrypoint should be defined",
            ErrorCode::EmptyIcon => "At least one icon should be defined",
            ErrorCode::AdditionPropertyExperimentalApis => {
                "experimentalApis is not a supported manifest property"
            }
            ErrorCode::RestrictedPrivilegedApis => {
                "privilegedApis is only available to privileged add-ons"
            }
            ErrorCode::RestrictedContentHubEntrypoint => {
                "content-hub entrypoints are only available to privileged add-ons"
            }
            ErrorCode::InvalidClipboardPermission => {
                "clipboard-read permission is only available to privileged add-ons"
            }
            ErrorCode::RestrictedFormsSandboxProperty => {
                "allow-forms sandbox property requires formSubmission trusted partner access"
            }
            ErrorCode::InvalidHostDomain => "hostDomain must be a valid https domain",
            ErrorCode::ExclusiveScriptDocumentSandbox => {
                "script and documentSandbox cannot both be defined on an entrypoint"
            }
            ErrorCode::MissingEntryFile => "Referenced entrypoint file does not exist",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}
