//! Semantic Rule Engine - policy checks beyond schema shape
//!
//! Each rule inspects the raw document in the context of the caller's
//! authorization info and yields at most one error. Rules never stop
//! each other; the engine runs all of them in a fixed order.

use std::fmt;

use serde_json::{json, Value};
use tracing::trace;

use crate::codes::ErrorCode;
use crate::host::check_host_domain;
use crate::manifest::ManifestVersion;
use crate::validation::{AdditionalInfo, ErrorDetail};

const CONTENT_HUB: &str = "content-hub";
const CLIPBOARD_READ: &str = "clipboard-read";
const ALLOW_FORMS: &str = "allow-forms";
const FORM_SUBMISSION: &str = "formSubmission";

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub document: &'a Value,
    pub version: ManifestVersion,
    pub info: &'a AdditionalInfo,
}

impl<'a> RuleContext<'a> {
    pub fn new(document: &'a Value, version: ManifestVersion, info: &'a AdditionalInfo) -> Self {
        Self {
            document,
            version,
            info,
        }
    }

    fn requirements(&self) -> Option<&'a Value> {
        self.document.get("requirements")
    }

    fn requirement_flag(&self, name: &str) -> bool {
        self.requirements()
            .and_then(|r| r.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn trusted_partner_api(&self, name: &str) -> bool {
        self.requirements()
            .and_then(|r| r.get("trustedPartnerApis"))
            .and_then(|apis| apis.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Entry points that are objects, with their index.
    fn entry_points(&self) -> impl Iterator<Item = (usize, &'a Value)> {
        self.document
            .get("entryPoints")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .filter(|(_, entry)| entry.is_object())
    }
}

/// A single policy check.
pub trait SemanticRule: Send + Sync {
    fn code(&self) -> ErrorCode;
    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail>;
}

fn permission_list<'a>(entry: &'a Value, name: &str) -> impl Iterator<Item = &'a str> {
    entry
        .get("permissions")
        .and_then(|p| p.get(name))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn is_present(entry: &Value, name: &str) -> bool {
    entry.get(name).map_or(false, |v| !v.is_null())
}

// --- Concrete Rules ---

pub struct EmptyEntrypointRule;

impl SemanticRule for EmptyEntrypointRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::EmptyEntrypoint
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        let entries = ctx.document.get("entryPoints")?.as_array()?;
        entries
            .is_empty()
            .then(|| ErrorDetail::from_code(self.code(), "/entryPoints"))
    }
}

pub struct EmptyIconRule;

impl SemanticRule for EmptyIconRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::EmptyIcon
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        match ctx.version {
            ManifestVersion::V1 => {
                let icons = ctx.document.get("icon")?.as_array()?;
                icons
                    .is_empty()
                    .then(|| ErrorDetail::from_code(self.code(), "/icon"))
            }
            ManifestVersion::V2 => None,
        }
    }
}

pub struct PrivilegedApisRule;

impl SemanticRule for PrivilegedApisRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::RestrictedPrivilegedApis
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        (ctx.requirement_flag("privilegedApis") && !ctx.info.privileged)
            .then(|| ErrorDetail::from_code(self.code(), "/requirements/privilegedApis"))
    }
}

pub struct ContentHubEntrypointRule;

impl SemanticRule for ContentHubEntrypointRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::RestrictedContentHubEntrypoint
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        match ctx.version {
            ManifestVersion::V1 => None,
            ManifestVersion::V2 if ctx.info.privileged => None,
            ManifestVersion::V2 => ctx
                .entry_points()
                .find(|(_, entry)| entry.get("type").and_then(Value::as_str) == Some(CONTENT_HUB))
                .map(|(i, _)| ErrorDetail::from_code(self.code(), format!("/entryPoints/{}/type", i))),
        }
    }
}

pub struct ClipboardPermissionRule;

impl SemanticRule for ClipboardPermissionRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::InvalidClipboardPermission
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        if ctx.info.privileged {
            return None;
        }
        ctx.entry_points()
            .find(|(_, entry)| permission_list(entry, "clipboard").any(|p| p == CLIPBOARD_READ))
            .map(|(i, _)| {
                ErrorDetail::from_code(self.code(), format!("/entryPoints/{}/permissions/clipboard", i))
                    .with_params(json!({ "permission": CLIPBOARD_READ }))
            })
    }
}

pub struct FormsSandboxRule;

impl SemanticRule for FormsSandboxRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::RestrictedFormsSandboxProperty
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        if ctx.info.privileged || ctx.trusted_partner_api(FORM_SUBMISSION) {
            return None;
        }
        ctx.entry_points()
            .find(|(_, entry)| permission_list(entry, "sandbox").any(|p| p == ALLOW_FORMS))
            .map(|(i, _)| {
                ErrorDetail::from_code(self.code(), format!("/entryPoints/{}/permissions/sandbox", i))
                    .with_params(json!({ "sandbox": ALLOW_FORMS }))
            })
    }
}

pub struct HostDomainRule;

impl SemanticRule for HostDomainRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::InvalidHostDomain
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        if ctx.version != ManifestVersion::V2 {
            return None;
        }
        ctx.entry_points().find_map(|(i, entry)| {
            let value = entry.get("hostDomain")?;
            let reason = match value.as_str() {
                Some(domain) => check_host_domain(domain).err()?.to_string(),
                None => "hostDomain must be a string".to_string(),
            };
            Some(
                ErrorDetail::from_code(self.code(), format!("/entryPoints/{}/hostDomain", i))
                    .with_params(json!({ "hostDomain": value, "reason": reason })),
            )
        })
    }
}

pub struct ScriptDocumentSandboxRule;

impl SemanticRule for ScriptDocumentSandboxRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::ExclusiveScriptDocumentSandbox
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        if ctx.version != ManifestVersion::V2 {
            return None;
        }
        ctx.entry_points()
            .find(|(_, entry)| is_present(entry, "script") && is_present(entry, "documentSandbox"))
            .map(|(i, _)| ErrorDetail::from_code(self.code(), format!("/entryPoints/{}", i)))
    }
}

pub struct ExperimentalApisRule;

impl SemanticRule for ExperimentalApisRule {
    fn code(&self) -> ErrorCode {
        ErrorCode::AdditionPropertyExperimentalApis
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<ErrorDetail> {
        ctx.requirements()?.get("experimentalApis")?;
        Some(
            ErrorDetail::from_code(self.code(), "/requirements")
                .with_params(json!({ "additionalProperty": "experimentalApis" })),
        )
    }
}

/// Ordered rule list. Every rule runs; failures are collected in order.
pub struct RuleEngine {
    rules: Vec<Box<dyn SemanticRule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(EmptyEntrypointRule),
                Box::new(EmptyIconRule),
                Box::new(PrivilegedApisRule),
                Box::new(ContentHubEntrypointRule),
                Box::new(ClipboardPermissionRule),
                Box::new(FormsSandboxRule),
                Box::new(HostDomainRule),
                Box::new(ScriptDocumentSandboxRule),
                Box::new(ExperimentalApisRule),
            ],
        }
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.rules.iter().map(|rule| rule.code()).collect()
    }

    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<ErrorDetail> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let detail = rule.check(ctx)?;
                trace!(rule = %rule.code(), path = %detail.instance_path, "semantic rule failed");
                Some(detail)
            })
            .collect()
    }
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine").field("rules", &self.codes()).finish()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
