//! Manifest Model - version dispatch and typed views
//!
//! `ManifestVersion::detect` picks the schema and rule set for a raw
//! document. `AddOnManifest` is the typed view used after validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::codes::ErrorCode;
use crate::validation::ErrorDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManifestVersion {
    V1,
    V2,
}

impl ManifestVersion {
    pub fn as_u8(&self) -> u8 {
        match self {
            ManifestVersion::V1 => 1,
            ManifestVersion::V2 => 2,
        }
    }

    /// Exactly the integers 1 and 2. Floats, strings and other numbers fail.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_u64() {
            Some(1) => Some(ManifestVersion::V1),
            Some(2) => Some(ManifestVersion::V2),
            _ => None,
        }
    }

    /// Pick the manifest version of a raw document.
    ///
    /// Runs before any other check; the returned error is the only one
    /// reported when dispatch fails.
    pub fn detect(document: &Value) -> Result<Self, ErrorDetail> {
        let fields = document.as_object().ok_or_else(|| {
            ErrorDetail::new("", "type", json!({ "type": "object" }), "must be object")
        })?;

        let raw = fields
            .get("manifestVersion")
            .ok_or_else(|| ErrorDetail::missing_property("", "manifestVersion"))?;

        Self::from_value(raw).ok_or_else(|| {
            ErrorDetail::from_code(ErrorCode::InvalidManifestVersion, "/manifestVersion")
                .with_params(json!({ "manifestVersion": raw }))
        })
    }
}

impl fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Invalid manifest version: {0}")]
    UnsupportedVersion(String),

    #[error("Manifest does not match the typed model: {0}")]
    Shape(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    pub apps: Vec<AppRequirement>,
    #[serde(default)]
    pub privileged_apis: bool,
    #[serde(default)]
    pub rendition_preview: bool,
    #[serde(default, rename = "_blessedPartnerAccess", skip_serializing_if = "Option::is_none")]
    pub blessed_partner_access: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trusted_partner_apis: BTreeMap<String, bool>,
}

impl Requirements {
    pub fn trusted_partner_api(&self, name: &str) -> bool {
        self.trusted_partner_apis.get(name).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRequirement {
    pub name: String,
    pub api_version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_device_class: Vec<DeviceClass>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    App,
    MobileIos,
    MobileAndroid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Icon {
    pub href: String,
    pub theme: Vec<IconTheme>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IconTheme {
    Lightest,
    Light,
    Medium,
    Dark,
    Darkest,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
}

/// Localized label; `default` is mandatory, other keys are locales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub default: String,
    #[serde(flatten)]
    pub localized: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microphone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sandbox: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oauth: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clipboard: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointV1 {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub label: Label,
    pub main: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrypointV2 {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    pub main: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_sandbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discoverable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    pub name: String,
    pub version: String,
    pub manifest_version: u8,
    pub requirements: Requirements,
    pub icon: Vec<Icon>,
    pub entry_points: Vec<EntrypointV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_info: Option<AuthorInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    pub name: String,
    pub version: String,
    pub manifest_version: u8,
    pub requirements: Requirements,
    pub entry_points: Vec<EntrypointV2>,
}

/// Version-independent view of one entry point.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointRef<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub id: &'a str,
    pub main: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_sandbox: Option<&'a str>,
}

impl<'a> EntryPointRef<'a> {
    /// Every file this entry point references, keyed by field, `main` first.
    pub fn files(&self) -> impl Iterator<Item = (&'static str, &'a str)> {
        std::iter::once(("main", self.main))
            .chain(self.script.map(|path| ("script", path)))
            .chain(self.document_sandbox.map(|path| ("documentSandbox", path)))
    }
}

/// Typed manifest, tagged by version.
#[derive(Debug, Clone)]
pub enum AddOnManifest {
    V1(ManifestV1),
    V2(ManifestV2),
}

impl AddOnManifest {
    /// Build the typed view of a document. Call after validation succeeds.
    pub fn from_value(document: &Value) -> Result<Self, ManifestError> {
        let version = ManifestVersion::detect(document)
            .map_err(|_| ManifestError::UnsupportedVersion(describe_version(document)))?;

        Ok(match version {
            ManifestVersion::V1 => AddOnManifest::V1(serde_json::from_value(document.clone())?),
            ManifestVersion::V2 => AddOnManifest::V2(serde_json::from_value(document.clone())?),
        })
    }

    pub fn manifest_version(&self) -> ManifestVersion {
        match self {
            AddOnManifest::V1(_) => ManifestVersion::V1,
            AddOnManifest::V2(_) => ManifestVersion::V2,
        }
    }

    /// `id` when present, otherwise the developer `testId`.
    pub fn id(&self) -> Option<&str> {
        let (id, test_id) = match self {
            AddOnManifest::V1(m) => (&m.id, &m.test_id),
            AddOnManifest::V2(m) => (&m.id, &m.test_id),
        };
        id.as_deref().or(test_id.as_deref())
    }

    pub fn name(&self) -> &str {
        match self {
            AddOnManifest::V1(m) => &m.name,
            AddOnManifest::V2(m) => &m.name,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            AddOnManifest::V1(m) => &m.version,
            AddOnManifest::V2(m) => &m.version,
        }
    }

    /// The version as semver, when it is strictly `major.minor.patch`.
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(self.version()).ok()
    }

    pub fn requirements(&self) -> &Requirements {
        match self {
            AddOnManifest::V1(m) => &m.requirements,
            AddOnManifest::V2(m) => &m.requirements,
        }
    }

    pub fn entry_points(&self) -> Vec<EntryPointRef<'_>> {
        match self {
            AddOnManifest::V1(m) => m
                .entry_points
                .iter()
                .map(|e| EntryPointRef {
                    kind: &e.kind,
                    id: &e.id,
                    main: &e.main,
                    script: None,
                    document_sandbox: None,
                })
                .collect(),
            AddOnManifest::V2(m) => m
                .entry_points
                .iter()
                .map(|e| EntryPointRef {
                    kind: &e.kind,
                    id: &e.id,
                    main: &e.main,
                    script: e.script.as_deref(),
                    document_sandbox: e.document_sandbox.as_deref(),
                })
                .collect(),
        }
    }

    pub fn icons(&self) -> &[Icon] {
        match self {
            AddOnManifest::V1(m) => &m.icon,
            AddOnManifest::V2(_) => &[],
        }
    }
}

fn describe_version(document: &Value) -> String {
    match document.get("manifestVersion") {
        Some(value) => value.to_string(),
        None => "missing".to_string(),
    }
}
