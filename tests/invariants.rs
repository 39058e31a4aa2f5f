//! Contract Invariant Tests
//!
//! End-to-end behavior of the validation entry point.

use addon_manifest_core::{
    check_entry_files, read_manifest, validate_manifest, AdditionalInfo, AddOnManifest, ErrorCode,
    ManifestValidator, PipelineError, ValidationResult, MANIFEST_FILE,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::fs;

fn v2_manifest() -> Value {
    json!({
        "name": "My AddOn",
        "version": "1.0.0",
        "manifestVersion": 2,
        "requirements": { "apps": [{ "name": "Express", "apiVersion": 1 }] },
        "entryPoints": [{ "type": "panel", "id": "p1", "main": "index.html" }]
    })
}

fn v1_manifest() -> Value {
    json!({
        "id": "abc123",
        "name": "My AddOn",
        "version": "1.0.0",
        "manifestVersion": 1,
        "requirements": { "apps": [{ "name": "Express", "apiVersion": 1 }] },
        "icon": [{ "href": "icon.png", "theme": ["all"] }],
        "entryPoints": [{
            "type": "panel",
            "id": "p1",
            "label": { "default": "My Panel" },
            "main": "index.html"
        }]
    })
}

fn unprivileged() -> AdditionalInfo {
    AdditionalInfo::new("test-source")
}

fn privileged() -> AdditionalInfo {
    AdditionalInfo::new("test-source").privileged(true)
}

fn validate(doc: &Value, info: &AdditionalInfo) -> ValidationResult {
    validate_manifest(Some(doc), info)
}

fn first_code(result: &ValidationResult) -> Option<ErrorCode> {
    result.first_error().and_then(|e| e.code())
}

#[test]
fn invariant_minimal_v2_manifest_is_valid() {
    let result = validate(&v2_manifest(), &unprivileged());
    assert_eq!(result, ValidationResult::success());
    assert_eq!(serde_json::to_value(&result).unwrap(), json!({ "success": true }));
}

#[test]
fn invariant_minimal_v1_manifest_is_valid() {
    assert!(validate(&v1_manifest(), &unprivileged()).is_success());
}

#[test]
fn invariant_version_gate() {
    for bad in [json!(0), json!(-1), json!(1.5), json!("2"), json!(3)] {
        let mut doc = v2_manifest();
        doc["manifestVersion"] = bad.clone();
        let result = validate(&doc, &unprivileged());

        assert!(!result.is_success(), "{:?}", bad);
        assert_eq!(first_code(&result), Some(ErrorCode::InvalidManifestVersion), "{:?}", bad);
    }
}

#[test]
fn invariant_missing_manifest_version_is_structural() {
    let mut doc = v2_manifest();
    doc.as_object_mut().unwrap().remove("manifestVersion");
    let result = validate(&doc, &unprivileged());

    let first = result.first_error().unwrap();
    assert_eq!(first.keyword, "required");
    assert_eq!(first.params, json!({ "missingProperty": "manifestVersion" }));
}

#[test]
fn invariant_name_pattern_boundaries() {
    let too_long = "a".repeat(46);
    for bad in ["ab", "###", " abc", too_long.as_str()] {
        let mut doc = v2_manifest();
        doc["name"] = json!(bad);
        let result = validate(&doc, &unprivileged());
        assert!(!result.is_success(), "{:?} should fail", bad);
        assert_eq!(result.first_error().unwrap().instance_path, "/name");
    }

    let longest = "a".repeat(45);
    for good in ["abc", "123", "addOn 2", longest.as_str()] {
        let mut doc = v2_manifest();
        doc["name"] = json!(good);
        assert!(validate(&doc, &unprivileged()).is_success(), "{:?} should pass", good);
    }
}

#[test]
fn invariant_name_type_error_shape() {
    let mut doc = v2_manifest();
    doc["name"] = json!(12);
    let result = validate(&doc, &unprivileged());
    let errors = result.errors();

    assert_eq!(errors.len(), 1);
    assert_eq!(
        serde_json::to_value(&errors[0]).unwrap(),
        json!({
            "instancePath": "/name",
            "keyword": "type",
            "params": { "type": "string" },
            "message": "must be string"
        })
    );
}

#[test]
fn invariant_version_pattern() {
    for good in ["1.0.0", "99.0.1"] {
        let mut doc = v2_manifest();
        doc["version"] = json!(good);
        assert!(validate(&doc, &unprivileged()).is_success(), "{}", good);
    }
    for bad in ["1", "1.1", "a.b.c"] {
        let mut doc = v2_manifest();
        doc["version"] = json!(bad);
        let result = validate(&doc, &unprivileged());
        assert_eq!(result.first_error().unwrap().keyword, "pattern", "{}", bad);
    }
}

#[test]
fn invariant_privileged_apis_gating() {
    let mut doc = v2_manifest();
    doc["requirements"]["privilegedApis"] = json!(true);

    let denied = validate(&doc, &unprivileged());
    assert_eq!(first_code(&denied), Some(ErrorCode::RestrictedPrivilegedApis));
    assert!(validate(&doc, &privileged()).is_success());
}

#[test]
fn invariant_clipboard_gating() {
    let mut doc = v2_manifest();
    doc["entryPoints"][0]["permissions"] = json!({ "clipboard": ["clipboard-read"] });
    assert_eq!(
        first_code(&validate(&doc, &unprivileged())),
        Some(ErrorCode::InvalidClipboardPermission)
    );
    assert!(validate(&doc, &privileged()).is_success());

    doc["entryPoints"][0]["permissions"] = json!({ "clipboard": ["clipboard-write"] });
    assert!(validate(&doc, &unprivileged()).is_success());
    assert!(validate(&doc, &privileged()).is_success());
}

#[test]
fn invariant_forms_sandbox_gating() {
    let mut doc = v1_manifest();
    doc["entryPoints"][0]["permissions"] = json!({ "sandbox": ["allow-forms"] });

    assert_eq!(
        first_code(&validate(&doc, &unprivileged())),
        Some(ErrorCode::RestrictedFormsSandboxProperty)
    );
    assert!(validate(&doc, &privileged()).is_success());

    doc["requirements"]["trustedPartnerApis"] = json!({ "formSubmission": true });
    assert!(validate(&doc, &unprivileged()).is_success());
}

#[test]
fn invariant_host_domain() {
    let mut doc = v2_manifest();
    doc["entryPoints"][0]["hostDomain"] = json!("https://example.com:8080/path/to/resource");
    assert!(validate(&doc, &unprivileged()).is_success());

    for bad in ["", "*", "https://a", "https://adobe..", "http://localhost.adobe.com"] {
        doc["entryPoints"][0]["hostDomain"] = json!(bad);
        let result = validate(&doc, &unprivileged());
        assert_eq!(first_code(&result), Some(ErrorCode::InvalidHostDomain), "{:?}", bad);
        assert_eq!(result.errors()[0].instance_path, "/entryPoints/0/hostDomain");
    }
}

#[test]
fn invariant_host_domain_not_allowed_in_v1() {
    let mut doc = v1_manifest();
    doc["entryPoints"][0]["hostDomain"] = json!("https://example.com");
    let result = validate(&doc, &unprivileged());
    assert_eq!(result.first_error().unwrap().keyword, "additionalProperties");
}

#[test]
fn invariant_empty_collections() {
    let mut doc = v2_manifest();
    doc["entryPoints"] = json!([]);
    assert!(validate(&doc, &unprivileged()).has_code(ErrorCode::EmptyEntrypoint));

    let mut doc = v1_manifest();
    doc["icon"] = json!([]);
    let result = validate(&doc, &unprivileged());
    assert!(result.has_code(ErrorCode::EmptyIcon));
    assert!(!result.has_code(ErrorCode::EmptyEntrypoint));
}

#[test]
fn invariant_script_document_sandbox_exclusive() {
    let mut doc = v2_manifest();
    doc["entryPoints"][0]["script"] = json!("code.js");
    assert!(validate(&doc, &unprivileged()).is_success());

    doc["entryPoints"][0]["documentSandbox"] = json!("sandbox.js");
    assert_eq!(
        first_code(&validate(&doc, &unprivileged())),
        Some(ErrorCode::ExclusiveScriptDocumentSandbox)
    );

    doc["entryPoints"][0].as_object_mut().unwrap().remove("script");
    assert!(validate(&doc, &unprivileged()).is_success());
}

#[test]
fn invariant_script_must_be_string() {
    let mut doc = v2_manifest();
    doc["entryPoints"][0]["script"] = json!(true);
    let result = validate(&doc, &unprivileged());
    let first = result.first_error().unwrap();
    assert_eq!(first.instance_path, "/entryPoints/0/script");
    assert_eq!(first.keyword, "type");
}

#[test]
fn invariant_experimental_apis_has_one_canonical_error() {
    for flag in [true, false] {
        let mut doc = v2_manifest();
        doc["requirements"]["experimentalApis"] = json!(flag);
        let result = validate(&doc, &privileged());

        assert_eq!(result.errors().len(), 1, "{:?}", result);
        assert_eq!(first_code(&result), Some(ErrorCode::AdditionPropertyExperimentalApis));
    }
}

#[test]
fn invariant_content_hub_requires_privilege() {
    let mut doc = v2_manifest();
    doc["entryPoints"][0]["type"] = json!("content-hub");
    assert_eq!(
        first_code(&validate(&doc, &unprivileged())),
        Some(ErrorCode::RestrictedContentHubEntrypoint)
    );
    assert!(validate(&doc, &privileged()).is_success());
}

#[test]
fn invariant_structural_errors_come_first() {
    let mut doc = v2_manifest();
    doc["name"] = json!("ab");
    doc["requirements"]["privilegedApis"] = json!(true);
    let result = validate(&doc, &unprivileged());
    let errors = result.errors();

    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].keyword, "pattern");
    assert!(errors[1].is_code(ErrorCode::RestrictedPrivilegedApis));
}

#[test]
fn invariant_non_object_document() {
    let result = validate(&json!("manifest"), &unprivileged());
    assert_eq!(result.first_error().unwrap().message, "must be object");
}

#[test]
fn invariant_absent_document() {
    let result = validate_manifest(None, &unprivileged());
    assert!(!result.is_success());
    assert!(result.error_details().is_none());
}

#[test]
fn invariant_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(MANIFEST_FILE), v2_manifest().to_string()).unwrap();
    fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let validator = ManifestValidator::new().unwrap();
    let manifest = validator.load_manifest(dir.path(), &unprivileged()).unwrap();
    assert_eq!(manifest.name(), "My AddOn");
    assert!(check_entry_files(&manifest, dir.path()).is_empty());

    fs::remove_file(dir.path().join("index.html")).unwrap();
    let missing = check_entry_files(&manifest, dir.path());
    assert_eq!(missing.len(), 1);
    assert!(missing[0].is_code(ErrorCode::MissingEntryFile));
    assert_eq!(missing[0].instance_path, "/entryPoints/0/main");
}

#[test]
fn invariant_entry_files_never_leave_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = v2_manifest();

    for outside in ["/etc/hostname", "../manifest.json", "code/../../index.html"] {
        doc["entryPoints"][0]["main"] = json!(outside);
        assert!(validate(&doc, &unprivileged()).is_success());

        let manifest = AddOnManifest::from_value(&doc).unwrap();
        let missing = check_entry_files(&manifest, dir.path());
        assert_eq!(missing.len(), 1, "{}", outside);
        assert!(missing[0].is_code(ErrorCode::MissingEntryFile));
        assert_eq!(missing[0].params["path"], outside);
    }
}

#[test]
fn invariant_schema_valid_api_version_is_typed() {
    let mut doc = v2_manifest();
    doc["requirements"]["apps"][0]["apiVersion"] = json!(u32::MAX);
    assert!(validate(&doc, &unprivileged()).is_success());
    let manifest = AddOnManifest::from_value(&doc).unwrap();
    assert_eq!(manifest.requirements().apps[0].api_version, u32::MAX);

    doc["requirements"]["apps"][0]["apiVersion"] = json!(5_000_000_000u64);
    let result = validate(&doc, &unprivileged());
    assert!(!result.is_success());
    assert_eq!(result.errors()[0].instance_path, "/requirements/apps/0/apiVersion");
    assert_eq!(result.errors()[0].keyword, "maximum");
}

#[test]
fn invariant_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let validator = ManifestValidator::new().unwrap();

    let err = validator.load_manifest(dir.path(), &unprivileged()).unwrap_err();
    assert!(matches!(err, PipelineError::ManifestNotFound(_)));

    fs::write(dir.path().join(MANIFEST_FILE), "{ \"name\": \"x\", }").unwrap();
    assert!(matches!(read_manifest(dir.path()), Err(PipelineError::Json(_))));

    let mut doc = v2_manifest();
    doc["requirements"]["privilegedApis"] = json!(true);
    fs::write(dir.path().join(MANIFEST_FILE), doc.to_string()).unwrap();
    let err = validator.load_manifest(dir.path(), &unprivileged()).unwrap_err();
    assert!(err.to_string().contains("Validation failed"));
    assert!(validator.load_manifest(dir.path(), &privileged()).is_ok());
}

#[test]
fn invariant_typed_view_after_validation() {
    let doc = v1_manifest();
    assert!(validate(&doc, &unprivileged()).is_success());
    let manifest = AddOnManifest::from_value(&doc).unwrap();
    assert_eq!(manifest.id(), Some("abc123"));
    assert_eq!(manifest.entry_points()[0].main, "index.html");
}

proptest! {
    #[test]
    fn prop_validation_is_idempotent_and_consistent(
        name in "[a-zA-Z0-9 #]{0,50}",
        version in "[0-9a-z.]{0,8}",
        manifest_version in 0u8..4,
        privileged_apis in any::<bool>(),
        privileged_caller in any::<bool>(),
    ) {
        let mut doc = v2_manifest();
        doc["name"] = json!(name);
        doc["version"] = json!(version);
        doc["manifestVersion"] = json!(manifest_version);
        doc["requirements"]["privilegedApis"] = json!(privileged_apis);
        let info = AdditionalInfo::new("prop").privileged(privileged_caller);

        let first = validate(&doc, &info);
        let second = validate(&doc, &info);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.is_success(), first.error_details().is_none());
    }
}
