//! Report rendering
//!
//! One line per error: the instance path when non-empty, then the message.

use crate::validation::{ErrorDetail, ValidationResult};

pub fn render_line(detail: &ErrorDetail) -> String {
    if detail.instance_path.is_empty() {
        detail.message.clone()
    } else {
        format!("{} {}", detail.instance_path, detail.message)
    }
}

/// Lines for a result. A failure without details gets a single
/// "nothing to validate" line so the user is never left with silence.
pub fn render_lines(result: &ValidationResult) -> Vec<String> {
    match result.error_details() {
        Some(errors) => errors.iter().map(render_line).collect(),
        None if result.is_success() => vec![],
        None => vec!["No manifest to validate".to_string()],
    }
}
