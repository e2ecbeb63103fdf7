use crate::engine::preflight::FillPreview;
use crate::form::model::{FillResult, FormField};

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a fill result for terminal output.
///
/// Produces output like:
/// ```text
/// === Fill: OK ===
/// Filled 2 out of 3 fields successfully
///
///   + Filled Email with 'jo@example.com'
///   + Selected 'Canada' in Country
///   ! Field not found: Fax
///
/// === 2/3 fields filled, 1 error ===
/// ```
pub fn format_fill_result(result: &FillResult) -> String {
    let mut out = String::new();

    let status = if result.success { "OK" } else { "FAILED" };
    out.push_str(&format!("=== Fill: {} ===\n", status));
    out.push_str(&format!("{}\n", result.message));

    if let Some(ref error) = result.error {
        out.push_str(&format!("[ERROR] {}\n", error));
    }

    if !result.executed_actions.is_empty() || !result.errors.is_empty() || !result.skipped.is_empty() {
        out.push('\n');
    }
    for action in &result.executed_actions {
        out.push_str(&format!("  + {}\n", action));
    }
    for skipped in &result.skipped {
        out.push_str(&format!("  - {}\n", skipped));
    }
    for error in &result.errors {
        out.push_str(&format!("  ! {}\n", error));
    }

    out.push_str(&format!(
        "\n=== {}/{} fields filled, {} ===\n",
        result.filled_count,
        result.total_fields,
        plural(result.errors.len(), "error")
    ));

    if let Some(steps) = result.steps_completed {
        out.push_str(&format!("Steps completed: {}\n", steps));
    }

    out
}

/// Format a dry-run preview: planned actions, validation and warnings.
pub fn format_preview(preview: &FillPreview) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Preview: {} of {} fields would be filled ===\n\n",
        preview.fields_to_fill, preview.total_fields
    ));

    for action in &preview.actions {
        let required = if action.required { " *" } else { "" };
        out.push_str(&format!(
            "  {:<7} {}{} ({}) = '{}'\n",
            action.action, action.field, required, action.kind, action.value
        ));
    }

    if !preview.validation.is_valid {
        out.push_str("\nValidation errors:\n");
        for error in &preview.validation.errors {
            out.push_str(&format!("  ! {}\n", error));
        }
    }

    if !preview.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &preview.warnings {
            out.push_str(&format!("  ? {}\n", warning));
        }
    }

    out
}

/// One line per detected form field.
pub fn format_fields(fields: &[FormField]) -> String {
    let mut out = format!("=== {} ===\n", plural(fields.len(), "field"));

    for field in fields {
        let required = if field.required { " (required)" } else { "" };
        out.push_str(&format!("  {} [{}]{}\n", field.label, field.kind, required));
        if !field.options.is_empty() {
            out.push_str(&format!("      options: {}\n", field.options.join(", ")));
        }
    }

    out
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
