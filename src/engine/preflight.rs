use serde::Serialize;
use tracing::{debug, info};

use crate::browser::driver::PageDriver;
use crate::browser::error::BrowserError;
use crate::engine::config::EngineConfig;
use crate::form::matcher::match_request_detailed;
use crate::form::model::{FieldKind, FieldValue, FillRequest, FormField};
use crate::form::structure::extract_form_fields;
use crate::form::validator::{ValidationReport, validate};

/// What a fill would do to one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedAction {
    /// `fill`, `select`, `check` or `upload`.
    pub action: String,
    pub field: String,
    pub kind: FieldKind,
    /// Password values are masked.
    pub value: String,
    pub required: bool,
}

/// Everything known about a fill before touching the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillPreview {
    pub total_fields: usize,
    pub fields_to_fill: usize,
    pub actions: Vec<PlannedAction>,
    /// The request re-keyed to the form's labels.
    pub matched: FillRequest,
    pub validation: ValidationReport,
    pub warnings: Vec<String>,
}

fn action_for(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Select => "select",
        FieldKind::Checkbox | FieldKind::Radio => "check",
        FieldKind::File => "upload",
        _ => "fill",
    }
}

fn display_value(kind: FieldKind, value: &FieldValue) -> String {
    if kind == FieldKind::Password {
        "*".repeat(value.to_string().chars().count().max(1))
    } else {
        value.to_string()
    }
}

/// Match and validate `request` against `fields` and list the actions a fill
/// would take.
pub fn preview(request: &FillRequest, fields: &[FormField], threshold: f64) -> FillPreview {
    let outcome = match_request_detailed(request, fields, threshold);
    let validation = validate(&outcome.request, fields);
    let mut warnings = Vec::new();

    let mut actions = Vec::new();
    for field in fields {
        match outcome.request.get(&field.label) {
            Some(value) if !value.is_blank() => actions.push(PlannedAction {
                action: action_for(field.kind).to_string(),
                field: field.label.clone(),
                kind: field.kind,
                value: display_value(field.kind, value),
                required: field.required,
            }),
            _ if field.required => warnings.push(format!("Required field '{}' has no value", field.label)),
            _ => {}
        }
    }

    for key in &outcome.unmatched {
        warnings.push(format!("No form field matches '{}'", key));
    }
    for collision in &outcome.collisions {
        warnings.push(format!(
            "'{}' and '{}' both match '{}'; using the value of '{}'",
            collision.overwritten_key, collision.winning_key, collision.field_label, collision.winning_key
        ));
    }

    debug!(actions = actions.len(), warnings = warnings.len(), "built fill preview");

    FillPreview {
        total_fields: fields.len(),
        fields_to_fill: actions.len(),
        actions,
        matched: outcome.request,
        validation,
        warnings,
    }
}

/// Load `url`, read its form structure and preview the fill. Nothing is
/// filled.
pub fn dry_run<D: PageDriver + ?Sized>(
    page: &mut D,
    url: &str,
    request: &FillRequest,
    config: &EngineConfig,
) -> Result<FillPreview, BrowserError> {
    info!(url, "dry run");
    page.navigate(url, config.navigation_timeout_ms)?;
    match page.wait_for_network_idle(config.network_idle_timeout_ms) {
        Ok(()) => {}
        Err(e) if e.is_timeout() => debug!(error = %e, "network did not go idle before extraction"),
        Err(e) => return Err(e),
    }

    let fields = extract_form_fields(page)?;
    Ok(preview(request, &fields, config.match_threshold))
}

/// Match `request` to `fields` and validate the result.
///
/// Returns the matched request, or the validation report when it is invalid
/// and `skip_validation` is not set.
pub fn prepare_request(
    request: &FillRequest,
    fields: &[FormField],
    threshold: f64,
    skip_validation: bool,
) -> Result<FillRequest, ValidationReport> {
    let outcome = match_request_detailed(request, fields, threshold);
    if skip_validation {
        return Ok(outcome.request);
    }

    let report = validate(&outcome.request, fields);
    if report.is_valid {
        Ok(outcome.request)
    } else {
        Err(report)
    }
}
