use tracing::debug;

use crate::browser::dom::DomElement;
use crate::browser::driver::PageDriver;
use crate::browser::error::BrowserError;
use crate::form::model::{FieldKind, FormField};

// ============================================================================
// Form structure from the live DOM
// ============================================================================

/// Label for a control: its associated label, else the text of a preceding
/// sibling, a title-cased name, placeholder, aria-label, then id. `None` when
/// the control carries no text at all.
pub fn field_label(el: &DomElement) -> Option<String> {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    non_empty(&el.label_text)
        .or_else(|| non_empty(&el.sibling_text))
        .or_else(|| non_empty(&el.name).map(|n| title_case_name(&n)))
        .or_else(|| non_empty(&el.placeholder))
        .or_else(|| non_empty(&el.aria_label))
        .or_else(|| non_empty(&el.id))
}

/// `first_name` / `first-name` -> `First Name`.
fn title_case_name(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Convert one extracted control into a field descriptor.
pub fn to_form_field(el: &DomElement) -> Option<FormField> {
    if !el.is_data_control() {
        return None;
    }
    let label = field_label(el)?;
    let kind = FieldKind::classify(
        &el.tag,
        el.r#type.as_deref(),
        el.name.as_deref().unwrap_or(""),
        &label,
    );

    let options = if kind == FieldKind::Select {
        el.options
            .iter()
            .filter(|o| o.value.as_deref().is_some_and(|v| !v.is_empty()))
            .map(|o| o.text.trim().to_string())
            .collect()
    } else {
        Vec::new()
    };

    Some(FormField {
        label,
        kind,
        required: el.required,
        options,
    })
}

/// All fields of the extracted DOM, in document order. Radio groups collapse
/// to one field per label.
pub fn form_fields_from_dom(elements: &[DomElement]) -> Vec<FormField> {
    let mut fields: Vec<FormField> = Vec::new();

    for el in elements {
        let Some(field) = to_form_field(el) else {
            continue;
        };
        if field.kind == FieldKind::Radio && fields.iter().any(|f| f.label == field.label) {
            continue;
        }
        fields.push(field);
    }

    fields
}

/// Form structure of the page currently loaded in `page`.
pub fn extract_form_fields<D: PageDriver + ?Sized>(page: &mut D) -> Result<Vec<FormField>, BrowserError> {
    let elements = page.extract_dom()?;
    let fields = form_fields_from_dom(&elements);
    debug!(controls = elements.len(), fields = fields.len(), "extracted form structure");
    Ok(fields)
}
