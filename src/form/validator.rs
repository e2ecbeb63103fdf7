use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::form::model::{FieldKind, FieldValue, FillRequest, FormField};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://.+").expect("url pattern is valid"));

const MIN_PHONE_DIGITS: usize = 10;

/// Outcome of validating a matched request against a field schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

pub fn validate_email(value: &str) -> Result<(), String> {
    if EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err("invalid email format".into())
    }
}

/// Separators (spaces, dashes, dots, parentheses and a leading `+`) are
/// ignored; what remains must be at least ten digits.
pub fn validate_phone(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '-' | '.' | '(' | ')'))
        .collect();

    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) && digits.len() >= MIN_PHONE_DIGITS {
        Ok(())
    } else {
        Err("invalid phone number format".into())
    }
}

pub fn validate_url(value: &str) -> Result<(), String> {
    if URL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err("invalid URL format".into())
    }
}

fn is_missing(value: Option<&FieldValue>) -> bool {
    match value {
        None => true,
        Some(v) => v.is_blank(),
    }
}

/// Validate one value against its declared field. Missing optional values pass.
pub fn validate_field(field: &FormField, value: Option<&FieldValue>) -> Result<(), String> {
    if is_missing(value) {
        return if field.required {
            Err(format!("{} is required", field.label))
        } else {
            Ok(())
        };
    }

    let Some(value) = value else {
        return Ok(());
    };
    let text = value.to_string();

    let check = match field.kind {
        FieldKind::Email => validate_email(&text),
        FieldKind::Tel => validate_phone(&text),
        FieldKind::Url => validate_url(&text),
        FieldKind::Number => text
            .trim()
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| "must be a number".to_string()),
        _ => Ok(()),
    };

    check.map_err(|reason| format!("{}: {}", field.label, reason))
}

/// Validate every declared field, then flag request keys the schema does not
/// declare. Valid iff no errors were produced.
pub fn validate(request: &FillRequest, schema: &[FormField]) -> ValidationReport {
    let mut errors = Vec::new();

    for field in schema {
        if let Err(e) = validate_field(field, request.get(&field.label)) {
            errors.push(e);
        }
    }

    for key in request.keys() {
        if !schema.iter().any(|f| f.label == key) {
            errors.push(format!("Unknown field: {}", key));
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}
