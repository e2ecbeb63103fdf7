use thiserror::Error;

use crate::browser::error::BrowserError;
use crate::form::model::FieldKind;

/// Non-fatal failure to fill one field. The `Display` text is what gets
/// reported in `FillResult::errors`.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Field not found: {label}")]
    NotFound { label: String },

    #[error("Field '{label}' is not visible")]
    NotVisible { label: String },

    #[error("Field '{label}' is disabled")]
    Disabled { label: String },

    #[error("Could not select '{value}' in {label}: {reason}")]
    Selection {
        label: String,
        value: String,
        reason: String,
    },

    #[error("Value '{value}' does not fit {kind} field '{label}'")]
    TypeMismatch {
        label: String,
        kind: FieldKind,
        value: String,
    },

    /// The element was located before the page navigated.
    #[error("Field '{label}' went stale after the page navigated")]
    Stale { label: String },

    #[error("Error filling {label}: {source}")]
    Browser {
        label: String,
        #[source]
        source: BrowserError,
    },
}

impl FieldError {
    pub fn label(&self) -> &str {
        match self {
            FieldError::NotFound { label }
            | FieldError::NotVisible { label }
            | FieldError::Disabled { label }
            | FieldError::Selection { label, .. }
            | FieldError::TypeMismatch { label, .. }
            | FieldError::Stale { label }
            | FieldError::Browser { label, .. } => label,
        }
    }

    /// Wrap a driver error raised while operating on `label`.
    pub fn from_browser(label: &str, error: BrowserError) -> FieldError {
        match error {
            BrowserError::StaleElement { .. } => FieldError::Stale { label: label.to_string() },
            other => FieldError::Browser {
                label: label.to_string(),
                source: other,
            },
        }
    }

    /// The page handle itself is gone; the whole fill has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FieldError::Browser { source, .. } if source.is_session_lost())
    }
}

/// Failure to move a wizard to its next (or previous) step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Next button not found")]
    NextNotFound,

    #[error("Back button not found")]
    BackNotFound,

    /// The page fingerprint was identical before and after the click.
    #[error("page did not change after clicking next")]
    NoProgress,

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl StepError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepError::Browser(e) if e.is_session_lost())
    }
}
