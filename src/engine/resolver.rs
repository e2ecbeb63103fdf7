use std::path::Path;

use tracing::{debug, warn};

use crate::browser::driver::PageDriver;
use crate::browser::error::BrowserError;
use crate::engine::error::FieldError;
use crate::engine::locator::{FieldLocator, LocatedElement};
use crate::form::model::{FieldKind, FieldValue};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

const RESUME_KEYWORDS: [&str; 5] = ["resume", "cv", "curriculum vitae", "cover letter", "attachment"];

/// Whether a label (or any text describing a file input) names a resume/CV upload.
pub fn is_resume_field(text: &str) -> bool {
    let lower = text.to_lowercase();
    RESUME_KEYWORDS.iter().any(|k| {
        if *k == "cv" {
            // "cv" only as a whole word, not inside e.g. "cvv"
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|w| w == "cv")
        } else {
            lower.contains(k)
        }
    })
}

/// What `apply` did to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The control was changed; carries the action description.
    Changed(String),
    /// The control already held the requested state.
    Unchanged,
}

// ============================================================================
// apply: set one located control to one value
// ============================================================================

/// Set a located control to `value`, dispatching on its kind.
///
/// The element must still belong to the current page, be visible and be
/// enabled; otherwise a non-fatal [`FieldError`] is returned.
pub fn apply<D: PageDriver + ?Sized>(
    page: &mut D,
    element: &LocatedElement,
    value: &FieldValue,
) -> Result<ApplyOutcome, FieldError> {
    let label = element.label.as_str();

    if !element.is_current(page) {
        return Err(FieldError::Stale { label: label.to_string() });
    }
    if !element.visible {
        return Err(FieldError::NotVisible { label: label.to_string() });
    }
    if !element.enabled {
        return Err(FieldError::Disabled { label: label.to_string() });
    }

    let handle = &element.handle;
    let text = value.to_string();
    let browser = |e: BrowserError| FieldError::from_browser(label, e);

    match element.kind {
        FieldKind::Select => match page.select_option(handle, &text) {
            Ok(()) => Ok(ApplyOutcome::Changed(format!("Selected '{}' in {}", text, label))),
            Err(BrowserError::ElementOperation { reason, .. }) => Err(FieldError::Selection {
                label: label.to_string(),
                value: text,
                reason,
            }),
            Err(e) => Err(browser(e)),
        },

        FieldKind::Checkbox => {
            let want = value.is_truthy();
            let checked = page.is_checked(handle).map_err(browser)?;
            if want == checked {
                return Ok(ApplyOutcome::Unchanged);
            }
            if want {
                page.check(handle).map_err(browser)?;
                Ok(ApplyOutcome::Changed(format!("Checked {}", label)))
            } else {
                page.uncheck(handle).map_err(browser)?;
                Ok(ApplyOutcome::Changed(format!("Unchecked {}", label)))
            }
        }

        FieldKind::Radio => {
            if !value.is_truthy() {
                return Ok(ApplyOutcome::Unchanged);
            }
            page.check(handle).map_err(browser)?;
            Ok(ApplyOutcome::Changed(format!("Selected radio {}", label)))
        }

        FieldKind::File => {
            page.set_file(handle, &text).map_err(browser)?;
            Ok(ApplyOutcome::Changed(format!("Attached file to {}", label)))
        }

        kind => {
            if kind == FieldKind::Number && text.trim().parse::<f64>().is_err() {
                return Err(FieldError::TypeMismatch {
                    label: label.to_string(),
                    kind,
                    value: text,
                });
            }
            page.fill(handle, "").map_err(browser)?;
            page.fill(handle, &text).map_err(browser)?;
            if kind == FieldKind::Password {
                Ok(ApplyOutcome::Changed(format!("Filled {}", label)))
            } else {
                Ok(ApplyOutcome::Changed(format!("Filled {} with '{}'", label, text)))
            }
        }
    }
}

// ============================================================================
// Per-field pipeline shared by single-page and wizard fills
// ============================================================================

/// Actions, errors and counts gathered while filling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTally {
    pub executed_actions: Vec<String>,
    pub errors: Vec<String>,
    pub skipped: Vec<String>,
    pub filled_count: usize,
}

impl FieldTally {
    fn action(&mut self, step: Option<usize>, action: String) {
        match step {
            Some(n) => self.executed_actions.push(format!("Step {}: {}", n, action)),
            None => self.executed_actions.push(action),
        }
    }

    fn error(&mut self, step: Option<usize>, error: String) {
        match step {
            Some(n) => self.errors.push(format!("{} (step {})", error, n)),
            None => self.errors.push(error),
        }
    }
}

/// Resume state for one fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeContext<'a> {
    /// Resume file that exists on disk, if one was supplied.
    pub path: Option<&'a Path>,
    /// Already attached to a file input during the upload-first pass.
    pub uploaded: bool,
}

/// Locate and apply one (label, value) pair, recording the outcome.
///
/// Blank values are skipped silently. Only a lost page handle is returned as
/// an error; everything else lands in the tally.
#[allow(clippy::too_many_arguments)]
pub fn fill_field<D: PageDriver + ?Sized>(
    page: &mut D,
    locator: &FieldLocator,
    tracer: &TraceLogger,
    resume: &ResumeContext<'_>,
    step: Option<usize>,
    label: &str,
    value: &FieldValue,
    tally: &mut FieldTally,
) -> Result<(), BrowserError> {
    if value.is_blank() {
        debug!(label, "skipping blank value");
        return Ok(());
    }

    let located = match locator.locate(page, label)? {
        Some(located) => located,
        None => {
            let err = FieldError::NotFound { label: label.to_string() };
            tracer.log(&TraceEvent::field(step, label, "not_found").with_detail(&err));
            tally.error(step, err.to_string());
            return Ok(());
        }
    };

    let outcome = if located.kind == FieldKind::File {
        apply_file(page, &located, value, resume, tally, step)
    } else {
        apply(page, &located, value).map(Some)
    };

    match outcome {
        Ok(Some(ApplyOutcome::Changed(action))) => {
            tracer.log(
                &TraceEvent::field(step, label, "filled")
                    .with_strategy(located.strategy.name())
                    .with_detail(&action),
            );
            tally.action(step, action);
            tally.filled_count += 1;
        }
        Ok(Some(ApplyOutcome::Unchanged)) => {
            debug!(label, "field already in requested state");
            tracer.log(&TraceEvent::field(step, label, "unchanged").with_strategy(located.strategy.name()));
        }
        Ok(None) => {}
        Err(err) => {
            if err.is_fatal() {
                if let FieldError::Browser { source, .. } = err {
                    return Err(source);
                }
                return Ok(());
            }
            warn!(label, error = %err, "could not fill field");
            tracer.log(
                &TraceEvent::field(step, label, "error")
                    .with_strategy(located.strategy.name())
                    .with_detail(&err),
            );
            tally.error(step, err.to_string());
        }
    }

    Ok(())
}

/// File inputs: resume fields take the out-of-band resume, a value naming an
/// existing file is attached, anything else needs a manual upload.
/// `Ok(None)` means the field was deliberately left alone.
fn apply_file<D: PageDriver + ?Sized>(
    page: &mut D,
    located: &LocatedElement,
    value: &FieldValue,
    resume: &ResumeContext<'_>,
    tally: &mut FieldTally,
    step: Option<usize>,
) -> Result<Option<ApplyOutcome>, FieldError> {
    let label = located.label.as_str();

    if is_resume_field(label) {
        if resume.uploaded {
            debug!(label, "resume already uploaded");
            return Ok(None);
        }
        if let Some(path) = resume.path {
            let resume_value = FieldValue::Text(path.display().to_string());
            return apply(page, located, &resume_value)
                .map(|_| Some(ApplyOutcome::Changed("Uploaded resume file".to_string())));
        }
    }

    if let FieldValue::Text(candidate) = value {
        if Path::new(candidate.trim()).is_file() {
            return apply(page, located, value).map(Some);
        }
    }

    let note = format!("File upload field '{}' requires manual upload", label);
    match step {
        Some(n) => tally.skipped.push(format!("Step {}: {}", n, note)),
        None => tally.skipped.push(note),
    }
    Ok(None)
}
