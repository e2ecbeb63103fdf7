//! Fill web forms from a label -> value mapping.
//!
//! Labels are fuzzy-matched to the form's own field labels, each field is
//! located on the live page through a chain of fallback strategies, and the
//! value is applied according to the control's kind. Multi-step wizards are
//! filled step by step. Every fill is best-effort: per-field failures are
//! collected in the [`FillResult`] and never abort the run.

pub mod browser;
pub mod cli;
pub mod engine;
pub mod form;
pub mod report;
pub mod trace;

pub use browser::driver::PageDriver;
pub use browser::error::BrowserError;
pub use browser::session::{BrowserSession, SessionOptions};
pub use engine::config::EngineConfig;
pub use engine::navigator::{StepNavigator, WizardState};
pub use engine::orchestrator::{FillOrchestrator, detect_submission_success, submit_form};
pub use engine::preflight::{FillPreview, dry_run, prepare_request, preview};
pub use form::matcher::{best_match, match_request, similarity};
pub use form::model::{FieldKind, FieldValue, FillRequest, FillResult, FormField, StepPlan};
pub use form::normalize::normalize_label;
pub use form::structure::extract_form_fields;
pub use form::validator::{ValidationReport, validate};
