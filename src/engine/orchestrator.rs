use std::path::Path;

use tracing::{debug, info, warn};

use crate::browser::driver::{PageDriver, ScrollTarget};
use crate::browser::error::BrowserError;
use crate::browser::playwright::{ElementHandle, ElementQuery};
use crate::engine::config::EngineConfig;
use crate::engine::locator::{FieldLocator, best_effort};
use crate::engine::navigator::{StepNavigator, first_visible, release_handles};
use crate::engine::resolver::{FieldTally, ResumeContext, fill_field, is_resume_field};
use crate::form::model::{FillRequest, FillResult, FormField, StepPlan};
use crate::form::structure::extract_form_fields;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Page text that indicates a form was accepted.
pub const SUCCESS_INDICATORS: [&str; 6] = ["thank you", "success", "submitted", "received", "confirmation", "complete"];

/// Attributes whose text can identify a file input as a resume upload.
const FILE_INPUT_HINTS: [&str; 4] = ["name", "placeholder", "aria-label", "id"];

/// Drives a whole fill over one page: settle, upload, fill, scroll to submit.
///
/// Owns no page; every operation borrows the caller's handle for its duration.
pub struct FillOrchestrator {
    config: EngineConfig,
    locator: FieldLocator,
    navigator: StepNavigator,
    tracer: TraceLogger,
}

impl FillOrchestrator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            locator: FieldLocator::new(&config),
            navigator: StepNavigator::new(&config),
            config,
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn navigator(&self) -> &StepNavigator {
        &self.navigator
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Navigate to `url`, then [`fill`](Self::fill). A failed navigation is
    /// fatal.
    pub fn fill_url<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        url: &str,
        request: &FillRequest,
        resume: Option<&Path>,
    ) -> FillResult {
        info!(url, "navigating to form");
        if let Err(e) = page.navigate(url, self.config.navigation_timeout_ms) {
            self.tracer.log(&TraceEvent::now("navigation_failed").with_detail(&e));
            return FillResult::fatal(
                format!("Navigation failed: {}", e),
                total_fields(request, resume),
                Vec::new(),
                Vec::new(),
            );
        }
        self.fill(page, request, resume)
    }

    /// Best-effort fill of the current page. Never submits.
    ///
    /// Only a lost page handle aborts; every per-field failure is recorded
    /// and the remaining fields are still attempted.
    pub fn fill<D: PageDriver + ?Sized>(&self, page: &mut D, request: &FillRequest, resume: Option<&Path>) -> FillResult {
        let total = total_fields(request, resume);
        let mut tally = FieldTally::default();

        if let Err(e) = self.settle(page) {
            return FillResult::fatal(format!("Page did not settle: {}", e), total, Vec::new(), Vec::new());
        }

        let mut resume_ctx = ResumeContext::default();
        if let Some(path) = resume {
            if path.is_file() {
                resume_ctx.path = Some(path);
                match self.upload_resume(page, path) {
                    Ok(Some(action)) => {
                        self.tracer.log(&TraceEvent::now("resume_uploaded").with_detail(path.display()));
                        tally.executed_actions.push(action);
                        tally.filled_count += 1;
                        resume_ctx.uploaded = true;
                    }
                    Ok(None) => {
                        debug!("no file input accepted the resume");
                        tally.errors.push("No file upload field found for resume".to_string());
                    }
                    Err(e) if e.is_session_lost() => {
                        return self.aborted(e, total, tally);
                    }
                    Err(e) => {
                        warn!(error = %e, "resume upload failed");
                        tally.errors.push(format!("Error uploading resume: {}", e));
                    }
                }
            } else {
                tally.errors.push(format!("Resume file not found: {}", path.display()));
            }
        }

        for (label, value) in request.iter() {
            if let Err(e) = fill_field(page, &self.locator, &self.tracer, &resume_ctx, None, label, value, &mut tally) {
                return self.aborted(e, total, tally);
            }
        }

        if let Err(e) = self.scroll_to_submit(page) {
            return self.aborted(e, total, tally);
        }

        let message = if tally.filled_count > 0 {
            format!("Filled {} out of {} fields successfully", tally.filled_count, total)
        } else {
            "No fields could be filled".to_string()
        };
        info!(filled = tally.filled_count, total, errors = tally.errors.len(), "fill finished");

        FillResult {
            success: tally.filled_count > 0 || total == 0,
            filled_count: tally.filled_count,
            total_fields: total,
            executed_actions: tally.executed_actions,
            errors: tally.errors,
            skipped: tally.skipped,
            steps_completed: None,
            message,
            error: None,
        }
    }

    /// Settle the page, then fill a wizard step by step.
    pub fn fill_multi_step<D: PageDriver + ?Sized>(&self, page: &mut D, plan: &StepPlan) -> FillResult {
        if let Err(e) = self.settle(page) {
            let mut result = FillResult::fatal(
                format!("Page did not settle: {}", e),
                plan.total_fields(),
                Vec::new(),
                Vec::new(),
            );
            result.steps_completed = Some(0);
            return result;
        }
        self.navigator.fill_multi_step(page, plan, &self.tracer)
    }

    fn aborted(&self, error: BrowserError, total: usize, tally: FieldTally) -> FillResult {
        warn!(error = %error, "fill aborted");
        self.tracer.log(&TraceEvent::now("fill_aborted").with_detail(&error));
        let mut result = FillResult::fatal(error.to_string(), total, tally.executed_actions, tally.errors);
        result.filled_count = tally.filled_count;
        result.skipped = tally.skipped;
        result
    }

    // ========================================================================
    // Settling
    // ========================================================================

    /// Wait for the page to go quiet, scroll through it so lazy content
    /// loads, return to the top and dismiss overlays.
    ///
    /// A network-idle timeout is tolerated. Any other failure here means the
    /// page is unusable.
    pub fn settle<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<(), BrowserError> {
        match page.wait_for_network_idle(self.config.network_idle_timeout_ms) {
            Ok(()) => {}
            Err(e) if e.is_timeout() => warn!(error = %e, "network did not go idle, continuing"),
            Err(e) => return Err(e),
        }
        page.pause(self.config.settle_ms)?;

        self.scroll_through(page)?;
        page.scroll_to(&ScrollTarget::Top)?;
        page.pause(self.config.scroll_pause_ms)?;

        self.dismiss_overlays(page)
    }

    /// Settle the page, then read its form structure so late-rendered
    /// sections are included.
    pub fn read_form<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<Vec<FormField>, BrowserError> {
        self.settle(page)?;
        extract_form_fields(page)
    }

    /// Scroll down in viewport-sized increments until the bottom stops
    /// moving, so lazily rendered sections exist before locating fields.
    fn scroll_through<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<(), BrowserError> {
        let mut metrics = page.scroll_metrics()?;
        let increment = ((metrics.viewport_height as f64) * self.config.scroll_step_ratio).max(1.0) as u64;
        let mut offset = 0u64;

        for _ in 0..self.config.max_scroll_iterations {
            if offset >= metrics.page_height {
                break;
            }
            offset = offset.saturating_add(increment);
            page.scroll_to(&ScrollTarget::Offset(offset))?;
            page.pause(self.config.scroll_pause_ms)?;

            let next = page.scroll_metrics()?;
            if next.page_height > metrics.page_height {
                debug!(from = metrics.page_height, to = next.page_height, "page grew while scrolling");
            }
            metrics = next;
        }

        page.scroll_to(&ScrollTarget::Bottom)?;
        page.pause(self.config.scroll_pause_ms)
    }

    fn dismiss_overlays<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<(), BrowserError> {
        let controls = match page.query_all(&ElementQuery::CloseControls) {
            Ok(controls) => controls,
            Err(e) if e.is_session_lost() => return Err(e),
            Err(e) => {
                debug!(error = %e, "overlay query failed");
                return Ok(());
            }
        };

        for control in &controls {
            if !matches!(page.is_visible(control), Ok(true)) {
                continue;
            }
            best_effort(page.click(control), "dismiss overlay")?;
            best_effort(page.pause(self.config.field_settle_ms), "overlay settle")?;
        }
        release_handles(page, &controls)
    }

    // ========================================================================
    // Resume and submit
    // ========================================================================

    /// Attach the resume to the file input that looks like a resume field,
    /// or the first file input on the page. `Ok(None)` when the page has no
    /// file input.
    pub fn upload_resume<D: PageDriver + ?Sized>(&self, page: &mut D, path: &Path) -> Result<Option<String>, BrowserError> {
        let inputs = page.query_all(&ElementQuery::FileInputs)?;
        let Some(first) = inputs.first().cloned() else {
            return Ok(None);
        };

        let mut target = None;
        for input in &inputs {
            let text = describe_file_input(page, input)?;
            if is_resume_field(&text) {
                debug!(hint = %text, "resume input found");
                target = Some(input.clone());
                break;
            }
        }
        let target = target.unwrap_or(first);

        page.set_file(&target, &path.display().to_string())?;
        best_effort(page.pause(self.config.field_settle_ms), "upload settle")?;
        release_handles(page, &inputs)?;
        Ok(Some("Uploaded resume file".to_string()))
    }

    /// Bring the submit control into view without clicking it. Returns
    /// whether one was found.
    pub fn scroll_to_submit<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<bool, BrowserError> {
        match first_visible(page, &[ElementQuery::SubmitControl])? {
            Some(submit) => {
                best_effort(page.scroll_to(&ScrollTarget::Element(submit)), "scroll to submit")?;
                Ok(true)
            }
            None => {
                debug!("no submit control found");
                Ok(false)
            }
        }
    }
}

/// Requested pairs, plus one for the resume when a path is given.
fn total_fields(request: &FillRequest, resume: Option<&Path>) -> usize {
    request.len() + usize::from(resume.is_some())
}

/// Label text, name, placeholder, aria-label and id of a file input, joined.
fn describe_file_input<D: PageDriver + ?Sized>(page: &mut D, input: &ElementHandle) -> Result<String, BrowserError> {
    let mut parts = Vec::new();

    if let Some(id) = page.get_attribute(input, "id")?.filter(|id| !id.is_empty()) {
        if let Some(label) = page.query(&ElementQuery::LabelFor { id })? {
            parts.push(page.inner_text(&label)?);
        }
    }
    for attribute in FILE_INPUT_HINTS {
        if let Some(value) = page.get_attribute(input, attribute)? {
            parts.push(value);
        }
    }

    Ok(parts.join(" "))
}

/// Click the first visible submit control. Callers decide when to submit;
/// the orchestrator never does.
pub fn submit_form<D: PageDriver + ?Sized>(page: &mut D) -> Result<bool, BrowserError> {
    let Some(submit) = first_visible(page, &[ElementQuery::SubmitControl])? else {
        return Ok(false);
    };
    page.click(&submit)?;
    Ok(true)
}

/// Whether the page text reads like a submission confirmation.
pub fn detect_submission_success<D: PageDriver + ?Sized>(page: &mut D) -> Result<bool, BrowserError> {
    let text = page.page_text()?.to_lowercase();
    Ok(SUCCESS_INDICATORS.iter().any(|word| text.contains(word)))
}
