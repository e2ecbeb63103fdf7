use tracing::{debug, info, warn};

use crate::browser::driver::{PageDriver, ScrollTarget};
use crate::browser::error::BrowserError;
use crate::browser::playwright::{ElementHandle, ElementQuery};
use crate::engine::config::EngineConfig;
use crate::engine::error::StepError;
use crate::engine::locator::{FieldLocator, best_effort};
use crate::engine::resolver::{FieldTally, ResumeContext, fill_field};
use crate::form::model::{FillRequest, FillResult, StepPlan};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Class/id/data-attribute words that mark a wizard step indicator.
pub const STEP_INDICATORS: [&str; 7] = ["step", "page", "stage", "part", "section", "progress", "wizard"];

/// Visible text of controls that advance a wizard.
pub const NEXT_WORDS: [&str; 3] = ["next", "continue", "proceed"];

pub const BACK_WORDS: [&str; 2] = ["back", "previous"];

/// Where the navigator is in a (possibly) multi-step form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Unknown,
    SingleStep,
    WizardStep(usize),
    Done,
    Failed(String),
}

/// Result of a successful step change.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAdvance {
    /// Fingerprint of the page after the change.
    pub fingerprint: Option<String>,
    /// Step number the page itself reports, when it exposes one.
    pub current_step: Option<u32>,
}

/// SHA-1 of the page URL and visible text; equal fingerprints mean the page
/// did not change.
pub fn page_fingerprint<D: PageDriver + ?Sized>(page: &mut D) -> Result<String, BrowserError> {
    use sha1::{Digest, Sha1};

    let url = page.current_url()?;
    let text = page.page_text()?;

    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(text.split_whitespace().collect::<Vec<_>>().join(" ").as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn next_control_queries() -> Vec<ElementQuery> {
    let mut queries: Vec<ElementQuery> = NEXT_WORDS
        .iter()
        .map(|w| ElementQuery::ClickableText { text: w.to_string() })
        .collect();
    queries.push(ElementQuery::SubmitControl);
    queries.push(ElementQuery::AttributeContains {
        attribute: "class".into(),
        needle: "next-button".into(),
    });
    queries.push(ElementQuery::AttributeContains {
        attribute: "id".into(),
        needle: "next".into(),
    });
    queries.push(ElementQuery::AttributeEquals {
        attribute: "data-action".into(),
        value: "next".into(),
    });
    queries
}

fn back_control_queries() -> Vec<ElementQuery> {
    let mut queries: Vec<ElementQuery> = BACK_WORDS
        .iter()
        .map(|w| ElementQuery::ClickableText { text: w.to_string() })
        .collect();
    queries.push(ElementQuery::AttributeContains {
        attribute: "class".into(),
        needle: "back-button".into(),
    });
    queries.push(ElementQuery::AttributeContains {
        attribute: "id".into(),
        needle: "back".into(),
    });
    queries.push(ElementQuery::AttributeEquals {
        attribute: "data-action".into(),
        value: "back".into(),
    });
    queries
}

/// Step number carried by one indicator element: its `data-step`, or a
/// `step-N` class on an active element.
fn step_number<D: PageDriver + ?Sized>(page: &mut D, handle: &ElementHandle) -> Option<u32> {
    if let Ok(Some(value)) = page.get_attribute(handle, "data-step") {
        if let Ok(n) = value.trim().parse::<u32>() {
            return Some(n);
        }
    }

    let Ok(Some(class)) = page.get_attribute(handle, "class") else {
        return None;
    };
    if !class.to_lowercase().contains("active") {
        return None;
    }
    class
        .split_whitespace()
        .filter(|part| part.to_lowercase().contains("step"))
        .find_map(|part| part.chars().filter(char::is_ascii_digit).collect::<String>().parse::<u32>().ok())
}

/// First visible element matched by the queries, tried in order.
pub(crate) fn first_visible<D: PageDriver + ?Sized>(
    page: &mut D,
    queries: &[ElementQuery],
) -> Result<Option<ElementHandle>, BrowserError> {
    for query in queries {
        let handles = match page.query_all(query) {
            Ok(handles) => handles,
            Err(e) if e.is_session_lost() => return Err(e),
            Err(e) => {
                debug!(selector = %query.selector(), error = %e, "control query failed");
                continue;
            }
        };
        let mut chosen = None;
        for handle in &handles {
            match page.is_visible(handle) {
                Ok(true) => {
                    chosen = Some(handle.clone());
                    break;
                }
                Ok(false) => {}
                Err(e) if e.is_session_lost() => return Err(e),
                Err(_) => {}
            }
        }
        let unused: Vec<ElementHandle> = handles.into_iter().filter(|h| chosen.as_ref() != Some(h)).collect();
        release_handles(page, &unused)?;
        if chosen.is_some() {
            return Ok(chosen);
        }
    }
    Ok(None)
}

/// Release handles the caller is done with. Only a lost session is an error.
pub(crate) fn release_handles<D: PageDriver + ?Sized>(page: &mut D, handles: &[ElementHandle]) -> Result<(), BrowserError> {
    if handles.is_empty() {
        return Ok(());
    }
    match page.release(handles) {
        Err(e) if e.is_session_lost() => Err(e),
        Err(e) => {
            debug!(error = %e, "handle release failed");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

/// Detects wizard steps and drives fill + advance cycles across them.
#[derive(Debug, Clone)]
pub struct StepNavigator {
    config: EngineConfig,
    locator: FieldLocator,
}

impl StepNavigator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
            locator: FieldLocator::new(config),
        }
    }

    // ========================================================================
    // Detection
    // ========================================================================

    /// Classify the current page. Probe failures count as a single-step form.
    pub fn detect<D: PageDriver + ?Sized>(&self, page: &mut D) -> WizardState {
        match self.probe_wizard(page) {
            Ok(true) => WizardState::WizardStep(1),
            Ok(false) => WizardState::SingleStep,
            Err(e) => {
                debug!(error = %e, "wizard probe failed, assuming single step");
                WizardState::SingleStep
            }
        }
    }

    fn probe_wizard<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<bool, BrowserError> {
        for word in STEP_INDICATORS {
            for attribute in ["class", "id"] {
                let query = ElementQuery::AttributeContains {
                    attribute: attribute.into(),
                    needle: word.into(),
                };
                if page.count(&query)? > 0 {
                    debug!(attribute, word, "step indicator found");
                    return Ok(true);
                }
            }
            let data_query = ElementQuery::HasAttribute {
                attribute: format!("data-{}", word),
            };
            if page.count(&data_query)? > 0 {
                debug!(word, "step data attribute found");
                return Ok(true);
            }
        }

        let next_text: Vec<ElementQuery> = NEXT_WORDS
            .iter()
            .map(|w| ElementQuery::ClickableText { text: w.to_string() })
            .collect();
        Ok(first_visible(page, &next_text)?.is_some())
    }

    /// Step number the page reports: a `data-step` value, or the digits of a
    /// `step-N` class on an active element.
    pub fn current_step<D: PageDriver + ?Sized>(&self, page: &mut D) -> Option<u32> {
        let queries = [
            ElementQuery::HasAttribute {
                attribute: "data-step".into(),
            },
            ElementQuery::AttributeContains {
                attribute: "class".into(),
                needle: "step-".into(),
            },
            ElementQuery::AttributeContains {
                attribute: "id".into(),
                needle: "step".into(),
            },
        ];

        for query in &queries {
            let Ok(handles) = page.query_all(query) else {
                continue;
            };
            let step = handles.iter().find_map(|handle| step_number(page, handle));
            if release_handles(page, &handles).is_err() {
                return step;
            }
            if step.is_some() {
                return step;
            }
        }

        None
    }

    // ========================================================================
    // Step controls
    // ========================================================================

    /// Next/continue control: visible text first, then an enabled submit
    /// control, then class/id/data-action heuristics.
    pub fn find_next_control<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<Option<ElementHandle>, BrowserError> {
        first_visible(page, &next_control_queries())
    }

    pub fn find_back_control<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<Option<ElementHandle>, BrowserError> {
        first_visible(page, &back_control_queries())
    }

    /// Click the next control and wait for the page to settle. Fails with
    /// [`StepError::NoProgress`] when the page fingerprint did not change.
    pub fn advance<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        previous_fingerprint: Option<&str>,
    ) -> Result<StepAdvance, StepError> {
        let next = self.find_next_control(page)?.ok_or(StepError::NextNotFound)?;
        self.click_and_settle(page, &next, previous_fingerprint)
    }

    /// Click the back control and wait for the page to settle.
    pub fn go_back<D: PageDriver + ?Sized>(&self, page: &mut D) -> Result<StepAdvance, StepError> {
        let back = self.find_back_control(page)?.ok_or(StepError::BackNotFound)?;
        self.click_and_settle(page, &back, None)
    }

    fn click_and_settle<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        control: &ElementHandle,
        previous_fingerprint: Option<&str>,
    ) -> Result<StepAdvance, StepError> {
        best_effort(page.scroll_to(&ScrollTarget::Element(control.clone())), "scroll to step control")?;
        best_effort(page.pause(self.config.field_settle_ms), "step control settle")?;

        page.click(control)?;

        match page.wait_for_network_idle(self.config.step_idle_timeout_ms) {
            Ok(()) => {}
            Err(e) if e.is_timeout() => warn!(error = %e, "page did not reach network idle after step change"),
            Err(e) => return Err(e.into()),
        }
        best_effort(page.pause(self.config.step_settle_ms), "step settle")?;

        let fingerprint = match page_fingerprint(page) {
            Ok(fp) => Some(fp),
            Err(e) if e.is_session_lost() => return Err(e.into()),
            Err(_) => None,
        };
        if let (Some(before), Some(after)) = (previous_fingerprint, fingerprint.as_deref()) {
            if before == after {
                return Err(StepError::NoProgress);
            }
        }

        Ok(StepAdvance {
            fingerprint,
            current_step: self.current_step(page),
        })
    }

    // ========================================================================
    // Multi-step fill
    // ========================================================================

    /// Fill a wizard step by step. See [`StepNavigator::run`].
    pub fn fill_multi_step<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        plan: &StepPlan,
        tracer: &TraceLogger,
    ) -> FillResult {
        self.run(page, plan, tracer).0
    }

    /// Fill each planned step, advancing between steps, and report the final
    /// state alongside the result.
    ///
    /// A page that is not a wizard gets every step's fields in one pass.
    /// `steps_completed` counts steps whose fields were attempted and which
    /// were either the last step or advanced successfully.
    pub fn run<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        plan: &StepPlan,
        tracer: &TraceLogger,
    ) -> (FillResult, WizardState) {
        let mut tally = FieldTally::default();
        let resume = ResumeContext::default();

        if self.detect(page) == WizardState::SingleStep {
            info!(steps = plan.len(), "page is not a multi-step form, filling in one pass");
            let merged = plan.flatten();
            if let Err(e) = self.fill_step(page, None, &merged, &resume, tracer, &mut tally) {
                return (self.aborted(e, merged.len(), tally, 0), WizardState::Failed("page handle lost".into()));
            }
            return (finish(tally, merged.len(), 1, &WizardState::Done), WizardState::Done);
        }

        let total_fields = plan.total_fields();
        if plan.is_empty() {
            return (finish(tally, 0, 0, &WizardState::Done), WizardState::Done);
        }
        let mut state = WizardState::WizardStep(1);
        let mut completed = 0;
        let mut fingerprint = page_fingerprint(page).ok();

        for (index, step) in plan.steps.iter().enumerate() {
            let number = index + 1;
            if number > self.config.max_steps {
                tally.errors.push(format!("Maximum steps ({}) reached", self.config.max_steps));
                state = WizardState::Failed("maximum steps reached".into());
                break;
            }

            debug!(step = number, id = %step.id, fields = step.request.len(), "filling wizard step");
            if let Err(e) = self.fill_step(page, Some(number), &step.request, &resume, tracer, &mut tally) {
                return (
                    self.aborted(e, total_fields, tally, completed),
                    WizardState::Failed("page handle lost".into()),
                );
            }

            if number == plan.steps.len() {
                completed += 1;
                state = WizardState::Done;
                break;
            }

            match self.advance(page, fingerprint.as_deref()) {
                Ok(advance) => {
                    completed += 1;
                    fingerprint = advance.fingerprint;
                    state = WizardState::WizardStep(number + 1);
                    tracer.log(
                        &TraceEvent::now("step_advanced")
                            .with_step(number)
                            .with_detail(format!("page reports step {:?}", advance.current_step)),
                    );
                    info!(from = number, reported = ?advance.current_step, "advanced wizard step");
                }
                Err(e) if e.is_fatal() => {
                    return (
                        self.aborted(e.to_string(), total_fields, tally, completed),
                        WizardState::Failed("page handle lost".into()),
                    );
                }
                Err(e) => {
                    warn!(step = number, error = %e, "could not advance wizard");
                    tracer.log(&TraceEvent::now("step_failed").with_step(number).with_detail(&e));
                    tally.errors.push(format!("Failed to advance from step {}: {}", number, e));
                    state = WizardState::Failed(e.to_string());
                    break;
                }
            }
        }

        (finish(tally, total_fields, completed, &state), state)
    }

    fn fill_step<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        step: Option<usize>,
        request: &FillRequest,
        resume: &ResumeContext<'_>,
        tracer: &TraceLogger,
        tally: &mut FieldTally,
    ) -> Result<(), BrowserError> {
        for (label, value) in request.iter() {
            fill_field(page, &self.locator, tracer, resume, step, label, value, tally)?;
        }
        Ok(())
    }

    fn aborted(&self, error: impl ToString, total_fields: usize, tally: FieldTally, completed: usize) -> FillResult {
        let mut result = FillResult::fatal(error.to_string(), total_fields, tally.executed_actions, tally.errors);
        result.filled_count = tally.filled_count;
        result.skipped = tally.skipped;
        result.steps_completed = Some(completed);
        result
    }
}

fn finish(tally: FieldTally, total_fields: usize, completed: usize, state: &WizardState) -> FillResult {
    let success = tally.errors.is_empty() && *state == WizardState::Done;
    let message = if success {
        format!(
            "Completed {} step(s), filled {} out of {} fields",
            completed, tally.filled_count, total_fields
        )
    } else {
        format!(
            "Stopped after {} completed step(s) with {} error(s)",
            completed,
            tally.errors.len()
        )
    };

    FillResult {
        success,
        filled_count: tally.filled_count,
        total_fields,
        executed_actions: tally.executed_actions,
        errors: tally.errors,
        skipped: tally.skipped,
        steps_completed: Some(completed),
        message,
        error: None,
    }
}
