use std::path::Path;

use tracing::{info, warn};

use crate::browser::driver::PageDriver;
use crate::browser::session::{BrowserSession, SessionOptions};
use crate::engine::config::EngineConfig;
use crate::engine::orchestrator::{FillOrchestrator, detect_submission_success, submit_form};
use crate::engine::preflight::{dry_run, prepare_request};
use crate::form::model::{FillRequest, FillResult, FormField, StepPlan};
use crate::form::structure::extract_form_fields;
use crate::report::console::{format_fields, format_fill_result, format_preview};
use crate::trace::logger::TraceLogger;

/// Options of the `fill` subcommand, resolved against the config file.
#[derive(Debug, Clone)]
pub struct FillOptions<'a> {
    pub url: &'a str,
    pub data: &'a str,
    pub resume: Option<&'a str>,
    pub multi_step: bool,
    pub skip_validation: bool,
    pub no_match: bool,
    pub format: &'a str,
    pub submit: bool,
}

// ============================================================================
// fill subcommand
// ============================================================================

/// Fill the form at `opts.url` and return whether the fill succeeded.
pub fn cmd_fill(
    opts: &FillOptions<'_>,
    session_options: &SessionOptions,
    engine: &EngineConfig,
    tracer: TraceLogger,
) -> Result<bool, Box<dyn std::error::Error>> {
    let plan: StepPlan = serde_json::from_str(opts.data)?;
    let orchestrator = FillOrchestrator::new(engine.clone()).with_tracer(tracer);
    let mut session = BrowserSession::launch(session_options)?;

    info!(url = opts.url, steps = plan.len(), "starting fill");

    if let Err(e) = session.navigate(opts.url, engine.navigation_timeout_ms) {
        let result = FillResult::fatal(format!("Navigation failed: {}", e), plan.total_fields(), Vec::new(), Vec::new());
        print_output(&result, opts.format, format_fill_result)?;
        return Ok(false);
    }

    let mut result = if opts.multi_step || plan.explicit {
        // Later steps are not on the page yet, so keys are used as given.
        if opts.resume.is_some() {
            warn!("--resume is only used for single-page fills");
        }
        orchestrator.fill_multi_step(&mut session, &plan)
    } else {
        let request = plan.flatten();
        let request = match resolve_request(&mut session, &orchestrator, &request, engine, opts)? {
            Some(request) => request,
            None => return Ok(false),
        };
        orchestrator.fill(&mut session, &request, opts.resume.map(Path::new))
    };

    if opts.submit && result.success {
        if submit_form(&mut session)? {
            // Give the confirmation page a chance to load.
            if let Err(e) = session.wait_for_network_idle(engine.step_idle_timeout_ms) {
                warn!(error = %e, "no network idle after submit");
            }
            let confirmed = detect_submission_success(&mut session)?;
            result.executed_actions.push("Clicked submit".to_string());
            result.message = if confirmed {
                format!("{}; submission confirmed", result.message)
            } else {
                format!("{}; no submission confirmation detected", result.message)
            };
        } else {
            result.errors.push("Submit button not found".to_string());
        }
    }

    session.quit()?;
    print_output(&result, opts.format, format_fill_result)?;
    Ok(result.success)
}

/// Fuzzy-match and validate the request against the page's form. `None`
/// when validation failed and was not skipped; the errors are printed.
fn resolve_request(
    session: &mut BrowserSession,
    orchestrator: &FillOrchestrator,
    request: &FillRequest,
    engine: &EngineConfig,
    opts: &FillOptions<'_>,
) -> Result<Option<FillRequest>, Box<dyn std::error::Error>> {
    if opts.no_match {
        return Ok(Some(request.clone()));
    }

    let fields = orchestrator.read_form(session)?;
    if fields.is_empty() {
        warn!("no form fields detected, using request keys as given");
        return Ok(Some(request.clone()));
    }

    match prepare_request(request, &fields, engine.match_threshold, opts.skip_validation) {
        Ok(matched) => Ok(Some(matched)),
        Err(report) => {
            eprintln!("Request does not validate against the form:");
            for error in &report.errors {
                eprintln!("  ! {}", error);
            }
            eprintln!("Use --skip-validation to fill anyway.");
            Ok(None)
        }
    }
}

// ============================================================================
// preview subcommand
// ============================================================================

pub fn cmd_preview(
    url: &str,
    data: &str,
    format: &str,
    session_options: &SessionOptions,
    engine: &EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let request: FillRequest = serde_json::from_str::<StepPlan>(data)?.flatten();
    let mut session = BrowserSession::launch(session_options)?;

    let preview = dry_run(&mut session, url, &request, engine)?;
    session.quit()?;

    print_output(&preview, format, format_preview)
}

// ============================================================================
// inspect subcommand
// ============================================================================

pub fn cmd_inspect(
    url: &str,
    format: &str,
    session_options: &SessionOptions,
    engine: &EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = BrowserSession::launch(session_options)?;
    session.navigate(url, engine.navigation_timeout_ms)?;
    if let Err(e) = session.wait_for_network_idle(engine.network_idle_timeout_ms) {
        warn!(error = %e, "network did not go idle before inspection");
    }

    let fields = extract_form_fields(&mut session)?;
    session.quit()?;

    print_output(&fields, format, |f: &Vec<FormField>| format_fields(f))
}

// ============================================================================
// Helpers
// ============================================================================

/// Print `value` as pretty JSON or through the console formatter.
fn print_output<T, F>(value: &T, format: &str, console: F) -> Result<(), Box<dyn std::error::Error>>
where
    T: serde::Serialize,
    F: Fn(&T) -> String,
{
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(value)?),
        _ => print!("{}", console(value)),
    }
    Ok(())
}
