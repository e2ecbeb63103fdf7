use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::dom::DomElement;
use crate::browser::driver::{PageDriver, ScrollMetrics, ScrollTarget};
use crate::browser::error::BrowserError;
use crate::browser::playwright::{ElementHandle, ElementQuery};

pub const DEFAULT_SERVER_SCRIPT: &str = "node/browser_server.js";
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
        timeout_ms: u64,
    },
    WaitIdle {
        cmd: &'static str,
        timeout_ms: u64,
    },
    Pause {
        cmd: &'static str,
        ms: u64,
    },
    Query {
        cmd: &'static str,
        selector: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    Release {
        cmd: &'static str,
        handles: Vec<String>,
    },
    Element {
        cmd: &'static str,
        op: &'static str,
        handle: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        timeout_ms: u64,
    },
    Scroll {
        cmd: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        handle: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<&'static str>,
    },
    Simple {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str, timeout_ms: u64) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
            timeout_ms,
        }
    }

    pub fn wait_idle(timeout_ms: u64) -> Self {
        BrowserRequest::WaitIdle {
            cmd: "wait_idle",
            timeout_ms,
        }
    }

    pub fn pause(ms: u64) -> Self {
        BrowserRequest::Pause { cmd: "pause", ms }
    }

    fn selector_request(cmd: &'static str, query: &ElementQuery, limit: Option<usize>) -> Self {
        BrowserRequest::Query {
            cmd,
            selector: query.selector(),
            scope: query.scope().map(|h| h.id.clone()),
            limit,
        }
    }

    pub fn query(query: &ElementQuery) -> Self {
        Self::selector_request("query", query, None)
    }

    /// Like `query`, but only the first match gets a handle.
    pub fn query_first(query: &ElementQuery) -> Self {
        Self::selector_request("query", query, Some(1))
    }

    pub fn count(query: &ElementQuery) -> Self {
        Self::selector_request("count", query, None)
    }

    pub fn release(handles: &[ElementHandle]) -> Self {
        BrowserRequest::Release {
            cmd: "release",
            handles: handles.iter().map(|h| h.id.clone()).collect(),
        }
    }

    pub fn element(op: &'static str, handle: &ElementHandle, value: Option<&str>, timeout_ms: u64) -> Self {
        BrowserRequest::Element {
            cmd: "element",
            op,
            handle: handle.id.clone(),
            value: value.map(str::to_string),
            timeout_ms,
        }
    }

    pub fn scroll(target: &ScrollTarget) -> Self {
        let (handle, offset, position) = match target {
            ScrollTarget::Element(h) => (Some(h.id.clone()), None, None),
            ScrollTarget::Offset(y) => (None, Some(*y), None),
            ScrollTarget::Top => (None, None, Some("top")),
            ScrollTarget::Bottom => (None, None, Some("bottom")),
        };
        BrowserRequest::Scroll {
            cmd: "scroll",
            handle,
            offset,
            position,
        }
    }

    pub fn current_url() -> Self {
        BrowserRequest::Simple { cmd: "current_url" }
    }

    pub fn page_text() -> Self {
        BrowserRequest::Simple { cmd: "page_text" }
    }

    pub fn metrics() -> Self {
        BrowserRequest::Simple { cmd: "metrics" }
    }

    pub fn extract() -> Self {
        BrowserRequest::Simple { cmd: "extract" }
    }

    pub fn quit() -> Self {
        BrowserRequest::Simple { cmd: "quit" }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Set when the failure was a wait deadline.
    #[serde(default)]
    pub timeout: Option<bool>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub handles: Option<Vec<String>>,
    #[serde(default)]
    pub count: Option<usize>,
    /// The command caused the page to navigate; older handles are dead.
    #[serde(default)]
    pub navigated: Option<bool>,
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub viewport: Option<u64>,
}

/// How to start the browser server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub server_script: String,
    pub headless: bool,
    /// Deadline for each element action (click, fill, select, upload).
    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,
}

fn default_action_timeout() -> u64 {
    DEFAULT_ACTION_TIMEOUT_MS
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            server_script: DEFAULT_SERVER_SCRIPT.to_string(),
            headless: true,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }
}

/// A persistent browser page backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps one Playwright page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout. The
/// session is the explicit page handle passed to the fill engine; dropping it
/// closes the browser.
pub struct BrowserSession {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    epoch: u64,
    action_timeout_ms: u64,
    closed: bool,
}

impl BrowserSession {
    /// Launch a new browser session by spawning the server script.
    pub fn launch(options: &SessionOptions) -> Result<Self, BrowserError> {
        let mut command = Command::new("node");
        command.arg(&options.server_script);
        if !options.headless {
            command.arg("--headed");
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BrowserError::SubprocessSpawn {
                script: options.server_script.clone(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrowserError::SessionIO("Failed to capture stdin of browser server".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrowserError::SessionIO("Failed to capture stdout of browser server".into()))?;

        let mut reader = BufReader::new(stdout);

        // Wait for the ready signal
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| BrowserError::SessionIO(format!("Failed to read ready signal: {}", e)))?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| BrowserError::JsonParse {
                context: "browser server ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(BrowserError::SessionProtocol {
                command: "launch".into(),
                error: "Did not receive ready signal from browser server".into(),
            });
        }

        debug!(script = %options.server_script, "browser session ready");

        Ok(BrowserSession {
            child,
            stdin,
            reader,
            epoch: 0,
            action_timeout_ms: options.action_timeout_ms,
            closed: false,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, BrowserError> {
        if self.closed {
            return Err(BrowserError::SessionIO("browser session is closed".into()));
        }

        let json = serde_json::to_string(request).map_err(|e| BrowserError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .map_err(|e| BrowserError::SessionIO(format!("Failed to write to browser server stdin: {}", e)))?;

        self.stdin
            .flush()
            .map_err(|e| BrowserError::SessionIO(format!("Failed to flush browser server stdin: {}", e)))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| BrowserError::SessionIO(format!("Failed to read from browser server stdout: {}", e)))?;

        if line.trim().is_empty() {
            return Err(BrowserError::SessionIO(
                "Empty response from browser server (process may have died)".into(),
            ));
        }

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| BrowserError::JsonParse {
                context: "browser server response".into(),
                source: e,
            })?;

        if response.navigated == Some(true) {
            self.epoch += 1;
        }

        Ok(response)
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest, command_name: &str) -> Result<BrowserResponse, BrowserError> {
        let response = self.send(request)?;
        check_response(response, command_name)
    }

    fn element_op(
        &mut self,
        op: &'static str,
        el: &ElementHandle,
        value: Option<&str>,
    ) -> Result<BrowserResponse, BrowserError> {
        if el.epoch != self.epoch {
            return Err(BrowserError::StaleElement { handle: el.id.clone() });
        }
        let request = BrowserRequest::element(op, el, value, self.action_timeout_ms);
        self.send_ok(&request, op).map_err(|e| match e {
            BrowserError::SessionProtocol { command, error } => BrowserError::ElementOperation {
                operation: command,
                reason: error,
            },
            other => other,
        })
    }

    fn check_scope(&self, query: &ElementQuery) -> Result<(), BrowserError> {
        match query.scope() {
            Some(scope) if scope.epoch != self.epoch => Err(BrowserError::StaleElement { handle: scope.id.clone() }),
            _ => Ok(()),
        }
    }

    fn stamp(&self, response: BrowserResponse) -> Vec<ElementHandle> {
        let epoch = self.epoch;
        response
            .handles
            .unwrap_or_default()
            .into_iter()
            .map(|id| ElementHandle::new(id, epoch))
            .collect()
    }

    fn element_flag(&mut self, op: &'static str, el: &ElementHandle) -> Result<bool, BrowserError> {
        let response = self.element_op(op, el, None)?;
        Ok(response.value.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        let request = BrowserRequest::quit();
        // Best-effort quit, the process may already be gone
        let _ = self.send(&request);
        self.closed = true;
        let _ = self.child.wait();
        Ok(())
    }
}

/// Turn an ok=false response into the matching error.
pub fn check_response(response: BrowserResponse, command_name: &str) -> Result<BrowserResponse, BrowserError> {
    if response.ok {
        return Ok(response);
    }
    let error = response.error.unwrap_or_else(|| "Unknown error".into());
    if response.timeout == Some(true) {
        return Err(BrowserError::Timeout {
            what: format!("{} ({})", command_name, error),
            timeout_ms: 0,
        });
    }
    Err(BrowserError::SessionProtocol {
        command: command_name.into(),
        error,
    })
}

impl PageDriver for BrowserSession {
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        let request = BrowserRequest::navigate(url, timeout_ms);
        let response = self.send(&request)?;
        // Any navigation attempt invalidates existing handles
        if response.navigated.is_none() {
            self.epoch += 1;
        }
        check_response(response, "navigate").map_err(|e| match e {
            BrowserError::Timeout { what, .. } => BrowserError::Timeout { what, timeout_ms },
            other => other,
        })?;
        Ok(())
    }

    fn wait_for_network_idle(&mut self, timeout_ms: u64) -> Result<(), BrowserError> {
        let request = BrowserRequest::wait_idle(timeout_ms);
        self.send_ok(&request, "wait_idle").map_err(|e| match e {
            BrowserError::Timeout { .. } => BrowserError::Timeout {
                what: "network idle".into(),
                timeout_ms,
            },
            other => other,
        })?;
        Ok(())
    }

    fn pause(&mut self, ms: u64) -> Result<(), BrowserError> {
        let request = BrowserRequest::pause(ms);
        self.send_ok(&request, "pause")?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, BrowserError> {
        let response = self.send_ok(&BrowserRequest::current_url(), "current_url")?;
        response.url.ok_or_else(|| BrowserError::SessionProtocol {
            command: "current_url".into(),
            error: "No URL in current_url response".into(),
        })
    }

    fn page_text(&mut self) -> Result<String, BrowserError> {
        let response = self.send_ok(&BrowserRequest::page_text(), "page_text")?;
        Ok(response.text.unwrap_or_default())
    }

    fn scroll_to(&mut self, target: &ScrollTarget) -> Result<(), BrowserError> {
        if let ScrollTarget::Element(h) = target {
            if h.epoch != self.epoch {
                return Err(BrowserError::StaleElement { handle: h.id.clone() });
            }
        }
        self.send_ok(&BrowserRequest::scroll(target), "scroll")?;
        Ok(())
    }

    fn scroll_metrics(&mut self) -> Result<ScrollMetrics, BrowserError> {
        let response = self.send_ok(&BrowserRequest::metrics(), "metrics")?;
        Ok(ScrollMetrics {
            page_height: response.height.unwrap_or(0),
            viewport_height: response.viewport.unwrap_or(0),
        })
    }

    fn extract_dom(&mut self) -> Result<Vec<DomElement>, BrowserError> {
        let response = self.send_ok(&BrowserRequest::extract(), "extract")?;
        let data = response.data.ok_or_else(|| BrowserError::SessionProtocol {
            command: "extract".into(),
            error: "No data in extract response".into(),
        })?;
        serde_json::from_value(data).map_err(|e| BrowserError::JsonParse {
            context: "extract response".into(),
            source: e,
        })
    }

    fn navigation_epoch(&self) -> u64 {
        self.epoch
    }

    fn query_all(&mut self, query: &ElementQuery) -> Result<Vec<ElementHandle>, BrowserError> {
        self.check_scope(query)?;
        let response = self.send_ok(&BrowserRequest::query(query), "query")?;
        Ok(self.stamp(response))
    }

    fn query(&mut self, query: &ElementQuery) -> Result<Option<ElementHandle>, BrowserError> {
        self.check_scope(query)?;
        let response = self.send_ok(&BrowserRequest::query_first(query), "query")?;
        Ok(self.stamp(response).into_iter().next())
    }

    fn count(&mut self, query: &ElementQuery) -> Result<usize, BrowserError> {
        self.check_scope(query)?;
        let response = self.send_ok(&BrowserRequest::count(query), "count")?;
        Ok(response.count.unwrap_or(0))
    }

    fn release(&mut self, handles: &[ElementHandle]) -> Result<(), BrowserError> {
        // Handles from an older page were dropped by the server on navigation
        let live: Vec<ElementHandle> = handles.iter().filter(|h| h.epoch == self.epoch).cloned().collect();
        if live.is_empty() {
            return Ok(());
        }
        self.send_ok(&BrowserRequest::release(&live), "release")?;
        Ok(())
    }

    fn tag_name(&mut self, el: &ElementHandle) -> Result<String, BrowserError> {
        let response = self.element_op("tag_name", el, None)?;
        Ok(response.text.unwrap_or_default().to_lowercase())
    }

    fn get_attribute(&mut self, el: &ElementHandle, name: &str) -> Result<Option<String>, BrowserError> {
        let response = self.element_op("get_attribute", el, Some(name))?;
        Ok(response.value.and_then(|v| v.as_str().map(str::to_string)))
    }

    fn inner_text(&mut self, el: &ElementHandle) -> Result<String, BrowserError> {
        let response = self.element_op("inner_text", el, None)?;
        Ok(response.text.unwrap_or_default())
    }

    fn is_visible(&mut self, el: &ElementHandle) -> Result<bool, BrowserError> {
        self.element_flag("is_visible", el)
    }

    fn is_disabled(&mut self, el: &ElementHandle) -> Result<bool, BrowserError> {
        self.element_flag("is_disabled", el)
    }

    fn is_checked(&mut self, el: &ElementHandle) -> Result<bool, BrowserError> {
        self.element_flag("is_checked", el)
    }

    fn click(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.element_op("click", el, None)?;
        Ok(())
    }

    fn fill(&mut self, el: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        self.element_op("fill", el, Some(text))?;
        Ok(())
    }

    fn select_option(&mut self, el: &ElementHandle, value: &str) -> Result<(), BrowserError> {
        self.element_op("select_option", el, Some(value))?;
        Ok(())
    }

    fn check(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.element_op("check", el, None)?;
        Ok(())
    }

    fn uncheck(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.element_op("uncheck", el, None)?;
        Ok(())
    }

    fn set_file(&mut self, el: &ElementHandle, path: &str) -> Result<(), BrowserError> {
        self.element_op("set_file", el, Some(path))?;
        Ok(())
    }

    fn set_open(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.element_op("set_open", el, None)?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort cleanup
        if let Err(e) = self.quit() {
            warn!(error = %e, "failed to quit browser session");
        }
    }
}
