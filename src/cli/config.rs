use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::session::{DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_SERVER_SCRIPT, SessionOptions};
use crate::engine::config::EngineConfig;
use crate::form::matcher::DEFAULT_MATCH_THRESHOLD;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-filler",
    version,
    about = "Fill web forms, including multi-step wizards, from a label/value map"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-filler.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Node.js Playwright server script
    #[arg(long, global = true)]
    pub server_script: Option<String>,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill the form at a URL
    Fill {
        #[arg(long)]
        url: String,

        /// JSON object of label -> value, or step name -> object for wizards
        #[arg(long)]
        data: String,

        /// Resume file to upload
        #[arg(long)]
        resume: Option<String>,

        /// Fill step by step, clicking Next between steps
        #[arg(long)]
        multi_step: bool,

        /// Fill even when the request does not validate against the form
        #[arg(long)]
        skip_validation: bool,

        /// Use the request keys as-is instead of fuzzy-matching them
        #[arg(long)]
        no_match: bool,

        /// Minimum similarity for a key to match a form label
        #[arg(long)]
        threshold: Option<f64>,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,

        /// Click the submit control after filling
        #[arg(long)]
        submit: bool,
    },

    /// Show what a fill would do without filling anything
    Preview {
        #[arg(long)]
        url: String,

        #[arg(long)]
        data: String,

        #[arg(long)]
        threshold: Option<f64>,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,
    },

    /// Print the form fields detected at a URL
    Inspect {
        #[arg(long)]
        url: String,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-filler.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub fill: FillConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_server_script")]
    pub server_script: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_idle_timeout")]
    pub network_idle_timeout_ms: u64,

    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            server_script: DEFAULT_SERVER_SCRIPT.to_string(),
            headless: true,
            navigation_timeout_ms: default_navigation_timeout(),
            network_idle_timeout_ms: default_idle_timeout(),
            action_timeout_ms: default_action_timeout(),
        }
    }
}

/// Settle pauses, scrolling and step budget. Unset values keep the engine
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillConfig {
    pub settle_ms: Option<u64>,
    pub field_settle_ms: Option<u64>,
    pub step_settle_ms: Option<u64>,
    pub scroll_pause_ms: Option<u64>,
    pub scroll_step_ratio: Option<f64>,
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceConfig {
    /// JSONL audit trail; disabled when unset.
    pub path: Option<String>,
}

// Serde default helpers
fn default_server_script() -> String { DEFAULT_SERVER_SCRIPT.to_string() }
fn default_true() -> bool { true }
fn default_navigation_timeout() -> u64 { 30_000 }
fn default_idle_timeout() -> u64 { 15_000 }
fn default_action_timeout() -> u64 { DEFAULT_ACTION_TIMEOUT_MS }
fn default_threshold() -> f64 { DEFAULT_MATCH_THRESHOLD }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-filler.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content),
        Err(_) => AppConfig::default(),
    }
}

/// Parse YAML config text, falling back to defaults when malformed.
pub fn parse_config(content: &str) -> AppConfig {
    match serde_yaml::from_str(content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl AppConfig {
    /// Engine settings from the file, with a CLI threshold taking precedence.
    pub fn engine_config(&self, threshold: Option<f64>) -> EngineConfig {
        let mut engine = EngineConfig {
            navigation_timeout_ms: self.browser.navigation_timeout_ms,
            network_idle_timeout_ms: self.browser.network_idle_timeout_ms,
            match_threshold: threshold.unwrap_or(self.matching.threshold),
            ..EngineConfig::default()
        };

        let fill = &self.fill;
        if let Some(v) = fill.settle_ms {
            engine.settle_ms = v;
        }
        if let Some(v) = fill.field_settle_ms {
            engine.field_settle_ms = v;
        }
        if let Some(v) = fill.step_settle_ms {
            engine.step_settle_ms = v;
        }
        if let Some(v) = fill.scroll_pause_ms {
            engine.scroll_pause_ms = v;
        }
        if let Some(v) = fill.scroll_step_ratio {
            engine.scroll_step_ratio = v;
        }
        if let Some(v) = fill.max_steps {
            engine.max_steps = v;
        }
        engine
    }

    /// Browser launch options, with CLI flags taking precedence.
    pub fn session_options(&self, server_script: Option<&str>, headed: bool) -> SessionOptions {
        SessionOptions {
            server_script: server_script.unwrap_or(&self.browser.server_script).to_string(),
            headless: self.browser.headless && !headed,
            action_timeout_ms: self.browser.action_timeout_ms,
        }
    }
}
