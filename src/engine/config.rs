use serde::{Deserialize, Serialize};

use crate::form::matcher::DEFAULT_MATCH_THRESHOLD;

/// Timeouts, settle delays and budgets for one fill engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial page load.
    pub navigation_timeout_ms: u64,
    /// Network-idle wait when settling a page before filling.
    pub network_idle_timeout_ms: u64,
    /// Network-idle wait after clicking a wizard's next control.
    pub step_idle_timeout_ms: u64,
    /// Extra delay after the page reports idle.
    pub settle_ms: u64,
    /// Delay after scrolling a field into view.
    pub field_settle_ms: u64,
    /// Delay after advancing a wizard step.
    pub step_settle_ms: u64,
    /// Delay between lazy-load scroll increments.
    pub scroll_pause_ms: u64,
    /// Fraction of the viewport scrolled per increment.
    pub scroll_step_ratio: f64,
    /// Hard cap on lazy-load scroll increments.
    pub max_scroll_iterations: usize,
    /// Wizard step budget.
    pub max_steps: usize,
    pub match_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            network_idle_timeout_ms: 15_000,
            step_idle_timeout_ms: 10_000,
            settle_ms: 2_000,
            field_settle_ms: 400,
            step_settle_ms: 1_000,
            scroll_pause_ms: 1_000,
            scroll_step_ratio: 0.7,
            max_scroll_iterations: 200,
            max_steps: 10,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Same budgets with every fixed delay removed. Timeouts are kept.
    pub fn without_delays(mut self) -> Self {
        self.settle_ms = 0;
        self.field_settle_ms = 0;
        self.step_settle_ms = 0;
        self.scroll_pause_ms = 0;
        self
    }
}
