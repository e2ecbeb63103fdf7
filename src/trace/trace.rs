use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// One line of the fill audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,

    /// Wizard step number, absent for single-page fills.
    pub step: Option<usize>,

    pub event: String,
    pub label: Option<String>,

    pub strategy: Option<String>,
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(event: impl ToString) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            step: None,
            event: event.to_string(),
            label: None,
            strategy: None,
            detail: None,
        }
    }

    /// Outcome of one field.
    pub fn field(step: Option<usize>, label: &str, outcome: &str) -> Self {
        let mut event = Self::now(format!("field_{}", outcome)).with_label(label);
        event.step = step;
        event
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_label(mut self, label: impl ToString) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_strategy(mut self, strategy: impl ToString) -> Self {
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
