use crate::browser::dom::DomElement;
use crate::browser::error::BrowserError;
use crate::browser::playwright::{ElementHandle, ElementQuery};

/// Where to scroll the viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
    /// Center the element in the viewport.
    Element(ElementHandle),
    /// Absolute vertical offset in CSS pixels.
    Offset(u64),
    Top,
    Bottom,
}

/// Document and viewport heights, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub page_height: u64,
    pub viewport_height: u64,
}

/// Control surface over one live browser page.
///
/// Implementations own exactly one tab. Element handles they return carry the
/// navigation epoch current at the time; operations on a handle from an older
/// epoch fail with [`BrowserError::StaleElement`].
pub trait PageDriver {
    // ---- Page ----
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), BrowserError>;
    fn wait_for_network_idle(&mut self, timeout_ms: u64) -> Result<(), BrowserError>;
    /// Fixed settle delay.
    fn pause(&mut self, ms: u64) -> Result<(), BrowserError>;
    fn current_url(&mut self) -> Result<String, BrowserError>;
    /// Visible text of the whole document.
    fn page_text(&mut self) -> Result<String, BrowserError>;
    fn scroll_to(&mut self, target: &ScrollTarget) -> Result<(), BrowserError>;
    fn scroll_metrics(&mut self) -> Result<ScrollMetrics, BrowserError>;
    /// Form controls of the current document.
    fn extract_dom(&mut self) -> Result<Vec<DomElement>, BrowserError>;
    /// Incremented every time the page navigates.
    fn navigation_epoch(&self) -> u64;

    // ---- Queries ----
    fn query_all(&mut self, query: &ElementQuery) -> Result<Vec<ElementHandle>, BrowserError>;

    fn query(&mut self, query: &ElementQuery) -> Result<Option<ElementHandle>, BrowserError> {
        Ok(self.query_all(query)?.into_iter().next())
    }

    /// Number of matches. Creates no handles.
    fn count(&mut self, query: &ElementQuery) -> Result<usize, BrowserError> {
        Ok(self.query_all(query)?.len())
    }

    /// Drop handles the caller no longer needs.
    fn release(&mut self, _handles: &[ElementHandle]) -> Result<(), BrowserError> {
        Ok(())
    }

    // ---- Element state ----
    fn tag_name(&mut self, el: &ElementHandle) -> Result<String, BrowserError>;
    fn get_attribute(&mut self, el: &ElementHandle, name: &str) -> Result<Option<String>, BrowserError>;
    fn inner_text(&mut self, el: &ElementHandle) -> Result<String, BrowserError>;
    fn is_visible(&mut self, el: &ElementHandle) -> Result<bool, BrowserError>;
    fn is_disabled(&mut self, el: &ElementHandle) -> Result<bool, BrowserError>;
    fn is_checked(&mut self, el: &ElementHandle) -> Result<bool, BrowserError>;

    // ---- Element actions ----
    fn click(&mut self, el: &ElementHandle) -> Result<(), BrowserError>;
    fn fill(&mut self, el: &ElementHandle, text: &str) -> Result<(), BrowserError>;
    /// Select by option value or visible text.
    fn select_option(&mut self, el: &ElementHandle, value: &str) -> Result<(), BrowserError>;
    fn check(&mut self, el: &ElementHandle) -> Result<(), BrowserError>;
    fn uncheck(&mut self, el: &ElementHandle) -> Result<(), BrowserError>;
    fn set_file(&mut self, el: &ElementHandle, path: &str) -> Result<(), BrowserError>;
    /// Open a `<details>` disclosure element.
    fn set_open(&mut self, el: &ElementHandle) -> Result<(), BrowserError>;
}
