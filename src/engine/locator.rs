//! Label to DOM element resolution.
//!
//! Strategies in fallback order:
//! 1. LabelSibling - control following a `<label>` containing the text
//! 2. LabelTarget - the `<label>` itself, resolved through `for` or its next sibling
//! 3. AttributeSubstring - control whose name, id or placeholder contains the text
//! 4. PartialWords - case-insensitive retry of 2 and 3 with each word longer than three characters

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::driver::{PageDriver, ScrollTarget};
use crate::browser::error::BrowserError;
use crate::browser::playwright::{ControlTag, ElementHandle, ElementQuery};
use crate::engine::config::EngineConfig;
use crate::form::model::FieldKind;
use crate::form::normalize::key_words;

const ATTRIBUTE_HAYSTACKS: [&str; 3] = ["name", "id", "placeholder"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
    LabelSibling,
    LabelTarget,
    AttributeSubstring,
    PartialWords,
}

impl LocatorStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::LabelSibling => "label-sibling",
            LocatorStrategy::LabelTarget => "label-target",
            LocatorStrategy::AttributeSubstring => "attribute-substring",
            LocatorStrategy::PartialWords => "partial-words",
        }
    }

    /// All strategies in fallback order.
    pub fn fallback_chain() -> [LocatorStrategy; 4] {
        [
            LocatorStrategy::LabelSibling,
            LocatorStrategy::LabelTarget,
            LocatorStrategy::AttributeSubstring,
            LocatorStrategy::PartialWords,
        ]
    }
}

/// A form control resolved for one label on the current page.
///
/// Only valid until the page navigates; `handle.epoch` records the page
/// epoch it was found on.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedElement {
    pub handle: ElementHandle,
    pub label: String,
    pub tag: String,
    pub kind: FieldKind,
    pub visible: bool,
    pub enabled: bool,
    pub strategy: LocatorStrategy,
}

impl LocatedElement {
    pub fn is_current<D: PageDriver + ?Sized>(&self, page: &D) -> bool {
        self.handle.epoch == page.navigation_epoch()
    }
}

fn is_control_tag(tag: &str) -> bool {
    matches!(tag, "input" | "select" | "textarea")
}

/// Resolves field labels to live controls.
#[derive(Debug, Clone)]
pub struct FieldLocator {
    settle_ms: u64,
}

impl FieldLocator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            settle_ms: config.field_settle_ms,
        }
    }

    /// Find the control for `label`.
    ///
    /// Strategies run in order until one yields a visible control. When only
    /// hidden candidates turn up, the first one is revealed (scrolled to, its
    /// collapsed container expanded) and returned with its refreshed
    /// visibility. `Ok(None)` means not found. Only a lost page handle is an
    /// error; every other driver failure just fails the strategy.
    pub fn locate<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        label: &str,
    ) -> Result<Option<LocatedElement>, BrowserError> {
        let mut hidden: Option<LocatedElement> = None;

        for strategy in LocatorStrategy::fallback_chain() {
            let handle = match self.run_strategy(page, strategy, label) {
                Ok(Some(handle)) => handle,
                Ok(None) => continue,
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => {
                    debug!(label, strategy = strategy.name(), error = %e, "locator strategy failed");
                    continue;
                }
            };

            let located = match describe(page, handle, label, strategy) {
                Ok(Some(located)) => located,
                Ok(None) => continue,
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => {
                    debug!(label, strategy = strategy.name(), error = %e, "could not inspect candidate");
                    continue;
                }
            };

            if located.visible {
                self.bring_into_view(page, &located.handle)?;
                debug!(label, strategy = strategy.name(), kind = %located.kind, "located field");
                return Ok(Some(located));
            }

            if hidden.is_none() {
                hidden = Some(located);
            }
        }

        match hidden {
            Some(mut located) => {
                self.reveal(page, &mut located)?;
                Ok(Some(located))
            }
            None => {
                debug!(label, "no strategy located field");
                Ok(None)
            }
        }
    }

    fn run_strategy<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        strategy: LocatorStrategy,
        label: &str,
    ) -> Result<Option<ElementHandle>, BrowserError> {
        match strategy {
            LocatorStrategy::LabelSibling => {
                for tag in ControlTag::ALL {
                    let query = ElementQuery::ControlAfterLabel {
                        label_text: label.to_string(),
                        tag,
                    };
                    if let Some(handle) = page.query(&query)? {
                        return Ok(Some(handle));
                    }
                }
                Ok(None)
            }

            LocatorStrategy::LabelTarget => {
                let query = ElementQuery::Label {
                    text: label.to_string(),
                    ignore_case: false,
                };
                match page.query(&query)? {
                    Some(label_el) => resolve_label_target(page, &label_el),
                    None => Ok(None),
                }
            }

            LocatorStrategy::AttributeSubstring => page.query(&ElementQuery::ControlAttribute {
                tags: ControlTag::ALL.to_vec(),
                attributes: ATTRIBUTE_HAYSTACKS.iter().map(|a| a.to_string()).collect(),
                needle: label.to_string(),
                ignore_case: false,
            }),

            LocatorStrategy::PartialWords => {
                for word in key_words(label) {
                    let label_query = ElementQuery::Label {
                        text: word.clone(),
                        ignore_case: true,
                    };
                    if let Some(label_el) = page.query(&label_query)? {
                        if let Some(target) = resolve_label_target(page, &label_el)? {
                            return Ok(Some(target));
                        }
                    }

                    let attr_query = ElementQuery::ControlAttribute {
                        tags: vec![ControlTag::Input],
                        attributes: ATTRIBUTE_HAYSTACKS.iter().map(|a| a.to_string()).collect(),
                        needle: word,
                        ignore_case: true,
                    };
                    if let Some(handle) = page.query(&attr_query)? {
                        return Ok(Some(handle));
                    }
                }
                Ok(None)
            }
        }
    }

    fn bring_into_view<D: PageDriver + ?Sized>(&self, page: &mut D, handle: &ElementHandle) -> Result<(), BrowserError> {
        best_effort(page.scroll_to(&ScrollTarget::Element(handle.clone())), "scroll field into view")?;
        best_effort(page.pause(self.settle_ms), "field settle")
    }

    /// Scroll a hidden control into view, expand its collapsed container if
    /// it is still hidden, then refresh the visibility and enabled flags.
    fn reveal<D: PageDriver + ?Sized>(&self, page: &mut D, located: &mut LocatedElement) -> Result<(), BrowserError> {
        self.bring_into_view(page, &located.handle)?;

        if !refresh_visible(page, located)? {
            match self.expand_collapsed_ancestor(page, &located.handle) {
                Ok(true) => {
                    refresh_visible(page, located)?;
                }
                Ok(false) => {}
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => debug!(label = %located.label, error = %e, "could not expand collapsed section"),
            }
        }

        match page.is_disabled(&located.handle) {
            Ok(disabled) => located.enabled = !disabled,
            Err(e) if e.is_session_lost() => return Err(e),
            Err(_) => {}
        }
        Ok(())
    }

    /// Open the nearest collapsible container around `handle`. Clicks its
    /// toggle when it is marked `aria-expanded="false"`, and sets `open` on a
    /// `<details>`. Returns whether anything was attempted.
    pub fn expand_collapsed_ancestor<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        handle: &ElementHandle,
    ) -> Result<bool, BrowserError> {
        let Some(container) = page.query(&ElementQuery::CollapsedAncestor { of: handle.clone() })? else {
            return Ok(false);
        };
        let mut expanded = false;

        if page.get_attribute(&container, "aria-expanded")?.as_deref() == Some("false") {
            if let Some(toggle) = page.query(&ElementQuery::ToggleWithin {
                scope: container.clone(),
            })? {
                page.click(&toggle)?;
                page.pause(self.settle_ms)?;
                expanded = true;
            }
        }

        if page.tag_name(&container)? == "details" {
            page.set_open(&container)?;
            page.pause(self.settle_ms)?;
            expanded = true;
        }

        Ok(expanded)
    }
}

/// Follow a `<label>` to its control: `for` -> element with that id,
/// otherwise the label's next sibling.
fn resolve_label_target<D: PageDriver + ?Sized>(
    page: &mut D,
    label_el: &ElementHandle,
) -> Result<Option<ElementHandle>, BrowserError> {
    let target_id = page.get_attribute(label_el, "for")?.filter(|id| !id.trim().is_empty());
    match target_id {
        Some(id) => page.query(&ElementQuery::ById { id }),
        None => page.query(&ElementQuery::NextSibling { of: label_el.clone() }),
    }
}

/// Inspect a candidate. `None` when it is not a form control.
fn describe<D: PageDriver + ?Sized>(
    page: &mut D,
    handle: ElementHandle,
    label: &str,
    strategy: LocatorStrategy,
) -> Result<Option<LocatedElement>, BrowserError> {
    let tag = page.tag_name(&handle)?;
    if !is_control_tag(&tag) {
        return Ok(None);
    }
    let input_type = page.get_attribute(&handle, "type")?;
    let kind = FieldKind::from_control(&tag, input_type.as_deref());
    let visible = page.is_visible(&handle)?;
    let enabled = !page.is_disabled(&handle)?;

    Ok(Some(LocatedElement {
        handle,
        label: label.to_string(),
        tag,
        kind,
        visible,
        enabled,
        strategy,
    }))
}

fn refresh_visible<D: PageDriver + ?Sized>(page: &mut D, located: &mut LocatedElement) -> Result<bool, BrowserError> {
    match page.is_visible(&located.handle) {
        Ok(visible) => located.visible = visible,
        Err(e) if e.is_session_lost() => return Err(e),
        Err(_) => {}
    }
    Ok(located.visible)
}

/// Swallow a failed best-effort step unless it means the page is gone.
pub(crate) fn best_effort(result: Result<(), BrowserError>, what: &str) -> Result<(), BrowserError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_session_lost() => Err(e),
        Err(e) => {
            debug!(what, error = %e, "best-effort step failed");
            Ok(())
        }
    }
}
