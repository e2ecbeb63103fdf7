use serde::{Deserialize, Serialize};

/// Server-side reference to a live DOM node.
///
/// The `epoch` is the page's navigation counter at the time the handle was
/// issued; a handle is only valid while the page is still on that epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    #[serde(skip)]
    pub epoch: u64,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, epoch: u64) -> Self {
        Self { id: id.into(), epoch }
    }
}

/// Form control tags the locator looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlTag {
    Input,
    Select,
    Textarea,
}

impl ControlTag {
    pub const ALL: [ControlTag; 3] = [ControlTag::Input, ControlTag::Select, ControlTag::Textarea];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlTag::Input => "input",
            ControlTag::Select => "select",
            ControlTag::Textarea => "textarea",
        }
    }
}

/// Structured DOM query. Every variant renders to a Playwright selector via
/// [`ElementQuery::selector`]; relative variants are evaluated from the
/// element returned by [`ElementQuery::scope`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElementQuery {
    /// First `tag` sibling following a `<label>` whose text contains `label_text`.
    ControlAfterLabel { label_text: String, tag: ControlTag },
    /// A `<label>` whose text contains `text`.
    Label { text: String, ignore_case: bool },
    /// The `<label for="id">` of a control.
    LabelFor { id: String },
    ById { id: String },
    /// The element immediately after `of` among its siblings.
    NextSibling { of: ElementHandle },
    /// A control of one of `tags` with any of `attributes` containing `needle`.
    ControlAttribute {
        tags: Vec<ControlTag>,
        attributes: Vec<String>,
        needle: String,
        ignore_case: bool,
    },
    /// Button, link, `role=button` or submit/button input whose text or value
    /// contains `text`, compared case-insensitively.
    ClickableText { text: String },
    /// Enabled `type=submit` button or input.
    SubmitControl,
    AttributeContains { attribute: String, needle: String },
    AttributeEquals { attribute: String, value: String },
    HasAttribute { attribute: String },
    FileInputs,
    /// Nearest collapsible container around `of`: `<details>`,
    /// `aria-expanded="false"`, or a collapse/accordion class.
    CollapsedAncestor { of: ElementHandle },
    /// Toggle controls (button, summary, role=button) inside `scope`.
    ToggleWithin { scope: ElementHandle },
    /// Close/dismiss buttons of modals and overlays.
    CloseControls,
}

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// Quote a string as an XPath 1.0 literal, falling back to `concat()` when it
/// contains both quote characters.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn lowered(expr: &str) -> String {
    format!("translate({}, '{}', '{}')", expr, UPPER, LOWER)
}

fn contains_expr(expr: &str, needle: &str, ignore_case: bool) -> String {
    if ignore_case {
        format!("contains({}, {})", lowered(expr), xpath_literal(&needle.to_lowercase()))
    } else {
        format!("contains({}, {})", expr, xpath_literal(needle))
    }
}

impl ElementQuery {
    /// Element the query is evaluated relative to, if any.
    pub fn scope(&self) -> Option<&ElementHandle> {
        match self {
            ElementQuery::NextSibling { of } | ElementQuery::CollapsedAncestor { of } => Some(of),
            ElementQuery::ToggleWithin { scope } => Some(scope),
            _ => None,
        }
    }

    /// Playwright selector string for this query.
    pub fn selector(&self) -> String {
        match self {
            ElementQuery::ControlAfterLabel { label_text, tag } => format!(
                "xpath=//label[{}]/following-sibling::{}[1]",
                contains_expr("normalize-space(.)", label_text, false),
                tag.as_str()
            ),
            ElementQuery::Label { text, ignore_case } => format!(
                "xpath=//label[{}]",
                contains_expr("normalize-space(.)", text, *ignore_case)
            ),
            ElementQuery::LabelFor { id } => format!("xpath=//label[@for={}]", xpath_literal(id)),
            ElementQuery::ById { id } => format!("xpath=//*[@id={}]", xpath_literal(id)),
            ElementQuery::NextSibling { .. } => "xpath=following-sibling::*[1]".to_string(),
            ElementQuery::ControlAttribute {
                tags,
                attributes,
                needle,
                ignore_case,
            } => {
                let tag_test = tags
                    .iter()
                    .map(|t| format!("self::{}", t.as_str()))
                    .collect::<Vec<_>>()
                    .join(" or ");
                let attr_test = attributes
                    .iter()
                    .map(|a| contains_expr(&format!("@{}", a), needle, *ignore_case))
                    .collect::<Vec<_>>()
                    .join(" or ");
                format!("xpath=//*[{}][{}]", tag_test, attr_test)
            }
            ElementQuery::ClickableText { text } => format!(
                "xpath=//*[self::button or self::a or @role='button'][{}] | //input[@type='submit' or @type='button'][{}]",
                contains_expr("normalize-space(.)", text, true),
                contains_expr("@value", text, true)
            ),
            ElementQuery::SubmitControl => {
                "button[type='submit']:not([disabled]), input[type='submit']:not([disabled])".to_string()
            }
            ElementQuery::AttributeContains { attribute, needle } => {
                format!("xpath=//*[{}]", contains_expr(&format!("@{}", attribute), needle, false))
            }
            ElementQuery::AttributeEquals { attribute, value } => {
                format!("xpath=//*[@{}={}]", attribute, xpath_literal(value))
            }
            ElementQuery::HasAttribute { attribute } => format!("xpath=//*[@{}]", attribute),
            ElementQuery::FileInputs => "input[type='file']".to_string(),
            ElementQuery::CollapsedAncestor { .. } => "xpath=ancestor::*[self::details or @aria-expanded='false' \
                 or contains(@class, 'collapse') or contains(@class, 'accordion')][1]"
                .to_string(),
            ElementQuery::ToggleWithin { .. } => {
                "xpath=.//*[self::button or self::summary or @role='button']".to_string()
            }
            ElementQuery::CloseControls => "button[aria-label*='close' i], button[aria-label*='dismiss' i], \
                 .modal-close, .close-button"
                .to_string(),
        }
    }
}
