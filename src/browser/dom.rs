use serde::{Deserialize, Serialize};

/// One form control as reported by the browser's DOM extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomElement {
    pub tag: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(rename = "ariaLabel", default)]
    pub aria_label: Option<String>,
    /// Text of the associated label: `<label for>` or an enclosing `<label>`.
    #[serde(rename = "labelText", default)]
    pub label_text: Option<String>,
    /// Text of the nearest preceding `<label>`, `<span>` or `<div>` sibling.
    #[serde(rename = "siblingText", default)]
    pub sibling_text: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub options: Vec<DomOption>,
    #[serde(rename = "formId", default)]
    pub form_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomOption {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl DomElement {
    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.to_ascii_lowercase().as_str(), "input" | "select" | "textarea")
    }

    /// Buttons and hidden inputs carry no user data.
    pub fn is_data_control(&self) -> bool {
        if !self.is_form_control() {
            return false;
        }
        !matches!(
            self.r#type.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("hidden") | Some("submit") | Some("button") | Some("reset") | Some("image")
        )
    }
}
