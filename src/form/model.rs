use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Field descriptors (produced by a form structure source)
// ============================================================================

/// Expected data type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Password,
    Date,
    Number,
    Url,
    Select,
    Checkbox,
    Radio,
    Textarea,
    File,
}

impl FieldKind {
    /// Resolve the kind of a live control from its tag name and `type` attribute.
    pub fn from_control(tag: &str, input_type: Option<&str>) -> FieldKind {
        match tag.to_ascii_lowercase().as_str() {
            "select" => return FieldKind::Select,
            "textarea" => return FieldKind::Textarea,
            _ => {}
        }

        match input_type.map(|t| t.to_ascii_lowercase()).as_deref() {
            Some("email") => FieldKind::Email,
            Some("tel") => FieldKind::Tel,
            Some("password") => FieldKind::Password,
            Some("date") | Some("datetime-local") | Some("month") => FieldKind::Date,
            Some("number") => FieldKind::Number,
            Some("url") => FieldKind::Url,
            Some("checkbox") => FieldKind::Checkbox,
            Some("radio") => FieldKind::Radio,
            Some("file") => FieldKind::File,
            _ => FieldKind::Text,
        }
    }

    /// Classify a field for the structure source: tag and type attribute first,
    /// then keywords in the label and name.
    pub fn classify(tag: &str, input_type: Option<&str>, name: &str, label: &str) -> FieldKind {
        let from_markup = FieldKind::from_control(tag, input_type);
        if from_markup != FieldKind::Text {
            return from_markup;
        }

        let label_lower = label.to_lowercase();
        let name_lower = name.to_lowercase();

        if label_lower.contains("email") || name_lower.contains("email") {
            return FieldKind::Email;
        }
        if label_lower.contains("phone") || label_lower.contains("tel") || name_lower.contains("phone") {
            return FieldKind::Tel;
        }
        if label_lower.contains("password") || name_lower.contains("password") {
            return FieldKind::Password;
        }
        if label_lower.contains("date") || name_lower.contains("date") {
            return FieldKind::Date;
        }
        if label_lower.contains("number") || label_lower.contains("zip") || name_lower.contains("number") {
            return FieldKind::Number;
        }

        FieldKind::Text
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Password => "password",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Url => "url",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::Textarea => "textarea",
            FieldKind::File => "file",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field of a form as seen by the structure source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

impl FormField {
    pub fn new(label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            label: label.into(),
            kind,
            required: false,
            options: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// Field values
// ============================================================================

/// A loosely typed value supplied by the caller for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// JSON `null`: the caller has no value for this field.
    Null,
}

impl FieldValue {
    /// Truthiness used for checkbox and radio controls.
    ///
    /// Text values such as "no", "false", "off" and "0" count as false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => {
                let t = s.trim().to_lowercase();
                !(t.is_empty() || t == "false" || t == "no" || t == "off" || t == "0")
            }
            FieldValue::Null => false,
        }
    }

    /// Blank text and null are skipped by the orchestrator without being reported.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Null => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Null => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

// ============================================================================
// FillRequest: ordered label -> value map
// ============================================================================

/// Label to value mapping for one fill attempt. Keeps insertion order; inserting
/// an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillRequest {
    entries: Vec<(String, FieldValue)>,
}

impl FillRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous value when the key existed.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == label) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((label, value));
                None
            }
        }
    }

    pub fn with(mut self, label: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(label, value);
        self
    }

    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == label).map(|(_, v)| v)
    }

    pub fn contains_key(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every entry of `other`, later keys overwriting earlier ones.
    pub fn extend_from(&mut self, other: &FillRequest) {
        for (k, v) in other.iter() {
            self.insert(k, v.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for FillRequest
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut request = FillRequest::new();
        for (k, v) in iter {
            request.insert(k, v);
        }
        request
    }
}

impl Serialize for FillRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct FillRequestVisitor;

impl<'de> Visitor<'de> for FillRequestVisitor {
    type Value = FillRequest;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field labels to string, bool, number or null values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FillRequest, A::Error> {
        let mut request = FillRequest::new();
        while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
            request.insert(key, value);
        }
        Ok(request)
    }
}

impl<'de> Deserialize<'de> for FillRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<FillRequest, D::Error> {
        deserializer.deserialize_map(FillRequestVisitor)
    }
}

// ============================================================================
// Step plans (multi-step forms)
// ============================================================================

/// One planned wizard step: an identifier and the fields to fill on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStep {
    pub id: String,
    pub request: FillRequest,
}

/// Ordered steps for a wizard fill. Either supplied explicitly by the caller
/// or a single implicit step carrying the whole request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPlan {
    pub steps: Vec<PlannedStep>,
    pub explicit: bool,
}

impl StepPlan {
    pub fn implicit(request: FillRequest) -> Self {
        Self {
            steps: vec![PlannedStep {
                id: "step1".into(),
                request,
            }],
            explicit: false,
        }
    }

    pub fn explicit<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = (S, FillRequest)>,
        S: Into<String>,
    {
        Self {
            steps: steps
                .into_iter()
                .map(|(id, request)| PlannedStep { id: id.into(), request })
                .collect(),
            explicit: true,
        }
    }

    /// Every step's fields merged into one request, in step order.
    pub fn flatten(&self) -> FillRequest {
        let mut merged = FillRequest::new();
        for step in &self.steps {
            merged.extend_from(&step.request);
        }
        merged
    }

    pub fn total_fields(&self) -> usize {
        self.steps.iter().map(|s| s.request.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl From<FillRequest> for StepPlan {
    fn from(request: FillRequest) -> Self {
        StepPlan::implicit(request)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepOrValue {
    Step(FillRequest),
    Value(FieldValue),
}

struct StepPlanVisitor;

impl<'de> Visitor<'de> for StepPlanVisitor {
    type Value = StepPlan;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat field map or a map of step names to field maps")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StepPlan, A::Error> {
        let mut steps: Vec<(String, FillRequest)> = Vec::new();
        let mut flat = FillRequest::new();

        while let Some((key, entry)) = access.next_entry::<String, StepOrValue>()? {
            match entry {
                StepOrValue::Step(request) => steps.push((key, request)),
                StepOrValue::Value(value) => {
                    flat.insert(key, value);
                }
            }
        }

        match (steps.is_empty(), flat.is_empty()) {
            (false, true) => Ok(StepPlan::explicit(steps)),
            (true, _) => Ok(StepPlan::implicit(flat)),
            (false, false) => Err(de::Error::custom(
                "cannot mix per-step field maps with top-level field values",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for StepPlan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<StepPlan, D::Error> {
        deserializer.deserialize_map(StepPlanVisitor)
    }
}

// ============================================================================
// FillResult
// ============================================================================

/// Aggregated outcome of one fill attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillResult {
    pub success: bool,
    pub filled_count: usize,
    pub total_fields: usize,
    pub executed_actions: Vec<String>,
    pub errors: Vec<String>,
    /// Fields deliberately left alone, e.g. file inputs needing a manual upload.
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_completed: Option<usize>,
    pub message: String,
    /// Top-level error for fatal failures (navigation, lost page handle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FillResult {
    /// Result for an operation aborted by a fatal error. Work already recorded
    /// is kept.
    pub fn fatal(
        error: impl Into<String>,
        total_fields: usize,
        executed_actions: Vec<String>,
        errors: Vec<String>,
    ) -> Self {
        let error = error.into();
        Self {
            success: false,
            filled_count: 0,
            total_fields,
            executed_actions,
            errors,
            skipped: Vec::new(),
            steps_completed: None,
            message: format!("Fill aborted: {}", error),
            error: Some(error),
        }
    }
}
