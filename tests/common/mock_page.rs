use form_filler::browser::dom::{DomElement, DomOption};
use form_filler::browser::driver::{PageDriver, ScrollMetrics, ScrollTarget};
use form_filler::browser::error::BrowserError;
use form_filler::browser::playwright::{ElementHandle, ElementQuery};

// =========================================================================
// Arena DOM
// =========================================================================

/// What clicking a node does to the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ClickEffect {
    #[default]
    Nothing,
    /// Move to the next document (a wizard step or confirmation page).
    NextPage,
    /// Move to the document at this index.
    GoTo(usize),
    /// Set `aria-expanded="true"` on the nearest ancestor carrying it.
    Expand,
    /// Hide the node's parent (overlay close button).
    Dismiss,
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub parent: Option<usize>,
    pub hidden: bool,
    pub checked: bool,
    pub value: String,
    /// (value attribute, text) of `<option>`s.
    pub options: Vec<(Option<String>, String)>,
    pub on_click: ClickEffect,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }
}

/// One page. Nodes are stored in document order; index 0 is `<body>`.
#[derive(Debug, Clone)]
pub struct MockDocument {
    pub url: String,
    pub nodes: Vec<Node>,
    open: Vec<usize>,
}

impl MockDocument {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            nodes: vec![Node {
                tag: "body".into(),
                ..Node::default()
            }],
            open: vec![0],
        }
    }

    fn cursor(&self) -> usize {
        *self.open.last().unwrap()
    }

    /// Append an element under the currently open container.
    pub fn element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> usize {
        let parent = self.cursor();
        self.nodes.push(Node {
            tag: tag.to_string(),
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            text: text.to_string(),
            parent: Some(parent),
            ..Node::default()
        });
        self.nodes.len() - 1
    }

    /// Append a container and make it the insertion point until `close`.
    pub fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> usize {
        let idx = self.element(tag, attrs, "");
        self.open.push(idx);
        idx
    }

    pub fn close(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    pub fn text(&mut self, tag: &str, text: &str) -> usize {
        self.element(tag, &[], text)
    }

    /// `<div><label for=id>label</label><input id=id name=id type=..></div>`
    pub fn field(&mut self, label: &str, id: &str, input_type: &str) -> usize {
        self.open("div", &[("class", "form-group")]);
        self.element("label", &[("for", id)], label);
        let input = self.element("input", &[("id", id), ("name", id), ("type", input_type)], "");
        self.close();
        input
    }

    pub fn required_field(&mut self, label: &str, id: &str, input_type: &str) -> usize {
        let idx = self.field(label, id, input_type);
        self.nodes[idx].set_attr("required", "");
        idx
    }

    /// Input with no label, identified only by attributes.
    pub fn bare_input(&mut self, attrs: &[(&str, &str)]) -> usize {
        self.element("input", attrs, "")
    }

    pub fn textarea(&mut self, label: &str, id: &str) -> usize {
        self.open("div", &[("class", "form-group")]);
        self.element("label", &[("for", id)], label);
        let idx = self.element("textarea", &[("id", id), ("name", id)], "");
        self.close();
        idx
    }

    /// Select with a value-less placeholder option followed by `options`
    /// (value = lowercased text).
    pub fn select(&mut self, label: &str, id: &str, options: &[&str]) -> usize {
        self.open("div", &[("class", "form-group")]);
        self.element("label", &[("for", id)], label);
        let idx = self.element("select", &[("id", id), ("name", id)], "");
        let mut opts = vec![(Some(String::new()), "Choose...".to_string())];
        opts.extend(options.iter().map(|o| (Some(o.to_lowercase()), o.to_string())));
        self.nodes[idx].options = opts;
        self.close();
        idx
    }

    pub fn checkbox(&mut self, label: &str, id: &str) -> usize {
        self.field(label, id, "checkbox")
    }

    pub fn radio(&mut self, label: &str, name: &str, id: &str) -> usize {
        self.open("div", &[("class", "form-group")]);
        self.element("label", &[("for", id)], label);
        let idx = self.element("input", &[("id", id), ("name", name), ("type", "radio")], "");
        self.close();
        idx
    }

    pub fn file_input(&mut self, label: &str, id: &str) -> usize {
        self.field(label, id, "file")
    }

    pub fn button(&mut self, text: &str, effect: ClickEffect) -> usize {
        let idx = self.element("button", &[("type", "button")], text);
        self.nodes[idx].on_click = effect;
        idx
    }

    pub fn submit(&mut self, text: &str) -> usize {
        let idx = self.element("button", &[("type", "submit")], text);
        self.nodes[idx].on_click = ClickEffect::NextPage;
        idx
    }

    pub fn hide(&mut self, idx: usize) {
        self.nodes[idx].hidden = true;
    }

    pub fn disable(&mut self, idx: usize) {
        self.nodes[idx].set_attr("disabled", "");
    }

    pub fn set_attr(&mut self, idx: usize, name: &str, value: &str) {
        self.nodes[idx].set_attr(name, value);
    }

    pub fn find_by_id(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.attr("id") == Some(id))
    }

    // ---- tree helpers ----

    fn children(&self, idx: usize) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].parent == Some(idx)).collect()
    }

    fn ancestors(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = self.nodes[idx].parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.nodes[p].parent;
        }
        out
    }

    fn is_descendant(&self, idx: usize, of: usize) -> bool {
        self.ancestors(idx).contains(&of)
    }

    fn following_siblings(&self, idx: usize) -> Vec<usize> {
        match self.nodes[idx].parent {
            Some(p) => self.children(p).into_iter().filter(|&i| i > idx).collect(),
            None => Vec::new(),
        }
    }

    /// Own text plus descendants' text, whitespace-normalized.
    pub fn inner_text(&self, idx: usize) -> String {
        let mut parts = vec![self.nodes[idx].text.clone()];
        for i in (idx + 1)..self.nodes.len() {
            if self.is_descendant(i, idx) {
                parts.push(self.nodes[i].text.clone());
            }
        }
        parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn is_visible(&self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        if node.hidden {
            return false;
        }
        for a in self.ancestors(idx) {
            let anc = &self.nodes[a];
            if anc.hidden {
                return false;
            }
            if anc.tag == "details" && !anc.has_attr("open") && node.tag != "summary" {
                return false;
            }
            if anc.attr("aria-expanded") == Some("false") && node.on_click != ClickEffect::Expand {
                return false;
            }
        }
        true
    }

    fn is_clickable(&self, idx: usize) -> bool {
        let n = &self.nodes[idx];
        n.tag == "button" || n.tag == "a" || n.attr("role") == Some("button")
    }

    // ---- query evaluation ----

    pub fn eval(&self, query: &ElementQuery, scope: Option<usize>) -> Vec<usize> {
        let all = 0..self.nodes.len();
        let n = |i: usize| &self.nodes[i];
        let contains = |hay: &str, needle: &str, ignore_case: bool| {
            if ignore_case {
                hay.to_lowercase().contains(&needle.to_lowercase())
            } else {
                hay.contains(needle)
            }
        };

        match query {
            ElementQuery::ControlAfterLabel { label_text, tag } => {
                let mut out = Vec::new();
                for i in all.filter(|&i| n(i).tag == "label" && self.inner_text(i).contains(label_text.as_str())) {
                    if let Some(s) = self.following_siblings(i).into_iter().find(|&s| n(s).tag == tag.as_str()) {
                        if !out.contains(&s) {
                            out.push(s);
                        }
                    }
                }
                out.sort();
                out
            }
            ElementQuery::Label { text, ignore_case } => all
                .filter(|&i| n(i).tag == "label" && contains(&self.inner_text(i), text, *ignore_case))
                .collect(),
            ElementQuery::LabelFor { id } => all
                .filter(|&i| n(i).tag == "label" && n(i).attr("for") == Some(id.as_str()))
                .collect(),
            ElementQuery::ById { id } => all.filter(|&i| n(i).attr("id") == Some(id.as_str())).collect(),
            ElementQuery::NextSibling { .. } => scope
                .and_then(|s| self.following_siblings(s).into_iter().next())
                .into_iter()
                .collect(),
            ElementQuery::ControlAttribute {
                tags,
                attributes,
                needle,
                ignore_case,
            } => all
                .filter(|&i| tags.iter().any(|t| t.as_str() == n(i).tag))
                .filter(|&i| {
                    attributes
                        .iter()
                        .any(|a| n(i).attr(a).is_some_and(|v| contains(v, needle, *ignore_case)))
                })
                .collect(),
            ElementQuery::ClickableText { text } => all
                .filter(|&i| {
                    let node = n(i);
                    let text_hit = self.is_clickable(i) && contains(&self.inner_text(i), text, true);
                    let value_hit = node.tag == "input"
                        && matches!(node.attr("type"), Some("submit") | Some("button"))
                        && node.attr("value").is_some_and(|v| contains(v, text, true));
                    text_hit || value_hit
                })
                .collect(),
            ElementQuery::SubmitControl => all
                .filter(|&i| {
                    (n(i).tag == "button" || n(i).tag == "input")
                        && n(i).attr("type") == Some("submit")
                        && !n(i).has_attr("disabled")
                })
                .collect(),
            ElementQuery::AttributeContains { attribute, needle } => all
                .filter(|&i| n(i).attr(attribute).is_some_and(|v| v.contains(needle.as_str())))
                .collect(),
            ElementQuery::AttributeEquals { attribute, value } => all
                .filter(|&i| n(i).attr(attribute) == Some(value.as_str()))
                .collect(),
            ElementQuery::HasAttribute { attribute } => all.filter(|&i| n(i).has_attr(attribute)).collect(),
            ElementQuery::FileInputs => all
                .filter(|&i| n(i).tag == "input" && n(i).attr("type") == Some("file"))
                .collect(),
            ElementQuery::CollapsedAncestor { .. } => scope
                .and_then(|s| {
                    self.ancestors(s).into_iter().find(|&a| {
                        let anc = n(a);
                        let class = anc.attr("class").unwrap_or("");
                        anc.tag == "details"
                            || anc.attr("aria-expanded") == Some("false")
                            || class.contains("collapse")
                            || class.contains("accordion")
                    })
                })
                .into_iter()
                .collect(),
            ElementQuery::ToggleWithin { .. } => match scope {
                Some(s) => all
                    .filter(|&i| self.is_descendant(i, s))
                    .filter(|&i| matches!(n(i).tag.as_str(), "button" | "summary") || n(i).attr("role") == Some("button"))
                    .collect(),
                None => Vec::new(),
            },
            ElementQuery::CloseControls => all
                .filter(|&i| {
                    let node = n(i);
                    let class = node.attr("class").unwrap_or("");
                    let aria = node.attr("aria-label").unwrap_or("").to_lowercase();
                    (node.tag == "button" && (aria.contains("close") || aria.contains("dismiss")))
                        || class.split_whitespace().any(|c| c == "modal-close" || c == "close-button")
                })
                .collect(),
        }
    }
}

// =========================================================================
// MockPage: PageDriver over a list of documents
// =========================================================================

pub struct MockPage {
    pub docs: Vec<MockDocument>,
    pub current: usize,
    pub epoch: u64,
    /// Every mutating operation, in order.
    pub log: Vec<String>,
    pub page_height: u64,
    pub viewport_height: u64,
    /// `wait_for_network_idle` times out.
    pub idle_timeout: bool,
    /// `navigate` times out.
    pub navigation_fails: bool,
    /// The session dies on the first call of this operation.
    pub lose_session_on: Option<&'static str>,
    lost: bool,
    /// Handles handed out by `query_all` and given back through `release`.
    pub handles_issued: usize,
    pub handles_released: usize,
    /// Controls missing from `extract_dom` until the page is scrolled to the bottom.
    pub rendered_on_scroll: Vec<usize>,
    scrolled_to_bottom: bool,
}

impl MockPage {
    pub fn new(docs: Vec<MockDocument>) -> Self {
        Self {
            docs,
            current: 0,
            epoch: 0,
            log: Vec::new(),
            page_height: 1600,
            viewport_height: 800,
            idle_timeout: false,
            navigation_fails: false,
            lose_session_on: None,
            lost: false,
            handles_issued: 0,
            handles_released: 0,
            rendered_on_scroll: Vec::new(),
            scrolled_to_bottom: false,
        }
    }

    pub fn single(doc: MockDocument) -> Self {
        Self::new(vec![doc])
    }

    pub fn doc(&self) -> &MockDocument {
        &self.docs[self.current]
    }

    fn doc_mut(&mut self) -> &mut MockDocument {
        &mut self.docs[self.current]
    }

    /// Value of the control with `id` in document `page`.
    pub fn value_of(&self, page: usize, id: &str) -> Option<String> {
        let doc = &self.docs[page];
        doc.find_by_id(id).map(|i| doc.nodes[i].value.clone())
    }

    pub fn checked(&self, page: usize, id: &str) -> bool {
        let doc = &self.docs[page];
        doc.find_by_id(id).is_some_and(|i| doc.nodes[i].checked)
    }

    pub fn log_count(&self, prefix: &str) -> usize {
        self.log.iter().filter(|l| l.starts_with(prefix)).count()
    }

    fn guard(&mut self, op: &str) -> Result<(), BrowserError> {
        if self.lost || self.lose_session_on == Some(op) {
            self.lost = true;
            return Err(BrowserError::SessionIO("browser server exited".into()));
        }
        Ok(())
    }

    fn handle(&self, idx: usize) -> ElementHandle {
        ElementHandle::new(format!("p{}-n{}", self.current, idx), self.epoch)
    }

    fn resolve(&self, el: &ElementHandle) -> Result<usize, BrowserError> {
        if el.epoch != self.epoch {
            return Err(BrowserError::StaleElement { handle: el.id.clone() });
        }
        let parsed = el
            .id
            .split_once("-n")
            .and_then(|(p, n)| Some((p.trim_start_matches('p').parse::<usize>().ok()?, n.parse::<usize>().ok()?)));
        match parsed {
            Some((page, idx)) if page == self.current && idx < self.doc().nodes.len() => Ok(idx),
            _ => Err(BrowserError::ElementOperation {
                operation: "resolve".into(),
                reason: format!("unknown handle {}", el.id),
            }),
        }
    }

    fn describe(&self, idx: usize) -> String {
        let node = &self.doc().nodes[idx];
        node.attr("id")
            .map(str::to_string)
            .unwrap_or_else(|| self.doc().inner_text(idx))
    }

    fn rejected(op: &str, reason: &str) -> BrowserError {
        BrowserError::ElementOperation {
            operation: op.into(),
            reason: reason.into(),
        }
    }

    fn go_to(&mut self, page: usize) {
        if page < self.docs.len() {
            self.current = page;
            self.epoch += 1;
        }
    }

    fn editable(&self, op: &str, idx: usize) -> Result<(), BrowserError> {
        let node = &self.doc().nodes[idx];
        if node.has_attr("disabled") {
            return Err(Self::rejected(op, "element is disabled"));
        }
        if !self.doc().is_visible(idx) {
            return Err(Self::rejected(op, "element is not visible"));
        }
        Ok(())
    }
}

impl PageDriver for MockPage {
    fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<(), BrowserError> {
        self.guard("navigate")?;
        self.log.push(format!("navigate {}", url));
        if self.navigation_fails {
            return Err(BrowserError::Timeout {
                what: format!("navigate ({})", url),
                timeout_ms: 30_000,
            });
        }
        let target = self.docs.iter().position(|d| d.url == url).unwrap_or(0);
        self.current = target;
        self.epoch += 1;
        Ok(())
    }

    fn wait_for_network_idle(&mut self, timeout_ms: u64) -> Result<(), BrowserError> {
        self.guard("wait_idle")?;
        if self.idle_timeout {
            return Err(BrowserError::Timeout {
                what: "network idle".into(),
                timeout_ms,
            });
        }
        Ok(())
    }

    fn pause(&mut self, _ms: u64) -> Result<(), BrowserError> {
        self.guard("pause")
    }

    fn current_url(&mut self) -> Result<String, BrowserError> {
        self.guard("current_url")?;
        Ok(self.doc().url.clone())
    }

    fn page_text(&mut self) -> Result<String, BrowserError> {
        self.guard("page_text")?;
        let doc = self.doc();
        Ok((0..doc.nodes.len())
            .filter(|&i| !doc.nodes[i].text.is_empty() && doc.is_visible(i))
            .map(|i| doc.nodes[i].text.clone())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn scroll_to(&mut self, target: &ScrollTarget) -> Result<(), BrowserError> {
        self.guard("scroll")?;
        let entry = match target {
            ScrollTarget::Element(h) => {
                let idx = self.resolve(h)?;
                format!("scroll element {}", self.describe(idx))
            }
            ScrollTarget::Offset(y) => format!("scroll offset {}", y),
            ScrollTarget::Top => "scroll top".to_string(),
            ScrollTarget::Bottom => {
                self.scrolled_to_bottom = true;
                "scroll bottom".to_string()
            }
        };
        self.log.push(entry);
        Ok(())
    }

    fn scroll_metrics(&mut self) -> Result<ScrollMetrics, BrowserError> {
        self.guard("metrics")?;
        Ok(ScrollMetrics {
            page_height: self.page_height,
            viewport_height: self.viewport_height,
        })
    }

    fn extract_dom(&mut self) -> Result<Vec<DomElement>, BrowserError> {
        self.guard("extract")?;
        let doc = self.doc();
        let label_for = |id: &str| {
            doc.nodes
                .iter()
                .position(|n| n.tag == "label" && n.attr("for") == Some(id))
                .map(|i| doc.inner_text(i))
        };

        let sibling_text = |idx: usize| {
            let parent = doc.nodes[idx].parent;
            (0..idx)
                .rev()
                .find(|&j| doc.nodes[j].parent == parent && matches!(doc.nodes[j].tag.as_str(), "label" | "span" | "div"))
                .map(|j| doc.inner_text(j))
                .filter(|t| !t.is_empty())
        };

        Ok(doc
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.tag.as_str(), "input" | "select" | "textarea"))
            .filter(|(idx, _)| self.scrolled_to_bottom || !self.rendered_on_scroll.contains(idx))
            .map(|(idx, n)| DomElement {
                tag: n.tag.clone(),
                r#type: n.attr("type").map(str::to_string),
                id: n.attr("id").map(str::to_string),
                name: n.attr("name").map(str::to_string),
                placeholder: n.attr("placeholder").map(str::to_string),
                aria_label: n.attr("aria-label").map(str::to_string),
                label_text: n.attr("id").and_then(label_for),
                sibling_text: sibling_text(idx),
                required: n.has_attr("required"),
                disabled: n.has_attr("disabled"),
                value: Some(n.value.clone()),
                options: n
                    .options
                    .iter()
                    .map(|(value, text)| DomOption {
                        value: value.clone(),
                        text: text.clone(),
                    })
                    .collect(),
                form_id: None,
            })
            .collect())
    }

    fn navigation_epoch(&self) -> u64 {
        self.epoch
    }

    fn query_all(&mut self, query: &ElementQuery) -> Result<Vec<ElementHandle>, BrowserError> {
        self.guard("query")?;
        let scope = match query.scope() {
            Some(h) => Some(self.resolve(h)?),
            None => None,
        };
        let found = self.doc().eval(query, scope);
        self.handles_issued += found.len();
        Ok(found.into_iter().map(|i| self.handle(i)).collect())
    }

    fn count(&mut self, query: &ElementQuery) -> Result<usize, BrowserError> {
        self.guard("query")?;
        let scope = match query.scope() {
            Some(h) => Some(self.resolve(h)?),
            None => None,
        };
        Ok(self.doc().eval(query, scope).len())
    }

    fn release(&mut self, handles: &[ElementHandle]) -> Result<(), BrowserError> {
        self.guard("release")?;
        self.handles_released += handles.len();
        Ok(())
    }

    fn tag_name(&mut self, el: &ElementHandle) -> Result<String, BrowserError> {
        self.guard("tag_name")?;
        let idx = self.resolve(el)?;
        Ok(self.doc().nodes[idx].tag.clone())
    }

    fn get_attribute(&mut self, el: &ElementHandle, name: &str) -> Result<Option<String>, BrowserError> {
        self.guard("get_attribute")?;
        let idx = self.resolve(el)?;
        Ok(self.doc().nodes[idx].attr(name).map(str::to_string))
    }

    fn inner_text(&mut self, el: &ElementHandle) -> Result<String, BrowserError> {
        self.guard("inner_text")?;
        let idx = self.resolve(el)?;
        Ok(self.doc().inner_text(idx))
    }

    fn is_visible(&mut self, el: &ElementHandle) -> Result<bool, BrowserError> {
        self.guard("is_visible")?;
        let idx = self.resolve(el)?;
        Ok(self.doc().is_visible(idx))
    }

    fn is_disabled(&mut self, el: &ElementHandle) -> Result<bool, BrowserError> {
        self.guard("is_disabled")?;
        let idx = self.resolve(el)?;
        Ok(self.doc().nodes[idx].has_attr("disabled"))
    }

    fn is_checked(&mut self, el: &ElementHandle) -> Result<bool, BrowserError> {
        self.guard("is_checked")?;
        let idx = self.resolve(el)?;
        Ok(self.doc().nodes[idx].checked)
    }

    fn click(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.guard("click")?;
        let idx = self.resolve(el)?;
        self.editable("click", idx)?;
        let desc = self.describe(idx);
        self.log.push(format!("click {}", desc));

        let node = self.doc().nodes[idx].clone();
        if node.tag == "summary" {
            if let Some(p) = node.parent {
                self.doc_mut().nodes[p].set_attr("open", "");
            }
        }
        match node.on_click {
            ClickEffect::Nothing => {}
            ClickEffect::NextPage => {
                let next = self.current + 1;
                self.go_to(next);
            }
            ClickEffect::GoTo(page) => self.go_to(page),
            ClickEffect::Expand => {
                let doc = self.doc();
                let target = std::iter::once(idx)
                    .chain(doc.ancestors(idx))
                    .find(|&a| doc.nodes[a].has_attr("aria-expanded"));
                if let Some(a) = target {
                    self.doc_mut().nodes[a].set_attr("aria-expanded", "true");
                }
            }
            ClickEffect::Dismiss => {
                if let Some(p) = node.parent {
                    self.doc_mut().nodes[p].hidden = true;
                }
            }
        }
        Ok(())
    }

    fn fill(&mut self, el: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        self.guard("fill")?;
        let idx = self.resolve(el)?;
        self.editable("fill", idx)?;
        let node = &self.doc().nodes[idx];
        if !matches!(node.tag.as_str(), "input" | "textarea") || node.attr("type") == Some("file") {
            return Err(Self::rejected("fill", "element is not fillable"));
        }
        let desc = self.describe(idx);
        self.log.push(format!("fill {}={}", desc, text));
        self.doc_mut().nodes[idx].value = text.to_string();
        Ok(())
    }

    fn select_option(&mut self, el: &ElementHandle, value: &str) -> Result<(), BrowserError> {
        self.guard("select_option")?;
        let idx = self.resolve(el)?;
        self.editable("select_option", idx)?;
        let node = &self.doc().nodes[idx];
        let chosen = node
            .options
            .iter()
            .find(|(v, t)| t == value || v.as_deref() == Some(value))
            .map(|(v, t)| v.clone().unwrap_or_else(|| t.clone()));
        let Some(chosen) = chosen else {
            return Err(Self::rejected("select_option", &format!("option '{}' not available", value)));
        };
        let desc = self.describe(idx);
        self.log.push(format!("select {}={}", desc, chosen));
        self.doc_mut().nodes[idx].value = chosen;
        Ok(())
    }

    fn check(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.guard("check")?;
        let idx = self.resolve(el)?;
        self.editable("check", idx)?;
        let desc = self.describe(idx);
        self.log.push(format!("check {}", desc));

        let node = self.doc().nodes[idx].clone();
        if node.attr("type") == Some("radio") {
            let group = node.attr("name").map(str::to_string);
            for other in self.doc_mut().nodes.iter_mut() {
                if other.attr("type") == Some("radio") && other.attr("name").map(str::to_string) == group {
                    other.checked = false;
                }
            }
        }
        self.doc_mut().nodes[idx].checked = true;
        Ok(())
    }

    fn uncheck(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.guard("uncheck")?;
        let idx = self.resolve(el)?;
        self.editable("uncheck", idx)?;
        let desc = self.describe(idx);
        self.log.push(format!("uncheck {}", desc));
        self.doc_mut().nodes[idx].checked = false;
        Ok(())
    }

    fn set_file(&mut self, el: &ElementHandle, path: &str) -> Result<(), BrowserError> {
        self.guard("set_file")?;
        let idx = self.resolve(el)?;
        let desc = self.describe(idx);
        self.log.push(format!("set_file {}={}", desc, path));
        self.doc_mut().nodes[idx].value = path.to_string();
        Ok(())
    }

    fn set_open(&mut self, el: &ElementHandle) -> Result<(), BrowserError> {
        self.guard("set_open")?;
        let idx = self.resolve(el)?;
        let desc = self.describe(idx);
        self.log.push(format!("set_open {}", desc));
        self.doc_mut().nodes[idx].set_attr("open", "");
        Ok(())
    }
}
