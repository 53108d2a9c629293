//! HTML output tree and serializer.

/// Elements written without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input"];

/// A node of the emitted HTML tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlNode {
    Element(Element),
    /// Text, escaped on output.
    Text(String),
    /// Literal HTML from the source document, written verbatim.
    Raw(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_owned(), value.into()));
        self
    }

    #[must_use]
    pub fn children(mut self, children: Vec<HtmlNode>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.children(vec![HtmlNode::Text(text.into())])
    }

    /// Value of the first attribute named `name`.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl From<Element> for HtmlNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// Escape special HTML characters for attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Merge adjacent raw fragments and adjacent text, dropping empty text.
///
/// Inline HTML arrives from the parser one tag at a time; merging keeps a
/// fragment like `<span>` ... `</span>` contiguous in the output tree.
#[must_use]
pub fn merge_raw(nodes: Vec<HtmlNode>) -> Vec<HtmlNode> {
    let mut out: Vec<HtmlNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            HtmlNode::Text(text) if text.is_empty() => {}
            HtmlNode::Text(text) => {
                if let Some(HtmlNode::Text(prev)) = out.last_mut() {
                    prev.push_str(&text);
                } else {
                    out.push(HtmlNode::Text(text));
                }
            }
            HtmlNode::Raw(raw) => {
                if let Some(HtmlNode::Raw(prev)) = out.last_mut() {
                    prev.push_str(&raw);
                } else {
                    out.push(HtmlNode::Raw(raw));
                }
            }
            HtmlNode::Element(mut element) => {
                element.children = merge_raw(element.children);
                out.push(HtmlNode::Element(element));
            }
        }
    }
    out
}

/// Serialize nodes to an HTML string.
#[must_use]
pub fn to_html(nodes: &[HtmlNode]) -> String {
    let mut out = String::with_capacity(4096);
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &HtmlNode, out: &mut String) {
    match node {
        HtmlNode::Text(text) => escape_text(text, out),
        HtmlNode::Raw(raw) => out.push_str(raw),
        HtmlNode::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                return;
            }
            for child in &element.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

/// Text content of an HTML tree, ignoring raw fragments.
#[must_use]
pub fn text_content(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(element) => out.push_str(&text_content(&element.children)),
            HtmlNode::Raw(_) => {}
        }
    }
    out
}
