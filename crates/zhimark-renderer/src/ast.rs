//! Document tree produced by the parser and rewritten by each stage.
//!
//! Nodes own their children, so a node always has exactly one parent.
//! Stages take a [`Document`] by value and return a new one.

use crate::position::Position;

/// A parsed document together with the text it was parsed from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Document {
    /// Original markdown. Positions index into this string.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub source: String,
    /// Top-level block nodes.
    pub children: Vec<Node>,
}

impl Document {
    /// Rebuild the document with new top-level children.
    #[must_use]
    pub fn with_children(self, children: Vec<Node>) -> Self {
        Self {
            source: self.source,
            children,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Node {
    pub kind: NodeKind,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<Node>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub position: Option<Position>,
}

/// Node kinds. The emitter matches on this exhaustively.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum NodeKind {
    Paragraph,
    Heading {
        depth: u8,
    },
    Text {
        value: String,
    },
    Emphasis,
    Strong,
    Delete,
    InlineCode {
        value: String,
    },
    /// Line ending inside a paragraph.
    SoftBreak,
    Break,
    ThematicBreak,
    Blockquote {
        callout: Option<Callout>,
    },
    List {
        ordered: bool,
        start: Option<u64>,
    },
    ListItem {
        checked: Option<bool>,
    },
    Code {
        lang: Option<String>,
        meta: Option<String>,
        value: String,
    },
    Html {
        value: String,
    },
    Link {
        url: String,
        title: String,
    },
    Image {
        url: String,
        alt: String,
        title: String,
        hint: Option<ImageHint>,
    },
    Table {
        align: Vec<ColumnAlign>,
    },
    TableRow {
        header: bool,
    },
    TableCell,
    FootnoteReference {
        label: String,
    },
    FootnoteDefinition {
        label: String,
    },
    InlineMath {
        value: String,
    },
    Math {
        value: String,
    },
    /// `[[target|alias]]`
    WikiLink {
        target: String,
        alias: Option<String>,
    },
    /// `![[target|alias]]`
    WikiImageLink {
        target: String,
        alias: Option<String>,
    },
}

/// Callout annotation on a blockquote (`> [!kind] title`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Callout {
    /// Lower-cased kind.
    pub kind: String,
    pub title: String,
    /// `Some(true)` for `-`, `Some(false)` for `+`.
    pub folded: Option<bool>,
}

/// Rendering hint attached to an image once it has been uploaded.
///
/// The emitter writes these values as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImageHint {
    pub caption: String,
    pub raw_width: u32,
    pub raw_height: u32,
    pub original_src: String,
    pub watermark_src: String,
    pub private_watermark_src: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ColumnAlign {
    None,
    Left,
    Center,
    Right,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            position: None,
        }
    }

    #[must_use]
    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            position: None,
        }
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text {
            value: value.into(),
        })
    }

    /// Set the source position.
    #[must_use]
    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    /// Concatenated text content of this node and its descendants.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { value }
            | NodeKind::InlineCode { value }
            | NodeKind::InlineMath { value } => out.push_str(value),
            NodeKind::SoftBreak | NodeKind::Break => out.push('\n'),
            NodeKind::WikiLink { target, alias } | NodeKind::WikiImageLink { target, alias } => {
                out.push_str(alias.as_deref().unwrap_or(target));
            }
            NodeKind::Image { alt, .. } => out.push_str(alt),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Whether this kind is a block-level container or leaf.
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::ThematicBreak
                | NodeKind::Blockquote { .. }
                | NodeKind::List { .. }
                | NodeKind::ListItem { .. }
                | NodeKind::Code { .. }
                | NodeKind::Table { .. }
                | NodeKind::TableRow { .. }
                | NodeKind::TableCell
                | NodeKind::FootnoteDefinition { .. }
                | NodeKind::Math { .. }
        )
    }
}

/// Rebuild every node bottom-up with `f`.
///
/// `f` receives a node whose children have already been rewritten and
/// returns the nodes that replace it (possibly none).
pub fn rewrite<F>(nodes: Vec<Node>, f: &mut F) -> Vec<Node>
where
    F: FnMut(Node) -> Vec<Node>,
{
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        let children = std::mem::take(&mut node.children);
        node.children = rewrite(children, f);
        out.extend(f(node));
    }
    out
}

/// Visit every node depth-first in document order.
pub fn walk<'a, F>(nodes: &'a [Node], f: &mut F)
where
    F: FnMut(&'a Node),
{
    for node in nodes {
        f(node);
        walk(&node.children, f);
    }
}
