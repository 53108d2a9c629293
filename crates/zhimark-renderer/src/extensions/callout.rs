use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Callout, Document, Node, NodeKind, rewrite};

/// Callout kinds whose content is dropped from the output.
pub const IGNORE_KINDS: &[&str] = &["ignore", "忽略", "注释"];

static CALLOUT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[!([^\]\s]+)\]([+-]?)\s*(.*)$").unwrap());

/// Annotate blockquotes that start with `[!kind] title` as callouts.
///
/// The marker line is removed from the body. Without an explicit title the
/// kind is used, with its first letter upper-cased.
#[must_use]
pub fn extend_callouts(mut document: Document) -> Document {
    let children = std::mem::take(&mut document.children);
    let children = rewrite(children, &mut |node| vec![annotate(node)]);
    document.with_children(children)
}

fn annotate(mut node: Node) -> Node {
    if node.kind != (NodeKind::Blockquote { callout: None }) {
        return node;
    }
    let Some(first) = node.children.first() else {
        return node;
    };
    if first.kind != NodeKind::Paragraph {
        return node;
    }

    let paragraph = node.children.remove(0);
    match split_marker(paragraph) {
        Ok((callout, rest)) => {
            if let Some(rest) = rest {
                node.children.insert(0, rest);
            }
            node.kind = NodeKind::Blockquote {
                callout: Some(callout),
            };
        }
        Err(paragraph) => node.children.insert(0, paragraph),
    }
    node
}

/// Split the marker line off a paragraph.
///
/// Returns the callout and what remains of the paragraph, if anything.
fn split_marker(paragraph: Node) -> Result<(Callout, Option<Node>), Node> {
    let Some(NodeKind::Text { value }) = paragraph.children.first().map(|n| &n.kind) else {
        return Err(paragraph);
    };
    let Some(caps) = CALLOUT_MARKER.captures(value) else {
        return Err(paragraph);
    };

    let kind = caps[1].to_lowercase();
    let folded = match &caps[2] {
        "-" => Some(true),
        "+" => Some(false),
        _ => None,
    };
    let mut title = caps[3].to_owned();

    let Node {
        kind: paragraph_kind,
        children,
        position,
    } = paragraph;
    let mut inlines = children.into_iter().skip(1);
    for inline in inlines.by_ref() {
        if matches!(inline.kind, NodeKind::SoftBreak | NodeKind::Break) {
            break;
        }
        title.push_str(&inline.plain_text());
    }
    let rest: Vec<Node> = inlines.collect();

    let title = title.trim();
    let title = if title.is_empty() {
        capitalize(&kind)
    } else {
        title.to_owned()
    };

    let rest = if rest.is_empty() {
        None
    } else {
        let start = rest.first().and_then(|n| n.position).map(|p| p.start);
        let position = position.map(|mut p| {
            if let Some(start) = start {
                p.start = start;
            }
            p
        });
        Some(Node::with_children(paragraph_kind, rest).at(position))
    };

    Ok((
        Callout {
            kind,
            title,
            folded,
        },
        rest,
    ))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
