use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Document, Node, NodeKind, rewrite};
use crate::position::{LineIndex, Position};

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\[\]\n]+?)\]\]").unwrap());

/// Split text nodes on `[[target|alias]]` and `![[target|alias]]`.
///
/// New nodes get exact positions when the text node's value is identical to
/// its source slice; otherwise (escapes, entities) they have none.
///
/// A link whose inner text was parsed as emphasis (`[[a*b*c]]`) is rebuilt
/// from the source, so the target is the literal text between the brackets.
#[must_use]
pub fn extend_wiki_links(mut document: Document) -> Document {
    let children = std::mem::take(&mut document.children);
    let children = {
        let source = document.source.as_str();
        let index = LineIndex::new(source);
        rewrite(children, &mut |mut node| {
            if !node.children.is_empty() && !matches!(node.kind, NodeKind::Link { .. }) {
                let children = std::mem::take(&mut node.children);
                node.children = join_spanning(children, source, &index);
            }
            split_text(node, source, &index)
        })
    };
    document.with_children(children)
}

/// Byte offset of a text node's value in the source, when it maps 1:1.
fn exact_offset(node: &Node, source: &str) -> Option<usize> {
    let NodeKind::Text { value } = &node.kind else {
        return None;
    };
    node.position
        .filter(|p| source.get(p.range()) == Some(value.as_str()))
        .map(|p| p.start.offset)
}

/// Replace `[[` ... `]]` runs that open in one text node and close in a later
/// sibling with a single link node.
fn join_spanning(children: Vec<Node>, source: &str, index: &LineIndex<'_>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut rest = children.into_iter().peekable();
    while let Some(node) = rest.next() {
        let Some(open) = open_bracket(&node, source) else {
            out.push(node);
            continue;
        };
        let mut between = Vec::new();
        let mut joined = None;
        while let Some(next) = rest.next_if(spans_inline) {
            if let Some(close) = close_bracket(&next, source) {
                joined = Some((next, close));
                break;
            }
            between.push(next);
        }
        match joined.and_then(|(closing, close)| {
            link_across(&node, open, &closing, close, source, index)
        }) {
            Some(nodes) => out.extend(nodes),
            None => {
                out.push(node);
                out.extend(between);
            }
        }
    }
    out
}

/// Offset in `node`'s value of a `[[` (or `![[`) with no closing `]]` after it.
fn open_bracket(node: &Node, source: &str) -> Option<usize> {
    exact_offset(node, source)?;
    let NodeKind::Text { value } = &node.kind else {
        return None;
    };
    let open = value.rfind("[[")?;
    if value[open..].contains("]]") {
        return None;
    }
    Some(if value[..open].ends_with('!') { open - 1 } else { open })
}

/// Offset in `node`'s value just past the first `]]`.
fn close_bracket(node: &Node, source: &str) -> Option<usize> {
    exact_offset(node, source)?;
    let NodeKind::Text { value } = &node.kind else {
        return None;
    };
    value.find("]]").map(|close| close + 2)
}

/// Nodes a wiki link may be split across by the inline parser.
fn spans_inline(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Text { .. } | NodeKind::Emphasis | NodeKind::Strong | NodeKind::Delete
    )
}

fn link_across(
    opening: &Node,
    open: usize,
    closing: &Node,
    close: usize,
    source: &str,
    index: &LineIndex<'_>,
) -> Option<Vec<Node>> {
    let (NodeKind::Text { value: first }, NodeKind::Text { value: last }) =
        (&opening.kind, &closing.kind)
    else {
        return None;
    };
    let start = exact_offset(opening, source)? + open;
    let end = exact_offset(closing, source)? + close;
    let literal = source.get(start..end)?;
    let caps = WIKI_LINK.captures(literal)?;
    if caps.get(0)?.as_str().len() != literal.len() {
        return None;
    }
    let (target, alias) = parse_inner(caps.get(2)?.as_str())?;
    let embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
    let kind = if embed {
        NodeKind::WikiImageLink { target, alias }
    } else {
        NodeKind::WikiLink { target, alias }
    };

    let mut out = Vec::new();
    if open > 0 {
        let prefix_start = start - open;
        out.push(Node::text(&first[..open]).at(Some(index.position(prefix_start..start))));
    }
    out.push(Node::new(kind).at(Some(index.position(start..end))));
    if close < last.len() {
        let suffix = Node::text(&last[close..])
            .at(Some(index.position(end..end + last.len() - close)));
        out.extend(split_text(suffix, source, index));
    }
    Some(out)
}

fn split_text(node: Node, source: &str, index: &LineIndex<'_>) -> Vec<Node> {
    let NodeKind::Text { value } = &node.kind else {
        return vec![node];
    };
    if !value.contains("[[") {
        return vec![node];
    }

    let base = node
        .position
        .filter(|p| source.get(p.range()) == Some(value.as_str()))
        .map(|p| p.start.offset);
    let locate = |start: usize, end: usize| -> Option<Position> {
        base.map(|b| index.position(b + start..b + end))
    };

    let mut out = Vec::new();
    let mut cursor = 0;
    for caps in WIKI_LINK.captures_iter(value) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let Some((target, alias)) = parse_inner(inner.as_str()) else {
            continue;
        };
        if whole.start() > cursor {
            out.push(Node::text(&value[cursor..whole.start()]).at(locate(cursor, whole.start())));
        }
        let embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let kind = if embed {
            NodeKind::WikiImageLink { target, alias }
        } else {
            NodeKind::WikiLink { target, alias }
        };
        out.push(Node::new(kind).at(locate(whole.start(), whole.end())));
        cursor = whole.end();
    }

    if out.is_empty() {
        return vec![node];
    }
    if cursor < value.len() {
        out.push(Node::text(&value[cursor..]).at(locate(cursor, value.len())));
    }
    out
}

fn parse_inner(inner: &str) -> Option<(String, Option<String>)> {
    let (target, alias) = match inner.split_once('|') {
        Some((target, alias)) => (target.trim(), Some(alias.trim())),
        None => (inner.trim(), None),
    };
    if target.is_empty() {
        return None;
    }
    let alias = alias.filter(|a| !a.is_empty()).map(str::to_owned);
    Some((target.to_owned(), alias))
}
