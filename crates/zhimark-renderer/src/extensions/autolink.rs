use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Document, Node, NodeKind};
use crate::position::{LineIndex, Position};

static AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:https?://|www\.)[^\s<]+|[a-z0-9._+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)+",
    )
    .unwrap()
});

/// Characters dropped from the end of a bare URL.
const TRAILING_PUNCTUATION: &[char] = &['?', '!', '.', ',', ':', '*', '_', '~', '\'', '"'];

/// Turn bare `http(s)://`, `www.` and email addresses in text into links.
///
/// `www.` links get an `http://` scheme and emails a `mailto:` one. Text
/// already inside a link or image is left alone. Positions follow the same
/// rule as [`extend_wiki_links`](super::extend_wiki_links).
#[must_use]
pub fn extend_autolinks(mut document: Document) -> Document {
    let children = std::mem::take(&mut document.children);
    let children = {
        let source = document.source.as_str();
        let index = LineIndex::new(source);
        link_nodes(children, source, &index)
    };
    document.with_children(children)
}

fn link_nodes(nodes: Vec<Node>, source: &str, index: &LineIndex<'_>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        if matches!(node.kind, NodeKind::Text { .. }) {
            out.extend(split_text(node, source, index));
            continue;
        }
        let opaque = matches!(
            node.kind,
            NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::WikiLink { .. }
                | NodeKind::WikiImageLink { .. }
        );
        if !opaque {
            let children = std::mem::take(&mut node.children);
            node.children = link_nodes(children, source, index);
        }
        out.push(node);
    }
    out
}

fn split_text(node: Node, source: &str, index: &LineIndex<'_>) -> Vec<Node> {
    let NodeKind::Text { value } = &node.kind else {
        return vec![node];
    };

    let base = node
        .position
        .filter(|p| source.get(p.range()) == Some(value.as_str()))
        .map(|p| p.start.offset);
    let locate = |start: usize, end: usize| -> Option<Position> {
        base.map(|b| index.position(b + start..b + end))
    };

    let mut out = Vec::new();
    let mut cursor = 0;
    for found in AUTOLINK.find_iter(value) {
        let start = found.start();
        if value[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric)
        {
            continue;
        }
        let text = trim_trailing(found.as_str());
        let Some(url) = link_target(text) else {
            continue;
        };
        let end = start + text.len();

        if start > cursor {
            out.push(Node::text(&value[cursor..start]).at(locate(cursor, start)));
        }
        let position = locate(start, end);
        out.push(
            Node::with_children(
                NodeKind::Link {
                    url,
                    title: String::new(),
                },
                vec![Node::text(text).at(position)],
            )
            .at(position),
        );
        cursor = end;
    }

    if out.is_empty() {
        return vec![node];
    }
    if cursor < value.len() {
        out.push(Node::text(&value[cursor..]).at(locate(cursor, value.len())));
    }
    out
}

/// Strip trailing punctuation and unbalanced closing parentheses.
fn trim_trailing(mut text: &str) -> &str {
    loop {
        let Some(last) = text.chars().next_back() else {
            return text;
        };
        let unbalanced_paren =
            last == ')' && text.matches(')').count() > text.matches('(').count();
        if TRAILING_PUNCTUATION.contains(&last) || unbalanced_paren {
            text = &text[..text.len() - last.len_utf8()];
        } else {
            return text;
        }
    }
}

fn link_target(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        (text.len() > lower.find("://").unwrap_or(0) + 3).then(|| text.to_owned())
    } else if lower.starts_with("www.") {
        (text.len() > 4).then(|| format!("http://{text}"))
    } else if text.contains('@') {
        Some(format!("mailto:{text}"))
    } else {
        None
    }
}
