use crate::ast::{Document, Node, NodeKind, rewrite};

/// Place display math at block level.
///
/// A paragraph holding nothing but `$$...$$` becomes one block math node per
/// formula. Display math mixed with other inline content is demoted to
/// inline math.
#[must_use]
pub fn extend_math(mut document: Document) -> Document {
    let children = blocks(std::mem::take(&mut document.children));
    document.with_children(children)
}

fn blocks(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        if node.kind == NodeKind::Paragraph {
            match lift_display_math(node) {
                Ok(math) => out.extend(math),
                Err(mut paragraph) => {
                    paragraph.children = inlines(std::mem::take(&mut paragraph.children));
                    out.push(paragraph);
                }
            }
            continue;
        }
        let children = std::mem::take(&mut node.children);
        node.children = match &mut node.kind {
            NodeKind::Blockquote { .. }
            | NodeKind::List { .. }
            | NodeKind::ListItem { .. }
            | NodeKind::FootnoteDefinition { .. } => blocks(children),
            NodeKind::Math { value } => {
                *value = value.trim().to_owned();
                children
            }
            _ => inlines(children),
        };
        out.push(node);
    }
    out
}

fn lift_display_math(paragraph: Node) -> Result<Vec<Node>, Node> {
    let has_math = paragraph
        .children
        .iter()
        .any(|child| matches!(child.kind, NodeKind::Math { .. }));
    let only_math = paragraph.children.iter().all(|child| match &child.kind {
        NodeKind::Math { .. } | NodeKind::SoftBreak | NodeKind::Break => true,
        NodeKind::Text { value } => value.trim().is_empty(),
        _ => false,
    });
    if !(has_math && only_math) {
        return Err(paragraph);
    }
    Ok(paragraph
        .children
        .into_iter()
        .filter_map(|child| match child.kind {
            NodeKind::Math { value } => Some(
                Node::new(NodeKind::Math {
                    value: value.trim().to_owned(),
                })
                .at(child.position),
            ),
            _ => None,
        })
        .collect())
}

fn inlines(nodes: Vec<Node>) -> Vec<Node> {
    rewrite(nodes, &mut |mut node| {
        if let NodeKind::Math { value } = &mut node.kind {
            node.kind = NodeKind::InlineMath {
                value: std::mem::take(value),
            };
        }
        vec![node]
    })
}
