use crate::ast::{Document, NodeKind, rewrite};

/// Turn every soft line break into a hard break.
#[must_use]
pub fn extend_breaks(mut document: Document) -> Document {
    let children = std::mem::take(&mut document.children);
    let children = rewrite(children, &mut |mut node| {
        if node.kind == NodeKind::SoftBreak {
            node.kind = NodeKind::Break;
        }
        vec![node]
    });
    document.with_children(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_soft_breaks_become_hard() {
        let doc = extend_breaks(parse("one\ntwo"));
        let para = &doc.children[0];
        assert_eq!(para.children[1].kind, NodeKind::Break);
    }

    #[test]
    fn test_code_block_newlines_untouched() {
        let doc = extend_breaks(parse("```\na\nb\n```"));
        let NodeKind::Code { value, .. } = &doc.children[0].kind else {
            panic!("expected code");
        };
        assert_eq!(value, "a\nb");
    }
}
