//! Helpers shared by the transform stages.
//!
//! A stage selects its target nodes in document order, runs one job per
//! target on the rayon pool, and rebuilds the tree with the results. Targets
//! are always leaf nodes, so pre-order selection and bottom-up replacement
//! visit them in the same order.

use zhimark_renderer::{Document, Node, rewrite, walk};

/// Collect a job for every node `select` accepts, in document order.
pub(crate) fn collect<'a, J>(
    document: &'a Document,
    select: impl Fn(&'a Node) -> Option<J>,
) -> Vec<J> {
    let mut jobs = Vec::new();
    walk(&document.children, &mut |node| {
        if let Some(job) = select(node) {
            jobs.push(job);
        }
    });
    jobs
}

/// Replace the nodes `is_target` accepts with `replacements`, in order.
///
/// `None` keeps the original node. Replacements inherit the position of the
/// node they replace.
pub(crate) fn replace(
    mut document: Document,
    is_target: impl Fn(&Node) -> bool,
    replacements: Vec<Option<Node>>,
) -> Document {
    let mut replacements = replacements.into_iter();
    let children = std::mem::take(&mut document.children);
    let children = rewrite(children, &mut |node| {
        if !is_target(&node) {
            return vec![node];
        }
        match replacements.next().flatten() {
            Some(replacement) => vec![replacement.at(node.position)],
            None => vec![node],
        }
    });
    document.with_children(children)
}
