//! Footnote numbering for one emitter pass.

use std::collections::HashMap;

/// Assigns display numbers to footnote labels in order of first use.
///
/// Labels compare case-insensitively.
#[derive(Debug, Default)]
pub(crate) struct FootnoteNumbering {
    numbers: HashMap<String, usize>,
}

impl FootnoteNumbering {
    /// Number for `label`, assigning the next one on first sight.
    pub(crate) fn number(&mut self, label: &str) -> usize {
        let next = self.numbers.len() + 1;
        *self.numbers.entry(normalize_label(label)).or_insert(next)
    }

    pub(crate) fn len(&self) -> usize {
        self.numbers.len()
    }
}

/// Case-folded key used to match references to definitions.
pub(crate) fn normalize_label(label: &str) -> String {
    label.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_order() {
        let mut numbering = FootnoteNumbering::default();
        assert_eq!(numbering.number("b"), 1);
        assert_eq!(numbering.number("a"), 2);
        assert_eq!(numbering.number("b"), 1);
        assert_eq!(numbering.len(), 2);
    }

    #[test]
    fn test_case_insensitive() {
        let mut numbering = FootnoteNumbering::default();
        assert_eq!(numbering.number("Note"), 1);
        assert_eq!(numbering.number("NOTE"), 1);
        assert_eq!(numbering.number("note"), 1);
    }
}
