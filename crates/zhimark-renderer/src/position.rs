//! Source positions attached by the parser.

/// A point in the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Point {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// 0-based byte offset.
    pub offset: usize,
}

/// Start and end of a node in the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    /// Byte range covered by this position.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Whether start and end are on the same line.
    #[must_use]
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

/// Maps byte offsets to line/column points.
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// Convert a byte offset to a point. Offsets past the end clamp to it.
    #[must_use]
    pub fn point(&self, offset: usize) -> Point {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(offset - line_start, |s| s.chars().count())
            + 1;
        Point {
            line,
            column,
            offset,
        }
    }

    /// Position spanning a byte range.
    #[must_use]
    pub fn position(&self, range: std::ops::Range<usize>) -> Position {
        Position {
            start: self.point(range.start),
            end: self.point(range.end),
        }
    }
}

/// Whether the text at `position` is the only non-blank content on its line.
#[must_use]
pub fn is_alone_on_line(source: &str, position: &Position) -> bool {
    if !position.is_single_line() {
        return false;
    }
    let range = position.range();
    let (Some(before), Some(after)) = (source.get(..range.start), source.get(range.end..)) else {
        return false;
    };
    let line_prefix = before.rsplit('\n').next().unwrap_or_default();
    let line_suffix = after.split('\n').next().unwrap_or_default();
    line_prefix.trim().is_empty() && line_suffix.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_point_first_line() {
        let index = LineIndex::new("hello\nworld");
        assert_eq!(
            index.point(2),
            Point {
                line: 1,
                column: 3,
                offset: 2
            }
        );
    }

    #[test]
    fn test_point_after_newline() {
        let index = LineIndex::new("hello\nworld");
        assert_eq!(
            index.point(6),
            Point {
                line: 2,
                column: 1,
                offset: 6
            }
        );
    }

    #[test]
    fn test_point_counts_characters() {
        let index = LineIndex::new("中文ab");
        assert_eq!(index.point(6).column, 3);
    }

    #[test]
    fn test_point_clamps_to_end() {
        let index = LineIndex::new("ab");
        assert_eq!(index.point(10).offset, 2);
    }

    #[test]
    fn test_alone_on_line() {
        let source = "intro\n  [[Note]]  \nafter [[Note]]";
        let index = LineIndex::new(source);
        assert!(is_alone_on_line(source, &index.position(8..16)));
        assert!(!is_alone_on_line(source, &index.position(25..33)));
    }
}
