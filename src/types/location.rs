// src/types/location.rs
use crate::lexer::Span;
use serde::Serialize;

/// Resolved source range: 1-based lines and columns plus byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start: usize,
    pub end: usize,
}

/// A secondary location attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Related {
    pub location: Location,
    pub label: String,
}

/// Byte offset to line/column mapping for one source buffer.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Offset of the first byte of every line.
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts, len: text.len() }
    }

    /// 1-based line and column (in bytes) of `offset`.
    #[must_use]
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = self.starts.partition_point(|&s| s <= offset).max(1);
        (line, offset - self.starts[line - 1] + 1)
    }

    #[must_use]
    pub fn locate(&self, span: Span) -> Location {
        let (line, column) = self.position(span.start);
        let (end_line, end_column) = self.position(span.end);
        Location { line, column, end_line, end_column, start: span.start, end: span.end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let idx = LineIndex::new("ab\ncd\n");
        assert_eq!(idx.position(0), (1, 1));
        assert_eq!(idx.position(1), (1, 2));
        assert_eq!(idx.position(3), (2, 1));
        assert_eq!(idx.position(99), (3, 1));
    }

    #[test]
    fn locate_spans_lines() {
        let idx = LineIndex::new("int x;\nint y;");
        let loc = idx.locate(Span::new(4, 12, 1, 5));
        assert_eq!((loc.line, loc.column, loc.end_line, loc.end_column), (1, 5, 2, 6));
    }
}
