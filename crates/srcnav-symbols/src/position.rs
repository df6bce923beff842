//! Byte offset to 1-based line/column mapping.

use memchr::{memchr_iter, memrchr};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Line is one more than the number of newlines before `offset`; column is
/// the distance from the preceding newline (or from one before the start of
/// the text on the first line).
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let before = &text.as_bytes()[..offset.min(text.len())];
    let line = memchr_iter(b'\n', before).count() + 1;
    let column = match memrchr(b'\n', before) {
        Some(newline) => before.len() - newline,
        None => before.len() + 1,
    };
    Position { line, column }
}

/// Precomputed line starts for repeated lookups into the same text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr_iter(b'\n', text.as_bytes()).map(|newline| newline + 1));
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset);
        Position {
            line,
            column: offset - self.line_starts[line - 1] + 1,
        }
    }

    /// Byte offset of a 1-based position, clamped to the end of its line.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let start = *self.line_starts.get(position.line.checked_sub(1)?)?;
        let line_end = self
            .line_starts
            .get(position.line)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        let column = position.column.max(1) - 1;
        Some((start + column).min(line_end))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
