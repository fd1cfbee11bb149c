use serde::Deserialize;
use serde::Serialize;

use crate::file_id::FileId;

/// A byte offset into a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(pub u32);

impl From<u32> for Position {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A half-open byte range `[start, end)` within a specific file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file_id: FileId,
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(file_id: FileId, start: impl Into<Position>, end: impl Into<Position>) -> Self {
        Self { file_id, start: start.into(), end: end.into() }
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end.0 <= self.start.0
    }

    /// Translates the span's start offset into a 1-based line and 0-based column.
    #[must_use]
    pub fn line_and_column(&self, text: &str) -> (u32, u32) {
        offset_to_line_and_column(text, self.start.0)
    }
}

impl PartialOrd for Span {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Span {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.start, self.end).cmp(&(other.start, other.end))
    }
}

/// Computes a 1-based line number and 0-based column for a byte offset by
/// counting newlines up to that offset.
#[must_use]
pub fn offset_to_line_and_column(text: &str, offset: u32) -> (u32, u32) {
    let offset = offset as usize;
    let bounded = offset.min(text.len());
    let mut line = 1u32;
    let mut last_newline = None;

    for (idx, byte) in text.as_bytes()[..bounded].iter().enumerate() {
        if *byte == b'\n' {
            line += 1;
            last_newline = Some(idx);
        }
    }

    let column = match last_newline {
        Some(idx) => (bounded - idx - 1) as u32,
        None => bounded as u32,
    };

    (line, column)
}

/// Returns `true` if, after trimming leading whitespace, `line` begins a
/// single-line (`//`) or block (`/*`, `*`) comment.
///
/// Deliberately conservative: a trailing comment to the right of real code
/// on the same line is not detected.
#[must_use]
pub fn line_starts_with_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}
