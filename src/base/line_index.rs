//! Line table for converting between byte offsets and line/column pairs.

use text_size::TextSize;
use thiserror::Error;

use super::Position;

/// A zero-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl From<Position> for LineCol {
    fn from(position: Position) -> Self {
        Self {
            line: position.line,
            col: position.column,
        }
    }
}

impl From<LineCol> for Position {
    fn from(line_col: LineCol) -> Self {
        Position::new(line_col.line, line_col.col)
    }
}

/// Why a line/column pair does not denote a location in a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionFault {
    #[error("line out of range: line {line} (zero-based) requested but file only has {line_count} lines")]
    LineOutOfRange { line: u32, line_count: u32 },
    #[error(
        "column beyond line end: character {column} (zero-based) is beyond line {line} boundary (zero-based, {line_len} bytes)"
    )]
    ColumnBeyondLineEnd {
        line: u32,
        column: u32,
        line_len: u32,
    },
}

/// Start offsets of every line of one file.
///
/// Lines are terminated by `\n`; a `\r` before it counts as an ordinary
/// column byte. A file ending in `\n` has a final empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &[u8]) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        for (i, byte) in text.iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(text_size(i + 1));
            }
        }
        Self {
            line_starts,
            len: text_size(text.len()),
        }
    }

    /// Total length of the indexed text in bytes.
    pub fn len(&self) -> TextSize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == TextSize::new(0)
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Length of `line` in bytes, excluding its terminating `\n`.
    pub fn line_len(&self, line: u32) -> Option<TextSize> {
        let start = *self.line_starts.get(line as usize)?;
        let end = match self.line_starts.get(line as usize + 1) {
            Some(next) => *next - TextSize::new(1),
            None => self.len,
        };
        Some(end - start)
    }

    /// Byte offset of a line/column pair.
    ///
    /// A column equal to the line length addresses the end of the line.
    pub fn offset(&self, line_col: LineCol) -> Result<TextSize, PositionFault> {
        let line_len = self
            .line_len(line_col.line)
            .ok_or(PositionFault::LineOutOfRange {
                line: line_col.line,
                line_count: self.line_count(),
            })?;
        if line_col.col > u32::from(line_len) {
            return Err(PositionFault::ColumnBeyondLineEnd {
                line: line_col.line,
                column: line_col.col,
                line_len: line_len.into(),
            });
        }
        Ok(self.line_starts[line_col.line as usize] + TextSize::new(line_col.col))
    }

    /// Line/column pair of a byte offset, or `None` past the end of the text.
    pub fn line_col(&self, offset: TextSize) -> Option<LineCol> {
        if offset > self.len {
            return None;
        }
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        Some(LineCol {
            line: line as u32,
            col: (offset - self.line_starts[line]).into(),
        })
    }
}

/// Byte offset of `position` inside `contents`.
pub fn offset_for_position(contents: &[u8], position: Position) -> Result<TextSize, PositionFault> {
    LineIndex::new(contents).offset(position.into())
}

fn text_size(len: usize) -> TextSize {
    TextSize::new(u32::try_from(len).unwrap_or(u32::MAX))
}
