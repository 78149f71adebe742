//! The note buffer: piece table for edits, rope index for lines.

use crate::changes::ChangeSet;
use crate::error::CoreError;
use crate::line_index::{Line, LineIndex};
use crate::storage::PieceTable;

/// Authoritative text of one open note.
pub struct Document {
    piece_table: PieceTable,
    line_index: LineIndex,
}

impl Document {
    /// Create a buffer from initial content.
    pub fn new(text: &str) -> Self {
        Self {
            piece_table: PieceTable::new(text),
            line_index: LineIndex::from_text(text),
        }
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.piece_table.text()
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.line_index.char_count()
    }

    /// Returns `true` for an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Text between two char offsets (clamped, order-insensitive).
    pub fn slice(&self, from: usize, to: usize) -> String {
        let (from, to) = (from.min(to), from.max(to));
        let to = to.min(self.len_chars());
        if from >= to {
            return String::new();
        }
        self.piece_table.range(from, to - from)
    }

    /// Char at `pos`.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        if pos >= self.len_chars() {
            return None;
        }
        self.piece_table.range(pos, 1).chars().next()
    }

    /// Number of lines (an empty note has one).
    pub fn line_count(&self) -> usize {
        self.line_index.line_count()
    }

    /// Line `number`, or `None` when out of range.
    pub fn line(&self, number: usize) -> Option<Line> {
        self.line_index.line(number)
    }

    /// Line containing `pos` (clamped to the buffer).
    pub fn line_at(&self, pos: usize) -> Line {
        let number = self.line_index.line_of(pos);
        self.line_index.line(number).unwrap_or(Line {
            number,
            from: self.len_chars(),
            to: self.len_chars(),
            text: String::new(),
        })
    }

    /// `(line, column)` of a char offset.
    pub fn position(&self, pos: usize) -> (usize, usize) {
        self.line_index.char_offset_to_position(pos)
    }

    /// Char offset of `(line, column)`; the column is clamped to the line.
    pub fn offset(&self, line: usize, column: usize) -> usize {
        self.line_index.position_to_char_offset(line, column)
    }

    /// Apply a change set. Nothing is modified when validation fails.
    pub fn apply(&mut self, changes: &ChangeSet) -> Result<(), CoreError> {
        changes.check(self.len_chars())?;

        // Back to front so earlier offsets stay valid.
        for change in changes.changes().iter().rev() {
            if change.to > change.from {
                self.piece_table.delete(change.from, change.to - change.from);
                self.line_index.delete(change.from, change.to - change.from);
            }
            if !change.insert.is_empty() {
                self.piece_table.insert(change.from, &change.insert);
                self.line_index.insert(change.from, &change.insert);
            }
        }

        debug_assert_eq!(self.piece_table.char_count(), self.line_index.char_count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::Change;

    #[test]
    fn test_queries() {
        let doc = Document::new("# Title\n> quote\n");
        assert_eq!(doc.len_chars(), 16);
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.slice(2, 7), "Title");
        assert_eq!(doc.char_at(8), Some('>'));
        assert_eq!(doc.char_at(16), None);
        assert_eq!(doc.line_at(10).text, "> quote");
        assert_eq!(doc.line_at(16).from, 16);
    }

    #[test]
    fn test_apply_keeps_index_in_sync() {
        let mut doc = Document::new("a\nb\nc");
        let changes = ChangeSet::of(vec![
            Change::new(0, 1, "first\nline"),
            Change::new(4, 5, "C"),
        ])
        .expect("valid");
        doc.apply(&changes).expect("apply");
        assert_eq!(doc.text(), "first\nline\nb\nC");
        assert_eq!(doc.line_count(), 4);
        assert_eq!(doc.line(3).map(|l| l.from), Some(13));
    }

    #[test]
    fn test_apply_rejects_out_of_bounds() {
        let mut doc = Document::new("abc");
        assert!(doc.apply(&ChangeSet::insert(4, "x")).is_err());
        assert_eq!(doc.text(), "abc");
    }
}
