//! Rope-backed line index.
//!
//! Mirrors the piece table and answers line/offset queries in O(log N).

use ropey::Rope;

/// A logical line of the note (without its trailing `\n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Zero-based line number.
    pub number: usize,
    /// Char offset of the first character.
    pub from: usize,
    /// Char offset just past the last character (before the line break).
    pub to: usize,
    /// Line content.
    pub text: String,
}

impl Line {
    /// Length in chars, excluding the line break.
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    /// Returns `true` for a zero-length line.
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// Returns `true` when the line holds only whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Line index kept in sync with the piece table.
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    /// Build the index from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Insert text at a char offset.
    pub fn insert(&mut self, char_offset: usize, text: &str) {
        let at = char_offset.min(self.rope.len_chars());
        self.rope.insert(at, text);
    }

    /// Remove `len` chars at `char_offset`.
    pub fn delete(&mut self, char_offset: usize, len: usize) {
        let total = self.rope.len_chars();
        let start = char_offset.min(total);
        let end = (char_offset + len).min(total);
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Number of logical lines. An empty note has one line.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total chars.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Line containing `char_offset` (clamped).
    pub fn line_of(&self, char_offset: usize) -> usize {
        self.rope.char_to_line(char_offset.min(self.rope.len_chars()))
    }

    /// Line descriptor for line `number`, or `None` if out of range.
    pub fn line(&self, number: usize) -> Option<Line> {
        if number >= self.rope.len_lines() {
            return None;
        }

        let from = self.rope.line_to_char(number);
        let mut text = self.rope.line(number).to_string();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        let to = from + text.chars().count();

        Some(Line {
            number,
            from,
            to,
            text,
        })
    }

    /// `(line, column)` for a char offset.
    pub fn char_offset_to_position(&self, char_offset: usize) -> (usize, usize) {
        let offset = char_offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        (line, offset - self.rope.line_to_char(line))
    }

    /// Char offset for `(line, column)`, clamping the column to the line length.
    pub fn position_to_char_offset(&self, line: usize, column: usize) -> usize {
        match self.line(line) {
            Some(l) => l.from + column.min(l.len()),
            None => self.rope.len_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines() {
        let index = LineIndex::from_text("# Title\n\nbody\n");
        assert_eq!(index.line_count(), 4);

        let first = index.line(0).expect("line 0");
        assert_eq!((first.from, first.to), (0, 7));
        assert_eq!(first.text, "# Title");

        let blank = index.line(1).expect("line 1");
        assert!(blank.is_empty());

        let last = index.line(3).expect("line 3");
        assert_eq!((last.from, last.to), (14, 14));
        assert!(index.line(4).is_none());
    }

    #[test]
    fn test_crlf_is_stripped() {
        let index = LineIndex::from_text("a\r\nb");
        let line = index.line(0).expect("line 0");
        assert_eq!(line.text, "a");
        assert_eq!(line.to, 1);
    }

    #[test]
    fn test_positions() {
        let index = LineIndex::from_text("ab\ncdé\nf");
        assert_eq!(index.char_offset_to_position(4), (1, 1));
        assert_eq!(index.char_offset_to_position(100), (2, 1));
        assert_eq!(index.position_to_char_offset(1, 10), 6);
        assert_eq!(index.line_of(3), 1);
    }

    #[test]
    fn test_edits() {
        let mut index = LineIndex::from_text("one\ntwo");
        index.insert(3, "\nmid");
        assert_eq!(index.line_count(), 3);
        index.delete(0, 4);
        assert_eq!(index.line(0).expect("line 0").text, "mid");
    }
}
