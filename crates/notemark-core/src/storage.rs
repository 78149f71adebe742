//! Piece-table storage for the note buffer.
//!
//! The original note content lives in a read-only buffer; every insertion is appended to an
//! add buffer and spliced into the piece list. All public offsets are character offsets.

/// Which backing buffer a [`Piece`] points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Content the note was opened with.
    Original,
    /// Append-only buffer holding every inserted fragment.
    Add,
}

/// A contiguous fragment of one backing buffer.
#[derive(Debug, Clone)]
pub struct Piece {
    /// Backing buffer.
    pub kind: BufferKind,
    /// Byte offset of the fragment inside its buffer.
    pub start: usize,
    /// Byte length of the fragment.
    pub byte_len: usize,
    /// Number of chars in the fragment.
    pub char_len: usize,
}

impl Piece {
    fn new(kind: BufferKind, start: usize, byte_len: usize, char_len: usize) -> Self {
        Self {
            kind,
            start,
            byte_len,
            char_len,
        }
    }
}

/// Piece table holding the authoritative note text.
pub struct PieceTable {
    original: String,
    added: String,
    pieces: Vec<Piece>,
    ops_since_compact: usize,
    compact_threshold: usize,
}

impl PieceTable {
    /// Create a table over the initial note content.
    pub fn new(text: &str) -> Self {
        let pieces = if text.is_empty() {
            Vec::new()
        } else {
            vec![Piece::new(
                BufferKind::Original,
                0,
                text.len(),
                text.chars().count(),
            )]
        };

        Self {
            original: text.to_string(),
            added: String::new(),
            pieces,
            ops_since_compact: 0,
            compact_threshold: 1000,
        }
    }

    /// Create an empty table.
    pub fn empty() -> Self {
        Self::new("")
    }

    fn piece_str(&self, piece: &Piece) -> &str {
        let buffer = match piece.kind {
            BufferKind::Original => &self.original,
            BufferKind::Add => &self.added,
        };
        // Pieces are only ever split on char boundaries.
        &buffer[piece.start..piece.start + piece.byte_len]
    }

    /// Insert `text` at a char offset. Offsets past the end append.
    pub fn insert(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }

        let fragment = Piece::new(
            BufferKind::Add,
            self.added.len(),
            text.len(),
            text.chars().count(),
        );
        self.added.push_str(text);

        match self.locate(offset) {
            Some((idx, 0)) => self.pieces.insert(idx, fragment),
            Some((idx, within)) if within == self.pieces[idx].char_len => {
                self.pieces.insert(idx + 1, fragment)
            }
            Some((idx, within)) => {
                let (left, right) = self.split(&self.pieces[idx], within);
                self.pieces.splice(idx..=idx, [left, fragment, right]);
            }
            None => self.pieces.push(fragment),
        }

        self.coalesce();
        self.tick();
    }

    /// Delete `len` chars starting at `start`.
    pub fn delete(&mut self, start: usize, len: usize) {
        if len == 0 {
            return;
        }

        let end = start + len;
        let (Some((first, first_off)), Some((last, last_off))) =
            (self.locate(start), self.locate(end))
        else {
            return;
        };

        let mut kept = Vec::with_capacity(2);
        if first_off > 0 {
            kept.push(self.split(&self.pieces[first], first_off).0);
        }
        if last_off < self.pieces[last].char_len {
            kept.push(self.split(&self.pieces[last], last_off).1);
        }
        self.pieces.splice(first..=last, kept);
        self.pieces.retain(|p| p.char_len > 0);

        self.tick();
    }

    /// Full text.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.byte_count());
        for piece in &self.pieces {
            out.push_str(self.piece_str(piece));
        }
        out
    }

    /// Text in the char range `start..start + len`.
    pub fn range(&self, start: usize, len: usize) -> String {
        let end = start + len;
        let mut out = String::new();
        let mut cursor = 0;

        for piece in &self.pieces {
            let piece_end = cursor + piece.char_len;
            if cursor >= end {
                break;
            }
            if piece_end > start {
                let skip = start.saturating_sub(cursor);
                let take = end.min(piece_end) - cursor.max(start);
                out.extend(self.piece_str(piece).chars().skip(skip).take(take));
            }
            cursor = piece_end;
        }

        out
    }

    /// Total char count.
    pub fn char_count(&self) -> usize {
        self.pieces.iter().map(|p| p.char_len).sum()
    }

    /// Total byte count.
    pub fn byte_count(&self) -> usize {
        self.pieces.iter().map(|p| p.byte_len).sum()
    }

    /// Number of pieces currently spliced into the table.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Size of the add buffer in bytes.
    pub fn add_buffer_len(&self) -> usize {
        self.added.len()
    }

    /// Returns `(piece index, char offset inside the piece)` for a document offset.
    fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let mut cursor = 0;
        for (idx, piece) in self.pieces.iter().enumerate() {
            if offset <= cursor + piece.char_len {
                return Some((idx, offset - cursor));
            }
            cursor += piece.char_len;
        }
        self.pieces
            .last()
            .map(|last| (self.pieces.len() - 1, last.char_len))
    }

    fn split(&self, piece: &Piece, at_char: usize) -> (Piece, Piece) {
        let at_byte = self
            .piece_str(piece)
            .char_indices()
            .nth(at_char)
            .map(|(i, _)| i)
            .unwrap_or(piece.byte_len);

        (
            Piece::new(piece.kind, piece.start, at_byte, at_char),
            Piece::new(
                piece.kind,
                piece.start + at_byte,
                piece.byte_len - at_byte,
                piece.char_len - at_char,
            ),
        )
    }

    /// Merge neighbouring add-buffer pieces that are contiguous in the add buffer.
    fn coalesce(&mut self) {
        let mut i = 0;
        while i + 1 < self.pieces.len() {
            let (a, b) = (&self.pieces[i], &self.pieces[i + 1]);
            if a.kind == BufferKind::Add && b.kind == BufferKind::Add && a.start + a.byte_len == b.start
            {
                let merged = Piece::new(
                    BufferKind::Add,
                    a.start,
                    a.byte_len + b.byte_len,
                    a.char_len + b.char_len,
                );
                self.pieces.splice(i..=i + 1, [merged]);
            } else {
                i += 1;
            }
        }
    }

    /// Drop add-buffer bytes no piece references any more.
    pub fn compact(&mut self) {
        let mut compacted = String::new();
        let mut pieces = std::mem::take(&mut self.pieces);
        for piece in &mut pieces {
            if piece.kind != BufferKind::Add {
                continue;
            }
            let start = compacted.len();
            compacted.push_str(&self.added[piece.start..piece.start + piece.byte_len]);
            piece.start = start;
        }
        self.pieces = pieces;
        self.added = compacted;
        self.ops_since_compact = 0;
    }

    fn tick(&mut self) {
        self.ops_since_compact += 1;
        if self.ops_since_compact >= self.compact_threshold {
            self.compact();
        }
    }

    /// Number of edits between automatic compactions.
    pub fn set_compact_threshold(&mut self, threshold: usize) {
        self.compact_threshold = threshold.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_empty() {
        let table = PieceTable::new("# Groceries");
        assert_eq!(table.text(), "# Groceries");
        assert_eq!(table.char_count(), 11);

        let empty = PieceTable::empty();
        assert_eq!(empty.text(), "");
        assert_eq!(empty.piece_count(), 0);
    }

    #[test]
    fn test_insert_positions() {
        let mut table = PieceTable::new("milk");
        table.insert(0, "- ");
        table.insert(6, " and eggs");
        table.insert(2, "[ ] ");
        assert_eq!(table.text(), "- [ ] milk and eggs");
    }

    #[test]
    fn test_delete_spanning_pieces() {
        let mut table = PieceTable::new("**bold** text");
        table.insert(8, " more");
        table.delete(0, 2);
        assert_eq!(table.text(), "bold** more text");
        table.delete(4, 7);
        assert_eq!(table.text(), "bold text");
    }

    #[test]
    fn test_unicode_offsets() {
        let mut table = PieceTable::new("שלום world");
        table.insert(4, " 👋");
        assert_eq!(table.text(), "שלום 👋 world");
        assert_eq!(table.range(5, 1), "👋");
        table.delete(0, 5);
        assert_eq!(table.text(), "👋 world");
    }

    #[test]
    fn test_range() {
        let table = PieceTable::new("==highlight==");
        assert_eq!(table.range(0, 2), "==");
        assert_eq!(table.range(2, 9), "highlight");
        assert_eq!(table.range(11, 10), "==");
    }

    #[test]
    fn test_adjacent_inserts_coalesce() {
        let mut table = PieceTable::new("a");
        table.insert(1, "b");
        table.insert(2, "c");
        table.insert(3, "d");
        assert_eq!(table.text(), "abcd");
        assert_eq!(table.piece_count(), 2);
    }

    #[test]
    fn test_compact_keeps_content() {
        let mut table = PieceTable::new("note");
        table.insert(4, " draft");
        table.insert(10, "!");
        let before = table.add_buffer_len();
        table.delete(4, 6);
        table.compact();
        assert_eq!(table.text(), "note!");
        assert!(table.add_buffer_len() < before);
    }

    #[test]
    fn test_automatic_compaction() {
        let mut table = PieceTable::new("x");
        table.set_compact_threshold(5);
        for i in 0..4 {
            table.insert(1 + i, "y");
        }
        table.delete(1, 2);
        assert_eq!(table.text(), "xyy");
        assert_eq!(table.add_buffer_len(), 2);
    }
}
