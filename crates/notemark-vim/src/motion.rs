//! Cursor motions.
//!
//! A motion maps a position to a target position. Horizontal motions step by grapheme cluster
//! and never leave the current line; word motions use vim's three character classes and treat an
//! empty line as a word of its own.

use notemark_core::{Document, Line};
use notemark_preview::{Key, KeyCode};
use unicode_segmentation::UnicodeSegmentation;

/// `w` versus `W` word boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordType {
    /// Letters, digits and `_` form words; other non-blanks form their own words.
    Word,
    /// Any run of non-blanks.
    BigWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Blank,
    Word,
    Punctuation,
}

pub(crate) fn char_class(ch: char, word_type: WordType) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else if word_type == WordType::BigWord || ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

/// A cursor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    /// `h`
    Left,
    /// `l`
    Right,
    /// `k`
    Up,
    /// `j`
    Down,
    /// `w` / `W`
    WordForward(WordType),
    /// `b` / `B`
    WordBackward(WordType),
    /// `e` / `E`
    WordEnd(WordType),
    /// `0`
    LineStart,
    /// `^`
    FirstNonBlank,
    /// `$`
    LineEnd,
    /// `gg`, or line `N` with a count.
    FirstLine,
    /// `G`, or line `N` with a count.
    LastLine,
}

/// How an operator treats the span covered by a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// Target character excluded.
    Exclusive,
    /// Target character included.
    Inclusive,
    /// Whole lines.
    Linewise,
}

impl Motion {
    /// Single-key motion bound to `key`. `gg` is assembled by the key parser.
    pub fn from_key(key: &Key) -> Option<Motion> {
        if !key.modifiers.is_plain() {
            return None;
        }
        let motion = match key.code {
            KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') => Motion::Left,
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => Motion::Right,
            KeyCode::Up | KeyCode::Char('k') => Motion::Up,
            KeyCode::Down | KeyCode::Char('j') => Motion::Down,
            KeyCode::Char('w') => Motion::WordForward(WordType::Word),
            KeyCode::Char('W') => Motion::WordForward(WordType::BigWord),
            KeyCode::Char('b') => Motion::WordBackward(WordType::Word),
            KeyCode::Char('B') => Motion::WordBackward(WordType::BigWord),
            KeyCode::Char('e') => Motion::WordEnd(WordType::Word),
            KeyCode::Char('E') => Motion::WordEnd(WordType::BigWord),
            KeyCode::Home | KeyCode::Char('0') => Motion::LineStart,
            KeyCode::Char('^') => Motion::FirstNonBlank,
            KeyCode::End | KeyCode::Char('$') => Motion::LineEnd,
            KeyCode::Char('G') => Motion::LastLine,
            _ => return None,
        };
        Some(motion)
    }

    /// Operator span kind.
    pub fn kind(&self) -> MotionKind {
        match self {
            Motion::Up | Motion::Down | Motion::FirstLine | Motion::LastLine => MotionKind::Linewise,
            Motion::WordEnd(_) | Motion::LineEnd => MotionKind::Inclusive,
            _ => MotionKind::Exclusive,
        }
    }

    /// Returns `true` for `j`/`k`, which keep a goal column.
    pub fn is_vertical(&self) -> bool {
        matches!(self, Motion::Up | Motion::Down)
    }

    /// Target of the motion from `pos`.
    ///
    /// `count` repeats relative motions and picks the line for `gg`/`G`. `goal_column` is the
    /// column vertical motions aim for; the current column when `None`.
    pub fn target(
        &self,
        doc: &Document,
        pos: usize,
        count: Option<usize>,
        goal_column: Option<usize>,
    ) -> usize {
        let n = count.unwrap_or(1).max(1);
        let last_line = doc.line_count().saturating_sub(1);
        match *self {
            Motion::Left => (0..n).fold(pos, |p, _| grapheme_left(doc, p)),
            Motion::Right => (0..n).fold(pos, |p, _| grapheme_right(doc, p)),
            Motion::Up | Motion::Down => {
                let line = doc.line_at(pos);
                let number = if *self == Motion::Up {
                    line.number.saturating_sub(n)
                } else {
                    (line.number + n).min(last_line)
                };
                let column = goal_column.unwrap_or(pos.saturating_sub(line.from));
                column_in_line(doc, number, column)
            }
            Motion::WordForward(word_type) => {
                (0..n).fold(pos, |p, _| word_forward(doc, p, word_type))
            }
            Motion::WordBackward(word_type) => {
                (0..n).fold(pos, |p, _| word_backward(doc, p, word_type))
            }
            Motion::WordEnd(word_type) => (0..n).fold(pos, |p, _| word_end(doc, p, word_type)),
            Motion::LineStart => doc.line_at(pos).from,
            Motion::FirstNonBlank => first_non_blank(&doc.line_at(pos)),
            Motion::LineEnd => {
                let number = (doc.line_at(pos).number + n - 1).min(last_line);
                line_or_end(doc, number).map_or(pos, |line| last_grapheme_start(&line))
            }
            Motion::FirstLine | Motion::LastLine => {
                let number = match (count, self) {
                    (Some(c), _) => c.saturating_sub(1).min(last_line),
                    (None, Motion::FirstLine) => 0,
                    (None, _) => last_line,
                };
                line_or_end(doc, number).map_or(pos, |line| first_non_blank(&line))
            }
        }
    }
}

fn line_or_end(doc: &Document, number: usize) -> Option<Line> {
    doc.line(number)
}

/// Char columns at which grapheme clusters start.
fn grapheme_starts(text: &str) -> Vec<usize> {
    let mut column = 0;
    text.graphemes(true)
        .map(|g| {
            let start = column;
            column += g.chars().count();
            start
        })
        .collect()
}

/// Start of the grapheme before `pos` on its line; `pos` itself at the line start.
pub(crate) fn grapheme_left(doc: &Document, pos: usize) -> usize {
    let line = doc.line_at(pos);
    let column = pos.saturating_sub(line.from);
    grapheme_starts(&line.text)
        .into_iter()
        .rev()
        .find(|&start| start < column)
        .map_or(pos, |start| line.from + start)
}

/// Start of the grapheme after `pos`, or the line end.
pub(crate) fn grapheme_right(doc: &Document, pos: usize) -> usize {
    let line = doc.line_at(pos);
    let column = pos.saturating_sub(line.from);
    grapheme_starts(&line.text)
        .into_iter()
        .find(|&start| start > column)
        .map_or(line.to, |start| line.from + start)
}

/// Start of the last grapheme on `line`; the line start when empty.
pub(crate) fn last_grapheme_start(line: &Line) -> usize {
    grapheme_starts(&line.text)
        .last()
        .map_or(line.from, |start| line.from + start)
}

/// First non-blank position on `line`, or the last character of an all-blank line.
pub(crate) fn first_non_blank(line: &Line) -> usize {
    match line.text.chars().position(|ch| !ch.is_whitespace()) {
        Some(column) => line.from + column,
        None => last_grapheme_start(line),
    }
}

fn column_in_line(doc: &Document, number: usize, column: usize) -> usize {
    let Some(line) = doc.line(number) else {
        return doc.len_chars();
    };
    if column >= line.len() {
        return line.to;
    }
    grapheme_starts(&line.text)
        .into_iter()
        .rev()
        .find(|&start| start <= column)
        .map_or(line.from, |start| line.from + start)
}

/// Keep a Normal-mode cursor on a character: never past the last grapheme of its line.
pub fn clamp_to_char(doc: &Document, pos: usize) -> usize {
    let pos = pos.min(doc.len_chars());
    let line = doc.line_at(pos);
    let column = pos.saturating_sub(line.from);
    grapheme_starts(&line.text)
        .into_iter()
        .rev()
        .find(|&start| start <= column)
        .map_or(line.from, |start| line.from + start)
}

/// End of the grapheme at `pos`; `pos` itself on a line break or at the buffer end.
pub(crate) fn inclusive_end(doc: &Document, pos: usize) -> usize {
    match doc.char_at(pos) {
        None | Some('\n') => pos,
        Some(_) => grapheme_right(doc, pos),
    }
}

fn is_empty_line_at(doc: &Document, pos: usize) -> bool {
    doc.char_at(pos) == Some('\n') && (pos == 0 || doc.char_at(pos - 1) == Some('\n'))
}

fn class_at(doc: &Document, pos: usize, word_type: WordType) -> CharClass {
    doc.char_at(pos)
        .map_or(CharClass::Blank, |ch| char_class(ch, word_type))
}

fn word_forward(doc: &Document, pos: usize, word_type: WordType) -> usize {
    let len = doc.len_chars();
    if pos >= len {
        return len;
    }
    let start = class_at(doc, pos, word_type);
    let mut p = pos;
    if start != CharClass::Blank {
        while p < len && class_at(doc, p, word_type) == start {
            p += 1;
        }
    }
    while p < len && class_at(doc, p, word_type) == CharClass::Blank {
        if p != pos && is_empty_line_at(doc, p) {
            return p;
        }
        p += 1;
    }
    p
}

fn word_backward(doc: &Document, pos: usize, word_type: WordType) -> usize {
    if pos == 0 {
        return 0;
    }
    let mut p = pos - 1;
    while p > 0 && class_at(doc, p, word_type) == CharClass::Blank {
        if is_empty_line_at(doc, p) {
            return p;
        }
        p -= 1;
    }
    let class = class_at(doc, p, word_type);
    if class == CharClass::Blank {
        return p;
    }
    while p > 0 && class_at(doc, p - 1, word_type) == class {
        p -= 1;
    }
    p
}

fn word_end(doc: &Document, pos: usize, word_type: WordType) -> usize {
    let len = doc.len_chars();
    if len == 0 {
        return 0;
    }
    let mut p = pos + 1;
    while p < len && class_at(doc, p, word_type) == CharClass::Blank {
        p += 1;
    }
    if p >= len {
        return len - 1;
    }
    let class = class_at(doc, p, word_type);
    while p + 1 < len && class_at(doc, p + 1, word_type) == class {
        p += 1;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn go(text: &str, pos: usize, motion: Motion, count: Option<usize>) -> usize {
        motion.target(&Document::new(text), pos, count, None)
    }

    #[test]
    fn test_word_motions() {
        let text = "foo.bar baz\n\nqux";
        let w = Motion::WordForward(WordType::Word);
        assert_eq!(go(text, 0, w, None), 3);
        assert_eq!(go(text, 3, w, None), 4);
        assert_eq!(go(text, 4, w, None), 8);
        assert_eq!(go(text, 8, w, None), 12);
        assert_eq!(go(text, 12, w, None), 13);
        assert_eq!(go(text, 0, Motion::WordForward(WordType::BigWord), None), 8);
        assert_eq!(go(text, 0, w, Some(3)), 8);

        let b = Motion::WordBackward(WordType::Word);
        assert_eq!(go(text, 13, b, None), 12);
        assert_eq!(go(text, 12, b, None), 8);
        assert_eq!(go(text, 8, b, None), 4);
        assert_eq!(go(text, 0, b, None), 0);

        let e = Motion::WordEnd(WordType::Word);
        assert_eq!(go(text, 0, e, None), 2);
        assert_eq!(go(text, 2, e, None), 3);
        assert_eq!(go(text, 8, e, None), 10);
        assert_eq!(go(text, 10, e, None), 15);
    }

    #[test]
    fn test_line_motions() {
        let text = "  indented\nshort";
        assert_eq!(go(text, 5, Motion::LineStart, None), 0);
        assert_eq!(go(text, 5, Motion::FirstNonBlank, None), 2);
        assert_eq!(go(text, 0, Motion::LineEnd, None), 9);
        assert_eq!(go(text, 0, Motion::LineEnd, Some(2)), 15);
        assert_eq!(go(text, 13, Motion::FirstLine, None), 2);
        assert_eq!(go(text, 0, Motion::LastLine, None), 11);
        assert_eq!(go(text, 13, Motion::LastLine, Some(1)), 2);
    }

    #[test]
    fn test_vertical_keeps_goal_column() {
        let doc = Document::new("abcdef\nab\nabcdef");
        assert_eq!(Motion::Down.target(&doc, 4, None, None), 9);
        assert_eq!(Motion::Down.target(&doc, 9, None, Some(4)), 14);
        assert_eq!(Motion::Up.target(&doc, 14, Some(5), Some(4)), 4);
        assert_eq!(Motion::Down.target(&doc, 14, None, None), 14);
    }

    #[test]
    fn test_horizontal_steps_graphemes_within_line() {
        let doc = Document::new("ae\u{301}x\nnext");
        assert_eq!(Motion::Right.target(&doc, 0, None, None), 1);
        assert_eq!(Motion::Right.target(&doc, 1, None, None), 3);
        assert_eq!(Motion::Left.target(&doc, 3, None, None), 1);
        assert_eq!(Motion::Right.target(&doc, 3, Some(5), None), 4);
        assert_eq!(Motion::Left.target(&doc, 5, None, None), 5);
        assert_eq!(clamp_to_char(&doc, 4), 3);
        assert_eq!(clamp_to_char(&doc, 2), 1);
    }

    #[test]
    fn test_motion_kinds() {
        assert_eq!(Motion::Down.kind(), MotionKind::Linewise);
        assert_eq!(Motion::LineEnd.kind(), MotionKind::Inclusive);
        assert_eq!(Motion::WordForward(WordType::Word).kind(), MotionKind::Exclusive);
        assert_eq!(Motion::from_key(&Key::char('G')), Some(Motion::LastLine));
        assert_eq!(Motion::from_key(&Key::ctrl('w')), None);
    }
}
