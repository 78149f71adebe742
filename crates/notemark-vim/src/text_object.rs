//! Text objects: `iw aw i" a" i' a' i( a( ib i{ a{ iB` and friends.

use notemark_core::Document;
use notemark_preview::{Key, KeyCode};

use crate::motion::{CharClass, WordType, char_class};

/// A text object selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextObject {
    /// Word under the cursor; `around` adds the adjoining blanks.
    Word {
        /// `a` instead of `i`.
        around: bool,
        /// `w` or `W`.
        word_type: WordType,
    },
    /// Quoted string on the cursor line; `around` includes the quotes.
    Quote {
        /// `a` instead of `i`.
        around: bool,
        /// Quote character.
        quote: char,
    },
    /// Bracketed block; `around` includes the brackets.
    Bracket {
        /// `a` instead of `i`.
        around: bool,
        /// Opening bracket.
        open: char,
        /// Closing bracket.
        close: char,
    },
}

impl TextObject {
    /// Object named by the key after `i` / `a`.
    pub fn from_key(around: bool, key: &Key) -> Option<TextObject> {
        let KeyCode::Char(ch) = key.code else {
            return None;
        };
        let bracket = |open, close| TextObject::Bracket {
            around,
            open,
            close,
        };
        Some(match ch {
            'w' => TextObject::Word {
                around,
                word_type: WordType::Word,
            },
            'W' => TextObject::Word {
                around,
                word_type: WordType::BigWord,
            },
            '"' | '\'' | '`' => TextObject::Quote { around, quote: ch },
            '(' | ')' | 'b' => bracket('(', ')'),
            '{' | '}' | 'B' => bracket('{', '}'),
            '[' | ']' => bracket('[', ']'),
            '<' | '>' => bracket('<', '>'),
            _ => return None,
        })
    }

    /// `(from, to)` span of the object at `pos`; `count` selects enclosing brackets.
    pub fn range(&self, doc: &Document, pos: usize, count: usize) -> Option<(usize, usize)> {
        match *self {
            TextObject::Word { around, word_type } => word_range(doc, pos, around, word_type),
            TextObject::Quote { around, quote } => quote_range(doc, pos, around, quote),
            TextObject::Bracket {
                around,
                open,
                close,
            } => {
                let mut from = find_open(doc, pos, open, close)?;
                for _ in 1..count.max(1) {
                    from = find_open(doc, from.checked_sub(1)?, open, close)?;
                }
                let to = find_close(doc, from, open, close)?;
                Some(if around {
                    (from, to + 1)
                } else {
                    (from + 1, to)
                })
            }
        }
    }
}

fn is_inline_blank(ch: Option<char>) -> bool {
    matches!(ch, Some(c) if c != '\n' && c.is_whitespace())
}

fn word_range(
    doc: &Document,
    pos: usize,
    around: bool,
    word_type: WordType,
) -> Option<(usize, usize)> {
    let len = doc.len_chars();
    let ch = doc.char_at(pos).filter(|&c| c != '\n')?;
    let class = char_class(ch, word_type);
    let same = |p: usize| matches!(doc.char_at(p), Some(c) if c != '\n' && char_class(c, word_type) == class);

    let mut from = pos;
    while from > 0 && same(from - 1) {
        from -= 1;
    }
    let mut to = pos;
    while to < len && same(to) {
        to += 1;
    }
    if !around {
        return Some((from, to));
    }

    if class == CharClass::Blank {
        // Blanks plus the word after them.
        if let Some(next) = doc.char_at(to).filter(|&c| c != '\n') {
            let next_class = char_class(next, word_type);
            while matches!(doc.char_at(to), Some(c) if c != '\n' && char_class(c, word_type) == next_class)
            {
                to += 1;
            }
        }
        return Some((from, to));
    }

    let mut trailing = to;
    while is_inline_blank(doc.char_at(trailing)) {
        trailing += 1;
    }
    if trailing > to {
        return Some((from, trailing));
    }
    while from > 0 && is_inline_blank(doc.char_at(from - 1)) {
        from -= 1;
    }
    Some((from, to))
}

fn quote_range(doc: &Document, pos: usize, around: bool, quote: char) -> Option<(usize, usize)> {
    let line = doc.line_at(pos);
    let chars: Vec<char> = line.text.chars().collect();
    let column = pos.saturating_sub(line.from);

    let mut quotes = Vec::new();
    for (i, &ch) in chars.iter().enumerate() {
        if ch == quote && (i == 0 || chars[i - 1] != '\\') {
            quotes.push(i);
        }
    }
    let pairs: Vec<(usize, usize)> = quotes.chunks_exact(2).map(|p| (p[0], p[1])).collect();
    let (open, close) = pairs
        .iter()
        .find(|&&(open, close)| open <= column && column <= close)
        .or_else(|| pairs.iter().find(|&&(open, _)| open > column))
        .copied()?;

    Some(if around {
        (line.from + open, line.from + close + 1)
    } else {
        (line.from + open + 1, line.from + close)
    })
}

fn find_open(doc: &Document, pos: usize, open: char, close: char) -> Option<usize> {
    if doc.char_at(pos) == Some(open) {
        return Some(pos);
    }
    let mut depth = 0usize;
    let mut p = pos;
    while p > 0 {
        p -= 1;
        match doc.char_at(p) {
            Some(c) if c == close => depth += 1,
            Some(c) if c == open => {
                if depth == 0 {
                    return Some(p);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

fn find_close(doc: &Document, open_pos: usize, open: char, close: char) -> Option<usize> {
    let len = doc.len_chars();
    let mut depth = 0usize;
    for p in open_pos + 1..len {
        match doc.char_at(p) {
            Some(c) if c == open => depth += 1,
            Some(c) if c == close => {
                if depth == 0 {
                    return Some(p);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}
