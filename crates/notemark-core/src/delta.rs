//! Structured text deltas carried by change notifications.
//!
//! A [`TextDelta`] lets incremental consumers (the syntax cache, widget remapping, hosts that
//! mirror the buffer) follow an edit without diffing old and new text. Offsets are chars.

/// A single edit in a [`TextDelta`].
///
/// `start` is a char offset in the document *at the time this edit is applied*; edits must be
/// applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDeltaEdit {
    /// Start char offset.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl TextDeltaEdit {
    /// Length of `deleted_text` in chars.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in chars.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end char offset before the edit.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }
}

/// Ordered edits turning the "before" document into the "after" document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    /// Char count before applying `edits`.
    pub before_char_count: usize,
    /// Char count after applying `edits`.
    pub after_char_count: usize,
    /// Edits, in application order.
    pub edits: Vec<TextDeltaEdit>,
    /// Undo group the change was recorded in, if it entered the history.
    pub undo_group_id: Option<usize>,
}

impl TextDelta {
    /// Returns `true` if this delta contains no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Replay the edits on a mirror of the "before" text. Returns `None` when `before` does not
    /// match the deleted text of some edit.
    pub fn apply(&self, before: &str) -> Option<String> {
        let mut chars: Vec<char> = before.chars().collect();
        for edit in &self.edits {
            let end = edit.end();
            let matches = end <= chars.len()
                && chars[edit.start..end]
                    .iter()
                    .copied()
                    .eq(edit.deleted_text.chars());
            if !matches {
                return None;
            }
            chars.splice(edit.start..end, edit.inserted_text.chars());
        }
        Some(chars.into_iter().collect())
    }

    /// Smallest `(from, to)` range of the "after" text covering every edit, or `None` when empty.
    pub fn touched_range(&self) -> Option<(usize, usize)> {
        let mut range: Option<(usize, usize)> = None;
        for edit in &self.edits {
            let shift = edit.inserted_len() as isize - edit.deleted_len() as isize;
            range = Some(match range {
                None => (edit.start, edit.start + edit.inserted_len()),
                Some((from, to)) => {
                    let to = if to > edit.start {
                        (to as isize + shift).max(edit.start as isize) as usize
                    } else {
                        to
                    };
                    let from = from.min(edit.start);
                    (from, to.max(edit.start + edit.inserted_len()))
                }
            });
        }
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: usize, deleted: &str, inserted: &str) -> TextDeltaEdit {
        TextDeltaEdit {
            start,
            deleted_text: deleted.to_string(),
            inserted_text: inserted.to_string(),
        }
    }

    #[test]
    fn test_apply_replays_edits_in_order() {
        let delta = TextDelta {
            before_char_count: 9,
            after_char_count: 13,
            edits: vec![edit(0, "", "**"), edit(6, "", "**"), edit(12, "x", "y")],
            undo_group_id: None,
        };
        assert_eq!(delta.apply("say hi x").as_deref(), None);
        assert_eq!(delta.apply("say hi  x").as_deref(), Some("**say **hi  y"));
    }

    #[test]
    fn test_touched_range() {
        let delta = TextDelta {
            before_char_count: 5,
            after_char_count: 7,
            edits: vec![edit(1, "", "ab"), edit(5, "c", "")],
            undo_group_id: None,
        };
        assert_eq!(delta.touched_range(), Some((1, 5)));
        let empty = TextDelta {
            before_char_count: 0,
            after_char_count: 0,
            edits: Vec::new(),
            undo_group_id: None,
        };
        assert_eq!(empty.touched_range(), None);
    }
}
