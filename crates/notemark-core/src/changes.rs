//! Change sets: ordered, non-overlapping replacements in pre-change coordinates.

use crate::delta::{TextDelta, TextDeltaEdit};
use crate::error::CoreError;
use crate::text::{char_len, char_to_byte, slice_chars};

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before text inserted at the position.
    Before,
    /// Move past text inserted at the position.
    After,
}

/// Replace `from..to` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Start char offset (pre-change).
    pub from: usize,
    /// End char offset (pre-change, exclusive).
    pub to: usize,
    /// Replacement text.
    pub insert: String,
}

impl Change {
    /// Build a change.
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }

    /// Inserted length in chars.
    pub fn insert_len(&self) -> usize {
        char_len(&self.insert)
    }

    /// Deleted length in chars.
    pub fn delete_len(&self) -> usize {
        self.to - self.from
    }

    fn len_diff(&self) -> isize {
        self.insert_len() as isize - self.delete_len() as isize
    }
}

/// An ordered set of non-overlapping changes against one document revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// No changes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert `text` at `pos`.
    pub fn insert(pos: usize, text: impl Into<String>) -> Self {
        Self::single(Change::new(pos, pos, text))
    }

    /// Delete `from..to`.
    pub fn delete(from: usize, to: usize) -> Self {
        Self::single(Change::new(from.min(to), from.max(to), ""))
    }

    /// Replace `from..to` with `text`.
    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self::single(Change::new(from.min(to), from.max(to), text))
    }

    fn single(change: Change) -> Self {
        if change.from == change.to && change.insert.is_empty() {
            return Self::empty();
        }
        Self {
            changes: vec![change],
        }
    }

    /// Build from arbitrary changes; sorts them and rejects overlaps.
    pub fn of(mut changes: Vec<Change>) -> Result<Self, CoreError> {
        changes.retain(|c| c.from != c.to || !c.insert.is_empty());
        changes.sort_by_key(|c| (c.from, c.to));

        for change in &changes {
            if change.from > change.to {
                return Err(CoreError::InvalidRange {
                    from: change.from,
                    to: change.to,
                    len: change.to,
                });
            }
        }
        for pair in changes.windows(2) {
            if pair[1].from < pair[0].to {
                return Err(CoreError::OverlappingChanges { at: pair[1].from });
            }
        }

        Ok(Self { changes })
    }

    /// The changes, sorted by position.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Returns `true` if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Validate against a document of `len` chars.
    pub fn check(&self, len: usize) -> Result<(), CoreError> {
        match self.changes.last() {
            Some(last) if last.to > len => Err(CoreError::InvalidRange {
                from: last.from,
                to: last.to,
                len,
            }),
            _ => Ok(()),
        }
    }

    /// Apply to a string.
    pub fn apply(&self, text: &str) -> Result<String, CoreError> {
        self.check(char_len(text))?;

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for change in &self.changes {
            let from = char_to_byte(text, change.from);
            out.push_str(&text[cursor..from]);
            out.push_str(&change.insert);
            cursor = char_to_byte(text, change.to);
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }

    /// The change set undoing `self`, given the text it was applied to.
    pub fn invert(&self, before: &str) -> ChangeSet {
        self.invert_with(|from, to| slice_chars(before, from, to).to_string())
    }

    /// Like [`ChangeSet::invert`], reading deleted text through a callback.
    pub fn invert_with(&self, mut deleted: impl FnMut(usize, usize) -> String) -> ChangeSet {
        let mut offset: isize = 0;
        let changes = self
            .changes
            .iter()
            .map(|change| {
                let from = (change.from as isize + offset) as usize;
                offset += change.len_diff();
                Change::new(from, from + change.insert_len(), deleted(change.from, change.to))
            })
            .collect();
        ChangeSet { changes }
    }

    /// Map a pre-change position into post-change coordinates.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        let mut offset: isize = 0;

        for change in &self.changes {
            if change.from > pos {
                break;
            }
            if change.to < pos || (change.to == pos && change.from < change.to) {
                offset += change.len_diff();
                continue;
            }

            let start = (change.from as isize + offset) as usize;
            if change.from == change.to {
                match assoc {
                    Assoc::Before => return start,
                    Assoc::After => {
                        offset += change.len_diff();
                        continue;
                    }
                }
            }

            // Inside a replaced range.
            return match assoc {
                Assoc::Before => start,
                Assoc::After => start + change.insert_len(),
            };
        }

        (pos as isize + offset).max(0) as usize
    }

    /// Returns `true` if any change touches `from..=to`.
    pub fn touches(&self, from: usize, to: usize) -> bool {
        self.changes.iter().any(|c| c.from <= to && c.to >= from)
    }

    /// Document length after applying to a document of `old_len` chars.
    pub fn new_len(&self, old_len: usize) -> usize {
        let diff: isize = self.changes.iter().map(Change::len_diff).sum();
        (old_len as isize + diff).max(0) as usize
    }

    /// Structured delta describing these changes against `before`.
    pub fn to_delta(&self, before: &str) -> TextDelta {
        self.to_delta_with(char_len(before), |from, to| {
            slice_chars(before, from, to).to_string()
        })
    }

    /// Like [`ChangeSet::to_delta`], reading deleted text through a callback.
    pub fn to_delta_with(
        &self,
        before_len: usize,
        mut deleted: impl FnMut(usize, usize) -> String,
    ) -> TextDelta {
        let mut offset: isize = 0;
        let edits = self
            .changes
            .iter()
            .map(|change| {
                let start = (change.from as isize + offset) as usize;
                offset += change.len_diff();
                TextDeltaEdit {
                    start,
                    deleted_text: deleted(change.from, change.to),
                    inserted_text: change.insert.clone(),
                }
            })
            .collect();

        TextDelta {
            before_char_count: before_len,
            after_char_count: self.new_len(before_len),
            edits,
            undo_group_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_apply_multiple() {
        let changes = ChangeSet::of(vec![
            Change::new(4, 4, "**"),
            Change::new(0, 0, "**"),
        ])
        .expect("valid");
        assert_eq!(changes.apply("bold x").expect("apply"), "**bold** x");
    }

    #[test]
    fn test_overlap_rejected() {
        let err = ChangeSet::of(vec![Change::new(0, 4, ""), Change::new(2, 6, "x")]);
        assert_eq!(err, Err(CoreError::OverlappingChanges { at: 2 }));
    }

    #[test]
    fn test_out_of_bounds() {
        let changes = ChangeSet::delete(2, 9);
        assert!(matches!(
            changes.apply("abc"),
            Err(CoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_invert() {
        let before = "==mark== tail";
        let changes = ChangeSet::of(vec![Change::new(0, 2, ""), Change::new(6, 8, "")])
            .expect("valid");
        let after = changes.apply(before).expect("apply");
        assert_eq!(after, "mark tail");
        let inverse = changes.invert(before);
        assert_eq!(inverse.apply(&after).expect("apply"), before);
    }

    #[test]
    fn test_map_pos() {
        let changes = ChangeSet::insert(3, "xy");
        assert_eq!(changes.map_pos(1, Assoc::Before), 1);
        assert_eq!(changes.map_pos(3, Assoc::Before), 3);
        assert_eq!(changes.map_pos(3, Assoc::After), 5);
        assert_eq!(changes.map_pos(4, Assoc::Before), 6);

        let replace = ChangeSet::replace(2, 6, "z");
        assert_eq!(replace.map_pos(2, Assoc::Before), 2);
        assert_eq!(replace.map_pos(4, Assoc::After), 3);
        assert_eq!(replace.map_pos(6, Assoc::Before), 3);
        assert_eq!(replace.map_pos(8, Assoc::Before), 5);
    }

    #[test]
    fn test_touches() {
        let changes = ChangeSet::replace(4, 6, "");
        assert!(changes.touches(6, 9));
        assert!(changes.touches(0, 4));
        assert!(!changes.touches(7, 9));
    }

    #[test]
    fn test_delta() {
        let changes =
            ChangeSet::of(vec![Change::new(0, 1, "AB"), Change::new(3, 4, "")]).expect("valid");
        let delta = changes.to_delta("abcd");
        assert_eq!(delta.before_char_count, 4);
        assert_eq!(delta.after_char_count, 4);
        assert_eq!(delta.edits[1].start, 4);
        assert_eq!(delta.edits[1].deleted_text, "d");
    }

    #[test]
    fn test_random_invert_model() {
        let mut rng = rand::thread_rng();
        let alphabet: Vec<char> = "ab*=~\n é".chars().collect();

        for _ in 0..200 {
            let len = rng.gen_range(0..20);
            let before: String = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            let from = rng.gen_range(0..=len);
            let to = rng.gen_range(from..=len);
            let insert: String = (0..rng.gen_range(0..4))
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            let changes = ChangeSet::replace(from, to, insert);
            let after = changes.apply(&before).expect("apply");
            assert_eq!(char_len(&after), changes.new_len(len));
            assert_eq!(changes.invert(&before).apply(&after).expect("apply"), before);
        }
    }
}
