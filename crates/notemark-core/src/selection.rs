//! Selections and the range predicates the preview layers are built on.

use crate::changes::{Assoc, ChangeSet};

/// One selection range. `anchor == head` is a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRange {
    /// Fixed end.
    pub anchor: usize,
    /// Moving end (where the caret is drawn).
    pub head: usize,
}

impl SelectionRange {
    /// A range from `anchor` to `head`.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A collapsed range.
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Lower bound.
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Upper bound.
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Returns `true` for a cursor.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map through a change set.
    pub fn map(&self, changes: &ChangeSet) -> Self {
        if self.is_empty() {
            return Self::cursor(changes.map_pos(self.head, Assoc::After));
        }
        let (from_assoc, to_assoc) = (Assoc::After, Assoc::Before);
        if self.anchor <= self.head {
            Self::new(
                changes.map_pos(self.anchor, from_assoc),
                changes.map_pos(self.head, to_assoc),
            )
        } else {
            Self::new(
                changes.map_pos(self.anchor, to_assoc),
                changes.map_pos(self.head, from_assoc),
            )
        }
    }
}

/// Normalized set of ranges with a main range.
///
/// Ranges are sorted and overlapping ranges are merged; cursors sitting at the same offset
/// collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
    main: usize,
}

impl Selection {
    /// A single cursor.
    pub fn cursor(pos: usize) -> Self {
        Self {
            ranges: vec![SelectionRange::cursor(pos)],
            main: 0,
        }
    }

    /// A single range.
    pub fn single(anchor: usize, head: usize) -> Self {
        Self {
            ranges: vec![SelectionRange::new(anchor, head)],
            main: 0,
        }
    }

    /// Normalize `ranges`; `main` indexes into the input. An empty input yields a cursor at 0.
    pub fn new(ranges: Vec<SelectionRange>, main: usize) -> Self {
        if ranges.is_empty() {
            return Self::cursor(0);
        }

        let main_head = ranges.get(main).unwrap_or(&ranges[0]).head;
        let mut sorted = ranges;
        sorted.sort_by_key(|r| (r.from(), r.to()));

        let mut merged: Vec<SelectionRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.from() < last.to() || range == *last => {
                    let from = last.from().min(range.from());
                    let to = last.to().max(range.to());
                    *last = SelectionRange::new(from, to);
                }
                _ => merged.push(range),
            }
        }

        let main = merged
            .iter()
            .position(|r| r.from() <= main_head && main_head <= r.to())
            .unwrap_or(merged.len() - 1);

        Self {
            ranges: merged,
            main,
        }
    }

    /// All ranges, sorted.
    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    /// The main range.
    pub fn main(&self) -> SelectionRange {
        self.ranges[self.main]
    }

    /// Index of the main range.
    pub fn main_index(&self) -> usize {
        self.main
    }

    /// Returns `true` if there is exactly one collapsed range.
    pub fn is_cursor(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_empty()
    }

    /// Caret offset of the main range.
    pub fn head(&self) -> usize {
        self.main().head
    }

    /// Map every range through a change set.
    pub fn map(&self, changes: &ChangeSet) -> Self {
        let ranges = self.ranges.iter().map(|r| r.map(changes)).collect();
        Self::new(ranges, self.main)
    }

    /// Clamp every range to `len`.
    pub fn clamp(&self, len: usize) -> Self {
        let ranges = self
            .ranges
            .iter()
            .map(|r| SelectionRange::new(r.anchor.min(len), r.head.min(len)))
            .collect();
        Self::new(ranges, self.main)
    }

    /// Largest offset referenced by any range.
    pub fn max_pos(&self) -> usize {
        self.ranges.iter().map(SelectionRange::to).max().unwrap_or(0)
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::cursor(0)
    }
}

/// Returns `true` if `from..=to` touches any selection range.
///
/// Both ends are inclusive, so a cursor sitting directly before or after the range counts.
pub fn range_touches_selection(from: usize, to: usize, selection: &Selection) -> bool {
    selection
        .ranges()
        .iter()
        .any(|r| r.from() <= to && r.to() >= from)
}

/// Returns `true` if the half-open ranges `a` and `b` share at least one char.
pub fn ranges_overlap(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_merges_and_tracks_main() {
        let sel = Selection::new(
            vec![
                SelectionRange::new(10, 12),
                SelectionRange::new(0, 4),
                SelectionRange::new(3, 6),
            ],
            0,
        );
        assert_eq!(
            sel.ranges(),
            &[SelectionRange::new(0, 6), SelectionRange::new(10, 12)]
        );
        assert_eq!(sel.main_index(), 1);
    }

    #[test]
    fn test_duplicate_cursors_collapse() {
        let sel = Selection::new(
            vec![SelectionRange::cursor(5), SelectionRange::cursor(5)],
            1,
        );
        assert_eq!(sel.ranges().len(), 1);
        assert!(sel.is_cursor());
    }

    #[test]
    fn test_touches_is_inclusive() {
        let outside = Selection::cursor(9);
        assert!(!range_touches_selection(0, 8, &outside));
        for pos in 0..=8 {
            assert!(range_touches_selection(0, 8, &Selection::cursor(pos)));
        }
        assert!(range_touches_selection(4, 6, &Selection::single(0, 4)));
    }

    #[test]
    fn test_overlap_is_half_open() {
        assert!(ranges_overlap((0, 4), (3, 5)));
        assert!(!ranges_overlap((0, 4), (4, 5)));
    }

    #[test]
    fn test_map_cursor_after_insert() {
        let sel = Selection::cursor(2);
        assert_eq!(sel.map(&ChangeSet::insert(2, "ab")).head(), 4);
        assert_eq!(sel.map(&ChangeSet::insert(0, "x")).head(), 3);
        assert_eq!(sel.map(&ChangeSet::delete(0, 1)).head(), 1);
    }
}
