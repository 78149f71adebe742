//! Undo/redo history.
//!
//! Entries are grouped: undo and redo always move a whole group. Consecutive typing coalesces
//! into one group, and callers can force a group open with [`History::begin_group`] (a modal
//! insert session, for example) until [`History::end_group`].

use crate::changes::ChangeSet;
use crate::selection::Selection;

/// One recorded transaction.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Forward changes.
    pub changes: ChangeSet,
    /// Changes restoring the previous text.
    pub inverse: ChangeSet,
    /// Selection before the change.
    pub selection_before: Selection,
    /// Selection after the change.
    pub selection_after: Selection,
    /// Group id; entries sharing an id undo together.
    pub group: usize,
}

/// Undo/redo stacks with grouping and clean-point tracking.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_depth: usize,
    /// Saved position, expressed as `undo_stack.len()`. `None` once it became unreachable.
    clean_index: Option<usize>,
    next_group: usize,
    coalescing_group: Option<usize>,
    explicit_group: Option<usize>,
    explicit_depth: usize,
}

impl History {
    /// Empty history keeping at most `max_depth` entries.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            clean_index: Some(0),
            next_group: 0,
            coalescing_group: None,
            explicit_group: None,
            explicit_depth: 0,
        }
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable entries.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable entries.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Returns `true` if the history sits at the saved position.
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    /// Record the current position as saved.
    pub fn mark_clean(&mut self) {
        self.clean_index = Some(self.undo_stack.len());
        self.coalescing_group = None;
    }

    /// Open an explicit group. Nested calls share the outermost group.
    pub fn begin_group(&mut self) {
        if self.explicit_depth == 0 {
            self.explicit_group = Some(self.allocate_group());
        }
        self.explicit_depth += 1;
    }

    /// Close the innermost explicit group.
    pub fn end_group(&mut self) {
        self.explicit_depth = self.explicit_depth.saturating_sub(1);
        if self.explicit_depth == 0 {
            self.explicit_group = None;
        }
        self.coalescing_group = None;
    }

    /// Stop coalescing typing into the current group.
    pub fn break_coalescing(&mut self) {
        self.coalescing_group = None;
    }

    fn allocate_group(&mut self) -> usize {
        let id = self.next_group;
        self.next_group = self.next_group.wrapping_add(1);
        id
    }

    fn clear_redo(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }
        if let Some(clean) = self.clean_index
            && clean > self.undo_stack.len()
        {
            self.clean_index = None;
        }
        self.redo_stack.clear();
    }

    /// Record an entry; returns its group id.
    pub fn push(&mut self, mut entry: HistoryEntry, coalescible: bool) -> usize {
        self.clear_redo();

        if self.undo_stack.len() >= self.max_depth {
            self.undo_stack.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(clean) => Some(clean - 1),
            };
        }

        entry.group = if let Some(group) = self.explicit_group {
            group
        } else {
            match self.coalescing_group {
                Some(group) if coalescible && !self.is_clean() => group,
                _ => self.allocate_group(),
            }
        };

        self.coalescing_group = coalescible.then_some(entry.group);
        let group = entry.group;
        self.undo_stack.push(entry);
        group
    }

    /// Pop the newest undo group, newest entry first, moving it onto the redo stack.
    pub fn undo(&mut self) -> Option<Vec<HistoryEntry>> {
        let entries = pop_group(&mut self.undo_stack)?;
        self.coalescing_group = None;
        self.redo_stack.extend(entries.iter().cloned());
        Some(entries)
    }

    /// Pop the newest redo group, oldest entry first, moving it back onto the undo stack.
    pub fn redo(&mut self) -> Option<Vec<HistoryEntry>> {
        let entries = pop_group(&mut self.redo_stack)?;
        self.coalescing_group = None;
        self.undo_stack.extend(entries.iter().cloned());
        Some(entries)
    }
}

fn pop_group(stack: &mut Vec<HistoryEntry>) -> Option<Vec<HistoryEntry>> {
    let group = stack.last()?.group;
    let mut entries = Vec::new();
    while stack.last().is_some_and(|e| e.group == group) {
        entries.extend(stack.pop());
    }
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pos: usize, text: &str) -> HistoryEntry {
        HistoryEntry {
            changes: ChangeSet::insert(pos, text),
            inverse: ChangeSet::delete(pos, pos + text.len()),
            selection_before: Selection::cursor(pos),
            selection_after: Selection::cursor(pos + text.len()),
            group: 0,
        }
    }

    #[test]
    fn test_typing_coalesces() {
        let mut history = History::new(100);
        let a = history.push(entry(0, "a"), true);
        let b = history.push(entry(1, "b"), true);
        let c = history.push(entry(2, " "), false);
        assert_eq!(a, b);
        assert_ne!(b, c);

        assert_eq!(history.undo().map(|g| g.len()), Some(1));
        assert_eq!(history.undo().map(|g| g.len()), Some(2));
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_explicit_group() {
        let mut history = History::new(100);
        history.begin_group();
        history.push(entry(0, "a"), false);
        history.push(entry(1, "b"), true);
        history.begin_group();
        history.push(entry(2, "c"), false);
        history.end_group();
        history.end_group();
        history.push(entry(3, "d"), true);

        assert_eq!(history.undo().map(|g| g.len()), Some(1));
        assert_eq!(history.undo().map(|g| g.len()), Some(3));
    }

    #[test]
    fn test_redo_cleared_by_new_edit() {
        let mut history = History::new(100);
        history.push(entry(0, "a"), false);
        history.undo();
        assert!(history.can_redo());
        history.push(entry(0, "b"), false);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_clean_tracking() {
        let mut history = History::new(100);
        assert!(history.is_clean());
        history.push(entry(0, "a"), true);
        assert!(!history.is_clean());
        history.mark_clean();
        assert!(history.is_clean());
        history.push(entry(1, "b"), true);
        history.undo();
        assert!(history.is_clean());
    }

    #[test]
    fn test_depth_limit() {
        let mut history = History::new(2);
        for i in 0..3 {
            history.push(entry(i, "x"), false);
        }
        assert_eq!(history.undo_depth(), 2);
        assert!(!history.is_clean());
    }
}
