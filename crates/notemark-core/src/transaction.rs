//! Transactions: the only way to mutate an [`Editor`](crate::Editor).

use crate::changes::ChangeSet;
use crate::selection::Selection;

/// Metadata attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotations {
    /// Written back by a widget; derived state should remap positions instead of rebuilding.
    pub internal_update: bool,
    /// Whether the change is recorded in the undo history.
    pub add_to_history: bool,
    /// Origin label (`"input.type"`, `"input.autopair"`, `"format"`, `"vim"`, ...).
    pub user_event: Option<String>,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            internal_update: false,
            add_to_history: true,
            user_event: None,
        }
    }
}

/// Label for plain typing; consecutive typing coalesces in the history.
pub const EVENT_TYPE: &str = "input.type";
/// Label for auto-pair insertions.
pub const EVENT_AUTOPAIR: &str = "input.autopair";
/// Label for deletions.
pub const EVENT_DELETE: &str = "input.delete";
/// Label for formatting commands.
pub const EVENT_FORMAT: &str = "format";
/// Label for modal-editing edits.
pub const EVENT_VIM: &str = "vim";
/// Label for table widget write-backs.
pub const EVENT_TABLE: &str = "widget.table";
/// Label for pointer or keyboard selection moves.
pub const EVENT_SELECT: &str = "select";
/// Label for history traversal.
pub const EVENT_UNDO: &str = "undo";
/// Label for history traversal.
pub const EVENT_REDO: &str = "redo";

/// Changes plus an optional new selection and annotations.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Text changes (may be empty for selection-only transactions).
    pub changes: ChangeSet,
    /// Explicit selection after the change; otherwise the old one is mapped.
    pub selection: Option<Selection>,
    /// Metadata.
    pub annotations: Annotations,
}

impl Transaction {
    /// Transaction applying `changes`.
    pub fn new(changes: ChangeSet) -> Self {
        Self {
            changes,
            ..Self::default()
        }
    }

    /// Transaction that only moves the selection.
    pub fn select(selection: Selection) -> Self {
        Self {
            selection: Some(selection),
            ..Self::default()
        }
        .user_event(EVENT_SELECT)
    }

    /// Set the selection after the change.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Mark as a widget write-back.
    pub fn internal(mut self) -> Self {
        self.annotations.internal_update = true;
        self
    }

    /// Keep out of the undo history.
    pub fn without_history(mut self) -> Self {
        self.annotations.add_to_history = false;
        self
    }

    /// Label the origin of the transaction.
    pub fn user_event(mut self, event: &str) -> Self {
        self.annotations.user_event = Some(event.to_string());
        self
    }

    /// Returns `true` if the origin label matches `event` or starts with `event.`.
    pub fn is_user_event(&self, event: &str) -> bool {
        self.annotations.user_event.as_deref().is_some_and(|e| {
            e == event || (e.starts_with(event) && e[event.len()..].starts_with('.'))
        })
    }

    /// Returns `true` if the transaction changes text.
    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_event_prefix() {
        let tr = Transaction::new(ChangeSet::insert(0, "x")).user_event(EVENT_AUTOPAIR);
        assert!(tr.is_user_event("input"));
        assert!(tr.is_user_event(EVENT_AUTOPAIR));
        assert!(!tr.is_user_event("inp"));
        assert!(!tr.is_user_event(EVENT_TYPE));
    }

    #[test]
    fn test_builders() {
        let tr = Transaction::new(ChangeSet::empty()).internal().without_history();
        assert!(tr.annotations.internal_update);
        assert!(!tr.annotations.add_to_history);
        assert!(!tr.doc_changed());
    }
}
