//! Editor state manager.
//!
//! [`Editor`] owns the buffer, the selection, the viewport and the history of one note, applies
//! [`Transaction`]s and notifies subscribers. Every observable change bumps the version; text
//! changes additionally bump the revision, which derived state (syntax tree, decorations) keys on.

use std::sync::Arc;

use crate::changes::{Assoc, ChangeSet};
use crate::delta::TextDelta;
use crate::document::Document;
use crate::error::CoreError;
use crate::history::{History, HistoryEntry};
use crate::line_index::Line;
use crate::selection::Selection;
use crate::transaction::{Annotations, EVENT_REDO, EVENT_TYPE, EVENT_UNDO, Transaction};

/// Default number of undo entries kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 1000;

/// Visible char range reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    /// First visible char.
    pub from: usize,
    /// End of the last visible line.
    pub to: usize,
}

impl Viewport {
    /// Viewport over `from..to`.
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from: from.min(to),
            to: from.max(to),
        }
    }
}

/// Kind of state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// Text changed.
    DocumentModified,
    /// Selection moved without a text change.
    SelectionChanged,
    /// Visible range changed.
    ViewportChanged,
    /// Focus gained or lost.
    FocusChanged,
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// What changed.
    pub change_type: StateChangeType,
    /// Version before the change.
    pub old_version: u64,
    /// Version after the change.
    pub new_version: u64,
    /// Text revision after the change.
    pub revision: u64,
    /// Structured delta for text changes.
    pub text_delta: Option<Arc<TextDelta>>,
    /// Annotations of the originating transaction.
    pub annotations: Annotations,
}

/// Result of a successful dispatch, undo or redo.
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    /// Text revision after the transaction.
    pub revision: u64,
    /// State version after the transaction.
    pub version: u64,
    /// Applied change sets, in order. Empty for selection-only transactions.
    pub changes: Vec<ChangeSet>,
    /// Annotations of the transaction.
    pub annotations: Annotations,
    /// Whether the selection differs from before.
    pub selection_changed: bool,
}

impl TransactionInfo {
    /// Returns `true` if any text changed.
    pub fn doc_changed(&self) -> bool {
        self.changes.iter().any(|c| !c.is_empty())
    }
}

type Callback = Box<dyn FnMut(&StateChange) + Send>;

/// Buffer, selection and history of one open note.
pub struct Editor {
    doc: Document,
    selection: Selection,
    viewport: Option<Viewport>,
    focused: bool,
    history: History,
    revision: u64,
    version: u64,
    is_modified: bool,
    last_transaction: Option<TransactionInfo>,
    callbacks: Vec<Callback>,
}

impl Editor {
    /// Editor over `text` with the cursor at the start.
    pub fn new(text: &str) -> Self {
        Self::with_history_depth(text, DEFAULT_HISTORY_DEPTH)
    }

    /// Editor keeping at most `depth` undo entries.
    pub fn with_history_depth(text: &str, depth: usize) -> Self {
        Self {
            doc: Document::new(text),
            selection: Selection::cursor(0),
            viewport: None,
            focused: true,
            history: History::new(depth),
            revision: 0,
            version: 0,
            is_modified: false,
            last_transaction: None,
            callbacks: Vec::new(),
        }
    }

    /// The buffer.
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.doc.text()
    }

    /// Buffer length in chars.
    pub fn len_chars(&self) -> usize {
        self.doc.len_chars()
    }

    /// Line containing `pos`.
    pub fn line_at(&self, pos: usize) -> Line {
        self.doc.line_at(pos)
    }

    /// Current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Visible range, defaulting to the whole buffer when the host never reported one.
    pub fn viewport(&self) -> Viewport {
        let len = self.doc.len_chars();
        match self.viewport {
            Some(v) => Viewport::new(v.from.min(len), v.to.min(len)),
            None => Viewport::new(0, len),
        }
    }

    /// Text revision; bumped by every text change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// State version; bumped by every observable change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns `true` while the editing surface has focus.
    pub fn has_focus(&self) -> bool {
        self.focused
    }

    /// Returns `true` if the text differs from the last saved state.
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// The last transaction applied (including undo/redo).
    pub fn last_transaction(&self) -> Option<&TransactionInfo> {
        self.last_transaction.as_ref()
    }

    /// Returns `true` if [`Editor::undo`] would succeed.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns `true` if [`Editor::redo`] would succeed.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Register a change listener.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Apply a transaction.
    pub fn dispatch(&mut self, tr: Transaction) -> Result<TransactionInfo, CoreError> {
        let old_len = self.doc.len_chars();
        tr.changes.check(old_len)?;

        let new_len = tr.changes.new_len(old_len);
        if let Some(selection) = &tr.selection
            && selection.max_pos() > new_len
        {
            return Err(CoreError::SelectionOutOfBounds {
                pos: selection.max_pos(),
                len: new_len,
            });
        }

        let selection_before = self.selection.clone();
        let doc_changed = !tr.changes.is_empty();
        let mut delta = None;

        if doc_changed {
            let inverse = tr.changes.invert_with(|from, to| self.doc.slice(from, to));
            let mut text_delta = tr
                .changes
                .to_delta_with(old_len, |from, to| self.doc.slice(from, to));
            self.doc.apply(&tr.changes)?;

            self.revision += 1;
            self.is_modified = true;
            self.viewport = self.viewport.map(|v| map_viewport(v, &tr.changes));

            let selection_after = tr
                .selection
                .clone()
                .unwrap_or_else(|| self.selection.map(&tr.changes));

            if tr.annotations.add_to_history {
                let coalescible = tr.is_user_event(EVENT_TYPE) && is_single_insert(&tr.changes);
                let group = self.history.push(
                    HistoryEntry {
                        changes: tr.changes.clone(),
                        inverse,
                        selection_before: selection_before.clone(),
                        selection_after: selection_after.clone(),
                        group: 0,
                    },
                    coalescible,
                );
                text_delta.undo_group_id = Some(group);
            } else {
                self.history.break_coalescing();
            }

            self.selection = selection_after;
            delta = Some(Arc::new(text_delta));
        } else if let Some(selection) = &tr.selection {
            self.selection = selection.clone();
        }

        let selection_changed = self.selection != selection_before;
        let change_type = if doc_changed {
            StateChangeType::DocumentModified
        } else {
            StateChangeType::SelectionChanged
        };

        tracing::trace!(
            revision = self.revision,
            doc_changed,
            selection_changed,
            event = tr.annotations.user_event.as_deref().unwrap_or(""),
            "dispatch"
        );

        let info = self.finish(
            change_type,
            if doc_changed { vec![tr.changes] } else { Vec::new() },
            tr.annotations,
            selection_changed,
            delta,
        );
        Ok(info)
    }

    /// Undo the newest history group.
    pub fn undo(&mut self) -> Result<TransactionInfo, CoreError> {
        let entries = self.history.undo().ok_or(CoreError::NothingToUndo)?;
        let selection_before = self.selection.clone();

        let mut applied = Vec::with_capacity(entries.len());
        for entry in &entries {
            self.apply_untracked(&entry.inverse)?;
            applied.push(entry.inverse.clone());
        }
        if let Some(oldest) = entries.last() {
            self.selection = oldest.selection_before.clamp(self.doc.len_chars());
        }

        self.is_modified = !self.history.is_clean();
        let selection_changed = self.selection != selection_before;
        Ok(self.finish(
            StateChangeType::DocumentModified,
            applied,
            history_annotations(EVENT_UNDO),
            selection_changed,
            None,
        ))
    }

    /// Redo the newest undone group.
    pub fn redo(&mut self) -> Result<TransactionInfo, CoreError> {
        let entries = self.history.redo().ok_or(CoreError::NothingToRedo)?;
        let selection_before = self.selection.clone();

        let mut applied = Vec::with_capacity(entries.len());
        for entry in &entries {
            self.apply_untracked(&entry.changes)?;
            applied.push(entry.changes.clone());
        }
        if let Some(newest) = entries.last() {
            self.selection = newest.selection_after.clamp(self.doc.len_chars());
        }

        self.is_modified = !self.history.is_clean();
        let selection_changed = self.selection != selection_before;
        Ok(self.finish(
            StateChangeType::DocumentModified,
            applied,
            history_annotations(EVENT_REDO),
            selection_changed,
            None,
        ))
    }

    fn apply_untracked(&mut self, changes: &ChangeSet) -> Result<(), CoreError> {
        self.doc.apply(changes)?;
        self.revision += 1;
        self.viewport = self.viewport.map(|v| map_viewport(v, changes));
        Ok(())
    }

    /// Replace the selection.
    pub fn set_selection(&mut self, selection: Selection) -> Result<TransactionInfo, CoreError> {
        self.dispatch(Transaction::select(selection))
    }

    /// Record the visible range.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == Some(viewport) {
            return;
        }
        self.viewport = Some(viewport);
        self.notify_simple(StateChangeType::ViewportChanged);
    }

    /// Give the editing surface focus.
    pub fn focus(&mut self) {
        if !self.focused {
            self.focused = true;
            self.notify_simple(StateChangeType::FocusChanged);
        }
    }

    /// Take focus away from the editing surface.
    pub fn blur(&mut self) {
        if self.focused {
            self.focused = false;
            self.notify_simple(StateChangeType::FocusChanged);
        }
    }

    /// Mark the current text as saved.
    pub fn mark_saved(&mut self) {
        self.history.mark_clean();
        self.is_modified = false;
    }

    /// Group every following history entry until [`Editor::end_undo_group`].
    pub fn begin_undo_group(&mut self) {
        self.history.begin_group();
    }

    /// Close the group opened by [`Editor::begin_undo_group`].
    pub fn end_undo_group(&mut self) {
        self.history.end_group();
    }

    fn finish(
        &mut self,
        change_type: StateChangeType,
        changes: Vec<ChangeSet>,
        annotations: Annotations,
        selection_changed: bool,
        delta: Option<Arc<TextDelta>>,
    ) -> TransactionInfo {
        let old_version = self.version;
        self.version += 1;

        let change = StateChange {
            change_type,
            old_version,
            new_version: self.version,
            revision: self.revision,
            text_delta: delta,
            annotations: annotations.clone(),
        };
        self.notify_callbacks(&change);

        let info = TransactionInfo {
            revision: self.revision,
            version: self.version,
            changes,
            annotations,
            selection_changed,
        };
        self.last_transaction = Some(info.clone());
        info
    }

    fn notify_simple(&mut self, change_type: StateChangeType) {
        let old_version = self.version;
        self.version += 1;
        let change = StateChange {
            change_type,
            old_version,
            new_version: self.version,
            revision: self.revision,
            text_delta: None,
            annotations: Annotations::default(),
        };
        self.notify_callbacks(&change);
    }

    fn notify_callbacks(&mut self, change: &StateChange) {
        for callback in &mut self.callbacks {
            callback(change);
        }
    }
}

fn history_annotations(event: &str) -> Annotations {
    Annotations {
        internal_update: false,
        add_to_history: false,
        user_event: Some(event.to_string()),
    }
}

fn is_single_insert(changes: &ChangeSet) -> bool {
    matches!(changes.changes(), [c] if c.from == c.to && !c.insert.contains('\n'))
}

fn map_viewport(viewport: Viewport, changes: &ChangeSet) -> Viewport {
    Viewport::new(
        changes.map_pos(viewport.from, Assoc::Before),
        changes.map_pos(viewport.to, Assoc::After),
    )
}
