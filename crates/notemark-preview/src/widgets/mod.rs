//! Block widgets: tables, images and horizontal rules.
//!
//! Tables are always replaced by an editable grid. Images and rules are replaced only while
//! the selection stays away from them, so the cursor can always reach the raw markdown.
//!
//! Table edits flow back into the buffer as `internal_update` transactions. [`BlockWidgets::update`]
//! recognises those and remaps the existing widgets instead of rebuilding, which keeps the
//! focused cell stable while the user types into it.

pub mod image;
pub mod table;

use std::collections::HashSet;

use notemark_core::{
    ChangeSet, Decoration, DecorationLayerId, DecorationSet, Editor, Selection, Transaction,
    Viewport, range_touches_selection, transaction::EVENT_TABLE,
};
use notemark_syntax::{NodeKind, SyntaxTree};

pub use image::ImageWidget;
pub use table::{
    Alignment, CellRef, TableError, TableKey, TableMenuAction, TableModel, TableNav,
};

/// Label of the history-less newline appended after a trailing widget.
pub const EVENT_TRAILING_NEWLINE: &str = "widget.newline";

/// What a widget renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Horizontal rule.
    Rule,
    /// Image or its placeholder.
    Image(ImageWidget),
    /// Editable table grid.
    Table(TableModel),
}

/// A widget replacing a source range. Two widgets are equal when kind and source match, so
/// hosts can keep rendered instances across recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Widget {
    /// Payload.
    pub kind: WidgetKind,
    /// Source text the widget replaces.
    pub source: String,
}

/// The table cell holding focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFocus {
    /// Start of the table in the buffer.
    pub table_from: usize,
    /// End of the table in the buffer.
    pub table_to: usize,
    /// Focused cell.
    pub cell: CellRef,
    /// Current model of the table.
    pub model: TableModel,
}

/// How the last [`BlockWidgets::update`] produced the widget set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetUpdate {
    /// Nothing relevant changed.
    Unchanged,
    /// Positions remapped through an internal write-back.
    Mapped,
    /// Widgets rebuilt from the tree.
    Rebuilt,
}

/// Result of a key handled by the focused table.
#[derive(Debug, Clone)]
pub enum TableKeyOutcome {
    /// Focus moved to another cell.
    Moved(CellRef),
    /// Focus left the table; dispatch the transaction to place the buffer cursor. Leaving
    /// upwards from a table on the first line also opens an empty line above it.
    Exited(Transaction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UpdateKey {
    revision: u64,
    selection: Selection,
    viewport: Viewport,
}

/// Widget state of one editor.
#[derive(Debug, Default)]
pub struct BlockWidgets {
    set: DecorationSet<Widget>,
    key: Option<UpdateKey>,
    failed_images: HashSet<String>,
    focus: Option<TableFocus>,
}

impl BlockWidgets {
    /// Empty widget state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current widgets.
    pub fn widgets(&self) -> &DecorationSet<Widget> {
        &self.set
    }

    /// Focused table cell, if any.
    pub fn focus(&self) -> Option<&TableFocus> {
        self.focus.as_ref()
    }

    /// Bring the widgets in line with the editor and `tree` (parsed at the editor's revision).
    pub fn update(&mut self, editor: &Editor, tree: &SyntaxTree) -> WidgetUpdate {
        let key = UpdateKey {
            revision: editor.revision(),
            selection: editor.selection().clone(),
            viewport: editor.viewport(),
        };
        if self.key.as_ref() == Some(&key) {
            return WidgetUpdate::Unchanged;
        }

        let steps = self.pending_changes(editor);
        let internal = editor
            .last_transaction()
            .is_some_and(|info| info.annotations.internal_update);

        if internal && let Some(changes) = &steps {
            for change in changes {
                self.set = std::mem::take(&mut self.set).map(change);
                self.map_focus(change);
            }
            self.key = Some(key);
            tracing::trace!(revision = editor.revision(), "widgets remapped");
            return WidgetUpdate::Mapped;
        }

        if let Some(changes) = &steps {
            for change in changes {
                self.map_focus(change);
            }
        }
        self.rebuild(editor, tree);
        self.key = Some(key);
        WidgetUpdate::Rebuilt
    }

    /// Change sets leading from the last seen revision to the editor's, when they are known.
    fn pending_changes(&self, editor: &Editor) -> Option<Vec<ChangeSet>> {
        let last = self.key.as_ref()?.revision;
        let info = editor.last_transaction()?;
        if info.revision != editor.revision() {
            return None;
        }
        let applied = info.changes.iter().filter(|c| !c.is_empty()).count() as u64;
        (applied > 0 && last + applied == editor.revision()).then(|| info.changes.clone())
    }

    fn map_focus(&mut self, changes: &ChangeSet) {
        if let Some(focus) = &mut self.focus {
            focus.table_from = changes.map_pos(focus.table_from, notemark_core::Assoc::Before);
            focus.table_to = changes
                .map_pos(focus.table_to, notemark_core::Assoc::After)
                .max(focus.table_from);
        }
    }

    fn rebuild(&mut self, editor: &Editor, tree: &SyntaxTree) {
        let viewport = editor.viewport();
        let selection = editor.selection();
        let mut items = Vec::new();

        tree.visit(viewport.from, viewport.to, |node, ancestors| {
            if ancestors.iter().any(|a| a.kind == NodeKind::Table) {
                return;
            }
            let kind = match node.kind {
                NodeKind::Table => {
                    let source = tree.text(node.from, node.to);
                    match TableModel::parse(&source) {
                        Ok(model) => WidgetKind::Table(model),
                        Err(err) => {
                            tracing::warn!(from = node.from, %err, "table left as text");
                            return;
                        }
                    }
                }
                NodeKind::HorizontalRule
                    if !range_touches_selection(node.from, node.to, selection) =>
                {
                    WidgetKind::Rule
                }
                NodeKind::Image if !range_touches_selection(node.from, node.to, selection) => {
                    let mut image = ImageWidget::from_node(node, tree);
                    image.failed = self.failed_images.contains(&image.src);
                    WidgetKind::Image(image)
                }
                _ => return,
            };
            items.push(Decoration::new(
                DecorationLayerId::WIDGETS,
                node.from,
                node.to,
                Widget {
                    kind,
                    source: tree.text(node.from, node.to),
                },
            ));
        });

        let mut set = DecorationSet::from_vec(items);
        set.check_bounds(tree.len());
        self.set = set;

        let sources: HashSet<String> = tree
            .find_all(|k| k == NodeKind::Image)
            .into_iter()
            .filter_map(|n| n.detail.clone())
            .collect();
        self.failed_images.retain(|src| sources.contains(src));

        self.refocus(tree);
        tracing::debug!(
            revision = editor.revision(),
            widgets = self.set.len(),
            "widgets rebuilt"
        );
    }

    /// Re-attach focus to the table now starting at the focused offset, or drop it.
    fn refocus(&mut self, tree: &SyntaxTree) {
        let Some(focus) = self.focus.take() else {
            return;
        };
        let table = tree
            .find_all(|k| k == NodeKind::Table)
            .into_iter()
            .find(|n| n.from == focus.table_from);
        let Some(table) = table else {
            tracing::debug!(from = focus.table_from, "focused table is gone");
            return;
        };
        let Ok(model) = TableModel::parse(&tree.text(table.from, table.to)) else {
            return;
        };
        let cell = CellRef::new(
            focus.cell.row.min(model.row_count() - 1),
            focus.cell.col.min(model.column_count().saturating_sub(1)),
        );
        self.focus = Some(TableFocus {
            table_from: table.from,
            table_to: table.to,
            cell,
            model,
        });
    }

    fn table_at(&self, table_from: usize) -> Option<(usize, &TableModel)> {
        self.set.layer(DecorationLayerId::WIDGETS).find_map(|d| match &d.value.kind {
            WidgetKind::Table(model) if d.from == table_from => Some((d.to, model)),
            _ => None,
        })
    }

    /// Give focus to `cell` of the table starting at `table_from`.
    pub fn focus_cell(&mut self, table_from: usize, cell: CellRef) -> Result<(), TableError> {
        let (table_to, model) = self
            .table_at(table_from)
            .ok_or(TableError::NoTable(table_from))?;
        if model.cell(cell).is_none() {
            return Err(TableError::CellOutOfRange {
                row: cell.row,
                col: cell.col,
            });
        }
        self.focus = Some(TableFocus {
            table_from,
            table_to,
            cell,
            model: model.clone(),
        });
        Ok(())
    }

    /// Set the focused cell's text; returns the write-back transaction, or `None` when the
    /// text is unchanged.
    pub fn cell_input(&mut self, text: &str) -> Result<Option<Transaction>, TableError> {
        let focus = self.focus.as_mut().ok_or(TableError::NoFocus)?;
        if focus.model.cell(focus.cell) == Some(text) {
            return Ok(None);
        }
        focus.model.set_cell(focus.cell, text)?;
        Ok(Some(self.write_back()))
    }

    /// Commit `pending` text (if it differs) and release focus.
    pub fn blur(&mut self, pending: Option<&str>) -> Result<Option<Transaction>, TableError> {
        let tr = match pending {
            Some(text) if self.focus.is_some() => self.cell_input(text)?,
            _ => None,
        };
        self.focus = None;
        Ok(tr)
    }

    /// Handle a grid key for the focused cell.
    pub fn key(&mut self, key: TableKey, editor: &Editor) -> Result<TableKeyOutcome, TableError> {
        let focus = self.focus.as_mut().ok_or(TableError::NoFocus)?;
        let pos = match focus.model.navigate(focus.cell, key) {
            TableNav::Cell(cell) => {
                focus.cell = cell;
                return Ok(TableKeyOutcome::Moved(cell));
            }
            TableNav::ExitAfter => {
                let after = focus.table_to;
                if editor.doc().char_at(after) == Some('\n') {
                    after + 1
                } else {
                    after
                }
            }
            TableNav::ExitBefore => {
                let line_start = editor.doc().line_at(focus.table_from).from;
                self.focus = None;
                if line_start == 0 {
                    // No line above the table: open one.
                    return Ok(TableKeyOutcome::Exited(
                        Transaction::new(ChangeSet::insert(0, "\n"))
                            .with_selection(Selection::cursor(0))
                            .user_event(EVENT_TABLE),
                    ));
                }
                line_start - 1
            }
        };
        self.focus = None;
        Ok(TableKeyOutcome::Exited(Transaction::select(
            Selection::cursor(pos.min(editor.len_chars())),
        )))
    }

    /// Menu entries for the focused cell.
    pub fn menu_actions(&self) -> Result<Vec<(TableMenuAction, bool)>, TableError> {
        let focus = self.focus.as_ref().ok_or(TableError::NoFocus)?;
        Ok(focus.model.menu(focus.cell))
    }

    /// Apply a menu action to the focused table.
    pub fn apply_menu(&mut self, action: TableMenuAction) -> Result<Transaction, TableError> {
        let focus = self.focus.as_mut().ok_or(TableError::NoFocus)?;
        focus.cell = focus.model.apply(focus.cell, action)?;
        Ok(self.write_back())
    }

    /// Serialize the focused model over its table range and refresh the widget payload.
    fn write_back(&mut self) -> Transaction {
        let Some(focus) = &self.focus else {
            return Transaction::default();
        };
        let source = focus.model.serialize();
        let (from, to) = (focus.table_from, focus.table_to);
        let widget = Widget {
            kind: WidgetKind::Table(focus.model.clone()),
            source: source.clone(),
        };
        self.set = self
            .set
            .iter()
            .cloned()
            .map(|mut d| {
                if d.layer == DecorationLayerId::WIDGETS && d.from == from {
                    d.value = widget.clone();
                }
                d
            })
            .collect();

        Transaction::new(ChangeSet::replace(from, to, source))
            .internal()
            .user_event(EVENT_TABLE)
    }

    /// Switch images with `src` to their placeholder. Returns `true` if any widget changed.
    pub fn image_load_failed(&mut self, src: &str) -> bool {
        self.failed_images.insert(src.to_string());
        let mut changed = false;
        self.set = self
            .set
            .iter()
            .cloned()
            .map(|mut d| {
                if let WidgetKind::Image(image) = &mut d.value.kind
                    && image.src == src
                    && !image.failed
                {
                    image.failed = true;
                    changed = true;
                }
                d
            })
            .collect();
        changed
    }
}

/// History-less transaction appending `\n` when a table or image reaches the end of the buffer.
pub fn ensure_trailing_newline(editor: &Editor, tree: &SyntaxTree) -> Option<Transaction> {
    let len = tree.len();
    if len == 0 {
        return None;
    }
    let at_end = tree
        .find_all(|k| matches!(k, NodeKind::Table | NodeKind::Image))
        .iter()
        .any(|n| n.to == len);
    at_end.then(|| {
        Transaction::new(ChangeSet::insert(len, "\n"))
            .with_selection(editor.selection().clone())
            .without_history()
            .user_event(EVENT_TRAILING_NEWLINE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notemark_syntax::parse;
    use pretty_assertions::assert_eq;

    fn synced(editor: &Editor, widgets: &mut BlockWidgets) -> WidgetUpdate {
        let tree = parse(&editor.text());
        widgets.update(editor, &tree)
    }

    fn kinds(widgets: &BlockWidgets) -> Vec<(usize, usize, &'static str)> {
        widgets
            .widgets()
            .iter()
            .map(|d| {
                let name = match d.value.kind {
                    WidgetKind::Rule => "rule",
                    WidgetKind::Image(_) => "image",
                    WidgetKind::Table(_) => "table",
                };
                (d.from, d.to, name)
            })
            .collect()
    }

    const TABLE: &str = "intro\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nend";

    #[test]
    fn test_rule_and_image_follow_selection() {
        let mut editor = Editor::new("x\n\n---\n\n![i](p.png)\n");
        let mut widgets = BlockWidgets::new();
        synced(&editor, &mut widgets);
        assert_eq!(kinds(&widgets), vec![(3, 6, "rule"), (8, 19, "image")]);

        editor.set_selection(Selection::cursor(4)).unwrap();
        synced(&editor, &mut widgets);
        assert_eq!(kinds(&widgets), vec![(8, 19, "image")]);
    }

    #[test]
    fn test_table_is_always_a_widget() {
        let mut editor = Editor::new(TABLE);
        editor.set_selection(Selection::cursor(10)).unwrap();
        let mut widgets = BlockWidgets::new();
        assert_eq!(synced(&editor, &mut widgets), WidgetUpdate::Rebuilt);
        assert_eq!(kinds(&widgets), vec![(7, 36, "table")]);
        assert_eq!(synced(&editor, &mut widgets), WidgetUpdate::Unchanged);
    }

    #[test]
    fn test_cell_edit_remaps_and_keeps_focus() {
        let mut editor = Editor::new(TABLE);
        let mut widgets = BlockWidgets::new();
        synced(&editor, &mut widgets);

        widgets.focus_cell(7, CellRef::new(0, 1)).unwrap();
        let tr = widgets.cell_input("beta").unwrap().unwrap();
        assert!(tr.annotations.internal_update);
        editor.dispatch(tr).unwrap();

        assert_eq!(synced(&editor, &mut widgets), WidgetUpdate::Mapped);
        let focus = widgets.focus().unwrap();
        assert_eq!(focus.cell, CellRef::new(0, 1));
        assert_eq!(focus.table_from, 7);

        let table = &editor.text()[focus.table_from..focus.table_to];
        let model = TableModel::parse(table).unwrap();
        assert_eq!(model.headers, vec!["a".to_string(), "beta".to_string()]);
        assert_eq!(model.rows, vec![vec!["1".to_string(), "2".to_string()]]);
        assert!(editor.text().ends_with("\n\nend"));
    }

    #[test]
    fn test_unchanged_input_is_a_no_op() {
        let editor = Editor::new(TABLE);
        let mut widgets = BlockWidgets::new();
        synced(&editor, &mut widgets);
        widgets.focus_cell(7, CellRef::new(1, 0)).unwrap();
        assert!(widgets.cell_input("1").unwrap().is_none());
        assert!(matches!(widgets.focus_cell(8, CellRef::new(0, 0)), Err(TableError::NoTable(8))));
    }

    #[test]
    fn test_exit_positions() {
        let editor = Editor::new(TABLE);
        let mut widgets = BlockWidgets::new();
        synced(&editor, &mut widgets);

        widgets.focus_cell(7, CellRef::new(1, 1)).unwrap();
        let TableKeyOutcome::Exited(tr) = widgets.key(TableKey::Tab, &editor).unwrap() else {
            panic!("expected exit");
        };
        assert_eq!(tr.selection, Some(Selection::cursor(37)));
        assert!(widgets.focus().is_none());

        widgets.focus_cell(7, CellRef::new(0, 0)).unwrap();
        let TableKeyOutcome::Exited(tr) = widgets.key(TableKey::Up, &editor).unwrap() else {
            panic!("expected exit");
        };
        assert_eq!(tr.selection, Some(Selection::cursor(6)));
    }

    #[test]
    fn test_image_failure_is_remembered() {
        let mut editor = Editor::new("![alt](bad.png)\n\ntext");
        editor.set_selection(Selection::cursor(21)).unwrap();
        let mut widgets = BlockWidgets::new();
        synced(&editor, &mut widgets);
        assert!(widgets.image_load_failed("bad.png"));

        // A rebuild keeps the failure for the same source.
        editor.set_selection(Selection::cursor(20)).unwrap();
        synced(&editor, &mut widgets);
        let failed = widgets.widgets().iter().any(|d| {
            matches!(&d.value.kind, WidgetKind::Image(image) if image.failed)
        });
        assert!(failed);
    }

    #[test]
    fn test_trailing_newline() {
        let editor = Editor::new("| a |\n|---|");
        let tree = parse(&editor.text());
        let tr = ensure_trailing_newline(&editor, &tree).unwrap();
        assert!(!tr.annotations.add_to_history);

        let editor = Editor::new("| a |\n|---|\n");
        let tree = parse(&editor.text());
        assert!(ensure_trailing_newline(&editor, &tree).is_none());
    }
}
