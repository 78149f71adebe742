//! Editable table model.
//!
//! A table node's source is materialized into a [`TableModel`], edited cell by cell and written
//! back as canonical pipe-table markdown. Cells are stored unescaped: `\|` becomes `|` and
//! `<br>` becomes a newline.
//!
//! A table nested in a list item or blockquote carries its container prefix (indentation or a
//! `>` run) on every line but the first, whose prefix sits before the table node's range. The
//! model keeps that prefix and writes it back.

use thiserror::Error;
use unicode_width::UnicodeWidthStr;

/// Table errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The source is not a pipe table.
    #[error("malformed table: {0}")]
    Malformed(String),
    /// The cell does not exist.
    #[error("cell {row}:{col} out of range")]
    CellOutOfRange {
        /// Row (0 is the header).
        row: usize,
        /// Column.
        col: usize,
    },
    /// The menu action is disabled for this cell.
    #[error("{0:?} is not available here")]
    ActionDisabled(TableMenuAction),
    /// No table cell has focus.
    #[error("no table cell is focused")]
    NoFocus,
    /// No table starts at the given offset.
    #[error("no table at offset {0}")]
    NoTable(usize),
}

/// Column alignment from the separator row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// `---`
    #[default]
    None,
    /// `:---`
    Left,
    /// `:---:`
    Center,
    /// `---:`
    Right,
}

/// A cell position. Row 0 is the header; body rows start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Row index, header first.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl CellRef {
    /// Cell at `row`, `col`.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Returns `true` for a header cell.
    pub fn is_header(&self) -> bool {
        self.row == 0
    }
}

/// Headers, alignments and body rows of a pipe table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TableModel {
    /// Header cells.
    pub headers: Vec<String>,
    /// One alignment per column.
    pub alignments: Vec<Alignment>,
    /// Body rows, each as wide as the header.
    pub rows: Vec<Vec<String>>,
    /// Container prefix of every line after the first. Empty for a top-level table.
    pub line_prefix: String,
}

impl TableModel {
    /// Model from headers and rows; short rows are padded, long rows truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            alignments: vec![Alignment::None; width],
            headers,
            rows,
            line_prefix: String::new(),
        }
    }

    /// Parse pipe-table markdown.
    pub fn parse(source: &str) -> Result<Self, TableError> {
        let mut lines = source.lines().filter(|l| !l.trim().is_empty());
        let header_line = lines
            .next()
            .ok_or_else(|| TableError::Malformed("empty source".into()))?;
        let separator_line = lines
            .next()
            .ok_or_else(|| TableError::Malformed("missing separator row".into()))?;

        let line_prefix = container_prefix(separator_line);
        let strip = |line: &str| -> String {
            line.strip_prefix(line_prefix.as_str()).unwrap_or(line).to_string()
        };
        let (header_line, separator_line) = (strip(header_line), strip(separator_line));

        let headers = split_row(&header_line);
        let alignments = split_row(&separator_line)
            .iter()
            .map(|cell| parse_alignment(cell))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TableError::Malformed(format!("bad separator row: {separator_line}")))?;
        if headers.is_empty() || alignments.len() != headers.len() {
            return Err(TableError::Malformed(format!(
                "header has {} cells, separator has {}",
                headers.len(),
                alignments.len()
            )));
        }

        let rows: Vec<Vec<String>> = lines.map(|line| split_row(&strip(line))).collect();
        let mut model = Self::new(headers, rows);
        model.alignments = alignments;
        model.line_prefix = line_prefix;
        Ok(model)
    }

    /// Canonical markdown: header row, separator row, body rows, columns padded to their
    /// display width. Lines after the first start with [`line_prefix`](Self::line_prefix).
    /// No trailing newline.
    pub fn serialize(&self) -> String {
        let escaped_headers: Vec<String> = self.headers.iter().map(|c| escape_cell(c)).collect();
        let escaped_rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| escape_cell(c)).collect())
            .collect();

        let widths: Vec<usize> = (0..self.column_count())
            .map(|col| {
                escaped_rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .chain(escaped_headers.get(col))
                    .map(|cell| cell.width())
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format_row(&escaped_headers, &widths));
        lines.push(format_separator(&self.alignments, &widths));
        for row in &escaped_rows {
            lines.push(format_row(row, &widths));
        }
        lines.join(&format!("\n{}", self.line_prefix))
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Number of rows including the header.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }

    /// Cell text.
    pub fn cell(&self, cell: CellRef) -> Option<&str> {
        if cell.row == 0 {
            self.headers.get(cell.col).map(String::as_str)
        } else {
            self.rows
                .get(cell.row - 1)
                .and_then(|row| row.get(cell.col))
                .map(String::as_str)
        }
    }

    /// Replace the text of a cell.
    pub fn set_cell(&mut self, cell: CellRef, text: &str) -> Result<(), TableError> {
        let slot = if cell.row == 0 {
            self.headers.get_mut(cell.col)
        } else {
            self.rows
                .get_mut(cell.row - 1)
                .and_then(|row| row.get_mut(cell.col))
        };
        let slot = slot.ok_or(TableError::CellOutOfRange {
            row: cell.row,
            col: cell.col,
        })?;
        *slot = text.to_string();
        Ok(())
    }

    fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.row_count() && cell.col < self.column_count()
    }

    /// Whether `action` may be applied at `cell`.
    pub fn is_enabled(&self, cell: CellRef, action: TableMenuAction) -> bool {
        if !self.contains(cell) {
            return false;
        }
        match action {
            TableMenuAction::InsertRowAbove => !cell.is_header(),
            TableMenuAction::DeleteRow => !cell.is_header() && self.rows.len() > 1,
            TableMenuAction::DeleteColumn => self.column_count() > 1,
            TableMenuAction::InsertRowBelow
            | TableMenuAction::InsertColumnLeft
            | TableMenuAction::InsertColumnRight => true,
        }
    }

    /// Menu entries for `cell` with their enabled state.
    pub fn menu(&self, cell: CellRef) -> Vec<(TableMenuAction, bool)> {
        TableMenuAction::ALL
            .iter()
            .map(|&action| (action, self.is_enabled(cell, action)))
            .collect()
    }

    /// Apply a menu action; returns the cell that should hold focus afterwards.
    pub fn apply(&mut self, cell: CellRef, action: TableMenuAction) -> Result<CellRef, TableError> {
        if !self.contains(cell) {
            return Err(TableError::CellOutOfRange {
                row: cell.row,
                col: cell.col,
            });
        }
        if !self.is_enabled(cell, action) {
            return Err(TableError::ActionDisabled(action));
        }

        let width = self.column_count();
        match action {
            TableMenuAction::InsertRowAbove => {
                self.rows.insert(cell.row - 1, vec![String::new(); width]);
                Ok(cell)
            }
            TableMenuAction::InsertRowBelow => {
                self.rows.insert(cell.row, vec![String::new(); width]);
                Ok(CellRef::new(cell.row + 1, cell.col))
            }
            TableMenuAction::DeleteRow => {
                self.rows.remove(cell.row - 1);
                Ok(CellRef::new(cell.row.min(self.rows.len()), cell.col))
            }
            TableMenuAction::InsertColumnLeft => {
                self.insert_column(cell.col);
                Ok(cell)
            }
            TableMenuAction::InsertColumnRight => {
                self.insert_column(cell.col + 1);
                Ok(CellRef::new(cell.row, cell.col + 1))
            }
            TableMenuAction::DeleteColumn => {
                self.headers.remove(cell.col);
                self.alignments.remove(cell.col);
                for row in &mut self.rows {
                    row.remove(cell.col);
                }
                Ok(CellRef::new(cell.row, cell.col.min(self.column_count() - 1)))
            }
        }
    }

    fn insert_column(&mut self, at: usize) {
        self.headers.insert(at, String::new());
        self.alignments.insert(at, Alignment::None);
        for row in &mut self.rows {
            row.insert(at, String::new());
        }
    }

    /// Where `key` moves focus from `cell`.
    pub fn navigate(&self, cell: CellRef, key: TableKey) -> TableNav {
        let last_row = self.row_count() - 1;
        let last_col = self.column_count().saturating_sub(1);
        match key {
            TableKey::Tab if cell.col < last_col => TableNav::Cell(CellRef::new(cell.row, cell.col + 1)),
            TableKey::Tab if cell.row < last_row => TableNav::Cell(CellRef::new(cell.row + 1, 0)),
            TableKey::Tab => TableNav::ExitAfter,
            TableKey::ShiftTab if cell.col > 0 => TableNav::Cell(CellRef::new(cell.row, cell.col - 1)),
            TableKey::ShiftTab if cell.row > 0 => {
                TableNav::Cell(CellRef::new(cell.row - 1, last_col))
            }
            TableKey::ShiftTab => TableNav::ExitBefore,
            TableKey::Enter | TableKey::Down if cell.row < last_row => {
                TableNav::Cell(CellRef::new(cell.row + 1, cell.col))
            }
            TableKey::Enter | TableKey::Down => TableNav::ExitAfter,
            TableKey::Up if cell.row > 0 => TableNav::Cell(CellRef::new(cell.row - 1, cell.col)),
            TableKey::Up => TableNav::ExitBefore,
            TableKey::Escape => TableNav::ExitAfter,
        }
    }
}

/// Context menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableMenuAction {
    /// Insert an empty body row above.
    InsertRowAbove,
    /// Insert an empty body row below.
    InsertRowBelow,
    /// Delete the row.
    DeleteRow,
    /// Insert an empty column to the left.
    InsertColumnLeft,
    /// Insert an empty column to the right.
    InsertColumnRight,
    /// Delete the column.
    DeleteColumn,
}

impl TableMenuAction {
    /// Every action in menu order.
    pub const ALL: [Self; 6] = [
        Self::InsertRowAbove,
        Self::InsertRowBelow,
        Self::DeleteRow,
        Self::InsertColumnLeft,
        Self::InsertColumnRight,
        Self::DeleteColumn,
    ];
}

/// Keys the table grid handles itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKey {
    /// Next cell.
    Tab,
    /// Previous cell.
    ShiftTab,
    /// Cell below.
    Enter,
    /// Cell below.
    Down,
    /// Cell above.
    Up,
    /// Leave the table.
    Escape,
}

/// Outcome of a table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableNav {
    /// Focus moves to another cell.
    Cell(CellRef),
    /// Focus leaves the table; the cursor goes to the start of the next line.
    ExitAfter,
    /// Focus leaves the table; the cursor goes to the end of the previous line.
    ExitBefore,
}

/// Leading indentation and `>` markers of a table line.
fn container_prefix(line: &str) -> String {
    line.chars()
        .take_while(|c| matches!(c, ' ' | '\t' | '>'))
        .collect()
}

/// Split a row on unescaped pipes, dropping the outer pipes.
fn split_row(line: &str) -> Vec<String> {
    let mut trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('|') {
        trimmed = rest;
    }
    if trimmed.ends_with('|') && !trimmed.ends_with("\\|") {
        trimmed = &trimmed[..trimmed.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(unescape_cell(std::mem::take(&mut current).trim())),
            _ => current.push(ch),
        }
    }
    cells.push(unescape_cell(current.trim()));
    cells
}

fn unescape_cell(cell: &str) -> String {
    cell.replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', "<br>")
}

fn parse_alignment(cell: &str) -> Option<Alignment> {
    let cell = cell.trim();
    let left = cell.starts_with(':');
    let right = cell.ends_with(':') && cell.len() > 1;
    let dashes = cell.trim_start_matches(':').trim_end_matches(':');
    if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
        return None;
    }
    Some(match (left, right) {
        (true, true) => Alignment::Center,
        (true, false) => Alignment::Left,
        (false, true) => Alignment::Right,
        (false, false) => Alignment::None,
    })
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, &width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.width());
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

fn format_separator(alignments: &[Alignment], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (alignment, &width) in alignments.iter().zip(widths) {
        let marker = match alignment {
            Alignment::None => "-".repeat(width),
            Alignment::Left => format!(":{}", "-".repeat(width - 1)),
            Alignment::Center => format!(":{}:", "-".repeat(width - 2)),
            Alignment::Right => format!("{}:", "-".repeat(width - 1)),
        };
        line.push(' ');
        line.push_str(&marker);
        line.push_str(" |");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_basic() {
        let model = TableModel::parse("| a | b |\n|---|:-:|\n| 1 | 2 |\n| 3 |").unwrap();
        assert_eq!(model.headers, strings(&["a", "b"]));
        assert_eq!(model.alignments, vec![Alignment::None, Alignment::Center]);
        assert_eq!(model.rows, vec![strings(&["1", "2"]), strings(&["3", ""])]);
    }

    #[test]
    fn test_parse_without_outer_pipes() {
        let model = TableModel::parse("a | b\n:-- | --:\nx | y").unwrap();
        assert_eq!(model.alignments, vec![Alignment::Left, Alignment::Right]);
        assert_eq!(model.rows, vec![strings(&["x", "y"])]);
    }

    #[test]
    fn test_escapes_round_trip() {
        let model = TableModel::parse("| a \\| b | c<br>d |\n|---|---|").unwrap();
        assert_eq!(model.headers, strings(&["a | b", "c\nd"]));
        assert_eq!(model.serialize(), "| a \\| b | c<br>d |\n| ------ | ------ |");
    }

    #[test]
    fn test_serialize_pads_columns() {
        let mut model = TableModel::new(strings(&["name", "n"]), vec![strings(&["x", "100"])]);
        model.alignments = vec![Alignment::Left, Alignment::Right];
        assert_eq!(
            model.serialize(),
            "| name | n   |\n| :--- | --: |\n| x    | 100 |"
        );
    }

    #[test]
    fn test_serialize_is_a_fixed_point() {
        let model = TableModel::new(
            strings(&["Fruit", "מחיר", "Note"]),
            vec![
                strings(&["apple", "3", "a|b"]),
                strings(&["kiwi", "", "line\nbreak"]),
            ],
        );
        let once = model.serialize();
        let reparsed = TableModel::parse(&once).unwrap();
        assert_eq!(reparsed, model);
        assert_eq!(reparsed.serialize(), once);
    }

    #[test]
    fn test_container_prefix_is_kept() {
        let quoted = TableModel::parse("| a | b |\n> |---|---|\n> | 1 | 2 |").unwrap();
        assert_eq!(quoted.line_prefix, "> ");
        assert_eq!(quoted.rows, vec![strings(&["1", "2"])]);
        assert_eq!(
            quoted.serialize(),
            "| a   | b   |\n> | --- | --- |\n> | 1   | 2   |"
        );

        let listed = TableModel::parse("| a |\n  |---|\n  | x |").unwrap();
        assert_eq!(listed.line_prefix, "  ");
        assert_eq!(listed.serialize(), "| a   |\n  | --- |\n  | x   |");
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            TableModel::parse("| a |"),
            Err(TableError::Malformed(_))
        ));
        assert!(matches!(
            TableModel::parse("| a |\n| x |"),
            Err(TableError::Malformed(_))
        ));
        assert!(matches!(
            TableModel::parse("| a | b |\n| --- |"),
            Err(TableError::Malformed(_))
        ));
    }

    #[test]
    fn test_menu_rules() {
        let model = TableModel::new(strings(&["a"]), vec![strings(&["1"])]);
        let header = model.menu(CellRef::new(0, 0));
        assert_eq!(
            header,
            vec![
                (TableMenuAction::InsertRowAbove, false),
                (TableMenuAction::InsertRowBelow, true),
                (TableMenuAction::DeleteRow, false),
                (TableMenuAction::InsertColumnLeft, true),
                (TableMenuAction::InsertColumnRight, true),
                (TableMenuAction::DeleteColumn, false),
            ]
        );
        // The only body row cannot be deleted either.
        assert!(!model.is_enabled(CellRef::new(1, 0), TableMenuAction::DeleteRow));
    }

    #[test]
    fn test_apply_actions() {
        let mut model = TableModel::new(strings(&["a", "b"]), vec![strings(&["1", "2"])]);
        let focus = model
            .apply(CellRef::new(1, 0), TableMenuAction::InsertRowBelow)
            .unwrap();
        assert_eq!(focus, CellRef::new(2, 0));
        assert_eq!(model.rows.len(), 2);

        let focus = model
            .apply(CellRef::new(2, 1), TableMenuAction::DeleteRow)
            .unwrap();
        assert_eq!(focus, CellRef::new(1, 1));
        assert_eq!(model.rows, vec![strings(&["1", "2"])]);

        model
            .apply(CellRef::new(0, 0), TableMenuAction::InsertColumnRight)
            .unwrap();
        assert_eq!(model.headers, strings(&["a", "", "b"]));
        assert_eq!(model.rows[0], strings(&["1", "", "2"]));

        model
            .apply(CellRef::new(0, 2), TableMenuAction::DeleteColumn)
            .unwrap();
        assert_eq!(model.headers, strings(&["a", ""]));

        assert_eq!(
            model.apply(CellRef::new(0, 0), TableMenuAction::DeleteRow),
            Err(TableError::ActionDisabled(TableMenuAction::DeleteRow))
        );
    }

    #[test]
    fn test_navigation() {
        let model = TableModel::new(strings(&["a", "b"]), vec![strings(&["1", "2"])]);
        let nav = |row, col, key| model.navigate(CellRef::new(row, col), key);

        assert_eq!(nav(0, 1, TableKey::Tab), TableNav::Cell(CellRef::new(1, 0)));
        assert_eq!(nav(1, 1, TableKey::Tab), TableNav::ExitAfter);
        assert_eq!(nav(1, 0, TableKey::ShiftTab), TableNav::Cell(CellRef::new(0, 1)));
        assert_eq!(nav(0, 0, TableKey::ShiftTab), TableNav::ExitBefore);
        assert_eq!(nav(0, 1, TableKey::Enter), TableNav::Cell(CellRef::new(1, 1)));
        assert_eq!(nav(1, 1, TableKey::Down), TableNav::ExitAfter);
        assert_eq!(nav(0, 0, TableKey::Up), TableNav::ExitBefore);
        assert_eq!(nav(0, 0, TableKey::Escape), TableNav::ExitAfter);
    }
}
