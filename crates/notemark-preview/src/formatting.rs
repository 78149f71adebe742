//! Formatting commands: inline style toggles, line prefixes and links.
//!
//! Every command is a pure function from editor state to an optional [`Transaction`];
//! [`run_command`] dispatches it and hands focus back to the editing surface.

use std::sync::LazyLock;

use notemark_core::{
    Assoc, Change, ChangeSet, CoreError, Editor, Selection, SelectionRange, Transaction,
    transaction::EVENT_FORMAT,
};
use notemark_syntax::{NodeKind, SyntaxTree};
use regex::Regex;

/// Leading whitespace plus an optional markdown line prefix.
static LINE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(#{1,6} |> |[-*+] \[[ xX]\] |[-*+] |\d+[.)] )?")
        .expect("valid line prefix regex")
});

/// Inline styles with a symmetric delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineStyle {
    /// `**bold**`
    Bold,
    /// `*italic*`
    Italic,
    /// `~~strike~~`
    Strike,
    /// `` `code` ``
    Code,
    /// `==highlight==`
    Highlight,
}

impl InlineStyle {
    /// Delimiter written on both sides.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Bold => "**",
            Self::Italic => "*",
            Self::Strike => "~~",
            Self::Code => "`",
            Self::Highlight => "==",
        }
    }

    /// Syntax node produced by the style.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Self::Bold => NodeKind::Strong,
            Self::Italic => NodeKind::Emphasis,
            Self::Strike => NodeKind::Strikethrough,
            Self::Code => NodeKind::InlineCode,
            Self::Highlight => NodeKind::Highlight,
        }
    }

    fn mark_kind(&self) -> NodeKind {
        match self {
            Self::Bold | Self::Italic | Self::Strike => NodeKind::EmphasisMark,
            Self::Code => NodeKind::CodeMark,
            Self::Highlight => NodeKind::HighlightMark,
        }
    }
}

/// Mutually exclusive line prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinePrefix {
    /// `#` .. `######`.
    Heading(u8),
    /// `> `
    Quote,
    /// `- `
    Bullet,
    /// `1. `, numbered sequentially.
    Ordered,
    /// `- [ ] `
    Task,
}

impl LinePrefix {
    fn text(&self, number: usize) -> String {
        match self {
            Self::Heading(level) => format!("{} ", "#".repeat(usize::from((*level).clamp(1, 6)))),
            Self::Quote => "> ".to_string(),
            Self::Bullet => "- ".to_string(),
            Self::Ordered => format!("{number}. "),
            Self::Task => "- [ ] ".to_string(),
        }
    }

    fn classify(prefix: &str) -> Option<Self> {
        let first = prefix.chars().next()?;
        Some(match first {
            '#' => Self::Heading(prefix.chars().take_while(|&c| c == '#').count() as u8),
            '>' => Self::Quote,
            '-' | '*' | '+' if prefix.contains('[') => Self::Task,
            '-' | '*' | '+' => Self::Bullet,
            _ => Self::Ordered,
        })
    }
}

/// A formatting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatCommand {
    /// Toggle an inline style.
    Inline(InlineStyle),
    /// Toggle a line prefix.
    Line(LinePrefix),
    /// Turn the selection into a link.
    Link,
}

/// Toggle `style` on the main selection range.
///
/// Unwraps an enclosing node of the style, else removes markers sitting right around the
/// selection, else wraps the selection (or inserts an empty pair at a cursor).
pub fn toggle_inline(editor: &Editor, tree: &SyntaxTree, style: InlineStyle) -> Option<Transaction> {
    let range = editor.selection().main();
    let (from, to) = (range.from(), range.to());
    let marker = style.marker();
    let marker_len = marker.chars().count();

    if let Some(node) = tree.enclosing(from, to, |k| k == style.node_kind()) {
        let mut marks = node.marks().filter(|m| m.kind == style.mark_kind());
        let open = marks.next()?;
        let close = marks.last()?;
        let changes = ChangeSet::of(vec![
            Change::new(open.from, open.to, ""),
            Change::new(close.from, close.to, ""),
        ])
        .ok()?;
        let selection = map_selection(editor.selection(), &changes, Assoc::Before);
        return Some(format_transaction(changes, selection));
    }

    if markers_around(tree.source(), from, to, marker) {
        let changes = ChangeSet::of(vec![
            Change::new(from - marker_len, from, ""),
            Change::new(to, to + marker_len, ""),
        ])
        .ok()?;
        let selection = map_selection(editor.selection(), &changes, Assoc::Before);
        return Some(format_transaction(changes, selection));
    }

    if range.is_empty() {
        let changes = ChangeSet::insert(from, marker.repeat(2));
        return Some(format_transaction(
            changes,
            Selection::cursor(from + marker_len),
        ));
    }

    let changes = ChangeSet::of(vec![
        Change::new(from, from, marker),
        Change::new(to, to, marker),
    ])
    .ok()?;
    let shifted = if range.anchor <= range.head {
        Selection::single(from + marker_len, to + marker_len)
    } else {
        Selection::single(to + marker_len, from + marker_len)
    };
    Some(format_transaction(changes, shifted))
}

/// Returns `true` if `marker` sits directly before `from` and directly after `to`.
///
/// A single-char marker must not be part of a longer run, so italic never eats half of a
/// bold delimiter.
fn markers_around(source: &[char], from: usize, to: usize, marker: &str) -> bool {
    let marker: Vec<char> = marker.chars().collect();
    let len = marker.len();
    if from < len || to + len > source.len() {
        return false;
    }
    if source[from - len..from] != marker[..] || source[to..to + len] != marker[..] {
        return false;
    }
    if len == 1 {
        let ch = marker[0];
        let before = from.checked_sub(2).and_then(|i| source.get(i));
        let after = source.get(to + 1);
        if before == Some(&ch) || after == Some(&ch) {
            return false;
        }
    }
    true
}

/// Toggle `prefix` on every non-blank line touched by the selection, or on the cursor line.
pub fn toggle_line_prefix(editor: &Editor, prefix: LinePrefix) -> Option<Transaction> {
    let doc = editor.doc();
    let mut numbers: Vec<usize> = Vec::new();
    for range in editor.selection().ranges() {
        let first = doc.line_at(range.from()).number;
        let mut last = doc.line_at(range.to()).number;
        if !range.is_empty() && last > first && doc.line_at(range.to()).from == range.to() {
            last -= 1;
        }
        numbers.extend(first..=last);
    }
    numbers.sort_unstable();
    numbers.dedup();

    let mut lines: Vec<_> = numbers
        .iter()
        .filter_map(|&n| doc.line(n))
        .filter(|line| !line.is_blank())
        .collect();
    if lines.is_empty() {
        lines.push(editor.line_at(editor.selection().head()));
    }

    // (line start, indent chars, existing prefix chars, existing kind)
    let parsed: Vec<(usize, usize, usize, Option<LinePrefix>)> = lines
        .iter()
        .map(|line| {
            let (indent, existing) = match LINE_PREFIX.captures(&line.text) {
                Some(caps) => (
                    caps.get(1).map_or("", |m| m.as_str()),
                    caps.get(2).map_or("", |m| m.as_str()),
                ),
                None => ("", ""),
            };
            (
                line.from,
                indent.chars().count(),
                existing.chars().count(),
                LinePrefix::classify(existing),
            )
        })
        .collect();

    let all_have = parsed
        .iter()
        .all(|&(_, _, _, kind)| kind.is_some_and(|k| same_prefix(k, prefix)));

    let mut changes = Vec::with_capacity(parsed.len());
    for (idx, &(start, indent, existing, _)) in parsed.iter().enumerate() {
        let at = start + indent;
        let replacement = if all_have {
            String::new()
        } else {
            prefix.text(idx + 1)
        };
        let current = doc.slice(at, at + existing);
        if current != replacement {
            changes.push(Change::new(at, at + existing, replacement));
        }
    }
    if changes.is_empty() {
        return None;
    }

    let changes = ChangeSet::of(changes).ok()?;
    let selection = editor.selection().map(&changes);
    Some(format_transaction(changes, selection))
}

fn same_prefix(existing: LinePrefix, target: LinePrefix) -> bool {
    match (existing, target) {
        (LinePrefix::Heading(a), LinePrefix::Heading(b)) => a == b,
        (a, b) => std::mem::discriminant(&a) == std::mem::discriminant(&b),
    }
}

/// Wrap the non-empty main selection in `[text](url)`.
///
/// With a URL the URL ends up selected; without one the cursor lands inside the parentheses.
pub fn insert_link(editor: &Editor, url: Option<&str>) -> Option<Transaction> {
    let range = editor.selection().main();
    if range.is_empty() {
        return None;
    }
    let (from, to) = (range.from(), range.to());
    let text = editor.doc().slice(from, to);
    let url = url.unwrap_or("");

    let url_start = from + 1 + text.chars().count() + 2;
    let selection = if url.is_empty() {
        Selection::cursor(url_start)
    } else {
        Selection::single(url_start, url_start + url.chars().count())
    };
    let changes = ChangeSet::replace(from, to, format!("[{text}]({url})"));
    Some(format_transaction(changes, selection))
}

/// Build the transaction for `command`, if it applies.
pub fn command_transaction(
    editor: &Editor,
    tree: &SyntaxTree,
    command: FormatCommand,
) -> Option<Transaction> {
    match command {
        FormatCommand::Inline(style) => toggle_inline(editor, tree, style),
        FormatCommand::Line(prefix) => toggle_line_prefix(editor, prefix),
        FormatCommand::Link => insert_link(editor, None),
    }
}

/// Run `command` against `editor` and restore focus. Returns whether anything was dispatched.
pub fn run_command(
    editor: &mut Editor,
    tree: &SyntaxTree,
    command: FormatCommand,
) -> Result<bool, CoreError> {
    let tr = command_transaction(editor, tree, command);
    let applied = match tr {
        Some(tr) => {
            editor.dispatch(tr)?;
            true
        }
        None => false,
    };
    editor.focus();
    tracing::debug!(?command, applied, "format command");
    Ok(applied)
}

fn format_transaction(changes: ChangeSet, selection: Selection) -> Transaction {
    Transaction::new(changes)
        .with_selection(selection)
        .user_event(EVENT_FORMAT)
}

fn map_selection(selection: &Selection, changes: &ChangeSet, assoc: Assoc) -> Selection {
    let ranges = selection
        .ranges()
        .iter()
        .map(|r| {
            SelectionRange::new(changes.map_pos(r.anchor, assoc), changes.map_pos(r.head, assoc))
        })
        .collect();
    Selection::new(ranges, selection.main_index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notemark_syntax::parse;
    use pretty_assertions::assert_eq;

    fn run(text: &str, selection: Selection, command: FormatCommand) -> (String, Selection) {
        let mut editor = Editor::new(text);
        editor.set_selection(selection).unwrap();
        let tree = parse(&editor.text());
        run_command(&mut editor, &tree, command).unwrap();
        (editor.text(), editor.selection().clone())
    }

    const BOLD: FormatCommand = FormatCommand::Inline(InlineStyle::Bold);

    #[test]
    fn test_wrap_selection() {
        let (text, sel) = run("x a y", Selection::single(2, 3), BOLD);
        assert_eq!(text, "x **a** y");
        assert_eq!(sel, Selection::single(4, 5));
    }

    #[test]
    fn test_unwrap_inside_node() {
        let (text, sel) = run("x **ab** y", Selection::cursor(5), BOLD);
        assert_eq!(text, "x ab y");
        assert_eq!(sel, Selection::cursor(3));
    }

    #[test]
    fn test_toggle_twice_restores_text() {
        let (text, sel) = run("x a y", Selection::single(2, 3), BOLD);
        let (text, _) = run(&text, sel, BOLD);
        assert_eq!(text, "x a y");

        for style in [
            InlineStyle::Italic,
            InlineStyle::Strike,
            InlineStyle::Code,
            InlineStyle::Highlight,
        ] {
            let command = FormatCommand::Inline(style);
            let (once, sel) = run("say hello now", Selection::single(4, 9), command);
            let (twice, _) = run(&once, sel, command);
            assert_eq!(twice, "say hello now", "{style:?}");
        }
    }

    #[test]
    fn test_empty_pair_round_trip() {
        let (text, sel) = run("", Selection::cursor(0), BOLD);
        assert_eq!(text, "****");
        assert_eq!(sel, Selection::cursor(2));
        let (text, sel) = run(&text, sel, BOLD);
        assert_eq!(text, "");
        assert_eq!(sel, Selection::cursor(0));
    }

    #[test]
    fn test_italic_does_not_split_bold_markers() {
        let (text, _) = run(
            "**a**",
            Selection::single(2, 3),
            FormatCommand::Inline(InlineStyle::Italic),
        );
        assert_eq!(text, "***a***");
    }

    #[test]
    fn test_heading_toggle() {
        let heading = FormatCommand::Line(LinePrefix::Heading(2));
        let (text, sel) = run("title", Selection::cursor(5), heading);
        assert_eq!(text, "## title");
        assert_eq!(sel, Selection::cursor(8));
        let (text, _) = run(&text, sel, heading);
        assert_eq!(text, "title");
    }

    #[test]
    fn test_prefix_replaces_other_prefix_and_keeps_indent() {
        let (text, _) = run(
            "  - item",
            Selection::cursor(5),
            FormatCommand::Line(LinePrefix::Quote),
        );
        assert_eq!(text, "  > item");
    }

    #[test]
    fn test_ordered_list_numbering_skips_blank_lines() {
        let ordered = FormatCommand::Line(LinePrefix::Ordered);
        let (text, sel) = run("a\n\nb\nc", Selection::single(0, 6), ordered);
        assert_eq!(text, "1. a\n\n2. b\n3. c");
        let (text, _) = run(&text, sel, ordered);
        assert_eq!(text, "a\n\nb\nc");
    }

    #[test]
    fn test_mixed_lines_get_target_prefix() {
        let (text, _) = run(
            "- a\nb",
            Selection::single(0, 5),
            FormatCommand::Line(LinePrefix::Bullet),
        );
        assert_eq!(text, "- a\n- b");
    }

    #[test]
    fn test_task_prefix() {
        let (text, _) = run(
            "- [x] done",
            Selection::cursor(0),
            FormatCommand::Line(LinePrefix::Task),
        );
        assert_eq!(text, "done");
    }

    #[test]
    fn test_link_requires_selection() {
        let mut editor = Editor::new("text");
        assert!(insert_link(&editor, None).is_none());

        editor.set_selection(Selection::single(0, 4)).unwrap();
        let tr = insert_link(&editor, Some("https://x.io")).unwrap();
        editor.dispatch(tr).unwrap();
        assert_eq!(editor.text(), "[text](https://x.io)");
        assert_eq!(editor.selection(), &Selection::single(7, 19));
    }

    #[test]
    fn test_link_without_url_places_cursor_in_parens() {
        let (text, sel) = run("go", Selection::single(0, 2), FormatCommand::Link);
        assert_eq!(text, "[go]()");
        assert_eq!(sel, Selection::cursor(5));
    }

    #[test]
    fn test_command_restores_focus() {
        let mut editor = Editor::new("a");
        editor.blur();
        let tree = parse("a");
        run_command(&mut editor, &tree, FormatCommand::Link).unwrap();
        assert!(editor.has_focus());
    }
}
