//! Auto-pairing for two-character inline delimiters.
//!
//! Only a single collapsed cursor is intercepted; anything else falls through to plain
//! insertion.

use notemark_core::{
    ChangeSet, Editor, Selection, Transaction,
    transaction::{EVENT_AUTOPAIR, EVENT_DELETE},
};

/// Delimiter chars that pair as `cc...cc`.
pub const PAIRED_DELIMITERS: [char; 3] = ['*', '~', '='];

/// Transaction for typing `ch`, or `None` when the input is not intercepted.
pub fn handle_input(editor: &Editor, ch: char) -> Option<Transaction> {
    if !PAIRED_DELIMITERS.contains(&ch) || !editor.selection().is_cursor() {
        return None;
    }
    let pos = editor.selection().head();
    let doc = editor.doc();
    let at = |p: Option<usize>| p.and_then(|p| doc.char_at(p));

    let prev = at(pos.checked_sub(1));
    let before_prev = at(pos.checked_sub(2));
    let next = at(Some(pos));
    let after_next = at(Some(pos + 1));

    // Skip over an existing closer.
    if next == Some(ch) && after_next == Some(ch) && prev != Some(ch) {
        return Some(
            Transaction::select(Selection::cursor(pos + 2)).user_event(EVENT_AUTOPAIR),
        );
    }

    // Complete a two-char opener and add the closer.
    if prev == Some(ch) && before_prev != Some(ch) && next != Some(ch) {
        let insert: String = [ch; 3].iter().collect();
        return Some(
            Transaction::new(ChangeSet::insert(pos, insert))
                .with_selection(Selection::cursor(pos + 1))
                .user_event(EVENT_AUTOPAIR),
        );
    }

    None
}

/// Transaction for Backspace inside an empty pair (`**|**`), which removes the whole pair.
pub fn handle_backspace(editor: &Editor) -> Option<Transaction> {
    if !editor.selection().is_cursor() {
        return None;
    }
    let pos = editor.selection().head();
    if pos < 2 {
        return None;
    }
    let doc = editor.doc();
    let around = doc.slice(pos - 2, pos + 2);
    let first = around.chars().next()?;
    if around.chars().count() == 4
        && PAIRED_DELIMITERS.contains(&first)
        && around.chars().all(|c| c == first)
    {
        return Some(
            Transaction::new(ChangeSet::delete(pos - 2, pos + 2))
                .with_selection(Selection::cursor(pos - 2))
                .user_event(EVENT_DELETE),
        );
    }
    None
}
