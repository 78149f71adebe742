//! Plain text input applied to every selection range.

use notemark_core::{
    Change, ChangeSet, Editor, Selection, SelectionRange, Transaction,
    transaction::{EVENT_DELETE, EVENT_TYPE},
};

use crate::auto_pair::{handle_backspace, handle_input};

/// Replace every range with `text`, leaving a cursor after each insertion.
pub fn insert_text(editor: &Editor, text: &str) -> Option<Transaction> {
    let spans: Vec<(usize, usize)> = editor
        .selection()
        .ranges()
        .iter()
        .map(|r| (r.from(), r.to()))
        .collect();
    edit_spans(editor, &spans, text).map(|tr| tr.user_event(EVENT_TYPE))
}

/// Type `ch`, through the auto-pair interceptor when `auto_pair` is set.
pub fn type_char(editor: &Editor, ch: char, auto_pair: bool) -> Option<Transaction> {
    if auto_pair && let Some(tr) = handle_input(editor, ch) {
        return Some(tr);
    }
    insert_text(editor, ch.encode_utf8(&mut [0; 4]))
}

/// Backspace: delete each non-empty range, or the char before each cursor.
pub fn delete_backward(editor: &Editor, auto_pair: bool) -> Option<Transaction> {
    if auto_pair && let Some(tr) = handle_backspace(editor) {
        return Some(tr);
    }
    let spans: Vec<(usize, usize)> = editor
        .selection()
        .ranges()
        .iter()
        .map(|r| {
            if r.is_empty() {
                (r.head.saturating_sub(1), r.head)
            } else {
                (r.from(), r.to())
            }
        })
        .collect();
    edit_spans(editor, &spans, "").map(|tr| tr.user_event(EVENT_DELETE))
}

/// Forward delete: delete each non-empty range, or the char after each cursor.
pub fn delete_forward(editor: &Editor) -> Option<Transaction> {
    let len = editor.len_chars();
    let spans: Vec<(usize, usize)> = editor
        .selection()
        .ranges()
        .iter()
        .map(|r| {
            if r.is_empty() {
                (r.head, (r.head + 1).min(len))
            } else {
                (r.from(), r.to())
            }
        })
        .collect();
    edit_spans(editor, &spans, "").map(|tr| tr.user_event(EVENT_DELETE))
}

fn edit_spans(editor: &Editor, spans: &[(usize, usize)], text: &str) -> Option<Transaction> {
    if text.is_empty() && spans.iter().all(|(from, to)| from == to) {
        return None;
    }
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for &(from, to) in spans {
        match merged.last_mut() {
            Some(last) if from <= last.1 => last.1 = last.1.max(to),
            _ => merged.push((from, to)),
        }
    }

    let insert_len = text.chars().count();
    let mut shift = 0isize;
    let mut cursors = Vec::with_capacity(merged.len());
    for &(from, to) in &merged {
        let start = (from as isize + shift) as usize;
        cursors.push(SelectionRange::cursor(start + insert_len));
        shift += insert_len as isize - (to - from) as isize;
    }

    let changes = ChangeSet::of(
        merged
            .iter()
            .map(|&(from, to)| Change::new(from, to, text))
            .collect(),
    )
    .ok()?;
    let main = editor.selection().main_index().min(cursors.len().saturating_sub(1));
    Some(Transaction::new(changes).with_selection(Selection::new(cursors, main)))
}
