use std::sync::{Arc, Mutex};

use notemark_core::{Change, ChangeSet, Editor, StateChangeType, TextDelta, Transaction};
use pretty_assertions::assert_eq;

#[test]
fn test_delta_delivered_with_document_change() {
    let deltas: Arc<Mutex<Vec<TextDelta>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&deltas);

    let mut editor = Editor::new("~~old~~ text");
    editor.subscribe(move |change| {
        if change.change_type == StateChangeType::DocumentModified
            && let Some(delta) = &change.text_delta
        {
            sink.lock().unwrap().push((**delta).clone());
        }
    });

    let changes =
        ChangeSet::of(vec![Change::new(0, 2, ""), Change::new(5, 7, "")]).unwrap();
    editor.dispatch(Transaction::new(changes)).unwrap();
    assert_eq!(editor.text(), "old text");

    let deltas = deltas.lock().unwrap();
    assert_eq!(deltas.len(), 1);
    let delta = &deltas[0];
    assert_eq!(delta.before_char_count, 12);
    assert_eq!(delta.after_char_count, 8);
    assert_eq!(delta.edits[0].start, 0);
    assert_eq!(delta.edits[1].start, 3);
    assert_eq!(delta.edits[1].deleted_text, "~~");
    assert!(delta.undo_group_id.is_some());
}

#[test]
fn test_unicode_edits_use_char_offsets() {
    let mut editor = Editor::new("שלום\nעולם");
    editor
        .dispatch(Transaction::new(ChangeSet::insert(5, "> ")))
        .unwrap();
    assert_eq!(editor.text(), "שלום\n> עולם");
    assert_eq!(editor.line_at(7).text, "> עולם");
    assert_eq!(editor.doc().position(7), (1, 2));
}
