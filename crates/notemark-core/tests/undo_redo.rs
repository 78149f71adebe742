use notemark_core::transaction::{EVENT_FORMAT, EVENT_TYPE};
use notemark_core::{ChangeSet, Editor, Selection, Transaction};

fn type_char(editor: &mut Editor, ch: &str) {
    let pos = editor.selection().head();
    editor
        .dispatch(
            Transaction::new(ChangeSet::insert(pos, ch))
                .with_selection(Selection::cursor(pos + 1))
                .user_event(EVENT_TYPE),
        )
        .unwrap();
}

#[test]
fn test_typing_undoes_as_one_group() {
    let mut editor = Editor::new("");
    for ch in ["a", "b", "c"] {
        type_char(&mut editor, ch);
    }
    assert_eq!(editor.text(), "abc");

    editor.undo().unwrap();
    assert_eq!(editor.text(), "");
    assert!(!editor.can_undo());

    editor.redo().unwrap();
    assert_eq!(editor.text(), "abc");
    assert_eq!(editor.selection().head(), 3);
}

#[test]
fn test_format_breaks_typing_group() {
    let mut editor = Editor::new("");
    type_char(&mut editor, "a");
    editor
        .dispatch(
            Transaction::new(ChangeSet::insert(1, "****"))
                .with_selection(Selection::cursor(3))
                .user_event(EVENT_FORMAT),
        )
        .unwrap();
    type_char(&mut editor, "b");
    assert_eq!(editor.text(), "a**b**");

    editor.undo().unwrap();
    assert_eq!(editor.text(), "a****");
    editor.undo().unwrap();
    assert_eq!(editor.text(), "a");
    editor.undo().unwrap();
    assert_eq!(editor.text(), "");
}

#[test]
fn test_explicit_group_spans_mixed_edits() {
    let mut editor = Editor::new("hello world");
    editor.begin_undo_group();
    editor
        .dispatch(
            Transaction::new(ChangeSet::delete(0, 5)).with_selection(Selection::cursor(0)),
        )
        .unwrap();
    type_char(&mut editor, "H");
    type_char(&mut editor, "i");
    editor.end_undo_group();
    assert_eq!(editor.text(), "Hi world");

    editor.undo().unwrap();
    assert_eq!(editor.text(), "hello world");
    assert_eq!(editor.selection().head(), 0);
}

#[test]
fn test_saved_point_tracks_modified_state() {
    let mut editor = Editor::new("draft");
    type_char(&mut editor, "!");
    editor.mark_saved();
    assert!(!editor.is_modified());

    editor.undo().unwrap();
    assert!(editor.is_modified());
    editor.redo().unwrap();
    assert!(!editor.is_modified());
}
