use notemark_core::{DecorationLayerId, Editor, Selection, Viewport};
use notemark_preview::{DecorationEngine, PreviewDecoration, compute_decorations, handle_input};
use notemark_syntax::parse;
use pretty_assertions::assert_eq;

fn hidden_ranges(text: &str, selection: &Selection) -> Vec<(usize, usize)> {
    let tree = parse(text);
    compute_decorations(&tree, selection, Viewport::new(0, tree.len()))
        .layer(DecorationLayerId::MARKERS)
        .map(|d| (d.from, d.to))
        .collect()
}

#[test]
fn test_bold_markers_hide_until_cursor_touches() {
    let text = "**bold**\n\nnext line";
    for pos in 0..=8 {
        assert_eq!(
            hidden_ranges(text, &Selection::cursor(pos)),
            Vec::<(usize, usize)>::new(),
            "cursor {pos}"
        );
    }
    for pos in 9..=text.len() {
        assert_eq!(
            hidden_ranges(text, &Selection::cursor(pos)),
            vec![(0, 2), (6, 8)],
            "cursor {pos}"
        );
    }
}

#[test]
fn test_any_selection_range_reveals() {
    let text = "**a** and **b**";
    let selection = Selection::new(
        vec![
            notemark_core::SelectionRange::cursor(7),
            notemark_core::SelectionRange::new(12, 13),
        ],
        0,
    );
    assert_eq!(hidden_ranges(text, &selection), vec![(0, 2), (3, 5)]);
}

#[test]
fn test_recompute_is_deterministic() {
    let text = "# Notes\n\n> quote with **bold** and ==mark==\n\n- [link](x) `code` ~~gone~~\n";
    let tree = parse(text);
    let selection = Selection::cursor(3);
    let viewport = Viewport::new(0, tree.len());
    let first = compute_decorations(&tree, &selection, viewport);
    let second = compute_decorations(&tree, &selection, viewport);
    assert_eq!(first, second);
    assert!(!first.has_overlaps());
    assert!(first.iter().all(|d| d.from <= d.to && d.to <= tree.len()));
}

#[test]
fn test_typed_pair_is_hidden_around_cursor() {
    let mut editor = Editor::new("a ");
    editor.set_selection(Selection::cursor(2)).unwrap();
    for ch in ['*', '*'] {
        let tr = handle_input(&editor, ch).unwrap_or_else(|| {
            let pos = editor.selection().head();
            notemark_core::Transaction::new(notemark_core::ChangeSet::insert(pos, ch.to_string()))
                .with_selection(Selection::cursor(pos + 1))
        });
        editor.dispatch(tr).unwrap();
    }
    assert_eq!(editor.text(), "a ****");

    let tree = parse(&editor.text());
    let mut engine = DecorationEngine::new();
    let set = engine.decorations(
        editor.revision(),
        &tree,
        editor.selection(),
        editor.viewport(),
    );
    let hidden: Vec<_> = set
        .layer(DecorationLayerId::MARKERS)
        .map(|d| (d.from, d.to, d.value.clone()))
        .collect();
    assert_eq!(
        hidden,
        vec![
            (2, 4, PreviewDecoration::Hide),
            (4, 6, PreviewDecoration::Hide)
        ]
    );
}

#[test]
fn test_highlight_markers_follow_the_same_rule() {
    let text = "x ==y== z";
    assert_eq!(hidden_ranges(text, &Selection::cursor(0)), vec![(2, 4), (5, 7)]);
    assert!(hidden_ranges(text, &Selection::cursor(7)).is_empty());
}
