use notemark_syntax::{NodeKind, SyntaxExtensions, parse, parse_with};
use pretty_assertions::assert_eq;

#[test]
fn test_without_extensions_highlight_is_text() {
    let tree = parse_with("==a==", &SyntaxExtensions::none());
    assert!(tree.find_all(|k| k == NodeKind::Highlight).is_empty());
}

#[test]
fn test_path_and_enclosing() {
    let tree = parse("> **bold** text");
    let path: Vec<_> = tree.path_at(4, 4).iter().map(|n| n.kind).collect();
    assert_eq!(
        path,
        vec![
            NodeKind::Document,
            NodeKind::BlockQuote,
            NodeKind::Paragraph,
            NodeKind::Strong,
            NodeKind::Text
        ]
    );

    let strong = tree.enclosing(3, 6, |k| k == NodeKind::Strong).expect("strong");
    assert_eq!((strong.from, strong.to), (2, 10));
    assert!(tree.enclosing(12, 12, |k| k == NodeKind::Strong).is_none());
}

#[test]
fn test_visit_reports_ancestors() {
    let tree = parse("> > deep");
    let mut depths = Vec::new();
    tree.visit(0, tree.len(), |node, ancestors| {
        if node.kind == NodeKind::BlockQuote {
            depths.push(ancestors.len());
        }
    });
    assert_eq!(depths, vec![1, 2]);
}

#[test]
fn test_multibyte_offsets() {
    let tree = parse("שלום **עולם**");
    let strong = tree.find_all(|k| k == NodeKind::Strong)[0];
    assert_eq!((strong.from, strong.to), (5, 13));
    assert_eq!(strong.plain_text(tree.source()), "עולם");
}
