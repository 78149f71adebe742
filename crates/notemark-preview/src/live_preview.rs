//! Cursor-aware marker hiding.
//!
//! Formatting markers are hidden for every node whose range does not touch the selection, so
//! the note reads as rendered text until the cursor enters a span. The result also carries a
//! style layer the host theme maps to CSS-like classes.

use std::sync::Arc;

use notemark_core::{
    Decoration, DecorationLayerId, DecorationSet, Selection, Viewport, range_touches_selection,
};
use notemark_syntax::{NodeKind, SyntaxNode, SyntaxTree};

use crate::auto_pair::PAIRED_DELIMITERS;
use crate::bidi::Direction;
use crate::widgets::Widget;

/// Theme classes for styled ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleClass {
    /// Strong emphasis.
    Strong,
    /// Emphasis.
    Emphasis,
    /// Strikethrough.
    Strikethrough,
    /// Inline code.
    InlineCode,
    /// `==highlight==` background.
    Highlight,
    /// Link text.
    Link,
    /// Heading line of the given level.
    Heading(u8),
}

impl StyleClass {
    /// Class name consumed by the host theme.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Emphasis => "emphasis",
            Self::Strikethrough => "strikethrough",
            Self::InlineCode => "inline-code",
            Self::Highlight => "highlight",
            Self::Link => "link",
            Self::Heading(1) => "heading-1",
            Self::Heading(2) => "heading-2",
            Self::Heading(3) => "heading-3",
            Self::Heading(4) => "heading-4",
            Self::Heading(5) => "heading-5",
            Self::Heading(_) => "heading-6",
        }
    }

    fn of(kind: NodeKind) -> Option<Self> {
        Some(match kind {
            NodeKind::Strong => Self::Strong,
            NodeKind::Emphasis => Self::Emphasis,
            NodeKind::Strikethrough => Self::Strikethrough,
            NodeKind::InlineCode => Self::InlineCode,
            NodeKind::Highlight => Self::Highlight,
            NodeKind::Link => Self::Link,
            NodeKind::Heading { level } => Self::Heading(level),
            _ => return None,
        })
    }
}

/// Payload of every preview decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewDecoration {
    /// Hide the range (markers layer).
    Hide,
    /// Replace the range with a widget (widgets layer).
    Widget(Widget),
    /// Apply a theme class (styles layer).
    Style(StyleClass),
    /// Line direction attribute (lines layer).
    Direction(Direction),
}

/// Node kinds whose marker children are hidden while the node is away from the selection.
fn hides_marks(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Heading { .. }
            | NodeKind::BlockQuote
            | NodeKind::CodeBlock
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Strikethrough
            | NodeKind::InlineCode
            | NodeKind::Link
            | NodeKind::Highlight
    )
}

/// Marker and style decorations for the visible part of `tree`.
pub fn compute_decorations(
    tree: &SyntaxTree,
    selection: &Selection,
    viewport: Viewport,
) -> DecorationSet<PreviewDecoration> {
    let mut hidden: Vec<(usize, usize)> = Vec::new();
    let mut items = Vec::new();

    tree.visit(viewport.from, viewport.to, |node, _| {
        if let Some(class) = StyleClass::of(node.kind) {
            items.push(Decoration::new(
                DecorationLayerId::STYLES,
                node.from,
                node.to,
                PreviewDecoration::Style(class),
            ));
        }
        if hides_marks(node.kind) && !range_touches_selection(node.from, node.to, selection) {
            hide_marks(node, tree.source(), &mut hidden);
        }
    });

    hide_empty_pairs(tree.source(), selection, &mut hidden);

    hidden.sort_unstable();
    let mut last_end = 0;
    for (from, to) in hidden {
        if from >= to || from < last_end {
            continue;
        }
        last_end = to;
        items.push(Decoration::new(
            DecorationLayerId::MARKERS,
            from,
            to,
            PreviewDecoration::Hide,
        ));
    }

    let mut set = DecorationSet::from_vec(items);
    set.check_bounds(tree.len());
    set
}

fn hide_marks(node: &SyntaxNode, source: &[char], hidden: &mut Vec<(usize, usize)>) {
    let is_heading = matches!(node.kind, NodeKind::Heading { .. });
    for mark in node.marks() {
        let mut to = mark.to;
        if is_heading && to < node.to && source.get(to) == Some(&' ') {
            to += 1;
        }
        hidden.push((mark.from, to));
    }
}

/// `cc|cc` around a cursor: the parser has no node for an empty span.
fn hide_empty_pairs(source: &[char], selection: &Selection, hidden: &mut Vec<(usize, usize)>) {
    for range in selection.ranges().iter().filter(|r| r.is_empty()) {
        let pos = range.head;
        if pos < 2 || pos + 2 > source.len() {
            continue;
        }
        let ch = source[pos - 2];
        if PAIRED_DELIMITERS.contains(&ch) && source[pos - 2..pos + 2].iter().all(|&c| c == ch) {
            hidden.push((pos - 2, pos));
            hidden.push((pos, pos + 2));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoKey {
    revision: u64,
    selection: Selection,
    viewport: Viewport,
}

/// Memoizing front of [`compute_decorations`].
#[derive(Debug, Default)]
pub struct DecorationEngine {
    key: Option<MemoKey>,
    cached: Arc<DecorationSet<PreviewDecoration>>,
    show_raw: bool,
    recomputes: u64,
}

impl DecorationEngine {
    /// Engine hiding markers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show raw markdown everywhere (styles are still produced).
    pub fn set_show_raw(&mut self, show_raw: bool) {
        if self.show_raw != show_raw {
            self.show_raw = show_raw;
            self.key = None;
        }
    }

    /// Decorations for `tree` (parsed at `revision`), recomputed only when the revision, the
    /// selection or the viewport moved.
    pub fn decorations(
        &mut self,
        revision: u64,
        tree: &SyntaxTree,
        selection: &Selection,
        viewport: Viewport,
    ) -> Arc<DecorationSet<PreviewDecoration>> {
        let key = MemoKey {
            revision,
            selection: selection.clone(),
            viewport,
        };
        if self.key.as_ref() == Some(&key) {
            return Arc::clone(&self.cached);
        }

        let mut set = compute_decorations(tree, selection, viewport);
        if self.show_raw {
            set = set
                .iter()
                .filter(|d| d.layer != DecorationLayerId::MARKERS)
                .cloned()
                .collect();
        }
        self.recomputes += 1;
        tracing::debug!(
            revision,
            count = set.len(),
            recomputes = self.recomputes,
            "decorations recomputed"
        );

        self.cached = Arc::new(set);
        self.key = Some(key);
        Arc::clone(&self.cached)
    }

    /// Number of recomputations so far.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Drop the memo so the next call recomputes.
    pub fn invalidate(&mut self) {
        self.key = None;
    }
}
