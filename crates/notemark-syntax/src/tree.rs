//! Typed markdown syntax tree.
//!
//! Nodes carry char ranges into the buffer revision they were parsed from. Marker tokens
//! (`**`, `#`, `>`, link brackets, ...) are explicit child nodes so consumers can hide or style
//! them without re-scanning the source.

/// Node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root node spanning the whole buffer.
    Document,
    /// Paragraph.
    Paragraph,
    /// ATX or setext heading.
    Heading {
        /// Level 1-6.
        level: u8,
    },
    /// `#` run of an ATX heading, or the underline of a setext heading.
    HeadingMark,
    /// Block quote.
    BlockQuote,
    /// One `>` marker (plus its following space) on a quoted line.
    QuoteMark,
    /// Ordered or bullet list.
    List {
        /// Whether items are numbered.
        ordered: bool,
    },
    /// List item.
    ListItem,
    /// `[ ]` / `[x]` task marker.
    TaskMarker {
        /// Whether the box is ticked.
        checked: bool,
    },
    /// Fenced or indented code block.
    CodeBlock,
    /// Inline code span.
    InlineCode,
    /// Backtick run of an inline code span, or a code fence line.
    CodeMark,
    /// Thematic break.
    HorizontalRule,
    /// Pipe table.
    Table,
    /// Header row of a table.
    TableHead,
    /// Body row of a table.
    TableRow,
    /// Table cell.
    TableCell,
    /// `*emphasis*` / `_emphasis_`.
    Emphasis,
    /// `**strong**`.
    Strong,
    /// `~~strikethrough~~`.
    Strikethrough,
    /// Delimiter run of emphasis, strong or strikethrough.
    EmphasisMark,
    /// Link.
    Link,
    /// Bracket or parenthesis of a link.
    LinkMark,
    /// Link destination (and title).
    Url,
    /// Image.
    Image,
    /// `==highlight==` span.
    Highlight,
    /// `==` delimiter of a highlight span.
    HighlightMark,
    /// Plain text.
    Text,
    /// Soft line break.
    SoftBreak,
    /// Hard line break.
    HardBreak,
    /// Inline or block HTML.
    Html,
}

impl NodeKind {
    /// Returns `true` for marker tokens.
    pub fn is_mark(&self) -> bool {
        matches!(
            self,
            Self::HeadingMark
                | Self::QuoteMark
                | Self::CodeMark
                | Self::EmphasisMark
                | Self::LinkMark
                | Self::Url
                | Self::HighlightMark
        )
    }

    /// Returns `true` for nodes that hold inline children which delimiter extensions scan.
    pub fn is_inline_container(&self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Heading { .. }
                | Self::ListItem
                | Self::TableCell
                | Self::Emphasis
                | Self::Strong
                | Self::Strikethrough
                | Self::Link
                | Self::Highlight
        )
    }

    /// Stable lowercase name, used for style classes and debugging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Paragraph => "paragraph",
            Self::Heading { .. } => "heading",
            Self::HeadingMark => "heading-mark",
            Self::BlockQuote => "blockquote",
            Self::QuoteMark => "quote-mark",
            Self::List { .. } => "list",
            Self::ListItem => "list-item",
            Self::TaskMarker { .. } => "task-marker",
            Self::CodeBlock => "code-block",
            Self::InlineCode => "inline-code",
            Self::CodeMark => "code-mark",
            Self::HorizontalRule => "hr",
            Self::Table => "table",
            Self::TableHead => "table-head",
            Self::TableRow => "table-row",
            Self::TableCell => "table-cell",
            Self::Emphasis => "emphasis",
            Self::Strong => "strong",
            Self::Strikethrough => "strikethrough",
            Self::EmphasisMark => "emphasis-mark",
            Self::Link => "link",
            Self::LinkMark => "link-mark",
            Self::Url => "url",
            Self::Image => "image",
            Self::Highlight => "highlight",
            Self::HighlightMark => "highlight-mark",
            Self::Text => "text",
            Self::SoftBreak => "soft-break",
            Self::HardBreak => "hard-break",
            Self::Html => "html",
        }
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    /// Kind.
    pub kind: NodeKind,
    /// Start char offset.
    pub from: usize,
    /// End char offset (exclusive).
    pub to: usize,
    /// Children sorted by position.
    pub children: Vec<SyntaxNode>,
    /// Link or image destination, or the info string of a fenced code block.
    pub detail: Option<String>,
    /// Link or image title.
    pub title: Option<String>,
}

impl SyntaxNode {
    /// A node without children or detail.
    pub fn new(kind: NodeKind, from: usize, to: usize) -> Self {
        Self {
            kind,
            from,
            to,
            children: Vec::new(),
            detail: None,
            title: None,
        }
    }

    /// Returns `true` if `from..=to` lies within this node (inclusive ends).
    pub fn contains_range(&self, from: usize, to: usize) -> bool {
        self.from <= from && to <= self.to
    }

    /// First child of `kind`.
    pub fn child(&self, kind: NodeKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Children that are marker tokens.
    pub fn marks(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| c.kind.is_mark())
    }

    /// Source text of all descendant `Text` leaves, concatenated.
    pub fn plain_text(&self, source: &[char]) -> String {
        let mut out = String::new();
        self.collect_text(source, &mut out);
        out
    }

    fn collect_text(&self, source: &[char], out: &mut String) {
        match self.kind {
            NodeKind::Text => {
                let to = self.to.min(source.len());
                out.extend(&source[self.from.min(to)..to]);
            }
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
            _ => {
                for child in &self.children {
                    if !child.kind.is_mark() {
                        child.collect_text(source, out);
                    }
                }
            }
        }
    }

    pub(crate) fn sort_children(&mut self) {
        self.children.sort_by_key(|c| (c.from, c.to));
    }
}

/// Parsed tree of one buffer revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub(crate) root: SyntaxNode,
    pub(crate) source: Vec<char>,
}

impl SyntaxTree {
    /// Root node.
    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Length of the parsed text in chars.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Returns `true` for an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Parsed text as chars.
    pub fn source(&self) -> &[char] {
        &self.source
    }

    /// Source text of `from..to`.
    pub fn text(&self, from: usize, to: usize) -> String {
        let to = to.min(self.source.len());
        self.source[from.min(to)..to].iter().collect()
    }

    /// Visit every node touching `from..=to`, parents before children.
    ///
    /// The callback receives the node and its ancestors (root first).
    pub fn visit<'a, F>(&'a self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&'a SyntaxNode, &[&'a SyntaxNode]),
    {
        let mut ancestors = Vec::new();
        visit_node(&self.root, from, to, &mut ancestors, &mut f);
    }

    /// Path from the root to the deepest node containing `from..=to`.
    pub fn path_at(&self, from: usize, to: usize) -> Vec<&SyntaxNode> {
        let mut path = vec![&self.root];
        let mut node = &self.root;
        while let Some(child) = node
            .children
            .iter()
            .find(|c| !c.kind.is_mark() && c.contains_range(from, to))
        {
            path.push(child);
            node = child;
        }
        path
    }

    /// Innermost node containing `from..=to` that matches `pred`.
    pub fn enclosing(
        &self,
        from: usize,
        to: usize,
        pred: impl Fn(NodeKind) -> bool,
    ) -> Option<&SyntaxNode> {
        self.path_at(from, to)
            .into_iter()
            .rev()
            .find(|n| pred(n.kind))
    }

    /// All nodes matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(NodeKind) -> bool) -> Vec<&SyntaxNode> {
        let mut out = Vec::new();
        self.visit(0, self.len(), |node, _| {
            if pred(node.kind) {
                out.push(node);
            }
        });
        out
    }
}

fn visit_node<'a, F>(
    node: &'a SyntaxNode,
    from: usize,
    to: usize,
    ancestors: &mut Vec<&'a SyntaxNode>,
    f: &mut F,
) where
    F: FnMut(&'a SyntaxNode, &[&'a SyntaxNode]),
{
    if node.from > to || node.to < from {
        return;
    }
    f(node, ancestors);
    ancestors.push(node);
    for child in &node.children {
        visit_node(child, from, to, ancestors, f);
    }
    ancestors.pop();
}
