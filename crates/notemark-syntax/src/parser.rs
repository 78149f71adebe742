//! pulldown-cmark event stream to [`SyntaxTree`].

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use crate::extension::SyntaxExtensions;
use crate::offsets::OffsetMap;
use crate::tree::{NodeKind, SyntaxNode, SyntaxTree};

/// Parser options shared by tree building and HTML export.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Parse `text` with the default extensions (`==highlight==`).
pub fn parse(text: &str) -> SyntaxTree {
    parse_with(text, &SyntaxExtensions::default())
}

/// Parse `text` and run `extensions` over the resulting tree.
pub fn parse_with(text: &str, extensions: &SyntaxExtensions) -> SyntaxTree {
    let source: Vec<char> = text.chars().collect();
    let map = OffsetMap::new(text);

    let mut builder = Builder {
        source: &source,
        stack: vec![Frame::node(SyntaxNode::new(NodeKind::Document, 0, source.len()))],
    };

    for (event, range) in Parser::new_ext(text, markdown_options()).into_offset_iter() {
        let from = map.char_offset(range.start);
        let to = map.char_offset(range.end);
        builder.event(event, from, to);
    }

    let mut root = builder.finish();
    extensions.apply(&mut root, &source);

    SyntaxTree { root, source }
}

struct Frame {
    node: SyntaxNode,
    /// Tags without a node kind of their own; children are spliced into the parent.
    transparent: bool,
}

impl Frame {
    fn node(node: SyntaxNode) -> Self {
        Self {
            node,
            transparent: false,
        }
    }
}

struct Builder<'s> {
    source: &'s [char],
    stack: Vec<Frame>,
}

impl Builder<'_> {
    fn event(&mut self, event: Event<'_>, from: usize, to: usize) {
        match event {
            Event::Start(tag) => self.start(tag, from, to),
            Event::End(_) => self.end(),
            Event::Text(_) => self.leaf(SyntaxNode::new(NodeKind::Text, from, to)),
            Event::Code(_) => {
                let node = self.inline_code(from, to);
                self.leaf(node);
            }
            Event::Html(_) | Event::InlineHtml(_) => {
                let to = self.trim_newlines(from, to);
                self.leaf(SyntaxNode::new(NodeKind::Html, from, to));
            }
            Event::SoftBreak => self.leaf(SyntaxNode::new(NodeKind::SoftBreak, from, to)),
            Event::HardBreak => self.leaf(SyntaxNode::new(NodeKind::HardBreak, from, to)),
            Event::Rule => {
                let to = self.trim_newlines(from, to);
                self.leaf(SyntaxNode::new(NodeKind::HorizontalRule, from, to));
            }
            Event::TaskListMarker(checked) => {
                self.leaf(SyntaxNode::new(NodeKind::TaskMarker { checked }, from, to))
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, from: usize, to: usize) {
        let kind = match &tag {
            Tag::Paragraph => Some(NodeKind::Paragraph),
            Tag::Heading { level, .. } => Some(NodeKind::Heading {
                level: *level as u8,
            }),
            Tag::BlockQuote(_) => Some(NodeKind::BlockQuote),
            Tag::CodeBlock(_) => Some(NodeKind::CodeBlock),
            Tag::HtmlBlock => Some(NodeKind::Html),
            Tag::List(start) => Some(NodeKind::List {
                ordered: start.is_some(),
            }),
            Tag::Item => Some(NodeKind::ListItem),
            Tag::Table(_) => Some(NodeKind::Table),
            Tag::TableHead => Some(NodeKind::TableHead),
            Tag::TableRow => Some(NodeKind::TableRow),
            Tag::TableCell => Some(NodeKind::TableCell),
            Tag::Emphasis => Some(NodeKind::Emphasis),
            Tag::Strong => Some(NodeKind::Strong),
            Tag::Strikethrough => Some(NodeKind::Strikethrough),
            Tag::Link { .. } => Some(NodeKind::Link),
            Tag::Image { .. } => Some(NodeKind::Image),
            _ => None,
        };

        let Some(kind) = kind else {
            self.stack.push(Frame {
                node: SyntaxNode::new(NodeKind::Text, from, to),
                transparent: true,
            });
            return;
        };

        let mut node = SyntaxNode::new(kind, from, to);
        match tag {
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                node.detail = Some(info.to_string());
            }
            Tag::Link {
                dest_url, title, ..
            }
            | Tag::Image {
                dest_url, title, ..
            } => {
                node.detail = Some(dest_url.to_string());
                node.title = (!title.is_empty()).then(|| title.to_string());
            }
            _ => {}
        }
        self.stack.push(Frame::node(node));
    }

    fn end(&mut self) {
        if self.stack.len() < 2 {
            tracing::warn!("unbalanced end event in markdown stream");
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        if frame.transparent {
            if let Some(parent) = self.stack.last_mut() {
                parent.node.children.extend(frame.node.children);
            }
            return;
        }

        let mut node = frame.node;
        self.finish_node(&mut node);
        self.leaf(node);
    }

    fn leaf(&mut self, node: SyntaxNode) {
        if let Some(parent) = self.stack.last_mut() {
            parent.node.children.push(node);
        }
    }

    fn finish(mut self) -> SyntaxNode {
        while self.stack.len() > 1 {
            self.end();
        }
        match self.stack.pop() {
            Some(frame) => frame.node,
            None => SyntaxNode::new(NodeKind::Document, 0, self.source.len()),
        }
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.source.get(pos).copied()
    }

    fn trim_newlines(&self, from: usize, mut to: usize) -> usize {
        while to > from && matches!(self.char_at(to - 1), Some('\n' | '\r')) {
            to -= 1;
        }
        to
    }

    fn run_len(&self, pos: usize, ch: char, limit: usize) -> usize {
        (pos..limit).take_while(|&p| self.char_at(p) == Some(ch)).count()
    }

    fn line_end(&self, pos: usize, limit: usize) -> usize {
        (pos..limit)
            .find(|&p| matches!(self.char_at(p), Some('\n' | '\r')))
            .unwrap_or(limit)
    }

    fn skip_spaces(&self, pos: usize, limit: usize) -> usize {
        (pos..limit)
            .find(|&p| !matches!(self.char_at(p), Some(' ' | '\t')))
            .unwrap_or(limit)
    }

    fn finish_node(&self, node: &mut SyntaxNode) {
        if is_block(node.kind) {
            node.to = self.trim_newlines(node.from, node.to);
        }

        match node.kind {
            NodeKind::Heading { .. } => self.heading_marks(node),
            NodeKind::Emphasis => self.symmetric_marks(node, 1),
            NodeKind::Strong => self.symmetric_marks(node, 2),
            NodeKind::Strikethrough => {
                let n = self.run_len(node.from, '~', node.to).min(2);
                self.symmetric_marks(node, n);
            }
            NodeKind::Link | NodeKind::Image => self.link_marks(node),
            NodeKind::CodeBlock => self.fence_marks(node),
            NodeKind::BlockQuote => {
                let nested = self
                    .stack
                    .iter()
                    .any(|frame| frame.node.kind == NodeKind::BlockQuote);
                if !nested {
                    self.quote_marks(node);
                }
            }
            _ => {}
        }

        node.sort_children();
    }

    fn symmetric_marks(&self, node: &mut SyntaxNode, n: usize) {
        if n == 0 || node.to < node.from + 2 * n {
            return;
        }
        node.children
            .push(SyntaxNode::new(NodeKind::EmphasisMark, node.from, node.from + n));
        node.children
            .push(SyntaxNode::new(NodeKind::EmphasisMark, node.to - n, node.to));
    }

    fn heading_marks(&self, node: &mut SyntaxNode) {
        let start = self.skip_spaces(node.from, node.to);
        let hashes = self.run_len(start, '#', node.to);
        if hashes > 0 {
            node.children
                .push(SyntaxNode::new(NodeKind::HeadingMark, start, start + hashes));
            return;
        }

        // Setext: the underline is the last line.
        if let Some(break_at) = (node.from..node.to)
            .rev()
            .find(|&p| self.char_at(p) == Some('\n'))
        {
            let underline = self.skip_spaces(break_at + 1, node.to);
            if underline < node.to {
                node.children
                    .push(SyntaxNode::new(NodeKind::HeadingMark, underline, node.to));
            }
        }
    }

    fn inline_code(&self, from: usize, to: usize) -> SyntaxNode {
        let mut node = SyntaxNode::new(NodeKind::InlineCode, from, to);
        let ticks = self.run_len(from, '`', to);
        if ticks > 0 && to >= from + 2 * ticks {
            node.children
                .push(SyntaxNode::new(NodeKind::CodeMark, from, from + ticks));
            if to - ticks > from + ticks {
                node.children
                    .push(SyntaxNode::new(NodeKind::Text, from + ticks, to - ticks));
            }
            node.children
                .push(SyntaxNode::new(NodeKind::CodeMark, to - ticks, to));
        }
        node
    }

    fn link_marks(&self, node: &mut SyntaxNode) {
        let (from, to) = (node.from, node.to);
        let open_len = if node.kind == NodeKind::Image { 2 } else { 1 };

        if self.char_at(from) == Some('<') && self.char_at(to.saturating_sub(1)) == Some('>') {
            node.children
                .push(SyntaxNode::new(NodeKind::LinkMark, from, from + 1));
            node.children
                .push(SyntaxNode::new(NodeKind::LinkMark, to - 1, to));
            return;
        }
        if to < from + open_len + 1 {
            return;
        }

        let label_end = node
            .children
            .iter()
            .map(|c| c.to)
            .max()
            .unwrap_or(from + open_len)
            .max(from + open_len);

        node.children
            .push(SyntaxNode::new(NodeKind::LinkMark, from, from + open_len));

        let inline = self.char_at(label_end) == Some(']')
            && self.char_at(label_end + 1) == Some('(')
            && self.char_at(to - 1) == Some(')')
            && label_end + 2 < to;
        if inline {
            node.children
                .push(SyntaxNode::new(NodeKind::LinkMark, label_end, label_end + 2));
            if label_end + 2 < to - 1 {
                node.children
                    .push(SyntaxNode::new(NodeKind::Url, label_end + 2, to - 1));
            }
            node.children
                .push(SyntaxNode::new(NodeKind::LinkMark, to - 1, to));
        } else if label_end < to {
            node.children
                .push(SyntaxNode::new(NodeKind::LinkMark, label_end, to));
        }
    }

    fn fence_marks(&self, node: &mut SyntaxNode) {
        let start = self.skip_spaces(node.from, node.to);
        let fence_char = match self.char_at(start) {
            Some(c @ ('`' | '~')) => c,
            _ => return,
        };
        let fence_len = self.run_len(start, fence_char, node.to);
        if fence_len < 3 {
            return;
        }

        let first_end = self.line_end(start, node.to);
        node.children
            .push(SyntaxNode::new(NodeKind::CodeMark, start, first_end));

        if let Some(break_at) = (first_end..node.to)
            .rev()
            .find(|&p| self.char_at(p) == Some('\n'))
        {
            let close = self.skip_spaces(break_at + 1, node.to);
            let run = self.run_len(close, fence_char, node.to);
            let rest = self.skip_spaces(close + run, node.to);
            if run >= fence_len && rest == node.to {
                node.children
                    .push(SyntaxNode::new(NodeKind::CodeMark, close, node.to));
            }
        }
    }

    /// Marks every `>` of the quote, including those of nested quotes, on the outermost node.
    fn quote_marks(&self, node: &mut SyntaxNode) {
        let depth = quote_depth(node);
        let mut line_start = node.from;

        while line_start < node.to {
            let line_end = self.line_end(line_start, node.to);
            let mut pos = self.skip_spaces(line_start, line_end);
            let mut found = 0;

            while found < depth && self.char_at(pos) == Some('>') && pos < line_end {
                let mut end = pos + 1;
                if self.char_at(end) == Some(' ') && end < line_end {
                    end += 1;
                }
                node.children
                    .push(SyntaxNode::new(NodeKind::QuoteMark, pos, end));
                found += 1;
                pos = self.skip_spaces(end, line_end);
            }

            line_start = line_end + 1;
        }
    }
}

fn quote_depth(node: &SyntaxNode) -> usize {
    let own = usize::from(node.kind == NodeKind::BlockQuote);
    own + node.children.iter().map(quote_depth).max().unwrap_or(0)
}

fn is_block(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Paragraph
            | NodeKind::Heading { .. }
            | NodeKind::BlockQuote
            | NodeKind::List { .. }
            | NodeKind::ListItem
            | NodeKind::CodeBlock
            | NodeKind::Table
            | NodeKind::TableHead
            | NodeKind::TableRow
            | NodeKind::Html
    )
}
