//! Two-character inline delimiter extensions.
//!
//! pulldown-cmark has no hook for custom inline syntax, so registered delimiters are resolved in
//! a pass over the finished tree. Each inline container is scanned on its own: a delimiter can
//! only pair with another in the same container, which makes emphasis win for crossing spans
//! (`==a **b== c**`) while nesting composes (`**==a==**`, `==**a**==`).
//!
//! Open/close eligibility is the CommonMark rule for `*` runs: a run opens if it is
//! left-flanking and closes if it is right-flanking. Only runs of exactly two delimiter chars
//! count, and a backslash-escaped run never does.

use crate::tree::{NodeKind, SyntaxNode};

/// A registered two-character delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineDelimiter {
    /// Delimiter char (the delimiter is this char twice).
    pub marker: char,
    /// Kind of the span node.
    pub node: NodeKind,
    /// Kind of the two marker children.
    pub mark: NodeKind,
}

/// `==highlight==`.
pub const HIGHLIGHT: InlineDelimiter = InlineDelimiter {
    marker: '=',
    node: NodeKind::Highlight,
    mark: NodeKind::HighlightMark,
};

/// Set of delimiters applied after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxExtensions {
    delimiters: Vec<InlineDelimiter>,
}

impl Default for SyntaxExtensions {
    fn default() -> Self {
        Self {
            delimiters: vec![HIGHLIGHT],
        }
    }
}

impl SyntaxExtensions {
    /// No extensions: plain CommonMark + GFM tables, strikethrough and task lists.
    pub fn none() -> Self {
        Self {
            delimiters: Vec::new(),
        }
    }

    /// Register a delimiter. Registering the same marker twice is a no-op.
    pub fn register(&mut self, delimiter: InlineDelimiter) -> &mut Self {
        if !self.delimiters.iter().any(|d| d.marker == delimiter.marker) {
            self.delimiters.push(delimiter);
        }
        self
    }

    /// Registered delimiters.
    pub fn delimiters(&self) -> &[InlineDelimiter] {
        &self.delimiters
    }

    /// Resolve every registered delimiter in `root`.
    pub fn apply(&self, root: &mut SyntaxNode, source: &[char]) {
        for delimiter in &self.delimiters {
            resolve(root, source, delimiter);
        }
    }
}

/// Flanking classification of a delimiter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flanking {
    /// Run may open a span.
    pub can_open: bool,
    /// Run may close a span.
    pub can_close: bool,
}

/// Classify a run from the chars around it. `None` means line start/end or buffer edge.
pub fn flanking(prev: Option<char>, next: Option<char>) -> Flanking {
    let prev_ws = prev.is_none_or(char::is_whitespace);
    let next_ws = next.is_none_or(char::is_whitespace);
    let prev_punct = prev.is_some_and(is_punctuation);
    let next_punct = next.is_some_and(is_punctuation);

    let left = !next_ws && (!next_punct || prev_ws || prev_punct);
    let right = !prev_ws && (!prev_punct || next_ws || next_punct);

    Flanking {
        can_open: left,
        can_close: right,
    }
}

/// ASCII punctuation plus any non-ASCII char that is neither alphanumeric nor whitespace
/// (Unicode P and S categories).
pub fn is_punctuation(ch: char) -> bool {
    if ch.is_ascii() {
        ch.is_ascii_punctuation()
    } else {
        !ch.is_alphanumeric() && !ch.is_whitespace()
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    child: usize,
    from: usize,
    flanking: Flanking,
}

fn resolve(node: &mut SyntaxNode, source: &[char], delimiter: &InlineDelimiter) {
    if node.kind.is_inline_container() && node.kind != delimiter.node {
        resolve_container(node, source, delimiter);
    }
    if matches!(
        node.kind,
        NodeKind::InlineCode | NodeKind::CodeBlock | NodeKind::Html
    ) {
        return;
    }
    for child in &mut node.children {
        resolve(child, source, delimiter);
    }
}

fn resolve_container(node: &mut SyntaxNode, source: &[char], delimiter: &InlineDelimiter) {
    merge_text(&mut node.children);

    let runs = find_runs(&node.children, source, delimiter.marker);
    let pairs = pair_runs(&runs);
    if pairs.is_empty() {
        return;
    }

    // Runs that take part in a pair, with their role.
    let mut roles: Vec<(usize, usize, bool)> = Vec::with_capacity(pairs.len() * 2);
    for (open, close) in pairs {
        roles.push((runs[open].child, runs[open].from, true));
        roles.push((runs[close].child, runs[close].from, false));
    }
    roles.sort_by_key(|&(child, from, _)| (child, from));

    let children = std::mem::take(&mut node.children);
    let mut frames: Vec<(usize, Vec<SyntaxNode>)> = vec![(node.from, Vec::new())];
    let mut roles = roles.into_iter().peekable();

    for (idx, child) in children.into_iter().enumerate() {
        if roles.peek().is_none_or(|&(c, _, _)| c != idx) {
            push_top(&mut frames, child);
            continue;
        }

        let mut cursor = child.from;
        while let Some(&(c, from, opens)) = roles.peek() {
            if c != idx {
                break;
            }
            roles.next();

            if from > cursor {
                push_top(&mut frames, SyntaxNode::new(NodeKind::Text, cursor, from));
            }
            let mark = SyntaxNode::new(delimiter.mark, from, from + 2);
            if opens {
                frames.push((from, vec![mark]));
            } else {
                push_top(&mut frames, mark);
                if let Some((start, inner)) = frames.pop() {
                    let mut span = SyntaxNode::new(delimiter.node, start, from + 2);
                    span.children = inner;
                    push_top(&mut frames, span);
                }
            }
            cursor = from + 2;
        }

        if cursor < child.to {
            push_top(&mut frames, SyntaxNode::new(NodeKind::Text, cursor, child.to));
        }
    }

    // Pairs come from a stack, so every opened frame has been closed.
    while frames.len() > 1 {
        if let Some((_, inner)) = frames.pop() {
            for child in inner {
                push_top(&mut frames, child);
            }
        }
    }
    node.children = frames.pop().map(|(_, c)| c).unwrap_or_default();
}

fn push_top(frames: &mut [(usize, Vec<SyntaxNode>)], node: SyntaxNode) {
    if let Some((_, top)) = frames.last_mut() {
        top.push(node);
    }
}

/// Merge adjacent `Text` leaves with contiguous ranges.
fn merge_text(children: &mut Vec<SyntaxNode>) {
    let mut merged: Vec<SyntaxNode> = Vec::with_capacity(children.len());
    for child in children.drain(..) {
        match merged.last_mut() {
            Some(last)
                if last.kind == NodeKind::Text
                    && child.kind == NodeKind::Text
                    && last.to == child.from =>
            {
                last.to = child.to;
            }
            _ => merged.push(child),
        }
    }
    *children = merged;
}

fn find_runs(children: &[SyntaxNode], source: &[char], marker: char) -> Vec<Run> {
    let at = |pos: usize| source.get(pos).copied();
    let mut runs = Vec::new();

    for (idx, child) in children.iter().enumerate() {
        if child.kind != NodeKind::Text {
            continue;
        }
        let mut pos = child.from;
        while pos < child.to {
            if at(pos) != Some(marker) {
                pos += 1;
                continue;
            }
            let start = pos;
            while pos < child.to && at(pos) == Some(marker) {
                pos += 1;
            }

            let prev = start.checked_sub(1).and_then(at);
            let next = at(pos);
            // The whole source run must be exactly two chars.
            if pos - start != 2 || prev == Some(marker) || next == Some(marker) {
                continue;
            }
            if is_escaped(source, start) {
                continue;
            }

            runs.push(Run {
                child: idx,
                from: start,
                flanking: flanking(prev, next),
            });
        }
    }
    runs
}

fn is_escaped(source: &[char], pos: usize) -> bool {
    let backslashes = source[..pos.min(source.len())]
        .iter()
        .rev()
        .take_while(|&&c| c == '\\')
        .count();
    backslashes % 2 == 1
}

/// Pair runs the way emphasis delimiters are processed: a closer matches the nearest open
/// opener; a run that can do both closes when possible.
fn pair_runs(runs: &[Run]) -> Vec<(usize, usize)> {
    let mut openers: Vec<usize> = Vec::new();
    let mut pairs = Vec::new();

    for (idx, run) in runs.iter().enumerate() {
        if run.flanking.can_close
            && let Some(open) = openers.pop()
        {
            pairs.push((open, idx));
            continue;
        }
        if run.flanking.can_open {
            openers.push(idx);
        }
    }
    pairs
}
