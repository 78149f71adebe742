//! HTML export.
//!
//! Renders with pulldown-cmark's HTML writer, splicing `<mark>` tags around resolved highlight
//! spans. Unresolved `==` runs stay literal text.

use pulldown_cmark::{CowStr, Event, Parser, html};

use crate::parser::{markdown_options, parse};
use crate::tree::NodeKind;

/// Render `markdown` to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let marks = highlight_marks(markdown);

    let mut events: Vec<Event<'_>> = Vec::new();
    for (event, range) in Parser::new_ext(markdown, markdown_options()).into_offset_iter() {
        let inside: Vec<&(usize, usize, bool)> = marks
            .iter()
            .filter(|(from, to, _)| range.start <= *from && *to <= range.end)
            .collect();

        match event {
            Event::Text(text) if !inside.is_empty() && *text == markdown[range.clone()] => {
                let mut cursor = range.start;
                for &&(from, to, opens) in &inside {
                    if from > cursor {
                        events.push(Event::Text(CowStr::Borrowed(&markdown[cursor..from])));
                    }
                    let tag = if opens { "<mark>" } else { "</mark>" };
                    events.push(Event::InlineHtml(CowStr::Borrowed(tag)));
                    cursor = to;
                }
                if cursor < range.end {
                    events.push(Event::Text(CowStr::Borrowed(&markdown[cursor..range.end])));
                }
            }
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

/// Byte ranges of resolved highlight delimiters, with `true` for openers.
fn highlight_marks(markdown: &str) -> Vec<(usize, usize, bool)> {
    let tree = parse(markdown);
    let byte_of: Vec<usize> = markdown
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(markdown.len()))
        .collect();
    let byte = |pos: usize| byte_of.get(pos).copied().unwrap_or(markdown.len());

    let mut marks = Vec::new();
    for node in tree.find_all(|k| k == NodeKind::Highlight) {
        let mut delims = node.marks().filter(|m| m.kind == NodeKind::HighlightMark);
        if let (Some(open), Some(close)) = (delims.next(), delims.next()) {
            marks.push((byte(open.from), byte(open.to), true));
            marks.push((byte(close.from), byte(close.to), false));
        }
    }
    marks.sort_unstable();
    marks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_heading_and_paragraph() {
        let html = markdown_to_html("# Title\n\nhello world");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>hello world</p>"));
    }

    #[test]
    fn test_renders_inline_markdown() {
        let html = markdown_to_html("This has **bold**, *italic*, ~~gone~~ and `code`.");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("<code>code</code>"));
    }

    #[test]
    fn test_highlight_becomes_mark() {
        let html = markdown_to_html("a ==hot== take");
        assert_eq!(html, "<p>a <mark>hot</mark> take</p>\n");
    }

    #[test]
    fn test_unpaired_highlight_stays_literal() {
        let html = markdown_to_html("a == b");
        assert_eq!(html, "<p>a == b</p>\n");
    }
}
