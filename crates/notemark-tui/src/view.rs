//! Turns a render snapshot into styled terminal lines.

use std::collections::BTreeMap;

use notemark_preview::{Direction, PreviewDecoration, StyleClass, WidgetKind};
use notemark_session::RenderSnapshot;
use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

/// Visible lines plus where the cursor lands among them.
pub struct Rendered {
    pub lines: Vec<Line<'static>>,
    /// `(column, row)` relative to the first rendered line, when the cursor is visible.
    pub cursor: Option<(u16, u16)>,
}

/// Char offset where each line starts.
pub fn line_starts(chars: &[char]) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        chars
            .iter()
            .enumerate()
            .filter(|(_, ch)| **ch == '\n')
            .map(|(i, _)| i + 1),
    );
    starts
}

fn style_for(class: StyleClass) -> Style {
    match class {
        StyleClass::Strong => Style::default().add_modifier(Modifier::BOLD),
        StyleClass::Emphasis => Style::default().add_modifier(Modifier::ITALIC),
        StyleClass::Strikethrough => Style::default().add_modifier(Modifier::CROSSED_OUT),
        StyleClass::InlineCode => Style::default().fg(Color::Yellow),
        StyleClass::Highlight => Style::default().fg(Color::Black).bg(Color::Yellow),
        StyleClass::Link => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
        StyleClass::Heading(1) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        StyleClass::Heading(_) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    }
}

/// Render `rows` lines of `text` starting at line `top`.
pub fn render_lines(text: &str, snapshot: &RenderSnapshot, top: usize, rows: usize) -> Rendered {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut hidden = vec![false; len];
    let mut styles = vec![Style::default(); len];
    let mut inserts: BTreeMap<usize, Span<'static>> = BTreeMap::new();

    for d in snapshot.decorations.iter() {
        let (from, to) = (d.from.min(len), d.to.min(len));
        match &d.value {
            PreviewDecoration::Hide => hidden[from..to].fill(true),
            PreviewDecoration::Style(class) => {
                for style in &mut styles[from..to] {
                    *style = style.patch(style_for(*class));
                }
            }
            _ => {}
        }
    }

    for d in snapshot.widgets.iter() {
        let (from, to) = (d.from.min(len), d.to.min(len));
        let placeholder = match &d.value.kind {
            WidgetKind::Rule => "─".repeat(24),
            WidgetKind::Image(image) => format!("[image: {}]", image.placeholder()),
            WidgetKind::Table(_) => {
                let focused = snapshot
                    .table_focus
                    .as_ref()
                    .is_some_and(|focus| focus.table_from == d.from);
                let color = if focused { Color::LightGreen } else { Color::Cyan };
                for style in &mut styles[from..to] {
                    *style = style.fg(color);
                }
                continue;
            }
        };
        hidden[from..to].fill(true);
        inserts.insert(
            from,
            Span::styled(placeholder, Style::default().fg(Color::DarkGray)),
        );
    }

    let rtl_at = |pos: usize| {
        snapshot
            .directions
            .iter()
            .any(|d| d.value == Direction::Rtl && d.from <= pos && pos <= d.to)
    };

    let starts = line_starts(&chars);
    let head = snapshot.selection.head();
    let mut lines = Vec::with_capacity(rows);
    let mut cursor = None;
    for (row, &start) in starts.iter().enumerate().skip(top).take(rows) {
        let end = starts.get(row + 1).map_or(len, |next| next - 1);
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style = Style::default();
        let mut column = 0usize;

        for pos in start..=end {
            if pos == head {
                cursor = Some((column as u16, (row - top) as u16));
            }
            if let Some(span) = inserts.get(&pos) {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
                column += span.width();
                spans.push(span.clone());
            }
            if pos == end || hidden[pos] {
                continue;
            }
            let ch = chars[pos];
            if styles[pos] != run_style {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
                run_style = styles[pos];
            }
            if ch == '\t' {
                run.push_str("    ");
                column += 4;
            } else {
                run.push(ch);
                column += ch.width().unwrap_or(0);
            }
        }
        spans.push(Span::styled(run, run_style));
        spans.retain(|span| !span.content.is_empty());

        let mut line = Line::from(spans);
        if rtl_at(start) {
            line = line.alignment(Alignment::Right);
        }
        lines.push(line);
    }

    Rendered { lines, cursor }
}
