//! Application state of the terminal host.

use std::{
    cell::Cell,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use crossterm::event::{KeyCode as TermKeyCode, KeyEvent, KeyModifiers};
use notemark_core::{Selection, Viewport};
use notemark_preview::{CellRef, Key, KeyCode, TableMenuAction, WidgetKind};
use notemark_session::{
    CollaboratorError, Collaborators, EditorSession, KeyOutcome, LinkCandidate, SaveAck,
    SessionConfig, SessionError,
};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{keys::to_key, view};

pub struct App {
    session: EditorSession,
    path: PathBuf,
    /// Set by the close collaborator.
    closed: Rc<Cell<bool>>,
    clipboard: String,
    /// Text of the focused table cell while editing it.
    cell_buffer: Option<String>,
    completions: Vec<LinkCandidate>,
    scroll_top: usize,
    message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(path: PathBuf, config: SessionConfig) -> io::Result<Self> {
        let content = if path.exists() {
            fs::read_to_string(&path)?
        } else {
            String::new()
        };

        let closed = Rc::new(Cell::new(false));
        let save_path = path.clone();
        let close_flag = Rc::clone(&closed);
        let notes_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let services = Collaborators::new(
            move |content: &str| -> Result<SaveAck, CollaboratorError> {
                fs::write(&save_path, content)
                    .map_err(|err| CollaboratorError::Save(err.to_string()))?;
                Ok(SaveAck {
                    location: Some(save_path.display().to_string()),
                })
            },
            move || -> Result<(), CollaboratorError> {
                close_flag.set(true);
                Ok(())
            },
        )
        .with_link_resolver(move |query: &str, limit: usize| {
            find_notes(&notes_dir, query, limit)
        });

        Ok(Self {
            session: EditorSession::new(&content, config, services),
            path,
            closed,
            clipboard: String::new(),
            cell_buffer: None,
            completions: Vec::new(),
            scroll_top: 0,
            message: None,
            should_quit: false,
        })
    }

    pub fn handle_key_event(&mut self, event: KeyEvent) {
        if let Err(err) = self.dispatch_key_event(event) {
            tracing::warn!(%err, "key rejected");
            self.message = Some(err.to_string());
        }
        self.completions = self.session.link_completions();
        if self.closed.get() {
            self.should_quit = true;
        }
    }

    fn dispatch_key_event(&mut self, event: KeyEvent) -> Result<(), SessionError> {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);
        self.message = None;

        match event.code {
            TermKeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                return Ok(());
            }
            TermKeyCode::F(2) => {
                let enabled = self.session.vim().is_none();
                self.session.set_vim_enabled(enabled);
                self.message = Some(format!("vim mode {}", if enabled { "on" } else { "off" }));
                return Ok(());
            }
            TermKeyCode::Char('l') if ctrl => {
                if let Some(candidate) = self.completions.first().cloned() {
                    self.session.accept_link_completion(&candidate)?;
                }
                return Ok(());
            }
            TermKeyCode::Char('c') if ctrl => {
                let payload = self.session.clipboard_payload();
                self.message = Some(format!(
                    "copied {} chars ({} bytes of html)",
                    payload.plain_text.chars().count(),
                    payload.html.len()
                ));
                self.clipboard = payload.plain_text;
                return Ok(());
            }
            TermKeyCode::Char('v') if ctrl => {
                let text = self.clipboard.clone();
                return self.paste(&text);
            }
            TermKeyCode::Char('a') if ctrl && self.cell_buffer.is_none() => {
                return self.select_all();
            }
            TermKeyCode::Char('t') if ctrl && self.cell_buffer.is_none() => {
                return self.enter_table();
            }
            _ => {}
        }

        if self.cell_buffer.is_some() {
            return self.table_event(event, alt);
        }

        let Some(key) = to_key(event) else {
            return Ok(());
        };
        match self.session.handle_key(key)? {
            KeyOutcome::Failed(err) => self.message = Some(err.to_string()),
            KeyOutcome::Closed(reason) => {
                tracing::info!(?reason, path = %self.path.display(), "closed");
                self.should_quit = true;
            }
            KeyOutcome::Handled | KeyOutcome::Ignored => {}
        }
        Ok(())
    }

    fn enter_table(&mut self) -> Result<(), SessionError> {
        let head = self.session.editor().selection().head();
        let snapshot = self.session.render()?;
        let table = snapshot.widgets.iter().find_map(|d| match &d.value.kind {
            WidgetKind::Table(model) if d.from <= head && head <= d.to => {
                Some((d.from, model.cell(CellRef::new(0, 0)).unwrap_or_default().to_string()))
            }
            _ => None,
        });
        match table {
            Some((from, text)) => {
                self.session.focus_table_cell(from, CellRef::new(0, 0))?;
                self.cell_buffer = Some(text);
            }
            None => self.message = Some("cursor is not in a table".to_string()),
        }
        Ok(())
    }

    fn table_event(&mut self, event: KeyEvent, alt: bool) -> Result<(), SessionError> {
        let Some(buffer) = self.cell_buffer.as_mut() else {
            return Ok(());
        };
        match event.code {
            TermKeyCode::F(3) => {
                let menu = self.session.table_menu_actions()?;
                let entries: Vec<String> = menu
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, enabled))| *enabled)
                    .map(|(i, (action, _))| format!("Alt+{} {action:?}", i + 1))
                    .collect();
                self.message = Some(entries.join("  "));
            }
            TermKeyCode::Char(digit @ '1'..='6') if alt => {
                let index = digit as usize - '1' as usize;
                let action = TableMenuAction::ALL[index];
                let enabled = self
                    .session
                    .table_menu_actions()?
                    .into_iter()
                    .any(|(a, on)| a == action && on);
                if enabled {
                    let pending = buffer.clone();
                    self.session.table_cell_input(&pending)?;
                    self.session.table_menu_apply(action)?;
                    self.reload_cell_buffer();
                }
            }
            TermKeyCode::Char(ch) => buffer.push(ch),
            TermKeyCode::Backspace => {
                buffer.pop();
            }
            TermKeyCode::Esc => {
                let pending = buffer.clone();
                self.session.table_blur(Some(&pending))?;
                self.cell_buffer = None;
            }
            _ => {
                let Some(key) = to_key(event) else {
                    return Ok(());
                };
                let pending = buffer.clone();
                self.session.table_cell_input(&pending)?;
                self.session.handle_key(key)?;
                self.reload_cell_buffer();
            }
        }
        Ok(())
    }

    fn reload_cell_buffer(&mut self) {
        self.cell_buffer = self.session.render().ok().and_then(|snapshot| {
            let focus = snapshot.table_focus?;
            focus.model.cell(focus.cell).map(str::to_string)
        });
    }

    pub fn paste(&mut self, text: &str) -> Result<(), SessionError> {
        for ch in text.chars() {
            let key = match ch {
                '\n' => Key::new(KeyCode::Enter),
                '\r' => continue,
                ch => Key::char(ch),
            };
            self.session.handle_key(key)?;
        }
        Ok(())
    }

    pub fn handle_paste(&mut self, text: String) {
        if let Err(err) = self.paste(&text) {
            self.message = Some(err.to_string());
        }
    }

    /// Flush the session and return the final text.
    pub fn finish(self) -> String {
        self.session.unmount()
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let editor_area = chunks[0];
        let rows = editor_area.height.saturating_sub(2) as usize;
        if let Err(err) = self.render_editor(frame, editor_area, chunks[1], rows) {
            tracing::error!(%err, "render failed");
            self.message = Some(err.to_string());
        }
        self.render_shortcuts(frame, chunks[2]);
    }

    fn render_editor(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        status_area: Rect,
        rows: usize,
    ) -> Result<(), SessionError> {
        let text = self.session.text();
        let chars: Vec<char> = text.chars().collect();
        let starts = view::line_starts(&chars);
        let head = self.session.editor().selection().head();
        let cursor_line = starts.partition_point(|&s| s <= head).saturating_sub(1);

        if cursor_line < self.scroll_top {
            self.scroll_top = cursor_line;
        } else if rows > 0 && cursor_line >= self.scroll_top + rows {
            self.scroll_top = cursor_line + 1 - rows;
        }
        let first = starts.get(self.scroll_top).copied().unwrap_or(0);
        let last = starts
            .get(self.scroll_top + rows)
            .map_or(chars.len(), |next| next.saturating_sub(1));
        self.session.set_viewport(Viewport::new(first, last))?;

        let mut snapshot = self.session.render()?;
        let fresh_images: Vec<String> = snapshot
            .widgets
            .iter()
            .filter_map(|d| match &d.value.kind {
                WidgetKind::Image(image) if !image.failed => Some(image.src.clone()),
                _ => None,
            })
            .collect();
        if !fresh_images.is_empty() {
            // A terminal cannot draw images, so every image takes its placeholder.
            for src in &fresh_images {
                self.session.image_load_failed(src);
            }
            snapshot = self.session.render()?;
        }

        let text = self.session.text();
        let rendered = view::render_lines(&text, &snapshot, self.scroll_top, rows);
        let title = format!(
            " {}{} ",
            self.path.display(),
            if self.session.editor().is_modified() { " [+]" } else { "" }
        );
        let block = Block::default().borders(Borders::ALL).title(title);
        frame.render_widget(Paragraph::new(rendered.lines).block(block), area);
        if let Some((col, row)) = rendered.cursor
            && self.cell_buffer.is_none()
        {
            frame.set_cursor_position((area.x + 1 + col, area.y + 1 + row));
        }

        let mut status = Vec::new();
        if let Some(indicator) = &snapshot.mode_indicator {
            status.push(Span::styled(
                format!(" {indicator} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if let (Some(buffer), Some(focus)) = (&self.cell_buffer, &snapshot.table_focus) {
            status.push(Span::raw(format!(
                " cell {},{}: {buffer}",
                focus.cell.row, focus.cell.col
            )));
        }
        let message = snapshot.status.clone().or_else(|| self.message.clone());
        if let Some(message) = message {
            status.push(Span::styled(
                format!(" {message}"),
                Style::default().fg(Color::Yellow),
            ));
        } else if !self.completions.is_empty() {
            let labels: Vec<&str> = self.completions.iter().map(|c| c.label.as_str()).collect();
            status.push(Span::raw(format!(" links: {}", labels.join(" | "))));
        }
        frame.render_widget(Paragraph::new(Line::from(status)), status_area);
        Ok(())
    }

    fn render_shortcuts(&self, frame: &mut Frame, area: Rect) {
        let help = if self.cell_buffer.is_some() {
            "Tab/Enter move  Esc leave table  F3 menu  Alt+1..6 menu action"
        } else {
            "Esc save & close  ^Q quit  F2 vim  ^T table  ^L link  ^C copy  ^V paste"
        };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }

    fn select_all(&mut self) -> Result<(), SessionError> {
        let len = self.session.editor().len_chars();
        self.session.set_selection(Selection::single(0, len))
    }
}

/// Markdown files in `dir` whose stem contains `query`, case-insensitively.
fn find_notes(dir: &Path, query: &str, limit: usize) -> Vec<LinkCandidate> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let query = query.to_lowercase();
    let mut found: Vec<LinkCandidate> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            let location = path.file_name()?.to_string_lossy().into_owned();
            stem.to_lowercase().contains(&query).then(|| LinkCandidate {
                id: stem.clone(),
                label: stem,
                location,
            })
        })
        .collect();
    found.sort_by(|a, b| a.label.cmp(&b.label));
    found.truncate(limit);
    found
}
