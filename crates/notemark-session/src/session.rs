//! The editing session of one open note.

use std::sync::{Arc, LazyLock};

use notemark_core::{
    ChangeSet, CoreError, DecorationSet, Editor, Selection, SelectionRange, Transaction, Viewport,
    transaction::EVENT_TYPE,
};
use notemark_preview::{
    BidiMode, BidiPlugin, BlockWidgets, CellRef, Chord, DecorationEngine, Direction,
    FormatCommand, Key, KeyCode, PreviewDecoration, TableFocus, TableKey, TableKeyOutcome,
    TableMenuAction, Widget, default_keymap, delete_backward, delete_forward,
    ensure_trailing_newline, insert_text, lookup, run_command, type_char,
};
use notemark_syntax::{SyntaxCache, SyntaxTree, markdown_to_html};
use notemark_vim::{CaretStyle, HostRequest, Mode, Motion, Vim};
use regex::Regex;

use crate::{
    collaborators::{CollaboratorError, Collaborators, LinkCandidate},
    config::SessionConfig,
    error::SessionError,
};

/// An unclosed `[[query` ending at the cursor.
static LINK_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]\n]*)$").expect("valid link query regex"));

/// A line with nothing but block markers.
static MARKER_ONLY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#{1,6}|>|[-*+]|\d+[.)])?\s*(?:\[[ xX]\])?\s*$")
        .expect("valid marker line regex")
});

/// Why the session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Content was saved first.
    Saved,
    /// Nothing worth saving; closed directly.
    Empty,
    /// Closed without saving on request.
    Discarded,
}

/// Result of [`EditorSession::handle_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was consumed.
    Handled,
    /// No binding; the host may handle it.
    Ignored,
    /// The note was closed.
    Closed(CloseReason),
    /// A collaborator failed. The buffer is unchanged and the note stays open.
    Failed(CollaboratorError),
}

/// Everything a host needs to draw the note.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    /// Buffer revision the snapshot describes.
    pub revision: u64,
    /// Current selection.
    pub selection: Selection,
    /// Marker and style decorations.
    pub decorations: Arc<DecorationSet<PreviewDecoration>>,
    /// Block widgets.
    pub widgets: DecorationSet<Widget>,
    /// Line directions.
    pub directions: Arc<DecorationSet<Direction>>,
    /// Focused table cell.
    pub table_focus: Option<TableFocus>,
    /// Modal state, when modal editing is on.
    pub mode: Option<Mode>,
    /// Mode indicator text, when modal editing is on.
    pub mode_indicator: Option<String>,
    /// Caret shape.
    pub caret: CaretStyle,
    /// Message for the status line.
    pub status: Option<String>,
}

/// Clipboard flavours for the selection, or the whole note when nothing is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    /// Markdown source.
    pub plain_text: String,
    /// Rendered HTML.
    pub html: String,
}

#[derive(Debug)]
struct LinkQuery {
    from: usize,
    to: usize,
    query: String,
}

/// One open note: its buffer, the derived preview layers, optional modal state and the host
/// services it reports to.
pub struct EditorSession {
    editor: Editor,
    cache: SyntaxCache,
    engine: DecorationEngine,
    widgets: BlockWidgets,
    bidi: BidiPlugin,
    vim: Option<Vim>,
    keymap: Vec<(Chord, FormatCommand)>,
    config: SessionConfig,
    services: Collaborators,
    status: Option<String>,
    /// Text as of the last save, or as opened. Discarding restores it.
    saved_text: String,
    closed: bool,
}

impl EditorSession {
    /// Open `content`.
    pub fn new(content: &str, config: SessionConfig, services: Collaborators) -> Self {
        let mut editor = Editor::with_history_depth(content, config.history_depth);
        editor.focus();
        let mut engine = DecorationEngine::new();
        engine.set_show_raw(!config.live_preview);
        let vim = config.vim_mode.then(|| new_vim(&config));
        tracing::debug!(
            chars = editor.len_chars(),
            vim = config.vim_mode,
            "session mounted"
        );
        Self {
            editor,
            cache: SyntaxCache::default(),
            engine,
            widgets: BlockWidgets::new(),
            bidi: BidiPlugin::new(config.bidi),
            vim,
            keymap: default_keymap(),
            config,
            services,
            status: None,
            saved_text: content.to_string(),
            closed: false,
        }
    }

    /// The buffer.
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Current text.
    pub fn text(&self) -> String {
        self.editor.text()
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Modal driver, when modal editing is on.
    pub fn vim(&self) -> Option<&Vim> {
        self.vim.as_ref()
    }

    /// Returns `true` once the close collaborator succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Status line message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Route one key press.
    pub fn handle_key(&mut self, key: Key) -> Result<KeyOutcome, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.status = None;

        if self.widgets.focus().is_some() {
            let Some(table_key) = table_key_for(&key) else {
                return Ok(KeyOutcome::Ignored);
            };
            self.table_key(table_key)?;
            return Ok(KeyOutcome::Handled);
        }

        let outcome = match self.vim.as_mut() {
            Some(vim) => {
                let requests = vim.feed(key, &mut self.editor, &mut self.cache)?;
                let mut outcome = KeyOutcome::Handled;
                for request in requests {
                    outcome = match request {
                        HostRequest::SaveAndClose => self.save_and_close(),
                        HostRequest::DiscardAndClose => self.discard_and_close()?,
                    };
                }
                outcome
            }
            None => self.handle_plain_key(key)?,
        };
        self.sync()?;
        Ok(outcome)
    }

    fn handle_plain_key(&mut self, key: Key) -> Result<KeyOutcome, SessionError> {
        let mods = key.modifiers;
        if mods.primary() {
            if let KeyCode::Char(ch) = key.code {
                match ch.to_ascii_lowercase() {
                    'z' if mods.shift => return self.redo(),
                    'z' => return self.undo(),
                    'y' => return self.redo(),
                    _ => {}
                }
            }
            let Some(command) = lookup(&self.keymap, &key) else {
                return Ok(KeyOutcome::Ignored);
            };
            let tree = self.cache.tree(&self.editor);
            run_command(&mut self.editor, &tree, command)?;
            return Ok(KeyOutcome::Handled);
        }

        let auto_pair = self.config.auto_pair;
        let tr = match key.code {
            KeyCode::Escape => return Ok(self.save_and_close()),
            KeyCode::Char(ch) if mods.is_plain() => type_char(&self.editor, ch, auto_pair),
            KeyCode::Enter => insert_text(&self.editor, "\n"),
            KeyCode::Tab if self.config.tab_width > 0 => {
                insert_text(&self.editor, &" ".repeat(self.config.tab_width))
            }
            KeyCode::Tab => insert_text(&self.editor, "\t"),
            KeyCode::Backspace => delete_backward(&self.editor, auto_pair),
            KeyCode::Delete => delete_forward(&self.editor),
            KeyCode::Left => return self.move_cursor(Some(Motion::Left), mods.shift),
            KeyCode::Right => return self.move_cursor(Some(Motion::Right), mods.shift),
            KeyCode::Up => return self.move_cursor(Some(Motion::Up), mods.shift),
            KeyCode::Down => return self.move_cursor(Some(Motion::Down), mods.shift),
            KeyCode::Home => return self.move_cursor(Some(Motion::LineStart), mods.shift),
            KeyCode::End => return self.move_cursor(None, mods.shift),
            _ => return Ok(KeyOutcome::Ignored),
        };
        if let Some(tr) = tr {
            self.editor.dispatch(tr)?;
        }
        Ok(KeyOutcome::Handled)
    }

    /// Move the main cursor by `motion`, or to the end of its line for `None`.
    fn move_cursor(
        &mut self,
        motion: Option<Motion>,
        extend: bool,
    ) -> Result<KeyOutcome, SessionError> {
        let main = self.editor.selection().main();
        let doc = self.editor.doc();
        let head = match motion {
            Some(motion) => motion.target(doc, main.head, None, None),
            None => doc.line_at(main.head).to,
        };
        let range = if extend {
            SelectionRange::new(main.anchor, head)
        } else {
            SelectionRange::cursor(head)
        };
        self.editor.set_selection(Selection::new(vec![range], 0))?;
        Ok(KeyOutcome::Handled)
    }

    fn undo(&mut self) -> Result<KeyOutcome, SessionError> {
        match self.editor.undo() {
            Ok(_) => Ok(KeyOutcome::Handled),
            Err(CoreError::NothingToUndo) => Ok(KeyOutcome::Ignored),
            Err(err) => Err(err.into()),
        }
    }

    fn redo(&mut self) -> Result<KeyOutcome, SessionError> {
        match self.editor.redo() {
            Ok(_) => Ok(KeyOutcome::Handled),
            Err(CoreError::NothingToRedo) => Ok(KeyOutcome::Ignored),
            Err(err) => Err(err.into()),
        }
    }

    fn save_and_close(&mut self) -> KeyOutcome {
        let content = self.editor.text();
        if is_effectively_empty(&content) {
            tracing::debug!("empty note closes without saving");
            return self.close(CloseReason::Empty);
        }
        match self.services.saver.save(&content) {
            Ok(ack) => {
                self.editor.mark_saved();
                self.saved_text = content;
                tracing::debug!(location = ?ack.location, "note saved");
                self.close(CloseReason::Saved)
            }
            Err(err) => self.report(err),
        }
    }

    /// Close without saving and drop every edit since the last save.
    fn discard_and_close(&mut self) -> Result<KeyOutcome, SessionError> {
        let outcome = self.close(CloseReason::Discarded);
        if matches!(outcome, KeyOutcome::Closed(_)) && self.editor.text() != self.saved_text {
            let len = self.editor.len_chars();
            let revert = Transaction::new(ChangeSet::replace(0, len, self.saved_text.clone()))
                .with_selection(Selection::cursor(0))
                .without_history();
            self.editor.dispatch(revert)?;
            self.editor.mark_saved();
            tracing::debug!("edits discarded");
        }
        Ok(outcome)
    }

    fn close(&mut self, reason: CloseReason) -> KeyOutcome {
        match self.services.closer.close() {
            Ok(()) => {
                self.closed = true;
                self.editor.blur();
                tracing::debug!(?reason, "note closed");
                KeyOutcome::Closed(reason)
            }
            Err(err) => self.report(err),
        }
    }

    fn report(&mut self, err: CollaboratorError) -> KeyOutcome {
        tracing::warn!(%err, "note stays open");
        self.status = Some(err.to_string());
        KeyOutcome::Failed(err)
    }

    /// Parse the current revision, append a newline after a trailing widget and bring the
    /// widgets up to date.
    fn sync(&mut self) -> Result<Arc<SyntaxTree>, SessionError> {
        let mut tree = self.cache.tree(&self.editor);
        if let Some(tr) = ensure_trailing_newline(&self.editor, &tree) {
            self.editor.dispatch(tr)?;
            tree = self.cache.tree(&self.editor);
        }
        self.widgets.update(&self.editor, &tree);
        Ok(tree)
    }

    /// Replace the selection.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), SessionError> {
        self.editor.set_selection(selection)?;
        self.sync()?;
        Ok(())
    }

    /// Set the visible range.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), SessionError> {
        self.editor.set_viewport(viewport);
        self.sync()?;
        Ok(())
    }

    /// Turn modal editing on or off. Turning it on starts in Normal mode.
    pub fn set_vim_enabled(&mut self, enabled: bool) {
        match (enabled, self.vim.take()) {
            (true, Some(vim)) => self.vim = Some(vim),
            (true, None) => {
                self.vim = Some(new_vim(&self.config));
                tracing::debug!("modal editing on");
            }
            (false, Some(vim)) => {
                if vim.state().mode() == Mode::Insert {
                    self.editor.end_undo_group();
                }
                tracing::debug!("modal editing off");
            }
            (false, None) => {}
        }
        self.config.vim_mode = enabled;
    }

    /// Change the text direction mode.
    pub fn set_bidi_mode(&mut self, mode: BidiMode) {
        self.bidi.set_mode(mode);
        self.config.bidi = mode;
    }

    /// Toggle marker hiding.
    pub fn set_live_preview(&mut self, live_preview: bool) {
        self.engine.set_show_raw(!live_preview);
        self.config.live_preview = live_preview;
    }

    /// Toggle delimiter auto-pairing.
    pub fn set_auto_pair(&mut self, auto_pair: bool) {
        if let Some(vim) = &mut self.vim {
            vim.set_auto_pair(auto_pair);
        }
        self.config.auto_pair = auto_pair;
    }

    /// Focus `cell` of the table starting at `table_from`.
    pub fn focus_table_cell(&mut self, table_from: usize, cell: CellRef) -> Result<(), SessionError> {
        self.sync()?;
        self.widgets.focus_cell(table_from, cell)?;
        Ok(())
    }

    /// Set the focused cell's text and write the table back.
    pub fn table_cell_input(&mut self, text: &str) -> Result<(), SessionError> {
        if let Some(tr) = self.widgets.cell_input(text)? {
            self.editor.dispatch(tr)?;
        }
        self.sync()?;
        Ok(())
    }

    /// Commit `pending` cell text, if any, and release table focus.
    pub fn table_blur(&mut self, pending: Option<&str>) -> Result<(), SessionError> {
        if let Some(tr) = self.widgets.blur(pending)? {
            self.editor.dispatch(tr)?;
        }
        self.sync()?;
        Ok(())
    }

    /// Grid navigation. Returns the newly focused cell, or `None` when focus left the table.
    pub fn table_key(&mut self, key: TableKey) -> Result<Option<CellRef>, SessionError> {
        match self.widgets.key(key, &self.editor)? {
            TableKeyOutcome::Moved(cell) => Ok(Some(cell)),
            TableKeyOutcome::Exited(tr) => {
                self.editor.dispatch(tr)?;
                self.sync()?;
                Ok(None)
            }
        }
    }

    /// Context menu of the focused cell, with each action's enabled state.
    pub fn table_menu_actions(&self) -> Result<Vec<(TableMenuAction, bool)>, SessionError> {
        Ok(self.widgets.menu_actions()?)
    }

    /// Run a context menu action on the focused table.
    pub fn table_menu_apply(&mut self, action: TableMenuAction) -> Result<(), SessionError> {
        let tr = self.widgets.apply_menu(action)?;
        self.editor.dispatch(tr)?;
        self.sync()?;
        Ok(())
    }

    /// Report that the image at `src` failed to load. Returns `true` if a widget changed.
    pub fn image_load_failed(&mut self, src: &str) -> bool {
        self.widgets.image_load_failed(src)
    }

    /// Hand image bytes to the importer and embed the returned URL at the cursor.
    pub fn import_image(&mut self, bytes: &[u8], mime: &str) -> Result<String, SessionError> {
        let url = match self.services.images.import(bytes, mime) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(%err, mime, "image import failed");
                self.status = Some(err.to_string());
                return Err(err.into());
            }
        };
        if let Some(tr) = insert_text(&self.editor, &format!("![]({url})")) {
            self.editor.dispatch(tr)?;
        }
        self.sync()?;
        Ok(url)
    }

    fn link_query(&self) -> Option<LinkQuery> {
        let main = self.editor.selection().main();
        if !main.is_empty() {
            return None;
        }
        let line = self.editor.line_at(main.head);
        let before = self.editor.doc().slice(line.from, main.head);
        let caps = LINK_QUERY.captures(&before)?;
        let start = caps.get(0)?.start();
        Some(LinkQuery {
            from: line.from + before[..start].chars().count(),
            to: main.head,
            query: caps[1].to_string(),
        })
    }

    /// Candidates for an open `[[query` before the cursor; empty when there is none.
    pub fn link_completions(&self) -> Vec<LinkCandidate> {
        let Some(query) = self.link_query() else {
            return Vec::new();
        };
        let limit = self.config.link_candidate_limit;
        let mut candidates = self.services.links.resolve(&query.query, limit);
        candidates.truncate(limit);
        tracing::trace!(query = %query.query, found = candidates.len(), "link completions");
        candidates
    }

    /// Replace the open `[[query` (and a closing `]]` right after it) with a link to
    /// `candidate`. Returns `false` when no query is open.
    pub fn accept_link_completion(
        &mut self,
        candidate: &LinkCandidate,
    ) -> Result<bool, SessionError> {
        let Some(query) = self.link_query() else {
            return Ok(false);
        };
        let mut to = query.to;
        let len = self.editor.len_chars();
        if self.editor.doc().slice(to, (to + 2).min(len)) == "]]" {
            to += 2;
        }
        let link = format!("[{}]({})", candidate.label, candidate.location);
        let end = query.from + link.chars().count();
        let tr = Transaction::new(ChangeSet::replace(query.from, to, link))
            .with_selection(Selection::cursor(end))
            .user_event(EVENT_TYPE);
        self.editor.dispatch(tr)?;
        self.sync()?;
        Ok(true)
    }

    /// Snapshot of everything the host draws.
    pub fn render(&mut self) -> Result<RenderSnapshot, SessionError> {
        let tree = self.sync()?;
        let decorations = self.engine.decorations(
            self.editor.revision(),
            &tree,
            self.editor.selection(),
            self.editor.viewport(),
        );
        let directions = self.bidi.directions(&self.editor);
        let (mode, mode_indicator, caret, message) = match &self.vim {
            Some(vim) => {
                let state = vim.state();
                (
                    Some(state.mode()),
                    Some(state.indicator()),
                    state.caret(),
                    state.message().map(str::to_string),
                )
            }
            None => (None, None, CaretStyle::Line, None),
        };
        Ok(RenderSnapshot {
            revision: self.editor.revision(),
            selection: self.editor.selection().clone(),
            decorations,
            widgets: self.widgets.widgets().clone(),
            directions,
            table_focus: self.widgets.focus().cloned(),
            mode,
            mode_indicator,
            caret,
            status: message.or_else(|| self.status.clone()),
        })
    }

    /// Markdown and HTML for the main selection, or the whole note when it is a cursor.
    pub fn clipboard_payload(&self) -> ClipboardPayload {
        let main = self.editor.selection().main();
        let plain_text = if main.is_empty() {
            self.editor.text()
        } else {
            self.editor.doc().slice(main.from(), main.to())
        };
        let html = markdown_to_html(&plain_text);
        ClipboardPayload { plain_text, html }
    }

    /// Tear the session down and hand back the final text. After a discarding close that is
    /// the text as last saved.
    pub fn unmount(mut self) -> String {
        if self.vim.as_ref().is_some_and(|vim| vim.state().mode() == Mode::Insert) {
            self.editor.end_undo_group();
        }
        self.editor.blur();
        tracing::debug!(
            chars = self.editor.len_chars(),
            modified = self.editor.is_modified(),
            "session unmounted"
        );
        self.editor.text()
    }
}

fn new_vim(config: &SessionConfig) -> Vim {
    Vim::new(config.auto_pair).with_tab_width(config.tab_width)
}

fn table_key_for(key: &Key) -> Option<TableKey> {
    match key.code {
        KeyCode::Tab if key.modifiers.shift => Some(TableKey::ShiftTab),
        KeyCode::Tab => Some(TableKey::Tab),
        KeyCode::Enter => Some(TableKey::Enter),
        KeyCode::Down => Some(TableKey::Down),
        KeyCode::Up => Some(TableKey::Up),
        KeyCode::Escape => Some(TableKey::Escape),
        _ => None,
    }
}

/// Returns `true` when every line is blank or holds only block markers such as `#` or `- [ ]`.
pub fn is_effectively_empty(text: &str) -> bool {
    text.lines().all(|line| MARKER_ONLY_LINE.is_match(line))
}
