//! The modal state machine.
//!
//! [`VimState::handle`] is a pure step: it reads the buffer through an [`Editor`] reference and
//! returns the next state plus the [`VimEffect`]s the host executes, in order. Normal and
//! Visual keys accumulate in a pending buffer that is re-parsed on every key until it forms a
//! complete command (`d2w`, `3j`, `ci(`, `gg`, ...).

use std::mem;

use notemark_core::{ChangeSet, Document, Editor, Selection, Transaction, transaction::EVENT_VIM};
use notemark_preview::{FormatCommand, Key, KeyCode, default_keymap, lookup};

use crate::command::{ExCommand, parse_command};
use crate::mode::{CaretStyle, Mode, indicator};
use crate::motion::{
    Motion, MotionKind, WordType, char_class, clamp_to_char, first_non_blank, grapheme_left,
    grapheme_right, inclusive_end,
};
use crate::text_object::TextObject;

/// Counts are capped so a stray digit run cannot request absurd repeats.
const MAX_COUNT: usize = 9_999;

/// Work the host performs after a step.
#[derive(Debug, Clone)]
pub enum VimEffect {
    /// Dispatch this transaction.
    Apply(Transaction),
    /// Type a character (through the auto-pair interceptor when enabled).
    InsertChar(char),
    /// Insert a line break.
    InsertNewline,
    /// Backspace.
    DeleteBackward,
    /// Forward delete.
    DeleteForward,
    /// Run a formatting command against the current tree.
    Format(FormatCommand),
    /// Undo one history group.
    Undo,
    /// Redo one history group.
    Redo,
    /// Open an undo group spanning an insert session.
    BeginUndoGroup,
    /// Close the insert session's undo group.
    EndUndoGroup,
    /// Feed these keys back through the machine, one at a time.
    Replay(Vec<Key>),
    /// Save, then close when the save succeeds.
    SaveAndClose,
    /// Close without saving, discarding the buffer.
    DiscardAndClose,
}

/// Operators that combine with a motion or text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `d`
    Delete,
    /// `c`
    Change,
    /// `y`
    Yank,
}

impl Operator {
    fn from_char(ch: char) -> Option<Operator> {
        match ch {
            'd' => Some(Operator::Delete),
            'c' => Some(Operator::Change),
            'y' => Some(Operator::Yank),
            _ => None,
        }
    }
}

/// The unnamed register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register {
    /// Yanked or deleted text. Linewise text ends with a line break.
    pub text: String,
    /// Whole lines rather than a character span.
    pub linewise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Motion(Motion),
    Object(TextObject),
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertAt {
    Cursor,
    AfterCursor,
    LineStart,
    LineEnd,
    LineBelow,
    LineAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NormalAction {
    Move(Motion),
    Operate(Operator, Target),
    Paste { before: bool },
    Insert(InsertAt),
    Visual(Mode),
    CommandLine,
    Undo,
    Redo,
    Repeat,
    Format(FormatCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisualAction {
    Move(Motion),
    Object(TextObject),
    Operate(Operator),
    SwapEnds,
    Switch(Mode),
    Format(FormatCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parse<T> {
    Incomplete,
    Invalid,
    Done(T),
}

/// Span an operator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    from: usize,
    to: usize,
    linewise: bool,
    /// Cursor after a yank.
    cursor: usize,
}

impl Span {
    fn chars(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            linewise: false,
            cursor: from,
        }
    }

    fn lines(doc: &Document, first: usize, last: usize, cursor: usize) -> Self {
        Self {
            from: doc.line(first).map_or(0, |line| line.from),
            to: doc.line(last).map_or(doc.len_chars(), |line| line.to),
            linewise: true,
            cursor,
        }
    }
}

/// Modal editing state for one session.
#[derive(Debug, Clone, Default)]
pub struct VimState {
    mode: Mode,
    pending: Vec<Key>,
    register: Register,
    command_line: String,
    message: Option<String>,
    last_change: Vec<Key>,
    /// Keys of the change being recorded during an insert session.
    recording: Option<Vec<Key>>,
    visual_anchor: usize,
    visual_head: usize,
    goal_column: Option<usize>,
}

impl VimState {
    /// Fresh state in Normal mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Caret shape for the current mode.
    pub fn caret(&self) -> CaretStyle {
        self.mode.caret()
    }

    /// Mode indicator text.
    pub fn indicator(&self) -> String {
        indicator(self.mode, &self.command_line)
    }

    /// Command line being typed (without the `:`).
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Inline status message, such as a rejected command.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The unnamed register.
    pub fn register(&self) -> &Register {
        &self.register
    }

    /// Keys of an incomplete Normal or Visual command.
    pub fn pending(&self) -> &[Key] {
        &self.pending
    }

    /// Keys `.` replays.
    pub fn last_change(&self) -> &[Key] {
        &self.last_change
    }

    /// Advance by one key.
    pub fn handle(mut self, key: Key, editor: &Editor) -> (VimState, Vec<VimEffect>) {
        let mut effects = Vec::new();
        match self.mode {
            Mode::Normal => self.normal(key, editor, &mut effects),
            Mode::Insert => self.insert(key, editor, &mut effects),
            Mode::Visual | Mode::VisualLine => self.visual(key, editor, &mut effects),
            Mode::Command => self.command(key, &mut effects),
        }
        tracing::trace!(?key, mode = ?self.mode, effects = effects.len(), "vim step");
        (self, effects)
    }

    fn normal(&mut self, key: Key, editor: &Editor, effects: &mut Vec<VimEffect>) {
        if key.code == KeyCode::Escape {
            self.pending.clear();
            return;
        }
        self.pending.push(key);
        match parse_normal(&self.pending) {
            Parse::Incomplete => {}
            Parse::Invalid => {
                tracing::trace!(keys = ?self.pending, "unmapped key sequence");
                self.pending.clear();
            }
            Parse::Done((count, action)) => {
                let keys = mem::take(&mut self.pending);
                self.message = None;
                self.run_normal(count, action, keys, editor.doc(), editor.selection(), effects);
            }
        }
    }

    fn run_normal(
        &mut self,
        count: Option<usize>,
        action: NormalAction,
        keys: Vec<Key>,
        doc: &Document,
        selection: &Selection,
        effects: &mut Vec<VimEffect>,
    ) {
        let pos = clamp_to_char(doc, selection.head());
        let repeat = count.unwrap_or(1).max(1);
        if !matches!(action, NormalAction::Move(m) if m.is_vertical()) {
            self.goal_column = None;
        }

        match action {
            NormalAction::Move(motion) => {
                let target = self.move_target(doc, pos, motion, count);
                effects.push(select(clamp_to_char(doc, target)));
            }
            NormalAction::Operate(op, target) => {
                if let Some(span) = operator_span(doc, pos, op, target, count) {
                    self.operate(op, span, Some(keys), doc, effects);
                }
            }
            NormalAction::Paste { before } => {
                if let Some(tr) = self.paste(doc, pos, before, repeat) {
                    effects.push(VimEffect::Apply(tr));
                    self.last_change = keys;
                }
            }
            NormalAction::Insert(at) => self.begin_insert(at, doc, pos, keys, effects),
            NormalAction::Visual(mode) => {
                self.mode = mode;
                self.visual_anchor = pos;
                self.visual_head = pos;
                effects.push(VimEffect::Apply(Transaction::select(
                    self.visual_selection(doc),
                )));
            }
            NormalAction::CommandLine => {
                self.mode = Mode::Command;
                self.command_line.clear();
            }
            NormalAction::Undo => effects.extend((0..repeat).map(|_| VimEffect::Undo)),
            NormalAction::Redo => effects.extend((0..repeat).map(|_| VimEffect::Redo)),
            NormalAction::Repeat if self.last_change.is_empty() => {}
            NormalAction::Repeat => match count.and_then(|n| with_count(&self.last_change, n)) {
                Some(keys) => effects.push(VimEffect::Replay(keys)),
                None => {
                    effects.extend((0..repeat).map(|_| VimEffect::Replay(self.last_change.clone())));
                }
            },
            NormalAction::Format(command) => effects.push(VimEffect::Format(command)),
        }
    }

    fn move_target(
        &mut self,
        doc: &Document,
        pos: usize,
        motion: Motion,
        count: Option<usize>,
    ) -> usize {
        let goal = motion.is_vertical().then(|| {
            self.goal_column
                .unwrap_or_else(|| pos.saturating_sub(doc.line_at(pos).from))
        });
        self.goal_column = goal;
        motion.target(doc, pos, count, goal)
    }

    fn operate(
        &mut self,
        op: Operator,
        span: Span,
        keys: Option<Vec<Key>>,
        doc: &Document,
        effects: &mut Vec<VimEffect>,
    ) {
        let empty = span.from == span.to && !span.linewise;
        if !empty {
            let mut text = doc.slice(span.from, span.to);
            if span.linewise {
                text.push('\n');
            }
            self.register = Register {
                text,
                linewise: span.linewise,
            };
        }

        match op {
            Operator::Yank => effects.push(select(clamp_to_char(doc, span.cursor))),
            Operator::Delete => {
                if empty {
                    return;
                }
                let (from, to, cursor) = if span.linewise {
                    linewise_delete(doc, span)
                } else {
                    (span.from, span.to, cursor_after_delete(doc, span.from, span.to))
                };
                effects.push(VimEffect::Apply(
                    Transaction::new(ChangeSet::delete(from, to))
                        .with_selection(Selection::cursor(cursor))
                        .user_event(EVENT_VIM),
                ));
                if let Some(keys) = keys {
                    self.last_change = keys;
                }
            }
            Operator::Change => {
                effects.push(VimEffect::BeginUndoGroup);
                if span.from < span.to {
                    effects.push(VimEffect::Apply(
                        Transaction::new(ChangeSet::delete(span.from, span.to))
                            .with_selection(Selection::cursor(span.from))
                            .user_event(EVENT_VIM),
                    ));
                } else {
                    effects.push(select(span.from));
                }
                self.enter_insert(keys);
            }
        }
    }

    fn paste(&self, doc: &Document, pos: usize, before: bool, repeat: usize) -> Option<Transaction> {
        if self.register.text.is_empty() {
            return None;
        }
        let body = self.register.text.repeat(repeat);
        let (at, insert, cursor) = if self.register.linewise {
            let line = doc.line_at(pos);
            let indent = body
                .chars()
                .take_while(|&c| c != '\n' && c.is_whitespace())
                .count();
            if before {
                (line.from, body, line.from + indent)
            } else if line.to < doc.len_chars() {
                (line.to + 1, body, line.to + 1 + indent)
            } else {
                let trimmed = body.strip_suffix('\n').unwrap_or(&body);
                (line.to, format!("\n{trimmed}"), line.to + 1 + indent)
            }
        } else {
            let at = if !before && doc.char_at(pos).is_some_and(|c| c != '\n') {
                grapheme_right(doc, pos)
            } else {
                pos
            };
            let len = body.chars().count();
            (at, body, at + len.saturating_sub(1))
        };
        Some(
            Transaction::new(ChangeSet::insert(at, insert))
                .with_selection(Selection::cursor(cursor))
                .user_event(EVENT_VIM),
        )
    }

    fn begin_insert(
        &mut self,
        at: InsertAt,
        doc: &Document,
        pos: usize,
        keys: Vec<Key>,
        effects: &mut Vec<VimEffect>,
    ) {
        effects.push(VimEffect::BeginUndoGroup);
        let line = doc.line_at(pos);
        let tr = match at {
            InsertAt::Cursor => Transaction::select(Selection::cursor(pos)),
            InsertAt::AfterCursor => Transaction::select(Selection::cursor(inclusive_end(doc, pos))),
            InsertAt::LineStart => Transaction::select(Selection::cursor(first_non_blank(&line))),
            InsertAt::LineEnd => Transaction::select(Selection::cursor(line.to)),
            InsertAt::LineBelow => Transaction::new(ChangeSet::insert(line.to, "\n"))
                .with_selection(Selection::cursor(line.to + 1))
                .user_event(EVENT_VIM),
            InsertAt::LineAbove => Transaction::new(ChangeSet::insert(line.from, "\n"))
                .with_selection(Selection::cursor(line.from))
                .user_event(EVENT_VIM),
        };
        effects.push(VimEffect::Apply(tr));
        self.enter_insert(Some(keys));
    }

    fn enter_insert(&mut self, keys: Option<Vec<Key>>) {
        self.mode = Mode::Insert;
        self.recording = keys;
        self.goal_column = None;
    }

    fn insert(&mut self, key: Key, editor: &Editor, effects: &mut Vec<VimEffect>) {
        let doc = editor.doc();
        let head = editor.selection().head();

        if key.code == KeyCode::Escape {
            if let Some(mut keys) = self.recording.take() {
                keys.push(key);
                self.last_change = keys;
            }
            effects.push(VimEffect::EndUndoGroup);
            let left = grapheme_left(doc, head);
            if left != head || !editor.selection().is_cursor() {
                effects.push(select(left));
            }
            self.mode = Mode::Normal;
            return;
        }

        let effect = if key.modifiers.primary() {
            match lookup(&default_keymap(), &key) {
                Some(command) => VimEffect::Format(command),
                None => return,
            }
        } else {
            match key.code {
                KeyCode::Char(_) if key.modifiers.alt => return,
                KeyCode::Char(ch) => VimEffect::InsertChar(ch),
                KeyCode::Tab => VimEffect::InsertChar('\t'),
                KeyCode::Enter => VimEffect::InsertNewline,
                KeyCode::Backspace => VimEffect::DeleteBackward,
                KeyCode::Delete => VimEffect::DeleteForward,
                KeyCode::End => {
                    effects.push(select(doc.line_at(head).to));
                    return;
                }
                KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Home => {
                    if let Some(motion) = Motion::from_key(&key) {
                        effects.push(select(motion.target(doc, head, None, None)));
                    }
                    return;
                }
                KeyCode::Escape => return,
            }
        };
        if let Some(keys) = self.recording.as_mut() {
            keys.push(key);
        }
        effects.push(effect);
    }

    fn visual(&mut self, key: Key, editor: &Editor, effects: &mut Vec<VimEffect>) {
        let doc = editor.doc();
        let len = doc.len_chars();
        self.visual_anchor = self.visual_anchor.min(len);
        self.visual_head = self.visual_head.min(len);

        if key.code == KeyCode::Escape {
            self.pending.clear();
            self.leave_visual(doc, effects);
            return;
        }
        self.pending.push(key);
        let (count, action) = match parse_visual(&self.pending) {
            Parse::Incomplete => return,
            Parse::Invalid => {
                self.pending.clear();
                return;
            }
            Parse::Done(parsed) => parsed,
        };
        self.pending.clear();
        if !matches!(action, VisualAction::Move(m) if m.is_vertical()) {
            self.goal_column = None;
        }

        match action {
            VisualAction::Move(motion) => {
                let target = self.move_target(doc, self.visual_head, motion, count);
                self.visual_head = clamp_to_char(doc, target);
                effects.push(VimEffect::Apply(Transaction::select(self.visual_selection(doc))));
            }
            VisualAction::Object(object) => {
                if let Some((from, to)) = object.range(doc, self.visual_head, count.unwrap_or(1))
                    && to > from
                {
                    self.visual_anchor = from;
                    self.visual_head = clamp_to_char(doc, to - 1);
                    effects.push(VimEffect::Apply(Transaction::select(
                        self.visual_selection(doc),
                    )));
                }
            }
            VisualAction::SwapEnds => {
                mem::swap(&mut self.visual_anchor, &mut self.visual_head);
                effects.push(VimEffect::Apply(Transaction::select(self.visual_selection(doc))));
            }
            VisualAction::Switch(mode) if mode == self.mode => self.leave_visual(doc, effects),
            VisualAction::Switch(mode) => {
                self.mode = mode;
                effects.push(VimEffect::Apply(Transaction::select(self.visual_selection(doc))));
            }
            VisualAction::Format(command) => {
                self.mode = Mode::Normal;
                effects.push(VimEffect::Format(command));
            }
            VisualAction::Operate(op) => {
                let span = self.visual_span(doc);
                self.mode = Mode::Normal;
                self.operate(op, span, None, doc, effects);
            }
        }
    }

    fn leave_visual(&mut self, doc: &Document, effects: &mut Vec<VimEffect>) {
        self.mode = Mode::Normal;
        effects.push(select(clamp_to_char(doc, self.visual_head)));
    }

    fn visual_span(&self, doc: &Document) -> Span {
        let lo = self.visual_anchor.min(self.visual_head);
        let hi = self.visual_anchor.max(self.visual_head);
        if self.mode == Mode::VisualLine {
            let first = doc.line_at(lo);
            Span::lines(doc, first.number, doc.line_at(hi).number, first.from)
        } else {
            Span::chars(lo, inclusive_end(doc, hi))
        }
    }

    /// Host selection covering the visual span; the head end carries the cursor.
    fn visual_selection(&self, doc: &Document) -> Selection {
        let (anchor, head) = (self.visual_anchor, self.visual_head);
        if self.mode == Mode::VisualLine {
            let (first, last) = (doc.line_at(anchor.min(head)), doc.line_at(anchor.max(head)));
            return if head >= anchor {
                Selection::single(first.from, last.to)
            } else {
                Selection::single(last.to, first.from)
            };
        }
        if head >= anchor {
            Selection::single(anchor, inclusive_end(doc, head))
        } else {
            Selection::single(inclusive_end(doc, anchor), head)
        }
    }

    fn command(&mut self, key: Key, effects: &mut Vec<VimEffect>) {
        match key.code {
            KeyCode::Escape => self.leave_command(),
            KeyCode::Enter => match parse_command(&self.command_line) {
                Ok(command) => {
                    self.leave_command();
                    effects.push(match command {
                        ExCommand::WriteQuit => VimEffect::SaveAndClose,
                        ExCommand::ForceQuit => VimEffect::DiscardAndClose,
                    });
                }
                Err(err) => {
                    tracing::debug!(%err, "command rejected");
                    self.message = Some(err.to_string());
                }
            },
            KeyCode::Backspace => {
                if self.command_line.pop().is_none() {
                    self.leave_command();
                }
            }
            _ => {
                if let Some(ch) = key.typed_char() {
                    self.command_line.push(ch);
                    self.message = None;
                }
            }
        }
    }

    fn leave_command(&mut self) {
        self.mode = Mode::Normal;
        self.command_line.clear();
        self.message = None;
    }
}

fn select(pos: usize) -> VimEffect {
    VimEffect::Apply(Transaction::select(Selection::cursor(pos)))
}

fn operator_span(
    doc: &Document,
    pos: usize,
    op: Operator,
    target: Target,
    count: Option<usize>,
) -> Option<Span> {
    match target {
        Target::Line => {
            let first = doc.line_at(pos).number;
            let last = (first + count.unwrap_or(1).max(1) - 1).min(doc.line_count().saturating_sub(1));
            Some(Span::lines(doc, first, last, pos))
        }
        Target::Object(object) => {
            let (from, to) = object.range(doc, pos, count.unwrap_or(1))?;
            Some(Span::chars(from, to))
        }
        Target::Motion(Motion::WordForward(word_type))
            if op == Operator::Change && doc.char_at(pos).is_some_and(|c| !c.is_whitespace()) =>
        {
            Some(change_word_span(doc, pos, word_type, count.unwrap_or(1).max(1)))
        }
        Target::Motion(motion) => {
            let target = motion.target(doc, pos, count, None);
            let (lo, hi) = (pos.min(target), pos.max(target));
            match motion.kind() {
                MotionKind::Linewise => Some(Span::lines(
                    doc,
                    doc.line_at(lo).number,
                    doc.line_at(hi).number,
                    lo,
                )),
                MotionKind::Inclusive => Some(Span::chars(lo, inclusive_end(doc, hi))),
                MotionKind::Exclusive => {
                    let mut to = hi;
                    // A word motion that lands on the next line stops at the end of the last
                    // word moved over.
                    if matches!(motion, Motion::WordForward(_)) && target > pos {
                        let line = doc.line_at(target);
                        if line.number > doc.line_at(pos).number
                            && target == first_non_blank(&line)
                            && let Some(prev) = doc.line(line.number - 1)
                        {
                            to = prev.to.max(lo);
                        }
                    }
                    Some(Span::chars(lo, to))
                }
            }
        }
    }
}

/// `cw` on a word changes to the end of the word, not the start of the next one.
fn change_word_span(doc: &Document, pos: usize, word_type: WordType, repeat: usize) -> Span {
    let class = doc.char_at(pos).map(|c| char_class(c, word_type));
    let mut to = pos;
    while doc.char_at(to).map(|c| char_class(c, word_type)) == class && to < doc.len_chars() {
        to += 1;
    }
    for _ in 1..repeat {
        let end = Motion::WordEnd(word_type).target(doc, to.saturating_sub(1), None, None);
        to = inclusive_end(doc, end).max(to);
    }
    Span::chars(pos, to)
}

/// Deletion range and cursor for deleting whole lines.
fn linewise_delete(doc: &Document, span: Span) -> (usize, usize, usize) {
    if span.to < doc.len_chars() {
        let to = span.to + 1;
        let next = doc.line_at(to);
        let indent = first_non_blank(&next) - next.from;
        (span.from, to, span.from + indent)
    } else if span.from > 0 {
        let prev = doc.line_at(span.from - 1);
        (span.from - 1, span.to, first_non_blank(&prev))
    } else {
        (0, span.to, 0)
    }
}

/// Normal-mode cursor after deleting `from..to`: stays on a character of its line.
fn cursor_after_delete(doc: &Document, from: usize, to: usize) -> usize {
    match doc.char_at(to) {
        None | Some('\n') if from > doc.line_at(from).from => grapheme_left(doc, from),
        _ => from,
    }
}

fn take_count(keys: &[Key], i: &mut usize) -> Option<usize> {
    let mut count: Option<usize> = None;
    while let Some(digit) = keys
        .get(*i)
        .and_then(Key::typed_char)
        .and_then(|c| c.to_digit(10))
    {
        if digit == 0 && count.is_none() {
            break;
        }
        count = Some((count.unwrap_or(0) * 10 + digit as usize).min(MAX_COUNT));
        *i += 1;
    }
    count
}

/// A recorded change with its count replaced by `count`. `None` for insert commands, which
/// are replayed `count` times instead.
fn with_count(keys: &[Key], count: usize) -> Option<Vec<Key>> {
    let mut i = 0;
    take_count(keys, &mut i);
    let command = *keys.get(i)?;
    let mut rest = i + 1;
    match command.typed_char() {
        Some('i' | 'a' | 'I' | 'A' | 'o' | 'O') => return None,
        Some('d' | 'c' | 'y') => {
            take_count(keys, &mut rest);
        }
        _ => {}
    }
    let mut replaced: Vec<Key> = count.to_string().chars().map(Key::char).collect();
    replaced.push(command);
    replaced.extend_from_slice(&keys[rest..]);
    Some(replaced)
}

fn multiply(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (None, None) => None,
        _ => Some((a.unwrap_or(1) * b.unwrap_or(1)).min(MAX_COUNT)),
    }
}

fn parse_motion(keys: &[Key], i: &mut usize) -> Parse<Motion> {
    let Some(key) = keys.get(*i) else {
        return Parse::Incomplete;
    };
    *i += 1;
    if key.typed_char() == Some('g') {
        return match keys.get(*i) {
            None => Parse::Incomplete,
            Some(next) if next.typed_char() == Some('g') => {
                *i += 1;
                Parse::Done(Motion::FirstLine)
            }
            Some(_) => Parse::Invalid,
        };
    }
    Motion::from_key(key).map_or(Parse::Invalid, Parse::Done)
}

fn parse_object(keys: &[Key], i: usize) -> Option<Parse<TextObject>> {
    let around = match keys.get(i)?.typed_char()? {
        'i' => false,
        'a' => true,
        _ => return None,
    };
    Some(match keys.get(i + 1) {
        None => Parse::Incomplete,
        Some(key) => TextObject::from_key(around, key).map_or(Parse::Invalid, Parse::Done),
    })
}

fn parse_normal(keys: &[Key]) -> Parse<(Option<usize>, NormalAction)> {
    let mut i = 0;
    let count = take_count(keys, &mut i);
    let Some(&key) = keys.get(i) else {
        return Parse::Incomplete;
    };

    if key.modifiers.primary() {
        if key.code == KeyCode::Char('r') && !key.modifiers.shift && !key.modifiers.alt {
            return Parse::Done((count, NormalAction::Redo));
        }
        return lookup(&default_keymap(), &key)
            .map_or(Parse::Invalid, |command| Parse::Done((count, NormalAction::Format(command))));
    }

    let action = match key.typed_char() {
        Some(op_char @ ('d' | 'c' | 'y')) => {
            let Some(op) = Operator::from_char(op_char) else {
                return Parse::Invalid;
            };
            i += 1;
            let inner = take_count(keys, &mut i);
            let count = multiply(count, inner);
            let Some(next) = keys.get(i) else {
                return Parse::Incomplete;
            };
            if next.typed_char() == Some(op_char) {
                return Parse::Done((count, NormalAction::Operate(op, Target::Line)));
            }
            if let Some(object) = parse_object(keys, i) {
                return match object {
                    Parse::Done(object) => {
                        Parse::Done((count, NormalAction::Operate(op, Target::Object(object))))
                    }
                    Parse::Incomplete => Parse::Incomplete,
                    Parse::Invalid => Parse::Invalid,
                };
            }
            return match parse_motion(keys, &mut i) {
                Parse::Done(motion) => {
                    Parse::Done((count, NormalAction::Operate(op, Target::Motion(motion))))
                }
                Parse::Incomplete => Parse::Incomplete,
                Parse::Invalid => Parse::Invalid,
            };
        }
        Some('x') => NormalAction::Operate(Operator::Delete, Target::Motion(Motion::Right)),
        Some('D') => NormalAction::Operate(Operator::Delete, Target::Motion(Motion::LineEnd)),
        Some('C') => NormalAction::Operate(Operator::Change, Target::Motion(Motion::LineEnd)),
        Some('p') => NormalAction::Paste { before: false },
        Some('P') => NormalAction::Paste { before: true },
        Some('i') => NormalAction::Insert(InsertAt::Cursor),
        Some('a') => NormalAction::Insert(InsertAt::AfterCursor),
        Some('I') => NormalAction::Insert(InsertAt::LineStart),
        Some('A') => NormalAction::Insert(InsertAt::LineEnd),
        Some('o') => NormalAction::Insert(InsertAt::LineBelow),
        Some('O') => NormalAction::Insert(InsertAt::LineAbove),
        Some('v') => NormalAction::Visual(Mode::Visual),
        Some('V') => NormalAction::Visual(Mode::VisualLine),
        Some(':') => NormalAction::CommandLine,
        Some('u') => NormalAction::Undo,
        Some('.') => NormalAction::Repeat,
        _ => {
            return match parse_motion(keys, &mut i) {
                Parse::Done(motion) => Parse::Done((count, NormalAction::Move(motion))),
                Parse::Incomplete => Parse::Incomplete,
                Parse::Invalid => Parse::Invalid,
            };
        }
    };
    Parse::Done((count, action))
}

fn parse_visual(keys: &[Key]) -> Parse<(Option<usize>, VisualAction)> {
    let mut i = 0;
    let count = take_count(keys, &mut i);
    let Some(&key) = keys.get(i) else {
        return Parse::Incomplete;
    };

    if key.modifiers.primary() {
        return lookup(&default_keymap(), &key)
            .map_or(Parse::Invalid, |command| Parse::Done((count, VisualAction::Format(command))));
    }

    let action = match key.typed_char() {
        Some('d' | 'x') => VisualAction::Operate(Operator::Delete),
        Some('c' | 's') => VisualAction::Operate(Operator::Change),
        Some('y') => VisualAction::Operate(Operator::Yank),
        Some('o') => VisualAction::SwapEnds,
        Some('v') => VisualAction::Switch(Mode::Visual),
        Some('V') => VisualAction::Switch(Mode::VisualLine),
        _ => {
            if let Some(object) = parse_object(keys, i) {
                return match object {
                    Parse::Done(object) => Parse::Done((count, VisualAction::Object(object))),
                    Parse::Incomplete => Parse::Incomplete,
                    Parse::Invalid => Parse::Invalid,
                };
            }
            return match parse_motion(keys, &mut i) {
                Parse::Done(motion) => Parse::Done((count, VisualAction::Move(motion))),
                Parse::Incomplete => Parse::Incomplete,
                Parse::Invalid => Parse::Invalid,
            };
        }
    };
    Parse::Done((count, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(notation: &str) -> Parse<(Option<usize>, NormalAction)> {
        parse_normal(&Key::parse_sequence(notation))
    }

    fn feed(state: VimState, editor: &Editor, notation: &str) -> (VimState, Vec<VimEffect>) {
        let mut state = state;
        let mut all = Vec::new();
        for key in Key::parse_sequence(notation) {
            let (next, effects) = state.handle(key, editor);
            state = next;
            all.extend(effects);
        }
        (state, all)
    }

    #[test]
    fn test_parse_counts_and_operators() {
        let delete_words = NormalAction::Operate(
            Operator::Delete,
            Target::Motion(Motion::WordForward(WordType::Word)),
        );
        assert_eq!(parse("d2w"), Parse::Done((Some(2), delete_words)));
        assert_eq!(parse("3d2w"), Parse::Done((Some(6), delete_words)));
        assert_eq!(
            parse("2dd"),
            Parse::Done((Some(2), NormalAction::Operate(Operator::Delete, Target::Line)))
        );
        assert_eq!(parse("10j"), Parse::Done((Some(10), NormalAction::Move(Motion::Down))));
        assert_eq!(parse("0"), Parse::Done((None, NormalAction::Move(Motion::LineStart))));
        assert_eq!(parse("gg"), Parse::Done((None, NormalAction::Move(Motion::FirstLine))));
        assert_eq!(parse("<C-r>"), Parse::Done((None, NormalAction::Redo)));
    }

    #[test]
    fn test_parse_incomplete_and_invalid() {
        assert_eq!(parse("d"), Parse::Incomplete);
        assert_eq!(parse("2"), Parse::Incomplete);
        assert_eq!(parse("ci"), Parse::Incomplete);
        assert_eq!(parse("g"), Parse::Incomplete);
        assert_eq!(parse("gx"), Parse::Invalid);
        assert_eq!(parse("dz"), Parse::Invalid);
        assert_eq!(parse("ciz"), Parse::Invalid);
        assert!(matches!(
            parse("ci("),
            Parse::Done((None, NormalAction::Operate(Operator::Change, Target::Object(_))))
        ));
    }

    #[test]
    fn test_command_mode_grammar() {
        let editor = Editor::new("note");
        let (state, effects) = feed(VimState::new(), &editor, ":bogus<CR>");
        assert!(effects.is_empty());
        assert_eq!(state.mode(), Mode::Command);
        assert_eq!(state.message(), Some("Not a command: bogus"));
        assert_eq!(state.indicator(), ":bogus");

        let (state, effects) = feed(VimState::new(), &editor, ":wq<CR>");
        assert_eq!(state.mode(), Mode::Normal);
        assert!(matches!(effects.as_slice(), [VimEffect::SaveAndClose]));

        let (_, effects) = feed(VimState::new(), &editor, ":q!<CR>");
        assert!(matches!(effects.as_slice(), [VimEffect::DiscardAndClose]));
    }

    #[test]
    fn test_command_backspace_dismisses_when_empty() {
        let editor = Editor::new("");
        let (state, _) = feed(VimState::new(), &editor, ":x<BS>");
        assert_eq!(state.mode(), Mode::Command);
        assert_eq!(state.command_line(), "");
        let (state, effects) = feed(state, &editor, "<BS>");
        assert_eq!(state.mode(), Mode::Normal);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_escape_dismisses_command_without_running_it() {
        let editor = Editor::new("");
        let (state, effects) = feed(VimState::new(), &editor, ":wq<Esc>");
        assert_eq!(state.mode(), Mode::Normal);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_mode_transitions_and_caret() {
        let editor = Editor::new("text");
        let (state, _) = feed(VimState::new(), &editor, "i");
        assert_eq!(state.mode(), Mode::Insert);
        assert_eq!(state.caret(), CaretStyle::Line);
        assert_eq!(state.indicator(), "INSERT");

        let (state, _) = feed(VimState::new(), &editor, "vV");
        assert_eq!(state.mode(), Mode::VisualLine);
        let (state, _) = feed(state, &editor, "V");
        assert_eq!(state.mode(), Mode::Normal);
        assert_eq!(state.caret(), CaretStyle::Block);
    }

    #[test]
    fn test_insert_session_is_grouped_and_recorded() {
        let editor = Editor::new("");
        let (state, effects) = feed(VimState::new(), &editor, "iab<Esc>");
        assert!(matches!(effects.first(), Some(VimEffect::BeginUndoGroup)));
        assert!(effects.iter().any(|e| matches!(e, VimEffect::EndUndoGroup)));
        assert_eq!(state.last_change(), Key::parse_sequence("iab<Esc>").as_slice());
    }

    #[test]
    fn test_repeat_count_replaces_recorded_count() {
        let keys = |notation: &str| Key::parse_sequence(notation);
        assert_eq!(with_count(&keys("d2w"), 3), Some(keys("3dw")));
        assert_eq!(with_count(&keys("2dd"), 5), Some(keys("5dd")));
        assert_eq!(with_count(&keys("4c2iwx<Esc>"), 2), Some(keys("2ciwx<Esc>")));
        assert_eq!(with_count(&keys("x"), 12), Some(keys("12x")));
        assert_eq!(with_count(&keys("ihi<Esc>"), 3), None);
    }

    #[test]
    fn test_yank_is_not_a_change() {
        let editor = Editor::new("one two");
        let (state, _) = feed(VimState::new(), &editor, "yw");
        assert_eq!(
            state.register(),
            &Register {
                text: "one ".to_string(),
                linewise: false
            }
        );
        assert!(state.last_change().is_empty());
    }
}
