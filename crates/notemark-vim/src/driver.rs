//! Executes machine effects against an [`Editor`].

use std::mem;

use notemark_core::{CoreError, Editor, Transaction};
use notemark_preview::{Key, delete_backward, delete_forward, insert_text, run_command, type_char};
use notemark_syntax::SyntaxCache;

use crate::machine::{VimEffect, VimState};

/// Effects the driver cannot perform itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostRequest {
    /// Save, then close if the save succeeded.
    SaveAndClose,
    /// Close without saving.
    DiscardAndClose,
}

/// A [`VimState`] bound to the buffer effects it produces.
#[derive(Debug, Clone, Default)]
pub struct Vim {
    state: VimState,
    auto_pair: bool,
    /// Spaces typed for Tab; a literal tab when zero.
    tab_width: usize,
}

impl Vim {
    /// Driver in Normal mode. `auto_pair` routes typed characters through the interceptor.
    pub fn new(auto_pair: bool) -> Self {
        Self {
            state: VimState::new(),
            auto_pair,
            tab_width: 0,
        }
    }

    /// Type `width` spaces for Tab instead of a tab character.
    pub fn with_tab_width(mut self, width: usize) -> Self {
        self.tab_width = width;
        self
    }

    /// Current machine state.
    pub fn state(&self) -> &VimState {
        &self.state
    }

    /// Toggle delimiter auto-pairing in Insert mode.
    pub fn set_auto_pair(&mut self, auto_pair: bool) {
        self.auto_pair = auto_pair;
    }

    /// Feed one key and execute its effects. `.` replays run to completion before returning.
    pub fn feed(
        &mut self,
        key: Key,
        editor: &mut Editor,
        cache: &mut SyntaxCache,
    ) -> Result<Vec<HostRequest>, CoreError> {
        let mut requests = Vec::new();
        self.step(key, editor, cache, &mut requests, false)?;
        Ok(requests)
    }

    fn step(
        &mut self,
        key: Key,
        editor: &mut Editor,
        cache: &mut SyntaxCache,
        requests: &mut Vec<HostRequest>,
        replaying: bool,
    ) -> Result<(), CoreError> {
        let (state, effects) = mem::take(&mut self.state).handle(key, editor);
        self.state = state;
        for effect in effects {
            match effect {
                VimEffect::Apply(tr) => dispatch(editor, Some(tr))?,
                VimEffect::InsertChar('\t') if self.tab_width > 0 => {
                    let tr = insert_text(editor, &" ".repeat(self.tab_width));
                    dispatch(editor, tr)?;
                }
                VimEffect::InsertChar(ch) => {
                    let tr = type_char(editor, ch, self.auto_pair);
                    dispatch(editor, tr)?;
                }
                VimEffect::InsertNewline => {
                    let tr = insert_text(editor, "\n");
                    dispatch(editor, tr)?;
                }
                VimEffect::DeleteBackward => {
                    let tr = delete_backward(editor, self.auto_pair);
                    dispatch(editor, tr)?;
                }
                VimEffect::DeleteForward => {
                    let tr = delete_forward(editor);
                    dispatch(editor, tr)?;
                }
                VimEffect::Format(command) => {
                    let tree = cache.tree(editor);
                    run_command(editor, &tree, command)?;
                }
                VimEffect::Undo => match editor.undo() {
                    Ok(_) | Err(CoreError::NothingToUndo) => {}
                    Err(err) => return Err(err),
                },
                VimEffect::Redo => match editor.redo() {
                    Ok(_) | Err(CoreError::NothingToRedo) => {}
                    Err(err) => return Err(err),
                },
                VimEffect::BeginUndoGroup => editor.begin_undo_group(),
                VimEffect::EndUndoGroup => editor.end_undo_group(),
                VimEffect::Replay(keys) => {
                    if replaying {
                        continue;
                    }
                    tracing::debug!(keys = keys.len(), "repeat last change");
                    for key in keys {
                        self.step(key, editor, cache, requests, true)?;
                    }
                }
                VimEffect::SaveAndClose => requests.push(HostRequest::SaveAndClose),
                VimEffect::DiscardAndClose => requests.push(HostRequest::DiscardAndClose),
            }
        }
        Ok(())
    }
}

fn dispatch(editor: &mut Editor, tr: Option<Transaction>) -> Result<(), CoreError> {
    if let Some(tr) = tr {
        editor.dispatch(tr)?;
    }
    Ok(())
}
