#![warn(missing_docs)]
//! notemark-vim - modal (vim-style) editing for the note buffer.
//!
//! The machine is a pure step, [`VimState::handle`], from `(state, key, buffer)` to
//! `(state, effects)`. [`Vim`] wraps it with an executor that applies the buffer effects and
//! hands save/close requests back to the host.
//!
//! ```rust
//! use notemark_core::Editor;
//! use notemark_preview::Key;
//! use notemark_syntax::SyntaxCache;
//! use notemark_vim::{Mode, Vim};
//!
//! let mut editor = Editor::new("");
//! let mut cache = SyntaxCache::default();
//! let mut vim = Vim::new(true);
//! for key in Key::parse_sequence("iabc<Esc>") {
//!     vim.feed(key, &mut editor, &mut cache).unwrap();
//! }
//! assert_eq!(editor.text(), "abc");
//! assert_eq!(vim.state().mode(), Mode::Normal);
//! ```

pub mod command;
pub mod driver;
pub mod machine;
pub mod mode;
pub mod motion;
pub mod text_object;

pub use command::{CommandError, ExCommand, parse_command};
pub use driver::{HostRequest, Vim};
pub use machine::{Operator, Register, VimEffect, VimState};
pub use mode::{CaretStyle, Mode, indicator};
pub use motion::{Motion, MotionKind, WordType, clamp_to_char};
pub use text_object::TextObject;
