#![warn(missing_docs)]
//! notemark-preview - live-preview layers on top of the markdown syntax tree.
//!
//! # Overview
//!
//! Everything here is derived state: given an [`Editor`](notemark_core::Editor) and the
//! [`SyntaxTree`](notemark_syntax::SyntaxTree) of its current revision, the layers produce
//! decorations and transactions but never mutate the buffer themselves.
//!
//! - [`live_preview`]: hides formatting markers away from the selection and emits style classes.
//! - [`widgets`]: tables, images and rules rendered as widgets; tables write back through
//!   `internal_update` transactions.
//! - [`auto_pair`]: `**`, `~~` and `==` pairing at a single cursor.
//! - [`formatting`]: inline toggles, line prefixes and links, plus the shortcut
//!   [`keymap`].
//! - [`bidi`]: per-line or whole-buffer text direction.
//! - [`input`]: plain typing and deletion at every cursor.
//!
//! # Example
//!
//! ```rust
//! use notemark_core::{DecorationLayerId, Editor, Selection};
//! use notemark_preview::DecorationEngine;
//! use notemark_syntax::SyntaxCache;
//!
//! let mut editor = Editor::new("say **hi**");
//! let mut cache = SyntaxCache::default();
//! let mut engine = DecorationEngine::new();
//!
//! let tree = cache.tree(&editor);
//! let set = engine.decorations(editor.revision(), &tree, editor.selection(), editor.viewport());
//! assert_eq!(set.layer(DecorationLayerId::MARKERS).count(), 2);
//!
//! editor.set_selection(Selection::cursor(6)).unwrap();
//! let set = engine.decorations(editor.revision(), &tree, editor.selection(), editor.viewport());
//! assert_eq!(set.layer(DecorationLayerId::MARKERS).count(), 0);
//! ```

pub mod auto_pair;
pub mod bidi;
pub mod formatting;
pub mod input;
pub mod keymap;
pub mod live_preview;
pub mod widgets;

pub use auto_pair::{PAIRED_DELIMITERS, handle_backspace, handle_input};
pub use bidi::{BidiMode, BidiPlugin, Direction, compute_directions, line_direction};
pub use formatting::{
    FormatCommand, InlineStyle, LinePrefix, command_transaction, insert_link, run_command,
    toggle_inline, toggle_line_prefix,
};
pub use input::{delete_backward, delete_forward, insert_text, type_char};
pub use keymap::{Chord, Key, KeyCode, Modifiers, default_keymap, lookup};
pub use live_preview::{DecorationEngine, PreviewDecoration, StyleClass, compute_decorations};
pub use widgets::{
    Alignment, BlockWidgets, CellRef, ImageWidget, TableError, TableFocus, TableKey,
    TableKeyOutcome, TableMenuAction, TableModel, TableNav, Widget, WidgetKind, WidgetUpdate,
    ensure_trailing_newline,
};
