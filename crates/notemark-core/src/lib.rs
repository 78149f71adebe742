#![warn(missing_docs)]
//! notemark-core - headless note buffer
//!
//! # Overview
//!
//! `notemark-core` is the bottom layer of the notemark live-preview editor. It owns the text of
//! one open note and everything needed to mutate it safely: change sets, transactions,
//! selections, undo/redo and change notifications. It knows nothing about markdown; the syntax
//! and preview crates derive their state from what this crate exposes.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Editor (dispatch, history, notifications)  │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Transactions, Selections, Decorations      │  ← Edit model
//! ├─────────────────────────────────────────────┤
//! │  Change Sets (map / invert / delta)         │
//! ├─────────────────────────────────────────────┤
//! │  Line Index (Rope-based)                    │  ← Line Access
//! ├─────────────────────────────────────────────┤
//! │  Piece Table Storage                        │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use notemark_core::{ChangeSet, Editor, Selection, Transaction};
//!
//! let mut editor = Editor::new("bold");
//! editor
//!     .dispatch(
//!         Transaction::new(ChangeSet::insert(0, "**"))
//!             .with_selection(Selection::cursor(2)),
//!     )
//!     .unwrap();
//!
//! assert_eq!(editor.text(), "**bold");
//! editor.undo().unwrap();
//! assert_eq!(editor.text(), "bold");
//! ```
//!
//! All offsets are char offsets (Unicode scalar values).

pub mod changes;
pub mod decorations;
pub mod delta;
pub mod document;
pub mod editor;
pub mod error;
pub mod history;
pub mod line_index;
pub mod selection;
pub mod storage;
pub mod text;
pub mod transaction;

pub use changes::{Assoc, Change, ChangeSet};
pub use decorations::{Decoration, DecorationLayerId, DecorationSet};
pub use delta::{TextDelta, TextDeltaEdit};
pub use document::Document;
pub use editor::{Editor, StateChange, StateChangeType, TransactionInfo, Viewport};
pub use error::CoreError;
pub use history::{History, HistoryEntry};
pub use line_index::{Line, LineIndex};
pub use selection::{Selection, SelectionRange, range_touches_selection, ranges_overlap};
pub use storage::PieceTable;
pub use transaction::{Annotations, Transaction};
