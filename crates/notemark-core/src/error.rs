//! Errors returned by buffer operations.

use thiserror::Error;

/// Failure applying a transaction or walking the history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Offset lies past the end of the buffer.
    #[error("offset {offset} out of bounds (buffer length {len})")]
    InvalidOffset {
        /// Offending offset.
        offset: usize,
        /// Buffer length in chars.
        len: usize,
    },
    /// Range is reversed or extends past the end of the buffer.
    #[error("invalid range {from}..{to} (buffer length {len})")]
    InvalidRange {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
        /// Buffer length in chars.
        len: usize,
    },
    /// Two changes in one change set overlap.
    #[error("overlapping changes at offset {at}")]
    OverlappingChanges {
        /// Start of the second, overlapping change.
        at: usize,
    },
    /// Selection range ends past the end of the buffer.
    #[error("selection position {pos} out of bounds (buffer length {len})")]
    SelectionOutOfBounds {
        /// Offending position.
        pos: usize,
        /// Buffer length in chars.
        len: usize,
    },
    /// Undo requested with an empty undo stack.
    #[error("nothing to undo")]
    NothingToUndo,
    /// Redo requested with an empty redo stack.
    #[error("nothing to redo")]
    NothingToRedo,
}
