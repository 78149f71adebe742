//! Session error type.

use notemark_core::CoreError;
use notemark_preview::TableError;
use thiserror::Error;

use crate::collaborators::CollaboratorError;

/// Errors surfaced by [`EditorSession`](crate::EditorSession) entry points.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Buffer operation rejected.
    #[error("buffer error: {0}")]
    Core(#[from] CoreError),

    /// Table widget operation rejected.
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// A host collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration could not be read.
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    /// The session was already closed.
    #[error("session is closed")]
    Closed,
}
