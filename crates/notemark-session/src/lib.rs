#![warn(missing_docs)]
//! notemark-session - one open note wired to its host.
//!
//! [`EditorSession`] owns the buffer, the syntax cache, every preview layer and the optional
//! modal state. Hosts feed it keys and widget events, draw from [`RenderSnapshot`], and supply
//! storage and window management through [`Collaborators`].
//!
//! ```rust
//! use notemark_preview::Key;
//! use notemark_session::{
//!     CloseReason, Collaborators, EditorSession, KeyOutcome, SaveAck, SessionConfig,
//! };
//!
//! let services = Collaborators::new(|_: &str| Ok(SaveAck::default()), || Ok(()));
//! let mut session = EditorSession::new("", SessionConfig::default(), services);
//! for key in Key::parse_sequence("hi") {
//!     session.handle_key(key).unwrap();
//! }
//! assert_eq!(session.text(), "hi");
//!
//! let outcome = session.handle_key(Key::parse_sequence("<Esc>")[0]).unwrap();
//! assert_eq!(outcome, KeyOutcome::Closed(CloseReason::Saved));
//! ```

pub mod collaborators;
pub mod config;
pub mod error;
pub mod session;

pub use collaborators::{
    CollaboratorError, Collaborators, Closer, ImageImporter, LinkCandidate, LinkResolver,
    SaveAck, Saver,
};
pub use config::SessionConfig;
pub use error::SessionError;
pub use session::{
    ClipboardPayload, CloseReason, EditorSession, KeyOutcome, RenderSnapshot,
    is_effectively_empty,
};
