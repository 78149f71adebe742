#![warn(missing_docs)]
//! notemark-syntax - markdown syntax tree
//!
//! Parses a note into a typed, char-offset [`SyntaxTree`] using `pulldown-cmark` (CommonMark with
//! GFM tables, strikethrough and task lists), then resolves registered inline delimiter
//! extensions such as `==highlight==` on top of it.
//!
//! ```rust
//! use notemark_syntax::{NodeKind, parse};
//!
//! let tree = parse("**bold** and ==marked==");
//! let highlights = tree.find_all(|k| k == NodeKind::Highlight);
//! assert_eq!(highlights.len(), 1);
//! assert_eq!((highlights[0].from, highlights[0].to), (13, 23));
//! ```
//!
//! - [`parser`] - event stream to tree, marker tokens
//! - [`extension`] - delimiter registrar and flanking rule
//! - [`cache`] - per-revision memoization against an [`notemark_core::Editor`]
//! - [`html`] - HTML export

pub mod cache;
pub mod extension;
pub mod html;
pub mod offsets;
pub mod parser;
pub mod tree;

pub use cache::{SyntaxCache, UpdateMode};
pub use extension::{Flanking, HIGHLIGHT, InlineDelimiter, SyntaxExtensions, flanking};
pub use html::markdown_to_html;
pub use parser::{markdown_options, parse, parse_with};
pub use tree::{NodeKind, SyntaxNode, SyntaxTree};
