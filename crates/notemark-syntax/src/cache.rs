//! Per-revision syntax tree cache.

use std::sync::Arc;

use notemark_core::Editor;

use crate::extension::SyntaxExtensions;
use crate::parser::parse_with;
use crate::tree::SyntaxTree;

/// How the cache produced the tree for the last [`SyntaxCache::tree`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// First parse for this cache.
    Initial,
    /// The revision changed and the buffer was parsed again.
    FullReparse,
    /// The cached tree already matched the revision.
    Skipped,
}

/// Keeps the tree for the editor's current revision.
pub struct SyntaxCache {
    extensions: SyntaxExtensions,
    tree: Option<Arc<SyntaxTree>>,
    last_revision: Option<u64>,
    last_update_mode: UpdateMode,
}

impl SyntaxCache {
    /// Cache parsing with `extensions`.
    pub fn new(extensions: SyntaxExtensions) -> Self {
        Self {
            extensions,
            tree: None,
            last_revision: None,
            last_update_mode: UpdateMode::Initial,
        }
    }

    /// Tree for the editor's current revision, parsing only when the revision moved.
    pub fn tree(&mut self, editor: &Editor) -> Arc<SyntaxTree> {
        let revision = editor.revision();
        if let (Some(tree), Some(last)) = (&self.tree, self.last_revision)
            && last == revision
        {
            self.last_update_mode = UpdateMode::Skipped;
            return Arc::clone(tree);
        }

        self.last_update_mode = if self.tree.is_none() {
            UpdateMode::Initial
        } else {
            UpdateMode::FullReparse
        };

        let tree = Arc::new(parse_with(&editor.text(), &self.extensions));
        debug_assert_eq!(tree.len(), editor.len_chars());
        tracing::debug!(revision, mode = ?self.last_update_mode, "syntax tree rebuilt");

        self.tree = Some(Arc::clone(&tree));
        self.last_revision = Some(revision);
        tree
    }

    /// Update mode of the last call (for tests and instrumentation).
    pub fn last_update_mode(&self) -> UpdateMode {
        self.last_update_mode
    }

    /// Revision the cached tree belongs to.
    pub fn revision(&self) -> Option<u64> {
        self.last_revision
    }
}

impl Default for SyntaxCache {
    fn default() -> Self {
        Self::new(SyntaxExtensions::default())
    }
}
