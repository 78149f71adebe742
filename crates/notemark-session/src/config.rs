//! Session configuration loaded from JSON.

use std::{fs, path::Path};

use notemark_core::editor::DEFAULT_HISTORY_DEPTH;
use notemark_preview::BidiMode;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Options for one [`EditorSession`](crate::EditorSession). Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Start in modal editing.
    pub vim_mode: bool,
    /// Text direction mode.
    pub bidi: BidiMode,
    /// Pair `**`, `~~` and `==` while typing.
    pub auto_pair: bool,
    /// Hide markers away from the cursor. When off, raw markdown stays visible.
    pub live_preview: bool,
    /// Maximum link completion candidates requested from the resolver.
    pub link_candidate_limit: usize,
    /// Undo steps kept.
    pub history_depth: usize,
    /// Spaces typed for Tab; a literal tab when zero.
    pub tab_width: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vim_mode: false,
            bidi: BidiMode::Ltr,
            auto_pair: true,
            live_preview: true,
            link_candidate_limit: 8,
            history_depth: DEFAULT_HISTORY_DEPTH,
            tab_width: 4,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = SessionConfig::from_json(r#"{"vim_mode": true, "bidi": "auto"}"#).unwrap();
        assert_eq!(
            config,
            SessionConfig {
                vim_mode: true,
                bidi: BidiMode::Auto,
                ..SessionConfig::default()
            }
        );
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(
            SessionConfig::from_json("{}").unwrap(),
            SessionConfig::default()
        );
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = SessionConfig::from_json(r#"{"bidi": "sideways"}"#).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }
}
