//! Text direction line attributes.

use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use notemark_core::{Decoration, DecorationLayerId, DecorationSet, Document, Editor, Viewport};
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_bidi::{BidiClass, bidi_class};

/// Markdown line prefixes skipped before looking for a strong character.
static MARKDOWN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:#{1,6}|>|[-*+]|\d+[.)])\s+)*(?:\[[ xX]\]\s+)?")
        .expect("valid markdown prefix regex")
});

/// Direction mode of the bidi plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidiMode {
    /// Left to right; no attributes.
    #[default]
    Ltr,
    /// Whole buffer right to left.
    Rtl,
    /// Per-line direction from the first strong character.
    Auto,
}

impl FromStr for BidiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ltr" => Ok(Self::Ltr),
            "rtl" => Ok(Self::Rtl),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown bidi mode: {other}")),
        }
    }
}

/// Resolved direction of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left to right.
    Ltr,
    /// Right to left.
    Rtl,
}

impl Direction {
    /// `dir` attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

/// Direction of the first strong character after any markdown line prefix.
pub fn line_direction(line: &str) -> Option<Direction> {
    let skip = MARKDOWN_PREFIX.find(line).map_or(0, |m| m.end());
    line[skip..].chars().find_map(|ch| match bidi_class(ch) {
        BidiClass::L => Some(Direction::Ltr),
        BidiClass::R | BidiClass::AL => Some(Direction::Rtl),
        _ => None,
    })
}

/// Line attributes for `mode` over the lines intersecting `viewport`.
pub fn compute_directions(
    mode: BidiMode,
    doc: &Document,
    viewport: Viewport,
) -> DecorationSet<Direction> {
    match mode {
        BidiMode::Ltr => DecorationSet::new(),
        BidiMode::Rtl => DecorationSet::from_vec(vec![Decoration::new(
            DecorationLayerId::LINES,
            0,
            doc.len_chars(),
            Direction::Rtl,
        )]),
        BidiMode::Auto => {
            let first = doc.line_at(viewport.from).number;
            let last = doc.line_at(viewport.to).number;
            (first..=last)
                .filter_map(|n| doc.line(n))
                .filter_map(|line| {
                    line_direction(&line.text).map(|dir| {
                        Decoration::new(DecorationLayerId::LINES, line.from, line.to, dir)
                    })
                })
                .collect()
        }
    }
}

/// Memoizing direction plugin, recomputed on document or viewport change.
#[derive(Debug, Default)]
pub struct BidiPlugin {
    mode: BidiMode,
    key: Option<(u64, Viewport)>,
    cached: Arc<DecorationSet<Direction>>,
}

impl BidiPlugin {
    /// Plugin in `mode`.
    pub fn new(mode: BidiMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Current mode.
    pub fn mode(&self) -> BidiMode {
        self.mode
    }

    /// Switch modes.
    pub fn set_mode(&mut self, mode: BidiMode) {
        if self.mode != mode {
            self.mode = mode;
            self.key = None;
        }
    }

    /// Line attributes for the editor's current revision and viewport.
    pub fn directions(&mut self, editor: &Editor) -> Arc<DecorationSet<Direction>> {
        let key = (editor.revision(), editor.viewport());
        if self.key != Some(key) {
            self.cached = Arc::new(compute_directions(self.mode, editor.doc(), key.1));
            self.key = Some(key);
            tracing::trace!(mode = ?self.mode, lines = self.cached.len(), "bidi recomputed");
        }
        Arc::clone(&self.cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_direction_skips_prefixes() {
        assert_eq!(line_direction("hello"), Some(Direction::Ltr));
        assert_eq!(line_direction("שלום world"), Some(Direction::Rtl));
        assert_eq!(line_direction("## مرحبا"), Some(Direction::Rtl));
        assert_eq!(line_direction("> - [ ] שלום"), Some(Direction::Rtl));
        assert_eq!(line_direction("1. abc"), Some(Direction::Ltr));
        assert_eq!(line_direction("123 !?"), None);
        assert_eq!(line_direction(""), None);
    }

    #[test]
    fn test_auto_is_per_line() {
        let doc = Document::new("hello\nשלום\n42\n");
        let set = compute_directions(BidiMode::Auto, &doc, Viewport::new(0, doc.len_chars()));
        let lines: Vec<_> = set.iter().map(|d| (d.from, d.to, d.value)).collect();
        assert_eq!(
            lines,
            vec![(0, 5, Direction::Ltr), (6, 10, Direction::Rtl)]
        );
    }

    #[test]
    fn test_rtl_covers_buffer_and_ltr_is_empty() {
        let doc = Document::new("abc\ndef");
        let rtl = compute_directions(BidiMode::Rtl, &doc, Viewport::new(0, 0));
        assert_eq!(rtl.iter().map(|d| (d.from, d.to)).collect::<Vec<_>>(), vec![(0, 7)]);
        assert!(compute_directions(BidiMode::Ltr, &doc, Viewport::new(0, 7)).is_empty());
    }

    #[test]
    fn test_auto_restricted_to_viewport() {
        let doc = Document::new("a\nb\nc");
        let set = compute_directions(BidiMode::Auto, &doc, Viewport::new(2, 3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("auto".parse::<BidiMode>(), Ok(BidiMode::Auto));
        assert!("sideways".parse::<BidiMode>().is_err());
    }
}
