//! Modes, the mode indicator and caret style.

/// Modal editing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Motions and operators.
    #[default]
    Normal,
    /// Text insertion.
    Insert,
    /// Charwise selection.
    Visual,
    /// Linewise selection.
    VisualLine,
    /// Ex command line.
    Command,
}

impl Mode {
    /// Caret shape for this mode.
    pub fn caret(&self) -> CaretStyle {
        match self {
            Mode::Insert => CaretStyle::Line,
            _ => CaretStyle::Block,
        }
    }

    /// Returns `true` for both visual modes.
    pub fn is_visual(&self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine)
    }
}

/// Caret rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaretStyle {
    /// Covers one character.
    Block,
    /// Thin bar between characters.
    Line,
}

/// Status-line label for `mode`; Command mode shows the command line.
pub fn indicator(mode: Mode, command_line: &str) -> String {
    match mode {
        Mode::Normal => "NORMAL".to_string(),
        Mode::Insert => "INSERT".to_string(),
        Mode::Visual => "VISUAL".to_string(),
        Mode::VisualLine => "V-LINE".to_string(),
        Mode::Command => format!(":{command_line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_and_caret() {
        assert_eq!(indicator(Mode::Normal, ""), "NORMAL");
        assert_eq!(indicator(Mode::VisualLine, ""), "V-LINE");
        assert_eq!(indicator(Mode::Command, "wq"), ":wq");
        assert_eq!(Mode::Insert.caret(), CaretStyle::Line);
        assert_eq!(Mode::Command.caret(), CaretStyle::Block);
    }
}
