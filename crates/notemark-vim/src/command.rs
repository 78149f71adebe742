//! Ex command line grammar.

use thiserror::Error;

/// A parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExCommand {
    /// `:wq` / `:x`: save, then close.
    WriteQuit,
    /// `:q!`: discard the buffer and close without saving.
    ForceQuit,
}

/// Command line text that is not a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unrecognized command.
    #[error("Not a command: {0}")]
    NotACommand(String),
}

/// Parse a command line (without the leading `:`).
pub fn parse_command(line: &str) -> Result<ExCommand, CommandError> {
    match line.trim() {
        "wq" | "x" => Ok(ExCommand::WriteQuit),
        "q!" => Ok(ExCommand::ForceQuit),
        _ => Err(CommandError::NotACommand(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar() {
        assert_eq!(parse_command("wq"), Ok(ExCommand::WriteQuit));
        assert_eq!(parse_command(" x "), Ok(ExCommand::WriteQuit));
        assert_eq!(parse_command("q!"), Ok(ExCommand::ForceQuit));
        let err = parse_command("bogus").unwrap_err();
        assert_eq!(err.to_string(), "Not a command: bogus");
        assert!(parse_command("w").is_err());
        assert!(parse_command("").is_err());
    }
}
