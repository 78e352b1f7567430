use std::fmt::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchErr>;

/// The alternatives accepted at one grammar level, already rendered as labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected(pub Vec<String>);

impl Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchErr {
    /// No sibling at a level accepted the token.
    #[error("Expected one of [ {expected} ] but got \"{found}\"")]
    GrammarMismatch { expected: Expected, found: String },
    /// The line ended right after a keyword that still has children.
    #[error("{command} command requires more arguments than are provided, {}", incomplete_hint(.expected, .args_first))]
    IncompleteCommand {
        command: String,
        expected: Expected,
        args_first: bool,
    },
    /// The line ended while capture slots of a level were still unfilled.
    #[error("{command} command requires more arguments than are provided, expected args {expected}")]
    MissingArguments { command: String, expected: Expected },
    /// Tokens left over after a keyword that takes nothing further.
    #[error("{command} takes no further arguments but got \"{found}\"")]
    TrailingInput { command: String, found: String },
}

fn incomplete_hint(expected: &Expected, args_first: &bool) -> String {
    if *args_first {
        format!("expected args {expected}")
    } else {
        format!("expected one of [ {expected} ]")
    }
}
