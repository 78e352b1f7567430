pub mod error;
pub mod grammar;
pub mod matcher;

pub use grammar::{CommandPath, GrammarNode, shell_grammar};
pub use matcher::{ArgumentSet, Match, match_tokens, tokenize};
