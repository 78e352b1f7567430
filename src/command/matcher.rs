use super::error::{Expected, MatchErr, Result};
use super::grammar::{CommandPath, GrammarNode};
use std::collections::HashMap;

/// Captured values keyed by capture-node name.
pub type ArgumentSet = HashMap<String, String>;

/// A successfully matched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub args: ArgumentSet,
    /// The deepest runnable node on the accepted path. `None` is a valid no-op command.
    pub handler: Option<CommandPath>,
    /// Words left over after the last level's capture slots were filled.
    pub ignored: Vec<String>,
}

/// Whitespace splitting, no quoting.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// State carried down the tree. Each level takes it by value and hands back the refined one.
struct State<'g> {
    path: Vec<&'g str>,
    args: ArgumentSet,
    handler: Option<CommandPath>,
    ignored: Vec<String>,
}

/// Matches `tokens` against the children of `root`.
///
/// Within a level children are tried in order. A capture child takes the current token and
/// the scan goes on with the next one. A keyword child that equals the token commits the
/// path: the rest of the line is matched against its children and no other sibling is tried
/// afterwards, even if that fails. A keyword that does not match leaves the token for the
/// next sibling. Words after a level whose last child is a filled capture are not an error,
/// they are handed back in [`Match::ignored`].
pub fn match_tokens(tokens: &[&str], root: &GrammarNode) -> Result<Match> {
    let state = State {
        path: Vec::new(),
        args: ArgumentSet::new(),
        handler: None,
        ignored: Vec::new(),
    };
    let state = match_level(tokens, root, state)?;
    Ok(Match {
        args: state.args,
        handler: state.handler,
        ignored: state.ignored,
    })
}

fn match_level<'g>(
    tokens: &[&str],
    node: &'g GrammarNode,
    mut state: State<'g>,
) -> Result<State<'g>> {
    if node.children.is_empty() {
        // only reached with tokens left, a leaf keyword with nothing more is handled by the caller
        return Err(MatchErr::TrailingInput {
            command: node.name.to_string(),
            found: tokens.first().copied().unwrap_or_default().to_string(),
        });
    }

    let mut cursor = 0;
    let mut matched = false;
    let mut last = tokens.first().copied().unwrap_or_default();

    for child in &node.children {
        let Some(&token) = tokens.get(cursor) else {
            return Err(MatchErr::MissingArguments {
                command: node.name.to_string(),
                expected: expected(node),
            });
        };
        last = token;

        if child.is_capture() {
            state.args.insert(child.name.to_string(), token.to_string());
            cursor += 1;
            matched = true;
        } else if *child.literal == *token {
            state.path.push(&child.literal);
            if child.runnable {
                state.handler = Some(CommandPath::from(&state.path[..]));
            }

            let rest = &tokens[cursor + 1..];
            if rest.is_empty() {
                if child.children.is_empty() {
                    return Ok(state);
                }
                return Err(MatchErr::IncompleteCommand {
                    command: child.literal.to_string(),
                    expected: expected(child),
                    args_first: child.children[0].is_capture(),
                });
            }
            return match_level(rest, child, state);
        } else {
            matched = false;
        }
    }

    if matched {
        state.ignored = tokens[cursor..].iter().map(|t| t.to_string()).collect();
        Ok(state)
    } else {
        Err(MatchErr::GrammarMismatch {
            expected: expected(node),
            found: last.to_string(),
        })
    }
}

fn expected(node: &GrammarNode) -> Expected {
    Expected(node.children.iter().map(GrammarNode::label).collect())
}
