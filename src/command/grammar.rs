use std::fmt::Display;

/// One node of the command grammar.
///
/// A node with a non-empty `literal` is a keyword that must match the token exactly.
/// A node with an empty `literal` is a capture slot: it takes whatever token comes next
/// and records it under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarNode {
    pub name: Box<str>,
    pub literal: Box<str>,
    pub children: Vec<GrammarNode>,
    /// Whether a handler is registered for the path ending at this node.
    pub runnable: bool,
}

impl GrammarNode {
    pub fn root(children: Vec<GrammarNode>) -> Self {
        Self {
            name: "root".into(),
            literal: "".into(),
            children,
            runnable: false,
        }
    }

    pub fn keyword(word: &str) -> Self {
        Self {
            name: word.into(),
            literal: word.into(),
            children: Vec::new(),
            runnable: false,
        }
    }

    pub fn capture(name: &str) -> Self {
        Self {
            name: name.into(),
            literal: "".into(),
            children: Vec::new(),
            runnable: false,
        }
    }

    pub fn runs(mut self) -> Self {
        self.runnable = true;
        self
    }

    pub fn with(mut self, children: Vec<GrammarNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_capture(&self) -> bool {
        self.literal.is_empty()
    }

    /// How the node is shown in diagnostics: keywords verbatim, captures as `[name]`.
    pub fn label(&self) -> String {
        if self.is_capture() {
            format!("[{}]", self.name)
        } else {
            self.literal.to_string()
        }
    }

    /// Every runnable path in the tree, depth first.
    pub fn runnable_paths(&self) -> Vec<CommandPath> {
        fn walk(node: &GrammarNode, prefix: &mut Vec<Box<str>>, out: &mut Vec<CommandPath>) {
            for child in &node.children {
                let keyword = !child.is_capture();
                if keyword {
                    prefix.push(child.literal.clone());
                }
                if child.runnable {
                    out.push(CommandPath(prefix.clone()));
                }
                walk(child, prefix, out);
                if keyword {
                    prefix.pop();
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut Vec::new(), &mut out);
        out
    }
}

/// The keywords leading from the root to a runnable node, e.g. `table insert`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandPath(pub Vec<Box<str>>);

impl From<&[&str]> for CommandPath {
    fn from(words: &[&str]) -> Self {
        Self(words.iter().map(|w| Box::from(*w)).collect())
    }
}

impl Display for CommandPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

pub const TABLE_NAME: &str = "table.name";
pub const TABLE_DESC: &str = "table.desc";
pub const TABLE_DATA: &str = "table.data";

/// The grammar of the interactive shell.
///
/// ```text
/// table create <table.name> <table.desc>
/// table delete <table.name>
/// table insert into <table.name> <table.data>
/// table list
/// table inspect <table.name>
/// clear
/// exit
/// ```
pub fn shell_grammar() -> GrammarNode {
    use GrammarNode as N;
    N::root(vec![
        N::keyword("table").with(vec![
            N::keyword("create")
                .runs()
                .with(vec![N::capture(TABLE_NAME), N::capture(TABLE_DESC)]),
            N::keyword("delete")
                .runs()
                .with(vec![N::capture(TABLE_NAME)]),
            // the handler sits on `insert`, `into` is only a keyword
            N::keyword("insert").runs().with(vec![
                N::keyword("into").with(vec![N::capture(TABLE_NAME), N::capture(TABLE_DATA)]),
            ]),
            N::keyword("list").runs(),
            N::keyword("inspect")
                .runs()
                .with(vec![N::capture(TABLE_NAME)]),
        ]),
        N::keyword("clear").runs(),
        N::keyword("exit").runs(),
    ])
}
