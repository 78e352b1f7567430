use clap::ValueEnum;
use std::path::PathBuf;

/// How `boolean` columns are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoolEncoding {
    /// Every value is written as 1, matching files produced by earlier versions.
    #[default]
    Legacy,
    /// `true` is written as 1, anything else as 0.
    Strict,
}

impl BoolEncoding {
    pub fn encode(self, value: &str) -> u8 {
        match self {
            BoolEncoding::Legacy => 1,
            BoolEncoding::Strict => u8::from(value == "true"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Directory holding `defs.json` and `tables/`.
    pub root: PathBuf,
    pub bool_encoding: BoolEncoding,
}

impl ShellConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bool_encoding: BoolEncoding::default(),
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join("defs.json")
    }
}
