pub mod encoder;
pub mod table_file;

pub use encoder::{EncodeErr, encode_row};
pub use table_file::TableFiles;

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use xxhash_rust::xxh3::xxh3_64;

/// Bytes of an `fkey` column holding the referenced [`TableId`].
pub const FKEY_ID_WIDTH: usize = 8;
/// Bytes of an `fkey` column holding the referenced table name.
pub const FKEY_NAME_WIDTH: usize = 32;

#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String32,
    String128,
    String256,
    String1024,
    String2048,
    Int,
    Float64,
    Byte,
    Boolean,
    Fkey,
}

impl ColumnType {
    /// Fixed number of bytes a value of this type takes in a row.
    pub const fn width(self) -> usize {
        match self {
            ColumnType::String32 => 32,
            ColumnType::String128 => 128,
            ColumnType::String256 => 256,
            ColumnType::String1024 => 1024,
            ColumnType::String2048 => 2048,
            ColumnType::Int | ColumnType::Float64 => 8,
            ColumnType::Byte | ColumnType::Boolean => 1,
            ColumnType::Fkey => FKEY_ID_WIDTH + FKEY_NAME_WIDTH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String32 => "string32",
            ColumnType::String128 => "string128",
            ColumnType::String256 => "string256",
            ColumnType::String1024 => "string1024",
            ColumnType::String2048 => "string2048",
            ColumnType::Int => "int",
            ColumnType::Float64 => "float64",
            ColumnType::Byte => "byte",
            ColumnType::Boolean => "boolean",
            ColumnType::Fkey => "fkey",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable numeric id of a table, derived from its name.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct TableId(pub u64);

impl TableId {
    pub fn of(name: &str) -> Self {
        Self(xxh3_64(name.as_bytes()))
    }
}

impl Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}
