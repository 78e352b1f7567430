pub mod persist;

pub use persist::{CatalogStore, JsonCatalogStore, PersistErr};

use crate::storage::ColumnType;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogErr>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogErr {
    #[error("table by id {0} not found")]
    TableNotFound(String),
    #[error("table {0} already exists")]
    TableExists(String),
    #[error("column {column} already exists in table {table}")]
    ColumnExists { table: String, column: String },
    #[error("invalid name \"{0}\", use letters, digits, '_' or '-'")]
    InvalidName(String),
    #[error("entry \"{key}\" holds a definition with id \"{id}\"")]
    KeyMismatch { key: String, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDef {
    #[serde(rename = "Type")]
    pub column_type: ColumnType,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDef {
    pub id: String,
    #[serde(rename = "Desc")]
    pub description: String,
    /// Iteration order of this map is the column order inside a row.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub columns: BTreeMap<String, ColumnDef>,
}

impl TableDef {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            columns: BTreeMap::new(),
        }
    }

    /// Inserts or replaces a column without any checks.
    pub fn insert_column(&mut self, id: &str, column_type: ColumnType) {
        self.columns.insert(
            id.to_string(),
            ColumnDef {
                column_type,
                id: id.to_string(),
            },
        );
    }

    /// Sum of the column widths, the size of every row in the table's file.
    pub fn row_width(&self) -> usize {
        self.columns.values().map(|c| c.column_type.width()).sum()
    }
}

/// Table and column definitions of one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catalog {
    pub id: String,
    #[serde(rename = "Desc")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tables: BTreeMap<String, TableDef>,
}

impl Catalog {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            tables: BTreeMap::new(),
        }
    }

    /// What a fresh database starts with.
    pub fn demo() -> Result<Self> {
        let mut catalog = Self::new("demo", "A demo database");
        catalog.create_table("users", "A user of the software")?;
        catalog.add_column("users", "username", ColumnType::String32)?;
        catalog.add_column("users", "verified", ColumnType::Boolean)?;
        Ok(catalog)
    }

    /// Adds an empty table. Redefining an existing table is refused, it would orphan the
    /// rows already written with the old layout.
    pub fn create_table(&mut self, id: &str, description: &str) -> Result<&TableDef> {
        validate_name(id)?;
        if self.tables.contains_key(id) {
            return Err(CatalogErr::TableExists(id.to_string()));
        }
        self.tables
            .insert(id.to_string(), TableDef::new(id, description));
        self.find_table(id)
    }

    pub fn delete_table(&mut self, id: &str) -> Result<TableDef> {
        self.tables
            .remove(id)
            .ok_or_else(|| CatalogErr::TableNotFound(id.to_string()))
    }

    pub fn find_table(&self, id: &str) -> Result<&TableDef> {
        self.tables
            .get(id)
            .ok_or_else(|| CatalogErr::TableNotFound(id.to_string()))
    }

    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn add_column(&mut self, table: &str, column: &str, column_type: ColumnType) -> Result<()> {
        validate_name(column)?;
        let def = self
            .tables
            .get_mut(table)
            .ok_or_else(|| CatalogErr::TableNotFound(table.to_string()))?;
        if def.columns.contains_key(column) {
            return Err(CatalogErr::ColumnExists {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        def.insert_column(column, column_type);
        Ok(())
    }

    /// Checks a catalog that did not come through [`Catalog::create_table`] and
    /// [`Catalog::add_column`], such as one read from disk.
    pub fn validate(&self) -> Result<()> {
        for (key, table) in &self.tables {
            same_id(key, &table.id)?;
            validate_name(&table.id)?;
            for (key, column) in &table.columns {
                same_id(key, &column.id)?;
                validate_name(&column.id)?;
            }
        }
        Ok(())
    }
}

fn same_id(key: &str, id: &str) -> Result<()> {
    if key == id {
        Ok(())
    } else {
        Err(CatalogErr::KeyMismatch {
            key: key.to_string(),
            id: id.to_string(),
        })
    }
}

/// Names end up in file paths, so only a conservative character set is allowed.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CatalogErr::InvalidName(name.to_string()))
    }
}

/// Older catalog documents store an empty map as `null`.
fn null_as_empty<'de, D, V>(deserializer: D) -> std::result::Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Ok(Option::<BTreeMap<String, V>>::deserialize(deserializer)?.unwrap_or_default())
}
