/*
Shell commands

A database is a catalog of tables, each table a set of typed columns.
Every inserted row is written to the end of the table's file with a fixed width,
so row N of a table always starts at N * (row width).

--- create a table ---
    `table create friends people_I_know`
    >>> - Created table friends

--- insert rows ---
Data is a comma separated list of key=value pairs, no spaces.
    `table insert into users username=alpha,verified=true`
    >>> Inserted username=alpha,verified=true into table users at offset 0 (33 bytes)
    `table insert into users username=beta,verified=false`
    >>> Inserted username=beta,verified=false into table users at offset 33 (33 bytes)

--- look around ---
    `table list`
    >>> 2 tables in demo
        | table   | description            | columns |
        | friends | people_I_know          | 0       |
        | users   | A user of the software | 2       |
    `table inspect users`
    >>> Table users (id ...) has 2 columns, 33 bytes per row, 2 rows stored
        | column   | type     | width |
        | username | string32 | 32    |
        | verified | boolean  | 1     |

--- drop a table ---
    `table delete friends`
    >>> - Deleted table friends
*/

use crate::catalog::{Catalog, CatalogErr, CatalogStore, PersistErr};
use crate::command::grammar::{TABLE_DATA, TABLE_DESC, TABLE_NAME};
use crate::command::{
    ArgumentSet, CommandPath, GrammarNode, Match, match_tokens, shell_grammar, tokenize,
};
use crate::config::{BoolEncoding, ShellConfig};
use crate::storage::{EncodeErr, TableFiles, TableId, encode_row};
use std::collections::HashMap;
use thiserror::Error;
use tokio::io;
use tracing::{debug, error, info, warn};

/// What the shell can do. Bound to grammar paths in [`Executor`]'s dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    CreateTable,
    DeleteTable,
    InsertRow,
    ListTables,
    InspectTable,
    Clear,
    Exit,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::CreateTable,
        Command::DeleteTable,
        Command::InsertRow,
        Command::ListTables,
        Command::InspectTable,
        Command::Clear,
        Command::Exit,
    ];

    pub fn path(self) -> CommandPath {
        let words: &[&str] = match self {
            Command::CreateTable => &["table", "create"],
            Command::DeleteTable => &["table", "delete"],
            Command::InsertRow => &["table", "insert"],
            Command::ListTables => &["table", "list"],
            Command::InspectTable => &["table", "inspect"],
            Command::Clear => &["clear"],
            Command::Exit => &["exit"],
        };
        CommandPath::from(words)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Messages(Vec<String>),
    /// Matched, nothing to report.
    Success,
    Clear,
    Exit,
    Error(String),
}

impl QueryResult {
    fn message(line: impl Into<String>) -> Self {
        QueryResult::Messages(vec![line.into()])
    }

    /// Plain text rendering for a terminal.
    pub fn lines(&self) -> Vec<String> {
        match self {
            QueryResult::Rows {
                title,
                columns,
                rows,
            } => {
                let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
                for row in rows {
                    for (width, cell) in widths.iter_mut().zip(row) {
                        *width = (*width).max(cell.chars().count());
                    }
                }
                let render = |cells: &[String]| {
                    let padded: Vec<String> = cells
                        .iter()
                        .zip(&widths)
                        .map(|(cell, width)| format!("{cell:<width$}", width = *width))
                        .collect();
                    format!("| {} |", padded.join(" | "))
                };
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

                let mut out = vec![
                    title.clone(),
                    render(columns.as_slice()),
                    format!("| {} |", rule.join(" | ")),
                ];
                out.extend(rows.iter().map(|row| render(row.as_slice())));
                out
            }
            QueryResult::Messages(lines) => lines.clone(),
            QueryResult::Error(message) => vec![message.clone()],
            QueryResult::Success | QueryResult::Clear | QueryResult::Exit => Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellErr {
    #[error(transparent)]
    Catalog(#[from] CatalogErr),
    #[error(transparent)]
    Encode(#[from] EncodeErr),
    #[error("Failed to persist catalog: {0}")]
    Persist(#[from] PersistErr),
    #[error("Error writing table {table}: {source}")]
    TableFile {
        table: String,
        #[source]
        source: io::Error,
    },
    #[error("missing argument [{0}]")]
    MissingArgument(&'static str),
    #[error("Expected [key]=[value], but found \"{0}\", table insert cancelled")]
    MalformedPair(String),
    #[error("Table {0} does not have any columns defined, ignoring")]
    NoColumns(String),
    #[error("no handler registered for \"{0}\"")]
    Unbound(CommandPath),
}

impl ShellErr {
    /// Failures of the disk rather than of the command.
    fn is_io(&self) -> bool {
        matches!(self, ShellErr::Persist(_) | ShellErr::TableFile { .. })
    }
}

/// Runs command lines against one catalog and its table files.
pub struct Executor<S> {
    catalog: Catalog,
    store: S,
    files: TableFiles,
    grammar: GrammarNode,
    handlers: HashMap<CommandPath, Command>,
    bools: BoolEncoding,
    created: bool,
}

impl<S: CatalogStore> Executor<S> {
    /// Loads the catalog from `store`, or saves the demo catalog there if it holds none.
    pub async fn open(config: &ShellConfig, store: S) -> Result<Self, ShellErr> {
        let (catalog, created) = match store.load().await? {
            Some(catalog) => (catalog, false),
            None => {
                let catalog = Catalog::demo()?;
                store.save(&catalog).await?;
                (catalog, true)
            }
        };
        info!(
            catalog = %catalog.id,
            tables = catalog.tables.len(),
            created,
            "Opened catalog"
        );

        let grammar = shell_grammar();
        let handlers: HashMap<CommandPath, Command> =
            Command::ALL.iter().map(|c| (c.path(), *c)).collect();
        for path in grammar.runnable_paths() {
            if !handlers.contains_key(&path) {
                warn!(command = %path, "No handler bound to command");
            }
        }

        Ok(Self {
            catalog,
            store,
            files: TableFiles::new(&config.root),
            grammar,
            handlers,
            bools: config.bool_encoding,
            created,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether [`Executor::open`] found no catalog and started from the demo one.
    pub fn created_catalog(&self) -> bool {
        self.created
    }

    pub async fn run(&mut self, line: &str) -> QueryResult {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return QueryResult::Success;
        }
        match match_tokens(&tokens, &self.grammar) {
            Ok(matched) => self.dispatch(matched).await,
            Err(e) => {
                debug!(error = %e, "Rejected command");
                QueryResult::Error(e.to_string())
            }
        }
    }

    /// Runs the handler bound to the matched path, once. A match without one does nothing.
    pub async fn dispatch(&mut self, matched: Match) -> QueryResult {
        let Some(path) = matched.handler else {
            return QueryResult::Success;
        };
        let result = match self.handlers.get(&path).copied() {
            Some(command) => self.execute(command, &matched.args).await,
            None => Err(ShellErr::Unbound(path)),
        };
        let result = result.unwrap_or_else(|e| {
            if e.is_io() {
                error!(error = %e, "Command failed");
            } else {
                debug!(error = %e, "Command failed");
            }
            QueryResult::Error(e.to_string())
        });
        if matched.ignored.is_empty() {
            return result;
        }

        let ignored = matched.ignored.join(" ");
        warn!(ignored = %ignored, "Ignored trailing input");
        let note = format!("Ignored trailing input: {ignored}");
        match result {
            QueryResult::Messages(mut lines) => {
                lines.push(note);
                QueryResult::Messages(lines)
            }
            QueryResult::Success => QueryResult::message(note),
            other => other,
        }
    }

    async fn execute(
        &mut self,
        command: Command,
        args: &ArgumentSet,
    ) -> Result<QueryResult, ShellErr> {
        match command {
            Command::CreateTable => {
                self.create_table(arg(args, TABLE_NAME)?, arg(args, TABLE_DESC)?)
                    .await
            }
            Command::DeleteTable => self.delete_table(arg(args, TABLE_NAME)?).await,
            Command::InsertRow => {
                self.insert_row(arg(args, TABLE_NAME)?, arg(args, TABLE_DATA)?)
                    .await
            }
            Command::ListTables => self.list_tables(),
            Command::InspectTable => self.inspect_table(arg(args, TABLE_NAME)?).await,
            Command::Clear => Ok(QueryResult::Clear),
            Command::Exit => Ok(QueryResult::Exit),
        }
    }

    /// Saves `next` and only then makes it the live catalog.
    async fn commit(&mut self, next: Catalog) -> Result<(), ShellErr> {
        self.store.save(&next).await?;
        self.catalog = next;
        Ok(())
    }

    async fn create_table(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<QueryResult, ShellErr> {
        let mut next = self.catalog.clone();
        next.create_table(name, description)?;
        self.commit(next).await?;
        info!(table = name, "Created table");
        Ok(QueryResult::message(format!("- Created table {name}")))
    }

    async fn delete_table(&mut self, name: &str) -> Result<QueryResult, ShellErr> {
        let mut next = self.catalog.clone();
        next.delete_table(name)?;
        self.commit(next).await?;
        info!(table = name, "Deleted table");
        Ok(QueryResult::message(format!("- Deleted table {name}")))
    }

    async fn insert_row(&self, name: &str, data: &str) -> Result<QueryResult, ShellErr> {
        let table = self.catalog.find_table(name)?;
        if table.columns.is_empty() {
            return Err(ShellErr::NoColumns(name.to_string()));
        }

        let mut messages = Vec::new();
        let mut values = HashMap::new();
        for part in data.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(ShellErr::MalformedPair(part.to_string()));
            };
            if !table.columns.contains_key(key) {
                messages.push(format!("Key: {key} is not present in table {name}, ignoring"));
                continue;
            }
            values.insert(key.to_string(), value.to_string());
        }

        let row = encode_row(table, &values, self.bools)?;
        let offset = self
            .files
            .append_row(name, &row)
            .await
            .map_err(|source| ShellErr::TableFile {
                table: name.to_string(),
                source,
            })?;
        info!(table = name, offset, width = row.len(), "Inserted row");
        messages.push(format!(
            "Inserted {data} into table {name} at offset {offset} ({} bytes)",
            row.len()
        ));
        Ok(QueryResult::Messages(messages))
    }

    fn list_tables(&self) -> Result<QueryResult, ShellErr> {
        let mut rows = Vec::new();
        for id in self.catalog.list_tables() {
            let table = self.catalog.find_table(id)?;
            rows.push(vec![
                table.id.clone(),
                table.description.clone(),
                table.columns.len().to_string(),
            ]);
        }
        Ok(QueryResult::Rows {
            title: format!("{} tables in {}", rows.len(), self.catalog.id),
            columns: vec!["table".into(), "description".into(), "columns".into()],
            rows,
        })
    }

    async fn inspect_table(&self, name: &str) -> Result<QueryResult, ShellErr> {
        let table = self.catalog.find_table(name)?;
        let width = table.row_width();
        let stored = self
            .files
            .stored_rows(name, width)
            .await
            .map_err(|source| ShellErr::TableFile {
                table: name.to_string(),
                source,
            })?;

        let rows = table
            .columns
            .values()
            .map(|c| {
                vec![
                    c.id.clone(),
                    c.column_type.to_string(),
                    c.column_type.width().to_string(),
                ]
            })
            .collect();
        Ok(QueryResult::Rows {
            title: format!(
                "Table {} (id {}) has {} columns, {} bytes per row, {} rows stored",
                table.id,
                TableId::of(&table.id),
                table.columns.len(),
                width,
                stored
            ),
            columns: vec!["column".into(), "type".into(), "width".into()],
            rows,
        })
    }
}

fn arg<'a>(args: &'a ArgumentSet, name: &'static str) -> Result<&'a str, ShellErr> {
    args.get(name)
        .map(String::as_str)
        .ok_or(ShellErr::MissingArgument(name))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::persist::MemoryCatalogStore;
    use crate::catalog::{JsonCatalogStore, TableDef};
    use crate::storage::ColumnType;
    use tempfile::TempDir;

    async fn shell(dir: &TempDir, catalog: &Catalog) -> Executor<MemoryCatalogStore> {
        let config = ShellConfig::new(dir.path());
        Executor::open(&config, MemoryCatalogStore::with(catalog))
            .await
            .unwrap()
    }

    fn empty() -> Catalog {
        Catalog::new("test", "empty catalog")
    }

    fn error_of(result: QueryResult) -> String {
        match result {
            QueryResult::Error(message) => message,
            other => panic!("expected an error, got {other:?}"),
        }
    }

    struct BrokenStore;

    impl CatalogStore for BrokenStore {
        async fn load(&self) -> Result<Option<Catalog>, PersistErr> {
            Ok(Some(Catalog::new("test", "read only")))
        }

        async fn save(&self, _catalog: &Catalog) -> Result<(), PersistErr> {
            Err(PersistErr::Io {
                path: "defs.json".into(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read only"),
            })
        }
    }

    #[test]
    fn test_every_runnable_path_is_bound() {
        let bound: Vec<CommandPath> = Command::ALL.iter().map(|c| c.path()).collect();
        let runnable = shell_grammar().runnable_paths();
        assert_eq!(runnable.len(), bound.len());
        for path in runnable {
            assert!(bound.contains(&path), "{path} has no command");
        }
    }

    #[tokio::test]
    async fn test_open_without_catalog_saves_demo() {
        let dir = TempDir::new().unwrap();
        let exec = Executor::open(&ShellConfig::new(dir.path()), MemoryCatalogStore::default())
            .await
            .unwrap();
        assert!(exec.created_catalog());
        assert_eq!(exec.catalog(), &Catalog::demo().unwrap());
        assert_eq!(exec.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &empty()).await;
        assert!(!exec.created_catalog());

        let result = exec.run("table create users \"a demo user\"").await;
        assert_eq!(
            result.lines(),
            vec!["- Created table users", "Ignored trailing input: demo user\""]
        );
        assert_eq!(exec.catalog().find_table("users").unwrap().description, "\"a");
        assert_eq!(exec.store.save_count(), 2);

        let QueryResult::Rows { rows, .. } = exec.run("table list").await else {
            panic!("table list should return rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "users");
        assert_eq!(rows[0][2], "0");
    }

    #[tokio::test]
    async fn test_deleted_table_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &empty()).await;
        exec.run("table create users x").await;
        assert_eq!(
            exec.run("table delete users").await,
            QueryResult::message("- Deleted table users")
        );
        let message = error_of(exec.run("table inspect users").await);
        assert!(message.contains("not found"), "{message}");
    }

    #[tokio::test]
    async fn test_misspelled_keyword_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &empty()).await;
        let message = error_of(exec.run("tabel create x y").await);
        assert!(message.contains("but got \"tabel\""), "{message}");
        assert!(exec.catalog().tables.is_empty());
        assert_eq!(exec.store.save_count(), 1);
        assert!(!dir.path().join("tables").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_table_keeps_persisted_catalog() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &Catalog::demo().unwrap()).await;
        let before = exec.store.last_saved();
        let message = error_of(exec.run("table delete ghosts").await);
        assert_eq!(message, "table by id ghosts not found");
        assert_eq!(exec.store.save_count(), 1);
        assert_eq!(exec.store.last_saved(), before);
    }

    #[tokio::test]
    async fn test_delete_missing_table_keeps_defs_file() {
        let dir = TempDir::new().unwrap();
        let config = ShellConfig::new(dir.path());
        let store = JsonCatalogStore::new(config.catalog_path());
        let mut exec = Executor::open(&config, store).await.unwrap();
        assert!(exec.created_catalog());
        let before = std::fs::read(config.catalog_path()).unwrap();

        let message = error_of(exec.run("table delete ghosts").await);
        assert_eq!(message, "table by id ghosts not found");
        assert_eq!(std::fs::read(config.catalog_path()).unwrap(), before);
        assert_eq!(exec.catalog(), &Catalog::demo().unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_ignored_words() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &Catalog::demo().unwrap()).await;
        assert_eq!(
            exec.run("table delete users please now").await.lines(),
            vec!["- Deleted table users", "Ignored trailing input: please now"]
        );
        assert!(exec.catalog().tables.is_empty());
    }

    #[tokio::test]
    async fn test_open_refuses_unsafe_table_id() {
        let dir = TempDir::new().unwrap();
        let mut catalog = empty();
        catalog
            .tables
            .insert("../escaped".to_string(), TableDef::new("../escaped", "outside"));
        let store = MemoryCatalogStore::with(&catalog);
        let err = Executor::open(&ShellConfig::new(dir.path()), store)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ShellErr::Persist(PersistErr::Invalid { .. })), "{err}");
        assert!(!dir.path().join("escaped.table").exists());
    }

    #[tokio::test]
    async fn test_create_existing_table_is_refused() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &Catalog::demo().unwrap()).await;
        let message = error_of(exec.run("table create users again").await);
        assert_eq!(message, "table users already exists");
        assert_eq!(exec.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_inserted_rows_are_fixed_stride() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &Catalog::demo().unwrap()).await;

        let first = exec
            .run("table insert into users username=alpha,verified=true")
            .await;
        let second = exec
            .run("table insert into users verified=false,username=beta")
            .await;
        assert_eq!(
            first.lines(),
            vec!["Inserted username=alpha,verified=true into table users at offset 0 (33 bytes)"]
        );
        assert_eq!(
            second.lines(),
            vec!["Inserted verified=false,username=beta into table users at offset 33 (33 bytes)"]
        );

        let users = exec.catalog().find_table("users").unwrap();
        let expect = |name: &str, verified: &str| {
            let values = HashMap::from([
                ("username".to_string(), name.to_string()),
                ("verified".to_string(), verified.to_string()),
            ]);
            encode_row(users, &values, BoolEncoding::Legacy).unwrap()
        };
        let bytes = std::fs::read(dir.path().join("tables").join("users.table")).unwrap();
        assert_eq!(bytes.len(), 66);
        assert_eq!(&bytes[..33], &expect("alpha", "true")[..]);
        assert_eq!(&bytes[33..], &expect("beta", "false")[..]);

        let QueryResult::Rows { title, rows, .. } = exec.run("table inspect users").await else {
            panic!("table inspect should return rows");
        };
        assert!(title.ends_with("33 bytes per row, 2 rows stored"), "{title}");
        assert_eq!(
            rows,
            vec![
                vec!["username".to_string(), "string32".to_string(), "32".to_string()],
                vec!["verified".to_string(), "boolean".to_string(), "1".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_insert_missing_field() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &Catalog::demo().unwrap()).await;
        let message = error_of(exec.run("table insert into users username=alpha").await);
        assert_eq!(
            message,
            "Missing key \"verified\" of type boolean, cannot insert into table"
        );
        assert!(!dir.path().join("tables").join("users.table").exists());
    }

    #[tokio::test]
    async fn test_insert_malformed_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &Catalog::demo().unwrap()).await;
        let message = error_of(exec.run("table insert into users username").await);
        assert!(message.starts_with("Expected [key]=[value]"), "{message}");

        let lines = exec
            .run("table insert into users username=a,age=3,verified=true")
            .await
            .lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Key: age is not present in table users, ignoring");
        assert!(lines[1].contains("at offset 0"));
    }

    #[tokio::test]
    async fn test_insert_into_table_without_columns() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &empty()).await;
        exec.run("table create things stuff").await;
        let message = error_of(exec.run("table insert into things a=1").await);
        assert_eq!(message, "Table things does not have any columns defined, ignoring");
        let message = error_of(exec.run("table insert into nothing a=1").await);
        assert!(message.contains("not found"));
    }

    #[tokio::test]
    async fn test_strict_booleans() {
        let dir = TempDir::new().unwrap();
        let mut config = ShellConfig::new(dir.path());
        config.bool_encoding = BoolEncoding::Strict;
        let mut catalog = empty();
        catalog.create_table("flags", "x").unwrap();
        catalog.add_column("flags", "on", ColumnType::Boolean).unwrap();
        let mut exec = Executor::open(&config, MemoryCatalogStore::with(&catalog))
            .await
            .unwrap();

        exec.run("table insert into flags on=true").await;
        exec.run("table insert into flags on=false").await;
        let bytes = std::fs::read(dir.path().join("tables").join("flags.table")).unwrap();
        assert_eq!(bytes, vec![1, 0]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_catalog() {
        let dir = TempDir::new().unwrap();
        let mut exec = Executor::open(&ShellConfig::new(dir.path()), BrokenStore)
            .await
            .unwrap();
        let message = error_of(exec.run("table create users x").await);
        assert!(message.starts_with("Failed to persist catalog"), "{message}");
        assert!(exec.catalog().tables.is_empty());
    }

    #[tokio::test]
    async fn test_shell_commands() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &empty()).await;
        assert_eq!(exec.run("clear").await, QueryResult::Clear);
        assert_eq!(exec.run("exit").await, QueryResult::Exit);
        assert_eq!(exec.run("   ").await, QueryResult::Success);
        let message = error_of(exec.run("table").await);
        assert!(message.contains("requires more arguments"));
    }

    #[tokio::test]
    async fn test_dispatch_without_handler() {
        let dir = TempDir::new().unwrap();
        let mut exec = shell(&dir, &empty()).await;
        let matched = Match {
            args: ArgumentSet::new(),
            handler: None,
            ignored: Vec::new(),
        };
        assert_eq!(exec.dispatch(matched).await, QueryResult::Success);

        let matched = Match {
            args: ArgumentSet::new(),
            handler: Some(CommandPath::from(&["table", "drop"][..])),
            ignored: Vec::new(),
        };
        let message = error_of(exec.dispatch(matched).await);
        assert_eq!(message, "no handler registered for \"table drop\"");
    }

    #[test]
    fn test_rows_rendering() {
        let result = QueryResult::Rows {
            title: "1 tables in demo".to_string(),
            columns: vec!["table".to_string(), "columns".to_string()],
            rows: vec![vec!["users".to_string(), "2".to_string()]],
        };
        assert_eq!(
            result.lines(),
            vec![
                "1 tables in demo",
                "| table | columns |",
                "| ----- | ------- |",
                "| users | 2       |",
            ]
        );
        assert!(QueryResult::Success.lines().is_empty());
    }
}
