pub mod catalog;
pub mod command;
pub mod config;
pub mod executor;
pub mod gui;
pub mod storage;

use catalog::{CatalogStore, JsonCatalogStore};
use clap::Parser;
use config::{BoolEncoding, ShellConfig};
use executor::{Executor, QueryResult};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Interactive shell over a flat-file table store
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding defs.json and the table files
    #[arg(value_name = "DATABASE ROOT", env = "ACORN_ROOT", default_value = "db")]
    root: PathBuf,

    /// How boolean columns are written
    #[arg(long, value_enum, env = "ACORN_BOOL_ENCODING", default_value_t = BoolEncoding::Legacy)]
    bool_encoding: BoolEncoding,

    /// Open a window instead of reading commands from stdin
    #[arg(long)]
    gui: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ShellConfig::new(args.root);
    config.bool_encoding = args.bool_encoding;

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store = JsonCatalogStore::new(config.catalog_path());
    let defs = store.path().to_path_buf();
    let exec = match runtime.block_on(Executor::open(&config, store)) {
        Ok(exec) => exec,
        Err(e) => {
            error!(error = %e, "Cannot open database");
            eprintln!("Cannot open database in '{}': {e}", config.root.display());
            return ExitCode::FAILURE;
        }
    };
    if exec.created_catalog() {
        println!("No {}, created", defs.display());
    } else {
        println!(
            "Found {}, loaded {} tables",
            defs.display(),
            exec.catalog().tables.len()
        );
    }

    if args.gui {
        return match gui::Application::new(exec, runtime).launch() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to open window: {e}");
                ExitCode::FAILURE
            }
        };
    }
    repl(exec, &runtime)
}

fn repl<S: CatalogStore>(mut exec: Executor<S>, runtime: &Runtime) -> ExitCode {
    println!("Acorn shell (type 'exit' to stop)");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }
        let input = match lines.next() {
            Some(Ok(input)) => input,
            Some(Err(e)) => {
                eprintln!("Failed to read line: {e}");
                return ExitCode::FAILURE;
            }
            // end of input
            None => return ExitCode::SUCCESS,
        };

        match runtime.block_on(exec.run(&input)) {
            QueryResult::Exit => return ExitCode::SUCCESS,
            QueryResult::Clear => print!("\x1b[H\x1b[2J"),
            result => {
                for line in result.lines() {
                    println!("{line}");
                }
            }
        }
    }
}
