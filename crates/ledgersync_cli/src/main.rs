//! ledgersync CLI
//!
//! Command-line tools for ledgersync store files.
//!
//! # Commands
//!
//! - `init` - Create a store and define tables
//! - `inspect` - Display tables, anchor and journal statistics
//! - `dump-journal` - Dump journal entries for debugging
//! - `marshal` - Print the payload the next push would send
//! - `install-keys` - Replace the row-id key series
//! - `sync` - Run one sync against a server

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ledgersync command-line store tools.
#[derive(Parser)]
#[command(name = "ledgersync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a store and define tables
    Init {
        /// Table definition as `name:col,col,...` (repeatable)
        #[arg(short, long = "table", required = true)]
        tables: Vec<String>,
    },

    /// Display tables, anchor and journal statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump journal entries for debugging
    DumpJournal {
        /// Include acknowledged entries below the anchor
        #[arg(short, long)]
        all: bool,

        /// Maximum number of entries to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the payload the next push would send
    Marshal {
        /// Print compact JSON on one line
        #[arg(short, long)]
        compact: bool,
    },

    /// Replace the row-id key series
    InstallKeys {
        /// First key to issue
        #[arg(short, long)]
        next: i64,

        /// Last key to issue (inclusive)
        #[arg(short, long)]
        upper: i64,
    },

    /// Run one sync against a server
    Sync {
        /// Server base URL
        #[arg(short, long)]
        url: String,

        /// Bearer token
        #[arg(short, long)]
        token: String,

        /// Attempts for transient failures
        #[arg(short, long, default_value = "3")]
        retries: u32,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { tables } => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path, &tables)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::DumpJournal { all, limit, format } => {
            let path = cli.path.ok_or("Store path required for dump-journal")?;
            commands::dump_journal::run(&path, all, limit, &format)?;
        }
        Commands::Marshal { compact } => {
            let path = cli.path.ok_or("Store path required for marshal")?;
            commands::marshal::run(&path, compact)?;
        }
        Commands::InstallKeys { next, upper } => {
            let path = cli.path.ok_or("Store path required for install-keys")?;
            commands::install_keys::run(&path, next, upper)?;
        }
        Commands::Sync {
            url,
            token,
            retries,
        } => {
            let path = cli.path.ok_or("Store path required for sync")?;
            commands::sync::run(&path, &url, &token, retries)?;
        }
        Commands::Version => {
            println!("ledgersync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
