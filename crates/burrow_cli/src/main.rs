//! Burrow CLI
//!
//! Command-line access to a Burrow store directory.
//!
//! # Commands
//!
//! - `put` - Store a value under a key
//! - `get` - Print the value stored under a key
//! - `delete` - Remove a key
//! - `scan` - List entries in key order
//! - `stats` - Display store properties

mod commands;

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Burrow command-line store tools.
#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
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
    /// Store a value under a key, creating the store if needed
    Put {
        /// Key (UTF-8)
        key: String,
        /// Value (UTF-8)
        value: String,
    },

    /// Print the value stored under a key
    Get {
        /// Key (UTF-8)
        key: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Remove a key
    Delete {
        /// Key (UTF-8)
        key: String,
    },

    /// List entries in key order
    Scan {
        /// Start at the first key greater than or equal to this one
        #[arg(long)]
        from: Option<String>,

        /// Walk from the largest key down
        #[arg(short, long)]
        reverse: bool,

        /// Maximum number of entries to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display store properties
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Put { key, value } => {
            let path = cli.path.ok_or("Store path required for put")?;
            commands::write::put(&path, key.as_bytes(), value.as_bytes())?;
        }
        Commands::Get { key, format } => {
            let path = cli.path.ok_or("Store path required for get")?;
            commands::get::run(&path, key.as_bytes(), &format, &mut out)?;
        }
        Commands::Delete { key } => {
            let path = cli.path.ok_or("Store path required for delete")?;
            commands::write::delete(&path, key.as_bytes())?;
        }
        Commands::Scan {
            from,
            reverse,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for scan")?;
            let scan = commands::scan::ScanArgs {
                from: from.map(String::into_bytes),
                reverse,
                limit,
            };
            commands::scan::run(&path, &scan, &format, &mut out)?;
        }
        Commands::Stats { format } => {
            let path = cli.path.ok_or("Store path required for stats")?;
            commands::stats::run(&path, &format, &mut out)?;
        }
        Commands::Version => {
            writeln!(out, "Burrow CLI v{}", env!("CARGO_PKG_VERSION"))?;
        }
    }

    Ok(())
}
