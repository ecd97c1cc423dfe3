//! Grove CLI entry point

use clap::{Parser, Subcommand};
use grove::{commands, Workspace};
use grove_core::IdStrategy;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Dependency graph for incremental builds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Remove orphaned dependencies when an edge is removed
    #[arg(long)]
    gc: bool,

    /// Give new files generated ids instead of their paths
    #[arg(long)]
    generated_ids: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a file
    Add {
        path: String,

        /// Mark the file as an entry point
        #[arg(short, long, conflicts_with = "parent")]
        entry: bool,

        /// Add the file as a dependency of this file
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Stop tracking a file
    Remove {
        id: String,

        /// Also drop the file's dependency edges
        #[arg(short, long)]
        force: bool,
    },
    /// Show file, dependency, entry and cycle counts
    Stats,
    /// List files in processing order
    Order {
        /// Dependencies before dependants
        #[arg(short, long)]
        topological: bool,
    },
    /// List the dependencies of a file
    Deps {
        id: String,

        #[arg(short, long)]
        recursive: bool,

        /// List dependants instead
        #[arg(short, long)]
        dependants: bool,
    },
    /// List entry files, optionally only those reaching a file
    Entries {
        #[arg(long)]
        from: Option<String>,
    },
    /// Remove files unreachable from the anchors (entry files by default)
    Prune {
        #[arg(short, long = "anchor")]
        anchors: Vec<String>,
    },
    /// Remove edges until the tree has no cycles
    BreakCycles {
        #[arg(long, default_value = "10")]
        max_passes: usize,
    },
    /// Compare another snapshot against the current tree
    Diff { other: PathBuf },
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("grove={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut ws = Workspace::open(&cli.root)?;
    if cli.gc {
        ws.config.tree.gc_orphans = true;
    }
    if cli.generated_ids {
        ws.config.tree.id_strategy = IdStrategy::Generated;
    }
    tracing::debug!("Repository root: {}", ws.root.display());

    let output = match cli.command {
        Commands::Add { path, entry, parent } => commands::add(&ws, &path, entry, parent.as_deref())?,
        Commands::Remove { id, force } => commands::remove(&ws, &id, force)?,
        Commands::Stats => commands::stats(&ws)?,
        Commands::Order { topological } => commands::order(&ws, topological)?,
        Commands::Deps { id, recursive, dependants } => commands::deps(&ws, &id, recursive, dependants)?,
        Commands::Entries { from } => commands::entries(&ws, from.as_deref())?,
        Commands::Prune { anchors } => commands::prune(&ws, &anchors)?,
        Commands::BreakCycles { max_passes } => commands::break_cycles(&ws, max_passes)?,
        Commands::Diff { other } => commands::diff(&ws, &other)?,
        Commands::Clear => {
            commands::clear(&ws)?;
            return Ok(());
        }
        Commands::Version => format!("Grove v{}", env!("CARGO_PKG_VERSION")),
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
