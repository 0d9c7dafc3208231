use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod args;


pub use args::{AnnotateDatesArgs, MatchArgs, MatchingArgs, ReorganizeArgs};

#[derive(Debug, Parser)]
#[command(name = "pagemigrate")]
#[command(about = "Reconcile and reorganize exported wiki spaces", version)]
pub struct Cli {
    /// TOML file with matching settings.
    #[arg(long, global = true, env = "PAGEMIGRATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy legacy created/modified lines into the matching Markdown pages.
    AnnotateDates(AnnotateDatesArgs),
    /// Rebuild an exported Markdown space as a breadcrumb-shaped tree.
    Reorganize(ReorganizeArgs),
    /// Print the legacy-to-Markdown correspondence without writing anything.
    Match(MatchArgs),
}
