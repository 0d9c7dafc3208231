use std::path::PathBuf;

use clap::Args;
use pagemigrate_core::SimilarityMetric;

/// Matching overrides shared by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct MatchingArgs {
    /// Minimum similarity for pairing a legacy title with a Markdown file name.
    #[arg(long)]
    pub cutoff: Option<f64>,
    /// Similarity required before a sibling page is promoted to a home page.
    #[arg(long)]
    pub home_page_cutoff: Option<f64>,
    /// sequence-ratio | levenshtein | damerau | sorensen-dice | jaro-winkler
    #[arg(long, value_parser = parse_metric)]
    pub metric: Option<SimilarityMetric>,
    /// Skip paths (relative to the corpus root) matching this glob.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,
}

fn parse_metric(raw: &str) -> Result<SimilarityMetric, String> {
    raw.parse::<SimilarityMetric>().map_err(|err| err.to_string())
}

#[derive(Debug, Args)]
pub struct AnnotateDatesArgs {
    /// Root of the exported HTML space.
    pub legacy_root: PathBuf,
    /// Root of the Markdown export.
    pub target_root: PathBuf,
    /// Where annotated copies and the audit file are written.
    pub output_root: PathBuf,
    #[command(flatten)]
    pub matching: MatchingArgs,
}

#[derive(Debug, Args)]
pub struct ReorganizeArgs {
    /// Where the rebuilt tree is written.
    pub output_root: PathBuf,
    /// Folder holding the flat Markdown export of one space.
    pub source_folder: PathBuf,
    /// Name of the tree root. Defaults to the source folder's name.
    #[arg(long)]
    pub root_name: Option<String>,
    /// Remove space home icons left behind by the exporter.
    #[arg(long, default_value_t = false)]
    pub strip_home_icons: bool,
    #[command(flatten)]
    pub matching: MatchingArgs,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    pub legacy_root: PathBuf,
    pub target_root: PathBuf,
    #[command(flatten)]
    pub matching: MatchingArgs,
}
