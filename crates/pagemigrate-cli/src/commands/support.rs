use std::io::{self, Write};

use anyhow::Result;
use pagemigrate_core::MigrationConfig;

use crate::cli::MatchingArgs;

pub(super) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Command-line flags win over file and environment settings.
pub(super) fn apply_matching_args(config: &mut MigrationConfig, args: &MatchingArgs) -> Result<()> {
    if let Some(cutoff) = args.cutoff {
        config.title_cutoff = cutoff;
    }
    if let Some(cutoff) = args.home_page_cutoff {
        config.home_page_cutoff = cutoff;
    }
    if let Some(metric) = args.metric {
        config.metric = metric;
    }
    config.exclude_globs.extend(
        args.exclude
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(ToString::to_string),
    );
    config.exclude_globs.sort();
    config.exclude_globs.dedup();
    config.validate()?;
    Ok(())
}
