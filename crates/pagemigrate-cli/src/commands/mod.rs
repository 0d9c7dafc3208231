use anyhow::{Context, Result};
use pagemigrate_core::{
    AnnotateDatesRequest, MigrationConfig, ReorganizeRequest, annotate_dates, match_corpora,
    reorganize,
};
use tracing::info;

use crate::cli::{Cli, Commands};

mod support;


use self::support::{apply_matching_args, print_json};

pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = MigrationConfig::load(cli.config.as_deref()).context("failed to load config")?;
    run_with_config(config, cli.command)
}

fn run_with_config(mut config: MigrationConfig, command: Commands) -> Result<()> {
    match command {
        Commands::AnnotateDates(args) => {
            apply_matching_args(&mut config, &args.matching)?;
            info!(
                legacy = %args.legacy_root.display(),
                target = %args.target_root.display(),
                "annotating dates"
            );
            let report = annotate_dates(
                &AnnotateDatesRequest {
                    legacy_root: args.legacy_root,
                    target_root: args.target_root,
                    output_root: args.output_root,
                },
                &config,
            )
            .context("date annotation failed")?;
            print_json(&report)?;
        }
        Commands::Reorganize(args) => {
            apply_matching_args(&mut config, &args.matching)?;
            if args.strip_home_icons {
                config.strip_home_icons = true;
            }
            info!(source = %args.source_folder.display(), "reorganizing export");
            let report = reorganize(
                &ReorganizeRequest {
                    source_folder: args.source_folder,
                    output_root: args.output_root,
                    root_name: args.root_name,
                },
                &config,
            )
            .context("reorganization failed")?;
            print_json(&report)?;
        }
        Commands::Match(args) => {
            apply_matching_args(&mut config, &args.matching)?;
            let report = match_corpora(&args.legacy_root, &args.target_root, &config)
                .context("matching failed")?;
            print_json(&report)?;
        }
    }
    Ok(())
}
