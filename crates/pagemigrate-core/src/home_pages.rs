use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::breadcrumb::home_page_name;
use crate::error::{MigrateError, SkippedItem};
use crate::fs::{canonical_from_path, write_atomic};
use crate::links::{ATTACHMENTS_DIR, IMAGES_DIR};
use crate::reconcile::PathAssignmentMap;
use crate::similarity::{DEFAULT_HOME_PAGE_CUTOFF, SimilarityMetric};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomePageOptions {
    /// A sibling is promoted only when it scores strictly above this.
    pub cutoff: f64,
    pub metric: SimilarityMetric,
}

impl Default for HomePageOptions {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_HOME_PAGE_CUTOFF,
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomePageRename {
    pub from: String,
    pub to: String,
    pub score: f64,
    pub updated_assignments: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HomePageReport {
    pub renames: Vec<HomePageRename>,
    pub stubs: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

/// Gives every directory under `output_root/root_name` a home page.
///
/// A directory `D` is served by its sibling `D.md`. When that file is missing
/// the closest-named sibling page is promoted, otherwise a stub holding only
/// `# D` is written. Renames are applied to `assignments` so later link
/// rewriting resolves to the new names.
pub fn synthesize_home_pages(
    output_root: &Path,
    root_name: &str,
    assignments: &mut PathAssignmentMap,
    options: HomePageOptions,
) -> HomePageReport {
    let mut report = HomePageReport::default();
    let tree_root = output_root.join(root_name);

    let directories = WalkDir::new(&tree_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_asset_folder(entry.file_name().to_str()))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(entry.into_path()),
            Ok(_) => None,
            Err(err) => {
                warn!("home page scan skipped an entry: {err}");
                None
            }
        })
        .collect::<Vec<_>>();

    for directory in directories {
        let (Some(parent), Some(name)) = (
            directory.parent(),
            directory.file_name().and_then(|n| n.to_str()),
        ) else {
            continue;
        };
        let home = parent.join(home_page_name(name));
        if home.exists() {
            continue;
        }

        match best_sibling(parent, name, options) {
            Some((sibling, score)) if score > options.cutoff => {
                promote_sibling(output_root, &sibling, &home, score, assignments, &mut report);
            }
            _ => write_stub(output_root, &home, name, &mut report),
        }
    }

    info!(
        renamed = report.renames.len(),
        stubs = report.stubs.len(),
        skipped = report.skipped.len(),
        "home page synthesis complete"
    );
    report
}

fn is_asset_folder(name: Option<&str>) -> bool {
    matches!(name, Some(ATTACHMENTS_DIR | IMAGES_DIR))
}

/// Closest sibling page by stem. Pages that already serve as the home page of
/// another sibling directory are not eligible.
fn best_sibling(
    parent: &Path,
    directory_name: &str,
    options: HomePageOptions,
) -> Option<(PathBuf, f64)> {
    let mut siblings = fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_string();
            (!parent.join(&stem).is_dir()).then_some((path, stem))
        })
        .collect::<Vec<_>>();
    siblings.sort();

    let mut best: Option<(PathBuf, f64)> = None;
    for (path, stem) in siblings {
        let score = options.metric.score(directory_name, &stem);
        if best.as_ref().is_none_or(|(_, current)| score > *current) {
            best = Some((path, score));
        }
    }
    best
}

fn promote_sibling(
    output_root: &Path,
    sibling: &Path,
    home: &Path,
    score: f64,
    assignments: &mut PathAssignmentMap,
    report: &mut HomePageReport,
) {
    if let Err(err) = fs::rename(sibling, home) {
        let err = MigrateError::from_io(sibling, err);
        warn!(page = %sibling.display(), code = err.code(), "home page rename skipped: {err}");
        report.skipped.push(err.to_skipped(sibling));
        return;
    }

    let (Some(from), Some(to)) = (
        canonical_from_path(output_root, sibling),
        canonical_from_path(output_root, home),
    ) else {
        return;
    };
    let updated_assignments = assignments.apply_rename(&from, &to);
    debug!(%from, %to, score, updated_assignments, "promoted sibling to home page");
    report.renames.push(HomePageRename {
        from,
        to,
        score,
        updated_assignments,
    });
}

fn write_stub(output_root: &Path, home: &Path, directory_name: &str, report: &mut HomePageReport) {
    match write_atomic(home, &format!("# {directory_name}\n")) {
        Ok(()) => {
            if let Some(canonical) = canonical_from_path(output_root, home) {
                debug!(home = %canonical, "created home page stub");
                report.stubs.push(canonical);
            }
        }
        Err(err) => {
            warn!(page = %home.display(), code = err.code(), "home page stub skipped: {err}");
            report.skipped.push(err.to_skipped(home));
        }
    }
}
