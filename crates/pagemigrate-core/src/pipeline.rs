//! The two end-to-end runs: reorganizing an exported Markdown space, and
//! annotating Markdown pages with the dates of their legacy counterparts.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{MigrationManifest, write_correspondence_csv};
use crate::config::MigrationConfig;
use crate::dates::{extract_date_block, inject_date_block};
use crate::discover::{
    DiscoveryFilter, discover_legacy_pages, discover_target_pages, list_source_pages,
};
use crate::error::{MigrateError, Result, SkippedItem};
use crate::fs::{
    common_ancestor, copy_assigned, copy_file, relocate_asset_folders, resolve_canonical,
    write_atomic,
};
use crate::home_pages::{HomePageRename, synthesize_home_pages};
use crate::index::{KeyCollision, TitleIndex};
use crate::links::{LinkRewriter, RewriteStats};
use crate::reconcile::{Correspondence, PathAssignmentMap, assign_paths, correspond};
use crate::text::read_text;

#[derive(Debug, Clone)]
pub struct ReorganizeRequest {
    pub source_folder: PathBuf,
    pub output_root: PathBuf,
    /// Defaults to the last component of `source_folder`.
    pub root_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorganizeReport {
    pub root_name: String,
    pub pages: usize,
    pub assigned: usize,
    pub copied: usize,
    pub home_page_renames: Vec<HomePageRename>,
    pub home_page_stubs: Vec<String>,
    pub rewritten_pages: usize,
    pub rewrite: RewriteStats,
    pub relocated_asset_folders: Vec<String>,
    pub skipped: Vec<SkippedItem>,
    pub manifest_path: PathBuf,
}

/// Name of the tree root for an export folder: its own last path segment.
pub fn derive_root_name(source_folder: &Path) -> Result<String> {
    source_folder
        .components()
        .rev()
        .find_map(|component| match component {
            Component::Normal(name) => name.to_str().map(str::to_string),
            _ => None,
        })
        .ok_or_else(|| {
            MigrateError::Validation(format!(
                "cannot derive a root name from {}",
                source_folder.display()
            ))
        })
}

/// Rebuilds the export in `source_folder` as a breadcrumb-shaped tree under
/// `output_root/<root name>`.
///
/// Stages run strictly in order: path assignment, copy, home pages, link
/// rewriting, asset folders. Per-page failures are collected in the report.
pub fn reorganize(
    request: &ReorganizeRequest,
    config: &MigrationConfig,
) -> Result<ReorganizeReport> {
    let root_name = match &request.root_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => derive_root_name(&request.source_folder)?,
    };
    let filter = DiscoveryFilter::new(&config.exclude_globs)?;
    let output_root = request.output_root.as_path();
    fs::create_dir_all(output_root)?;

    let pages = list_source_pages(&request.source_folder, &filter)?;
    info!(root = %root_name, pages = pages.len(), "reorganizing export");

    let page_count = pages.len();
    let assignment = assign_paths(pages, &root_name);
    let mut assignments = assignment.map;
    let mut skipped = assignment.skipped;

    let copy = copy_assigned(&assignments, output_root);
    skipped.extend(copy.skipped);

    let home_pages = synthesize_home_pages(
        output_root,
        &root_name,
        &mut assignments,
        config.home_page_options(),
    );
    skipped.extend(home_pages.skipped);

    let (rewritten_pages, rewrite) =
        rewrite_links(output_root, &root_name, &assignments, config, &mut skipped);

    let assets = relocate_asset_folders(&request.source_folder, output_root, &root_name);
    skipped.extend(assets.skipped);

    let manifest_path = output_root.join(&config.manifest_file_name);
    let manifest = MigrationManifest::collect(
        output_root,
        &root_name,
        &assignments,
        home_pages.renames.clone(),
        home_pages.stubs.clone(),
        skipped.clone(),
    );
    manifest.write(&manifest_path)?;

    info!(
        root = %root_name,
        assigned = assignments.len(),
        rewritten = rewritten_pages,
        skipped = skipped.len(),
        "reorganization complete"
    );
    Ok(ReorganizeReport {
        root_name,
        pages: page_count,
        assigned: assignments.len(),
        copied: copy.copied,
        home_page_renames: home_pages.renames,
        home_page_stubs: home_pages.stubs,
        rewritten_pages,
        rewrite,
        relocated_asset_folders: assets.relocated,
        skipped,
        manifest_path,
    })
}

fn rewrite_links(
    output_root: &Path,
    root_name: &str,
    assignments: &PathAssignmentMap,
    config: &MigrationConfig,
    skipped: &mut Vec<SkippedItem>,
) -> (usize, RewriteStats) {
    let rewriter = LinkRewriter::new(assignments, root_name)
        .with_metric(config.metric)
        .with_home_icon_stripping(config.strip_home_icons);
    let mut stats = RewriteStats::default();
    let mut rewritten = 0usize;

    for (_, canonical) in assignments.iter() {
        let path = resolve_canonical(output_root, canonical);
        let result = fs::read_to_string(&path)
            .map_err(|err| MigrateError::from_io(&path, err))
            .and_then(|content| {
                let outcome = rewriter.rewrite(&content);
                if outcome.changed_from(&content) {
                    write_atomic(&path, &outcome.content)?;
                    rewritten += 1;
                }
                Ok(outcome.stats)
            });
        match result {
            Ok(page_stats) => stats.absorb(&page_stats),
            Err(err) => {
                warn!(page = %path.display(), code = err.code(), "link rewrite skipped: {err}");
                skipped.push(err.to_skipped(&path));
            }
        }
    }
    info!(
        pages = rewritten,
        links = stats.links_rewritten,
        assets = stats.assets_relocated,
        "link rewriting complete"
    );
    (rewritten, stats)
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub legacy_pages: usize,
    pub target_pages: usize,
    pub correspondence: Correspondence,
    pub collisions: Vec<KeyCollision>,
    pub skipped: Vec<SkippedItem>,
}

/// Discovers both corpora and pairs legacy pages with target pages.
pub fn match_corpora(
    legacy_root: &Path,
    target_root: &Path,
    config: &MigrationConfig,
) -> Result<MatchReport> {
    let filter = DiscoveryFilter::new(&config.exclude_globs)?;
    let legacy = discover_legacy_pages(legacy_root, &filter);
    let target = discover_target_pages(target_root, &filter);

    let legacy_index = TitleIndex::build(legacy.entries);
    let target_index = TitleIndex::build(target.entries);
    let correspondence = correspond(&legacy_index, &target_index, config.match_options());

    let mut collisions = legacy_index.collisions().to_vec();
    collisions.extend_from_slice(target_index.collisions());
    let mut skipped = legacy.skipped;
    skipped.extend(target.skipped);

    Ok(MatchReport {
        legacy_pages: legacy_index.len(),
        target_pages: target_index.len(),
        correspondence,
        collisions,
        skipped,
    })
}

#[derive(Debug, Clone)]
pub struct AnnotateDatesRequest {
    pub legacy_root: PathBuf,
    pub target_root: PathBuf,
    pub output_root: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateDatesReport {
    pub legacy_pages: usize,
    pub target_pages: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub annotated: usize,
    pub copied_unchanged: usize,
    pub collisions: Vec<KeyCollision>,
    pub skipped: Vec<SkippedItem>,
    pub audit_path: PathBuf,
}

/// Copies every matched Markdown page into `output_root` with the legacy
/// page's created/modified line, and writes the key audit file.
pub fn annotate_dates(
    request: &AnnotateDatesRequest,
    config: &MigrationConfig,
) -> Result<AnnotateDatesReport> {
    let matched = match_corpora(&request.legacy_root, &request.target_root, config)?;
    let output_root = request.output_root.as_path();
    fs::create_dir_all(output_root)?;

    let pairs = matched.correspondence.paths();
    let base = common_ancestor(pairs.values().map(PathBuf::as_path)).unwrap_or_default();
    let mut skipped = matched.skipped;
    let (mut annotated, mut copied_unchanged) = (0usize, 0usize);

    for (legacy_path, target_path) in &pairs {
        let relative = target_path.strip_prefix(&base).unwrap_or(target_path);
        let output_path = output_root.join(relative);
        match annotate_one(legacy_path, target_path, &output_path) {
            Ok(true) => annotated += 1,
            Ok(false) => copied_unchanged += 1,
            Err(err) => {
                warn!(
                    page = %target_path.display(),
                    code = err.code(),
                    "date annotation skipped: {err}"
                );
                skipped.push(err.to_skipped(target_path));
            }
        }
    }

    let audit_path = output_root.join(&config.audit_file_name);
    write_correspondence_csv(&audit_path, &matched.correspondence.pairs)?;

    info!(
        matched = pairs.len(),
        annotated,
        copied_unchanged,
        "date annotation complete"
    );
    Ok(AnnotateDatesReport {
        legacy_pages: matched.legacy_pages,
        target_pages: matched.target_pages,
        matched: matched.correspondence.len(),
        unmatched: matched.correspondence.unmatched.len(),
        annotated,
        copied_unchanged,
        collisions: matched.collisions,
        skipped,
        audit_path,
    })
}

/// Returns whether a date line was written.
fn annotate_one(legacy_path: &Path, target_path: &Path, output_path: &Path) -> Result<bool> {
    let html = read_text(legacy_path)?;
    copy_file(target_path, output_path)?;
    let Some(block) = extract_date_block(&html) else {
        return Ok(false);
    };
    let markdown = fs::read_to_string(output_path)
        .map_err(|err| MigrateError::from_io(output_path, err))?;
    write_atomic(output_path, &inject_date_block(&markdown, &block))?;
    Ok(true)
}
