use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{MigrateError, Result, SkippedItem};
use crate::fs::relative_to_unix_path;
use crate::index::CorpusEntry;
use crate::text::{TextEncoding, decode_text};

static TITLE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span id="title-text">\s*(.*?)\s*</span>"#).expect("valid title pattern")
});

/// Pages found in one corpus, in walk order, plus the files that were passed over.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub entries: Vec<CorpusEntry>,
    pub skipped: Vec<SkippedItem>,
}

/// Glob-based exclusion applied to paths relative to the corpus root.
#[derive(Debug, Clone)]
pub struct DiscoveryFilter {
    exclude: GlobSet,
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self {
            exclude: GlobSet::empty(),
        }
    }
}

impl DiscoveryFilter {
    pub fn new(exclude_globs: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_globs {
            let trimmed = pattern.trim();
            if trimmed.is_empty() {
                continue;
            }
            let glob = Glob::new(trimmed).map_err(|err| {
                MigrateError::Validation(format!("invalid exclude glob '{trimmed}': {err}"))
            })?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|err| MigrateError::Validation(format!("invalid exclude globs: {err}")))?;
        Ok(Self { exclude })
    }

    fn allows(&self, root: &Path, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };
        !self.exclude.is_match(relative_to_unix_path(relative))
    }
}

/// Title of an exported legacy page.
#[must_use]
pub fn extract_title(html: &str) -> Option<String> {
    let title = TITLE_SPAN.captures(html)?.get(1)?.as_str().trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Recursively collects `.html` pages keyed by their embedded title.
pub fn discover_legacy_pages(root: &Path, filter: &DiscoveryFilter) -> Discovery {
    let mut out = Discovery::default();
    for path in walk_files(root, filter, "html", &mut out.skipped) {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                skip(&mut out.skipped, &path, MigrateError::from_io(&path, err));
                continue;
            }
        };
        let (html, encoding) = decode_text(&bytes);
        if encoding == TextEncoding::Latin1 {
            debug!(page = %path.display(), "decoded legacy page as latin-1");
        }
        match extract_title(&html) {
            Some(title) => out.entries.push(CorpusEntry::new(title, path)),
            None => skip(
                &mut out.skipped,
                &path,
                MigrateError::SkippableFile {
                    path: path.clone(),
                    reason: "no title-text span".to_string(),
                },
            ),
        }
    }
    info!(
        root = %root.display(),
        pages = out.entries.len(),
        skipped = out.skipped.len(),
        "discovered legacy pages"
    );
    out
}

/// Recursively collects `.md` pages keyed by file name.
pub fn discover_target_pages(root: &Path, filter: &DiscoveryFilter) -> Discovery {
    let mut out = Discovery::default();
    for path in walk_files(root, filter, "md", &mut out.skipped) {
        match path.file_name().and_then(|n| n.to_str()).map(str::to_string) {
            Some(name) => out.entries.push(CorpusEntry::new(name, path)),
            None => skip(
                &mut out.skipped,
                &path,
                MigrateError::SkippableFile {
                    path: path.clone(),
                    reason: "file name is not valid UTF-8".to_string(),
                },
            ),
        }
    }
    info!(
        root = %root.display(),
        pages = out.entries.len(),
        skipped = out.skipped.len(),
        "discovered target pages"
    );
    out
}

/// The `.md` pages directly inside an export folder, sorted by path.
pub fn list_source_pages(folder: &Path, filter: &DiscoveryFilter) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(MigrateError::Validation(format!(
            "source folder is not a directory: {}",
            folder.display()
        )));
    }
    let mut pages = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, "md") && filter.allows(folder, &path) {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

fn walk_files(
    root: &Path,
    filter: &DiscoveryFilter,
    extension: &str,
    skipped: &mut Vec<SkippedItem>,
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| filter.allows(root, entry.path()));
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && has_extension(entry.path(), extension) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                skip(
                    skipped,
                    &path,
                    MigrateError::SkippableFile {
                        path: path.clone(),
                        reason: err.to_string(),
                    },
                );
            }
        }
    }
    files
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn skip(skipped: &mut Vec<SkippedItem>, path: &Path, err: MigrateError) {
    warn!(page = %path.display(), code = err.code(), "skipping file: {err}");
    skipped.push(err.to_skipped(path));
}
