//! Canonical output locations derived from the breadcrumb line that the
//! Markdown exporter writes at the top of every page.
//!
//! A page whose first line reads
//! `[Root](index.md) > [Team A](Team-A_12.md) > [Onboarding](Onboarding_13.md)`
//! belongs at `<root>/Team_A/Onboarding/<file name>`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{MigrateError, Result};
use crate::text::read_first_line;

const TRAIL_SEPARATOR: &str = " > ";
const PAIR_SEPARATOR: &str = "](";
const INDEX_FILE_NAME: &str = "index.md";
const HOME_PAGE_EXTENSION: &str = "md";

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.]").expect("valid disallowed-char pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s").expect("valid whitespace pattern"));
static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid underscore pattern"));
static DOT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid dot pattern"));

const SEGMENT_REPLACEMENTS: [(&str, &str); 4] = [
    (" ", "%20"),
    ("&", "%26"),
    ("&#x2013;", ""),
    ("_amp_", "_"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub name: String,
    pub link: String,
}

/// Parses the ancestors recorded in a breadcrumb line. The first crumb is the
/// space root and is dropped; a line without a separator has no ancestors.
pub fn parse_trail(path: &Path, line: &str) -> Result<Vec<Crumb>> {
    line.trim()
        .split(TRAIL_SEPARATOR)
        .skip(1)
        .map(|segment| parse_crumb(path, segment))
        .collect()
}

fn parse_crumb(path: &Path, segment: &str) -> Result<Crumb> {
    let segment = segment.trim();
    let Some((name, link)) = segment.split_once(PAIR_SEPARATOR) else {
        return Err(MigrateError::MalformedBreadcrumb {
            path: path.to_path_buf(),
            reason: format!("segment `{segment}` is not a `[name](link)` pair"),
        });
    };
    Ok(Crumb {
        name: name.strip_prefix('[').unwrap_or(name).to_string(),
        link: link.strip_suffix(')').unwrap_or(link).to_string(),
    })
}

/// Turns a breadcrumb display name into a directory name.
#[must_use]
pub fn sanitize_segment(name: &str) -> String {
    let clean = DISALLOWED_CHARS.replace_all(name, "");
    let clean = WHITESPACE.replace_all(&clean, "_");
    let clean = UNDERSCORE_RUN.replace_all(&clean, "_");
    let mut clean = DOT_RUN.replace_all(&clean, ".").into_owned();
    for (from, to) in SEGMENT_REPLACEMENTS {
        clean = clean.replace(from, to);
    }
    clean
}

/// Whether `file_name` is the landing page of the whole space.
#[must_use]
pub fn is_index_document(file_name: &str, root_name: &str) -> bool {
    file_name == INDEX_FILE_NAME || file_name == home_page_name(root_name)
}

#[must_use]
pub fn home_page_name(directory_name: &str) -> String {
    format!("{directory_name}.{HOME_PAGE_EXTENSION}")
}

/// Canonical path (forward slashes, relative to the output root) for a page.
///
/// `first_line` is only consulted for pages that are not the space index; it
/// is taken lazily so that index pages never need to be read.
pub fn build_path<F>(path: &Path, root_name: &str, first_line: F) -> Result<String>
where
    F: FnOnce() -> Result<String>,
{
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| MigrateError::Validation(format!("invalid file name: {}", path.display())))?;

    if is_index_document(file_name, root_name) {
        return Ok(home_page_name(root_name));
    }

    let line = first_line()?;
    let trail = parse_trail(path, &line)?;
    let mut segments = Vec::with_capacity(trail.len() + 2);
    segments.push(root_name.to_string());
    segments.extend(
        trail
            .iter()
            .map(|crumb| sanitize_segment(&crumb.name))
            .filter(|segment| !segment.is_empty()),
    );
    segments.push(file_name.to_string());
    Ok(segments.join("/"))
}

/// [`build_path`] reading the breadcrumb from disk.
pub fn build_path_for_file(path: &Path, root_name: &str) -> Result<String> {
    build_path(path, root_name, || read_first_line(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &'static str) -> impl FnOnce() -> Result<String> {
        move || Ok(text.to_string())
    }

    #[test]
    fn builds_path_from_breadcrumb_ancestors() {
        let path = build_path(
            Path::new("/export/Onboarding_13.md"),
            "DevOps",
            line("[Root](link1) > [Team A](link2) > [Onboarding](link3)"),
        )
        .expect("path");
        assert_eq!(path, "DevOps/Team_A/Onboarding/Onboarding_13.md");
    }

    #[test]
    fn line_without_separator_places_page_at_root() {
        let path = build_path(Path::new("/export/Orphan.md"), "DevOps", line("# Orphan"))
            .expect("path");
        assert_eq!(path, "DevOps/Orphan.md");
    }

    #[test]
    fn index_documents_skip_breadcrumb_parsing() {
        for name in ["/export/index.md", "/export/DevOps.md"] {
            let path = build_path(Path::new(name), "DevOps", || {
                panic!("index documents must not be read")
            })
            .expect("path");
            assert_eq!(path, "DevOps.md");
        }
    }

    #[test]
    fn malformed_segment_is_reported_for_that_document() {
        let err = build_path(
            Path::new("/export/Broken.md"),
            "DevOps",
            line("[Root](link1) > Team A without link"),
        )
        .expect_err("must fail");
        assert_eq!(err.code(), "MALFORMED_BREADCRUMB");
        assert!(err.to_string().contains("Broken.md"));
    }

    #[test]
    fn building_is_deterministic() {
        let text = "[Root](a) > [Ops & Infra](b) > [v1.. Rollout  Plan](c)";
        let first = build_path(Path::new("/x/P.md"), "R", line(text)).expect("first");
        let second = build_path(Path::new("/x/P.md"), "R", line(text)).expect("second");
        assert_eq!(first, second);
        assert_eq!(first, "R/Ops_Infra/v1._Rollout_Plan/P.md");
    }

    #[test]
    fn crumbs_that_sanitize_to_nothing_are_dropped() {
        let path = build_path(
            Path::new("/x/P.md"),
            "R",
            line("[Root](a) > [???](b) > [Team A](c) > [&](d)"),
        )
        .expect("path");
        assert_eq!(path, "R/Team_A/P.md");
    }

    #[test]
    fn sanitize_segment_applies_replacement_table() {
        assert_eq!(sanitize_segment("Team A"), "Team_A");
        assert_eq!(sanitize_segment("Q&amp;A"), "QampA");
        assert_eq!(sanitize_segment("Q &amp; A"), "Q_A");
        assert_eq!(sanitize_segment("a__b...c"), "a_b.c");
        assert_eq!(sanitize_segment("Setup (old)"), "Setup_old");
    }

    #[test]
    fn parse_trail_keeps_links() {
        let trail = parse_trail(Path::new("p.md"), "[Root](r.md) > [Team A](team-a.md)")
            .expect("trail");
        assert_eq!(
            trail,
            vec![Crumb {
                name: "Team A".to_string(),
                link: "team-a.md".to_string(),
            }]
        );
    }
}
