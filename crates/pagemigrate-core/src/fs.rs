use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{MigrateError, Result, SkippedItem};
use crate::links::{ATTACHMENTS_DIR, IMAGES_DIR};
use crate::reconcile::PathAssignmentMap;

const LEGACY_ATTACHMENTS_DIR: &str = "attachments";
const LEGACY_IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub copied: usize,
    pub skipped: Vec<SkippedItem>,
}

/// Resolves a `/`-separated canonical path under `output_root`.
#[must_use]
pub fn resolve_canonical(output_root: &Path, canonical: &str) -> PathBuf {
    let mut out = output_root.to_path_buf();
    for segment in canonical.split('/').filter(|s| !s.is_empty()) {
        out.push(segment);
    }
    out
}

/// Inverse of [`resolve_canonical`].
#[must_use]
pub fn canonical_from_path(output_root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(output_root).ok()?;
    Some(relative_to_unix_path(relative))
}

pub(crate) fn relative_to_unix_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(value) => Some(value.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Copies every assigned source into its canonical location. Failures on one
/// file are reported and do not stop the copy.
pub fn copy_assigned(assignments: &PathAssignmentMap, output_root: &Path) -> CopyReport {
    let mut report = CopyReport::default();
    for (source, canonical) in assignments.iter() {
        let target = resolve_canonical(output_root, canonical);
        match copy_file(source, &target) {
            Ok(()) => report.copied += 1,
            Err(err) => {
                warn!(source = %source.display(), code = err.code(), "copy skipped: {err}");
                report.skipped.push(err.to_skipped(source));
            }
        }
    }
    info!(
        copied = report.copied,
        skipped = report.skipped.len(),
        "copied pages into rebuilt tree"
    );
    report
}

pub fn copy_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|err| MigrateError::from_io(parent, err))?;
    }
    fs::copy(source, target).map_err(|err| MigrateError::from_io(source, err))?;
    Ok(())
}

/// Replaces `path` with `content` through a temp file in the same directory.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        MigrateError::Validation(format!("target has no parent: {}", path.display()))
    })?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|x| x.to_str())
        .ok_or_else(|| {
            MigrateError::Validation(format!("invalid target filename: {}", path.display()))
        })?;
    let tmp_path = parent.join(format!(
        ".{file_name}.pagemigrate.tmp.{}",
        uuid::Uuid::new_v4().simple()
    ));

    {
        let mut tmp = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()?;
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(MigrateError::from_io(path, err));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetRelocation {
    pub relocated: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

/// Copies the export's `attachments/` and `images/` folders into the hidden
/// asset folders of the rebuilt tree. Existing destinations are left alone.
/// Entries that cannot be read or written are reported and skipped.
pub fn relocate_asset_folders(
    source_folder: &Path,
    output_root: &Path,
    root_name: &str,
) -> AssetRelocation {
    let mut report = AssetRelocation::default();
    for (legacy, hidden) in [
        (LEGACY_ATTACHMENTS_DIR, ATTACHMENTS_DIR),
        (LEGACY_IMAGES_DIR, IMAGES_DIR),
    ] {
        let from = source_folder.join(legacy);
        let to = output_root.join(root_name).join(hidden);
        if !from.is_dir() || to.exists() {
            continue;
        }
        if copy_dir_contents(&from, &to, &mut report.skipped) {
            report.relocated.push(format!("{root_name}/{hidden}"));
        }
    }
    report
}

/// Returns whether `dst` could be created at all.
fn copy_dir_contents(src: &Path, dst: &Path, skipped: &mut Vec<SkippedItem>) -> bool {
    if let Err(err) = fs::create_dir_all(dst) {
        skip_asset(skipped, dst, MigrateError::from_io(dst, err));
        return false;
    }

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(src).to_path_buf();
                skip_asset(skipped, &path, MigrateError::from_io(&path, err.into()));
                continue;
            }
        };
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(src) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }

        let out = dst.join(rel);
        let result = if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(|err| MigrateError::from_io(&out, err))
        } else {
            copy_file(path, &out)
        };
        if let Err(err) = result {
            skip_asset(skipped, path, err);
        }
    }
    true
}

fn skip_asset(skipped: &mut Vec<SkippedItem>, path: &Path, err: MigrateError) {
    warn!(path = %path.display(), code = err.code(), "asset copy skipped: {err}");
    skipped.push(err.to_skipped(path));
}

/// Deepest directory containing every path in `paths`.
#[must_use]
pub fn common_ancestor<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut prefix = first.parent().map(|p| p.components().collect::<Vec<_>>())?;
    for path in iter {
        let components = path.parent().map(|p| p.components().collect::<Vec<_>>())?;
        let shared = prefix
            .iter()
            .zip(components.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(shared);
    }
    Some(prefix.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn canonical_paths_round_trip_through_output_root() {
        let root = Path::new("/out");
        let path = resolve_canonical(root, "R/Team_A/Page.md");
        assert_eq!(path, PathBuf::from("/out/R/Team_A/Page.md"));
        assert_eq!(
            canonical_from_path(root, &path).as_deref(),
            Some("R/Team_A/Page.md")
        );
    }

    #[test]
    fn copy_assigned_creates_parents_and_reports_missing_sources() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        fs::create_dir_all(&source).expect("mkdir");
        fs::write(source.join("a.md"), "# A").expect("write");

        let mut map = PathAssignmentMap::new();
        map.insert(source.join("a.md"), "R/Team/a.md");
        map.insert(source.join("missing.md"), "R/missing.md");

        let output = temp.path().join("out");
        let report = copy_assigned(&map, &output);
        assert_eq!(report.copied, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(
            fs::read_to_string(output.join("R/Team/a.md")).expect("read"),
            "# A"
        );
    }

    #[test]
    fn write_atomic_replaces_content() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested/page.md");
        write_atomic(&path, "one").expect("first");
        write_atomic(&path, "two").expect("second");
        assert_eq!(fs::read_to_string(&path).expect("read"), "two");
        let leftovers = fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn relocate_asset_folders_copies_once() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("export");
        fs::create_dir_all(source.join("attachments/12")).expect("mkdir");
        fs::write(source.join("attachments/12/a.png"), b"png").expect("write");
        let output = temp.path().join("out");

        let first = relocate_asset_folders(&source, &output, "R");
        assert_eq!(first.relocated, vec!["R/.attach".to_string()]);
        assert!(first.skipped.is_empty());
        assert!(output.join("R/.attach/12/a.png").is_file());

        let again = relocate_asset_folders(&source, &output, "R");
        assert!(again.relocated.is_empty());
    }

    #[test]
    fn unwritable_asset_destination_is_skipped_not_fatal() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("export");
        fs::create_dir_all(source.join("attachments/12")).expect("mkdir");
        fs::create_dir_all(source.join("images")).expect("mkdir");
        fs::write(source.join("attachments/12/a.png"), b"png").expect("write");
        let output = temp.path().join("out");
        fs::create_dir_all(&output).expect("mkdir");
        // the tree root is a file, so no asset folder can be created under it
        fs::write(output.join("R"), b"not a directory").expect("write");

        let report = relocate_asset_folders(&source, &output, "R");
        assert!(report.relocated.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped[0].path.ends_with(".attach"));
        assert!(report.skipped[1].path.ends_with(".images"));
    }

    #[test]
    fn asset_entry_that_cannot_be_written_does_not_stop_the_rest() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("export");
        fs::create_dir_all(source.join("attachments/12")).expect("mkdir");
        fs::create_dir_all(source.join("attachments/13")).expect("mkdir");
        fs::write(source.join("attachments/12/a.png"), b"png").expect("write");
        fs::write(source.join("attachments/13/b.png"), b"png").expect("write");
        let output = temp.path().join("out");
        let hidden = output.join("R/.attach");
        fs::create_dir_all(&hidden).expect("mkdir");
        // a file where the 12/ directory has to go
        fs::write(hidden.join("12"), b"blocker").expect("write");

        let mut skipped = Vec::new();
        assert!(copy_dir_contents(&source.join("attachments"), &hidden, &mut skipped));

        assert_eq!(skipped.len(), 2);
        assert!(hidden.join("13/b.png").is_file());
    }

    #[test]
    fn common_ancestor_of_sibling_trees() {
        let paths = [
            PathBuf::from("/md/space/a/one.md"),
            PathBuf::from("/md/space/b/two.md"),
        ];
        assert_eq!(
            common_ancestor(paths.iter().map(PathBuf::as_path)),
            Some(PathBuf::from("/md/space"))
        );
        assert_eq!(common_ancestor(std::iter::empty::<&Path>()), None);
    }
}
