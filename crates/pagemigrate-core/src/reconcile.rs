use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::breadcrumb::build_path_for_file;
use crate::error::SkippedItem;
use crate::index::TitleIndex;
use crate::similarity::{LinkCandidate, SimilarityMetric, best_match};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub cutoff: f64,
    pub metric: SimilarityMetric,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            cutoff: crate::similarity::DEFAULT_TITLE_CUTOFF,
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub legacy_key: String,
    pub target_key: String,
    pub legacy_path: PathBuf,
    pub target_path: PathBuf,
    pub score: f64,
}

/// Inferred pairing of legacy documents with target documents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Correspondence {
    pub pairs: Vec<MatchedPair>,
    pub unmatched: Vec<String>,
}

impl Correspondence {
    /// Legacy path to target path. Several legacy pages may share a target.
    #[must_use]
    pub fn paths(&self) -> BTreeMap<PathBuf, PathBuf> {
        self.pairs
            .iter()
            .map(|pair| (pair.legacy_path.clone(), pair.target_path.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Matches every legacy title against the target file names.
#[must_use]
pub fn correspond(
    legacy: &TitleIndex,
    target: &TitleIndex,
    options: MatchOptions,
) -> Correspondence {
    let mut out = Correspondence::default();
    for (legacy_key, legacy_entry) in legacy.iter() {
        let Some(found) = best_match(legacy_key, target.keys(), options.cutoff, options.metric)
        else {
            out.unmatched.push(legacy_key.to_string());
            continue;
        };
        let Some(target_entry) = target.get(found.candidate) else {
            continue;
        };
        debug!(
            legacy = %legacy_key,
            target = %found.candidate,
            score = found.score,
            "matched legacy page"
        );
        out.pairs.push(MatchedPair {
            legacy_key: legacy_key.to_string(),
            target_key: found.candidate.to_string(),
            legacy_path: legacy_entry.path.clone(),
            target_path: target_entry.path.clone(),
            score: found.score,
        });
    }
    info!(
        matched = out.pairs.len(),
        unmatched = out.unmatched.len(),
        "title correspondence complete"
    );
    out
}

/// Source document to canonical output path (relative, `/`-separated).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathAssignmentMap {
    entries: BTreeMap<PathBuf, String>,
}

impl PathAssignmentMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an assignment, returning the previous one for this source.
    pub fn insert(
        &mut self,
        source: impl Into<PathBuf>,
        canonical: impl Into<String>,
    ) -> Option<String> {
        self.entries.insert(source.into(), canonical.into())
    }

    #[must_use]
    pub fn get(&self, source: &Path) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries
            .iter()
            .map(|(source, canonical)| (source.as_path(), canonical.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points every entry assigned to `from` at `to`. Returns how many changed.
    pub fn apply_rename(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        for canonical in self.entries.values_mut() {
            if canonical == from {
                *canonical = to.to_string();
                changed += 1;
            }
        }
        changed
    }

    /// Candidates for link resolution: the original file name a legacy link
    /// would reference, paired with where that document now lives.
    #[must_use]
    pub fn link_candidates(&self) -> Vec<LinkCandidate<'_>> {
        self.entries
            .iter()
            .filter_map(|(source, canonical)| {
                let file_name = source.file_name()?.to_str()?;
                Some(LinkCandidate {
                    file_name,
                    target: canonical.as_str(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathAssignment {
    pub map: PathAssignmentMap,
    pub skipped: Vec<SkippedItem>,
}

/// Assigns a canonical path to every source page. Pages whose breadcrumb
/// cannot be read or parsed are skipped and reported.
pub fn assign_paths<I>(sources: I, root_name: &str) -> PathAssignment
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut out = PathAssignment::default();
    for source in sources {
        match build_path_for_file(&source, root_name) {
            Ok(canonical) => {
                if let Some(previous) = out.map.insert(source.clone(), canonical) {
                    debug!(source = %source.display(), %previous, "reassigned source path");
                }
            }
            Err(err) => {
                warn!(source = %source.display(), code = err.code(), "skipping page: {err}");
                out.skipped.push(err.to_skipped(&source));
            }
        }
    }
    info!(
        assigned = out.map.len(),
        skipped = out.skipped.len(),
        "path assignment complete"
    );
    out
}
