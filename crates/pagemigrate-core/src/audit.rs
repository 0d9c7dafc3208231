//! Side artifacts written for a human reviewing a migration. Nothing in the
//! pipelines reads them back.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, SkippedItem};
use crate::fs::{resolve_canonical, write_atomic};
use crate::home_pages::HomePageRename;
use crate::reconcile::{MatchedPair, PathAssignmentMap};

const DELIMITER: char = ';';

/// `legacy_key;target_key` rows, one per matched legacy page.
#[must_use]
pub fn render_correspondence_csv(pairs: &[MatchedPair]) -> String {
    let mut out = String::new();
    for pair in pairs {
        out.push_str(&csv_field(&pair.legacy_key));
        out.push(DELIMITER);
        out.push_str(&csv_field(&pair.target_key));
        out.push_str("\r\n");
    }
    out
}

pub fn write_correspondence_csv(path: &Path, pairs: &[MatchedPair]) -> Result<()> {
    write_atomic(path, &render_correspondence_csv(pairs))
}

fn csv_field(raw: &str) -> String {
    if raw.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestDocument {
    pub source: String,
    pub canonical: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Record of one reorganizer run. Content hashes let a reviewer tell which
/// output pages a later run would see as already migrated.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationManifest {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub root_name: String,
    pub documents: Vec<ManifestDocument>,
    pub home_page_renames: Vec<HomePageRename>,
    pub home_page_stubs: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

impl MigrationManifest {
    #[must_use]
    pub fn collect(
        output_root: &Path,
        root_name: &str,
        assignments: &PathAssignmentMap,
        home_page_renames: Vec<HomePageRename>,
        home_page_stubs: Vec<String>,
        skipped: Vec<SkippedItem>,
    ) -> Self {
        let documents = assignments
            .iter()
            .map(|(source, canonical)| ManifestDocument {
                source: source.display().to_string(),
                canonical: canonical.to_string(),
                content_hash: content_hash(&resolve_canonical(output_root, canonical)),
            })
            .collect();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            root_name: root_name.to_string(),
            documents,
            home_page_renames,
            home_page_stubs,
            skipped,
        }
    }

    /// Canonical path to content hash, for pages that exist on disk.
    #[must_use]
    pub fn hashes(&self) -> BTreeMap<&str, &str> {
        self.documents
            .iter()
            .filter_map(|doc| Some((doc.canonical.as_str(), doc.content_hash.as_deref()?)))
            .collect()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_string_pretty(self)?)
    }
}

fn content_hash(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    Some(blake3::hash(&bytes).to_hex().to_string())
}
