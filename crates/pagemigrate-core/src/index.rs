use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::normalize::normalize;

/// One discovered document: its title (legacy corpus) or file name (target
/// corpus), and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusEntry {
    pub name: String,
    pub path: PathBuf,
}

impl CorpusEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Two entries that normalized to the same key. The later one was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCollision {
    pub key: String,
    pub replaced: CorpusEntry,
    pub kept: CorpusEntry,
}

#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    entries: BTreeMap<String, CorpusEntry>,
    collisions: Vec<KeyCollision>,
}

impl TitleIndex {
    /// Builds the index in discovery order; the last entry for a key wins.
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CorpusEntry>,
    {
        let mut index = Self::default();
        for entry in entries {
            let key = normalize(&entry.name);
            if let Some(replaced) = index.entries.insert(key.clone(), entry.clone()) {
                warn!(
                    key = %key,
                    replaced = %replaced.path.display(),
                    kept = %entry.path.display(),
                    "normalized key collision; keeping the later entry"
                );
                index.collisions.push(KeyCollision {
                    key,
                    replaced,
                    kept: entry,
                });
            }
        }
        index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CorpusEntry> {
        self.entries.get(key)
    }

    /// Normalized keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CorpusEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    #[must_use]
    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_normalized() {
        let index = TitleIndex::build([
            CorpusEntry::new("Space: Getting Started", "/legacy/1.html"),
            CorpusEntry::new("Release Notes", "/legacy/2.html"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("gettingstarted").map(|e| e.path.clone()),
            Some(PathBuf::from("/legacy/1.html"))
        );
        assert_eq!(
            index.keys().collect::<Vec<_>>(),
            vec!["gettingstarted", "releasenotes"]
        );
    }

    #[test]
    fn later_entry_wins_and_collision_is_reported() {
        let index = TitleIndex::build([
            CorpusEntry::new("Getting_Started.md", "/md/a/Getting_Started.md"),
            CorpusEntry::new("Getting-Started.md", "/md/b/Getting-Started.md"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get("gettingstarted").map(|e| e.path.clone()),
            Some(PathBuf::from("/md/b/Getting-Started.md"))
        );
        let collisions = index.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].replaced.path, PathBuf::from("/md/a/Getting_Started.md"));
    }

    #[test]
    fn empty_index() {
        let index = TitleIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.collisions().is_empty());
    }
}
