use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

pub const DEFAULT_TITLE_CUTOFF: f64 = 0.8;
pub const DEFAULT_HOME_PAGE_CUTOFF: f64 = 0.8;

/// String similarity in `[0, 1]`; identical inputs score `1.0`.
///
/// `score(query, candidate)` is called with the query first. Only
/// `SequenceRatio` is sensitive to that order, and only when several equally
/// long common blocks exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    /// `2 * M / T` over recursively found longest common blocks.
    #[default]
    SequenceRatio,
    Levenshtein,
    Damerau,
    SorensenDice,
    JaroWinkler,
}

impl SimilarityMetric {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SequenceRatio => "sequence-ratio",
            Self::Levenshtein => "levenshtein",
            Self::Damerau => "damerau",
            Self::SorensenDice => "sorensen-dice",
            Self::JaroWinkler => "jaro-winkler",
        }
    }

    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::SequenceRatio => sequence_ratio(b, a),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
            Self::Damerau => strsim::normalized_damerau_levenshtein(a, b),
            Self::SorensenDice => {
                // sorensen_dice scores single-character inputs as 0.0 even when equal
                if a == b {
                    1.0
                } else {
                    strsim::sorensen_dice(a, b)
                }
            }
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = MigrateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sequence-ratio" | "ratio" => Ok(Self::SequenceRatio),
            "levenshtein" => Ok(Self::Levenshtein),
            "damerau" | "damerau-levenshtein" => Ok(Self::Damerau),
            "sorensen-dice" | "dice" => Ok(Self::SorensenDice),
            "jaro-winkler" => Ok(Self::JaroWinkler),
            other => Err(MigrateError::Validation(format!(
                "unknown similarity metric: {other} \
                 (expected sequence-ratio|levenshtein|damerau|sorensen-dice|jaro-winkler)"
            ))),
        }
    }
}

/// Ratcliff/Obershelp ratio: twice the number of characters in matching
/// blocks divided by the total length of both inputs.
///
/// Blocks are found by taking the longest common substring (earliest in `a`,
/// then earliest in `b`) and recursing on both sides of it. No characters are
/// treated as junk.
fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut matched = 0usize;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_common_block(&a, &b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    #[allow(clippy::cast_precision_loss, reason = "page names are far below 2^52 chars")]
    let ratio = 2.0 * matched as f64 / total as f64;
    ratio
}

fn longest_common_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);
    // run lengths ending at each position of b, for the previous row of a
    let mut previous = vec![0usize; bhi - blo + 1];
    let mut current = vec![0usize; bhi - blo + 1];
    for (i, &left) in a.iter().enumerate().take(ahi).skip(alo) {
        for (j, &right) in b.iter().enumerate().take(bhi).skip(blo) {
            let slot = j - blo + 1;
            current[slot] = if left == right { previous[slot - 1] + 1 } else { 0 };
            let size = current[slot];
            if size > best_size {
                best_i = i + 1 - size;
                best_j = j + 1 - size;
                best_size = size;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    (best_i, best_j, best_size)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored<'a> {
    pub candidate: &'a str,
    pub score: f64,
}

/// Returns the best-scoring candidate at or above `cutoff`.
///
/// Candidates are scored in lexicographic order so that ties resolve the same
/// way on every run regardless of how the caller collected them.
#[must_use]
pub fn best_match<'a, I>(
    query: &str,
    candidates: I,
    cutoff: f64,
    metric: SimilarityMetric,
) -> Option<Scored<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ordered = candidates.into_iter().collect::<Vec<_>>();
    ordered.sort_unstable();
    ordered.dedup();

    let mut best: Option<Scored<'a>> = None;
    for candidate in ordered {
        let score = metric.score(query, candidate);
        if score < cutoff {
            continue;
        }
        if best.is_none_or(|current| score > current.score) {
            best = Some(Scored { candidate, score });
        }
    }
    best
}

/// A document a link may point at: the file name the legacy link refers to and
/// the location it now lives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate<'a> {
    pub file_name: &'a str,
    pub target: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkResolution<'a> {
    pub target: &'a str,
    pub score: f64,
    pub via_text: bool,
}

/// Picks the location a link most likely refers to.
///
/// Both the raw link target and the link's display text are scored against
/// every candidate file name; the stronger of the two wins, ties go to the
/// link target. There is no cutoff: any positive score is accepted.
#[must_use]
pub fn resolve_link_target<'a>(
    token: &str,
    text: &str,
    candidates: &[LinkCandidate<'a>],
    metric: SimilarityMetric,
) -> Option<LinkResolution<'a>> {
    let mut by_token: Option<(&'a str, f64)> = None;
    let mut by_text: Option<(&'a str, f64)> = None;

    for candidate in candidates {
        let token_score = metric.score(token, candidate.file_name);
        if token_score > by_token.map_or(0.0, |(_, score)| score) {
            by_token = Some((candidate.target, token_score));
        }
        let text_score = metric.score(text, candidate.file_name);
        if text_score > by_text.map_or(0.0, |(_, score)| score) {
            by_text = Some((candidate.target, text_score));
        }
    }

    match (by_token, by_text) {
        (Some((target, token_score)), Some((_, text_score))) if token_score >= text_score => {
            Some(LinkResolution {
                target,
                score: token_score,
                via_text: false,
            })
        }
        (_, Some((target, score))) => Some(LinkResolution {
            target,
            score,
            via_text: true,
        }),
        (Some((target, score)), None) => Some(LinkResolution {
            target,
            score,
            via_text: false,
        }),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_key_scores_one() {
        let candidates = ["gettingstarted", "releasenotes"];
        let found = best_match(
            "gettingstarted",
            candidates,
            DEFAULT_TITLE_CUTOFF,
            SimilarityMetric::Levenshtein,
        )
        .expect("match");
        assert_eq!(found.candidate, "gettingstarted");
        assert!((found.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sequence_ratio_tolerates_page_id_suffix() {
        let score = SimilarityMetric::SequenceRatio.score("gettingstarted", "gettingstarted123456");
        assert!((score - 28.0 / 34.0).abs() < 1e-9, "score {score}");
        let found = best_match(
            "gettingstarted",
            ["gettingstarted123456", "releasenotes"],
            DEFAULT_TITLE_CUTOFF,
            SimilarityMetric::default(),
        )
        .expect("match");
        assert_eq!(found.candidate, "gettingstarted123456");
    }

    #[test]
    fn sequence_ratio_counts_blocks_on_both_sides() {
        // "abxcd" vs "abcd": blocks "ab" and "cd"
        let score = SimilarityMetric::SequenceRatio.score("abcd", "abxcd");
        assert!((score - 8.0 / 9.0).abs() < 1e-9, "score {score}");
        assert!((SimilarityMetric::SequenceRatio.score("", "") - 1.0).abs() < f64::EPSILON);
        assert!(SimilarityMetric::SequenceRatio.score("abc", "").abs() < f64::EPSILON);
        assert!(SimilarityMetric::SequenceRatio.score("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn never_returns_candidate_below_cutoff() {
        for metric in [
            SimilarityMetric::SequenceRatio,
            SimilarityMetric::Levenshtein,
            SimilarityMetric::Damerau,
            SimilarityMetric::SorensenDice,
            SimilarityMetric::JaroWinkler,
        ] {
            let found = best_match("onboarding", ["onboardingx", "zzz", "onboard"], 0.8, metric);
            if let Some(found) = found {
                assert!(found.score >= 0.8, "{metric} returned {}", found.score);
            }
        }
    }

    #[test]
    fn returns_none_for_empty_or_weak_candidates() {
        assert!(
            best_match("abc", std::iter::empty(), 0.0, SimilarityMetric::Levenshtein).is_none()
        );
        assert!(best_match("abc", ["xyz"], 0.8, SimilarityMetric::Levenshtein).is_none());
    }

    #[test]
    fn ties_resolve_lexicographically_regardless_of_input_order() {
        let forward = best_match("abcd", ["abcx", "abcy"], 0.5, SimilarityMetric::Levenshtein);
        let backward = best_match("abcd", ["abcy", "abcx"], 0.5, SimilarityMetric::Levenshtein);
        assert_eq!(forward.map(|m| m.candidate), Some("abcx"));
        assert_eq!(backward.map(|m| m.candidate), Some("abcx"));
    }

    #[test]
    fn metric_parses_from_config_strings() {
        assert_eq!(
            "Jaro-Winkler".parse::<SimilarityMetric>().expect("parse"),
            SimilarityMetric::JaroWinkler
        );
        assert_eq!(
            "sequence-ratio".parse::<SimilarityMetric>().expect("parse"),
            SimilarityMetric::SequenceRatio
        );
        assert!("cosine".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn link_resolution_prefers_token_on_tie() {
        let candidates = [
            LinkCandidate {
                file_name: "Onboarding.md",
                target: "root/Team_A/Onboarding.md",
            },
            LinkCandidate {
                file_name: "Release.md",
                target: "root/Release.md",
            },
        ];
        let resolved = resolve_link_target(
            "Onboarding.md",
            "Onboarding.md",
            &candidates,
            SimilarityMetric::Levenshtein,
        )
        .expect("resolved");
        assert_eq!(resolved.target, "root/Team_A/Onboarding.md");
        assert!(!resolved.via_text);
    }

    #[test]
    fn link_resolution_falls_back_to_display_text() {
        let candidates = [
            LinkCandidate {
                file_name: "Onboarding_1234.md",
                target: "root/Onboarding_1234.md",
            },
            LinkCandidate {
                file_name: "Release_Notes_99.md",
                target: "root/Release_Notes_99.md",
            },
        ];
        let resolved = resolve_link_target(
            "viewpage.action?pageId=99",
            "Release_Notes_99.md",
            &candidates,
            SimilarityMetric::Levenshtein,
        )
        .expect("resolved");
        assert_eq!(resolved.target, "root/Release_Notes_99.md");
        assert!(resolved.via_text);
    }

    #[test]
    fn link_resolution_without_candidates_is_none() {
        assert!(resolve_link_target("a", "b", &[], SimilarityMetric::Levenshtein).is_none());
    }
}
