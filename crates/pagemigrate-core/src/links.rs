use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::reconcile::PathAssignmentMap;
use crate::similarity::{LinkCandidate, SimilarityMetric, resolve_link_target};
use crate::text::truncate_text;

pub const ATTACHMENTS_DIR: &str = ".attach";
pub const IMAGES_DIR: &str = ".images";
const LEGACY_ATTACHMENTS_MARKER: &str = "attachments";
const LEGACY_IMAGES_MARKER: &str = "images";

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[([^\]]+)\]\(([^)]+)\)").expect("valid markdown link pattern")
});
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img[^>]*src="([^"]+)"[^>]*>"#).expect("valid img tag pattern")
});
static HOME_ICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*home[^\]]*\.png\]\([^)]*images/[^)]*home[^)]*\.png\)")
        .expect("valid home icon pattern")
});

const LINK_REPLACEMENTS: [(&str, &str); 3] = [("&#x2013;", ""), (" ", "%20"), ("&", "%26")];

/// Absolute link target for a canonical path.
#[must_use]
pub fn encode_link_target(canonical: &str) -> String {
    let mut encoded = format!("/{canonical}");
    for (from, to) in LINK_REPLACEMENTS {
        encoded = encoded.replace(from, to);
    }
    encoded
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub links_rewritten: usize,
    pub links_unresolved: usize,
    pub assets_relocated: usize,
    pub home_icons_removed: usize,
}

impl RewriteStats {
    pub fn absorb(&mut self, other: &Self) {
        self.links_rewritten += other.links_rewritten;
        self.links_unresolved += other.links_unresolved;
        self.assets_relocated += other.assets_relocated;
        self.home_icons_removed += other.home_icons_removed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub content: String,
    pub stats: RewriteStats,
}

impl RewriteOutcome {
    #[must_use]
    pub fn changed_from(&self, original: &str) -> bool {
        self.content != original
    }
}

/// Rewrites references inside one page so they point into the rebuilt tree.
///
/// Built once from the final path assignments; rewriting a page has no effect
/// on any other page.
#[derive(Debug, Clone)]
pub struct LinkRewriter<'a> {
    candidates: Vec<LinkCandidate<'a>>,
    canonical_targets: HashSet<String>,
    root_name: &'a str,
    metric: SimilarityMetric,
    strip_home_icons: bool,
}

impl<'a> LinkRewriter<'a> {
    #[must_use]
    pub fn new(assignments: &'a PathAssignmentMap, root_name: &'a str) -> Self {
        let canonical_targets = assignments
            .iter()
            .map(|(_, canonical)| encode_link_target(canonical))
            .collect();
        Self {
            candidates: assignments.link_candidates(),
            canonical_targets,
            root_name,
            metric: SimilarityMetric::default(),
            strip_home_icons: false,
        }
    }

    #[must_use]
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_home_icon_stripping(mut self, enabled: bool) -> Self {
        self.strip_home_icons = enabled;
        self
    }

    #[must_use]
    pub fn rewrite(&self, content: &str) -> RewriteOutcome {
        let mut stats = RewriteStats::default();

        let content = IMG_TAG.replace_all(content, |caps: &Captures<'_>| {
            match relocate_asset(&caps[1], self.root_name) {
                Some(image) => {
                    stats.assets_relocated += 1;
                    format!("\n\n{image}\n")
                }
                None => caps[0].to_string(),
            }
        });

        let content = MARKDOWN_LINK.replace_all(&content, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let (text, target) = (&caps[2], &caps[3]);
            if !caps[1].is_empty()
                || is_external(target)
                || self.canonical_targets.contains(target)
            {
                return whole.to_string();
            }
            match resolve_link_target(target, text, &self.candidates, self.metric) {
                Some(resolved) => {
                    debug!(
                        target = %truncate_text(target, 80),
                        resolved = %resolved.target,
                        score = resolved.score,
                        via_text = resolved.via_text,
                        "rewrote link"
                    );
                    stats.links_rewritten += 1;
                    format!("[{text}]({})", encode_link_target(resolved.target))
                }
                None => {
                    stats.links_unresolved += 1;
                    whole.to_string()
                }
            }
        });

        let content = if self.strip_home_icons {
            HOME_ICON
                .replace_all(&content, |_: &Captures<'_>| {
                    stats.home_icons_removed += 1;
                    "\n"
                })
                .into_owned()
        } else {
            content.into_owned()
        };

        RewriteOutcome { content, stats }
    }
}

fn is_external(target: &str) -> bool {
    target.contains("://") || target.starts_with("mailto:") || target.starts_with('#')
}

/// Markdown image for an exported `<img>` source that lives in the legacy
/// attachments or images folder, relative or root-relative.
fn relocate_asset(src: &str, root_name: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let segments = path.split('/').collect::<Vec<_>>();
    let (marker_at, folder) = segments.iter().enumerate().find_map(|(idx, segment)| {
        match *segment {
            LEGACY_ATTACHMENTS_MARKER => Some((idx, ATTACHMENTS_DIR)),
            LEGACY_IMAGES_MARKER => Some((idx, IMAGES_DIR)),
            _ => None,
        }
    })?;

    let rest = segments[marker_at + 1..].join("/");
    let file_name = segments.last().copied().unwrap_or_default();
    Some(format!("![{file_name}](/{root_name}/{folder}/{rest})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments() -> PathAssignmentMap {
        let mut map = PathAssignmentMap::new();
        map.insert("/src/Onboarding_13.md", "R/Team_A/Onboarding/Onboarding_13.md");
        map.insert("/src/Release_Notes_99.md", "R/Release_Notes_99.md");
        map.insert("/src/Team-A_12.md", "R/Team_A.md");
        map
    }

    #[test]
    fn rewrites_link_to_canonical_path() {
        let map = assignments();
        let rewriter = LinkRewriter::new(&map, "R");
        let outcome = rewriter.rewrite("See [the notes](Release_Notes_99.md) for details.");
        assert_eq!(
            outcome.content,
            "See [the notes](/R/Release_Notes_99.md) for details."
        );
        assert_eq!(outcome.stats.links_rewritten, 1);
    }

    #[test]
    fn link_already_canonical_is_left_alone() {
        let map = assignments();
        let rewriter = LinkRewriter::new(&map, "R");
        let input = "[Onboarding](/R/Team_A/Onboarding/Onboarding_13.md)\n";
        let outcome = rewriter.rewrite(input);
        assert_eq!(outcome.content, input);
        assert!(!outcome.changed_from(input));
    }

    #[test]
    fn link_without_candidate_is_untouched() {
        let map = PathAssignmentMap::new();
        let rewriter = LinkRewriter::new(&map, "R");
        let input = "before [x](zzz) after";
        let outcome = rewriter.rewrite(input);
        assert_eq!(outcome.content, input);
        assert_eq!(outcome.stats.links_unresolved, 1);
    }

    #[test]
    fn external_links_and_markdown_images_are_skipped() {
        let map = assignments();
        let rewriter = LinkRewriter::new(&map, "R");
        let input = "[site](https://example.com) [top](#intro) ![logo](logo.png)";
        assert_eq!(rewriter.rewrite(input).content, input);
    }

    #[test]
    fn rewrites_only_the_target_substring() {
        let map = assignments();
        let rewriter = LinkRewriter::new(&map, "R");
        let input = "Release_Notes_99.md is [here](Release_Notes_99.md).";
        let outcome = rewriter.rewrite(input);
        assert_eq!(
            outcome.content,
            "Release_Notes_99.md is [here](/R/Release_Notes_99.md)."
        );
    }

    #[test]
    fn attachment_tags_become_markdown_images() {
        let map = PathAssignmentMap::new();
        let rewriter = LinkRewriter::new(&map, "R");
        let outcome = rewriter.rewrite(
            r#"Diagram: <img class="confluence-embedded-image" src="attachments/123/diagram.png?version=1" height="250">"#,
        );
        assert_eq!(
            outcome.content,
            "Diagram: \n\n![diagram.png](/R/.attach/123/diagram.png)\n"
        );
        assert_eq!(outcome.stats.assets_relocated, 1);
    }

    #[test]
    fn root_relative_and_image_folder_variants_are_relocated() {
        let map = PathAssignmentMap::new();
        let rewriter = LinkRewriter::new(&map, "R");
        let outcome = rewriter.rewrite(
            r#"<img src="/attachments/9/a.png"><img src="images/icons/bullet.gif" alt="">"#,
        );
        assert_eq!(
            outcome.content,
            "\n\n![a.png](/R/.attach/9/a.png)\n\n\n![bullet.gif](/R/.images/icons/bullet.gif)\n"
        );
    }

    #[test]
    fn tags_without_legacy_folder_are_kept() {
        let map = PathAssignmentMap::new();
        let rewriter = LinkRewriter::new(&map, "R");
        let input = r#"<img src="https://cdn.example.com/x.png">"#;
        assert_eq!(rewriter.rewrite(input).content, input);
    }

    #[test]
    fn rewriting_twice_is_stable() {
        let map = assignments();
        let rewriter = LinkRewriter::new(&map, "R");
        let first = rewriter.rewrite(
            r#"[notes](Release_Notes_99.md) <img src="attachments/1/a.png">"#,
        );
        let second = rewriter.rewrite(&first.content);
        assert_eq!(first.content, second.content);
    }

    #[test]
    fn home_icons_are_stripped_when_enabled() {
        let map = PathAssignmentMap::new();
        let rewriter = LinkRewriter::new(&map, "R").with_home_icon_stripping(true);
        let outcome =
            rewriter.rewrite(r#"<img src="images/icons/contenttypes/home_page_16.png">Text"#);
        assert_eq!(outcome.content, "\n\n\n\nText");
        assert_eq!(outcome.stats.home_icons_removed, 1);
    }

    #[test]
    fn encode_link_target_escapes_spaces_and_ampersands() {
        assert_eq!(encode_link_target("R/Q & A.md"), "/R/Q%20%26%20A.md");
        assert_eq!(encode_link_target("R/a&#x2013;b.md"), "/R/ab.md");
    }
}
