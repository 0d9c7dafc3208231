//! Carries the "created by ... on ..." line of exported legacy pages over to
//! the matching Markdown pages.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

static PAGE_METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div class="page-metadata">(.*?)</div>"#)
        .expect("valid page metadata pattern")
});
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<.*?>").expect("valid html tag pattern"));
static CREATED_BY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)###### created by.*?on.*?$\n?").expect("valid created-by pattern")
});

const CREATED_BY_MARKER: &str = "###### created by";

/// The metadata line for a legacy page, as a level-six heading preceded by a
/// newline, or `None` when the page carries no metadata block.
#[must_use]
pub fn extract_date_block(html: &str) -> Option<String> {
    let raw = PAGE_METADATA.captures(html)?.get(1)?.as_str();
    let text = HTML_TAG.replace_all(raw, "").replace('\n', "");
    let start = text.find(char::is_alphabetic)?;
    Some(format!("\n###### {}", &text[start..]))
}

/// Replaces an existing created-by heading with `block`, or appends it.
#[must_use]
pub fn inject_date_block(markdown: &str, block: &str) -> String {
    if markdown.contains(CREATED_BY_MARKER) {
        let line = format!("{}\n", block.trim_start_matches('\n'));
        CREATED_BY_LINE
            .replace_all(markdown, NoExpand(&line))
            .into_owned()
    } else {
        format!("{markdown}{block}")
    }
}
