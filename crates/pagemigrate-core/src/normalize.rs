const DOCUMENT_EXTENSIONS: &[&str] = &[".markdown", ".md", ".html", ".htm"];

/// Maps a page title or file name onto the key used to compare the two corpora.
///
/// `"Space: Getting Started"` and `"Getting_Started.md"` both become
/// `"gettingstarted"`.
#[must_use]
pub fn normalize(name: &str) -> String {
    let tail = name.rsplit(':').next().unwrap_or(name);
    let mut key = tail
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect::<String>();

    while let Some(ext) = DOCUMENT_EXTENSIONS.iter().find(|ext| key.ends_with(*ext)) {
        key.truncate(key.len() - ext.len());
    }
    key
}
