use std::path::Path;

use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Decodes exported page bytes, falling back to Latin-1 when they are not UTF-8.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        // every byte is a valid Latin-1 code point, so this cannot fail
        Err(_) => (
            bytes.iter().map(|b| char::from(*b)).collect(),
            TextEncoding::Latin1,
        ),
    }
}

pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|err| MigrateError::from_io(path, err))?;
    Ok(decode_text(&bytes).0)
}

/// Reads the first line of a UTF-8 document without its line terminator.
pub fn read_first_line(path: &Path) -> Result<String> {
    let raw = std::fs::read(path).map_err(|err| MigrateError::from_io(path, err))?;
    let text = String::from_utf8(raw).map_err(|err| MigrateError::SkippableFile {
        path: path.to_path_buf(),
        reason: format!("not valid UTF-8: {err}"),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    Ok(text.lines().next().unwrap_or_default().trim().to_string())
}

#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let Some((clip_idx, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let mut out = text[..clip_idx].to_string();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_keeps_utf8() {
        let (text, encoding) = decode_text("caf\u{e9}".as_bytes());
        assert_eq!(text, "caf\u{e9}");
        assert_eq!(encoding, TextEncoding::Utf8);
    }

    #[test]
    fn decode_text_falls_back_to_latin1() {
        let (text, encoding) = decode_text(b"caf\xe9");
        assert_eq!(text, "caf\u{e9}");
        assert_eq!(encoding, TextEncoding::Latin1);
    }

    #[test]
    fn read_first_line_strips_bom_and_terminator() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("page.md");
        std::fs::write(&path, "\u{feff}[Root](a) > [B](b)\r\nbody\n").expect("write");
        assert_eq!(read_first_line(&path).expect("line"), "[Root](a) > [B](b)");
    }

    #[test]
    fn read_first_line_rejects_non_utf8() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("page.md");
        std::fs::write(&path, b"\xff\xfe broken").expect("write");
        let err = read_first_line(&path).expect_err("must fail");
        assert_eq!(err.code(), "SKIPPABLE_FILE");
    }

    #[test]
    fn truncate_text_preserves_utf8_char_boundaries() {
        let input = "\u{C548}\u{B155}\u{D558}\u{C138}\u{C694}-hello";
        let clipped = truncate_text(input, 5);
        let expected = format!("{}...", "\u{C548}\u{B155}\u{D558}\u{C138}\u{C694}");
        assert_eq!(clipped, expected);
    }
}
