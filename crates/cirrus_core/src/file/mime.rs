//! Extension-based MIME type guessing.

use std::path::Path;

const DEFAULT_MIME: &str = "application/octet-stream";

const TABLE: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("heic", "image/heic"),
    ("pdf", "application/pdf"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
];

/// Guesses a MIME type from a filename's extension.
///
/// Unknown or missing extensions yield `application/octet-stream`.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
        return DEFAULT_MIME;
    };
    TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(guess_mime_type("a.png"), "image/png");
        assert_eq!(guess_mime_type("A.JPEG"), "image/jpeg");
        assert_eq!(guess_mime_type("report.final.pdf"), "application/pdf");
    }

    #[test]
    fn unknown_extensions() {
        assert_eq!(guess_mime_type("README"), DEFAULT_MIME);
        assert_eq!(guess_mime_type("data.xyz"), DEFAULT_MIME);
        assert_eq!(guess_mime_type(""), DEFAULT_MIME);
    }
}
