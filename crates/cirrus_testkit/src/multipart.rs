//! Parser for `multipart/form-data` request bodies.

use bytes::Bytes;

/// One decoded multipart field.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPart {
    /// Field name.
    pub name: String,
    /// Filename, for file fields.
    pub filename: Option<String>,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// Payload.
    pub data: Bytes,
}

impl ParsedPart {
    /// Returns the payload as UTF-8 text.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Extracts the boundary from a `Content-Type` header value.
pub fn boundary(content_type: &str) -> Option<&str> {
    let (mime, params) = content_type.split_once(';')?;
    if !mime.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("boundary="))
        .next()
        .map(|b| b.trim_matches('"'))
}

/// Splits a multipart body into its parts.
///
/// Returns `None` if the content type is not multipart or the body is
/// malformed.
pub fn parse(content_type: &str, body: &[u8]) -> Option<Vec<ParsedPart>> {
    let delimiter = format!("--{}", boundary(content_type)?);
    let delimiter = delimiter.as_bytes();

    let mut parts = Vec::new();
    let mut rest = body.get(find(body, delimiter)? + delimiter.len()..)?;
    loop {
        if rest.starts_with(b"--") {
            return Some(parts);
        }
        rest = rest.strip_prefix(b"\r\n")?;
        let end = find(rest, delimiter)?;
        let segment = &rest[..end];
        parts.push(parse_part(segment)?);
        rest = &rest[end + delimiter.len()..];
    }
}

fn parse_part(segment: &[u8]) -> Option<ParsedPart> {
    let header_end = find(segment, b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&segment[..header_end]).ok()?;
    let data = &segment[header_end + 4..];
    let data = data.strip_suffix(b"\r\n").unwrap_or(data);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        let (key, value) = line.split_once(':')?;
        let value = value.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').map(str::trim) {
                if let Some(v) = param.strip_prefix("name=") {
                    name = Some(unescape(v.trim_matches('"')));
                } else if let Some(v) = param.strip_prefix("filename=") {
                    filename = Some(unescape(v.trim_matches('"')));
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    Some(ParsedPart {
        name: name?,
        filename,
        content_type,
        data: Bytes::copy_from_slice(data),
    })
}

fn unescape(value: &str) -> String {
    value
        .replace("%22", "\"")
        .replace("%0D", "\r")
        .replace("%0A", "\n")
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
