//! URL templates.
//!
//! Templates are relative paths with `:name` placeholders, e.g.
//! `objects/:collection/:id` or `objects/:collection?filter=:filter`.
//! A placeholder is a `:` followed by an ASCII letter or `_`, then any
//! run of ASCII alphanumerics and `_`. Substituted values are
//! percent-encoded.

use crate::error::{TransportError, TransportResult};

/// Expands a URL template.
///
/// A leading `/` is dropped so the result can be appended to a base URL
/// ending in `/`. Parameters that the template does not mention are
/// ignored; a placeholder without a parameter is an error.
pub fn expand(template: &str, params: &[(&str, &str)]) -> TransportResult<String> {
    let path = template.strip_prefix('/').unwrap_or(template);
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let name_len = placeholder_len(after);
        if name_len == 0 {
            out.push(':');
            rest = after;
            continue;
        }

        let name = &after[..name_len];
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| TransportError::InvalidUrlTemplate {
                template: template.to_string(),
                placeholder: name.to_string(),
            })?;
        out.push_str(&encode(value));
        rest = &after[name_len..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Appends query parameters, choosing `?` or `&` as needed.
pub fn append_query(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query.join("&"))
}

/// Percent-encodes a path or query component.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn placeholder_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn substitutes_placeholders() {
        let url = expand("objects/:collection/:id", &[("collection", "notes"), ("id", "n1")])
            .unwrap();
        assert_eq!(url, "objects/notes/n1");
    }

    #[test]
    fn strips_leading_slash() {
        let url = expand("/users/reset/email", &[]).unwrap();
        assert_eq!(url, "users/reset/email");
    }

    #[test]
    fn encodes_values() {
        let url = expand(
            "objects/:collection?filter=:filter",
            &[("collection", "notes"), ("filter", r#"color eq "red""#)],
        )
        .unwrap();
        assert_eq!(url, "objects/notes?filter=color%20eq%20%22red%22");
    }

    #[test]
    fn placeholder_names_are_matched_whole() {
        let url = expand(
            "files/:collection/:collectionId",
            &[("collection", "a"), ("collectionId", "b")],
        )
        .unwrap();
        assert_eq!(url, "files/a/b");
    }

    #[test]
    fn unresolved_placeholder_fails() {
        let err = expand("objects/:collection/:id", &[("collection", "notes")]).unwrap_err();
        assert_eq!(
            err,
            TransportError::InvalidUrlTemplate {
                template: "objects/:collection/:id".into(),
                placeholder: "id".into(),
            }
        );
    }

    #[test]
    fn bare_colons_are_kept() {
        let url = expand("time/12:30/:id", &[("id", "x")]).unwrap();
        assert_eq!(url, "time/12:30/x");
    }

    #[test]
    fn append_query_picks_separator() {
        let params = [("width", "100".to_string()), ("crop", "true".to_string())];
        assert_eq!(
            append_query("http://h/files/a", &params),
            "http://h/files/a?width=100&crop=true"
        );
        assert_eq!(
            append_query("http://h/files/a?v=1", &params[..1]),
            "http://h/files/a?v=1&width=100"
        );
        assert_eq!(append_query("http://h/x", &[]), "http://h/x");
    }

    proptest! {
        #[test]
        fn expanded_values_round_trip(value in ".*") {
            let url = expand("objects/:id", &[("id", value.as_str())]).unwrap();
            let encoded = url.strip_prefix("objects/").unwrap();
            prop_assert!(!encoded.contains('/'));
            prop_assert!(!encoded.contains('?'));
            let decoded = urlencoding::decode(encoded).unwrap();
            prop_assert_eq!(decoded.as_ref(), value.as_str());
        }
    }
}
