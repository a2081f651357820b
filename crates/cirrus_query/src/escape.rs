//! Escaping rules of the query grammar.
//!
//! String operands are wrapped in double quotes with `\` and `"` escaped.
//! Property names are emitted bare; any character outside
//! `[A-Za-z0-9_.]` is prefixed with a backslash so it cannot be read as
//! an operator, a quote or a clause separator.

/// Quotes and escapes a string operand.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Escapes a property name.
#[must_use]
pub fn render_property(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    for c in property.chars() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
