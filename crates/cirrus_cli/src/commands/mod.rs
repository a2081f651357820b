//! CLI command implementations.

pub mod delete;
pub mod download;
pub mod find;
pub mod get;
pub mod login;
pub mod save;
pub mod upload;

use serde_json::Value;

/// A `property=value` pair from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Property name.
    pub property: String,
    /// Parsed value.
    pub value: Value,
}

/// Parses `property=value`.
///
/// The value is read as JSON when it parses (`3`, `true`, `null`,
/// `"quoted"`, `[1,2]`); anything else is taken as a plain string.
pub fn parse_assignment(arg: &str) -> Result<Assignment, String> {
    let (property, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected property=value, got `{}`", arg))?;
    if property.is_empty() {
        return Err(format!("missing property name in `{}`", arg));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok(Assignment {
        property: property.to_string(),
        value,
    })
}

/// Prints a JSON value to stdout.
pub fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_parse_as_json_when_possible() {
        assert_eq!(parse_assignment("doors=4").unwrap().value, json!(4));
        assert_eq!(parse_assignment("done=true").unwrap().value, json!(true));
        assert_eq!(parse_assignment("tags=[\"a\"]").unwrap().value, json!(["a"]));
        assert_eq!(parse_assignment("color=red").unwrap().value, json!("red"));
        assert_eq!(parse_assignment("code=\"4\"").unwrap().value, json!("4"));
    }

    #[test]
    fn splits_on_first_equals() {
        let assignment = parse_assignment("formula=a=b").unwrap();
        assert_eq!(assignment.property, "formula");
        assert_eq!(assignment.value, json!("a=b"));
    }

    #[test]
    fn empty_values_are_empty_strings() {
        assert_eq!(parse_assignment("note=").unwrap().value, json!(""));
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_assignment("color").is_err());
        assert!(parse_assignment("=red").is_err());
    }
}
