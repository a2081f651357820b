//! Filter clauses: a property, an operator and an operand.

use crate::error::{QueryError, QueryResult};
use crate::escape::{quote_string, render_property};
use serde_json::Value;
use std::fmt;

/// Comparison applied by a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Property equals a primitive value.
    Equals,
    /// Property contains a substring.
    Contains,
    /// Relation property references one record.
    RelationHas,
    /// Relation property references any of a set of records.
    RelationHasAny,
}

impl Operator {
    /// Returns the keyword used in the compiled grammar.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Operator::Equals => "eq",
            Operator::Contains => "contains",
            Operator::RelationHas => "has",
            Operator::RelationHasAny => "hasany",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Logical operator placed between clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Combinator {
    /// Every clause must match.
    #[default]
    And,
    /// At least one clause must match.
    Or,
}

impl Combinator {
    /// Returns the keyword used in the compiled grammar.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Right-hand side of a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A JSON primitive (string, number, boolean or null).
    Value(Value),
    /// Identifier of one related record.
    Id(String),
    /// Identifiers of a set of related records.
    Ids(Vec<String>),
}

impl Operand {
    /// Creates a single related-record operand.
    pub fn id(id: impl Into<String>) -> Self {
        Operand::Id(id.into())
    }

    /// Creates a related-record set operand.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Operand::Ids(ids.into_iter().map(Into::into).collect())
    }

    fn kind(&self) -> &'static str {
        match self {
            Operand::Value(Value::Array(_)) => "array",
            Operand::Value(Value::Object(_)) => "object",
            Operand::Value(_) => "primitive value",
            Operand::Id(_) => "record identifier",
            Operand::Ids(_) => "identifier set",
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Value(Value::String(value))
    }
}

impl From<&String> for Operand {
    fn from(value: &String) -> Self {
        Operand::Value(Value::String(value.clone()))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Value(Value::Bool(value))
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Value(Value::from(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Value(Value::from(value))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Value(Value::from(value))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

/// One filter condition.
///
/// Clauses can only be constructed through [`Clause::new`], which checks
/// that the operand fits the operator, so every `Clause` renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    property: String,
    operator: Operator,
    operand: Operand,
}

impl Clause {
    /// Creates a validated clause.
    pub fn new(
        property: impl Into<String>,
        operator: Operator,
        operand: impl Into<Operand>,
    ) -> QueryResult<Self> {
        let property = property.into();
        let operand = operand.into();

        if property.is_empty() {
            return Err(QueryError::invalid_operand(
                property,
                operator,
                "property name is empty",
            ));
        }

        let mismatch = |expected: &str, operand: &Operand| {
            QueryError::invalid_operand(
                property.clone(),
                operator,
                format!("expected {}, got {}", expected, operand.kind()),
            )
        };

        match (operator, &operand) {
            (Operator::Equals | Operator::Contains, Operand::Value(value)) => {
                if value.is_array() || value.is_object() {
                    return Err(mismatch("a string or primitive", &operand));
                }
            }
            (Operator::Equals | Operator::Contains, _) => {
                return Err(mismatch("a string or primitive", &operand));
            }
            (Operator::RelationHas, Operand::Id(id)) => {
                if id.is_empty() {
                    return Err(QueryError::invalid_operand(
                        &property,
                        operator,
                        "record identifier is empty",
                    ));
                }
            }
            (Operator::RelationHas, _) => return Err(mismatch("a record identifier", &operand)),
            (Operator::RelationHasAny, Operand::Ids(ids)) => {
                if ids.is_empty() {
                    return Err(QueryError::invalid_operand(
                        &property,
                        operator,
                        "identifier set is empty",
                    ));
                }
                if ids.iter().any(String::is_empty) {
                    return Err(QueryError::invalid_operand(
                        &property,
                        operator,
                        "identifier set contains an empty identifier",
                    ));
                }
            }
            (Operator::RelationHasAny, _) => return Err(mismatch("an identifier set", &operand)),
        }

        Ok(Self {
            property,
            operator,
            operand,
        })
    }

    /// Returns the property name.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Returns the operator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operand.
    #[must_use]
    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Renders the clause in the backend's query grammar.
    #[must_use]
    pub fn render(&self) -> String {
        let property = render_property(&self.property);
        match &self.operand {
            Operand::Value(value) => {
                format!("{} {} {}", property, self.operator, render_value(value))
            }
            Operand::Id(id) => format!(
                "{} {} {}",
                property,
                Operator::RelationHas,
                quote_string(id)
            ),
            // hasany is sent as a parenthesized OR-group of single membership tests
            Operand::Ids(ids) => {
                let tests: Vec<String> = ids
                    .iter()
                    .map(|id| format!("{} {} {}", property, Operator::RelationHas, quote_string(id)))
                    .collect();
                format!("({})", tests.join(" or "))
            }
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote_string(s),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
