//! Error types for the query crate.

use crate::clause::Operator;
use thiserror::Error;

/// Result type for query building.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while building a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The operand does not fit the operator.
    #[error("invalid operand for `{property} {operator}`: {reason}")]
    InvalidClauseOperand {
        /// Property the clause filters on.
        property: String,
        /// Operator of the rejected clause.
        operator: Operator,
        /// Why the operand was rejected.
        reason: String,
    },

    /// The query was constructed from a raw string and cannot be modified.
    #[error("query was built from a raw string and cannot be modified")]
    AlreadyRaw,
}

impl QueryError {
    /// Creates an invalid operand error.
    pub fn invalid_operand(
        property: impl Into<String>,
        operator: Operator,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidClauseOperand {
            property: property.into(),
            operator,
            reason: reason.into(),
        }
    }
}
