//! Query builder and compiler.

use crate::clause::{Clause, Combinator, Operand, Operator};
use crate::error::{QueryError, QueryResult};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum QueryKind {
    Built {
        clauses: Vec<Clause>,
        /// `None` until explicitly set; compiles as `and`.
        combinator: Option<Combinator>,
    },
    Raw(String),
}

/// A filter over the records of one collection.
///
/// A query is either built clause by clause and compiled to the backend's
/// textual grammar, or wraps a caller-supplied raw expression that is
/// passed through untouched.
///
/// # Example
///
/// ```
/// use cirrus_query::{Combinator, Query};
///
/// let mut query = Query::new();
/// query.string_equals("color", "red")?;
/// query.contains("title", "milk")?;
/// assert_eq!(query.compile(), r#"color eq "red" and title contains "milk""#);
///
/// query.set_combinator(Combinator::Or)?;
/// assert_eq!(query.compile(), r#"color eq "red" or title contains "milk""#);
/// # Ok::<(), cirrus_query::QueryError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: QueryKind,
}

impl Query {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kind: QueryKind::Built {
                clauses: Vec::new(),
                combinator: None,
            },
        }
    }

    /// Wraps a precompiled query string.
    #[must_use]
    pub fn raw(query: impl Into<String>) -> Self {
        Self {
            kind: QueryKind::Raw(query.into()),
        }
    }

    /// Returns true if this query wraps a raw string.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self.kind, QueryKind::Raw(_))
    }

    /// Returns true if the query filters nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            QueryKind::Built { clauses, .. } => clauses.is_empty(),
            QueryKind::Raw(raw) => raw.trim().is_empty(),
        }
    }

    /// Returns the clauses in insertion order (empty for raw queries).
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        match &self.kind {
            QueryKind::Built { clauses, .. } => clauses,
            QueryKind::Raw(_) => &[],
        }
    }

    /// Returns the combinator the query compiles with.
    #[must_use]
    pub fn combinator(&self) -> Combinator {
        match &self.kind {
            QueryKind::Built { combinator, .. } => combinator.unwrap_or_default(),
            QueryKind::Raw(_) => Combinator::default(),
        }
    }

    /// Appends a clause.
    pub fn add_clause(
        &mut self,
        property: impl Into<String>,
        operator: Operator,
        operand: impl Into<Operand>,
    ) -> QueryResult<&mut Self> {
        // Raw check first so misuse is reported even with a bad operand.
        if self.is_raw() {
            return Err(QueryError::AlreadyRaw);
        }
        let clause = Clause::new(property, operator, operand)?;
        self.push(clause)?;
        Ok(self)
    }

    /// Appends an already validated clause.
    pub fn push(&mut self, clause: Clause) -> QueryResult<()> {
        match &mut self.kind {
            QueryKind::Built { clauses, .. } => {
                clauses.push(clause);
                Ok(())
            }
            QueryKind::Raw(_) => Err(QueryError::AlreadyRaw),
        }
    }

    /// Overrides the combinator placed between clauses.
    pub fn set_combinator(&mut self, value: Combinator) -> QueryResult<&mut Self> {
        match &mut self.kind {
            QueryKind::Built { combinator, .. } => {
                *combinator = Some(value);
                Ok(self)
            }
            QueryKind::Raw(_) => Err(QueryError::AlreadyRaw),
        }
    }

    /// Consuming variant of [`Query::set_combinator`].
    pub fn with_combinator(mut self, value: Combinator) -> QueryResult<Self> {
        self.set_combinator(value)?;
        Ok(self)
    }

    /// Adds an equality test against a string.
    pub fn string_equals(
        &mut self,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> QueryResult<&mut Self> {
        self.add_clause(property, Operator::Equals, Operand::from(value.into()))
    }

    /// Adds an equality test against any primitive.
    pub fn equals(
        &mut self,
        property: impl Into<String>,
        value: impl Into<Operand>,
    ) -> QueryResult<&mut Self> {
        self.add_clause(property, Operator::Equals, value)
    }

    /// Adds a substring test.
    pub fn contains(
        &mut self,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> QueryResult<&mut Self> {
        self.add_clause(property, Operator::Contains, Operand::from(value.into()))
    }

    /// Adds a test that a relation references the given record.
    pub fn relation_has(
        &mut self,
        property: impl Into<String>,
        id: impl Into<String>,
    ) -> QueryResult<&mut Self> {
        self.add_clause(property, Operator::RelationHas, Operand::id(id))
    }

    /// Adds a test that a relation references any of the given records.
    pub fn relation_has_any<I, S>(
        &mut self,
        property: impl Into<String>,
        ids: I,
    ) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_clause(property, Operator::RelationHasAny, Operand::ids(ids))
    }

    /// Renders the query in the backend's grammar.
    ///
    /// Raw queries are returned unmodified. Compiling does not consume the
    /// query; clauses may still be added afterwards.
    #[must_use]
    pub fn compile(&self) -> String {
        match &self.kind {
            QueryKind::Raw(raw) => raw.clone(),
            QueryKind::Built {
                clauses,
                combinator,
            } => {
                let separator = format!(" {} ", combinator.unwrap_or_default());
                clauses
                    .iter()
                    .map(Clause::render)
                    .collect::<Vec<_>>()
                    .join(&separator)
            }
        }
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_query_compiles_to_empty_string() {
        let query = Query::new();
        assert!(query.is_empty());
        assert_eq!(query.compile(), "");
    }

    #[test]
    fn single_equality() {
        let mut query = Query::new();
        query.string_equals("color", "red").unwrap();
        assert_eq!(query.compile(), r#"color eq "red""#);
    }

    #[test]
    fn two_clauses_default_to_and() {
        let mut query = Query::new();
        query
            .string_equals("color", "red")
            .unwrap()
            .equals("size", 3i64)
            .unwrap();
        assert_eq!(query.combinator(), Combinator::And);
        assert_eq!(query.compile(), r#"color eq "red" and size eq 3"#);
    }

    #[test]
    fn combinator_override() {
        let mut query = Query::new();
        query.set_combinator(Combinator::Or).unwrap();
        query.contains("title", "a").unwrap();
        query.contains("body", "a").unwrap();
        assert_eq!(query.compile(), r#"title contains "a" or body contains "a""#);
    }

    #[test]
    fn with_combinator_consumes() {
        let mut query = Query::new().with_combinator(Combinator::Or).unwrap();
        query.equals("a", 1i64).unwrap().equals("b", 2i64).unwrap();
        assert_eq!(query.compile(), "a eq 1 or b eq 2");
        assert!(Query::raw("x").with_combinator(Combinator::And).is_err());
    }

    #[test]
    fn has_any_nests_inside_outer_combinator() {
        let mut query = Query::new();
        query.string_equals("status", "open").unwrap();
        query.relation_has_any("tags", ["t1", "t2"]).unwrap();
        assert_eq!(
            query.compile(),
            r#"status eq "open" and (tags has "t1" or tags has "t2")"#
        );
    }

    #[test]
    fn compile_after_mutation() {
        let mut query = Query::new();
        query.relation_has("owner", "u1").unwrap();
        assert_eq!(query.compile(), r#"owner has "u1""#);

        query.string_equals("kind", "note").unwrap();
        assert_eq!(query.compile(), r#"owner has "u1" and kind eq "note""#);
        assert_eq!(query.clauses().len(), 2);
    }

    #[test]
    fn raw_query_passes_through() {
        let query = Query::raw("foo='bar'");
        assert!(query.is_raw());
        assert_eq!(query.compile(), "foo='bar'");
        assert_eq!(query.to_string(), "foo='bar'");
    }

    #[test]
    fn raw_query_rejects_modification() {
        let mut query = Query::raw("foo='bar'");
        assert_eq!(
            query.string_equals("color", "red").unwrap_err(),
            QueryError::AlreadyRaw
        );
        assert_eq!(
            query.set_combinator(Combinator::Or).unwrap_err(),
            QueryError::AlreadyRaw
        );
        assert_eq!(
            query.relation_has("owner", "").unwrap_err(),
            QueryError::AlreadyRaw
        );
        assert_eq!(query.compile(), "foo='bar'");
    }

    #[test]
    fn invalid_clause_leaves_query_untouched() {
        let mut query = Query::new();
        query.string_equals("color", "red").unwrap();
        assert!(query
            .add_clause("owner", Operator::RelationHas, "not-an-id")
            .is_err());
        assert_eq!(query.clauses().len(), 1);
    }

    proptest! {
        #[test]
        fn clause_count_matches_separators(values in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let mut query = Query::new();
            for (i, v) in values.iter().enumerate() {
                query.string_equals(format!("p{}", i), v.as_str()).unwrap();
            }
            let compiled = query.compile();
            prop_assert_eq!(compiled.matches(" and ").count(), values.len() - 1);
        }
    }
}
