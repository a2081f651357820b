//! # Cirrus Query
//!
//! Declarative filter builder for the Cirrus SDK.
//!
//! A [`Query`] is an ordered list of [`Clause`]s joined by a single
//! [`Combinator`]. Compiling renders it in the backend's query grammar:
//!
//! - clause syntax is `<property> <op> <value>`
//! - operators are `eq`, `contains`, `has`, `hasany`
//! - string values are double-quoted with `\` and `"` escaped
//! - clauses are joined with `and` / `or`
//! - a relation test against a set of records becomes a parenthesized
//!   `or` group of single `has` tests
//!
//! This crate performs no I/O; the data store hands the compiled string
//! to the transport.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clause;
mod error;
mod escape;
mod query;

pub use clause::{Clause, Combinator, Operand, Operator};
pub use error::{QueryError, QueryResult};
pub use escape::{quote_string, render_property};
pub use query::Query;
