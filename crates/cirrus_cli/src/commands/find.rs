//! Find command implementation.

use super::{print_json, Assignment};
use cirrus_core::{Client, Query, Record};
use serde_json::Value;

/// Which records to list.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Records whose properties equal all the given values.
    Where(Vec<Assignment>),
    /// Records where any of the properties contains the text.
    Search {
        /// Text to look for.
        text: String,
        /// Properties to search.
        properties: Vec<String>,
    },
    /// Records matching a filter in the backend's grammar.
    Raw(String),
}

impl Selection {
    /// Builds a selection from command-line flags.
    ///
    /// A raw filter wins over a search, which wins over conditions.
    pub fn from_args(
        conditions: Vec<Assignment>,
        search: Option<String>,
        properties: Vec<String>,
        filter: Option<String>,
    ) -> Self {
        match (filter, search) {
            (Some(filter), _) => Selection::Raw(filter),
            (None, Some(text)) => Selection::Search { text, properties },
            (None, None) => Selection::Where(conditions),
        }
    }
}

/// Runs the find command.
pub async fn run(
    client: &Client,
    collection: &str,
    selection: Selection,
    expand: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = client.data().with_expand(expand);
    let records = match selection {
        Selection::Where(conditions) => {
            store
                .find_where(collection, conditions.into_iter().map(|a| (a.property, a.value)))
                .await?
        }
        Selection::Search { text, properties } => {
            store.search(collection, &text, properties).await?
        }
        Selection::Raw(filter) => store.find_by_query(collection, &Query::raw(filter)).await?,
    };

    eprintln!("{} record(s)", records.len());
    print_json(&Value::Array(records.iter().map(Record::to_json).collect()))
}
