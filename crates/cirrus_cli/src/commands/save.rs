//! Save command implementation.

use super::{print_json, Assignment};
use cirrus_core::Client;

/// Runs the save command.
///
/// Without an identifier a new record is created from the assignments;
/// with one the record is fetched first so only the assigned properties
/// are sent.
pub async fn run(
    client: &Client,
    collection: &str,
    id: Option<&str>,
    properties: Vec<Assignment>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = client.data();
    let mut record = match id {
        Some(id) => store.find_by_id(collection, id).await?,
        None => store.create(collection, std::iter::empty::<(String, serde_json::Value)>())?,
    };
    for assignment in properties {
        record.set(assignment.property, assignment.value)?;
    }

    store.save(&mut record).await?;
    eprintln!("saved {} ({})", record.id().unwrap_or_default(), record.status());
    print_json(&record.to_json())
}
