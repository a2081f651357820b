//! Get command implementation.

use super::print_json;
use cirrus_core::Client;

/// Runs the get command.
///
/// A non-zero `expand` inlines related records that many levels deep.
pub async fn run(
    client: &Client,
    collection: &str,
    id: &str,
    expand: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = client.data().with_expand(expand).find_by_id(collection, id).await?;
    print_json(&record.to_json())
}
