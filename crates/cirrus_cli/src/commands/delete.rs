//! Delete command implementation.

use cirrus_core::Client;

/// Runs the delete command.
pub async fn run(client: &Client, collection: &str, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = client.data();
    let mut record = store.find_by_id(collection, id).await?;
    store.delete(&mut record).await?;
    eprintln!("deleted {}/{}", collection, id);
    Ok(())
}
