//! Upload command implementation.

use cirrus_core::{Client, FileRef};
use std::path::Path;

/// Runs the upload command.
///
/// The file is attached through a record save, so the record's property
/// points at the new file once the command succeeds.
pub async fn run(
    client: &Client,
    collection: &str,
    id: &str,
    property: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("No file at {:?}", path).into());
    }

    let store = client.data();
    let mut record = store.find_by_id(collection, id).await?;
    record.set(property, FileRef::from_path(path))?;
    store.save(&mut record).await?;

    if let Some(url) = record.file(property).and_then(FileRef::url) {
        println!("{}", url);
    }
    Ok(())
}
