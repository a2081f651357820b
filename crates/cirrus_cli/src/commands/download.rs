//! Download command implementation.

use cirrus_core::{Client, ResizeSpec};
use std::path::PathBuf;

/// Builds a resize spec from command-line flags; `None` when no flag is set.
pub fn resize_spec(width: Option<u32>, height: Option<u32>, crop: bool) -> Option<ResizeSpec> {
    if width.is_none() && height.is_none() && !crop {
        return None;
    }
    let mut spec = ResizeSpec::new();
    if let Some(width) = width {
        spec = spec.with_width(width);
    }
    if let Some(height) = height {
        spec = spec.with_height(height);
    }
    if crop {
        spec = spec.cropped();
    }
    Some(spec)
}

/// Runs the download command.
pub async fn run(
    client: &Client,
    collection: &str,
    id: &str,
    property: &str,
    resize: Option<ResizeSpec>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = client.data().find_by_id(collection, id).await?;
    let file = record
        .file(property)
        .ok_or_else(|| format!("{}/{} has no file in `{}`", collection, id, property))?;

    let bytes = client.files().download(file, resize).await?;
    let output = output.unwrap_or_else(|| PathBuf::from(file.filename()));
    tokio::fs::write(&output, &bytes).await?;
    eprintln!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
