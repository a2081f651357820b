//! Upload and download of file attachments.

use super::{FileRef, FileStatus, ResizeSpec};
use crate::error::{CoreError, CoreResult};
use bytes::Bytes;
use cirrus_transport::{template, Part, Transport};
use tracing::{debug, info};

/// Moves [`FileRef`]s between local data and remote storage.
#[derive(Debug, Clone)]
pub struct FileManager {
    transport: Transport,
}

impl FileManager {
    /// Creates a manager over a transport.
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Returns the remote URL of a file attached to a record property.
    pub fn url_for(&self, collection: &str, id: &str, property: &str, filename: &str) -> String {
        format!(
            "{}files/{}/{}/{}/{}",
            self.transport.base_url(),
            template::encode(collection),
            template::encode(id),
            template::encode(property),
            template::encode(filename)
        )
    }

    /// Uploads a file to the property of an existing record.
    ///
    /// Already `Saved` files are left alone and no request is made. On
    /// success the file becomes `Saved` and its URL is returned; on
    /// failure it goes back to `New`.
    pub async fn upload(
        &self,
        file: &mut FileRef,
        collection: &str,
        id: &str,
        property: &str,
    ) -> CoreResult<String> {
        if file.status() == FileStatus::Saved {
            if let Some(url) = file.url() {
                return Ok(url.to_string());
            }
        }

        let data = file.read_local().await?;
        file.mark_saving();
        info!(collection, id, property, filename = file.filename(), bytes = data.len(), "uploading file");

        let part = Part::file(property, file.filename(), file.mime_type(), data);
        let result = self
            .transport
            .post_multipart(
                "files/:collection/:id/:property",
                &[("collection", collection), ("id", id), ("property", property)],
                &[part],
            )
            .await;

        match result {
            Ok(_) => {
                let url = self.url_for(collection, id, property, file.filename());
                file.mark_saved(url.clone());
                Ok(url)
            }
            Err(e) => {
                file.mark_failed();
                Err(e.into())
            }
        }
    }

    /// Downloads a file, optionally resized by the server.
    ///
    /// Results are cached on the reference per resize spec, so a repeated
    /// download issues no request.
    pub async fn download(&self, file: &FileRef, resize: Option<ResizeSpec>) -> CoreResult<Bytes> {
        let url = file.url().ok_or_else(|| CoreError::NotUploaded {
            filename: file.filename().to_string(),
        })?;

        if let Some(bytes) = file.cached(resize) {
            debug!(filename = file.filename(), "file served from cache");
            return Ok(bytes);
        }

        let params = resize.map(|spec| spec.query_params()).unwrap_or_default();
        let url = template::append_query(url, &params);
        info!(filename = file.filename(), url = %url, "downloading file");

        let bytes = self.transport.get_bytes(&url).await?;
        file.cache_bytes(resize, bytes.clone());
        Ok(bytes)
    }

    /// Drops every cached download of a file.
    pub fn unload(&self, file: &FileRef) {
        file.clear_cache();
    }
}
