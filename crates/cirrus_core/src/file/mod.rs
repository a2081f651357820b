//! File attachments.
//!
//! A [`FileRef`] is stored as a property value inside a record. It goes
//! through its own lifecycle (`New → Saving → Saved`) driven by the
//! [`FileManager`].

mod manager;
mod mime;

pub use manager::FileManager;
pub use mime::guess_mime_type;

use crate::error::{CoreError, CoreResult};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Value of `sysDatatype` marking a file property on the wire.
pub(crate) const FILE_DATATYPE: &str = "file";

/// Upload status of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Never uploaded; has no remote URL.
    New,
    /// Upload in flight.
    Saving,
    /// Uploaded; has a remote URL.
    Saved,
}

/// Where the bytes of a file come from before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalData {
    /// An owned in-memory buffer.
    Bytes(Bytes),
    /// A path read at upload time.
    Path(PathBuf),
}

/// Encodings accepted by [`FileRef::from_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
}

impl ImageFormat {
    /// Returns the MIME type.
    pub const fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Returns the canonical file extension.
    pub const fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Server-side resize hint for downloads.
///
/// Resizing happens on the server; the values are sent as `width`,
/// `height` and `crop` query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResizeSpec {
    /// Target width in pixels.
    pub width: Option<u32>,
    /// Target height in pixels.
    pub height: Option<u32>,
    /// Crop to fill the box instead of fitting inside it.
    pub crop: bool,
}

impl ResizeSpec {
    /// Creates an empty resize spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the width.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the height.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Requests cropping.
    pub fn cropped(mut self) -> Self {
        self.crop = true;
        self
    }

    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(width) = self.width {
            params.push(("width", width.to_string()));
        }
        if let Some(height) = self.height {
            params.push(("height", height.to_string()));
        }
        if self.crop {
            params.push(("crop", "true".to_string()));
        }
        params
    }
}

/// A binary attachment.
///
/// `Saved` always comes with a remote URL and `New` never does. Bytes
/// fetched by [`FileManager::download`] are cached on the reference, per
/// resize spec, until [`FileManager::unload`] is called or the reference
/// is dropped.
pub struct FileRef {
    filename: String,
    mime_type: String,
    local: Option<LocalData>,
    url: Option<String>,
    status: FileStatus,
    cache: Mutex<HashMap<Option<ResizeSpec>, Bytes>>,
}

impl FileRef {
    /// Creates a file from an in-memory buffer.
    ///
    /// The MIME type is guessed from the filename's extension.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime_type(&filename).to_string();
        Self::new(filename, mime_type, Some(LocalData::Bytes(data.into())))
    }

    /// Creates a file backed by a path on disk.
    ///
    /// The path is read when the file is uploaded.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let mime_type = guess_mime_type(&filename).to_string();
        Self::new(filename, mime_type, Some(LocalData::Path(path.to_path_buf())))
    }

    /// Creates an image file from encoded image bytes.
    ///
    /// The format's extension is appended when `filename` has none.
    pub fn from_image(
        filename: impl Into<String>,
        data: impl Into<Bytes>,
        format: ImageFormat,
    ) -> Self {
        let mut filename = filename.into();
        if Path::new(&filename).extension().is_none() {
            filename = format!("{}.{}", filename, format.extension());
        }
        Self::new(
            filename,
            format.mime_type().to_string(),
            Some(LocalData::Bytes(data.into())),
        )
    }

    /// Creates a reference to an already uploaded file.
    pub(crate) fn saved(filename: impl Into<String>, url: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime_type(&filename).to_string();
        let mut file = Self::new(filename, mime_type, None);
        file.url = Some(url.into());
        file.status = FileStatus::Saved;
        file
    }

    fn new(filename: String, mime_type: String, local: Option<LocalData>) -> Self {
        Self {
            filename,
            mime_type,
            local,
            url: None,
            status: FileStatus::New,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the guessed MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Returns the filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the local data source, if any.
    pub fn local_data(&self) -> Option<&LocalData> {
        self.local.as_ref()
    }

    /// Returns the remote URL once uploaded.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the upload status.
    pub fn status(&self) -> FileStatus {
        self.status
    }

    /// Returns cached download bytes for a resize spec.
    pub fn cached(&self, resize: Option<ResizeSpec>) -> Option<Bytes> {
        self.cache.lock().get(&resize).cloned()
    }

    /// Wire form stored inside a record body.
    pub(crate) fn to_wire(&self) -> Value {
        json!({
            "sysDatatype": FILE_DATATYPE,
            "filename": self.filename,
        })
    }

    /// Display form, including the URL when known.
    pub(crate) fn to_json(&self) -> Value {
        let mut value = self.to_wire();
        if let (Some(url), Value::Object(map)) = (&self.url, &mut value) {
            map.insert("url".to_string(), Value::String(url.clone()));
        }
        value
    }

    /// Returns the filename of a wire-form file value.
    pub(crate) fn wire_filename(value: &Value) -> Option<&str> {
        let object = value.as_object()?;
        if object.get("sysDatatype").and_then(Value::as_str) != Some(FILE_DATATYPE) {
            return None;
        }
        object.get("filename").and_then(Value::as_str)
    }

    /// Reads the bytes to upload.
    pub(crate) async fn read_local(&self) -> CoreResult<Bytes> {
        match &self.local {
            Some(LocalData::Bytes(bytes)) => Ok(bytes.clone()),
            Some(LocalData::Path(path)) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            None => Err(CoreError::NoLocalData {
                filename: self.filename.clone(),
            }),
        }
    }

    pub(crate) fn mark_saving(&mut self) {
        self.status = FileStatus::Saving;
    }

    pub(crate) fn mark_saved(&mut self, url: String) {
        self.url = Some(url);
        self.status = FileStatus::Saved;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.url = None;
        self.status = FileStatus::New;
    }

    pub(crate) fn cache_bytes(&self, resize: Option<ResizeSpec>, bytes: Bytes) {
        self.cache.lock().insert(resize, bytes);
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl Clone for FileRef {
    fn clone(&self) -> Self {
        Self {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            local: self.local.clone(),
            url: self.url.clone(),
            status: self.status,
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

// The download cache is not part of a file's identity.
impl PartialEq for FileRef {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename
            && self.mime_type == other.mime_type
            && self.local == other.local
            && self.url == other.url
            && self.status == other.status
    }
}

impl fmt::Debug for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRef")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("url", &self.url)
            .field("status", &self.status)
            .field("has_local_data", &self.local.is_some())
            .finish()
    }
}
