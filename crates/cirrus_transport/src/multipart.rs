//! `multipart/form-data` bodies.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Form field name.
    pub field: String,
    /// Filename reported for file fields.
    pub filename: Option<String>,
    /// MIME type of the payload.
    pub content_type: Option<String>,
    /// Payload bytes.
    pub data: Bytes,
}

impl Part {
    /// Creates a part carrying a file.
    pub fn file(
        field: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    /// Creates a plain data part.
    pub fn data(field: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }
}

/// An encoded multipart body and its boundary.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    body: Bytes,
}

impl MultipartBody {
    /// Encodes parts with a fresh random boundary.
    pub fn encode(parts: &[Part]) -> Self {
        Self::encode_with_boundary(parts, format!("Boundary-{}", Uuid::new_v4()))
    }

    /// Encodes parts with the given boundary.
    pub fn encode_with_boundary(parts: &[Part], boundary: impl Into<String>) -> Self {
        let boundary = boundary.into();
        let mut body = BytesMut::new();

        for part in parts {
            body.put_slice(format!("--{}\r\n", boundary).as_bytes());
            let mut disposition =
                format!("Content-Disposition: form-data; name=\"{}\"", escape(&part.field));
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape(filename)));
            }
            body.put_slice(disposition.as_bytes());
            body.put_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                body.put_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.put_slice(b"\r\n");
            body.put_slice(&part.data);
            body.put_slice(b"\r\n");
        }
        body.put_slice(format!("--{}--\r\n", boundary).as_bytes());

        Self {
            boundary,
            body: body.freeze(),
        }
    }

    /// Returns the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Returns the `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Returns the encoded body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the body, returning the bytes.
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

// Quotes and line breaks would terminate the header parameter.
fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_file_and_data_parts() {
        let parts = [
            Part::file("photo", "cat.png", "image/png", &b"PNG"[..]),
            Part::data("sysObjectData", &b"{\"a\":1}"[..]),
        ];
        let body = MultipartBody::encode_with_boundary(&parts, "XYZ");

        let expected = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"photo\"; filename=\"cat.png\"\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "PNG\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"sysObjectData\"\r\n",
            "\r\n",
            "{\"a\":1}\r\n",
            "--XYZ--\r\n",
        );
        assert_eq!(body.body().as_ref(), expected.as_bytes());
        assert_eq!(body.content_type(), "multipart/form-data; boundary=XYZ");
    }

    #[test]
    fn empty_parts_still_terminate() {
        let body = MultipartBody::encode_with_boundary(&[], "B");
        assert_eq!(body.body().as_ref(), b"--B--\r\n");
    }

    #[test]
    fn random_boundary_prefix() {
        let body = MultipartBody::encode(&[Part::data("x", &b"1"[..])]);
        assert!(body.boundary().starts_with("Boundary-"));
        assert!(body
            .content_type()
            .ends_with(body.boundary()));
    }

    #[test]
    fn header_values_are_escaped() {
        let parts = [Part::file("f", "a\"b.txt", "text/plain", &b""[..])];
        let body = MultipartBody::encode_with_boundary(&parts, "B");
        let text = String::from_utf8(body.into_body().to_vec()).unwrap();
        assert!(text.contains("filename=\"a%22b.txt\""));
    }
}
