//! Multipart form data for file uploads.
//!
//! The agent switches to `multipart/form-data` whenever a file is attached.
//! The file becomes a `file1` part and the top-level fields of the body
//! value, if any, become text parts next to it, in serialization order.
//!
//! # Example
//!
//! ```
//! use volley_core::{Form, Part};
//!
//! let form = Form::with_boundary("xyz")
//!     .part(Part::text("name", "John Doe"))
//!     .part(Part::file("file", "photo.png", vec![0x89, 0x50]));
//!
//! let (content_type, body) = form.into_body();
//! assert_eq!(content_type, "multipart/form-data; boundary=xyz");
//! assert!(body.starts_with(b"--xyz\r\n"));
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};

use crate::body::Payload;
use crate::{ContentType, Error, Result};

/// Form field name used for the uploaded file.
///
/// Numbered like the first file of a multi-file upload, the name that
/// gorequest-based servers expect.
pub const FILE_FIELD: &str = "file1";

/// File name used for in-memory uploads that were given none.
pub const DEFAULT_FILENAME: &str = "filename";

// ============================================================================
// File argument
// ============================================================================

/// A file to upload: a path on disk or bytes already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileUpload {
    /// Read from disk at dispatch time; the part's file name is the base name.
    Path(PathBuf),
    /// In-memory content with the file name to announce.
    Bytes {
        /// File name sent in the `Content-Disposition` header.
        filename: String,
        /// File content.
        data: Bytes,
    },
}

impl FileUpload {
    /// Upload the file found at `path`.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Upload in-memory bytes under the given file name.
    #[must_use]
    pub fn bytes(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Bytes {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Turn the upload into a form part, reading the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn into_part(self) -> Result<Part> {
        match self {
            Self::Path(path) => {
                let data = std::fs::read(&path)?;
                Ok(Part::file(FILE_FIELD, base_name(&path), data))
            }
            Self::Bytes { filename, data } => {
                let filename = if filename.is_empty() {
                    DEFAULT_FILENAME.to_string()
                } else {
                    filename
                };
                Ok(Part::file(FILE_FIELD, filename, data))
            }
        }
    }
}

impl From<PathBuf> for FileUpload {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for FileUpload {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for FileUpload {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for FileUpload {
    fn from(data: Vec<u8>) -> Self {
        Self::bytes(DEFAULT_FILENAME, data)
    }
}

impl From<Bytes> for FileUpload {
    fn from(data: Bytes) -> Self {
        Self::bytes(DEFAULT_FILENAME, data)
    }
}

fn base_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || DEFAULT_FILENAME.to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

// ============================================================================
// Parts
// ============================================================================

/// A single part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// A text field.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// A file field; the content type is guessed from the file name.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self {
            name: name.into(),
            filename: Some(filename),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        }
    }

    /// Override the content type of this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name, for file parts.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw part content.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn write_to(&self, boundary: &str, buf: &mut BytesMut) {
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
        buf.put_slice(escape_quoted(&self.name).as_bytes());
        buf.put_u8(b'"');
        if let Some(filename) = &self.filename {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(escape_quoted(filename).as_bytes());
            buf.put_u8(b'"');
        }
        buf.put_slice(b"\r\n");
        if let Some(content_type) = &self.content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(content_type.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(&self.data);
        buf.put_slice(b"\r\n");
    }
}

/// Percent-encode `"`, CR and LF inside a quoted header parameter.
fn escape_quoted(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("%22"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => ContentType::OctetStream.as_str(),
    }
}

// ============================================================================
// Form
// ============================================================================

/// A multipart form: ordered parts sharing one boundary.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Empty form with a fixed boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add one text part per top-level field of a serializable value.
    ///
    /// Fields keep their serialization order and are rendered the way a
    /// form body renders them; sequences give one part per element. A string
    /// is sent as a single `data` field. `()` and `None` add nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not serialize to flat fields.
    pub fn fields<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        if let Some(payload) = Payload::capture(value) {
            self.add_payload(payload?)?;
        }
        Ok(self)
    }

    pub(crate) fn add_payload(&mut self, payload: Payload) -> Result<()> {
        match payload {
            Payload::Raw(raw) => self.parts.push(Part::text("data", raw)),
            Payload::Structured { form, .. } => {
                let encoded = form?;
                for (name, value) in url::form_urlencoded::parse(encoded.as_bytes()) {
                    self.parts.push(Part::text(name, value));
                }
            }
        }
        Ok(())
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts, in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `Content-Type` header value, boundary included.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", ContentType::Multipart, self.boundary)
    }

    /// Consume into (`Content-Type` value, encoded body).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            part.write_to(&self.boundary, &mut buf);
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        (self.content_type(), buf.freeze())
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----VolleyBoundary{timestamp:x}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn upload_from_bytes_keeps_filename() {
        let part = FileUpload::bytes("report.csv", "a,b\n1,2")
            .into_part()
            .expect("part");
        assert_eq!(part.name(), FILE_FIELD);
        assert_eq!(part.filename(), Some("report.csv"));
        assert_eq!(part.content_type(), Some("text/csv"));
    }

    #[test]
    fn upload_from_raw_bytes_uses_default_name() {
        let part = FileUpload::from(vec![1_u8, 2, 3]).into_part().expect("part");
        assert_eq!(part.filename(), Some(DEFAULT_FILENAME));
        assert_eq!(part.content_type(), Some("application/octet-stream"));
        assert_eq!(part.data().as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn upload_from_missing_path_is_io_error() {
        let err = FileUpload::path("/definitely/not/here.bin")
            .into_part()
            .expect_err("missing file");
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn upload_from_path_reads_file() {
        let path = std::env::temp_dir().join("volley-multipart-upload.txt");
        std::fs::write(&path, "hello").expect("write temp file");

        let part = FileUpload::from(path.as_path()).into_part().expect("part");
        assert_eq!(part.filename(), Some("volley-multipart-upload.txt"));
        assert_eq!(part.data().as_ref(), b"hello");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn guess_content_type_is_case_insensitive() {
        assert_eq!(guess_content_type("PHOTO.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("archive.tar.gz"), "application/gzip");
        assert_eq!(guess_content_type("no-extension"), "application/octet-stream");
    }

    #[test]
    fn form_fields_from_object() {
        let form = Form::with_boundary("b")
            .fields(&json!({"name": "John", "age": 42}))
            .expect("fields");

        let names: Vec<_> = form.parts().iter().map(Part::name).collect();
        assert_eq!(names, ["age", "name"]);
        assert_eq!(form.parts().first().expect("age").data().as_ref(), b"42");
    }

    #[test]
    fn form_fields_keep_struct_order() {
        #[derive(serde::Serialize)]
        struct Profile {
            name: &'static str,
            ratio: f32,
        }

        let form = Form::with_boundary("b")
            .fields(&Profile { name: "John", ratio: 0.1 })
            .expect("fields");

        let fields: Vec<_> = form
            .parts()
            .iter()
            .map(|part| (part.name(), String::from_utf8_lossy(part.data()).into_owned()))
            .collect();
        assert_eq!(fields, [("name", "John".to_owned()), ("ratio", "0.1".to_owned())]);
    }

    #[test]
    fn form_fields_from_unit_are_empty() {
        let form = Form::with_boundary("b").fields(&()).expect("fields");
        assert!(form.parts().is_empty());
    }

    #[test]
    fn disposition_escapes_quotes_and_line_breaks() {
        let part = FileUpload::bytes("a\"b.txt", "x").into_part().expect("part");
        let (_, body) = Form::with_boundary("q")
            .part(Part::text("evil\r\nX-Injected: 1", "v"))
            .part(part)
            .into_body();

        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(r#"name="evil%0D%0AX-Injected: 1""#));
        assert!(text.contains(r#"name="file1"; filename="a%22b.txt""#));
        assert!(!text.contains("\r\nX-Injected"));
    }

    #[test]
    fn form_fields_reject_arrays() {
        assert!(Form::new().fields(&json!([1, 2])).is_err());
    }

    #[test]
    fn form_generated_boundary() {
        assert!(Form::new().boundary().starts_with("----VolleyBoundary"));
    }

    #[test]
    fn form_encode() {
        let form = Form::with_boundary("boundary123")
            .part(Part::text("field", "value"))
            .part(Part::file("file", "test.txt", "file content"));

        let (content_type, body) = form.into_body();

        assert_eq!(content_type, "multipart/form-data; boundary=boundary123");
        insta::assert_snapshot!(String::from_utf8_lossy(&body).replace("\r\n", "\n"), @r#"
        --boundary123
        Content-Disposition: form-data; name="field"

        value
        --boundary123
        Content-Disposition: form-data; name="file"; filename="test.txt"
        Content-Type: text/plain

        file content
        --boundary123--
        "#);
    }
}
