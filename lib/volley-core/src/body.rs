//! Body serialization utilities.

use std::str::FromStr;

use bytes::Bytes;

use crate::Result;

/// Content type tag used to encode request bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    #[default]
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Multipart form data (`multipart/form-data`), used for file uploads.
    Multipart,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// HTML content type (`text/html`).
    Html,
    /// XML content type (`application/xml`).
    Xml,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    ///
    /// For [`ContentType::Multipart`] the boundary parameter is added by
    /// [`Form::content_type`](crate::Form::content_type).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
            Self::PlainText => "text/plain",
            Self::Html => "text/html",
            Self::Xml => "application/xml",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Short tag name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::FormUrlEncoded => "form",
            Self::Multipart => "multipart",
            Self::PlainText => "text",
            Self::Html => "html",
            Self::Xml => "xml",
            Self::OctetStream => "binary",
        }
    }

    /// Encode a captured body for this content type.
    ///
    /// A string is sent verbatim whatever the content type. Structured
    /// values are form-encoded for [`ContentType::FormUrlEncoded`] and
    /// JSON-encoded otherwise. Multipart bodies are built by the agent, not here.
    pub(crate) fn encode(&self, payload: Payload) -> Result<Bytes> {
        match (self, payload) {
            (_, Payload::Raw(raw)) => Ok(Bytes::from(raw)),
            (Self::FormUrlEncoded, Payload::Structured { form, .. }) => form.map(Bytes::from),
            (_, Payload::Structured { json, .. }) => Ok(json),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let content_type = match s.trim().to_ascii_lowercase().as_str() {
            "json" | "application/json" => Self::Json,
            "form" | "urlencoded" | "application/x-www-form-urlencoded" => Self::FormUrlEncoded,
            "multipart" | "form-data" | "multipart/form-data" => Self::Multipart,
            "text" | "text/plain" => Self::PlainText,
            "html" | "text/html" => Self::Html,
            "xml" | "application/xml" => Self::Xml,
            "binary" | "application/octet-stream" => Self::OctetStream,
            other => {
                return Err(crate::Error::invalid_request(format!(
                    "unknown content type: {other}"
                )));
            }
        };
        Ok(content_type)
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use volley_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form` which supports `Vec<T>` for repeated form fields
/// (e.g., `tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if form serialization fails.
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Serialize a value to a query string.
///
/// A string is taken as an already-encoded query string (`"a=1&b=2"`);
/// structured values go through `serde_html_form`. `()` and `None` give an
/// empty string.
///
/// # Errors
///
/// Returns an error if query serialization fails.
///
/// # Example
///
/// ```
/// use volley_core::to_query_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Search {
///     q: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     page: Option<u32>,
/// }
///
/// let search = Search { q: "rust".to_string(), page: Some(1) };
/// let query = to_query_string(&search).expect("serialize");
/// assert_eq!(query, "q=rust&page=1");
/// ```
pub fn to_query_string<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Payload::capture(value).map_or_else(|| Ok(String::new()), |payload| payload?.into_query())
}

// ============================================================================
// Captured arguments
// ============================================================================

/// A query or body argument, serialized once from the caller's value.
///
/// Encodings are produced straight from the original value, so field order
/// and number formatting are whatever its `Serialize` impl emits.
#[derive(Debug)]
pub(crate) enum Payload {
    /// A string, used verbatim.
    Raw(String),
    /// A structured value with its JSON text and its form encoding. The form
    /// encoding fails for nested values; that error only matters when used.
    Structured { json: Bytes, form: Result<String> },
}

impl Payload {
    /// Capture a value; `None` when it serializes to `null` (`()`, `None`).
    pub(crate) fn capture<T: serde::Serialize + ?Sized>(value: &T) -> Option<Result<Self>> {
        let json = match serde_json::to_vec(value) {
            Ok(json) => json,
            Err(err) => return Some(Err(err.into())),
        };

        if json == b"null" {
            return None;
        }
        if json.first() == Some(&b'"') {
            return Some(
                serde_json::from_slice::<String>(&json)
                    .map(Self::Raw)
                    .map_err(Into::into),
            );
        }

        let form = serde_html_form::to_string(value).map_err(Into::into);
        Some(Ok(Self::Structured {
            json: Bytes::from(json),
            form,
        }))
    }

    /// Query string form: a raw string loses a leading `?`.
    pub(crate) fn into_query(self) -> Result<String> {
        match self {
            Self::Raw(raw) => Ok(raw.trim_start_matches('?').to_string()),
            Self::Structured { form, .. } => form,
        }
    }
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
