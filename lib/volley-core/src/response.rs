//! The response wrapper.
//!
//! [`Response`] wraps whatever the transport produced, a raw response or
//! nothing at all, together with the originating request and the errors
//! collected so far. The body is read on first access and cached:
//!
//! ```text
//! Created -> ready evaluated -> Unread -> (first read_all_body) -> Read
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut response = agent.get("https://api.example.com/users/1", &());
//! if let Some(errors) = response.get_error() {
//!     eprintln!("{errors}");
//! }
//! let user: User = response.json()?;
//! ```

use std::collections::HashMap;

use bytes::Bytes;

use crate::{Error, RawResponse, Request, ResponseError, Result};

/// Whether the body has been pulled from the transport yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyState {
    /// Nothing read; the stream is untouched.
    #[default]
    Unread,
    /// The stream was read once; the cache is authoritative.
    Read,
}

/// Result of a dispatch: the raw response (if any), a read-once body cache
/// and the aggregated errors.
pub struct Response {
    request: Option<Request>,
    raw: Option<RawResponse>,
    body: Bytes,
    state: BodyState,
    errors: ResponseError,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("request", &self.request)
            .field("raw", &self.raw)
            .field("state", &self.state)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Response {
    pub(crate) fn new(request: Option<Request>, raw: Option<RawResponse>) -> Self {
        Self {
            request,
            raw,
            body: Bytes::new(),
            state: BodyState::Unread,
            errors: ResponseError::new(),
        }
    }

    /// Wrap a raw transport response and evaluate its status.
    #[must_use]
    pub fn from_raw(request: Option<Request>, raw: RawResponse) -> Self {
        let mut response = Self::new(request, Some(raw));
        response.ready();
        response
    }

    /// A response for a request that never produced a raw response.
    #[must_use]
    pub fn failed(request: Option<Request>, errors: impl Into<ResponseError>) -> Self {
        let mut response = Self::new(request, None);
        response.errors = errors.into();
        response.ready();
        response
    }

    /// Promote a status of 400 or above into an error.
    ///
    /// This is the only automatic classification; the body is not inspected.
    pub(crate) fn ready(&mut self) {
        let status = self.status_code();
        if status >= 400 {
            self.add_error(Error::http(status));
        }
    }

    // ========================================================================
    // Status & head
    // ========================================================================

    /// HTTP status code, or `0` when the transport produced no response.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.raw.as_ref().map_or(0, RawResponse::status)
    }

    /// Alias of [`Response::status_code`].
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status_code()
    }

    /// Response headers, when a response was received.
    #[must_use]
    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        self.raw.as_ref().map(RawResponse::headers)
    }

    /// Single response header value, looked up ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.as_ref().and_then(|raw| raw.header(name))
    }

    /// The request that was sent, when assembly succeeded.
    #[must_use]
    pub const fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// `true` when a raw response exists.
    #[must_use]
    pub const fn has_response(&self) -> bool {
        self.raw.is_some()
    }

    // ========================================================================
    // Body
    // ========================================================================

    /// Current body read state.
    #[must_use]
    pub const fn body_state(&self) -> BodyState {
        self.state
    }

    /// `true` once the body stream has been read.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.state == BodyState::Read
    }

    /// Read the whole body.
    ///
    /// The first call with a raw response pulls the transport's stream and
    /// caches the bytes; every later call returns the cache. Without a raw
    /// response the (empty) cache is returned.
    ///
    /// # Errors
    ///
    /// Returns the stream error of the first read. The state still moves to
    /// [`BodyState::Read`] so the stream is never polled twice. Read errors are
    /// not added to the response errors.
    pub fn read_all_body(&mut self) -> Result<Bytes> {
        if self.state == BodyState::Read {
            return Ok(self.body.clone());
        }
        let Some(raw) = self.raw.as_mut() else {
            return Ok(self.body.clone());
        };

        self.state = BodyState::Read;
        let body = raw.read_body()?;
        tracing::trace!(bytes = body.len(), "response body read");
        self.body = body;
        Ok(self.body.clone())
    }

    /// Body bytes; read errors yield whatever was cached.
    pub fn body(&mut self) -> Bytes {
        self.read_all_body()
            .unwrap_or_else(|_| self.body.clone())
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&mut self) -> String {
        String::from_utf8_lossy(&self.body()).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns a decode error on malformed input. Decode errors are returned
    /// only, never added to the response errors.
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let body = self.body();
        crate::from_json(&body)
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// The aggregated errors, or `None` when there are none.
    #[must_use]
    pub fn get_error(&self) -> Option<&ResponseError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(&self.errors)
        }
    }

    /// All error messages joined by newlines; empty when there are none.
    #[must_use]
    pub fn error(&self) -> String {
        self.errors.to_string()
    }

    /// The aggregate, possibly empty.
    #[must_use]
    pub const fn errors(&self) -> &ResponseError {
        &self.errors
    }

    /// Append an error. `None` is ignored.
    pub fn add_error(&mut self, error: impl Into<Option<Error>>) {
        self.errors.add(error);
    }

    /// `true` when no error was collected.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(self)` when no error was collected, the aggregate otherwise.
    ///
    /// # Errors
    ///
    /// Returns the aggregated errors if there is at least one.
    pub fn into_result(self) -> std::result::Result<Self, ResponseError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};

    use super::*;
    use crate::BodyStream;

    /// Body stream that counts how often it is read.
    struct CountingBody {
        reads: Arc<AtomicUsize>,
        data: &'static [u8],
    }

    impl BodyStream for CountingBody {
        fn read_all(&mut self) -> Result<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(self.data))
        }
    }

    struct BrokenBody;

    impl BodyStream for BrokenBody {
        fn read_all(&mut self) -> Result<Bytes> {
            Err(Error::body("connection reset"))
        }
    }

    fn counting(status: u16, data: &'static [u8]) -> (Response, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let raw = RawResponse::streaming(
            status,
            HashMap::new(),
            CountingBody {
                reads: Arc::clone(&reads),
                data,
            },
        );
        (Response::from_raw(None, raw), reads)
    }

    #[test]
    fn body_is_read_exactly_once() {
        let (mut response, reads) = counting(200, b"hello");
        check!(response.body_state() == BodyState::Unread);
        check!(reads.load(Ordering::SeqCst) == 0);

        let first = response.read_all_body().expect("first read");
        let second = response.read_all_body().expect("second read");
        let third = response.body();

        check!(reads.load(Ordering::SeqCst) == 1);
        check!(first == second);
        check!(second == third);
        check!(response.text() == "hello");
        check!(response.is_read());
    }

    #[test]
    fn no_raw_response() {
        let mut response = Response::failed(None, Error::connection("refused"));

        check!(response.status_code() == 0);
        check!(response.status() == 0);
        check!(response.body().is_empty());
        check!(response.read_all_body().expect("never errors").is_empty());
        check!(!response.is_read());
        check!(!response.has_response());
        check!(response.headers().is_none());
        check!(response.error() == "connection error: refused");
    }

    #[test]
    fn status_404_is_an_error_but_body_stays_readable() {
        let (mut response, _) = counting(404, b"no such user");

        let_assert!(Some(errors) = response.get_error());
        check!(errors.status() == Some(404));
        check!(response.error().contains("404"));
        check!(response.body().as_ref() == b"no such user");
    }

    #[test]
    fn status_below_400_is_not_an_error() {
        let (response, _) = counting(302, b"");
        check!(response.get_error().is_none());
        check!(response.error().is_empty());
        check!(response.is_ok());
    }

    #[test]
    fn json_decodes_without_touching_errors() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Payload {
            a: u32,
        }

        let (mut response, _) = counting(200, br#"{"a":1}"#);
        let payload: Payload = response.json().expect("decode");
        check!(payload == Payload { a: 1 });
        check!(response.get_error().is_none());
    }

    #[test]
    fn json_decode_error_is_not_aggregated() {
        let (mut response, _) = counting(200, b"{bad");
        let result = response.json::<serde_json::Value>();
        let_assert!(Err(Error::JsonDeserialization { .. }) = result);
        check!(response.get_error().is_none());

        let (mut response, _) = counting(500, b"{bad");
        let _ = response.json::<serde_json::Value>();
        check!(response.errors().len() == 1);
    }

    #[test]
    fn read_error_marks_body_read() {
        let raw = RawResponse::streaming(200, HashMap::new(), BrokenBody);
        let mut response = Response::from_raw(None, raw);

        let_assert!(Err(Error::Body(_)) = response.read_all_body());
        check!(response.is_read());
        check!(response.read_all_body().expect("cached").is_empty());
        check!(response.get_error().is_none());
    }

    #[test]
    fn add_error_appends_in_order() {
        let mut response = Response::failed(None, ResponseError::new());
        check!(response.get_error().is_none());

        response.add_error(None::<Error>);
        response.add_error(Error::Timeout);
        response.add_error(Error::connection("reset"));

        check!(response.errors().len() == 2);
        insta::assert_snapshot!(response.error(), @r"
        request timeout
        connection error: reset
        ");
    }

    #[test]
    fn into_result_splits_on_errors() {
        let (ok, _) = counting(200, b"");
        check!(ok.into_result().is_ok());

        let (failed, _) = counting(503, b"");
        let_assert!(Err(errors) = failed.into_result());
        check!(errors.to_string() == "http status code 503");
    }
}
