//! The transport seam.
//!
//! - [`Transport`] - executes an assembled [`Request`]
//! - [`RawResponse`] - status, headers and an unread [`BodyStream`]
//!
//! `volley` ships a hyper/rustls implementation. Implement [`Transport`]
//! directly for custom stacks, or wrap a closure with [`transport_fn`]:
//!
//! ```
//! use volley_core::{RawResponse, Request, Transport, transport_fn};
//!
//! let transport = transport_fn(|_request: Request| {
//!     Ok(RawResponse::new(204, Default::default(), ""))
//! });
//! let _ = &transport as &dyn Transport;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Request, Result};

/// Executes HTTP requests.
///
/// Implementations block until the response head is available. The body is
/// left unread in the returned [`RawResponse`].
pub trait Transport {
    /// Send the request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or no response head
    /// was received:
    /// - Invalid request (bad header, unsupported proxy, ...)
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(&self, request: Request) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: Request) -> Result<RawResponse> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: Request) -> Result<RawResponse> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: Request) -> Result<RawResponse> {
        (**self).execute(request)
    }
}

/// Transport backed by a closure, see [`transport_fn`].
#[derive(Clone, Copy)]
pub struct TransportFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for TransportFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportFn").finish_non_exhaustive()
    }
}

impl<F> Transport for TransportFn<F>
where
    F: Fn(Request) -> Result<RawResponse>,
{
    fn execute(&self, request: Request) -> Result<RawResponse> {
        (self.f)(request)
    }
}

/// Use a closure as a [`Transport`].
pub const fn transport_fn<F>(f: F) -> TransportFn<F>
where
    F: Fn(Request) -> Result<RawResponse>,
{
    TransportFn { f }
}

// ============================================================================
// Body stream
// ============================================================================

/// A response body that has not been read yet.
pub trait BodyStream: Send {
    /// Read the remaining body to the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream fails.
    fn read_all(&mut self) -> Result<Bytes>;
}

impl BodyStream for Bytes {
    fn read_all(&mut self) -> Result<Bytes> {
        Ok(std::mem::take(self))
    }
}

// ============================================================================
// Raw response
// ============================================================================

/// Response head plus an unread body, as produced by a [`Transport`].
pub struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Box<dyn BodyStream>,
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl RawResponse {
    /// Response with an in-memory body.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self::streaming(status, headers, body.into())
    }

    /// Response whose body is read lazily from `body`.
    #[must_use]
    pub fn streaming(
        status: u16,
        headers: HashMap<String, String>,
        body: impl BodyStream + 'static,
    ) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value, looked up ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Read the whole body from the stream.
    pub(crate) fn read_body(&mut self) -> Result<Bytes> {
        self.body.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    #[test]
    fn bytes_body_drains_once() {
        let mut body = Bytes::from("payload");
        assert_eq!(body.read_all().expect("read").as_ref(), b"payload");
        assert!(body.read_all().expect("read").is_empty());
    }

    #[test]
    fn raw_response_header_lookup_ignores_case() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        let response = RawResponse::new(200, headers, "ok");

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert!(format!("{response:?}").contains("RawResponse"));
    }

    #[test]
    fn closure_is_a_transport() {
        let transport = transport_fn(|request: Request| {
            Ok(RawResponse::new(
                200,
                HashMap::new(),
                request.url().path().to_string(),
            ))
        });

        let request = Request::builder(
            Method::Get,
            url::Url::parse("http://x/echo").expect("url"),
        )
        .build();
        let mut response = transport.execute(request).expect("response");
        assert_eq!(response.read_body().expect("body").as_ref(), b"/echo");
    }
}
