//! The fluent request agent.
//!
//! An [`Agent`] accumulates configuration through chained calls, then a
//! single dispatch call assembles the [`Request`], runs it through the
//! [`Transport`] and wraps the outcome in a [`Response`].
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use volley_core::{Agent, RawResponse, Request, transport_fn};
//!
//! let transport = transport_fn(|request: Request| {
//!     Ok(RawResponse::new(200, HashMap::new(), request.url().to_string()))
//! });
//!
//! let mut response = Agent::new(transport)
//!     .header("Accept", "application/json")
//!     .query(&[("r", "2")].into_iter().collect::<HashMap<_, _>>())
//!     .get("http://example.com/search", &[("q", "1")].into_iter().collect::<HashMap<_, _>>());
//!
//! assert!(response.get_error().is_none());
//! assert_eq!(response.text(), "http://example.com/search?q=1&r=2");
//! ```

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::body::Payload;
use crate::request::insert_header;
use crate::{
    Args, ContentType, Cookie, Error, FileUpload, Form, Method, Request, Response, ResponseError,
    Result, Transport, cookie,
};

/// User agent sent when none is configured: desktop Chrome 75.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.100 Safari/537.36";

/// Chainable request configuration bound to a transport.
///
/// Configuration calls consume and return the agent. Dispatch calls consume
/// it for good, so an agent issues at most one request.
///
/// Nothing is validated while configuring: bad header names or proxy URLs
/// are rejected by the transport, and serialization failures are reported
/// in the [`Response`] errors.
#[derive(Debug)]
pub struct Agent<T> {
    transport: T,
    headers: HashMap<String, String>,
    queries: Vec<Result<String>>,
    content_type: ContentType,
    user_agent: String,
    cookies: Vec<Cookie>,
    proxy: Option<String>,
}

impl<T> Agent<T> {
    /// Create an agent with the default content type (`json`) and user agent.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            headers: HashMap::new(),
            queries: Vec::new(),
            content_type: ContentType::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookies: Vec::new(),
            proxy: None,
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Set the body content type. A file upload overrides it with multipart.
    #[must_use]
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the `User-Agent`. An explicit `User-Agent` header takes precedence.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn cookie(mut self, cookie: impl Into<Cookie>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// Set a header, replacing any previous value for the same name,
    /// compared ignoring ASCII case.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        insert_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Route the request through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Add a query fragment.
    ///
    /// Fragments accumulate in call order and are appended after the query
    /// given to the dispatch call; none of them overwrites another.
    #[must_use]
    pub fn query<Q: serde::Serialize + ?Sized>(mut self, query: &Q) -> Self {
        if let Some(captured) = Payload::capture(query) {
            self.queries.push(captured.and_then(Payload::into_query));
        }
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Configured headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Number of accumulated query fragments.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Current content type.
    #[must_use]
    pub const fn current_content_type(&self) -> ContentType {
        self.content_type
    }

    /// Current user agent.
    #[must_use]
    pub fn current_user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Accumulated cookies.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Configured proxy.
    #[must_use]
    pub fn current_proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// The transport this agent dispatches through.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Agent<T> {
    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Assemble and send the request.
    ///
    /// Any method fits, including extension methods through
    /// [`Method::Custom`].
    ///
    /// The query from `args` is applied first, then every fragment added
    /// with [`Agent::query`]. A file switches the content type to multipart.
    ///
    /// Always returns a [`Response`]; failures are collected in its errors.
    /// When assembly fails (unparsable URL, serialization error, unreadable
    /// file) the transport is not called.
    pub fn send(mut self, method: Method, url: &str, args: Args) -> Response {
        let (query, body, file) = args.into_parts();
        if file.is_some() {
            self.content_type = ContentType::Multipart;
        }

        debug!(
            %method,
            url,
            content_type = self.content_type.name(),
            "dispatching request"
        );

        let request = match self.assemble(method.clone(), url, query, body, file) {
            Ok(request) => request,
            Err(errors) => {
                warn!(%method, url, %errors, "request assembly failed");
                return Response::failed(None, errors);
            }
        };

        let start = Instant::now();
        let response = match self.transport.execute(request.clone()) {
            Ok(raw) => Response::from_raw(Some(request), raw),
            Err(err) => Response::failed(Some(request), err),
        };
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let status = response.status_code();
        match response.get_error() {
            None => info!(%method, url, status, elapsed_ms, "request completed"),
            Some(errors) => warn!(%method, url, status, elapsed_ms, %errors, "request failed"),
        }

        response
    }

    /// `HEAD` with a query.
    pub fn head<Q: serde::Serialize + ?Sized>(self, url: &str, query: &Q) -> Response {
        self.send(Method::Head, url, Args::new().query(query))
    }

    /// `GET` with a query.
    pub fn get<Q: serde::Serialize + ?Sized>(self, url: &str, query: &Q) -> Response {
        self.send(Method::Get, url, Args::new().query(query))
    }

    /// `OPTIONS` with a query.
    pub fn options<Q: serde::Serialize + ?Sized>(self, url: &str, query: &Q) -> Response {
        self.send(Method::Options, url, Args::new().query(query))
    }

    /// `POST` with a body.
    pub fn post<B: serde::Serialize + ?Sized>(self, url: &str, body: &B) -> Response {
        self.send(Method::Post, url, Args::new().body(body))
    }

    /// `PUT` with a body.
    pub fn put<B: serde::Serialize + ?Sized>(self, url: &str, body: &B) -> Response {
        self.send(Method::Put, url, Args::new().body(body))
    }

    /// `DELETE` with a body.
    pub fn del<B: serde::Serialize + ?Sized>(self, url: &str, body: &B) -> Response {
        self.send(Method::Delete, url, Args::new().body(body))
    }

    /// `PATCH` with a body.
    pub fn patch<B: serde::Serialize + ?Sized>(self, url: &str, body: &B) -> Response {
        self.send(Method::Patch, url, Args::new().body(body))
    }

    /// Multipart file upload.
    ///
    /// Note: this sends a `PUT`, exactly like [`Agent::put_file`]. Use
    /// [`Agent::send`] with [`Method::Post`] for a real `POST` upload.
    pub fn post_file<B: serde::Serialize + ?Sized>(
        self,
        url: &str,
        file: impl Into<FileUpload>,
        body: &B,
    ) -> Response {
        // TODO: switch to Method::Post once callers relying on PUT are migrated.
        self.send(Method::Put, url, Args::new().body(body).file(file))
    }

    /// Multipart file upload with `PUT`.
    pub fn put_file<B: serde::Serialize + ?Sized>(
        self,
        url: &str,
        file: impl Into<FileUpload>,
        body: &B,
    ) -> Response {
        self.send(Method::Put, url, Args::new().body(body).file(file))
    }

    // ========================================================================
    // Assembly
    // ========================================================================

    fn assemble(
        &mut self,
        method: Method,
        url: &str,
        query: Option<Result<String>>,
        body: Option<Result<Payload>>,
        file: Option<FileUpload>,
    ) -> std::result::Result<Request, ResponseError> {
        let mut errors = ResponseError::new();

        let url = url::Url::parse(url)
            .map_err(|err| errors.add(Error::from(err)))
            .ok();

        let mut query_strings = Vec::new();
        for captured in query.into_iter().chain(self.queries.drain(..)) {
            match captured {
                Ok(query) => query_strings.push(query),
                Err(err) => errors.add(err),
            }
        }

        let encoded = match self.encode_body(body, file) {
            Ok(encoded) => encoded,
            Err(body_errors) => {
                errors.extend(body_errors);
                None
            }
        };

        let Some(url) = url else {
            return Err(errors);
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut builder = Request::builder(method, url)
            .headers(std::mem::take(&mut self.headers))
            .default_header("User-Agent", self.user_agent.as_str());
        for query in &query_strings {
            builder = builder.query_string(query);
        }
        if let Some(cookies) = cookie::header_value(&self.cookies) {
            let merged = match builder.header_value("Cookie") {
                Some(existing) => format!("{existing}; {cookies}"),
                None => cookies,
            };
            builder = builder.header("Cookie", merged);
        }
        if let Some(proxy) = self.proxy.take() {
            builder = builder.proxy(proxy);
        }
        if let Some((content_type, bytes)) = encoded {
            builder = if self.content_type == ContentType::Multipart {
                builder.header("Content-Type", content_type)
            } else {
                builder.default_header("Content-Type", content_type)
            };
            builder = builder.body(bytes);
        }

        Ok(builder.build())
    }

    /// Encode the body, returning the `Content-Type` value and the bytes.
    fn encode_body(
        &self,
        body: Option<Result<Payload>>,
        file: Option<FileUpload>,
    ) -> std::result::Result<Option<(String, Bytes)>, ResponseError> {
        let mut errors = ResponseError::new();

        if self.content_type != ContentType::Multipart {
            return match body {
                None => Ok(None),
                Some(captured) => captured
                    .and_then(|payload| self.content_type.encode(payload))
                    .map(|bytes| Some((self.content_type.as_str().to_string(), bytes)))
                    .map_err(ResponseError::from),
            };
        }

        if body.is_none() && file.is_none() {
            return Ok(None);
        }

        let mut form = Form::new();
        if let Some(captured) = body {
            if let Err(err) = captured.and_then(|payload| form.add_payload(payload)) {
                errors.add(err);
            }
        }
        if let Some(file) = file {
            match file.into_part() {
                Ok(part) => form = form.part(part),
                Err(err) => errors.add(err),
            }
        }

        if errors.is_empty() {
            Ok(Some(form.into_body()))
        } else {
            Err(errors)
        }
    }
}
