//! Assembled HTTP requests.
//!
//! A [`Request`] is the fully-specified description an [`Agent`](crate::Agent)
//! hands to a [`Transport`](crate::Transport): method, URL with the query
//! already merged, headers, encoded body and optional proxy.
//!
//! # Example
//!
//! ```
//! use volley_core::{Request, Method};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query_string("page=1")
//!     .build();
//! assert_eq!(request.url().as_str(), "https://api.example.com/?page=1");
//! ```

use std::collections::HashMap;

use bytes::Bytes;

use crate::Method;

/// An HTTP request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    proxy: Option<String>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method.clone()
    }

    /// Request URL, query included.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value, looked up ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Encoded request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Proxy URL, passed through unvalidated.
    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Query pairs of the URL, in order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    /// Consume into (method, url, headers, body, proxy).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Method,
        url::Url,
        HashMap<String, String>,
        Option<Bytes>,
        Option<String>,
    ) {
        (self.method, self.url, self.headers, self.body, self.proxy)
    }
}

/// Builder for [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    proxy: Option<String>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            proxy: None,
        }
    }

    /// Sets a header, replacing a previous value under the same name
    /// whatever its case.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        insert_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Current value of a header, looked up ignoring ASCII case.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Sets a header unless one with the same name (ignoring case) exists.
    #[must_use]
    pub fn default_header(self, name: &str, value: impl Into<String>) -> Self {
        if self.headers.keys().any(|key| key.eq_ignore_ascii_case(name)) {
            self
        } else {
            self.header(name, value)
        }
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            insert_header(&mut self.headers, name, value);
        }
        self
    }

    /// Appends an encoded query string (`a=1&b=2`) to the URL.
    ///
    /// Existing pairs are kept; a key present in both ends up twice.
    #[must_use]
    pub fn query_string(mut self, query: &str) -> Self {
        if query.is_empty() {
            return self;
        }
        {
            let mut pairs = self.url.query_pairs_mut();
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                pairs.append_pair(&name, &value);
            }
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Routes the request through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            proxy: self.proxy,
        }
    }
}

/// Insert a header, dropping any entry whose name differs only in case.
pub(crate) fn insert_header(headers: &mut HashMap<String, String>, name: String, value: String) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
