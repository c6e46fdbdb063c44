//! Blocking HTTP transport on hyper-util.
//!
//! The hyper client is asynchronous; [`HyperTransport`] owns a private
//! current-thread tokio runtime and blocks on it for the response head. The
//! body is left in the connection until the [`Response`](crate::Response)
//! reads it.
//!
//! Calling [`HyperTransport::execute`] from inside an async runtime panics,
//! as blocking would stall that runtime. Wrap calls in
//! `tokio::task::spawn_blocking` there.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{
        Client,
        connect::{Connect, HttpConnector},
    },
    rt::TokioExecutor,
};
use tokio::runtime::Runtime;
use tracing::{debug, trace};
use volley_core::{BodyStream, RawResponse, Transport};

use crate::connector::{ProxyConnector, https_connector, proxy_uri};
use crate::{Error, Method, Request, Result, TransportConfig, TransportConfigBuilder};

type DirectClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP transport with TLS (rustls) and HTTP forward proxy support.
///
/// Cloning is cheap: clones share the runtime and the connection pool.
///
/// # Example
///
/// ```no_run
/// use volley::{Agent, HyperTransport};
///
/// let transport = HyperTransport::new()?;
/// let mut response = Agent::new(&transport).get("http://example.com/", &());
/// println!("{} {}", response.status_code(), response.text());
/// # Ok::<(), volley::Error>(())
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    direct: DirectClient,
    runtime: Arc<Runtime>,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal runtime cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal runtime cannot be started.
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let direct = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(&config));

        Ok(Self {
            direct,
            runtime: Arc::new(runtime),
            config,
        })
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Build a hyper request from a volley request.
    fn build_hyper_request(
        method: Method,
        url: &url::Url,
        headers: &HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Result<http::Request<Full<Bytes>>> {
        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn send<C>(
        client: &Client<C, Full<Bytes>>,
        request: http::Request<Full<Bytes>>,
        timeout: Duration,
    ) -> Result<http::Response<Incoming>>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        tokio::time::timeout(timeout, client.request(request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Transport for HyperTransport {
    fn execute(&self, request: Request) -> Result<RawResponse> {
        let (method, url, headers, body, proxy) = request.into_parts();
        let proxy = proxy
            .map(|proxy| proxy_uri(&proxy, &url))
            .transpose()?;
        let hyper_request = Self::build_hyper_request(method, &url, &headers, body)?;
        let timeout = self.config.timeout;

        let response = self.runtime.block_on(async {
            match proxy {
                Some(proxy) => {
                    debug!(%url, %proxy, "sending through proxy");
                    let connector = ProxyConnector::new(https_connector(&self.config), proxy);
                    let client = Client::builder(TokioExecutor::new()).build(connector);
                    Self::send(&client, hyper_request, timeout).await
                }
                None => Self::send(&self.direct, hyper_request, timeout).await,
            }
        })?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());
        trace!(status, headers = response_headers.len(), "response head received");

        let body = HyperBody {
            body: Some(response.into_body()),
            runtime: Arc::clone(&self.runtime),
            timeout: self.config.body_timeout(),
        };
        Ok(RawResponse::streaming(status, response_headers, body))
    }
}

/// Body still held by the connection, collected on demand.
struct HyperBody {
    body: Option<Incoming>,
    runtime: Arc<Runtime>,
    timeout: Duration,
}

impl BodyStream for HyperBody {
    fn read_all(&mut self) -> Result<Bytes> {
        let Some(body) = self.body.take() else {
            return Ok(Bytes::new());
        };

        let collected = self
            .runtime
            .block_on(tokio::time::timeout(self.timeout, body.collect()))
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::body(e.to_string()))?;
        Ok(collected.to_bytes())
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use volley::HyperTransport;
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(5))
///     .connect_timeout(Duration::from_secs(2))
///     .build()?;
/// # Ok::<(), volley::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct HyperTransportBuilder {
    config: TransportConfigBuilder,
}

impl HyperTransportBuilder {
    /// Set the response head timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the body read timeout.
    #[must_use]
    pub fn body_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.body_timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Restrict TLS connections to HTTP/1.1.
    #[must_use]
    pub fn http1_only(mut self) -> Self {
        self.config = self.config.http1_only();
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal runtime cannot be started.
    pub fn build(self) -> Result<HyperTransport> {
        HyperTransport::with_config(self.config.build())
    }
}
