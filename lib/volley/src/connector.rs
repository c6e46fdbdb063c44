//! Connectors: HTTPS via rustls, and plain HTTP forward proxying.
//!
//! A proxied request opens its connection to the proxy instead of the
//! target. The connection is flagged as proxied so the hyper client writes
//! the request line in absolute form (`GET http://host/path HTTP/1.1`).
//! `CONNECT` tunnels are not supported, so `https` targets are rejected
//! before any connection is attempted.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use tower_service::Service;

use crate::{Error, Result, TransportConfig};

/// Create an HTTPS connector with rustls.
///
/// Plain `http` URLs are allowed too. TLS is verified against the Mozilla
/// root certificates.
#[must_use]
pub fn https_connector(config: &TransportConfig) -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(config.connect_timeout));

    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let builder = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1();

    if config.http2 {
        builder.enable_http2().wrap_connector(http)
    } else {
        builder.wrap_connector(http)
    }
}

/// Validate a proxy URL for the given target.
pub(crate) fn proxy_uri(proxy: &str, target: &url::Url) -> Result<Uri> {
    if target.scheme() == "https" {
        return Err(Error::invalid_request(format!(
            "cannot send {target} through proxy {proxy}: only http targets can be proxied"
        )));
    }

    let uri: Uri = proxy
        .parse()
        .map_err(|err| Error::invalid_request(format!("invalid proxy URL {proxy:?}: {err}")))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::invalid_request(format!(
            "invalid proxy URL {proxy:?}: scheme and host are required"
        )));
    }

    Ok(uri)
}

/// Connector that dials a fixed proxy whatever the destination.
#[derive(Debug, Clone)]
pub struct ProxyConnector<C> {
    inner: C,
    proxy: Uri,
}

impl<C> ProxyConnector<C> {
    /// Route every connection of `inner` to `proxy`.
    pub const fn new(inner: C, proxy: Uri) -> Self {
        Self { inner, proxy }
    }

    /// The proxy address.
    pub const fn proxy(&self) -> &Uri {
        &self.proxy
    }
}

impl<C> Service<Uri> for ProxyConnector<C>
where
    C: Service<Uri>,
    C::Future: Send + 'static,
{
    type Response = Proxied<C::Response>;
    type Error = C::Error;
    type Future =
        Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, _destination: Uri) -> Self::Future {
        let connecting = self.inner.call(self.proxy.clone());
        Box::pin(async move { connecting.await.map(Proxied) })
    }
}

/// A stream connected to a proxy.
#[derive(Debug)]
pub struct Proxied<T>(T);

impl<T: Connection> Connection for Proxied<T> {
    fn connected(&self) -> Connected {
        self.0.connected().proxy(true)
    }
}

impl<T: Read + Unpin> Read for Proxied<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

impl<T: Write + Unpin> Write for Proxied<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.0.is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write_vectored(cx, bufs)
    }
}
