//! Request/response logging for any [`Transport`].
//!
//! Events go through the `tracing` crate inside an `http_request` span.

use std::time::Instant;

use tracing::{Level, debug, info, span, warn};

use crate::{RawResponse, Request, Result, Transport};

/// Log level for [`Logging`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (headers, proxy and body size).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Transport decorator that logs each exchange.
///
/// # Example
///
/// ```no_run
/// use volley::{Agent, HyperTransport, TransportExt};
///
/// let transport = HyperTransport::new()?.with_logging();
/// let response = Agent::new(&transport).get("http://example.com/", &());
/// # Ok::<(), volley::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Logging<T> {
    inner: T,
    level: LogLevel,
}

impl<T> Logging<T> {
    /// Wrap `inner`, logging at info level.
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            level: LogLevel::Info,
        }
    }

    /// Wrap `inner`, logging at debug level.
    pub const fn debug(inner: T) -> Self {
        Self {
            inner,
            level: LogLevel::Debug,
        }
    }

    /// Current log level.
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// The wrapped transport.
    pub const fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for Logging<T> {
    fn execute(&self, request: Request) -> Result<RawResponse> {
        let method = request.method();
        let url = request.url().to_string();

        let span = span!(Level::INFO, "http_request", %method, %url);
        let _entered = span.enter();

        match self.level {
            LogLevel::Debug => {
                debug!(
                    headers = ?request.headers(),
                    proxy = ?request.proxy(),
                    body_len = request.body().map_or(0, |body| body.len()),
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!("sending request");
            }
        }

        let start = Instant::now();
        let result = self.inner.execute(request);

        // Saturating conversion to u64 (truncates after ~584 million years)
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => {
                let status = response.status();
                if status < 400 {
                    info!(status, elapsed_ms, "response received");
                } else {
                    warn!(status, elapsed_ms, "response received with HTTP error");
                }
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms, "request failed");
            }
        }

        result
    }
}

/// Extension methods for transports.
pub trait TransportExt: Transport + Sized {
    /// Log every exchange at info level.
    fn with_logging(self) -> Logging<Self> {
        Logging::new(self)
    }

    /// Log every exchange at debug level, headers included.
    fn with_debug_logging(self) -> Logging<Self> {
        Logging::debug(self)
    }
}

impl<T: Transport> TransportExt for T {}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use volley_core::transport_fn;

    use super::*;
    use crate::{Error, Method};

    fn request() -> Request {
        Request::builder(
            Method::Get,
            url::Url::parse("http://x/logged").expect("url"),
        )
        .build()
    }

    #[test]
    fn logging_default_level() {
        let transport = transport_fn(|_: Request| Ok(RawResponse::new(200, HashMap::new(), "")));
        check_level(&transport.with_logging(), LogLevel::Info);
        check_level(&Logging::debug(()), LogLevel::Debug);
    }

    fn check_level<T>(logging: &Logging<T>, expected: LogLevel) {
        assert_eq!(logging.level(), expected);
    }

    #[test]
    fn passes_responses_and_errors_through() {
        let ok = transport_fn(|_: Request| Ok(RawResponse::new(503, HashMap::new(), "down")))
            .with_debug_logging();
        let response = ok.execute(request()).expect("response");
        assert_eq!(response.status(), 503);

        let failing =
            transport_fn(|_: Request| Err(Error::connection("refused"))).with_logging();
        let err = failing.execute(request()).expect_err("error");
        assert!(err.is_connection());
    }
}
