//! Fluent, blocking HTTP request agent.
//!
//! Configure an [`Agent`] with chained calls, dispatch one request, then
//! read the lazy [`Response`]: the body is fetched on first access and
//! cached, and every failure along the way ends up in one aggregated error.
//!
//! # Example
//!
//! ```no_run
//! use serde::Deserialize;
//! use volley::{Agent, ContentType, HyperTransport};
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let transport = HyperTransport::new()?;
//! let mut response = Agent::new(&transport)
//!     .content_type(ContentType::Json)
//!     .header("Accept", "application/json")
//!     .cookie(("session", "abc"))
//!     .get("http://api.example.com/users/42", &());
//!
//! if let Some(errors) = response.get_error() {
//!     eprintln!("request failed (status {}):\n{errors}", response.status_code());
//! } else {
//!     let user: User = response.json()?;
//!     println!("{user:?}");
//! }
//! # Ok::<(), volley::Error>(())
//! ```

mod config;
mod connector;
mod logging;
pub mod prelude;
mod transport;

pub use config::{TransportConfig, TransportConfigBuilder};
pub use connector::{ProxyConnector, Proxied, https_connector};
pub use logging::{LogLevel, Logging, TransportExt};
pub use transport::{HyperTransport, HyperTransportBuilder};

// Re-export core types
pub use volley_core::{
    Agent, Args, BodyState, BodyStream, ContentType, Cookie, DEFAULT_USER_AGENT, Error,
    FILE_FIELD, FileUpload, Form, Method, Part, RawResponse, Request, RequestBuilder, Response,
    ResponseError, Result, Transport, TransportFn, from_json, to_form, to_json, to_query_string,
    transport_fn,
};

// Re-export http types for status codes and headers
pub use volley_core::{StatusCode, header};

/// Agent on a fresh [`HyperTransport`] with default configuration.
///
/// Each call starts a new transport. Share one transport with
/// `Agent::new(&transport)` when sending many requests.
///
/// # Errors
///
/// Returns an error if the transport runtime cannot be started.
pub fn agent() -> Result<Agent<HyperTransport>> {
    Ok(Agent::new(HyperTransport::new()?))
}
