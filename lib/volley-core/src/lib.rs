//! Core types and traits for volley, a fluent HTTP request agent.
//!
//! This crate provides the transport-agnostic pieces:
//! - [`Agent`] - chainable request configuration and dispatch
//! - [`Args`] - the (query, body, file) roles of a dispatch call
//! - [`Response`] - lazy response wrapper with a read-once body cache
//! - [`Error`], [`ResponseError`] and [`Result`] - error handling
//! - [`Transport`] and [`RawResponse`] - the seam to the HTTP stack
//! - [`Request`] and [`RequestBuilder`] - assembled requests
//! - [`ContentType`], [`Form`] and [`FileUpload`] - body encoding
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod agent;
mod args;
mod body;
mod cookie;
mod error;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use agent::{Agent, DEFAULT_USER_AGENT};
pub use args::Args;
pub use body::{ContentType, from_json, to_form, to_json, to_query_string};
pub use cookie::Cookie;
pub use error::{Error, ResponseError, Result};
pub use method::Method;
pub use multipart::{DEFAULT_FILENAME, FILE_FIELD, FileUpload, Form, Part};
pub use request::{Request, RequestBuilder};
pub use response::{BodyState, Response};
pub use transport::{BodyStream, RawResponse, Transport, TransportFn, transport_fn};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
