//! Prelude module for convenient imports.
//!
//! ```ignore
//! use volley_core::prelude::*;
//! ```

pub use crate::{
    Agent, Args, ContentType, Cookie, Error, FileUpload, Method, RawResponse, Request, Response,
    ResponseError, Result, Transport,
};
