//! Prelude module for convenient imports.
//!
//! ```ignore
//! use volley::prelude::*;
//! ```

pub use crate::{
    Agent, Args, ContentType, Cookie, Error, FileUpload, HyperTransport, Method, Response,
    ResponseError, Result, Transport, TransportExt,
};

// Re-export serde for derive macros
pub use serde::{Deserialize, Serialize};
