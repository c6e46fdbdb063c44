//! Dispatch arguments.
//!
//! [`Args`] names the three roles an [`Agent::send`](crate::Agent::send) call
//! can fill: a query, a body and a file. Each role is optional and an absent
//! role is a no-op. An explicit empty value (`{}`) is not absent: an empty
//! body is still encoded and sent.
//!
//! Values are captured through `serde` when the argument is built, so any
//! `Serialize` type fits. A serialization failure is kept and reported in
//! the response's errors, never raised on the spot.
//!
//! ```
//! use volley_core::{Args, FileUpload};
//!
//! let args = Args::new()
//!     .query(&serde_json::json!({"page": 2}))
//!     .body(&serde_json::json!({"title": "hello"}))
//!     .file(FileUpload::bytes("notes.txt", "..."));
//! assert!(args.has_file());
//! ```

use crate::body::Payload;
use crate::{FileUpload, Result};

/// The (query, body, file) triple of a dispatch call.
#[derive(Debug, Default)]
pub struct Args {
    query: Option<Result<String>>,
    body: Option<Result<Payload>>,
    file: Option<FileUpload>,
}

impl Args {
    /// No query, no body, no file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query role.
    ///
    /// A string is taken as an encoded query string; maps and structs are
    /// encoded. `None`/`()` leave the role absent.
    #[must_use]
    pub fn query<Q: serde::Serialize + ?Sized>(mut self, query: &Q) -> Self {
        self.query =
            Payload::capture(query).map(|captured| captured.and_then(Payload::into_query));
        self
    }

    /// Set the body role. `None`/`()` leave the role absent.
    #[must_use]
    pub fn body<B: serde::Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Payload::capture(body);
        self
    }

    /// Set the file role.
    #[must_use]
    pub fn file(mut self, file: impl Into<FileUpload>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// `true` when the query role is filled.
    #[must_use]
    pub const fn has_query(&self) -> bool {
        self.query.is_some()
    }

    /// `true` when the body role is filled.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// `true` when a file is attached.
    #[must_use]
    pub const fn has_file(&self) -> bool {
        self.file.is_some()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Option<Result<String>>,
        Option<Result<Payload>>,
        Option<FileUpload>,
    ) {
        (self.query, self.body, self.file)
    }
}
