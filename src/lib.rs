//! # httpentry
//!
//! An HTTP message normalization library.
//!
//! `httpentry` reconstructs consistent, queryable request data from the
//! raw, convention-laden material a server gateway hands to an
//! application: header lists in mixed casing and prefixing, rewrite-module
//! URI signals, shape-ambiguous upload descriptor trees, and already-open
//! body streams.
//!
//! ## Features
//!
//! - **Headers**: case-insensitive multi-value storage that preserves the
//!   supplied casing, with a Cache-Control directive map that can never
//!   drift from the header text
//! - **Request URI**: five gateway/proxy/rewrite conventions reconciled
//!   into one canonical URI plus the deployment base path
//! - **Streams**: one abstraction over file and memory handles, with
//!   cached capability flags classified from the open mode
//! - **Uploads**: raw descriptor trees normalized into single-use
//!   uploaded-file handles
//!
//! ## Quick Start
//!
//! ```rust
//! use httpentry::base::ParamBag;
//! use httpentry::headers::HeaderCollection;
//! use httpentry::uri::Uri;
//!
//! let mut server: ParamBag = [
//!     ("REQUEST_URI", "/app/users?page=2"),
//!     ("SCRIPT_NAME", "/app"),
//!     ("HTTP_HOST", "example.com"),
//! ]
//! .into_iter()
//! .collect();
//! let mut headers = HeaderCollection::from_server_params(&server);
//!
//! let uri = Uri::from_request(&mut headers, &mut server);
//! assert_eq!(uri.base_path(), "/app");
//! assert_eq!(uri.path(), "/users");
//! assert_eq!(uri.query(), "page=2");
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and the server-parameter bag
//! - [`headers`] - Header collection and Cache-Control directives
//! - [`message`] - The message base: protocol version, headers, body
//! - [`stream`] - Byte streams and the handles they wrap
//! - [`uri`] - URI value object and request-URI reconstruction
//! - [`uploads`] - Uploaded-file tree normalization
//!
//! Everything is synchronous and strictly single-threaded; the crate
//! models data already handed to it and performs no network I/O.

pub mod base;
pub mod headers;
pub mod message;
pub mod stream;
pub mod uploads;
pub mod uri;

pub use base::error::Error;
