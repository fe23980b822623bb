//! Base types and error handling.
//!
//! Provides the foundations the rest of the crate builds on:
//! - [`Error`]: the crate-wide error type
//! - [`ParamBag`]: plain case-insensitive key/value store for server
//!   parameters

pub mod bag;
pub mod error;

pub use bag::ParamBag;
pub use error::Error;
