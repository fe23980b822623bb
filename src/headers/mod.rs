//! Header normalization: the case-insensitive multi-value store and the
//! Cache-Control directive map derived from it.

pub mod cache_control;
pub mod collection;

pub use cache_control::{CacheControl, Directive};
pub use collection::{normalize_key, HeaderCollection, IntoHeaderValues};
