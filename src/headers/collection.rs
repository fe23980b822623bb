//! Case-insensitive, multi-valued header storage.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::base::bag::ParamBag;
use crate::base::error::Error;
use crate::headers::cache_control::{CacheControl, Directive};

const CACHE_CONTROL: &str = "cache-control";

/// Server-parameter names that carry header data without the `HTTP_` prefix.
const UNPREFIXED_HEADER_PARAMS: [&str; 6] = [
    "CONTENT_TYPE",
    "CONTENT_LENGTH",
    "PHP_AUTH_USER",
    "PHP_AUTH_PW",
    "PHP_AUTH_DIGEST",
    "AUTH_TYPE",
];

/// Normalize a header name for lookup: ASCII lowercase, `_` becomes `-`,
/// one leading `http-` segment is dropped.
///
/// `X-Foo`, `x_foo` and `HTTP_X_FOO` all normalize to `x-foo`.
pub fn normalize_key(key: &str) -> String {
    let normalized = key.to_ascii_lowercase().replace('_', "-");
    match normalized.strip_prefix("http-") {
        Some(stripped) => stripped.to_owned(),
        None => normalized,
    }
}

fn title_case(key: &str) -> String {
    key.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Conversion into a list of header values.
///
/// Lets the mutator methods accept a single value or a sequence with one
/// signature, the way headers arrive from gateway data.
pub trait IntoHeaderValues {
    fn into_values(self) -> Vec<String>;
}

impl IntoHeaderValues for &str {
    fn into_values(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoHeaderValues for String {
    fn into_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoHeaderValues for &String {
    fn into_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<T: Into<String>> IntoHeaderValues for Vec<T> {
    fn into_values(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<String> + Clone> IntoHeaderValues for &[T] {
    fn into_values(self) -> Vec<String> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<T: Into<String>, const N: usize> IntoHeaderValues for [T; N] {
    fn into_values(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    /// Name as the caller last supplied it.
    original: String,
    values: Vec<String>,
}

/// A case-insensitive, multi-valued header store.
///
/// Values are kept in insertion order under a normalized name (see
/// [`normalize_key`]); the original casing of the name is preserved for
/// display. The `Cache-Control` header is special: only its parsed
/// directive map is stored, and the header text is re-serialized from the
/// map whenever it is read, so the two views cannot drift apart.
#[derive(Debug, Clone, Default)]
pub struct HeaderCollection {
    entries: BTreeMap<String, HeaderEntry>,
    cache_control: CacheControl,
    /// Casing of the cache-control name as last supplied.
    cache_control_key: Option<String>,
}

impl HeaderCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from gateway server parameters.
    ///
    /// Takes every `HTTP_*` key, plus the handful of header-bearing keys
    /// gateways pass without the prefix (`CONTENT_TYPE`, `CONTENT_LENGTH`
    /// and the auth keys).
    pub fn from_server_params(params: &ParamBag) -> Self {
        let mut collection = HeaderCollection::new();
        for (key, value) in params.iter() {
            let upper = key.to_ascii_uppercase();
            if upper.starts_with("HTTP_") || UNPREFIXED_HEADER_PARAMS.contains(&upper.as_str()) {
                collection.set(key, value);
            }
        }
        collection
    }

    /// Set a header, merging positionally with any existing values.
    ///
    /// The result has `max(old.len(), new.len())` values; index `i` takes
    /// `new[i]` when present, else keeps `old[i]`. An empty value list
    /// removes the header; an empty string is a legal stored value.
    pub fn set(&mut self, key: &str, values: impl IntoHeaderValues) {
        let new = values.into_values();
        if new.is_empty() {
            self.remove(key);
            return;
        }
        let merged = match self.get(key) {
            Some(old) => merge_positional(old, new),
            None => new,
        };
        self.store(key, merged);
    }

    /// Set a header, discarding any existing values outright.
    pub fn insert(&mut self, key: &str, values: impl IntoHeaderValues) {
        let values = values.into_values();
        if values.is_empty() {
            self.remove(key);
            return;
        }
        self.store(key, values);
    }

    /// Append value(s) after the header's existing values, creating the
    /// header if absent. An empty value list is a no-op.
    pub fn add(&mut self, key: &str, values: impl IntoHeaderValues) {
        let new = values.into_values();
        if new.is_empty() {
            return;
        }
        let mut combined = self.get(key).unwrap_or_default();
        combined.extend(new);
        self.store(key, combined);
    }

    /// Append per entry, the map form of [`add`](Self::add).
    pub fn extend<K, V, I>(&mut self, pairs: I)
    where
        K: AsRef<str>,
        V: IntoHeaderValues,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, values) in pairs {
            self.add(key.as_ref(), values);
        }
    }

    /// Drop everything and set the given headers.
    pub fn replace_all<K, V, I>(&mut self, pairs: I)
    where
        K: AsRef<str>,
        V: IntoHeaderValues,
        I: IntoIterator<Item = (K, V)>,
    {
        self.entries.clear();
        self.cache_control.clear();
        self.cache_control_key = None;
        for (key, values) in pairs {
            self.set(key.as_ref(), values);
        }
    }

    // Single write path for everything but removal. The cache-control
    // header is never stored as text: its joined value is parsed into the
    // directive map, which later reads re-serialize.
    fn store(&mut self, key: &str, values: Vec<String>) {
        let normalized = normalize_key(key);
        if normalized == CACHE_CONTROL {
            self.cache_control = CacheControl::parse(&values.join(", "));
            self.cache_control_key = Some(key.to_owned());
            return;
        }
        self.entries.insert(
            normalized,
            HeaderEntry {
                original: key.to_owned(),
                values,
            },
        );
    }

    /// The header's values, or `None` when absent.
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        let normalized = normalize_key(key);
        if normalized == CACHE_CONTROL {
            if self.cache_control.is_empty() {
                return None;
            }
            return Some(vec![self.cache_control.to_string()]);
        }
        self.entries.get(&normalized).map(|e| e.values.clone())
    }

    /// The header's first value, or `None` when absent.
    pub fn first(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|mut values| {
            if values.is_empty() {
                None
            } else {
                Some(values.remove(0))
            }
        })
    }

    /// Parse the header's first value. `None` when the header is absent or
    /// the value does not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.first(key).and_then(|v| v.trim().parse().ok())
    }

    /// Parse the header's first value as an RFC 2822 date.
    ///
    /// An absent header is `Ok(None)`; a present but malformed value is an
    /// error. The obsolete `GMT` and `UT` zone names are accepted.
    pub fn get_date(&self, key: &str) -> Result<Option<OffsetDateTime>, Error> {
        let Some(value) = self.first(key) else {
            return Ok(None);
        };
        let text = value.trim();
        let normalized = match text.strip_suffix(" GMT").or_else(|| text.strip_suffix(" UT")) {
            Some(stripped) => format!("{stripped} +0000"),
            None => text.to_owned(),
        };
        OffsetDateTime::parse(&normalized, &Rfc2822)
            .map(Some)
            .map_err(|source| Error::MalformedDate {
                key: key.to_owned(),
                value,
                source,
            })
    }

    /// Is the header present?
    pub fn has(&self, key: &str) -> bool {
        let normalized = normalize_key(key);
        if normalized == CACHE_CONTROL {
            return !self.cache_control.is_empty();
        }
        self.entries.contains_key(&normalized)
    }

    /// Remove the header, returning its values if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let normalized = normalize_key(key);
        if normalized == CACHE_CONTROL {
            if self.cache_control.is_empty() {
                return None;
            }
            let text = self.cache_control.to_string();
            self.cache_control.clear();
            self.cache_control_key = None;
            return Some(vec![text]);
        }
        self.entries.remove(&normalized).map(|e| e.values)
    }

    /// The header's name as it was originally supplied.
    pub fn get_original_key(&self, key: &str) -> Option<&str> {
        let normalized = normalize_key(key);
        if normalized == CACHE_CONTROL {
            if self.cache_control.is_empty() {
                return None;
            }
            return Some(self.cache_control_key.as_deref().unwrap_or("Cache-Control"));
        }
        self.entries.get(&normalized).map(|e| e.original.as_str())
    }

    /// All headers as original-name → values.
    pub fn all(&self) -> BTreeMap<String, Vec<String>> {
        self.rows()
            .into_iter()
            .map(|(_, original, values)| (original, values))
            .collect()
    }

    /// Iterate over `(original name, values)` pairs, sorted by normalized
    /// name.
    pub fn iter(&self) -> impl Iterator<Item = (String, Vec<String>)> {
        self.rows()
            .into_iter()
            .map(|(_, original, values)| (original, values))
    }

    /// Normalized header names, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        if !self.cache_control.is_empty() {
            if let Err(pos) = keys.binary_search_by(|k| k.as_str().cmp(CACHE_CONTROL)) {
                keys.insert(pos, CACHE_CONTROL.to_owned());
            }
        }
        keys
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(!self.cache_control.is_empty())
    }

    /// True when no headers are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.cache_control.is_empty()
    }

    /// Read-only view of the Cache-Control directive map.
    pub fn cache_control(&self) -> &CacheControl {
        &self.cache_control
    }

    /// Insert or overwrite a Cache-Control directive. The header text seen
    /// through `get`/`all` reflects the change immediately.
    pub fn add_cache_control_directive(&mut self, name: &str, directive: impl Into<Directive>) {
        self.cache_control.insert(name, directive);
        if self.cache_control_key.is_none() {
            self.cache_control_key = Some(String::from("Cache-Control"));
        }
    }

    /// Remove a Cache-Control directive; removing the last one removes the
    /// header.
    pub fn remove_cache_control_directive(&mut self, name: &str) {
        self.cache_control.remove(name);
        if self.cache_control.is_empty() {
            self.cache_control_key = None;
        }
    }

    /// Is the named Cache-Control directive present?
    pub fn has_cache_control_directive(&self, name: &str) -> bool {
        self.cache_control.has(name)
    }

    /// Look up a Cache-Control directive.
    pub fn get_cache_control_directive(&self, name: &str) -> Option<&Directive> {
        self.cache_control.get(name)
    }

    fn synthesized_cache_control(&self) -> Option<(String, Vec<String>)> {
        if self.cache_control.is_empty() {
            return None;
        }
        let key = self
            .cache_control_key
            .clone()
            .unwrap_or_else(|| String::from("Cache-Control"));
        Some((key, vec![self.cache_control.to_string()]))
    }

    /// Rows as `(normalized, original, values)`, sorted by normalized name,
    /// with the Cache-Control line synthesized from the directive state.
    fn rows(&self) -> Vec<(String, String, Vec<String>)> {
        let mut rows: Vec<(String, String, Vec<String>)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.original.clone(), e.values.clone()))
            .collect();
        if let Some((original, values)) = self.synthesized_cache_control() {
            let pos = rows
                .binary_search_by(|(k, _, _)| k.as_str().cmp(CACHE_CONTROL))
                .unwrap_or_else(|insert_at| insert_at);
            rows.insert(pos, (CACHE_CONTROL.to_owned(), original, values));
        }
        rows
    }
}

fn merge_positional(mut old: Vec<String>, new: Vec<String>) -> Vec<String> {
    if new.len() >= old.len() {
        return new;
    }
    for (i, value) in new.into_iter().enumerate() {
        old[i] = value;
    }
    old
}

impl<K: AsRef<str>, V: IntoHeaderValues> FromIterator<(K, V)> for HeaderCollection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut collection = HeaderCollection::new();
        for (key, values) in iter {
            collection.set(key.as_ref(), values);
        }
        collection
    }
}

impl fmt::Display for HeaderCollection {
    /// Wire text: one `Name: value` line per stored value, CRLF-terminated,
    /// sorted by normalized name. Names show the original casing with each
    /// hyphen segment's first letter uppercased, and the name field is
    /// padded so values line up.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        if rows.is_empty() {
            return Ok(());
        }

        let width = rows.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0) + 1;
        for (_, original, values) in &rows {
            let name = format!("{}:", title_case(original));
            for value in values {
                write!(f, "{name:<width$} {value}\r\n")?;
            }
        }
        Ok(())
    }
}
