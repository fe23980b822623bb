//! Cache-Control directive handling.
//!
//! The directive map is the single source of truth: the raw header text is
//! never stored, it is re-serialized from the map whenever the header is
//! read. Parsing is tolerant: anything that is not a directive is skipped
//! without error, matching how real-world Cache-Control values degrade.

use std::collections::BTreeMap;
use std::fmt;

/// A single Cache-Control directive: either a bare flag (`no-cache`) or a
/// valued directive (`max-age=100`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Flag,
    Value(String),
}

impl Directive {
    /// The directive's value, if it carries one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Directive::Flag => None,
            Directive::Value(v) => Some(v),
        }
    }

    /// Is this a bare flag directive?
    pub fn is_flag(&self) -> bool {
        matches!(self, Directive::Flag)
    }
}

impl From<&str> for Directive {
    fn from(value: &str) -> Self {
        Directive::Value(value.to_owned())
    }
}

impl From<String> for Directive {
    fn from(value: String) -> Self {
        Directive::Value(value)
    }
}

/// An ordered map of Cache-Control directives.
///
/// Directive names are case-insensitive and stored lowercased; iteration
/// and serialization are sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: BTreeMap<String, Directive>,
}

impl CacheControl {
    /// Create an empty directive map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header value into a directive map.
    ///
    /// Repeatedly matches `token (= "quoted" | bare-value)?`; a bare token
    /// becomes [`Directive::Flag`]. Text that matches nothing is skipped.
    pub fn parse(text: &str) -> Self {
        let mut cc = CacheControl::new();
        cc.merge_text(text);
        cc
    }

    /// Parse `text` and merge its directives into the map, overwriting any
    /// that already exist.
    pub fn merge_text(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if !bytes[i].is_ascii_alphabetic() {
                i += 1;
                continue;
            }

            let start = i;
            i += 1;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' || bytes[i] == b'-')
            {
                i += 1;
            }
            let name = text[start..i].to_ascii_lowercase();

            // Optional `= value`, with whitespace tolerated before the `=`.
            let mut j = i;
            while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'=' {
                j += 1;
                let value = if j < bytes.len() && bytes[j] == b'"' {
                    j += 1;
                    let vstart = j;
                    while j < bytes.len() && bytes[j] != b'"' {
                        j += 1;
                    }
                    let v = &text[vstart..j];
                    if j < bytes.len() {
                        j += 1; // closing quote
                    }
                    v
                } else {
                    let vstart = j;
                    while j < bytes.len() && !matches!(bytes[j], b' ' | b'\t' | b'"' | b',' | b';')
                    {
                        j += 1;
                    }
                    &text[vstart..j]
                };
                self.directives.insert(name, Directive::Value(value.into()));
                i = j;
            } else {
                self.directives.insert(name, Directive::Flag);
            }
        }
    }

    /// Insert or overwrite a directive.
    pub fn insert(&mut self, name: &str, directive: impl Into<Directive>) {
        self.directives
            .insert(name.to_ascii_lowercase(), directive.into());
    }

    /// Remove a directive, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Directive> {
        self.directives.remove(&name.to_ascii_lowercase())
    }

    /// Is the named directive present?
    pub fn has(&self, name: &str) -> bool {
        self.directives.contains_key(&name.to_ascii_lowercase())
    }

    /// Look up a directive by name.
    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.directives.get(&name.to_ascii_lowercase())
    }

    /// Iterate over (name, directive), sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Directive)> {
        self.directives.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of directives.
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// True when no directives are held.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Drop all directives.
    pub fn clear(&mut self) {
        self.directives.clear();
    }
}

fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
}

impl fmt::Display for CacheControl {
    /// Serialize to wire form: names sorted, flags bare, values quoted when
    /// they contain anything outside `[A-Za-z0-9._-]`, joined with `", "`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, directive) in &self.directives {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match directive {
                Directive::Flag => f.write_str(name)?,
                Directive::Value(v) if needs_quoting(v) => write!(f, "{name}=\"{v}\"")?,
                Directive::Value(v) => write!(f, "{name}={v}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_flags_and_values() {
        let cc = CacheControl::parse("no-cache, max-age=100");
        assert!(cc.get("no-cache").unwrap().is_flag());
        assert_eq!(cc.get("max-age").unwrap().value(), Some("100"));
    }

    #[test]
    fn test_parses_quoted_values() {
        let cc = CacheControl::parse("private=\"set-cookie, authorization\"");
        assert_eq!(
            cc.get("private").unwrap().value(),
            Some("set-cookie, authorization")
        );
    }

    #[test]
    fn test_directive_names_are_case_insensitive() {
        let cc = CacheControl::parse("No-Cache, MAX-AGE=3");
        assert!(cc.has("no-cache"));
        assert_eq!(cc.get("Max-Age").unwrap().value(), Some("3"));
    }

    #[test]
    fn test_junk_is_skipped_silently() {
        let cc = CacheControl::parse("###, no-store, 42, =7");
        assert_eq!(cc.len(), 1);
        assert!(cc.has("no-store"));
    }

    #[test]
    fn test_serializes_sorted_and_quoted() {
        let mut cc = CacheControl::new();
        cc.insert("s-maxage", "600");
        cc.insert("no-cache", Directive::Flag);
        cc.insert("private", "a b");
        assert_eq!(cc.to_string(), "no-cache, private=\"a b\", s-maxage=600");
    }

    #[test]
    fn test_parse_then_serialize_is_canonical() {
        let cc = CacheControl::parse("max-age=100,no-store");
        assert_eq!(cc.to_string(), "max-age=100, no-store");
    }

    #[test]
    fn test_merge_text_overwrites_per_directive() {
        let mut cc = CacheControl::parse("max-age=100, no-cache");
        cc.merge_text("max-age=30");
        assert_eq!(cc.get("max-age").unwrap().value(), Some("30"));
        assert!(cc.has("no-cache"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cc = CacheControl::parse("a=1, b");
        assert!(cc.remove("a").is_some());
        assert!(!cc.has("a"));
        cc.clear();
        assert!(cc.is_empty());
    }

    #[test]
    fn test_empty_map_serializes_to_empty_string() {
        assert_eq!(CacheControl::new().to_string(), "");
    }
}
