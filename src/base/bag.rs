use std::collections::BTreeMap;

/// Case-insensitive, single-valued string store.
///
/// Used for the server-parameter side of request reconstruction: CGI-style
/// variables such as `REQUEST_URI` or `SCRIPT_NAME` arrive with whatever
/// casing the gateway chose, and lookups must not care. Original casing is
/// preserved for [`all`](ParamBag::all) and [`keys`](ParamBag::keys).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBag {
    // normalized (lowercase) key -> (original key, value)
    params: BTreeMap<String, (String, String)>,
}

impl ParamBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(key: &str) -> String {
        key.to_ascii_lowercase()
    }

    /// Get a value (case-insensitive lookup).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(&Self::normalize(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, replacing any existing one for that key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.params
            .insert(Self::normalize(&key), (key, value.into()));
    }

    /// Does the bag hold a value for this key?
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(&Self::normalize(key))
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) {
        self.params.remove(&Self::normalize(key));
    }

    /// Drop all current values and refill from the given pairs.
    pub fn replace_all<K, V, I>(&mut self, pairs: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.params.clear();
        for (k, v) in pairs {
            self.set(k, v);
        }
    }

    /// All entries as (original key, value), sorted by normalized key.
    pub fn all(&self) -> Vec<(&str, &str)> {
        self.params
            .values()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Normalized keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.params.keys().map(String::as_str).collect()
    }

    /// Iterate over (original key, value) pairs, sorted by normalized key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Is the bag empty?
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (k, v) in iter {
            bag.set(k, v);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut bag = ParamBag::new();
        bag.set("IIS_WasUrlRewritten", "1");
        assert_eq!(bag.get("iis_wasurlrewritten"), Some("1"));
        assert_eq!(bag.get("IIS_WASURLREWRITTEN"), Some("1"));
        assert!(bag.has("Iis_WasUrlRewritten"));
    }

    #[test]
    fn test_original_casing_is_preserved() {
        let mut bag = ParamBag::new();
        bag.set("Request_Uri", "/x");
        assert_eq!(bag.all(), vec![("Request_Uri", "/x")]);
        assert_eq!(bag.keys(), vec!["request_uri"]);
    }

    #[test]
    fn test_set_replaces_and_remove_removes() {
        let mut bag: ParamBag = [("A", "1")].into_iter().collect();
        bag.set("a", "2");
        assert_eq!(bag.get("A"), Some("2"));
        assert_eq!(bag.len(), 1);

        bag.remove("A");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_replace_all_resets_contents() {
        let mut bag: ParamBag = [("OLD", "x")].into_iter().collect();
        bag.replace_all([("NEW", "y")]);
        assert!(!bag.has("OLD"));
        assert_eq!(bag.get("new"), Some("y"));
    }
}
