use std::collections::BTreeMap;

/// User agent sent when the caller does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("metadump/", env!("CARGO_PKG_VERSION"));

/// Case-insensitive HTTP header map.
///
/// Names are lower-cased on the way in and on lookup. Iteration is sorted by
/// name so an encoded header block is byte-for-byte reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    map: BTreeMap<String, String>,
}

impl Default for Headers {
    fn default() -> Self {
        Self::new()
    }
}

impl Headers {
    /// Creates a header set holding only the default `user-agent`.
    pub fn new() -> Self {
        let mut map = BTreeMap::new();
        map.insert("user-agent".to_string(), DEFAULT_USER_AGENT.to_string());
        Self { map }
    }

    /// Creates a header set with no entries at all.
    pub fn empty() -> Self {
        Self { map: BTreeMap::new() }
    }

    /// Sets a header, replacing any previous value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.map.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(&name.to_ascii_lowercase())
    }

    pub fn get_all(&self) -> &BTreeMap<String, String> {
        &self.map
    }

    /// Copies entries from `other` that are not already present here.
    pub fn augment(&mut self, other: &Headers) {
        for (k, v) in &other.map {
            self.map.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
