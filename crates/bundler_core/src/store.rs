use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// In-memory `url -> snippet html` mapping.
///
/// Ordered so that serialisation is deterministic. Entries are never replaced:
/// the first value written for a url is the one that sticks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentStore {
    entries: BTreeMap<String, String>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the entry was new.
    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) -> bool {
        let url = url.into();
        if self.entries.contains_key(&url) {
            return false;
        }
        self.entries.insert(url, html.into());
        true
    }

    /// Merge entries, returning how many were new.
    pub fn extend<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        entries
            .into_iter()
            .filter(|(url, html)| self.insert(url.clone(), html.clone()))
            .count()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ContentStore {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut store = ContentStore::new();
        store.extend(iter);
        store
    }
}
