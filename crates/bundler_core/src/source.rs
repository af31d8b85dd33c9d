use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// One listed post. Identity is the `url`; listing order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub title: String,
    pub url: String,
}

impl SourceItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// How the run's selection is cut out of the listed sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Explicit subset. Listing order wins over the order given here.
    Links(Vec<String>),
    First(usize),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("none of the {requested} requested links are present in the listing")]
    NoMatchingLinks { requested: usize },
    #[error("the listing is empty")]
    EmptyListing,
}

impl Selection {
    /// Parse a comma separated link list, ignoring blanks.
    pub fn links_from_csv(raw: &str) -> Self {
        Selection::Links(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )
    }

    pub fn apply(&self, listed: &[SourceItem]) -> Result<Vec<SourceItem>, SelectionError> {
        if listed.is_empty() {
            return Err(SelectionError::EmptyListing);
        }
        match self {
            Selection::All => Ok(listed.to_vec()),
            Selection::First(n) => Ok(listed.iter().take(*n).cloned().collect()),
            Selection::Links(wanted) => {
                let wanted_set: HashSet<&str> = wanted.iter().map(String::as_str).collect();
                let selected: Vec<SourceItem> = listed
                    .iter()
                    .filter(|item| wanted_set.contains(item.url.as_str()))
                    .cloned()
                    .collect();
                if selected.is_empty() {
                    return Err(SelectionError::NoMatchingLinks {
                        requested: wanted.len(),
                    });
                }
                Ok(selected)
            }
        }
    }
}

/// Drop later duplicates of the same url, keeping first-seen order.
pub fn dedupe_by_url(items: Vec<SourceItem>) -> Vec<SourceItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.url.clone()))
        .collect()
}

/// Directory-safe name for a source collection (a blog), derived from its host.
pub fn collection_slug(collection_url: &str) -> String {
    let host = Url::parse(collection_url)
        .ok()
        .and_then(|u| u.host_str().map(ToOwned::to_owned));
    let raw = host.unwrap_or_else(|| collection_url.to_string());
    let slug: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches(&['-', '.'][..]).to_string();
    if slug.is_empty() {
        "collection".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_uses_host() {
        assert_eq!(
            collection_slug("https://Example.blogspot.com/"),
            "example.blogspot.com"
        );
    }

    #[test]
    fn slug_of_garbage_is_sanitized() {
        assert_eq!(collection_slug("not a url/.."), "not-a-url");
        assert_eq!(collection_slug("///"), "collection");
    }
}
