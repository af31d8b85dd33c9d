use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{ContentStore, SourceItem};

/// Progress snapshot for a selection.
///
/// Derived entirely from the selection and the content store, so it is a cache
/// and never the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub completed: Vec<String>,
    #[serde(default)]
    pub selected: Vec<String>,
}

impl Checkpoint {
    /// `completed = selected ∩ store.keys()`, in selection order.
    pub fn derive(selection: &[SourceItem], store: &ContentStore) -> Self {
        let selected: Vec<String> = selection.iter().map(|item| item.url.clone()).collect();
        Self::derive_from_urls(selected, store)
    }

    /// Repeated urls keep their first position only.
    pub fn derive_from_urls(selected: Vec<String>, store: &ContentStore) -> Self {
        let mut seen = HashSet::new();
        let selected: Vec<String> = selected
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();
        let completed = selected
            .iter()
            .filter(|url| store.contains(url))
            .cloned()
            .collect();
        Self {
            completed,
            selected,
        }
    }

    /// Selected urls not yet completed, in selection order.
    pub fn remaining(&self) -> Vec<String> {
        let done: HashSet<&str> = self.completed.iter().map(String::as_str).collect();
        self.selected
            .iter()
            .filter(|url| !done.contains(url.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining().is_empty()
    }
}
