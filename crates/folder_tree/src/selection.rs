use std::collections::BTreeSet;

use crate::{FolderId, Forest};

/// Bulk folder selection. Every change yields a new value; nothing is edited in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<FolderId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderId> {
        self.ids.iter()
    }

    pub fn with(&self, id: impl Into<FolderId>) -> Self {
        let mut ids = self.ids.clone();
        ids.insert(id.into());
        Self { ids }
    }

    pub fn without(&self, id: &str) -> Self {
        let mut ids = self.ids.clone();
        ids.remove(id);
        Self { ids }
    }

    pub fn toggled(&self, id: impl Into<FolderId>) -> Self {
        let id = id.into();
        if self.ids.contains(&id) {
            self.without(id.as_str())
        } else {
            self.with(id)
        }
    }

    pub fn cleared(&self) -> Self {
        Self::default()
    }

    /// Drop ids that are no longer part of `forest`, e.g. after a refetch.
    pub fn retain_existing(&self, forest: &Forest) -> Self {
        let existing = forest.flatten_ids();
        Self {
            ids: self.ids.intersection(&existing).cloned().collect(),
        }
    }
}

impl FromIterator<FolderId> for Selection {
    fn from_iter<I: IntoIterator<Item = FolderId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
