//! Groups with an explicit member list.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// A group whose members are listed by entry key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitGroup {
    members: BTreeSet<String>,
}

impl ExplicitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn members(&self) -> &BTreeSet<String> {
        &self.members
    }

    /// Replace the member set wholesale, returning the previous one.
    pub fn replace_members(&mut self, members: BTreeSet<String>) -> BTreeSet<String> {
        std::mem::replace(&mut self.members, members)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        entry.keys().iter().any(|k| self.members.contains(k))
    }

    /// Add entries that are not yet members by their primary key.
    ///
    /// Returns the number of keys added. Entries without a key are skipped.
    pub fn add(&mut self, entries: &[Entry]) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.contains(entry) {
                continue;
            }
            if let Some(key) = entry.primary_key() {
                self.members.insert(key.to_string());
                added += 1;
            }
        }
        added
    }

    /// Remove every key of the given entries. Returns the number of keys removed.
    pub fn remove(&mut self, entries: &[Entry]) -> usize {
        let mut removed = 0;
        for entry in entries {
            for key in entry.keys() {
                if self.members.remove(key) {
                    removed += 1;
                }
            }
        }
        removed
    }
}
