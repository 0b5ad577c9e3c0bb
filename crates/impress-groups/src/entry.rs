//! Bibliographic entries as seen by the group engine.
//!
//! The engine only reads named field values and identifying keys. Entries are
//! owned by the surrounding library; the group tree never stores them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalize a field name for storage and lookup (field names are case-insensitive).
pub fn normalize_field_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A record with identifying keys and a case-insensitive field map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl Entry {
    /// Create an entry identified by `key`.
    pub fn new(key: impl Into<String>) -> Self {
        let mut entry = Self::default();
        entry.add_key(key);
        entry
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Add an identifying key; duplicates are ignored.
    pub fn add_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !key.is_empty() && !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The key used to address this entry in membership sets and undo records.
    pub fn primary_key(&self) -> Option<&str> {
        self.keys.first().map(|k| k.as_str())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&normalize_field_name(name))
            .map(|v| v.as_str())
    }

    /// Set a field, returning the previous value.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.fields.insert(normalize_field_name(name), value.into())
    }

    /// Remove a field, returning the previous value.
    pub fn clear_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&normalize_field_name(name))
    }

    /// Set or clear a field depending on `value`.
    pub fn put_field(&mut self, name: &str, value: Option<&str>) -> Option<String> {
        match value {
            Some(v) => self.set_field(name, v),
            None => self.clear_field(name),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A single field edit made while (un)assigning entries to a keyword group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub entry_key: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    /// The change that reverts this one.
    pub fn inverse(&self) -> Self {
        Self {
            entry_key: self.entry_key.clone(),
            field: self.field.clone(),
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
        }
    }
}

/// Lookup of entries by key, used when replaying field changes.
pub trait EntryStore {
    fn entry_by_key_mut(&mut self, key: &str) -> Option<&mut Entry>;

    fn contains_key(&mut self, key: &str) -> bool {
        self.entry_by_key_mut(key).is_some()
    }
}

impl EntryStore for [Entry] {
    fn entry_by_key_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.iter_mut().find(|e| e.has_key(key))
    }
}

impl EntryStore for Vec<Entry> {
    fn entry_by_key_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.as_mut_slice().entry_by_key_mut(key)
    }
}

impl EntryStore for BTreeMap<String, Entry> {
    fn entry_by_key_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.get_mut(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_are_case_insensitive() {
        let mut entry = Entry::new("Smith2020").with_field("Keywords", "Neural Networks");
        assert_eq!(entry.field("keywords"), Some("Neural Networks"));
        assert_eq!(entry.field("KEYWORDS"), Some("Neural Networks"));

        assert_eq!(entry.clear_field("KeyWords"), Some("Neural Networks".to_string()));
        assert_eq!(entry.field("keywords"), None);
    }

    #[test]
    fn keys_are_distinct() {
        let mut entry = Entry::new("a");
        entry.add_key("b");
        entry.add_key("a");
        entry.add_key("");
        assert_eq!(entry.keys(), &["a".to_string(), "b".to_string()]);
        assert_eq!(entry.primary_key(), Some("a"));
        assert!(Entry::default().primary_key().is_none());
    }

    #[test]
    fn store_lookup_by_any_key() {
        let mut second = Entry::new("y");
        second.add_key("alias");
        let mut entries = vec![Entry::new("x"), second];
        assert!(entries.contains_key("alias"));
        assert!(!entries.contains_key("z"));
        entries.entry_by_key_mut("y").unwrap().set_field("note", "seen");
        assert_eq!(entries[1].field("note"), Some("seen"));
    }

    #[test]
    fn field_change_inverse() {
        let change = FieldChange {
            entry_key: "k".into(),
            field: "keywords".into(),
            old_value: None,
            new_value: Some("neural".into()),
        };
        let inverse = change.inverse();
        assert_eq!(inverse.old_value.as_deref(), Some("neural"));
        assert_eq!(inverse.new_value, None);
    }
}
