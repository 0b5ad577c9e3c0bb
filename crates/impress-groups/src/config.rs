//! Configuration for matching, serialization, and undo.
//!
//! Configuration is passed explicitly into compilation and parsing; nothing in
//! the engine reads ambient preference state. A TOML file may override any
//! section:
//!
//! ```toml
//! [serialization]
//! unit_separator = ";"
//! quote_char = "\\"
//!
//! [search]
//! all_fields = false
//! general_fields = true
//! general = ["keywords", "abstract"]
//!
//! [undo]
//! max_size = 50
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::{normalize_field_name, Entry};

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the group engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    pub serialization: SerializationConfig,
    pub search: SearchScope,
    pub undo: UndoConfig,
}

impl GroupsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: GroupsConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.serialization.validate()?;
        if self.undo.max_size == 0 {
            return Err(ConfigError::Invalid("undo.max_size must be positive".into()));
        }
        Ok(())
    }
}

/// Characters used by the group text format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// Terminates every field of a group
    pub unit_separator: char,
    /// Separates sibling subtrees inside parentheses
    pub list_separator: char,
    /// Escapes special characters
    pub quote_char: char,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            unit_separator: ';',
            list_separator: ',',
            quote_char: '\\',
        }
    }
}

impl SerializationConfig {
    pub const OPEN: char = '(';
    pub const CLOSE: char = ')';

    /// Characters that must be escaped inside a field (besides the quote char).
    pub fn specials(&self) -> String {
        [
            self.unit_separator,
            self.list_separator,
            Self::OPEN,
            Self::CLOSE,
        ]
        .iter()
        .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let chars = [self.unit_separator, self.list_separator, self.quote_char];
        for (i, c) in chars.iter().enumerate() {
            if *c == Self::OPEN || *c == Self::CLOSE {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is reserved for nesting",
                    c
                )));
            }
            if chars[i + 1..].contains(c) {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is used for more than one purpose",
                    c
                )));
            }
        }
        Ok(())
    }
}

/// Field scope searched by the plain fallback of a search group and by
/// unfielded query terms.
///
/// When `all_fields` is set, or no category flag is set at all, every field
/// of the entry is searched. Otherwise the union of the enabled categories is
/// searched, in the order required, optional, general.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchScope {
    pub all_fields: bool,
    pub required_fields: bool,
    pub optional_fields: bool,
    pub general_fields: bool,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub general: Vec<String>,
}

fn field_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for SearchScope {
    fn default() -> Self {
        Self {
            all_fields: true,
            required_fields: false,
            optional_fields: false,
            general_fields: false,
            required: field_list(&["author", "editor", "title", "journal", "booktitle", "year"]),
            optional: field_list(&[
                "volume", "number", "pages", "month", "publisher", "series", "note",
            ]),
            general: field_list(&["keywords", "abstract", "doi", "url", "comment", "file"]),
        }
    }
}

impl SearchScope {
    /// A scope that searches every field.
    pub fn all() -> Self {
        Self::default()
    }

    /// A scope restricted to the enabled categories.
    pub fn categories(required: bool, optional: bool, general: bool) -> Self {
        Self {
            all_fields: false,
            required_fields: required,
            optional_fields: optional,
            general_fields: general,
            ..Self::default()
        }
    }

    pub fn searches_all_fields(&self) -> bool {
        self.all_fields || !(self.required_fields || self.optional_fields || self.general_fields)
    }

    /// Field names in scope, normalized and without duplicates.
    ///
    /// `None` means every field of the entry.
    pub fn field_names(&self) -> Option<Vec<String>> {
        if self.searches_all_fields() {
            return None;
        }
        let mut names: Vec<String> = Vec::new();
        let categories = [
            (self.required_fields, &self.required),
            (self.optional_fields, &self.optional),
            (self.general_fields, &self.general),
        ];
        for (enabled, list) in categories {
            if !enabled {
                continue;
            }
            for name in list {
                let name = normalize_field_name(name);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Some(names)
    }

    /// Values of the in-scope fields present on `entry`.
    pub fn values<'e>(&self, entry: &'e Entry) -> Vec<&'e str> {
        match self.field_names() {
            None => entry.fields().map(|(_, v)| v).collect(),
            Some(names) => names.iter().filter_map(|n| entry.field(n)).collect(),
        }
    }
}

/// Undo manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Maximum number of records kept on the undo stack
    pub max_size: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_size: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GroupsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serialization.specials(), ";,()");
    }

    #[test]
    fn toml_overrides_sections() {
        let config = GroupsConfig::from_toml_str(
            r#"
            [serialization]
            unit_separator = "|"

            [search]
            all_fields = false
            general_fields = true
            general = ["Keywords"]

            [undo]
            max_size = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.serialization.unit_separator, '|');
        assert_eq!(config.serialization.quote_char, '\\');
        assert_eq!(config.search.field_names(), Some(vec!["keywords".to_string()]));
        assert_eq!(config.undo.max_size, 5);
    }

    #[test]
    fn conflicting_separators_rejected() {
        let err = GroupsConfig::from_toml_str("[serialization]\nlist_separator = \";\"\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = GroupsConfig::from_toml_str("[serialization]\nquote_char = \"(\"\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        assert!(matches!(
            GroupsConfig::from_toml_str("[undo\nmax_size = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn scope_with_no_categories_searches_everything() {
        let scope = SearchScope::categories(false, false, false);
        assert!(scope.searches_all_fields());
        assert_eq!(scope.field_names(), None);
    }

    #[test]
    fn scope_values_follow_categories() {
        let entry = Entry::new("k")
            .with_field("title", "Deep Learning")
            .with_field("keywords", "neural")
            .with_field("pages", "1--10");
        let scope = SearchScope::categories(true, false, true);
        assert_eq!(scope.values(&entry), vec!["Deep Learning", "neural"]);
        assert_eq!(SearchScope::all().values(&entry).len(), 3);
    }
}
