//! Groups defined by a pattern in one field.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entry::{normalize_field_name, Entry, FieldChange};
use crate::error::{GroupError, Result};
use crate::matcher::{MatchFlags, TextMatcher};

lazy_static! {
    static ref LEADING_WHITESPACE: Regex = Regex::new(r"^\s+").unwrap();
    static ref TRAILING_WHITESPACE: Regex = Regex::new(r"\s+$").unwrap();
}

/// Remove every match of `matcher` from `value`.
///
/// Only whitespace touching a removed match is folded: the run after a match
/// is dropped when the kept text already ends in whitespace or is empty, and
/// trailing whitespace is dropped when only whitespace follows the last match.
/// Whitespace elsewhere in the field is left alone.
fn strip_matches(matcher: &TextMatcher, value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    let mut removed = false;
    for range in matcher.match_ranges(value) {
        // A match may begin inside whitespace already skipped.
        if range.is_empty() || range.end <= last {
            continue;
        }
        out.push_str(&value[last..range.start.max(last)]);
        last = range.end;
        removed = true;
        if out.is_empty() || TRAILING_WHITESPACE.is_match(&out) {
            if let Some(run) = LEADING_WHITESPACE.find(&value[last..]) {
                last += run.end();
            }
        }
    }
    let tail = &value[last..];
    out.push_str(tail);
    if removed && tail.trim().is_empty() {
        if let Some(run) = TRAILING_WHITESPACE.find(&out) {
            out.truncate(run.start());
        }
    }
    out
}

/// Matches entries whose `field` contains `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "KeywordRepr", into = "KeywordRepr")]
pub struct KeywordGroup {
    field: String,
    pattern: String,
    flags: MatchFlags,
    matcher: TextMatcher,
}

/// Checked serde representation of a [`KeywordGroup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeywordRepr {
    field: String,
    pattern: String,
    #[serde(default)]
    flags: MatchFlags,
}

impl TryFrom<KeywordRepr> for KeywordGroup {
    type Error = GroupError;

    fn try_from(repr: KeywordRepr) -> Result<Self> {
        KeywordGroup::new(&repr.field, &repr.pattern, repr.flags)
    }
}

impl From<KeywordGroup> for KeywordRepr {
    fn from(group: KeywordGroup) -> Self {
        Self {
            field: group.field,
            pattern: group.pattern,
            flags: group.flags,
        }
    }
}

impl PartialEq for KeywordGroup {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.pattern == other.pattern && self.flags == other.flags
    }
}

impl KeywordGroup {
    /// Compile a keyword group. Fails with `PatternSyntax` on a bad regex.
    pub fn new(field: &str, pattern: &str, flags: MatchFlags) -> Result<Self> {
        let matcher = TextMatcher::new(pattern, flags)?;
        Ok(Self {
            field: normalize_field_name(field),
            pattern: pattern.to_string(),
            flags,
            matcher,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> MatchFlags {
        self.flags
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        entry
            .field(&self.field)
            .is_some_and(|value| self.matcher.is_match(value))
    }

    /// Appending a regex source would not make an entry match it.
    pub fn supports_add(&self) -> bool {
        !self.flags.regular_expression
    }

    /// Append the pattern to the field of every entry that does not match yet.
    pub(crate) fn add(&self, entries: &mut [Entry]) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        for entry in entries.iter_mut() {
            if self.contains(entry) {
                continue;
            }
            let Some(key) = entry.primary_key().map(str::to_string) else {
                tracing::debug!("Skipping entry without key for field {}", self.field);
                continue;
            };
            let old_value = entry.field(&self.field).map(str::to_string);
            let new_value = match old_value.as_deref() {
                Some(old) if !old.is_empty() => format!("{} {}", old, self.pattern),
                _ => self.pattern.clone(),
            };
            entry.set_field(&self.field, new_value.clone());
            changes.push(FieldChange {
                entry_key: key,
                field: self.field.clone(),
                old_value,
                new_value: Some(new_value),
            });
        }
        changes
    }

    /// Strip every match of the pattern from the field of matching entries.
    pub(crate) fn remove(&self, entries: &mut [Entry]) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        for entry in entries.iter_mut() {
            if !self.contains(entry) {
                continue;
            }
            let Some(key) = entry.primary_key().map(str::to_string) else {
                tracing::debug!("Skipping entry without key for field {}", self.field);
                continue;
            };
            let old_value = entry.field(&self.field).map(str::to_string);
            let stripped = strip_matches(&self.matcher, old_value.as_deref().unwrap_or_default());
            let new_value = if stripped.trim().is_empty() {
                None
            } else {
                Some(stripped)
            };
            entry.put_field(&self.field, new_value.as_deref());
            changes.push(FieldChange {
                entry_key: key,
                field: self.field.clone(),
                old_value,
                new_value,
            });
        }
        changes
    }
}
