//! Group variants: the unit of filtering logic.
//!
//! A [`Group`] carries a display name, a [`HierarchyContext`], one of four
//! kinds and its [`GroupDetails`]. Cloning a group is a deep copy; no state is
//! shared between copies.

mod details;
mod explicit;
mod keyword;
mod search;

pub use details::{format_color, parse_color, GroupDetails};
pub(crate) use details::starts_with_details;
pub use explicit::ExplicitGroup;
pub use keyword::KeywordGroup;
pub use search::SearchGroup;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::SearchScope;
use crate::entry::{Entry, FieldChange};
use crate::error::{GroupError, Result};
use crate::matcher::{EntryMatcher, MatchFlags};

/// Display name of the root group.
pub const ALL_ENTRIES_NAME: &str = "All entries";

/// How a group's match composes with its ancestors and descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HierarchyContext {
    /// The group's own match, unaffected by the tree
    #[default]
    Independent,
    /// Intersected with the parent's effective match
    Refining,
    /// United with the effective matches of all subgroups
    Including,
}

impl HierarchyContext {
    /// Number used by the text format.
    pub fn as_number(self) -> u8 {
        match self {
            HierarchyContext::Independent => 0,
            HierarchyContext::Refining => 1,
            HierarchyContext::Including => 2,
        }
    }

    /// Unknown numbers fall back to `Independent`.
    pub fn from_number_or_default(number: i64) -> Self {
        match number {
            1 => HierarchyContext::Refining,
            2 => HierarchyContext::Including,
            _ => HierarchyContext::Independent,
        }
    }

    pub(crate) fn slot(self) -> usize {
        self.as_number() as usize
    }
}

/// Kind-specific data of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupKind {
    AllEntries,
    Explicit(ExplicitGroup),
    Keyword(KeywordGroup),
    Search(SearchGroup),
}

/// A named filter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    name: String,
    #[serde(default)]
    context: HierarchyContext,
    kind: GroupKind,
    #[serde(default, skip_serializing_if = "GroupDetails::is_default")]
    details: GroupDetails,
}

impl Group {
    /// The root group that contains every entry.
    pub fn all_entries() -> Self {
        Self::from_kind(ALL_ENTRIES_NAME, HierarchyContext::Independent, GroupKind::AllEntries)
    }

    pub fn explicit(name: &str, context: HierarchyContext) -> Self {
        Self::from_kind(name, context, GroupKind::Explicit(ExplicitGroup::new()))
    }

    pub fn explicit_with<I, S>(name: &str, context: HierarchyContext, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(
            name,
            context,
            GroupKind::Explicit(ExplicitGroup::with_members(members)),
        )
    }

    pub fn keyword(
        name: &str,
        context: HierarchyContext,
        field: &str,
        pattern: &str,
        flags: MatchFlags,
    ) -> Result<Self> {
        let keyword = KeywordGroup::new(field, pattern, flags)?;
        Ok(Self::from_kind(name, context, GroupKind::Keyword(keyword)))
    }

    pub fn search(
        name: &str,
        context: HierarchyContext,
        query: &str,
        flags: MatchFlags,
        scope: &SearchScope,
    ) -> Result<Self> {
        let search = SearchGroup::new(query, flags, scope)?;
        Ok(Self::from_kind(name, context, GroupKind::Search(search)))
    }

    pub fn from_kind(name: &str, context: HierarchyContext, kind: GroupKind) -> Self {
        Self {
            name: name.to_string(),
            context,
            kind,
            details: GroupDetails::default(),
        }
    }

    /// Builder-style setter for the display details.
    pub fn with_details(mut self, details: GroupDetails) -> Self {
        self.details = details;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn context(&self) -> HierarchyContext {
        self.context
    }

    pub fn set_context(&mut self, context: HierarchyContext) {
        self.context = context;
    }

    pub fn details(&self) -> &GroupDetails {
        &self.details
    }

    pub fn set_details(&mut self, details: GroupDetails) {
        self.details = details;
    }

    pub fn kind(&self) -> &GroupKind {
        &self.kind
    }

    pub fn is_all_entries(&self) -> bool {
        matches!(self.kind, GroupKind::AllEntries)
    }

    /// Whether membership is computed from entry content.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, GroupKind::Keyword(_) | GroupKind::Search(_))
    }

    /// Short label of the group kind.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            GroupKind::AllEntries => "all entries",
            GroupKind::Explicit(_) => "explicit",
            GroupKind::Keyword(_) => "keyword",
            GroupKind::Search(_) => "search",
        }
    }

    pub fn explicit_members(&self) -> Option<&BTreeSet<String>> {
        match &self.kind {
            GroupKind::Explicit(explicit) => Some(explicit.members()),
            _ => None,
        }
    }

    pub(crate) fn explicit_mut(&mut self) -> Option<&mut ExplicitGroup> {
        match &mut self.kind {
            GroupKind::Explicit(explicit) => Some(explicit),
            _ => None,
        }
    }

    /// The group's own match, ignoring the hierarchy.
    pub fn contains(&self, entry: &Entry) -> bool {
        match &self.kind {
            GroupKind::AllEntries => true,
            GroupKind::Explicit(explicit) => explicit.contains(entry),
            GroupKind::Keyword(keyword) => keyword.contains(entry),
            GroupKind::Search(search) => search.contains(entry),
        }
    }

    pub fn supports_add(&self) -> bool {
        match &self.kind {
            GroupKind::Explicit(_) => true,
            GroupKind::Keyword(keyword) => keyword.supports_add(),
            GroupKind::AllEntries | GroupKind::Search(_) => false,
        }
    }

    pub fn supports_remove(&self) -> bool {
        matches!(self.kind, GroupKind::Explicit(_) | GroupKind::Keyword(_))
    }

    /// Assign entries to this group.
    ///
    /// Keyword groups edit entry fields and return the changes made; explicit
    /// groups edit their member set and return no field changes.
    pub fn add_entries(&mut self, entries: &mut [Entry]) -> Result<Vec<FieldChange>> {
        if !self.supports_add() {
            return Err(GroupError::unsupported(&self.name, "adding entries"));
        }
        match &mut self.kind {
            GroupKind::Explicit(explicit) => {
                explicit.add(entries);
                Ok(Vec::new())
            }
            GroupKind::Keyword(keyword) => Ok(keyword.add(entries)),
            GroupKind::AllEntries | GroupKind::Search(_) => {
                Err(GroupError::unsupported(&self.name, "adding entries"))
            }
        }
    }

    /// Remove entries from this group. Same contract as [`Group::add_entries`].
    pub fn remove_entries(&mut self, entries: &mut [Entry]) -> Result<Vec<FieldChange>> {
        match &mut self.kind {
            GroupKind::Explicit(explicit) => {
                explicit.remove(entries);
                Ok(Vec::new())
            }
            GroupKind::Keyword(keyword) => Ok(keyword.remove(entries)),
            GroupKind::AllEntries | GroupKind::Search(_) => {
                Err(GroupError::unsupported(&self.name, "removing entries"))
            }
        }
    }
}

impl EntryMatcher for Group {
    fn is_match(&self, entry: &Entry) -> bool {
        self.contains(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_numbers() {
        for context in [
            HierarchyContext::Independent,
            HierarchyContext::Refining,
            HierarchyContext::Including,
        ] {
            assert_eq!(
                HierarchyContext::from_number_or_default(context.as_number() as i64),
                context
            );
        }
        assert_eq!(
            HierarchyContext::from_number_or_default(7),
            HierarchyContext::Independent
        );
    }

    #[test]
    fn all_entries_contains_everything() {
        let group = Group::all_entries();
        assert!(group.contains(&Entry::default()));
        assert!(group.is_all_entries());
        assert!(!group.supports_add());
    }

    #[test]
    fn explicit_scenario() {
        let group = Group::explicit_with("Reviewed", HierarchyContext::Independent, ["Smith2020"]);
        assert!(group.contains(&Entry::new("Smith2020")));
        assert!(!group.contains(&Entry::new("Jones2019")));
    }

    #[test]
    fn keyword_scenario() {
        let group = Group::keyword(
            "Neural",
            HierarchyContext::Independent,
            "keywords",
            "neural",
            MatchFlags::new(false, false),
        )
        .unwrap();
        assert!(group.contains(&Entry::new("a").with_field("keywords", "Neural Networks")));
        assert!(!group.contains(&Entry::new("b").with_field("keywords", "networks")));
    }

    #[test]
    fn read_only_kinds_reject_mutation() {
        let mut search = Group::search(
            "Q",
            HierarchyContext::Independent,
            "neural",
            MatchFlags::default(),
            &SearchScope::all(),
        )
        .unwrap();
        let mut entries = vec![Entry::new("a")];
        assert!(matches!(
            search.add_entries(&mut entries),
            Err(GroupError::Unsupported { .. })
        ));
        assert!(matches!(
            search.remove_entries(&mut entries),
            Err(GroupError::Unsupported { .. })
        ));
        assert!(Group::all_entries().remove_entries(&mut entries).is_err());
    }

    #[test]
    fn explicit_add_then_remove_is_identity() {
        let mut group = Group::explicit_with("G", HierarchyContext::Independent, ["x"]);
        let before = group.clone();
        let mut entries = vec![Entry::new("e")];
        assert!(group.add_entries(&mut entries).unwrap().is_empty());
        assert!(group.contains(&entries[0]));
        group.remove_entries(&mut entries).unwrap();
        assert_eq!(group, before);
    }

    #[test]
    fn clone_is_independent() {
        let original = Group::explicit_with("G", HierarchyContext::Refining, ["a"]);
        let mut copy = original.clone();
        copy.explicit_mut().unwrap().add(&[Entry::new("b")]);
        assert_eq!(original.explicit_members().unwrap().len(), 1);
        assert_eq!(copy.explicit_members().unwrap().len(), 2);
    }

    #[test]
    fn details_take_part_in_equality() {
        let plain = Group::explicit("G", HierarchyContext::Independent);
        let noted = plain
            .clone()
            .with_details(GroupDetails::default().with_description("notes"));
        assert_ne!(plain, noted);
        assert_eq!(noted.details().description.as_deref(), Some("notes"));

        let json = serde_json::to_string(&noted).unwrap();
        assert_eq!(serde_json::from_str::<Group>(&json).unwrap(), noted);
        assert!(!serde_json::to_string(&plain).unwrap().contains("details"));
    }

    #[test]
    fn serde_rejects_invalid_pattern() {
        let json = r#"{"name":"K","context":"Independent","kind":{"type":"keyword","field":"keywords","pattern":"[","flags":{"case_sensitive":false,"regular_expression":true}}}"#;
        assert!(serde_json::from_str::<Group>(json).is_err());

        let group = Group::keyword("K", HierarchyContext::Including, "Keywords", "ml", MatchFlags::default()).unwrap();
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(serde_json::from_str::<Group>(&json).unwrap(), group);
    }
}
