//! Groups defined by a free-form search query.

use serde::{Deserialize, Serialize};

use crate::config::SearchScope;
use crate::entry::Entry;
use crate::error::Result;
use crate::matcher::{MatchFlags, TextMatcher};
use crate::query::{parse_query, QueryExpr, TermField, TermOp};

/// A read-only group backed by a search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SearchRepr", into = "SearchRepr")]
pub struct SearchGroup {
    query: String,
    flags: MatchFlags,
    scope: SearchScope,
    rule: SearchRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SearchRepr {
    query: String,
    #[serde(default)]
    flags: MatchFlags,
    #[serde(default)]
    scope: SearchScope,
}

impl TryFrom<SearchRepr> for SearchGroup {
    type Error = crate::error::GroupError;

    fn try_from(repr: SearchRepr) -> Result<Self> {
        SearchGroup::new(&repr.query, repr.flags, &repr.scope)
    }
}

impl From<SearchGroup> for SearchRepr {
    fn from(group: SearchGroup) -> Self {
        Self {
            query: group.query,
            flags: group.flags,
            scope: group.scope,
        }
    }
}

/// Two search groups are equal when query and flags agree; the scope comes
/// from configuration and is not persisted.
impl PartialEq for SearchGroup {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.flags == other.flags
    }
}

/// Compiled form of a search group.
#[derive(Debug, Clone)]
enum SearchRule {
    /// Query parsed by the structured grammar
    Structured(CompiledQuery),
    /// Plain substring/regex over the scope; `None` for an empty query
    Plain(Option<TextMatcher>),
}

#[derive(Debug, Clone)]
enum CompiledQuery {
    And(Box<CompiledQuery>, Box<CompiledQuery>),
    Or(Box<CompiledQuery>, Box<CompiledQuery>),
    Not(Box<CompiledQuery>),
    Term {
        field: TermField,
        op: TermOp,
        matcher: TextMatcher,
    },
}

impl CompiledQuery {
    fn compile(expr: &QueryExpr, flags: MatchFlags) -> Result<Self> {
        Ok(match expr {
            QueryExpr::And(a, b) => CompiledQuery::And(
                Box::new(Self::compile(a, flags)?),
                Box::new(Self::compile(b, flags)?),
            ),
            QueryExpr::Or(a, b) => CompiledQuery::Or(
                Box::new(Self::compile(a, flags)?),
                Box::new(Self::compile(b, flags)?),
            ),
            QueryExpr::Not(inner) => CompiledQuery::Not(Box::new(Self::compile(inner, flags)?)),
            QueryExpr::Term(term) => {
                let matcher = match term.op {
                    TermOp::Exact => TextMatcher::exact(&term.value, flags)?,
                    TermOp::Contains | TermOp::NotContains => TextMatcher::new(&term.value, flags)?,
                };
                CompiledQuery::Term {
                    field: term.field.clone(),
                    op: term.op,
                    matcher,
                }
            }
        })
    }

    fn is_match(&self, entry: &Entry, scope: &SearchScope) -> bool {
        match self {
            CompiledQuery::And(a, b) => a.is_match(entry, scope) && b.is_match(entry, scope),
            CompiledQuery::Or(a, b) => a.is_match(entry, scope) || b.is_match(entry, scope),
            CompiledQuery::Not(inner) => !inner.is_match(entry, scope),
            CompiledQuery::Term { field, op, matcher } => {
                let found = match field {
                    TermField::Default => scope.values(entry).into_iter().any(|v| matcher.is_match(v)),
                    TermField::Any => entry.fields().any(|(_, v)| matcher.is_match(v)),
                    TermField::Key => entry.keys().iter().any(|k| matcher.is_match(k)),
                    TermField::Named(name) => entry.field(name).is_some_and(|v| matcher.is_match(v)),
                };
                match op {
                    TermOp::NotContains => !found,
                    TermOp::Contains | TermOp::Exact => found,
                }
            }
        }
    }
}

impl SearchGroup {
    /// Compile a search group.
    ///
    /// A query the structured grammar rejects falls back to a plain match of
    /// the whole query text over `scope`. Fails with `PatternSyntax` when a
    /// regular expression in either form does not compile.
    pub fn new(query: &str, flags: MatchFlags, scope: &SearchScope) -> Result<Self> {
        let rule = match parse_query(query) {
            Ok(expr) => SearchRule::Structured(CompiledQuery::compile(&expr, flags)?),
            Err(err) => {
                tracing::debug!("Query '{}' is not structured ({}), using plain match", query, err);
                let text = query.trim();
                if text.is_empty() {
                    SearchRule::Plain(None)
                } else {
                    SearchRule::Plain(Some(TextMatcher::new(text, flags)?))
                }
            }
        };
        Ok(Self {
            query: query.to_string(),
            flags,
            scope: scope.clone(),
            rule,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn flags(&self) -> MatchFlags {
        self.flags
    }

    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    /// Whether the query was accepted by the structured grammar.
    pub fn is_structured(&self) -> bool {
        matches!(self.rule, SearchRule::Structured(_))
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        match &self.rule {
            SearchRule::Structured(query) => query.is_match(entry, &self.scope),
            SearchRule::Plain(None) => false,
            SearchRule::Plain(Some(matcher)) => self
                .scope
                .values(entry)
                .into_iter()
                .any(|v| matcher.is_match(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GroupError;

    fn group(query: &str) -> SearchGroup {
        SearchGroup::new(query, MatchFlags::default(), &SearchScope::all()).unwrap()
    }

    fn paper() -> Entry {
        Entry::new("Smith2020")
            .with_field("author", "John Smith")
            .with_field("title", "Neural Networks for Vision")
            .with_field("year", "2020")
    }

    #[test]
    fn structured_terms() {
        assert!(group("author=smith").contains(&paper()));
        assert!(!group("author=jones").contains(&paper()));
        assert!(group("neural vision").contains(&paper()));
        assert!(!group("neural audio").contains(&paper()));
        assert!(group("neural audio or year=2020").contains(&paper()));
        assert!(group("not author=jones").contains(&paper()));
        assert!(group("title != audio").contains(&paper()));
        assert!(group("key==smith2020").contains(&paper()));
        assert!(!group("year==202").contains(&paper()));
    }

    #[test]
    fn case_sensitive_flag() {
        let sensitive =
            SearchGroup::new("title=neural", MatchFlags::new(true, false), &SearchScope::all()).unwrap();
        assert!(!sensitive.contains(&paper()));
    }

    #[test]
    fn fallback_is_plain_substring() {
        let g = group("Networks for (");
        assert!(!g.is_structured());
        assert!(!g.contains(&paper()));

        let g = group("Networks for");
        assert!(g.is_structured());

        let g = group("title=");
        assert!(!g.is_structured());
        assert!(!g.contains(&paper()));
        assert!(g.contains(&Entry::new("x").with_field("note", "see title=")));
    }

    #[test]
    fn fallback_respects_scope() {
        let entry = Entry::new("x").with_field("pages", "a (b");
        let everywhere = SearchGroup::new("a (b", MatchFlags::default(), &SearchScope::all()).unwrap();
        let required_only =
            SearchGroup::new("a (b", MatchFlags::default(), &SearchScope::categories(true, false, false))
                .unwrap();
        assert!(everywhere.contains(&entry));
        assert!(!required_only.contains(&entry));
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(!group("  ").contains(&paper()));
    }

    #[test]
    fn regex_terms_and_errors() {
        let g = SearchGroup::new("year=20[0-9]{2}", MatchFlags::new(false, true), &SearchScope::all()).unwrap();
        assert!(g.contains(&paper()));

        let err = SearchGroup::new("title=[a-", MatchFlags::new(false, true), &SearchScope::all()).unwrap_err();
        assert!(matches!(err, GroupError::PatternSyntax { .. }));
    }

    #[test]
    fn equality_uses_query_and_flags() {
        let a = SearchGroup::new("x", MatchFlags::default(), &SearchScope::all()).unwrap();
        let b = SearchGroup::new("x", MatchFlags::default(), &SearchScope::categories(true, false, false)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, group("y"));
    }
}
