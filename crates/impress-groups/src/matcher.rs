//! Entry predicates and their AND/OR/NOT composition.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::{GroupError, Result};

/// Case and pattern flags shared by keyword and search groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchFlags {
    pub case_sensitive: bool,
    pub regular_expression: bool,
}

impl MatchFlags {
    pub fn new(case_sensitive: bool, regular_expression: bool) -> Self {
        Self {
            case_sensitive,
            regular_expression,
        }
    }
}

/// Compiled text pattern: a literal substring or a regular expression, with
/// the case rule applied.
///
/// Literals are compiled as escaped regexes so that finding and stripping
/// follow the same rules in both modes.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    regex: Regex,
}

impl TextMatcher {
    /// Compile a pattern that matches anywhere in the text.
    pub fn new(pattern: &str, flags: MatchFlags) -> Result<Self> {
        let source = if flags.regular_expression {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        Self::build(pattern, &source, flags.case_sensitive)
    }

    /// Compile a pattern that must match the whole text.
    pub fn exact(pattern: &str, flags: MatchFlags) -> Result<Self> {
        let inner = if flags.regular_expression {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        Self::build(pattern, &format!("^(?:{})$", inner), flags.case_sensitive)
    }

    fn build(pattern: &str, source: &str, case_sensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| GroupError::pattern(pattern, e))?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Byte ranges of the non-overlapping matches in `text`.
    pub fn match_ranges<'t>(&'t self, text: &'t str) -> impl Iterator<Item = Range<usize>> + 't {
        self.regex.find_iter(text).map(|m| m.start()..m.end())
    }
}

/// A boolean predicate over entries.
pub trait EntryMatcher {
    fn is_match(&self, entry: &Entry) -> bool;
}

impl<M: EntryMatcher + ?Sized> EntryMatcher for &M {
    fn is_match(&self, entry: &Entry) -> bool {
        (**self).is_match(entry)
    }
}

impl<M: EntryMatcher + ?Sized> EntryMatcher for Box<M> {
    fn is_match(&self, entry: &Entry) -> bool {
        (**self).is_match(entry)
    }
}

/// Adapts a closure into an [`EntryMatcher`].
pub struct FnMatcher<F>(pub F);

impl<F: Fn(&Entry) -> bool> EntryMatcher for FnMatcher<F> {
    fn is_match(&self, entry: &Entry) -> bool {
        (self.0)(entry)
    }
}

/// How a set of matchers is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatcherKind {
    /// Every matcher must accept the entry
    And,
    /// At least one matcher must accept the entry
    Or,
}

impl MatcherKind {
    /// Fold lazily evaluated results. An empty input never matches.
    pub fn combine<I: IntoIterator<Item = bool>>(self, results: I) -> bool {
        let mut results = results.into_iter().peekable();
        if results.peek().is_none() {
            return false;
        }
        match self {
            MatcherKind::And => results.all(|r| r),
            MatcherKind::Or => results.any(|r| r),
        }
    }
}

/// AND/OR combination of matchers.
pub struct MatcherSet<'a> {
    kind: MatcherKind,
    matchers: Vec<Box<dyn EntryMatcher + 'a>>,
}

impl<'a> MatcherSet<'a> {
    pub fn new(kind: MatcherKind) -> Self {
        Self {
            kind,
            matchers: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(MatcherKind::And)
    }

    pub fn or() -> Self {
        Self::new(MatcherKind::Or)
    }

    pub fn add(&mut self, matcher: impl EntryMatcher + 'a) {
        self.matchers.push(Box::new(matcher));
    }

    pub fn with(mut self, matcher: impl EntryMatcher + 'a) -> Self {
        self.add(matcher);
        self
    }

    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl EntryMatcher for MatcherSet<'_> {
    fn is_match(&self, entry: &Entry) -> bool {
        self.kind
            .combine(self.matchers.iter().map(|m| m.is_match(entry)))
    }
}

/// Negation of another matcher.
pub struct NotMatcher<M>(pub M);

impl<M: EntryMatcher> EntryMatcher for NotMatcher<M> {
    fn is_match(&self, entry: &Entry) -> bool {
        !self.0.is_match(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_field(name: &'static str) -> FnMatcher<impl Fn(&Entry) -> bool> {
        FnMatcher(move |e: &Entry| e.field(name).is_some())
    }

    #[test]
    fn literal_matcher_respects_case_flag() {
        let insensitive = TextMatcher::new("neural", MatchFlags::new(false, false)).unwrap();
        assert!(insensitive.is_match("Neural Networks"));

        let sensitive = TextMatcher::new("neural", MatchFlags::new(true, false)).unwrap();
        assert!(!sensitive.is_match("Neural Networks"));
    }

    #[test]
    fn literal_metacharacters_are_not_regex() {
        let m = TextMatcher::new("c++", MatchFlags::default()).unwrap();
        assert!(m.is_match("Modern C++ design"));
        assert!(!m.is_match("c"));
    }

    #[test]
    fn regex_matcher_and_syntax_error() {
        let m = TextMatcher::new("^neur.*s$", MatchFlags::new(false, true)).unwrap();
        assert!(m.is_match("Neural networks"));

        let err = TextMatcher::new("(unclosed", MatchFlags::new(false, true)).unwrap_err();
        assert!(matches!(err, GroupError::PatternSyntax { .. }));
    }

    #[test]
    fn exact_matcher_anchors() {
        let m = TextMatcher::exact("smith", MatchFlags::default()).unwrap();
        assert!(m.is_match("Smith"));
        assert!(!m.is_match("Smithson"));
    }

    #[test]
    fn match_ranges_cover_all_occurrences() {
        let m = TextMatcher::new("ml", MatchFlags::default()).unwrap();
        let ranges: Vec<_> = m.match_ranges("ML, deep ml").collect();
        assert_eq!(ranges, vec![0..2, 9..11]);
    }

    #[test]
    fn and_or_not() {
        let entry = Entry::new("k").with_field("title", "x");

        let and = MatcherSet::and().with(has_field("title")).with(has_field("year"));
        assert!(!and.is_match(&entry));

        let or = MatcherSet::or().with(has_field("title")).with(has_field("year"));
        assert!(or.is_match(&entry));

        assert!(NotMatcher(and).is_match(&entry));
    }

    #[test]
    fn empty_sets_match_nothing() {
        let entry = Entry::new("k");
        assert!(!MatcherSet::and().is_match(&entry));
        assert!(!MatcherSet::or().is_match(&entry));
        assert!(!MatcherKind::And.combine(std::iter::empty()));
    }
}
