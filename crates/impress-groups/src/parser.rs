//! Parsing of the persisted group text formats.
//!
//! Both formats are the exact inverse of [`crate::writer`]. Any failure is
//! reported as [`GroupError::MalformedGroupData`]; regex errors in a stored
//! pattern are folded into the same category.

use crate::codec::{find_unquoted, QuotedTokenizer};
use crate::config::{GroupsConfig, SerializationConfig};
use crate::error::{GroupError, Result};
use crate::group::{parse_color, starts_with_details, Group, GroupDetails, HierarchyContext};
use crate::matcher::MatchFlags;
use crate::path::IndexPath;
use crate::tree::{GroupTree, GroupTreeNode};
use crate::writer::{ALL_ENTRIES_TAG, EXPLICIT_TAG, KEYWORD_TAG, SEARCH_TAG};

/// Parse one group (no children) from its field text.
pub fn parse_group(text: &str, config: &GroupsConfig) -> Result<Group> {
    let (tag, body) = text
        .split_once(':')
        .ok_or_else(|| GroupError::malformed(format!("missing group tag in '{}'", text)))?;
    let serialization = &config.serialization;
    let mut fields = Fields {
        tokens: QuotedTokenizer::new(body, serialization.unit_separator, serialization.quote_char),
        tag,
    };

    let group = match tag {
        ALL_ENTRIES_TAG => {
            let details = fields.optional_details()?;
            Group::all_entries().with_details(details)
        }
        EXPLICIT_TAG => {
            let name = fields.required("name")?;
            let context = fields.context()?;
            let mut rest = fields.rest();
            let details = if starts_with_details(&rest) {
                let keys = rest.split_off(4);
                let details = fields.details_from(&rest)?;
                rest = keys;
                details
            } else {
                GroupDetails::default()
            };
            let keys = rest.into_iter().filter(|key| !key.is_empty());
            Group::explicit_with(&name, context, keys).with_details(details)
        }
        KEYWORD_TAG => {
            let name = fields.required("name")?;
            let context = fields.context()?;
            let field = fields.required("field")?;
            let pattern = fields.required("pattern")?;
            let flags = fields.match_flags()?;
            let details = fields.optional_details()?;
            Group::keyword(&name, context, &field, &pattern, flags)
                .map_err(into_malformed)?
                .with_details(details)
        }
        SEARCH_TAG => {
            let name = fields.required("name")?;
            let context = fields.context()?;
            let query = fields.required("query")?;
            let flags = fields.match_flags()?;
            let mut rest = fields.rest();
            // Old files carry four field-scope booleans before any details.
            if is_legacy_scope(&rest) {
                tracing::debug!("Ignoring legacy scope flags of search group '{}'", name);
                rest.drain(..LEGACY_SCOPE_FLAGS);
            }
            let details = if rest.is_empty() {
                GroupDetails::default()
            } else {
                fields.details_from(&rest)?
            };
            Group::search(&name, context, &query, flags, &config.search)
                .map_err(into_malformed)?
                .with_details(details)
        }
        other => {
            return Err(GroupError::malformed(format!("unknown group tag '{}'", other)));
        }
    };

    if fields.tokens.has_more_tokens() {
        return Err(GroupError::malformed(format!(
            "unexpected trailing fields in {} '{}'",
            tag,
            group.name()
        )));
    }
    Ok(group)
}

const LEGACY_SCOPE_FLAGS: usize = 4;

fn is_legacy_scope(rest: &[String]) -> bool {
    matches!(rest.len(), 4 | 8)
        && rest[..LEGACY_SCOPE_FLAGS]
            .iter()
            .all(|token| matches!(token.as_str(), "0" | "1"))
}

fn into_malformed(err: GroupError) -> GroupError {
    match err {
        GroupError::MalformedGroupData(_) => err,
        other => GroupError::malformed(other.to_string()),
    }
}

struct Fields<'a> {
    tokens: QuotedTokenizer<'a>,
    tag: &'a str,
}

impl Fields<'_> {
    fn required(&mut self, what: &str) -> Result<String> {
        self.tokens
            .next_unquoted()
            .ok_or_else(|| GroupError::malformed(format!("{} is missing its {}", self.tag, what)))
    }

    fn context(&mut self) -> Result<HierarchyContext> {
        let token = self.required("context")?;
        token
            .trim()
            .parse::<i64>()
            .map(HierarchyContext::from_number_or_default)
            .map_err(|_| GroupError::malformed(format!("invalid hierarchy context '{}'", token)))
    }

    fn flag(&mut self, what: &str) -> Result<bool> {
        match self.required(what)?.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(GroupError::malformed(format!(
                "invalid {} flag '{}' in {}",
                what, other, self.tag
            ))),
        }
    }

    fn match_flags(&mut self) -> Result<MatchFlags> {
        let case_sensitive = self.flag("case sensitivity")?;
        let regular_expression = self.flag("regular expression")?;
        Ok(MatchFlags::new(case_sensitive, regular_expression))
    }

    fn rest(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.tokens.next_unquoted()).collect()
    }

    /// Details if any tokens are left, otherwise the defaults.
    fn optional_details(&mut self) -> Result<GroupDetails> {
        if !self.tokens.has_more_tokens() {
            return Ok(GroupDetails::default());
        }
        let rest = self.rest();
        self.details_from(&rest)
    }

    /// `expanded;color;icon;description`, nothing more.
    fn details_from(&self, tokens: &[String]) -> Result<GroupDetails> {
        let [expanded, color, icon, description] = tokens else {
            return Err(GroupError::malformed(format!(
                "{} has {} detail fields, expected 4",
                self.tag,
                tokens.len()
            )));
        };
        let expanded = match expanded.as_str() {
            "1" => true,
            "0" => false,
            other => {
                return Err(GroupError::malformed(format!(
                    "invalid expanded flag '{}' in {}",
                    other, self.tag
                )))
            }
        };
        let color = if color.is_empty() {
            None
        } else {
            Some(parse_color(color).ok_or_else(|| {
                GroupError::malformed(format!("invalid color '{}' in {}", color, self.tag))
            })?)
        };
        let mut details = GroupDetails::default()
            .with_icon(icon.as_str())
            .with_description(description.as_str());
        details.expanded = expanded;
        details.color = color;
        Ok(details)
    }
}

/// Recursive-descent parser for the nested format.
struct NodeParser<'a> {
    input: &'a str,
    pos: usize,
    config: &'a GroupsConfig,
}

impl<'a> NodeParser<'a> {
    fn serialization(&self) -> &SerializationConfig {
        &self.config.serialization
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn node(&mut self) -> Result<GroupTreeNode> {
        let rest = &self.input[self.pos..];
        let list_separator = self.serialization().list_separator;
        let quote_char = self.serialization().quote_char;
        let end = find_unquoted(
            rest,
            &[SerializationConfig::OPEN, SerializationConfig::CLOSE, list_separator],
            quote_char,
        )
        .unwrap_or(rest.len());
        let group = parse_group(&rest[..end], self.config)?;
        self.pos += end;

        let mut children = Vec::new();
        if self.bump(SerializationConfig::OPEN) {
            if !self.bump(SerializationConfig::CLOSE) {
                loop {
                    children.push(self.node()?);
                    if self.bump(list_separator) {
                        continue;
                    }
                    if self.bump(SerializationConfig::CLOSE) {
                        break;
                    }
                    return Err(GroupError::malformed(format!(
                        "unbalanced parentheses below '{}' at offset {}",
                        group.name(),
                        self.pos
                    )));
                }
            }
        }
        Ok(GroupTreeNode::with_children(group, children))
    }
}

/// Parse a node and its subtree from the nested format.
pub fn parse_node(text: &str, config: &GroupsConfig) -> Result<GroupTreeNode> {
    let text = text.trim();
    let mut parser = NodeParser {
        input: text,
        pos: 0,
        config,
    };
    let node = parser.node()?;
    if parser.pos != text.len() {
        return Err(GroupError::malformed(format!(
            "trailing input after group tree: '{}'",
            &text[parser.pos..]
        )));
    }
    Ok(node)
}

/// Parse a whole tree from the nested format.
pub fn parse_tree_with(text: &str, config: &GroupsConfig) -> Result<GroupTree> {
    GroupTree::from_root(parse_node(text, config)?).map_err(into_malformed)
}

pub fn parse_tree(text: &str) -> Result<GroupTree> {
    parse_tree_with(text, &GroupsConfig::default())
}

/// Nested parsing with the default settings.
pub fn from_text(text: &str) -> Result<GroupTreeNode> {
    parse_node(text, &GroupsConfig::default())
}

/// Parse the line format, rebuilding nesting from the levels.
///
/// Line breaks inside a group's fields are escaped, so only unescaped breaks
/// end a line.
pub fn parse_tree_lines(text: &str, config: &GroupsConfig) -> Result<GroupTree> {
    let mut lines = QuotedTokenizer::new(text, '\n', config.serialization.quote_char)
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let mut tree = match lines.next() {
        Some((number, line)) => {
            let (level, group) = parse_line(number, line, config)?;
            if level != 0 || !group.is_all_entries() {
                return Err(GroupError::malformed(format!(
                    "line {}: the first group must be the level 0 root",
                    number
                )));
            }
            GroupTree::new()
        }
        None => return Err(GroupError::malformed("no groups found")),
    };

    // cursor[d] is the path of the most recent node at depth d.
    let mut cursor = vec![IndexPath::root()];
    for (number, line) in lines {
        let (level, group) = parse_line(number, line, config)?;
        if level == 0 || level > cursor.len() {
            return Err(GroupError::malformed(format!(
                "line {}: level {} does not follow level {}",
                number,
                level,
                cursor.len() - 1
            )));
        }
        cursor.truncate(level);
        let parent = &cursor[level - 1];
        let path = tree
            .add_child(parent, group)
            .map_err(|err| at_line(number, err))?;
        cursor.push(path);
    }
    Ok(tree)
}

fn parse_line(number: usize, line: &str, config: &GroupsConfig) -> Result<(usize, Group)> {
    let (level, text) = line
        .split_once(' ')
        .ok_or_else(|| GroupError::malformed(format!("line {}: missing level", number)))?;
    let level = level
        .parse::<usize>()
        .map_err(|_| GroupError::malformed(format!("line {}: invalid level '{}'", number, level)))?;
    let group = parse_group(text.trim_start(), config).map_err(|err| at_line(number, err))?;
    Ok((level, group))
}

fn at_line(number: usize, err: GroupError) -> GroupError {
    match err {
        GroupError::MalformedGroupData(message) => {
            GroupError::malformed(format!("line {}: {}", number, message))
        }
        other => GroupError::malformed(format!("line {}: {}", number, other)),
    }
}

/// Load a tree, falling back to an AllEntries-only tree on malformed input.
pub fn load_tree_or_default(text: &str, config: &GroupsConfig) -> GroupTree {
    let trimmed = text.trim_start();
    let parsed = if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        parse_tree_lines(text, config)
    } else {
        parse_tree_with(text, config)
    };
    parsed.unwrap_or_else(|err| {
        tracing::warn!("Could not load groups, starting with an empty tree: {}", err);
        GroupTree::new()
    })
}
