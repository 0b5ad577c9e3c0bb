//! Rendering of groups and trees to the persisted text formats.
//!
//! Nested format: `<Tag>:<field>;<field>;...;` followed, when the node has
//! children, by `(child,child,...)`. Line format: one `<level> <group>` line
//! per node in pre-order.

use crate::codec::quote;
use crate::config::SerializationConfig;
use crate::group::{format_color, starts_with_details, Group, GroupDetails, GroupKind};
use crate::matcher::MatchFlags;
use crate::tree::{GroupTree, GroupTreeNode};

pub const ALL_ENTRIES_TAG: &str = "AllEntriesGroup";
pub const EXPLICIT_TAG: &str = "ExplicitGroup";
pub const KEYWORD_TAG: &str = "KeywordGroup";
pub const SEARCH_TAG: &str = "SearchGroup";

/// Escaped as well in the line format, where a raw line break ends a group.
const LINE_BREAKS: &str = "\n\r";

struct FieldWriter<'c> {
    config: &'c SerializationConfig,
    specials: String,
    out: String,
}

impl<'c> FieldWriter<'c> {
    fn new(tag: &str, config: &'c SerializationConfig, extra_specials: &str) -> Self {
        Self {
            config,
            specials: config.specials() + extra_specials,
            out: format!("{}:", tag),
        }
    }

    fn field(&mut self, value: &str) -> &mut Self {
        self.out
            .push_str(&quote(value, &self.specials, self.config.quote_char));
        self.out.push(self.config.unit_separator);
        self
    }

    fn flag(&mut self, value: bool) -> &mut Self {
        self.field(if value { "1" } else { "0" })
    }

    fn flags(&mut self, flags: MatchFlags) -> &mut Self {
        self.flag(flags.case_sensitive).flag(flags.regular_expression)
    }

    fn details(&mut self, details: &GroupDetails) -> &mut Self {
        let color = details.color.map(format_color).unwrap_or_default();
        self.flag(details.expanded)
            .field(&color)
            .field(details.icon.as_deref().unwrap_or_default())
            .field(details.description.as_deref().unwrap_or_default())
    }

    /// Details are written only when they differ from the defaults.
    fn optional_details(&mut self, details: &GroupDetails) -> &mut Self {
        if !details.is_default() {
            self.details(details);
        }
        self
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Render one group without its children.
pub fn render_group(group: &Group, config: &SerializationConfig) -> String {
    render_group_escaping(group, config, "")
}

fn render_group_escaping(group: &Group, config: &SerializationConfig, extra_specials: &str) -> String {
    let context = group.context().as_number().to_string();
    let details = group.details();
    match group.kind() {
        GroupKind::AllEntries => {
            let mut writer = FieldWriter::new(ALL_ENTRIES_TAG, config, extra_specials);
            writer.optional_details(details);
            writer.finish()
        }
        GroupKind::Explicit(explicit) => {
            let mut writer = FieldWriter::new(EXPLICIT_TAG, config, extra_specials);
            writer.field(group.name()).field(&context);
            let keys: Vec<&str> = explicit.members().iter().map(String::as_str).collect();
            // Keys shaped like details would be read back as details.
            if !details.is_default() || starts_with_details(&keys) {
                writer.details(details);
            }
            for key in keys {
                writer.field(key);
            }
            writer.finish()
        }
        GroupKind::Keyword(keyword) => {
            let mut writer = FieldWriter::new(KEYWORD_TAG, config, extra_specials);
            writer
                .field(group.name())
                .field(&context)
                .field(keyword.field())
                .field(keyword.pattern())
                .flags(keyword.flags())
                .optional_details(details);
            writer.finish()
        }
        GroupKind::Search(search) => {
            let mut writer = FieldWriter::new(SEARCH_TAG, config, extra_specials);
            writer
                .field(group.name())
                .field(&context)
                .field(search.query())
                .flags(search.flags())
                .optional_details(details);
            writer.finish()
        }
    }
}

/// Render a node and its subtree in the nested format.
pub fn render_node(node: &GroupTreeNode, config: &SerializationConfig) -> String {
    let mut out = render_group(node.group(), config);
    if !node.is_leaf() {
        out.push(SerializationConfig::OPEN);
        for (i, child) in node.children().iter().enumerate() {
            if i > 0 {
                out.push(config.list_separator);
            }
            out.push_str(&render_node(child, config));
        }
        out.push(SerializationConfig::CLOSE);
    }
    out
}

pub fn render_tree(tree: &GroupTree, config: &SerializationConfig) -> String {
    render_node(tree.root(), config)
}

/// Render a tree in the line format, one node per line.
pub fn render_tree_lines(tree: &GroupTree, config: &SerializationConfig) -> String {
    tree.root()
        .walk()
        .into_iter()
        .map(|(path, node)| {
            let group = render_group_escaping(node.group(), config, LINE_BREAKS);
            format!("{} {}", path.depth(), group)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Nested rendering with the default settings.
pub fn to_text(node: &GroupTreeNode) -> String {
    render_node(node, &SerializationConfig::default())
}
