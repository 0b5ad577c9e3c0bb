//! Shared builders for the integration tests.

#![allow(dead_code)]

pub mod fixtures;

use impress_groups::{
    Entry, Group, GroupTree, GroupTreeNode, HierarchyContext, IndexPath, MatchFlags, SearchScope,
};

pub fn explicit(name: &str, context: HierarchyContext, keys: &[&str]) -> Group {
    Group::explicit_with(name, context, keys.iter().copied())
}

pub fn keyword(name: &str, context: HierarchyContext, field: &str, pattern: &str) -> Group {
    Group::keyword(name, context, field, pattern, MatchFlags::new(false, false))
        .expect("literal pattern compiles")
}

pub fn search(name: &str, context: HierarchyContext, query: &str) -> Group {
    Group::search(
        name,
        context,
        query,
        MatchFlags::new(false, false),
        &SearchScope::default(),
    )
    .expect("literal query compiles")
}

pub fn path(indices: &[usize]) -> IndexPath {
    IndexPath::from(indices)
}

/// root -> [A -> [A1, A2], B -> [B1]]
pub fn sample_tree() -> GroupTree {
    let a = GroupTreeNode::with_children(
        explicit("A", HierarchyContext::Independent, &["x"]),
        vec![
            GroupTreeNode::new(explicit("A1", HierarchyContext::Refining, &["x", "y"])),
            GroupTreeNode::new(explicit("A2", HierarchyContext::Independent, &["z"])),
        ],
    );
    let b = GroupTreeNode::with_children(
        keyword("B", HierarchyContext::Including, "keywords", "rust"),
        vec![GroupTreeNode::new(search(
            "B1",
            HierarchyContext::Independent,
            "title=systems",
        ))],
    );
    GroupTree::from_root(GroupTreeNode::with_children(Group::all_entries(), vec![a, b]))
        .expect("valid tree")
}

pub fn sample_entries() -> Vec<Entry> {
    vec![
        Entry::new("x").with_field("title", "Systems programming"),
        Entry::new("y").with_field("keywords", "Rust, safety"),
        Entry::new("z").with_field("title", "Compilers"),
    ]
}
