//! The group tree and its structural operations.
//!
//! Nodes own their children exclusively; positions are addressed by
//! [`IndexPath`]. All mutating operations validate their arguments before
//! touching the tree, so a failed call leaves the tree unchanged.

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::{GroupError, Result};
use crate::group::Group;
use crate::hierarchy::HierarchyEvaluator;
use crate::matcher::{EntryMatcher, MatcherKind, NotMatcher};
use crate::path::IndexPath;

/// A node owning one group and an ordered list of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTreeNode {
    group: Group,
    #[serde(default)]
    children: Vec<GroupTreeNode>,
}

impl GroupTreeNode {
    pub fn new(group: Group) -> Self {
        Self {
            group,
            children: Vec::new(),
        }
    }

    pub fn with_children(group: Group, children: Vec<GroupTreeNode>) -> Self {
        Self { group, children }
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn children(&self) -> &[GroupTreeNode] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&GroupTreeNode> {
        self.children.get(index)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Split into the group and the children.
    pub fn into_parts(self) -> (Group, Vec<GroupTreeNode>) {
        (self.group, self.children)
    }

    /// Resolve a path relative to this node.
    pub fn descendant(&self, path: &IndexPath) -> Option<&GroupTreeNode> {
        path.as_slice()
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    pub(crate) fn descendant_mut(&mut self, path: &IndexPath) -> Option<&mut GroupTreeNode> {
        let mut node = self;
        for &index in path.as_slice() {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Path of `target` below this node, by identity.
    pub fn path_of(&self, target: &GroupTreeNode) -> Option<IndexPath> {
        if std::ptr::eq(self, target) {
            return Some(IndexPath::root());
        }
        self.children.iter().enumerate().find_map(|(i, child)| {
            child.path_of(target).map(|sub| {
                let mut indices = vec![i];
                indices.extend_from_slice(sub.as_slice());
                IndexPath::from(indices)
            })
        })
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_size).sum::<usize>()
    }

    /// Every node of the subtree in pre-order, with paths relative to this node.
    pub fn walk(&self) -> Vec<(IndexPath, &GroupTreeNode)> {
        let mut out = Vec::new();
        self.walk_into(IndexPath::root(), &mut out);
        out
    }

    fn walk_into<'a>(&'a self, path: IndexPath, out: &mut Vec<(IndexPath, &'a GroupTreeNode)>) {
        out.push((path.clone(), self));
        for (i, child) in self.children.iter().enumerate() {
            child.walk_into(path.child(i), out);
        }
    }

    pub(crate) fn contains_all_entries(&self) -> bool {
        self.group.is_all_entries() || self.children.iter().any(Self::contains_all_entries)
    }

    fn sort_children_by_name(&mut self, recursive: bool) {
        self.children
            .sort_by_cached_key(|child| child.group.name().to_lowercase());
        if recursive {
            for child in &mut self.children {
                child.sort_children_by_name(true);
            }
        }
    }

    /// Draw the subtree with box characters.
    pub fn format_tree(&self) -> String {
        let mut output = String::new();
        self.format_subtree("", true, true, &mut output);
        output
    }

    fn format_subtree(&self, prefix: &str, is_last: bool, is_top: bool, output: &mut String) {
        let connector = if is_top {
            ""
        } else if is_last {
            "└── "
        } else {
            "├── "
        };
        output.push_str(&format!(
            "{}{}{} [{}",
            prefix,
            connector,
            self.group.name(),
            self.group.kind_name()
        ));
        if self.group.context() != Default::default() {
            output.push_str(&format!(", {:?}", self.group.context()).to_lowercase());
        }
        output.push_str("]\n");

        let child_prefix = if is_top {
            String::new()
        } else if is_last {
            format!("{}    ", prefix)
        } else {
            format!("{}│   ", prefix)
        };
        for (i, child) in self.children.iter().enumerate() {
            child.format_subtree(&child_prefix, i == self.children.len() - 1, false, output);
        }
    }
}

/// A group tree rooted at the single all-entries group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GroupTreeNode", into = "GroupTreeNode")]
pub struct GroupTree {
    root: GroupTreeNode,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<GroupTreeNode> for GroupTree {
    type Error = GroupError;

    fn try_from(root: GroupTreeNode) -> Result<Self> {
        GroupTree::from_root(root)
    }
}

impl From<GroupTree> for GroupTreeNode {
    fn from(tree: GroupTree) -> Self {
        tree.root
    }
}

impl GroupTree {
    /// A tree holding only the all-entries root.
    pub fn new() -> Self {
        Self {
            root: GroupTreeNode::new(Group::all_entries()),
        }
    }

    /// Wrap a root node, checking that all-entries appears exactly once, at the root.
    pub fn from_root(root: GroupTreeNode) -> Result<Self> {
        if !root.group.is_all_entries() {
            return Err(GroupError::AllEntriesMisplaced(format!(
                "root group '{}' is a {} group",
                root.group.name(),
                root.group.kind_name()
            )));
        }
        if root.children.iter().any(GroupTreeNode::contains_all_entries) {
            return Err(GroupError::AllEntriesMisplaced(
                "found below the root".to_string(),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &GroupTreeNode {
        &self.root
    }

    pub fn into_root(self) -> GroupTreeNode {
        self.root
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.root.subtree_size()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolve a path, failing with `StalePath` when an index is out of range.
    pub fn resolve(&self, path: &IndexPath) -> Result<&GroupTreeNode> {
        self.root
            .descendant(path)
            .ok_or_else(|| GroupError::StalePath(path.clone()))
    }

    fn resolve_mut(&mut self, path: &IndexPath) -> Result<&mut GroupTreeNode> {
        self.root
            .descendant_mut(path)
            .ok_or_else(|| GroupError::StalePath(path.clone()))
    }

    /// Path of a node borrowed from this tree.
    pub fn index_path(&self, node: &GroupTreeNode) -> Option<IndexPath> {
        self.root.path_of(node)
    }

    /// First node (pre-order) whose group has this name.
    pub fn find_by_name(&self, name: &str) -> Option<IndexPath> {
        self.root
            .walk()
            .into_iter()
            .find(|(_, node)| node.group.name() == name)
            .map(|(path, _)| path)
    }

    /// Append a new leaf below `parent`.
    pub fn add_child(&mut self, parent: &IndexPath, group: Group) -> Result<IndexPath> {
        let index = self.resolve(parent)?.children.len();
        self.insert_subtree(parent, index, GroupTreeNode::new(group))
    }

    /// Insert a new leaf below `parent` at `index`.
    pub fn insert_child(&mut self, parent: &IndexPath, index: usize, group: Group) -> Result<IndexPath> {
        self.insert_subtree(parent, index, GroupTreeNode::new(group))
    }

    /// Insert a whole subtree below `parent` at `index`.
    pub fn insert_subtree(
        &mut self,
        parent: &IndexPath,
        index: usize,
        node: GroupTreeNode,
    ) -> Result<IndexPath> {
        if node.contains_all_entries() {
            return Err(GroupError::AllEntriesMisplaced(format!(
                "cannot insert below {}",
                parent
            )));
        }
        let parent_node = self.resolve_mut(parent)?;
        if index > parent_node.children.len() {
            return Err(GroupError::StalePath(parent.child(index)));
        }
        tracing::debug!("Inserting group '{}' at {}", node.group.name(), parent.child(index));
        parent_node.children.insert(index, node);
        Ok(parent.child(index))
    }

    /// Detach the node at `path` with its subtree.
    pub(crate) fn detach(&mut self, path: &IndexPath) -> Result<GroupTreeNode> {
        let Some((parent, index)) = path.split_last() else {
            return Err(GroupError::InvalidMove("the root group cannot be detached".into()));
        };
        let parent_node = self.resolve_mut(&parent)?;
        if index >= parent_node.children.len() {
            return Err(GroupError::StalePath(path.clone()));
        }
        Ok(parent_node.children.remove(index))
    }

    /// Remove the node at `path`.
    ///
    /// With `keep_children`, the node's children take its place in the parent,
    /// in their original order, and the returned node has no children.
    pub fn remove(&mut self, path: &IndexPath, keep_children: bool) -> Result<GroupTreeNode> {
        let mut removed = self.detach(path)?;
        tracing::debug!(
            "Removed group '{}' at {} (keep children: {})",
            removed.group.name(),
            path,
            keep_children
        );
        if keep_children {
            if let Some((parent, index)) = path.split_last() {
                let children = std::mem::take(&mut removed.children);
                let parent_node = self.resolve_mut(&parent)?;
                parent_node.children.splice(index..index, children);
            }
        }
        Ok(removed)
    }

    /// Move the node at `path` below `new_parent` at `index`.
    ///
    /// `new_parent` is given in the coordinates of the tree before the move;
    /// `index` is the position among the new parent's children once the node
    /// has been detached. Returns the node's new path.
    pub fn move_node(&mut self, path: &IndexPath, new_parent: &IndexPath, index: usize) -> Result<IndexPath> {
        if path.is_root() {
            return Err(GroupError::InvalidMove("the root group cannot be moved".into()));
        }
        if new_parent.is_within(path) {
            return Err(GroupError::CycleRejected {
                node: path.clone(),
                target: new_parent.clone(),
            });
        }
        self.resolve(path)?;
        let target = self.resolve(new_parent)?;
        let Some(adjusted_parent) = new_parent.after_removal_of(path) else {
            return Err(GroupError::CycleRejected {
                node: path.clone(),
                target: new_parent.clone(),
            });
        };
        let same_parent = path.parent().as_ref() == Some(new_parent);
        let available = target.children.len() - usize::from(same_parent);
        if index > available {
            return Err(GroupError::InvalidMove(format!(
                "index {} out of range for {} (0..={})",
                index, new_parent, available
            )));
        }

        let node = self.detach(path)?;
        tracing::debug!("Moving group '{}' from {} to {}", node.group.name(), path, adjusted_parent.child(index));
        self.insert_subtree(&adjusted_parent, index, node)
    }

    /// Deep copy of the subtree at `path`.
    pub fn copy_subtree(&self, path: &IndexPath) -> Result<GroupTreeNode> {
        self.resolve(path).cloned()
    }

    /// Replace the group of a node, returning the previous group.
    pub fn set_group(&mut self, path: &IndexPath, group: Group) -> Result<Group> {
        if path.is_root() != group.is_all_entries() {
            return Err(GroupError::AllEntriesMisplaced(format!(
                "cannot put a {} group at {}",
                group.kind_name(),
                path
            )));
        }
        let node = self.resolve_mut(path)?;
        Ok(std::mem::replace(&mut node.group, group))
    }

    pub(crate) fn children_mut(&mut self, path: &IndexPath) -> Result<&mut Vec<GroupTreeNode>> {
        Ok(&mut self.resolve_mut(path)?.children)
    }

    pub(crate) fn group_mut(&mut self, path: &IndexPath) -> Result<&mut Group> {
        Ok(&mut self.resolve_mut(path)?.group)
    }

    /// Replace all children of a node, returning the previous ones.
    pub fn replace_children(
        &mut self,
        path: &IndexPath,
        children: Vec<GroupTreeNode>,
    ) -> Result<Vec<GroupTreeNode>> {
        if children.iter().any(GroupTreeNode::contains_all_entries) {
            return Err(GroupError::AllEntriesMisplaced(format!("cannot place below {}", path)));
        }
        let node = self.resolve_mut(path)?;
        Ok(std::mem::replace(&mut node.children, children))
    }

    /// Sort the children of a node by name, case-insensitively.
    pub fn sort_children(&mut self, path: &IndexPath, recursive: bool) -> Result<()> {
        self.resolve_mut(path)?.sort_children_by_name(recursive);
        Ok(())
    }

    /// Remove all children of a node, returning them.
    pub fn remove_children(&mut self, path: &IndexPath) -> Result<Vec<GroupTreeNode>> {
        self.replace_children(path, Vec::new())
    }

    /// The node's own match, ignoring the hierarchy.
    pub fn contains(&self, path: &IndexPath, entry: &Entry) -> Result<bool> {
        Ok(self.resolve(path)?.group.contains(entry))
    }

    /// The node's match with its hierarchical context applied.
    pub fn effective_contains(&self, path: &IndexPath, entry: &Entry) -> Result<bool> {
        let evaluator = HierarchyEvaluator::new(&self.root);
        let node = evaluator.node_index(path)?;
        Ok(evaluator.pass(entry).effective_contains(node))
    }

    /// Entries matched by a node with its hierarchical context applied.
    pub fn matching_entries<'e>(&self, path: &IndexPath, entries: &'e [Entry]) -> Result<Vec<&'e Entry>> {
        let evaluator = HierarchyEvaluator::new(&self.root);
        let node = evaluator.node_index(path)?;
        Ok(entries
            .iter()
            .filter(|entry| evaluator.pass(entry).effective_contains(node))
            .collect())
    }

    /// Paths of every node whose effective match includes `entry`.
    pub fn groups_containing(&self, entry: &Entry) -> Vec<IndexPath> {
        let evaluator = HierarchyEvaluator::new(&self.root);
        let mut pass = evaluator.pass(entry);
        (0..evaluator.len())
            .filter(|&node| pass.effective_contains(node))
            .filter_map(|node| evaluator.path(node).cloned())
            .collect()
    }

    /// Combined matcher over several selected nodes.
    ///
    /// Each node contributes its hierarchy-resolved match. An empty selection
    /// matches nothing before `invert` is applied; callers treat it as "no
    /// grouping active".
    pub fn selection_matcher(
        &self,
        selected: &[IndexPath],
        kind: MatcherKind,
        invert: bool,
    ) -> Result<Box<dyn EntryMatcher + '_>> {
        let evaluator = HierarchyEvaluator::new(&self.root);
        let nodes = selected
            .iter()
            .map(|path| evaluator.node_index(path))
            .collect::<Result<Vec<_>>>()?;
        let selection = SelectionMatcher {
            evaluator,
            nodes,
            kind,
        };
        if invert {
            Ok(Box::new(NotMatcher(selection)))
        } else {
            Ok(Box::new(selection))
        }
    }

    pub fn format_tree(&self) -> String {
        self.root.format_tree()
    }
}

/// Hierarchy-resolved AND/OR over selected nodes, sharing one memo per entry.
pub struct SelectionMatcher<'t> {
    evaluator: HierarchyEvaluator<'t>,
    nodes: Vec<usize>,
    kind: MatcherKind,
}

impl SelectionMatcher<'_> {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl EntryMatcher for SelectionMatcher<'_> {
    fn is_match(&self, entry: &Entry) -> bool {
        let mut pass = self.evaluator.pass(entry);
        self.kind
            .combine(self.nodes.iter().map(|&node| pass.effective_contains(node)))
    }
}
