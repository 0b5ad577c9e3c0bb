//! Hierarchy-aware membership resolution.
//!
//! The evaluator flattens a tree once, then answers "is this entry in this
//! group, given the contexts of its ancestors and descendants" per entry,
//! caching each node's result so shared subtrees are resolved only once.

use crate::entry::Entry;
use crate::error::{GroupError, Result};
use crate::group::{Group, HierarchyContext};
use crate::path::IndexPath;
use crate::tree::GroupTreeNode;

struct FlatNode<'t> {
    group: &'t Group,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A flattened, read-only view of a group tree.
pub struct HierarchyEvaluator<'t> {
    nodes: Vec<FlatNode<'t>>,
    // Pre-order, so sorted and searchable.
    paths: Vec<IndexPath>,
}

impl<'t> HierarchyEvaluator<'t> {
    pub fn new(root: &'t GroupTreeNode) -> Self {
        let mut evaluator = Self {
            nodes: Vec::new(),
            paths: Vec::new(),
        };
        evaluator.flatten(root, None, IndexPath::root());
        evaluator
    }

    fn flatten(&mut self, node: &'t GroupTreeNode, parent: Option<usize>, path: IndexPath) -> usize {
        let index = self.nodes.len();
        self.nodes.push(FlatNode {
            group: node.group(),
            parent,
            children: Vec::with_capacity(node.children().len()),
        });
        self.paths.push(path.clone());
        for (i, child) in node.children().iter().enumerate() {
            let child_index = self.flatten(child, Some(index), path.child(i));
            self.nodes[index].children.push(child_index);
        }
        index
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flat index of the node at `path`.
    pub fn node_index(&self, path: &IndexPath) -> Result<usize> {
        self.paths
            .binary_search(path)
            .map_err(|_| GroupError::StalePath(path.clone()))
    }

    /// Path of a flat node, `None` for an index this evaluator does not know.
    pub fn path(&self, node: usize) -> Option<&IndexPath> {
        self.paths.get(node)
    }

    pub fn group(&self, node: usize) -> Option<&'t Group> {
        self.nodes.get(node).map(|flat| flat.group)
    }

    /// Ancestors from the root down to the parent.
    pub fn ancestors_of(&self, node: usize) -> Option<Vec<usize>> {
        let mut result = Vec::new();
        let mut current = self.nodes.get(node)?.parent;
        while let Some(parent) = current {
            result.push(parent);
            current = self.nodes[parent].parent;
        }
        result.reverse();
        Some(result)
    }

    /// All descendants in pre-order.
    pub fn descendants_of(&self, node: usize) -> Option<Vec<usize>> {
        let path = self.paths.get(node)?;
        let end = self.paths[node + 1..]
            .iter()
            .position(|other| !path.is_ancestor_of(other))
            .map_or(self.paths.len(), |offset| node + 1 + offset);
        Some((node + 1..end).collect())
    }

    /// Start resolving memberships for one entry.
    pub fn pass<'e>(&'e self, entry: &'e Entry) -> EntryPass<'t, 'e> {
        EntryPass {
            evaluator: self,
            entry,
            own: vec![None; self.nodes.len()],
            resolved: vec![[None; 3]; self.nodes.len()],
        }
    }
}

/// Memoized membership of one entry across every node of a tree.
pub struct EntryPass<'t, 'e> {
    evaluator: &'e HierarchyEvaluator<'t>,
    entry: &'e Entry,
    own: Vec<Option<bool>>,
    resolved: Vec<[Option<bool>; 3]>,
}

impl EntryPass<'_, '_> {
    /// The node's own match, ignoring the hierarchy. Unknown nodes match nothing.
    pub fn own_contains(&mut self, node: usize) -> bool {
        match self.own.get(node) {
            Some(Some(hit)) => return *hit,
            Some(None) => {}
            None => return false,
        }
        let hit = self.evaluator.nodes[node].group.contains(self.entry);
        self.own[node] = Some(hit);
        hit
    }

    /// The node's match with its context applied. Unknown nodes match nothing.
    pub fn effective_contains(&mut self, node: usize) -> bool {
        let evaluator = self.evaluator;
        match evaluator.nodes.get(node) {
            Some(flat) => self.resolve(node, flat.group.context()),
            None => false,
        }
    }

    // `origin` is the context of the node the query started from. A refining
    // chain stops at an including origin and vice versa, so resolution never
    // walks back the way it came.
    fn resolve(&mut self, node: usize, origin: HierarchyContext) -> bool {
        if let Some(hit) = self.resolved[node][origin.slot()] {
            return hit;
        }
        let evaluator = self.evaluator;
        let flat = &evaluator.nodes[node];
        let own = self.own_contains(node);
        let hit = match flat.group.context() {
            HierarchyContext::Independent => own,
            HierarchyContext::Refining => match flat.parent {
                Some(parent) if origin != HierarchyContext::Including => {
                    own && self.resolve(parent, origin)
                }
                _ => own,
            },
            HierarchyContext::Including => {
                if origin == HierarchyContext::Refining {
                    own
                } else {
                    own || flat.children.iter().any(|&child| self.resolve(child, origin))
                }
            }
        };
        self.resolved[node][origin.slot()] = Some(hit);
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::HierarchyContext::{Including, Independent, Refining};
    use crate::tree::GroupTree;

    fn members(name: &str, context: HierarchyContext, keys: &[&str]) -> Group {
        Group::explicit_with(name, context, keys.iter().copied())
    }

    fn at(indices: &[usize]) -> IndexPath {
        IndexPath::from(indices)
    }

    fn effective(tree: &GroupTree, path: &[usize], key: &str) -> bool {
        let evaluator = HierarchyEvaluator::new(tree.root());
        let node = evaluator.node_index(&at(path)).unwrap();
        evaluator.pass(&Entry::new(key)).effective_contains(node)
    }

    #[test]
    fn refining_intersects_with_parent() {
        let mut tree = GroupTree::new();
        let parent = tree
            .add_child(&IndexPath::root(), members("P", Independent, &["a", "b"]))
            .unwrap();
        tree.add_child(&parent, members("C", Refining, &["b", "c"])).unwrap();

        assert!(!effective(&tree, &[0, 0], "a"));
        assert!(effective(&tree, &[0, 0], "b"));
        assert!(!effective(&tree, &[0, 0], "c"));
    }

    #[test]
    fn refining_chain_walks_to_the_top() {
        let mut tree = GroupTree::new();
        let a = tree
            .add_child(&IndexPath::root(), members("A", Independent, &["x", "y"]))
            .unwrap();
        let b = tree.add_child(&a, members("B", Refining, &["x", "y", "z"])).unwrap();
        tree.add_child(&b, members("C", Refining, &["y", "z"])).unwrap();

        assert!(effective(&tree, &[0, 0, 0], "y"));
        assert!(!effective(&tree, &[0, 0, 0], "z"));
    }

    #[test]
    fn including_unites_with_descendants() {
        let mut tree = GroupTree::new();
        let parent = tree
            .add_child(&IndexPath::root(), members("P", Including, &["a"]))
            .unwrap();
        let child = tree.add_child(&parent, members("C", Including, &["b"])).unwrap();
        tree.add_child(&child, members("G", Independent, &["c"])).unwrap();

        for key in ["a", "b", "c"] {
            assert!(effective(&tree, &[0], key), "{key}");
        }
        assert!(!effective(&tree, &[0], "d"));
        assert!(!effective(&tree, &[0, 0], "a"));
    }

    #[test]
    fn refining_below_including_is_not_pulled_up() {
        let mut tree = GroupTree::new();
        let parent = tree
            .add_child(&IndexPath::root(), members("P", Including, &["a"]))
            .unwrap();
        tree.add_child(&parent, members("C", Refining, &["b"])).unwrap();

        // The child's own match counts for the including parent.
        assert!(effective(&tree, &[0], "b"));
        // Queried directly, the child still refines its parent.
        assert!(!effective(&tree, &[0, 0], "b"));
    }

    #[test]
    fn independent_ignores_tree() {
        let mut tree = GroupTree::new();
        let parent = tree
            .add_child(&IndexPath::root(), members("P", Independent, &["a"]))
            .unwrap();
        tree.add_child(&parent, members("C", Independent, &["b"])).unwrap();

        assert!(effective(&tree, &[0, 0], "b"));
        assert!(!effective(&tree, &[0], "b"));
    }

    #[test]
    fn refining_directly_below_root() {
        let mut tree = GroupTree::new();
        tree.add_child(&IndexPath::root(), members("C", Refining, &["b"]))
            .unwrap();
        assert!(effective(&tree, &[0], "b"));
        assert!(!effective(&tree, &[0], "a"));
    }

    #[test]
    fn ancestors_and_descendants() {
        let mut tree = GroupTree::new();
        let a = tree.add_child(&IndexPath::root(), members("A", Independent, &[])).unwrap();
        tree.add_child(&a, members("A1", Independent, &[])).unwrap();
        tree.add_child(&IndexPath::root(), members("B", Independent, &[])).unwrap();

        let evaluator = HierarchyEvaluator::new(tree.root());
        let a1 = evaluator.node_index(&at(&[0, 0])).unwrap();
        assert_eq!(evaluator.ancestors_of(a1), Some(vec![0, 1]));
        assert_eq!(evaluator.descendants_of(0), Some(vec![1, 2, 3]));
        assert_eq!(evaluator.descendants_of(1), Some(vec![2]));
        assert_eq!(evaluator.descendants_of(3), Some(Vec::new()));
        assert_eq!(evaluator.group(3).map(Group::name), Some("B"));
        assert_eq!(evaluator.path(a1), Some(&at(&[0, 0])));
    }

    #[test]
    fn unknown_node_index_is_absent() {
        let tree = GroupTree::new();
        let evaluator = HierarchyEvaluator::new(tree.root());
        assert_eq!(evaluator.path(1), None);
        assert!(evaluator.group(1).is_none());
        assert_eq!(evaluator.ancestors_of(1), None);
        assert_eq!(evaluator.descendants_of(1), None);

        let entry = Entry::new("x");
        let mut pass = evaluator.pass(&entry);
        assert!(!pass.own_contains(5));
        assert!(!pass.effective_contains(5));
        assert!(pass.effective_contains(0));
    }

    #[test]
    fn unknown_path_is_stale() {
        let tree = GroupTree::new();
        let evaluator = HierarchyEvaluator::new(tree.root());
        assert_eq!(evaluator.node_index(&at(&[0])), Err(GroupError::StalePath(at(&[0]))));
    }
}
