//! Structural coordinates for nodes in a group tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sequence of child indices from the root to a node.
///
/// The root itself has the empty path. Paths are only meaningful against the
/// tree they were computed from; any structural change may invalidate them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    /// The path of the root node.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edges between the root and the node.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Path of the `index`-th child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Split into the parent path and the position within the parent.
    pub fn split_last(&self) -> Option<(IndexPath, usize)> {
        self.0
            .split_last()
            .map(|(last, rest)| (IndexPath(rest.to_vec()), *last))
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<IndexPath> {
        self.split_last().map(|(parent, _)| parent)
    }

    /// Whether `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &IndexPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Whether `self` equals `other` or lies below it.
    pub fn is_within(&self, other: &IndexPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Rewrite this path so it stays valid after the node at `removed` is detached.
    ///
    /// Returns `None` when this path points into the removed subtree.
    pub fn after_removal_of(&self, removed: &IndexPath) -> Option<IndexPath> {
        if self.is_within(removed) {
            return None;
        }
        let Some((removed_parent, removed_index)) = removed.split_last() else {
            return Some(self.clone());
        };
        let level = removed_parent.depth();
        let mut indices = self.0.clone();
        if removed_parent.is_ancestor_of(self) && indices[level] > removed_index {
            indices[level] -= 1;
        }
        Some(IndexPath(indices))
    }

    /// Rewrite this path so it stays valid after a node is inserted at `inserted`.
    pub fn after_insertion_at(&self, inserted: &IndexPath) -> IndexPath {
        let Some((parent, index)) = inserted.split_last() else {
            return self.clone();
        };
        let level = parent.depth();
        let mut indices = self.0.clone();
        if parent.is_ancestor_of(self) && indices[level] >= index {
            indices[level] += 1;
        }
        IndexPath(indices)
    }
}

impl From<Vec<usize>> for IndexPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for IndexPath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}
