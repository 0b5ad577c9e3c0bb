//! Reversible structural edits.
//!
//! Every mutation of a [`GroupTree`] made through this module returns an
//! [`EditRecord`] that can undo and redo it. Records address nodes only by
//! [`IndexPath`] and carry deep copies of whatever they replace, so they stay
//! valid while the tree changes around them, provided undo and redo are
//! applied in strict LIFO order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, EntryStore, FieldChange};
use crate::error::{GroupError, Result};
use crate::group::{Group, GroupKind};
use crate::path::IndexPath;
use crate::tree::{GroupTree, GroupTreeNode};

/// Effect of (un)assigning entries to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntryChange {
    /// Field edits made by a keyword group
    Fields(Vec<FieldChange>),
    /// Member set of an explicit group before and after
    Members {
        before: BTreeSet<String>,
        after: BTreeSet<String>,
    },
}

/// One reversible tree mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StructuralEdit {
    /// A subtree was inserted at `path`
    AddNode { path: IndexPath, subtree: GroupTreeNode },
    /// The node at `path` was removed; `snapshot` holds it with the children
    /// it had at the time
    RemoveNode {
        path: IndexPath,
        snapshot: GroupTreeNode,
        keep_children: bool,
    },
    /// A node moved from `from` (old coordinates) to `to` (new coordinates)
    MoveNode { from: IndexPath, to: IndexPath },
    /// The group of a node was replaced
    ModifyGroup { path: IndexPath, old: Group, new: Group },
    /// The child list of a node was replaced
    ModifySubtree {
        path: IndexPath,
        old_children: Vec<GroupTreeNode>,
        new_children: Vec<GroupTreeNode>,
    },
    /// Entries were (un)assigned to the group at `path`
    ChangeEntries { path: IndexPath, change: EntryChange },
    /// Several edits applied in order
    Compound(Vec<StructuralEdit>),
}

impl StructuralEdit {
    /// Revert this edit on the tree it was applied to.
    ///
    /// On failure the tree and the touched entries are left as they were,
    /// including for compound edits whose later parts fail.
    pub fn undo<S: EntryStore + ?Sized>(&self, tree: &mut GroupTree, entries: &mut S) -> Result<()> {
        self.atomically(tree, entries, |edit, tree, entries, journal| {
            edit.undo_logged(tree, entries, journal)
        })
    }

    /// Apply this edit again after it was undone. Same failure contract as
    /// [`StructuralEdit::undo`].
    pub fn redo<S: EntryStore + ?Sized>(&self, tree: &mut GroupTree, entries: &mut S) -> Result<()> {
        self.atomically(tree, entries, |edit, tree, entries, journal| {
            edit.redo_logged(tree, entries, journal)
        })
    }

    // Single edits validate before they mutate. Compound edits cannot, so
    // they run against a backup of the tree and a journal of field writes.
    fn atomically<S, F>(&self, tree: &mut GroupTree, entries: &mut S, replay_edit: F) -> Result<()>
    where
        S: EntryStore + ?Sized,
        F: FnOnce(&Self, &mut GroupTree, &mut S, &mut Vec<FieldChange>) -> Result<()>,
    {
        let mut journal = Vec::new();
        if !matches!(self, StructuralEdit::Compound(_)) {
            return replay_edit(self, tree, entries, &mut journal);
        }
        let backup = tree.clone();
        let result = replay_edit(self, tree, entries, &mut journal);
        if result.is_err() {
            *tree = backup;
            roll_back(entries, &journal);
        }
        result
    }

    fn undo_logged<S: EntryStore + ?Sized>(
        &self,
        tree: &mut GroupTree,
        entries: &mut S,
        journal: &mut Vec<FieldChange>,
    ) -> Result<()> {
        match self {
            StructuralEdit::AddNode { path, .. } => {
                replay(tree.detach(path), "removing added node").map(|_| ())
            }
            StructuralEdit::RemoveNode {
                path,
                snapshot,
                keep_children: false,
            } => reinsert(tree, path, snapshot.clone()),
            StructuralEdit::RemoveNode {
                path,
                snapshot,
                keep_children: true,
            } => restore_around_kept_children(tree, path, snapshot),
            StructuralEdit::MoveNode { from, to } => relocate(tree, to, from),
            StructuralEdit::ModifyGroup { path, old, .. } => {
                replay(tree.set_group(path, old.clone()), "restoring group").map(|_| ())
            }
            StructuralEdit::ModifySubtree {
                path, old_children, ..
            } => replay(
                tree.replace_children(path, old_children.clone()),
                "restoring subgroups",
            )
            .map(|_| ()),
            StructuralEdit::ChangeEntries { path, change } => match change {
                EntryChange::Fields(changes) => {
                    let inverse: Vec<FieldChange> =
                        changes.iter().rev().map(FieldChange::inverse).collect();
                    apply_field_changes(tree, path, &inverse, entries, journal)
                }
                EntryChange::Members { before, .. } => set_members(tree, path, before),
            },
            StructuralEdit::Compound(edits) => edits
                .iter()
                .rev()
                .try_for_each(|edit| edit.undo_logged(tree, &mut *entries, &mut *journal)),
        }
    }

    fn redo_logged<S: EntryStore + ?Sized>(
        &self,
        tree: &mut GroupTree,
        entries: &mut S,
        journal: &mut Vec<FieldChange>,
    ) -> Result<()> {
        match self {
            StructuralEdit::AddNode { path, subtree } => reinsert(tree, path, subtree.clone()),
            StructuralEdit::RemoveNode {
                path,
                keep_children,
                ..
            } => replay(tree.remove(path, *keep_children), "removing node").map(|_| ()),
            StructuralEdit::MoveNode { from, to } => relocate(tree, from, to),
            StructuralEdit::ModifyGroup { path, new, .. } => {
                replay(tree.set_group(path, new.clone()), "replacing group").map(|_| ())
            }
            StructuralEdit::ModifySubtree {
                path, new_children, ..
            } => replay(
                tree.replace_children(path, new_children.clone()),
                "replacing subgroups",
            )
            .map(|_| ()),
            StructuralEdit::ChangeEntries { path, change } => match change {
                EntryChange::Fields(changes) => {
                    apply_field_changes(tree, path, changes, entries, journal)
                }
                EntryChange::Members { after, .. } => set_members(tree, path, after),
            },
            StructuralEdit::Compound(edits) => edits
                .iter()
                .try_for_each(|edit| edit.redo_logged(tree, &mut *entries, &mut *journal)),
        }
    }
}

/// Put back the field values a failed replay overwrote, newest first.
fn roll_back<S: EntryStore + ?Sized>(entries: &mut S, journal: &[FieldChange]) {
    for change in journal.iter().rev() {
        if let Some(entry) = entries.entry_by_key_mut(&change.entry_key) {
            entry.put_field(&change.field, change.old_value.as_deref());
        }
    }
}

fn replay<T>(result: Result<T>, action: &str) -> Result<T> {
    result.map_err(|err| match err {
        GroupError::InconsistentUndoState(_) => err,
        other => GroupError::InconsistentUndoState(format!("{}: {}", action, other)),
    })
}

fn inconsistent(message: String) -> GroupError {
    GroupError::InconsistentUndoState(message)
}

fn parent_and_index(path: &IndexPath) -> Result<(IndexPath, usize)> {
    path.split_last()
        .ok_or_else(|| inconsistent("edit addresses the root as a child".to_string()))
}

fn reinsert(tree: &mut GroupTree, path: &IndexPath, node: GroupTreeNode) -> Result<()> {
    let (parent, index) = parent_and_index(path)?;
    replay(tree.insert_subtree(&parent, index, node), "re-inserting node").map(|_| ())
}

fn relocate(tree: &mut GroupTree, source: &IndexPath, target: &IndexPath) -> Result<()> {
    // `target` is in the coordinates of the tree without the moving node.
    let (parent, index) = parent_and_index(target)?;
    let current_parent = parent.after_insertion_at(source);
    if current_parent.is_within(source) {
        return Err(inconsistent(format!("cannot move {} below itself", source)));
    }
    replay(tree.resolve(source), "resolving moved node")?;
    let available = replay(tree.resolve(&current_parent), "resolving move target")?
        .children()
        .len();
    let same_parent = source.parent().as_ref() == Some(&parent);
    if index > available - usize::from(same_parent) {
        return Err(inconsistent(format!("cannot move {} to {}", source, target)));
    }
    let node = replay(tree.detach(source), "detaching moved node")?;
    replay(tree.insert_subtree(&parent, index, node), "re-attaching moved node").map(|_| ())
}

fn restore_around_kept_children(
    tree: &mut GroupTree,
    path: &IndexPath,
    snapshot: &GroupTreeNode,
) -> Result<()> {
    let (parent, index) = parent_and_index(path)?;
    let count = snapshot.children().len();
    let siblings = replay(tree.children_mut(&parent), "resolving parent of removed node")?;
    if index + count > siblings.len() {
        return Err(inconsistent(format!(
            "expected {} kept subgroups at {}",
            count, path
        )));
    }
    let kept: Vec<GroupTreeNode> = siblings.drain(index..index + count).collect();
    siblings.insert(
        index,
        GroupTreeNode::with_children(snapshot.group().clone(), kept),
    );
    Ok(())
}

fn apply_field_changes<S: EntryStore + ?Sized>(
    tree: &GroupTree,
    path: &IndexPath,
    changes: &[FieldChange],
    entries: &mut S,
    journal: &mut Vec<FieldChange>,
) -> Result<()> {
    replay(tree.resolve(path), "resolving group")?;
    if let Some(missing) = changes
        .iter()
        .find(|change| !entries.contains_key(&change.entry_key))
    {
        return Err(inconsistent(format!(
            "entry '{}' is no longer available",
            missing.entry_key
        )));
    }
    for change in changes {
        if let Some(entry) = entries.entry_by_key_mut(&change.entry_key) {
            let previous = entry.put_field(&change.field, change.new_value.as_deref());
            journal.push(FieldChange {
                entry_key: change.entry_key.clone(),
                field: change.field.clone(),
                old_value: previous,
                new_value: change.new_value.clone(),
            });
        }
    }
    Ok(())
}

fn set_members(tree: &mut GroupTree, path: &IndexPath, members: &BTreeSet<String>) -> Result<()> {
    let group = replay(tree.group_mut(path), "resolving explicit group")?;
    let name = group.name().to_string();
    let explicit = group
        .explicit_mut()
        .ok_or_else(|| inconsistent(format!("group '{}' is no longer explicit", name)))?;
    explicit.replace_members(members.clone());
    Ok(())
}

/// Lifecycle of a record on the undo stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditState {
    Created,
    Undone,
    Redone,
    Discarded,
}

/// A described, reversible edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    description: String,
    edit: StructuralEdit,
    state: EditState,
}

impl EditRecord {
    pub fn new(description: impl Into<String>, edit: StructuralEdit) -> Self {
        Self {
            description: description.into(),
            edit,
            state: EditState::Created,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn edit(&self) -> &StructuralEdit {
        &self.edit
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn undo<S: EntryStore + ?Sized>(&mut self, tree: &mut GroupTree, entries: &mut S) -> Result<()> {
        tracing::debug!("Undoing '{}'", self.description);
        self.edit.undo(tree, entries)?;
        self.state = EditState::Undone;
        Ok(())
    }

    pub fn redo<S: EntryStore + ?Sized>(&mut self, tree: &mut GroupTree, entries: &mut S) -> Result<()> {
        tracing::debug!("Redoing '{}'", self.description);
        self.edit.redo(tree, entries)?;
        self.state = EditState::Redone;
        Ok(())
    }

    pub fn discard(&mut self) {
        self.state = EditState::Discarded;
    }
}

fn group_name(tree: &GroupTree, path: &IndexPath) -> Result<String> {
    Ok(tree.resolve(path)?.group().name().to_string())
}

/// Append a new group below `parent`.
pub fn add_group(tree: &mut GroupTree, parent: &IndexPath, group: Group) -> Result<EditRecord> {
    let index = tree.resolve(parent)?.children().len();
    insert_group(tree, parent, index, group)
}

/// Insert a new group below `parent` at `index`.
pub fn insert_group(
    tree: &mut GroupTree,
    parent: &IndexPath,
    index: usize,
    group: Group,
) -> Result<EditRecord> {
    let description = format!("Add group '{}'", group.name());
    let subtree = GroupTreeNode::new(group);
    let path = tree.insert_subtree(parent, index, subtree.clone())?;
    Ok(EditRecord::new(
        description,
        StructuralEdit::AddNode { path, subtree },
    ))
}

/// Insert a copied subtree, e.g. when pasting or duplicating groups.
pub fn paste_subtree(
    tree: &mut GroupTree,
    parent: &IndexPath,
    index: usize,
    subtree: GroupTreeNode,
) -> Result<EditRecord> {
    let description = format!("Paste group '{}'", subtree.group().name());
    let path = tree.insert_subtree(parent, index, subtree.clone())?;
    Ok(EditRecord::new(
        description,
        StructuralEdit::AddNode { path, subtree },
    ))
}

pub fn remove_group(tree: &mut GroupTree, path: &IndexPath, keep_children: bool) -> Result<EditRecord> {
    let snapshot = tree.copy_subtree(path)?;
    tree.remove(path, keep_children)?;
    let description = if keep_children {
        format!("Remove group '{}'", snapshot.group().name())
    } else {
        format!("Remove group '{}' and subgroups", snapshot.group().name())
    };
    Ok(EditRecord::new(
        description,
        StructuralEdit::RemoveNode {
            path: path.clone(),
            snapshot,
            keep_children,
        },
    ))
}

/// Move a group; see [`GroupTree::move_node`] for the coordinates.
pub fn move_group(
    tree: &mut GroupTree,
    path: &IndexPath,
    new_parent: &IndexPath,
    index: usize,
) -> Result<EditRecord> {
    let name = group_name(tree, path)?;
    let to = tree.move_node(path, new_parent, index)?;
    Ok(EditRecord::new(
        format!("Move group '{}'", name),
        StructuralEdit::MoveNode {
            from: path.clone(),
            to,
        },
    ))
}

/// Replace the group of a node, e.g. after editing it in a dialog.
pub fn modify_group(tree: &mut GroupTree, path: &IndexPath, group: Group) -> Result<EditRecord> {
    let new = group.clone();
    let old = tree.set_group(path, group)?;
    Ok(EditRecord::new(
        format!("Modify group '{}'", old.name()),
        StructuralEdit::ModifyGroup {
            path: path.clone(),
            old,
            new,
        },
    ))
}

fn modify_subtree(
    tree: &mut GroupTree,
    path: &IndexPath,
    description: String,
    change: impl FnOnce(&mut GroupTree) -> Result<()>,
) -> Result<EditRecord> {
    let old_children = tree.resolve(path)?.children().to_vec();
    change(tree)?;
    let new_children = tree.resolve(path)?.children().to_vec();
    Ok(EditRecord::new(
        description,
        StructuralEdit::ModifySubtree {
            path: path.clone(),
            old_children,
            new_children,
        },
    ))
}

pub fn sort_subgroups(tree: &mut GroupTree, path: &IndexPath, recursive: bool) -> Result<EditRecord> {
    let description = format!("Sort subgroups of '{}'", group_name(tree, path)?);
    modify_subtree(tree, path, description, |tree| {
        tree.sort_children(path, recursive)
    })
}

pub fn remove_subgroups(tree: &mut GroupTree, path: &IndexPath) -> Result<EditRecord> {
    let description = format!("Remove subgroups of '{}'", group_name(tree, path)?);
    modify_subtree(tree, path, description, |tree| {
        tree.remove_children(path).map(|_| ())
    })
}

fn change_entries(
    tree: &mut GroupTree,
    path: &IndexPath,
    entries: &mut [Entry],
    assign: bool,
) -> Result<EditRecord> {
    let group = tree.group_mut(path)?;
    let before = group.explicit_members().cloned();
    let changes = if assign {
        group.add_entries(entries)?
    } else {
        group.remove_entries(entries)?
    };
    let change = match (before, group.kind()) {
        (Some(before), GroupKind::Explicit(explicit)) => EntryChange::Members {
            before,
            after: explicit.members().clone(),
        },
        _ => EntryChange::Fields(changes),
    };
    let description = if assign {
        format!("Assign entries to '{}'", group.name())
    } else {
        format!("Remove entries from '{}'", group.name())
    };
    Ok(EditRecord::new(
        description,
        StructuralEdit::ChangeEntries {
            path: path.clone(),
            change,
        },
    ))
}

/// Assign entries to the group at `path`.
pub fn assign_entries(tree: &mut GroupTree, path: &IndexPath, entries: &mut [Entry]) -> Result<EditRecord> {
    change_entries(tree, path, entries, true)
}

/// Remove entries from the group at `path`.
pub fn unassign_entries(
    tree: &mut GroupTree,
    path: &IndexPath,
    entries: &mut [Entry],
) -> Result<EditRecord> {
    change_entries(tree, path, entries, false)
}

/// Bundle records that were applied in order into one undo step.
pub fn compound(description: impl Into<String>, records: Vec<EditRecord>) -> EditRecord {
    EditRecord::new(
        description,
        StructuralEdit::Compound(records.into_iter().map(|record| record.edit).collect()),
    )
}
