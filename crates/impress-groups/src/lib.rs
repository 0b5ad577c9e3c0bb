//! impress-groups: Hierarchical entry groups for reference libraries.
//!
//! A group tree holds named filters over bibliographic entries. Groups are
//! explicit key sets, keyword matches on a field, or free-form searches; each
//! composes with its ancestors or descendants through its hierarchical
//! context. Trees persist to a compact quoted text format, and every
//! structural edit can be undone through index-path addressed records.

#[cfg(feature = "native")]
uniffi::setup_scaffolding!();

pub mod codec;
pub mod config;
pub mod edit;
pub mod entry;
pub mod error;
pub mod group;
pub mod hierarchy;
pub mod matcher;
pub mod parser;
pub mod path;
pub mod query;
pub mod tree;
pub mod undo;
pub mod writer;

pub use config::{GroupsConfig, SearchScope, SerializationConfig, UndoConfig};
pub use edit::{EditRecord, EditState, EntryChange, StructuralEdit};
pub use entry::{Entry, EntryStore, FieldChange};
pub use error::{GroupError, Result};
pub use group::{Group, GroupDetails, GroupKind, HierarchyContext};
pub use hierarchy::HierarchyEvaluator;
pub use matcher::{EntryMatcher, MatchFlags, MatcherKind};
pub use parser::{load_tree_or_default, parse_tree, parse_tree_lines, parse_tree_with};
pub use path::IndexPath;
pub use tree::{GroupTree, GroupTreeNode, SelectionMatcher};
pub use undo::UndoManager;
pub use writer::{render_tree, render_tree_lines};
