//! Error types for impress-groups

use thiserror::Error;

use crate::path::IndexPath;

/// Result type alias for group operations
pub type Result<T> = std::result::Result<T, GroupError>;

/// Errors raised by the group engine.
///
/// `PatternSyntax`, `Unsupported`, `StalePath`, `CycleRejected` and
/// `InvalidMove` are recovered by the immediate caller. `MalformedGroupData`
/// and `InconsistentUndoState` are surfaced to the user as non-fatal
/// conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// A regular expression or query could not be compiled
    #[error("Invalid pattern '{pattern}': {message}")]
    PatternSyntax { pattern: String, message: String },

    /// Mutation attempted on a read-only group kind
    #[error("Group '{group}' does not support {operation}")]
    Unsupported {
        group: String,
        operation: &'static str,
    },

    /// Serialized group data could not be parsed
    #[error("Malformed group data: {0}")]
    MalformedGroupData(String),

    /// A move would make a node its own ancestor
    #[error("Cannot move {node} below its own descendant {target}")]
    CycleRejected { node: IndexPath, target: IndexPath },

    /// A move that is structurally impossible (root, index out of range)
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// An index path no longer resolves in the current tree
    #[error("Index path {0} does not resolve")]
    StalePath(IndexPath),

    /// The all-entries group may only live at the root
    #[error("All-entries group is only allowed at the root: {0}")]
    AllEntriesMisplaced(String),

    /// An undo or redo replay hit a tree that no longer matches its record
    #[error("Inconsistent undo state: {0}")]
    InconsistentUndoState(String),
}

impl GroupError {
    pub(crate) fn pattern(pattern: &str, err: impl std::fmt::Display) -> Self {
        GroupError::PatternSyntax {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        GroupError::MalformedGroupData(message.into())
    }

    pub(crate) fn unsupported(group: &str, operation: &'static str) -> Self {
        GroupError::Unsupported {
            group: group.to_string(),
            operation,
        }
    }

    /// Whether the caller can recover locally (recompute a path, disable an action).
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GroupError::MalformedGroupData(_) | GroupError::InconsistentUndoState(_)
        )
    }
}
