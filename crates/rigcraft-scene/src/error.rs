//! Error types for scene backend operations.

use thiserror::Error;

use crate::node::{NodeId, Plug};

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised by a scene backend.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A node handle no longer refers to a live node.
    #[error("node {0:?} has been deleted or never existed")]
    NodeNotFound(NodeId),

    /// A node cannot be its own ancestor.
    #[error("re-parenting {node:?} under {parent:?} would create a cycle")]
    ParentCycle {
        /// Node being re-parented.
        node: NodeId,
        /// Requested parent.
        parent: NodeId,
    },

    /// The named attribute does not exist on the node.
    #[error("node '{node}' has no attribute '{attr}'")]
    AttrNotFound {
        /// Node name at the time of the error.
        node: String,
        /// Attribute name.
        attr: String,
    },

    /// An attribute with this name already exists on the node.
    #[error("node '{node}' already has an attribute '{attr}'")]
    AttrExists {
        /// Node name at the time of the error.
        node: String,
        /// Attribute name.
        attr: String,
    },

    /// A locked attribute was written.
    #[error("attribute '{attr}' on '{node}' is locked")]
    AttrLocked {
        /// Node name at the time of the error.
        node: String,
        /// Attribute name.
        attr: String,
    },

    /// A scalar was supplied where a vector was expected, or vice versa.
    #[error("attribute '{attr}' on '{node}' has a different value shape")]
    AttrShape {
        /// Node name at the time of the error.
        node: String,
        /// Attribute name.
        attr: String,
    },

    /// The operation requires a different node kind.
    #[error("node '{node}' is not a {expected}")]
    WrongKind {
        /// Node name at the time of the error.
        node: String,
        /// Expected kind description.
        expected: &'static str,
    },

    /// Attribute evaluation detected a dependency cycle.
    #[error("attribute graph cycle while evaluating {0}")]
    EvalCycle(Plug),

    /// A cluster or follicle addressed CVs outside the surface.
    #[error("surface '{node}' has no CV row {row}")]
    CvRange {
        /// Surface name.
        node: String,
        /// Offending row index.
        row: usize,
    },
}
