//! Constraint records.
//!
//! Constraints are stored structurally, not solved: the build pipeline only
//! reads the rest pose, and the host application evaluates constraints at
//! playback time. Tests assert against the recorded wiring.

use crate::node::NodeId;

/// Which channels a constraint drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Translation and rotation.
    Parent,
    /// Rotation only.
    Orient,
    /// Translation only.
    Point,
    /// Scale only.
    Scale,
    /// Pole-vector target for an IK handle.
    PoleVector,
}

/// A recorded constraint between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Channel set.
    pub kind: ConstraintKind,
    /// Driving node (the constraint target).
    pub driver: NodeId,
    /// Driven node.
    pub driven: NodeId,
    /// Whether the driven node keeps its current offset from the driver.
    pub maintain_offset: bool,
}
