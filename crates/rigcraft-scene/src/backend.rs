//! The scene backend contract.
//!
//! Every mutation the rig builder performs goes through [`SceneBackend`], so
//! the same build code can target the in-memory scene used by the tests and
//! CLI, or an adapter onto a host application's command layer. Handles are
//! opaque [`NodeId`]s; node names are labels, never identity.

use std::ops::Range;

use glam::{DMat4, DQuat, DVec3};

use crate::constraint::{Constraint, ConstraintKind};
use crate::error::SceneResult;
use crate::node::{AttrDef, AttrValue, NodeId, NodeKind, Plug};
use crate::transform::LocalTransform;

/// A scene graph the rig builder can construct into.
pub trait SceneBackend {
    // ========================================================================
    // Node creation
    // ========================================================================

    /// Creates an empty transform (group).
    fn create_group(&mut self, name: &str, parent: Option<NodeId>) -> SceneResult<NodeId>;

    /// Creates a joint at a world-space position.
    fn create_joint(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        world_pos: DVec3,
    ) -> SceneResult<NodeId>;

    /// Creates a locator at the origin of its parent.
    fn create_locator(&mut self, name: &str, parent: Option<NodeId>) -> SceneResult<NodeId>;

    /// Creates a control curve from local-space CVs.
    fn create_curve(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        cvs: Vec<DVec3>,
        degree: u8,
    ) -> SceneResult<NodeId>;

    /// Creates a dataflow utility node. `kind` must be one of the utility
    /// kinds (multiply/divide, reverse, condition, blend, distance).
    fn create_utility(&mut self, name: &str, kind: NodeKind) -> SceneResult<NodeId>;

    /// Creates an IK handle spanning `start_joint..=end_joint`. The chain is
    /// recorded, not solved; pole targets attach via a pole-vector constraint.
    fn create_ik_handle(
        &mut self,
        name: &str,
        start_joint: NodeId,
        end_joint: NodeId,
    ) -> SceneResult<NodeId>;

    /// Creates a ribbon surface: a 5x4 CV grid centered on `center`, its five
    /// rows spread along `length_axis` over `length`, four columns across
    /// `width`.
    fn create_ribbon_surface(
        &mut self,
        name: &str,
        center: DVec3,
        length_axis: DVec3,
        length: f64,
        width: f64,
    ) -> SceneResult<NodeId>;

    /// Creates a cluster deforming the given CV row range of a surface. The
    /// cluster transform sits at the centroid of the deformed CVs.
    fn create_cluster(
        &mut self,
        name: &str,
        surface: NodeId,
        rows: Range<usize>,
    ) -> SceneResult<NodeId>;

    /// Creates a follicle pinned at `(u, v)` on a surface, positioned at the
    /// rest-pose surface point.
    fn create_follicle(
        &mut self,
        name: &str,
        surface: NodeId,
        u: f64,
        v: f64,
    ) -> SceneResult<NodeId>;

    // ========================================================================
    // Duplication, deletion, naming
    // ========================================================================

    /// Duplicates a single node (no children) under the same parent.
    fn duplicate_parent_only(&mut self, node: NodeId, new_name: &str) -> SceneResult<NodeId>;

    /// Duplicates a node and its whole subtree. Only the subtree root is
    /// renamed; descendants keep their names.
    fn duplicate_subtree(&mut self, node: NodeId, new_name: &str) -> SceneResult<NodeId>;

    /// Deletes a node and its subtree. Connections and constraints touching
    /// deleted nodes are dropped.
    fn delete(&mut self, node: NodeId) -> SceneResult<()>;

    /// Renames a node. The handle stays valid.
    fn rename(&mut self, node: NodeId, new_name: &str) -> SceneResult<()>;

    /// Current name of a node.
    fn name(&self, node: NodeId) -> SceneResult<String>;

    /// Kind of a node.
    fn kind(&self, node: NodeId) -> SceneResult<NodeKind>;

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Parent of a node, if any.
    fn parent_of(&self, node: NodeId) -> SceneResult<Option<NodeId>>;

    /// Direct children, in creation order.
    fn children_of(&self, node: NodeId) -> SceneResult<Vec<NodeId>>;

    /// All descendants, depth-first, excluding the node itself.
    fn descendants(&self, node: NodeId) -> SceneResult<Vec<NodeId>>;

    /// Moves a node under a new parent, preserving its world transform.
    /// Re-parenting onto the current parent is a no-op.
    fn reparent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> SceneResult<()>;

    // ========================================================================
    // Transforms
    // ========================================================================

    /// The stored local transform.
    fn local(&self, node: NodeId) -> SceneResult<LocalTransform>;

    /// World matrix, with connected transform channels evaluated.
    fn world_matrix(&self, node: NodeId) -> SceneResult<DMat4>;

    /// World-space position.
    fn world_position(&self, node: NodeId) -> SceneResult<DVec3>;

    /// World-space rotation.
    fn world_rotation(&self, node: NodeId) -> SceneResult<DQuat>;

    /// Sets the local translation.
    fn set_translation(&mut self, node: NodeId, translate: DVec3) -> SceneResult<()>;

    /// Sets the local XYZ rotation, degrees.
    fn set_rotation_deg(&mut self, node: NodeId, rotate: DVec3) -> SceneResult<()>;

    /// Sets the local scale.
    fn set_scale(&mut self, node: NodeId, scale: DVec3) -> SceneResult<()>;

    /// Sets the joint orient, degrees.
    fn set_joint_orient_deg(&mut self, node: NodeId, orient: DVec3) -> SceneResult<()>;

    /// Moves the node to a world-space position by adjusting its translation.
    fn set_world_position(&mut self, node: NodeId, pos: DVec3) -> SceneResult<()>;

    /// Rotates the node to a world-space orientation by adjusting its local
    /// rotation (joint orient is left untouched).
    fn set_world_rotation(&mut self, node: NodeId, rot: DQuat) -> SceneResult<()>;

    /// Folds the local rotation into the joint orient, leaving rotation zero
    /// and the world transform unchanged.
    fn freeze_rotation(&mut self, node: NodeId) -> SceneResult<()>;

    // ========================================================================
    // Attributes and connections
    // ========================================================================

    /// Adds a user attribute. Fails if the name is taken.
    fn add_attr(&mut self, node: NodeId, attr: &str, def: AttrDef) -> SceneResult<()>;

    /// Writes an attribute or transform channel. Clamped to the attribute's
    /// range; locked attributes reject the write.
    fn set_attr(&mut self, node: NodeId, attr: &str, value: AttrValue) -> SceneResult<()>;

    /// Reads an attribute, pulling through connections and utility nodes.
    fn get_attr(&self, node: NodeId, attr: &str) -> SceneResult<AttrValue>;

    /// Connects a source plug into a destination plug. A destination holds at
    /// most one incoming connection; reconnecting replaces it.
    fn connect(&mut self, src: Plug, dst: Plug) -> SceneResult<()>;

    /// Makes the named attributes non-keyable and locked.
    fn hide_and_lock(&mut self, node: NodeId, attrs: &[&str]) -> SceneResult<()>;

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Records a constraint.
    fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        driver: NodeId,
        driven: NodeId,
        maintain_offset: bool,
    ) -> SceneResult<()>;

    /// Constraints whose driven node is `driven`.
    fn constraints_on(&self, driven: NodeId) -> Vec<Constraint>;

    // ========================================================================
    // Queries
    // ========================================================================

    /// All live nodes, in creation order.
    fn nodes(&self) -> Vec<NodeId>;

    /// First live node with this exact name.
    fn find_by_name(&self, name: &str) -> Option<NodeId>;
}
