//! Scene-graph contract and in-memory backend for the rigcraft build
//! pipeline.
//!
//! The rig builder never touches a host application directly: all scene
//! mutation flows through the [`SceneBackend`] trait, addressing nodes by
//! opaque [`NodeId`] handles. Names are labels for humans and serialization;
//! identity survives every rename and re-parent.
//!
//! [`MemoryScene`] implements the contract headlessly. Hierarchy and
//! transforms evaluate fully (including attribute connections into transform
//! channels), dataflow utility nodes evaluate on read, and constraints and
//! IK handles are recorded structurally for inspection.

pub mod backend;
pub mod constraint;
pub mod error;
pub mod memory;
pub mod node;
pub mod transform;

pub use backend::SceneBackend;
pub use constraint::{Constraint, ConstraintKind};
pub use error::{SceneError, SceneResult};
pub use memory::{MemoryScene, SURFACE_COLS, SURFACE_ROWS};
pub use node::{
    AttrDef, AttrValue, CondOperation, MdOperation, Node, NodeId, NodeKind, Plug,
};
pub use transform::{euler_deg_from_quat, quat_from_euler_deg, LocalTransform};
