//! Rigcraft Construction Engine
//!
//! This crate builds the animation control rig: it consumes a validated
//! [`RigConfig`](rigcraft_spec::RigConfig) plus a placed
//! [`TemplateSkeleton`](rigcraft_spec::TemplateSkeleton) and constructs the
//! full rig into any [`SceneBackend`](rigcraft_scene::SceneBackend).
//!
//! The pipeline produces two parallel skeletons, a bind layer for skinning
//! and an animation layer driven by the controls, and hangs the control
//! systems off the animation layer: a ribbon spine, IK/FK limbs with
//! blending, foot roll, twist joints, stretch networks and per-digit curl
//! controls.
//!
//! # Example
//!
//! ```
//! use rigcraft_rig::AutoRigger;
//! use rigcraft_scene::MemoryScene;
//! use rigcraft_spec::RigConfig;
//!
//! let rigger = AutoRigger::with_biped_template(RigConfig::new("hero"));
//! let mut scene = MemoryScene::new();
//! let report = rigger.build(&mut scene).unwrap();
//! assert!(report.warnings.is_empty());
//! ```

pub mod blend;
pub mod control;
pub mod digits;
pub mod error;
pub mod foot;
pub mod hierarchy;
pub mod limb;
pub mod math;
pub mod naming;
pub mod orchestrator;
pub mod registry;
pub mod ribbon;
pub mod stretch;
pub mod twist;

pub use error::{BuildWarning, RigError, RigResult};
pub use orchestrator::{AutoRigger, BuildReport};
pub use registry::{JointLayer, JointRegistry};
