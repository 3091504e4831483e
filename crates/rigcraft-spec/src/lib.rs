//! Rigcraft Input Data Model
//!
//! This crate provides the types that describe a rig build request: a placed
//! template skeleton (joint positions + parent links) and a rig
//! configuration (joint counts, limb modes, twist/stretch toggles). It also
//! validates both before any scene mutation starts, since a partially built
//! rig cannot be cleanly rolled back.
//!
//! # Overview
//!
//! - **Joint keys**: every joint is addressed by a structured
//!   [`JointKey`] (`side + name + optional sequence`), never by its current
//!   scene name. Names are rewritten repeatedly during a build; keys are not.
//! - **Template skeleton**: the flat joint-position dataset the rigger
//!   consumes, loadable from JSON or synthesized via
//!   [`TemplateSkeleton::biped`].
//! - **Rig configuration**: the caller-facing knobs ([`RigConfig`]) with
//!   serde defaults matching the original tool's UI defaults.
//!
//! # Example
//!
//! ```
//! use rigcraft_spec::{RigConfig, TemplateSkeleton};
//!
//! let config = RigConfig::new("hero").with_spine_joint_count(7);
//! let result = config.validate();
//! assert!(result.is_ok());
//!
//! let template = TemplateSkeleton::biped(config.finger_count, config.toe_count);
//! template.validate().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod template;

pub use config::RigConfig;
pub use error::{
    ErrorCode, SpecError, TemplateError, ValidationError, ValidationResult, ValidationWarning,
    WarningCode,
};
pub use key::{JointKey, Side};
pub use template::{TemplateJoint, TemplateSkeleton};
