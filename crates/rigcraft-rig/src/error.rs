//! Build errors and the caller-facing warning set.

use std::fmt;

use rigcraft_scene::SceneError;
use rigcraft_spec::{JointKey, ValidationError};
use thiserror::Error;

/// Result type for rig construction.
pub type RigResult<T> = Result<T, RigError>;

/// Errors aborting a rig build.
///
/// A failed build leaves a partially constructed rig in the scene; callers
/// discard the scene rather than attempting rollback.
#[derive(Debug, Error)]
pub enum RigError {
    /// Scene backend failure.
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Configuration was rejected before any scene mutation.
    #[error("invalid configuration: {}", format_validation(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// Template skeleton was structurally incomplete.
    #[error("invalid template: {0}")]
    Template(#[from] rigcraft_spec::TemplateError),

    /// Ribbon spine given an even-length chain (needs a middle joint).
    #[error("ribbon spine requires an odd-length chain, got {0} joints")]
    EvenRibbonChain(usize),

    /// A joint key was not registered in the requested layer.
    #[error("joint '{0}' not found in the {1} skeleton")]
    MissingJoint(JointKey, &'static str),

    /// IK/FK/animation chains disagree on length.
    #[error("driver chain length {drivers} does not match animation chain length {anim}")]
    ChainMismatch {
        /// Driver (IK or FK) chain length.
        drivers: usize,
        /// Animation chain length.
        anim: usize,
    },

    /// Chain splitting needs exactly one end joint under the root.
    #[error("joint chain under '{root}' has {ends} end joints, expected exactly one")]
    AmbiguousChainEnd {
        /// Chain root name.
        root: String,
        /// Number of end joints found.
        ends: usize,
    },

    /// A chain operation was handed an empty or single-joint chain.
    #[error("chain too short for {op}: {len} joints")]
    ChainTooShort {
        /// The operation attempted.
        op: &'static str,
        /// Chain length supplied.
        len: usize,
    },
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Non-fatal conditions recorded in the build report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
    /// The IK chain was straight; the pole position is arbitrary and the
    /// pole-vector constraint was skipped.
    DegeneratePoleVector {
        /// Limb label, e.g. `lArm`.
        limb: String,
    },
    /// Stretch was requested for a limb with no IK chain; skipped.
    StretchWithoutIk {
        /// Limb label.
        limb: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::DegeneratePoleVector { limb } => write!(
                f,
                "{limb}: straight IK chain, pole position arbitrary; pole constraint skipped"
            ),
            BuildWarning::StretchWithoutIk { limb } => {
                write!(f, "{limb}: stretch requested without an IK chain; skipped")
            }
        }
    }
}
