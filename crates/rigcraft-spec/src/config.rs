//! Rig configuration: the caller-facing build options.

use serde::{Deserialize, Serialize};

use crate::error::{
    ErrorCode, ValidationError, ValidationResult, ValidationWarning, WarningCode,
};

/// Valid range for spine and neck joint counts.
pub const SPINE_JOINT_RANGE: (u32, u32) = (3, 31);
/// Valid range for finger counts (per hand).
pub const FINGER_COUNT_RANGE: (u32, u32) = (0, 30);
/// Valid range for toe counts (per foot).
pub const TOE_COUNT_RANGE: (u32, u32) = (0, 26);
/// Valid range for per-segment twist joint counts.
pub const TWIST_COUNT_RANGE: (u32, u32) = (0, 30);

/// Character rig build configuration.
///
/// Field defaults match the original tool's UI defaults; a plain
/// `RigConfig::new("name")` builds the standard biped rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RigConfig {
    /// Rig name, used as the prefix of every created node name.
    pub rig_name: String,
    /// Spine joint count, odd, 3..=31.
    #[serde(default = "default_spine_count")]
    pub spine_joint_count: u32,
    /// Neck joint count, 3..=31.
    #[serde(default = "default_neck_count")]
    pub neck_joint_count: u32,
    /// Fingers per hand, 0..=30. 0 and 1 both keep a single index finger.
    #[serde(default = "default_finger_count")]
    pub finger_count: u32,
    /// Toes per foot, 0..=26. 0 builds no toe chains.
    #[serde(default)]
    pub toe_count: u32,
    /// Upper-arm twist joints (counter-twisted against the shoulder).
    #[serde(default = "default_twist_count")]
    pub upper_arm_twist_count: u32,
    /// Lower-arm twist joints (driven by the wrist).
    #[serde(default = "default_twist_count")]
    pub lower_arm_twist_count: u32,
    /// Upper-leg twist joints (counter-twisted against the thigh).
    #[serde(default = "default_twist_count")]
    pub upper_leg_twist_count: u32,
    /// Lower-leg twist joints (driven by the ankle).
    #[serde(default = "default_twist_count")]
    pub lower_leg_twist_count: u32,
    /// Flip right-side joint orientation 180° for mirrored rotation signs.
    #[serde(default = "default_true")]
    pub mirror_behavior: bool,
    /// Build stretch networks for the arms (requires IK arms).
    #[serde(default = "default_true")]
    pub stretch_arm: bool,
    /// Build stretch networks for the legs (requires IK legs).
    #[serde(default = "default_true")]
    pub stretch_leg: bool,
    /// Build FK arm chains.
    #[serde(default = "default_true")]
    pub fk_arm: bool,
    /// Build IK arm chains.
    #[serde(default = "default_true")]
    pub ik_arm: bool,
    /// Build FK leg chains.
    #[serde(default = "default_true")]
    pub fk_leg: bool,
    /// Build IK leg chains (including the foot roll rig).
    #[serde(default = "default_true")]
    pub ik_leg: bool,
}

fn default_spine_count() -> u32 {
    5
}

fn default_neck_count() -> u32 {
    3
}

fn default_finger_count() -> u32 {
    5
}

fn default_twist_count() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl RigConfig {
    /// Creates a configuration with all defaults for the given rig name.
    pub fn new(rig_name: impl Into<String>) -> Self {
        Self {
            rig_name: rig_name.into(),
            spine_joint_count: default_spine_count(),
            neck_joint_count: default_neck_count(),
            finger_count: default_finger_count(),
            toe_count: 0,
            upper_arm_twist_count: default_twist_count(),
            lower_arm_twist_count: default_twist_count(),
            upper_leg_twist_count: default_twist_count(),
            lower_leg_twist_count: default_twist_count(),
            mirror_behavior: true,
            stretch_arm: true,
            stretch_leg: true,
            fk_arm: true,
            ik_arm: true,
            fk_leg: true,
            ik_leg: true,
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the spine joint count.
    pub fn with_spine_joint_count(mut self, count: u32) -> Self {
        self.spine_joint_count = count;
        self
    }

    /// Sets the neck joint count.
    pub fn with_neck_joint_count(mut self, count: u32) -> Self {
        self.neck_joint_count = count;
        self
    }

    /// Sets the finger count.
    pub fn with_finger_count(mut self, count: u32) -> Self {
        self.finger_count = count;
        self
    }

    /// Sets the toe count.
    pub fn with_toe_count(mut self, count: u32) -> Self {
        self.toe_count = count;
        self
    }

    /// Sets all four twist joint counts at once.
    pub fn with_twist_counts(mut self, upper_arm: u32, lower_arm: u32, upper_leg: u32, lower_leg: u32) -> Self {
        self.upper_arm_twist_count = upper_arm;
        self.lower_arm_twist_count = lower_arm;
        self.upper_leg_twist_count = upper_leg;
        self.lower_leg_twist_count = lower_leg;
        self
    }

    /// Sets the arm limb modes.
    pub fn with_arm_modes(mut self, ik: bool, fk: bool) -> Self {
        self.ik_arm = ik;
        self.fk_arm = fk;
        self
    }

    /// Sets the leg limb modes.
    pub fn with_leg_modes(mut self, ik: bool, fk: bool) -> Self {
        self.ik_leg = ik;
        self.fk_leg = fk;
        self
    }

    /// Sets mirror behavior.
    pub fn with_mirror_behavior(mut self, mirror: bool) -> Self {
        self.mirror_behavior = mirror;
        self
    }

    /// Validates the configuration.
    ///
    /// All limb-mode and count preconditions are checked here, before any
    /// scene mutation: a failed build cannot be rolled back, so nothing may
    /// start with an invalid configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        if self.rig_name.is_empty()
            || !self
                .rig_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            result.add_error(ValidationError::with_field(
                ErrorCode::InvalidRigName,
                format!(
                    "rig name '{}' must be non-empty and alphanumeric",
                    self.rig_name
                ),
                "rig_name",
            ));
        }

        let (lo, hi) = SPINE_JOINT_RANGE;
        if self.spine_joint_count < lo || self.spine_joint_count > hi {
            result.add_error(ValidationError::with_field(
                ErrorCode::SpineCountOutOfRange,
                format!("spine joint count must be {lo}..={hi}, got {}", self.spine_joint_count),
                "spine_joint_count",
            ));
        } else if self.spine_joint_count % 2 == 0 {
            // The ribbon spine needs a middle joint to center its surface on.
            result.add_error(ValidationError::with_field(
                ErrorCode::SpineCountEven,
                format!("spine joint count must be odd, got {}", self.spine_joint_count),
                "spine_joint_count",
            ));
        }

        if self.neck_joint_count < lo || self.neck_joint_count > hi {
            result.add_error(ValidationError::with_field(
                ErrorCode::NeckCountOutOfRange,
                format!("neck joint count must be {lo}..={hi}, got {}", self.neck_joint_count),
                "neck_joint_count",
            ));
        }

        let (lo, hi) = FINGER_COUNT_RANGE;
        if self.finger_count < lo || self.finger_count > hi {
            result.add_error(ValidationError::with_field(
                ErrorCode::FingerCountOutOfRange,
                format!("finger count must be {lo}..={hi}, got {}", self.finger_count),
                "finger_count",
            ));
        } else if self.finger_count == 0 {
            result.add_warning(ValidationWarning::new(
                WarningCode::ZeroFingerFallback,
                "finger count 0 builds a single index finger per hand",
            ));
        }

        let (lo, hi) = TOE_COUNT_RANGE;
        if self.toe_count < lo || self.toe_count > hi {
            result.add_error(ValidationError::with_field(
                ErrorCode::ToeCountOutOfRange,
                format!("toe count must be {lo}..={hi}, got {}", self.toe_count),
                "toe_count",
            ));
        }

        let (lo, hi) = TWIST_COUNT_RANGE;
        for (field, count) in [
            ("upper_arm_twist_count", self.upper_arm_twist_count),
            ("lower_arm_twist_count", self.lower_arm_twist_count),
            ("upper_leg_twist_count", self.upper_leg_twist_count),
            ("lower_leg_twist_count", self.lower_leg_twist_count),
        ] {
            if count < lo || count > hi {
                result.add_error(ValidationError::with_field(
                    ErrorCode::TwistCountOutOfRange,
                    format!("twist joint count must be {lo}..={hi}, got {count}"),
                    field,
                ));
            }
        }

        if !self.ik_arm && !self.fk_arm {
            result.add_error(ValidationError::new(
                ErrorCode::NoArmMode,
                "select at least one of IK or FK arms",
            ));
        }
        if !self.ik_leg && !self.fk_leg {
            result.add_error(ValidationError::new(
                ErrorCode::NoLegMode,
                "select at least one of IK or FK legs",
            ));
        }

        if self.stretch_arm && !self.ik_arm {
            result.add_warning(ValidationWarning::new(
                WarningCode::StretchWithoutIk,
                "stretch arms ignored: stretch requires the IK arm chain",
            ));
        }
        if self.stretch_leg && !self.ik_leg {
            result.add_warning(ValidationWarning::new(
                WarningCode::StretchWithoutIk,
                "stretch legs ignored: stretch requires the IK leg chain",
            ));
        }

        result
    }
}
