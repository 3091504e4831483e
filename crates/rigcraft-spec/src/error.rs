//! Error and warning types for rig input validation.

use thiserror::Error;

use crate::key::JointKey;

/// Error codes for configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// R001: Spine joint count must be odd
    SpineCountEven,
    /// R002: Spine joint count out of range
    SpineCountOutOfRange,
    /// R003: Neck joint count out of range
    NeckCountOutOfRange,
    /// R004: Finger count out of range
    FingerCountOutOfRange,
    /// R005: Toe count out of range
    ToeCountOutOfRange,
    /// R006: Twist joint count out of range
    TwistCountOutOfRange,
    /// R007: Neither IK nor FK selected for the arms
    NoArmMode,
    /// R008: Neither IK nor FK selected for the legs
    NoLegMode,
    /// R009: Rig name is empty or not a valid identifier
    InvalidRigName,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "R001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::SpineCountEven => "R001",
            ErrorCode::SpineCountOutOfRange => "R002",
            ErrorCode::NeckCountOutOfRange => "R003",
            ErrorCode::FingerCountOutOfRange => "R004",
            ErrorCode::ToeCountOutOfRange => "R005",
            ErrorCode::TwistCountOutOfRange => "R006",
            ErrorCode::NoArmMode => "R007",
            ErrorCode::NoLegMode => "R008",
            ErrorCode::InvalidRigName => "R009",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Warning codes for configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W001: Stretch requested for a limb without an IK chain
    StretchWithoutIk,
    /// W002: Finger count of zero falls back to a single index finger
    ZeroFingerFallback,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::StretchWithoutIk => "W001",
            WarningCode::ZeroFingerFallback => "W002",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Config field the error refers to (e.g., "spine_joint_count").
    pub field: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    /// Creates a new validation error pointing at a config field.
    pub fn with_field(
        code: ErrorCode,
        message: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref field) = self.field {
            write!(f, "{}: {} (at {})", self.code, self.message, field)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation warning with code and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Creates a new validation warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result of configuration validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of validation warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Creates an empty (successful) validation result.
    pub fn success() -> Self {
        Self::default()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts to a Result, returning Err if there are errors.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

/// Errors raised while loading or checking a template skeleton.
///
/// Loading distinguishes a missing/unreadable file from a structurally
/// incomplete skeleton so the caller can phrase the message correctly.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file could not be read.
    #[error("template file not found or unreadable: {0}")]
    Io(#[from] std::io::Error),

    /// Template JSON could not be parsed.
    #[error("template parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A joint names a parent that does not exist.
    #[error("joint '{joint}' references unknown parent '{parent}'")]
    UnknownParent {
        /// The joint with the dangling parent link.
        joint: JointKey,
        /// The missing parent key.
        parent: JointKey,
    },

    /// A required joint is missing from the template.
    #[error("structurally incomplete skeleton: missing joint '{0}'")]
    MissingJoint(JointKey),

    /// The template has no root joint.
    #[error("structurally incomplete skeleton: no 'c_root' joint")]
    MissingRoot,

    /// The root joint must not have a parent.
    #[error("root joint 'c_root' must not have a parent")]
    RootHasParent,

    /// Two joints share the same key.
    #[error("duplicate joint key '{0}'")]
    DuplicateKey(JointKey),
}

/// Top-level error type for spec operations.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Configuration validation failed with one or more errors.
    #[error("rig configuration failed validation with {0} error(s)")]
    ValidationFailed(usize),

    /// Template skeleton error.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ErrorCode::SpineCountEven.code(), "R001");
        assert_eq!(ErrorCode::NoLegMode.code(), "R008");
        assert_eq!(WarningCode::StretchWithoutIk.code(), "W001");
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::with_field(
            ErrorCode::SpineCountEven,
            "spine joint count must be odd, got 6",
            "spine_joint_count",
        );
        assert_eq!(
            err.to_string(),
            "R001: spine joint count must be odd, got 6 (at spine_joint_count)"
        );
    }

    #[test]
    fn validation_result_collects() {
        let mut result = ValidationResult::success();
        assert!(result.is_ok());

        result.add_error(ValidationError::new(ErrorCode::NoArmMode, "no arm mode"));
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
        assert!(result.into_result().is_err());
    }
}
