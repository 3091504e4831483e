//! Input loading for the CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rigcraft_spec::{RigConfig, TemplateSkeleton};

/// Loads a rig configuration from a JSON file.
///
/// Unknown fields are rejected so a typo in a knob name fails loudly
/// instead of silently falling back to the default.
pub fn load_config(path: &str) -> Result<RigConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {path}"))?;
    RigConfig::from_json(&text).with_context(|| format!("failed to parse config file: {path}"))
}

/// Loads a template skeleton from a JSON file.
pub fn load_template(path: &str) -> Result<TemplateSkeleton> {
    TemplateSkeleton::from_file(Path::new(path))
        .with_context(|| format!("failed to load template file: {path}"))
}
