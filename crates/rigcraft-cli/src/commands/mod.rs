//! CLI command implementations

pub mod build;
pub mod template;
pub mod validate;
