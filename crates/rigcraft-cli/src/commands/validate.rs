//! Validate command implementation
//!
//! Validates a rig configuration (and optionally a template skeleton)
//! without touching a scene.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use rigcraft_spec::RigConfig;
use serde_json::json;

use crate::input::{load_config, load_template};

/// Run the validate command.
///
/// Exit code: 0 if valid, 1 if invalid.
pub fn run(config_path: &str, template_path: Option<&str>, json_output: bool) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    if json_output {
        run_json(&config, template_path)
    } else {
        run_human(config_path, &config, template_path)
    }
}

fn run_human(
    config_path: &str,
    config: &RigConfig,
    template_path: Option<&str>,
) -> Result<ExitCode> {
    println!("{} {}", "Validating:".cyan().bold(), config_path);

    let result = config.validate();
    for warning in &result.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    for error in &result.errors {
        println!("  {} {}", "x".red(), error);
    }

    let mut failed = !result.is_ok();
    if let Some(path) = template_path {
        match load_template(path).and_then(|t| {
            t.validate()?;
            Ok(t)
        }) {
            Ok(template) => {
                println!(
                    "{} {} ({} joints)",
                    "Template:".dimmed(),
                    path,
                    template.joints.len()
                );
            }
            Err(e) => {
                println!("  {} {}", "x".red(), e);
                failed = true;
            }
        }
    }

    if failed {
        println!("{}", "Validation failed".red().bold());
        Ok(ExitCode::from(1))
    } else {
        println!(
            "{} rig '{}' is buildable",
            "OK".green().bold(),
            config.rig_name
        );
        Ok(ExitCode::SUCCESS)
    }
}

fn run_json(config: &RigConfig, template_path: Option<&str>) -> Result<ExitCode> {
    let result = config.validate();
    let template_error = template_path.and_then(|path| {
        load_template(path)
            .and_then(|t| {
                t.validate()?;
                Ok(())
            })
            .err()
            .map(|e| e.to_string())
    });

    let valid = result.is_ok() && template_error.is_none();
    let out = json!({
        "valid": valid,
        "rig_name": config.rig_name,
        "errors": result
            .errors
            .iter()
            .map(|e| json!({
                "code": e.code.code(),
                "message": e.message,
                "field": e.field,
            }))
            .collect::<Vec<_>>(),
        "warnings": result
            .warnings
            .iter()
            .map(|w| json!({
                "code": w.code.code(),
                "message": w.message,
            }))
            .collect::<Vec<_>>(),
        "template_error": template_error,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
