//! Build command implementation
//!
//! Runs the full rig build into the in-memory scene and reports what was
//! created. `--outline` dumps the resulting scene hierarchy as JSON for
//! inspection or snapshotting.

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use rigcraft_rig::AutoRigger;
use rigcraft_scene::MemoryScene;
use serde_json::json;

use crate::input::{load_config, load_template};

/// Run the build command.
///
/// Exit code: 0 on success (warnings included), 1 on a build error.
pub fn run(
    config_path: &str,
    template_path: Option<&str>,
    outline_path: Option<&str>,
    json_output: bool,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let rigger = match template_path {
        Some(path) => AutoRigger::new(config, load_template(path)?),
        None => AutoRigger::with_biped_template(config),
    };

    if !json_output {
        println!(
            "{} {}",
            "Building:".cyan().bold(),
            rigger.config().rig_name
        );
    }

    let mut scene = MemoryScene::new();
    let report = match rigger.build(&mut scene) {
        Ok(report) => report,
        Err(e) if json_output => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": false,
                    "error": e.to_string(),
                }))?
            );
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = outline_path {
        let outline = serde_json::to_string_pretty(&scene.outline())?;
        fs::write(path, outline).with_context(|| format!("failed to write outline: {path}"))?;
    }

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "success": true,
                "report": report,
            }))?
        );
        return Ok(ExitCode::SUCCESS);
    }

    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    println!(
        "{} {} joints, {} controls, {} constraints, {} dataflow nodes",
        "Done:".green().bold(),
        report.joints,
        report.controls,
        report.constraints,
        report.dataflow_nodes,
    );
    if let Some(path) = outline_path {
        println!("{} {}", "Outline:".dimmed(), path);
    }
    Ok(ExitCode::SUCCESS)
}
