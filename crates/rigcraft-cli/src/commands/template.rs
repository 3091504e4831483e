//! Template command implementation
//!
//! Emits the standard biped template skeleton as JSON so it can be placed
//! by hand (or in a DCC tool) and fed back into `build --template`.

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use rigcraft_spec::TemplateSkeleton;

/// Run the template command.
pub fn run(fingers: u32, toes: u32, output: Option<&str>) -> Result<ExitCode> {
    let template = TemplateSkeleton::biped(fingers, toes);
    let text = serde_json::to_string_pretty(&template)?;

    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write template: {path}"))?;
            println!(
                "{} {} ({} joints)",
                "Wrote:".green().bold(),
                path,
                template.joints.len()
            );
        }
        None => println!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}
