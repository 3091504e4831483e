//! Rigcraft CLI - Command-line interface for automated rig construction
//!
//! This binary provides commands for validating rig configurations,
//! building rigs into the in-memory scene, and emitting template skeletons.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;

use rigcraft_cli::commands;

/// Rigcraft - Automated Character Rig Construction
#[derive(Parser)]
#[command(name = "rigcraft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a rig configuration without building anything
    Validate {
        /// Path to the rig configuration file (JSON)
        #[arg(short, long)]
        config: String,

        /// Path to a placed template skeleton to check as well (JSON)
        #[arg(short, long)]
        template: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Build the full rig and report what was created
    Build {
        /// Path to the rig configuration file (JSON)
        #[arg(short, long)]
        config: String,

        /// Path to a placed template skeleton (default: synthesized biped)
        #[arg(short, long)]
        template: Option<String>,

        /// Write the built scene hierarchy as JSON to this path
        #[arg(long)]
        outline: Option<String>,

        /// Output machine-readable JSON report (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Emit the standard biped template skeleton as JSON
    Template {
        /// Number of fingers per hand
        #[arg(long, default_value = "5")]
        fingers: u32,

        /// Number of toes per foot
        #[arg(long, default_value = "0")]
        toes: u32,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            config,
            template,
            json,
        } => commands::validate::run(&config, template.as_deref(), json),
        Commands::Build {
            config,
            template,
            outline,
            json,
        } => commands::build::run(&config, template.as_deref(), outline.as_deref(), json),
        Commands::Template {
            fingers,
            toes,
            output,
        } => commands::template::run(fingers, toes, output.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red(), e);
            ExitCode::from(1)
        }
    }
}
