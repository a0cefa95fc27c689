//! Command-line front end for the editor core.
//!
//! # Responsibility
//! - Expose locator transformation and project editing to scripts.
//! - Resolve settings as: CLI flag > config file > default.

mod locator_cmd;
mod project_cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use luminist_core::{init_logging, EditorConfig, FlipDirection};

#[derive(Parser)]
#[command(name = "luminist", about = "ImageKit-backed image editor core")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides `[storage] database_path`)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log level (overrides `[logging] level`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the core version
    Version,
    /// Inspect and rewrite transformation locators (no network access)
    Locator {
        #[command(subcommand)]
        command: LocatorCommands,
    },
    /// Manage and edit stored projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Subcommand)]
pub enum LocatorCommands {
    /// Show the base path and directive pipeline of a locator
    Parse { locator: String },
    /// Merge a flip directive into a locator
    Flip {
        locator: String,
        /// h, v or h_v
        #[arg(value_parser = parse_direction)]
        direction: FlipDirection,
    },
    /// Merge a prompt edit directive into a locator
    Edit { locator: String, prompt: String },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project from an uploaded image
    Create {
        #[arg(long)]
        title: String,
        /// Locator of the uploaded image
        #[arg(long)]
        locator: String,
        /// Canvas width (defaults to the configured viewport)
        #[arg(long)]
        width: Option<u32>,
        /// Canvas height (defaults to the configured viewport)
        #[arg(long)]
        height: Option<u32>,
    },
    /// List projects, most recently updated first
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show one project
    Show { id: uuid::Uuid },
    /// Delete a project
    Delete { id: uuid::Uuid },
    /// Flip the project's active image
    Flip {
        id: uuid::Uuid,
        #[arg(value_parser = parse_direction)]
        direction: FlipDirection,
    },
    /// Run a prompt edit on the project's active image
    Edit { id: uuid::Uuid, prompt: String },
}

fn parse_direction(value: &str) -> Result<FlipDirection, String> {
    FlipDirection::from_code(value.trim())
        .ok_or_else(|| format!("unknown flip direction `{value}` (use h, v or h_v)"))
}

fn load_config(cli: &Cli) -> Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.storage.database_path = Some(database.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = Some(level.clone());
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Some(dir) = &config.logging.dir {
        init_logging(config.log_level(), dir).context("failed to start logging")?;
    }

    match cli.command {
        Commands::Version => {
            println!("luminist_core version={}", luminist_core::core_version());
            Ok(())
        }
        Commands::Locator { command } => locator_cmd::run(command),
        Commands::Project { command } => project_cmd::run(&config, command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_direction, Cli};
    use clap::CommandFactory;
    use luminist_core::FlipDirection;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn direction_accepts_wire_codes_only() {
        assert_eq!(parse_direction("h_v"), Ok(FlipDirection::Both));
        assert!(parse_direction("horizontal").is_err());
    }
}
