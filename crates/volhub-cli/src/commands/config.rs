//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use volhub_core::error::AppError;
use volhub_core::result::AppResult;

use super::Cli;
use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
    /// Validate configuration and the seed file it points at
    Validate,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(args: &ConfigArgs, cli: &Cli) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(cli)?;
            match cli.format {
                OutputFormat::Json => output::print_item(&config, cli.format),
                OutputFormat::Table => {
                    let rows = [
                        (
                            "sync.error_display_seconds",
                            config.sync.error_display_seconds.to_string(),
                        ),
                        ("sync.command_buffer", config.sync.command_buffer.to_string()),
                        (
                            "presence.lead_window_minutes",
                            config.presence.lead_window_minutes.to_string(),
                        ),
                        (
                            "presence.refresh_interval_seconds",
                            config.presence.refresh_interval_seconds.to_string(),
                        ),
                        (
                            "leaderboard.utc_offset_minutes",
                            config.leaderboard.utc_offset_minutes.to_string(),
                        ),
                        (
                            "leaderboard.fallback_prefix_len",
                            config.leaderboard.fallback_prefix_len.to_string(),
                        ),
                        ("store.enforce_capacity", config.store.enforce_capacity.to_string()),
                        (
                            "store.seed_file",
                            config.store.seed_file.clone().unwrap_or_else(|| "-".into()),
                        ),
                        ("logging.level", config.logging.level.clone()),
                        ("logging.format", config.logging.format.clone()),
                    ];
                    for (key, value) in &rows {
                        output::print_kv(key, value);
                    }
                }
            }
        }
        ConfigCommand::Validate => {
            let workspace = match super::Workspace::open(cli).await {
                Ok(workspace) => workspace,
                Err(e) => {
                    output::print_error(&format!("Configuration invalid: {e}"));
                    return Err(e);
                }
            };
            let opportunities = workspace.opportunities().await?;
            let profiles = workspace.profiles().await?;
            output::print_success(&format!("Configuration '{}' is valid", cli.config));
            output::print_kv("Opportunities", &opportunities.len().to_string());
            output::print_kv("Profiles", &profiles.len().to_string());
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to create dir: {e}")))?;
            }

            tokio::fs::write(out_path, default_config)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write config: {e}")))?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}
