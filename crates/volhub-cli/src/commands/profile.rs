//! Profile CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use volhub_core::result::AppResult;
use volhub_entity::{Profile, UserRole};

use super::Workspace;
use crate::output::{self, OutputFormat};

/// Arguments for profile commands
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Profile subcommand
    #[command(subcommand)]
    pub command: ProfileCommand,
}

/// Profile subcommands
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// List profiles
    List {
        /// Filter by role
        #[arg(short, long)]
        role: Option<UserRole>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Favorites")]
    favorites: usize,
    #[tabled(rename = "RSVPs")]
    rsvps: usize,
}

impl ProfileRow {
    fn new(profile: &Profile, prefix_len: usize) -> Self {
        Self {
            id: profile.id.to_string(),
            name: profile.resolved_name(prefix_len),
            role: profile.role.to_string(),
            favorites: profile.favorite_ids.len(),
            rsvps: profile.rsvp_ids.len(),
        }
    }
}

/// Execute profile commands
pub async fn execute(
    args: &ProfileArgs,
    workspace: &Workspace,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        ProfileCommand::List { role } => {
            let prefix_len = workspace.config.leaderboard.fallback_prefix_len;
            let mut rows: Vec<ProfileRow> = workspace
                .profiles()
                .await?
                .iter()
                .filter(|p| role.is_none_or(|r| p.role == r))
                .map(|p| ProfileRow::new(p, prefix_len))
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
