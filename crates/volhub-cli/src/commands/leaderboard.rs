//! Leaderboard CLI command.

use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use volhub_core::result::AppResult;
use volhub_core::types::TimeWindow;
use volhub_entity::RankedEntry;
use volhub_service::compute_leaderboard;

use super::Workspace;
use crate::output::{self, OutputFormat};

/// Arguments for the leaderboard command
#[derive(Debug, Args)]
pub struct LeaderboardArgs {
    /// Time window: month, year, or all_time
    #[arg(short, long, default_value = "month")]
    pub window: TimeWindow,

    /// Show only the top N entries
    #[arg(short, long)]
    pub top: Option<usize>,
}

#[derive(Debug, Serialize, Tabled)]
struct LeaderboardRow {
    #[tabled(rename = "Rank")]
    rank: String,
    #[tabled(rename = "Volunteer")]
    name: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "ID")]
    identity_id: String,
}

impl From<&RankedEntry> for LeaderboardRow {
    fn from(entry: &RankedEntry) -> Self {
        Self {
            rank: entry.rank.map_or("-".to_string(), |r| r.to_string()),
            name: entry.display_name.clone(),
            hours: output::format_hours(entry.hours),
            identity_id: entry.identity_id.to_string(),
        }
    }
}

/// Execute the leaderboard command
pub async fn execute(
    args: &LeaderboardArgs,
    workspace: &Workspace,
    format: OutputFormat,
) -> AppResult<()> {
    let opportunities = workspace.opportunities().await?;
    let profiles = workspace.profiles().await?;

    let entries = compute_leaderboard(
        &opportunities,
        &profiles,
        args.window,
        Utc::now(),
        &workspace.config.leaderboard,
    );

    let rows: Vec<LeaderboardRow> = entries
        .iter()
        .take(args.top.unwrap_or(usize::MAX))
        .map(LeaderboardRow::from)
        .collect();

    if format == OutputFormat::Table {
        println!("Leaderboard ({}):", args.window);
    }
    output::print_list(&rows, format);
    Ok(())
}
