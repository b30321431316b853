//! CLI command definitions and dispatch.

pub mod attendance;
pub mod config;
pub mod leaderboard;
pub mod membership;
pub mod opportunity;
pub mod profile;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use volhub_core::config::AppConfig;
use volhub_core::error::AppError;
use volhub_core::result::AppResult;
use volhub_core::traits::{RemoteStore, SystemClock};
use volhub_core::types::{ErrorCategory, IdentityId, Query};
use volhub_entity::{Opportunity, Profile, fields};
use volhub_realtime::{Session, TracingHost};
use volhub_service::Identity;
use volhub_store::MemoryStore;

use crate::output::{self, OutputFormat};

/// VolHub: volunteer opportunity tracking
#[derive(Debug, Parser)]
#[command(name = "volhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay (`config/{env}.toml`)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Seed file; overrides `store.seed_file`
    #[arg(short, long)]
    pub seed: Option<PathBuf>,

    /// Write the store back to the seed file after a mutating command
    #[arg(short, long)]
    pub write: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Browse and manage opportunities
    Opportunity(opportunity::OpportunityArgs),
    /// Print the volunteer leaderboard
    Leaderboard(leaderboard::LeaderboardArgs),
    /// List profiles
    Profile(profile::ProfileArgs),
    /// Toggle an RSVP
    Rsvp(membership::ToggleArgs),
    /// Toggle a favorite
    Favorite(membership::ToggleArgs),
    /// Record attendance or remove attendees (manager only)
    Attendance(attendance::AttendanceArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> AppResult<()> {
        match &self.command {
            Commands::Config(args) => config::execute(args, self).await,
            command => {
                let workspace = Workspace::open(self).await?;
                match command {
                    Commands::Opportunity(args) => {
                        opportunity::execute(args, &workspace, self.format).await?
                    }
                    Commands::Leaderboard(args) => {
                        leaderboard::execute(args, &workspace, self.format).await?
                    }
                    Commands::Profile(args) => {
                        profile::execute(args, &workspace, self.format).await?
                    }
                    Commands::Rsvp(args) => membership::execute_rsvp(args, &workspace).await?,
                    Commands::Favorite(args) => {
                        membership::execute_favorite(args, &workspace).await?
                    }
                    Commands::Attendance(args) => attendance::execute(args, &workspace).await?,
                    Commands::Config(_) => {}
                }
                if command_mutates(command) {
                    workspace.persist().await?;
                }
                Ok(())
            }
        }
    }
}

fn command_mutates(command: &Commands) -> bool {
    match command {
        Commands::Opportunity(args) => args.mutates(),
        Commands::Rsvp(_) | Commands::Favorite(_) | Commands::Attendance(_) => true,
        Commands::Leaderboard(_) | Commands::Profile(_) | Commands::Config(_) => false,
    }
}

/// Helper: load configuration from file
pub fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    AppConfig::load(&cli.config, &cli.env)
}

/// A seeded in-memory store plus the configuration it was opened with.
pub struct Workspace {
    pub config: Arc<AppConfig>,
    pub store: Arc<MemoryStore>,
    seed_path: Option<PathBuf>,
    write_back: bool,
}

impl Workspace {
    /// Load configuration and seed the store.
    pub async fn open(cli: &Cli) -> AppResult<Self> {
        let config = load_config(cli)?;
        let store = MemoryStore::new(&config.store);
        let seed_path = cli
            .seed
            .clone()
            .or_else(|| config.store.seed_file.as_ref().map(PathBuf::from));

        match &seed_path {
            Some(path) => {
                store.seed_from_file(path).await?;
            }
            None => output::print_warning("No seed file configured; starting from an empty store"),
        }

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            seed_path,
            write_back: cli.write,
        })
    }

    /// Start a session for `identity_id`.
    pub async fn sign_in(&self, identity_id: IdentityId) -> AppResult<Session> {
        let identity = Identity {
            id: identity_id,
            anonymous: false,
            display_name: None,
        };
        Session::start(
            self.store.clone(),
            identity,
            self.config.clone(),
            Arc::new(TracingHost),
            Arc::new(SystemClock),
        )
        .await
    }

    /// Every decodable opportunity, sorted by start.
    pub async fn opportunities(&self) -> AppResult<Vec<Opportunity>> {
        let docs = self
            .store
            .get_once(&Query::collection(fields::OPPORTUNITIES))
            .await?;
        let mut opportunities = docs
            .iter()
            .map(Opportunity::from_document)
            .collect::<AppResult<Vec<_>>>()?;
        opportunities.sort_by(|a, b| a.start.cmp(&b.start).then(a.name.cmp(&b.name)));
        Ok(opportunities)
    }

    /// Every decodable profile.
    pub async fn profiles(&self) -> AppResult<Vec<Profile>> {
        let docs = self.store.get_once(&Query::collection(fields::USERS)).await?;
        docs.iter().map(Profile::from_document).collect()
    }

    /// Write the store back to the seed file when `--write` was given.
    pub async fn persist(&self) -> AppResult<()> {
        if !self.write_back {
            return Ok(());
        }
        let Some(path) = &self.seed_path else {
            return Err(AppError::configuration(
                "--write needs a seed file (--seed or store.seed_file)",
            ));
        };
        let count = self.store.save_to_file(path).await?;
        info!(path = %path.display(), documents = count, "Store written back");
        Ok(())
    }
}

/// Wait for outstanding commits, then end the session. Returns the error
/// surfaced in `category`, if any.
pub async fn settle(session: &Session, category: ErrorCategory) -> AppResult<()> {
    let outcome = async {
        session.flush().await?;
        let snapshot = session.snapshot().await?;
        match snapshot.error(category) {
            Some(surfaced) => Err(AppError::new(surfaced.kind, surfaced.message.clone())),
            None => Ok(()),
        }
    }
    .await;
    session.shutdown().await;
    outcome
}
