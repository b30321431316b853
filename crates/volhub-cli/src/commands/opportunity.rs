//! Opportunity CLI commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use volhub_core::error::AppError;
use volhub_core::result::AppResult;
use volhub_core::types::{ErrorCategory, IdentityId, OpportunityId};
use volhub_entity::{Opportunity, OpportunityDraft};

use super::{Workspace, settle};
use crate::output::{self, OutputFormat};

/// Arguments for opportunity commands
#[derive(Debug, Args)]
pub struct OpportunityArgs {
    /// Opportunity subcommand
    #[command(subcommand)]
    pub command: OpportunityCommand,
}

impl OpportunityArgs {
    pub fn mutates(&self) -> bool {
        !matches!(
            self.command,
            OpportunityCommand::List { .. } | OpportunityCommand::Show { .. }
        )
    }
}

/// Opportunity subcommands
#[derive(Debug, Subcommand)]
pub enum OpportunityCommand {
    /// List opportunities
    List {
        /// Hide opportunities that have ended
        #[arg(long)]
        upcoming: bool,
    },
    /// Show one opportunity with its attendees
    Show {
        /// Opportunity ID
        id: OpportunityId,
    },
    /// Create an opportunity
    Create {
        /// Acting manager
        #[arg(long = "as")]
        actor: IdentityId,
        #[command(flatten)]
        fields: DraftFields,
    },
    /// Edit an opportunity you created
    Update {
        /// Opportunity ID
        id: OpportunityId,
        /// Acting manager
        #[arg(long = "as")]
        actor: IdentityId,
        #[command(flatten)]
        fields: DraftFields,
        /// Remove the capacity limit
        #[arg(long, conflicts_with = "capacity")]
        unlimited: bool,
    },
    /// Delete an opportunity you created
    Delete {
        /// Opportunity ID
        id: OpportunityId,
        /// Acting manager
        #[arg(long = "as")]
        actor: IdentityId,
    },
}

/// Editable fields. Omitted fields keep their current value on update.
#[derive(Debug, Clone, Args)]
pub struct DraftFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// RFC 3339 start instant
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// RFC 3339 end instant
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,
    #[arg(long)]
    pub capacity: Option<u32>,
}

impl DraftFields {
    fn into_new_draft(self) -> AppResult<OpportunityDraft> {
        let missing = |field: &str| AppError::validation(format!("--{field} is required"));
        Ok(OpportunityDraft {
            name: self.name.ok_or_else(|| missing("name"))?,
            location: self.location.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            start: self.start.ok_or_else(|| missing("start"))?,
            end: self.end.ok_or_else(|| missing("end"))?,
            capacity: self.capacity,
        })
    }

    fn apply_to(self, mut draft: OpportunityDraft, unlimited: bool) -> OpportunityDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(location) = self.location {
            draft.location = location;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(start) = self.start {
            draft.start = start;
        }
        if let Some(end) = self.end {
            draft.end = end;
        }
        if unlimited {
            draft.capacity = None;
        } else if self.capacity.is_some() {
            draft.capacity = self.capacity;
        }
        draft
    }
}

#[derive(Debug, Serialize, Tabled)]
struct OpportunityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "Attendees")]
    attendees: String,
    #[tabled(rename = "Open")]
    open: String,
}

impl From<&Opportunity> for OpportunityRow {
    fn from(opp: &Opportunity) -> Self {
        let attendees = match opp.capacity {
            Some(capacity) => format!("{}/{}", opp.attendee_ids.len(), capacity),
            None => opp.attendee_ids.len().to_string(),
        };
        Self {
            id: opp.id.to_string(),
            name: opp.name.clone(),
            location: opp.location.clone(),
            start: output::format_instant(&opp.start),
            hours: output::format_hours(opp.duration_hours()),
            attendees,
            open: opp
                .remaining_spots()
                .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct AttendeeRow {
    #[tabled(rename = "Attendee")]
    identity_id: String,
    #[tabled(rename = "Attendance")]
    status: String,
}

/// Execute opportunity commands
pub async fn execute(
    args: &OpportunityArgs,
    workspace: &Workspace,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        OpportunityCommand::List { upcoming } => {
            let now = Utc::now();
            let rows: Vec<OpportunityRow> = workspace
                .opportunities()
                .await?
                .iter()
                .filter(|opp| !upcoming || !opp.has_ended(now))
                .map(OpportunityRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        OpportunityCommand::Show { id } => {
            let opp = find(workspace, *id).await?;
            match format {
                OutputFormat::Json => output::print_item(&opp, format),
                OutputFormat::Table => {
                    println!("{}:", opp.name);
                    output::print_kv("ID", &opp.id.to_string());
                    output::print_kv("Location", &opp.location);
                    output::print_kv("Starts", &opp.start.to_rfc3339());
                    output::print_kv("Ends", &opp.end.to_rfc3339());
                    output::print_kv("Creator", &opp.creator_id.to_string());
                    output::print_kv(
                        "Capacity",
                        &opp.capacity.map_or("unlimited".to_string(), |c| c.to_string()),
                    );
                    if !opp.description.is_empty() {
                        output::print_kv("Description", &opp.description);
                    }
                    let rows: Vec<AttendeeRow> = opp
                        .attendee_ids
                        .iter()
                        .map(|attendee| AttendeeRow {
                            identity_id: attendee.to_string(),
                            status: opp
                                .attendance
                                .get(attendee)
                                .map_or("unmarked".to_string(), |s| s.to_string()),
                        })
                        .collect();
                    output::print_list(&rows, format);
                }
            }
        }
        OpportunityCommand::Create { actor, fields } => {
            let draft = fields.clone().into_new_draft()?;
            let session = workspace.sign_in(*actor).await?;
            let created = session.create_opportunity(draft).await;
            settle(&session, ErrorCategory::General).await?;
            output::print_success(&format!("Created opportunity {}", created?));
        }
        OpportunityCommand::Update {
            id,
            actor,
            fields,
            unlimited,
        } => {
            let existing = find(workspace, *id).await?;
            let draft = fields.clone()
                .apply_to(OpportunityDraft::from_opportunity(&existing), *unlimited);
            let session = workspace.sign_in(*actor).await?;
            let updated = session.update_opportunity(*id, draft).await;
            settle(&session, ErrorCategory::General).await?;
            updated?;
            output::print_success(&format!("Updated opportunity {id}"));
        }
        OpportunityCommand::Delete { id, actor } => {
            let session = workspace.sign_in(*actor).await?;
            let deleted = session.delete_opportunity(*id).await;
            settle(&session, ErrorCategory::General).await?;
            deleted?;
            output::print_success(&format!("Deleted opportunity {id}"));
        }
    }

    Ok(())
}

async fn find(workspace: &Workspace, id: OpportunityId) -> AppResult<Opportunity> {
    workspace
        .opportunities()
        .await?
        .into_iter()
        .find(|opp| opp.id == id)
        .ok_or_else(|| AppError::not_found(format!("Opportunity {id} not found")))
}
