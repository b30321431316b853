//! Attendance and attendee removal (manager only).

use clap::{Args, Subcommand, ValueEnum};

use volhub_core::result::AppResult;
use volhub_core::types::{ErrorCategory, IdentityId, OpportunityId};
use volhub_entity::AttendanceStatus;

use super::{Workspace, settle};
use crate::output;

/// Arguments for attendance commands
#[derive(Debug, Args)]
pub struct AttendanceArgs {
    /// Acting manager
    #[arg(long = "as", global = true)]
    pub actor: Option<IdentityId>,

    /// Attendance subcommand
    #[command(subcommand)]
    pub command: AttendanceCommand,
}

/// Status to record
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Present,
    Absent,
    /// Back to unmarked
    Clear,
}

impl StatusArg {
    fn into_status(self) -> Option<AttendanceStatus> {
        match self {
            Self::Present => Some(AttendanceStatus::Present),
            Self::Absent => Some(AttendanceStatus::Absent),
            Self::Clear => None,
        }
    }
}

/// Attendance subcommands
#[derive(Debug, Subcommand)]
pub enum AttendanceCommand {
    /// Mark an attendee present or absent, or clear the mark
    Mark {
        /// Opportunity ID
        opportunity: OpportunityId,
        /// Attendee identity ID
        attendee: IdentityId,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Remove an attendee from an opportunity
    Remove {
        /// Opportunity ID
        opportunity: OpportunityId,
        /// Attendee identity ID
        attendee: IdentityId,
    },
}

/// Execute attendance commands
pub async fn execute(args: &AttendanceArgs, workspace: &Workspace) -> AppResult<()> {
    let Some(actor) = args.actor else {
        return Err(volhub_core::AppError::validation("--as <manager id> is required"));
    };
    let session = workspace.sign_in(actor).await?;

    match &args.command {
        AttendanceCommand::Mark {
            opportunity,
            attendee,
            status,
        } => {
            let recorded = session
                .record_attendance(*opportunity, *attendee, status.into_status())
                .await;
            settle(&session, ErrorCategory::Attendance).await?;
            recorded?;
            output::print_success(&format!(
                "Attendance for {attendee} set to {}",
                status.into_status().map_or("unmarked", |s| s.as_str())
            ));
        }
        AttendanceCommand::Remove {
            opportunity,
            attendee,
        } => {
            let removed = session.manager_remove_attendee(*opportunity, *attendee).await;
            settle(&session, ErrorCategory::Removal).await?;
            removed?;
            output::print_success(&format!("Removed {attendee} from {opportunity}"));
        }
    }

    Ok(())
}
