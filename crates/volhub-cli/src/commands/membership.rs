//! RSVP and favorite toggles.

use clap::Args;

use volhub_core::result::AppResult;
use volhub_core::types::{ErrorCategory, IdentityId, MembershipSet, OpportunityId};

use super::{Workspace, settle};
use crate::output;

/// Arguments for a membership toggle
#[derive(Debug, Args)]
pub struct ToggleArgs {
    /// Opportunity ID
    pub id: OpportunityId,

    /// Acting identity
    #[arg(long = "as")]
    pub actor: IdentityId,
}

/// Toggle an RSVP
pub async fn execute_rsvp(args: &ToggleArgs, workspace: &Workspace) -> AppResult<()> {
    toggle(args, workspace, MembershipSet::Rsvp).await
}

/// Toggle a favorite
pub async fn execute_favorite(args: &ToggleArgs, workspace: &Workspace) -> AppResult<()> {
    toggle(args, workspace, MembershipSet::Favorites).await
}

async fn toggle(args: &ToggleArgs, workspace: &Workspace, set: MembershipSet) -> AppResult<()> {
    let session = workspace.sign_in(args.actor).await?;
    let (toggled, category) = match set {
        MembershipSet::Rsvp => (session.toggle_rsvp(args.id).await, ErrorCategory::Rsvp),
        MembershipSet::Favorites => (
            session.toggle_favorite(args.id).await,
            ErrorCategory::General,
        ),
    };
    settle(&session, category).await?;

    let verb = if toggled? { "Added to" } else { "Removed from" };
    output::print_success(&format!("{verb} {set}: {}", args.id));
    Ok(())
}
