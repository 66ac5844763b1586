use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::StatusAuthority;
use super::error::AuthorityError;
use crate::error::ContrataError;
use crate::proposals::ProposalService;
use crate::state_machine::ProposalStatus;

/// Status authority backed by an in-process [`ProposalService`].
///
/// Set-to-Contracted goes through the guarded transition, so it publishes
/// `proposal-status-changed` exactly like a remote service would.
pub struct LocalStatusAuthority {
    proposals: Arc<ProposalService>,
}

impl LocalStatusAuthority {
    pub fn new(proposals: Arc<ProposalService>) -> Self {
        Self { proposals }
    }
}

fn to_authority_error(proposal_id: Uuid, err: ContrataError) -> AuthorityError {
    match err {
        ContrataError::NotFound { .. } => AuthorityError::UnknownProposal(proposal_id),
        other => AuthorityError::Rejected(other.to_string()),
    }
}

#[async_trait]
impl StatusAuthority for LocalStatusAuthority {
    async fn get_status(&self, proposal_id: Uuid) -> Result<ProposalStatus, AuthorityError> {
        self.proposals
            .status(proposal_id)
            .await
            .map_err(|e| to_authority_error(proposal_id, e))
    }

    async fn set_status_to_contracted(&self, proposal_id: Uuid) -> Result<(), AuthorityError> {
        self.proposals
            .alter_status(proposal_id, ProposalStatus::Contracted)
            .await
            .map(|_| ())
            .map_err(|e| to_authority_error(proposal_id, e))
    }
}
