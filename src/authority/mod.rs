pub mod client;
pub mod error;
pub mod local;
pub mod types;

use async_trait::async_trait;
use uuid::Uuid;

use crate::state_machine::ProposalStatus;

pub use client::HttpStatusAuthority;
pub use error::AuthorityError;
pub use local::LocalStatusAuthority;

/// The collaborator owning canonical proposal status.
#[async_trait]
pub trait StatusAuthority: Send + Sync {
    async fn get_status(&self, proposal_id: Uuid) -> Result<ProposalStatus, AuthorityError>;

    async fn set_status_to_contracted(&self, proposal_id: Uuid) -> Result<(), AuthorityError>;
}
