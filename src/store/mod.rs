//! Portas de persistência para propostas e contratos.
//!
//! [`ProposalStore`] e [`ContractStore`] são injetados nos casos de uso como
//! `Arc<dyn ...>`. Dois adaptadores acompanham a crate:
//! [`memory`] (processo local) e [`sqlite`] (arquivo compartilhável entre
//! processos, com índice único em `contracts.proposal_id`).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::Contract;
use crate::state_machine::{Proposal, ProposalStatus};

pub use memory::{InMemoryContractStore, InMemoryProposalStore};
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => StoreError::Conflict(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Fails with [`StoreError::NotFound`] when the id is unknown.
    async fn get(&self, id: Uuid) -> Result<Proposal, StoreError>;

    /// Most recently created first.
    async fn list(&self) -> Result<Vec<Proposal>, StoreError>;

    async fn create(&self, proposal: Proposal) -> Result<Proposal, StoreError>;

    /// Persists the new status of `proposal` only while the stored status is
    /// still `expected`. A concurrent change yields [`StoreError::Conflict`].
    async fn update_if_status(
        &self,
        proposal: &Proposal,
        expected: ProposalStatus,
    ) -> Result<(), StoreError>;

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Contract, StoreError>;

    /// Most recently contracted first.
    async fn list(&self) -> Result<Vec<Contract>, StoreError>;

    /// Persists the contract atomically with respect to the one-per-proposal
    /// rule. A second contract for the same proposal yields
    /// [`StoreError::Conflict`].
    async fn create(&self, contract: Contract) -> Result<Contract, StoreError>;

    async fn exists_by_proposal_id(&self, proposal_id: Uuid) -> Result<bool, StoreError>;
}
