//! Orquestração da contratação de uma proposta aprovada.
//!
//! O [`ContractingOrchestrator`] conduz o saga em ordem fixa:
//! pré-checagem de duplicidade, consulta de status na autoridade remota,
//! persistência do contrato, atualização do status remoto para `Contracted`
//! e publicação de `contract-created`. Não há compensação: uma falha depois
//! da persistência deixa o contrato gravado e é reportada ao chamador.
//!
//! A garantia de no máximo um contrato por proposta vem da criação atômica
//! no [`ContractStore`]; a pré-checagem só evita chamadas remotas inúteis.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;
use uuid::Uuid;

use crate::authority::{AuthorityError, StatusAuthority};
use crate::contract::{Contract, ContractView};
use crate::error::ContrataError;
use crate::events::{ContractCreated, DomainEvent, EventPublisher};
use crate::proposals::not_found_or_storage;
use crate::state_machine::ProposalStatus;
use crate::store::{ContractStore, StoreError};

/// Limites de tempo das etapas externas do saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaTimeouts {
    /// Cada chamada à autoridade de status.
    pub remote: Duration,
    /// Publicação do evento final.
    pub publish: Duration,
}

impl Default for SagaTimeouts {
    fn default() -> Self {
        Self {
            remote: Duration::from_secs(5),
            publish: Duration::from_secs(2),
        }
    }
}

pub struct ContractingOrchestrator {
    contracts: Arc<dyn ContractStore>,
    authority: Arc<dyn StatusAuthority>,
    publisher: Arc<dyn EventPublisher>,
    timeouts: SagaTimeouts,
}

impl ContractingOrchestrator {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        authority: Arc<dyn StatusAuthority>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            contracts,
            authority,
            publisher,
            timeouts: SagaTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: SagaTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Contrata a proposta `proposal_id`.
    ///
    /// Retorna [`ContrataError::AlreadyContracted`] para toda chamada que não
    /// for a primeira a persistir o contrato, inclusive sob concorrência.
    #[instrument(skip_all, fields(proposal_id = %proposal_id))]
    pub async fn contract(&self, proposal_id: Uuid) -> Result<ContractView, ContrataError> {
        if proposal_id.is_nil() {
            return Err(ContrataError::validation("proposal_id", "must not be empty"));
        }

        if self.contracts.exists_by_proposal_id(proposal_id).await? {
            tracing::debug!("contract already exists");
            return Err(ContrataError::AlreadyContracted { proposal_id });
        }

        let status = self.remote(self.authority.get_status(proposal_id)).await?;
        if status != ProposalStatus::Approved {
            tracing::debug!(%status, "proposal not approved");
            return Err(ContrataError::NotApproved { status });
        }

        let contract = match self.contracts.create(Contract::new(proposal_id)?).await {
            Ok(contract) => contract,
            Err(StoreError::Conflict(reason)) => {
                tracing::debug!(%reason, "lost the race to another contracting request");
                return Err(ContrataError::AlreadyContracted { proposal_id });
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(contract_id = %contract.id(), "contract persisted");

        if let Err(e) = self
            .remote(self.authority.set_status_to_contracted(proposal_id))
            .await
        {
            tracing::warn!(
                contract_id = %contract.id(),
                error = %e,
                "contract persisted but proposal status was not updated"
            );
            return Err(e.into());
        }

        let event = DomainEvent::ContractCreated(ContractCreated {
            contract_id: contract.id(),
            proposal_id,
            contracted_at: contract.contracted_at(),
        });
        if let Err(e) = event
            .publish_within(self.publisher.as_ref(), self.timeouts.publish)
            .await
        {
            tracing::warn!(
                contract_id = %contract.id(),
                error = %e,
                "contract persisted but contract-created was not published"
            );
            return Err(e.into());
        }

        Ok(contract.view())
    }

    pub async fn get_contract(&self, id: Uuid) -> Result<ContractView, ContrataError> {
        let contract = self.contracts.get(id).await.map_err(not_found_or_storage)?;
        Ok(contract.view())
    }

    /// Most recently contracted first.
    pub async fn list_contracts(&self) -> Result<Vec<ContractView>, ContrataError> {
        let contracts = self.contracts.list().await?;
        Ok(contracts.iter().map(Contract::view).collect())
    }

    async fn remote<T>(
        &self,
        call: impl Future<Output = Result<T, AuthorityError>>,
    ) -> Result<T, AuthorityError> {
        tokio::time::timeout(self.timeouts.remote, call)
            .await
            .map_err(|_| AuthorityError::Timeout)?
    }
}
