use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{ContractStore, ProposalStore, StoreError};
use crate::contract::Contract;
use crate::state_machine::{Proposal, ProposalStatus};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend("store lock poisoned".into()))
}

/// Process-local proposal store.
#[derive(Debug, Default)]
pub struct InMemoryProposalStore {
    proposals: Mutex<HashMap<Uuid, Proposal>>,
}

impl InMemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalStore for InMemoryProposalStore {
    async fn get(&self, id: Uuid) -> Result<Proposal, StoreError> {
        lock(&self.proposals)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "proposal",
                id,
            })
    }

    async fn list(&self) -> Result<Vec<Proposal>, StoreError> {
        let mut all: Vec<Proposal> = lock(&self.proposals)?.values().cloned().collect();
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(all)
    }

    async fn create(&self, proposal: Proposal) -> Result<Proposal, StoreError> {
        let mut proposals = lock(&self.proposals)?;
        if proposals.contains_key(&proposal.id()) {
            return Err(StoreError::Conflict(format!(
                "proposal {} already exists",
                proposal.id()
            )));
        }
        proposals.insert(proposal.id(), proposal.clone());
        Ok(proposal)
    }

    async fn update_if_status(
        &self,
        proposal: &Proposal,
        expected: ProposalStatus,
    ) -> Result<(), StoreError> {
        let mut proposals = lock(&self.proposals)?;
        match proposals.get_mut(&proposal.id()) {
            Some(slot) if slot.status() == expected => {
                *slot = proposal.clone();
                Ok(())
            }
            Some(_) => Err(StoreError::Conflict(format!(
                "proposal {} is no longer {expected}",
                proposal.id()
            ))),
            None => Err(StoreError::NotFound {
                entity: "proposal",
                id: proposal.id(),
            }),
        }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(lock(&self.proposals)?.contains_key(&id))
    }
}

#[derive(Debug, Default)]
struct ContractTable {
    by_id: HashMap<Uuid, Contract>,
    // proposal_id -> contract id
    by_proposal: HashMap<Uuid, Uuid>,
}

/// Process-local contract store.
///
/// Both indexes sit under one lock, so the uniqueness check and the insert
/// in [`ContractStore::create`] are a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryContractStore {
    table: Mutex<ContractTable>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn get(&self, id: Uuid) -> Result<Contract, StoreError> {
        lock(&self.table)?
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "contract",
                id,
            })
    }

    async fn list(&self) -> Result<Vec<Contract>, StoreError> {
        let mut all: Vec<Contract> = lock(&self.table)?.by_id.values().cloned().collect();
        all.sort_by(|a, b| b.contracted_at().cmp(&a.contracted_at()));
        Ok(all)
    }

    async fn create(&self, contract: Contract) -> Result<Contract, StoreError> {
        let mut table = lock(&self.table)?;
        if table.by_proposal.contains_key(&contract.proposal_id()) {
            return Err(StoreError::Conflict(format!(
                "contract for proposal {} already exists",
                contract.proposal_id()
            )));
        }
        if table.by_id.contains_key(&contract.id()) {
            return Err(StoreError::Conflict(format!(
                "contract {} already exists",
                contract.id()
            )));
        }
        table.by_proposal.insert(contract.proposal_id(), contract.id());
        table.by_id.insert(contract.id(), contract.clone());
        Ok(contract)
    }

    async fn exists_by_proposal_id(&self, proposal_id: Uuid) -> Result<bool, StoreError> {
        Ok(lock(&self.table)?.by_proposal.contains_key(&proposal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{ProposalStateMachine, ProposalStatus, sample_input};

    #[tokio::test]
    async fn proposal_roundtrip_and_update() {
        let store = InMemoryProposalStore::new();
        let mut p = store.create(Proposal::new(sample_input()).unwrap()).await.unwrap();
        assert!(store.exists(p.id()).await.unwrap());

        ProposalStateMachine::transition(&mut p, ProposalStatus::Approved).unwrap();
        store
            .update_if_status(&p, ProposalStatus::UnderReview)
            .await
            .unwrap();

        let loaded = store.get(p.id()).await.unwrap();
        assert_eq!(loaded.status(), ProposalStatus::Approved);
        assert!(loaded.updated_at().is_some());
    }

    #[tokio::test]
    async fn update_from_stale_status_conflicts() {
        let store = InMemoryProposalStore::new();
        let stored = store.create(Proposal::new(sample_input()).unwrap()).await.unwrap();

        let mut approve = stored.clone();
        let mut reject = stored;
        ProposalStateMachine::transition(&mut approve, ProposalStatus::Approved).unwrap();
        ProposalStateMachine::transition(&mut reject, ProposalStatus::Rejected).unwrap();

        store
            .update_if_status(&approve, ProposalStatus::UnderReview)
            .await
            .unwrap();
        assert!(matches!(
            store.update_if_status(&reject, ProposalStatus::UnderReview).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            store.get(approve.id()).await.unwrap().status(),
            ProposalStatus::Approved
        );
    }

    #[tokio::test]
    async fn missing_proposal_is_not_found() {
        let store = InMemoryProposalStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(id).await,
            Err(StoreError::NotFound { entity: "proposal", id: missing }) if missing == id
        ));
        assert!(!store.exists(id).await.unwrap());

        let orphan = Proposal::new(sample_input()).unwrap();
        assert!(matches!(
            store.update_if_status(&orphan, ProposalStatus::UnderReview).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn proposals_listed_newest_first() {
        let store = InMemoryProposalStore::new();
        let first = store.create(Proposal::new(sample_input()).unwrap()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create(Proposal::new(sample_input()).unwrap()).await.unwrap();

        let ids: Vec<Uuid> = store.list().await.unwrap().iter().map(Proposal::id).collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }

    #[tokio::test]
    async fn second_contract_for_same_proposal_conflicts() {
        let store = InMemoryContractStore::new();
        let proposal_id = Uuid::new_v4();

        store.create(Contract::new(proposal_id).unwrap()).await.unwrap();
        let dup = store.create(Contract::new(proposal_id).unwrap()).await;

        assert!(matches!(dup, Err(StoreError::Conflict(_))));
        assert_eq!(store.len(), 1);
        assert!(store.exists_by_proposal_id(proposal_id).await.unwrap());
    }

    #[tokio::test]
    async fn contracts_get_and_list() {
        let store = InMemoryContractStore::new();
        let a = store.create(Contract::new(Uuid::new_v4()).unwrap()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = store.create(Contract::new(Uuid::new_v4()).unwrap()).await.unwrap();

        assert_eq!(store.get(a.id()).await.unwrap(), a);
        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![b, a]);
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(StoreError::NotFound { entity: "contract", .. })
        ));
    }
}
