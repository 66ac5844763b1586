//! Casos de uso de propostas: criação, consulta e alteração de status.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;
use uuid::Uuid;

use crate::error::ContrataError;
use crate::events::{DomainEvent, EventPublisher};
use crate::state_machine::{
    NewProposal, Proposal, ProposalStateMachine, ProposalStatus, ProposalView,
};
use crate::store::{ProposalStore, StoreError};

const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

pub struct ProposalService {
    store: Arc<dyn ProposalStore>,
    publisher: Arc<dyn EventPublisher>,
    publish_timeout: Duration,
}

pub(crate) fn not_found_or_storage(err: StoreError) -> ContrataError {
    match err {
        StoreError::NotFound { entity, id } => ContrataError::NotFound { entity, id },
        other => ContrataError::Storage(other),
    }
}

impl ProposalService {
    pub fn new(store: Arc<dyn ProposalStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Validates and persists a new proposal under review.
    pub async fn create(&self, input: NewProposal) -> Result<ProposalView, ContrataError> {
        let proposal = Proposal::new(input)?;
        let proposal = self.store.create(proposal).await?;
        tracing::info!(proposal_id = %proposal.id(), "proposal created");
        Ok(proposal.view())
    }

    pub async fn get(&self, id: Uuid) -> Result<ProposalView, ContrataError> {
        let proposal = self.store.get(id).await.map_err(not_found_or_storage)?;
        Ok(proposal.view())
    }

    pub async fn status(&self, id: Uuid) -> Result<ProposalStatus, ContrataError> {
        let proposal = self.store.get(id).await.map_err(not_found_or_storage)?;
        Ok(proposal.status())
    }

    /// Most recently created first.
    pub async fn list(&self) -> Result<Vec<ProposalView>, ContrataError> {
        let proposals = self.store.list().await?;
        Ok(proposals.iter().map(Proposal::view).collect())
    }

    /// Applies one guarded transition, persists it, then announces it.
    ///
    /// A publish failure is returned but the persisted status stays.
    #[instrument(skip_all, fields(proposal_id = %id, requested = %target))]
    pub async fn alter_status(
        &self,
        id: Uuid,
        target: ProposalStatus,
    ) -> Result<ProposalView, ContrataError> {
        // A conflict means another caller moved the proposal first; the guard
        // then runs again against the stored status.
        let (proposal, change) = loop {
            let mut proposal = self.store.get(id).await.map_err(not_found_or_storage)?;
            let change = ProposalStateMachine::transition(&mut proposal, target)?;
            match self.store.update_if_status(&proposal, change.from).await {
                Ok(()) => break (proposal, change),
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(%reason, "status changed concurrently");
                }
                Err(e) => return Err(not_found_or_storage(e)),
            }
        };
        tracing::info!(from = %change.from, to = %change.to, "proposal status changed");

        let event = DomainEvent::ProposalStatusChanged(change.into());
        if let Err(e) = event
            .publish_within(self.publisher.as_ref(), self.publish_timeout)
            .await
        {
            tracing::warn!(error = %e, "status change persisted but event publish failed");
            return Err(e.into());
        }

        Ok(proposal.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{InMemoryPublisher, PROPOSAL_STATUS_CHANGED, PublishError};
    use crate::state_machine::sample_input;
    use crate::store::InMemoryProposalStore;
    use rust_decimal::Decimal;

    fn service() -> (ProposalService, Arc<InMemoryProposalStore>, Arc<InMemoryPublisher>) {
        let store = Arc::new(InMemoryProposalStore::new());
        let publisher = Arc::new(InMemoryPublisher::new());
        let service = ProposalService::new(store.clone(), publisher.clone());
        (service, store, publisher)
    }

    #[tokio::test]
    async fn create_persists_under_review() {
        let (service, store, publisher) = service();
        let view = service.create(sample_input()).await.unwrap();

        assert_eq!(view.status, "UnderReview");
        assert_eq!(view.updated_at, None);
        assert!(store.exists(view.id).await.unwrap());
        // Creation announces nothing.
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_without_persisting() {
        let (service, store, _) = service();
        let mut input = sample_input();
        input.coverage_amount = Decimal::ZERO;

        let err = service.create(input).await.unwrap_err();
        assert!(matches!(
            err,
            ContrataError::Validation {
                field: "coverage_amount",
                ..
            }
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let (service, _, _) = service();
        let id = Uuid::new_v4();
        assert!(matches!(
            service.get(id).await,
            Err(ContrataError::NotFound { entity: "proposal", id: missing }) if missing == id
        ));
    }

    #[tokio::test]
    async fn same_client_may_have_many_proposals() {
        let (service, _, _) = service();
        let a = service.create(sample_input()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = service.create(sample_input()).await.unwrap();

        let listed: Vec<Uuid> = service.list().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn alter_status_persists_and_publishes() {
        let (service, store, publisher) = service();
        let created = service.create(sample_input()).await.unwrap();

        let view = service
            .alter_status(created.id, ProposalStatus::Approved)
            .await
            .unwrap();

        assert_eq!(view.status, "Approved");
        assert!(view.updated_at.is_some());
        assert_eq!(
            store.get(created.id).await.unwrap().status(),
            ProposalStatus::Approved
        );

        let events = publisher.on_channel(PROPOSAL_STATUS_CHANGED);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["proposal_id"], created.id.to_string());
        assert_eq!(events[0]["new_status"], 2);
    }

    #[tokio::test]
    async fn illegal_transition_changes_nothing() {
        let (service, store, publisher) = service();
        let created = service.create(sample_input()).await.unwrap();

        let err = service
            .alter_status(created.id, ProposalStatus::Contracted)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ContrataError::InvalidTransition {
                from: ProposalStatus::UnderReview,
                to: ProposalStatus::Contracted
            }
        ));
        let stored = store.get(created.id).await.unwrap();
        assert_eq!(stored.status(), ProposalStatus::UnderReview);
        assert_eq!(stored.updated_at(), None);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn alter_status_unknown_proposal() {
        let (service, _, _) = service();
        let err = service
            .alter_status(Uuid::new_v4(), ProposalStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, ContrataError::NotFound { .. }));
    }

    #[tokio::test]
    async fn publish_failure_keeps_transition() {
        let (service, store, publisher) = service();
        let created = service.create(sample_input()).await.unwrap();
        publisher.set_failing(true);

        let err = service
            .alter_status(created.id, ProposalStatus::Rejected)
            .await
            .unwrap_err();

        assert!(matches!(err, ContrataError::Publish(_)));
        assert_eq!(
            store.get(created.id).await.unwrap().status(),
            ProposalStatus::Rejected
        );
    }

    /// Every read waits, widening the window between load and write.
    struct SlowReadStore {
        inner: InMemoryProposalStore,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ProposalStore for SlowReadStore {
        async fn get(&self, id: Uuid) -> Result<Proposal, StoreError> {
            tokio::time::sleep(self.delay).await;
            self.inner.get(id).await
        }

        async fn list(&self) -> Result<Vec<Proposal>, StoreError> {
            self.inner.list().await
        }

        async fn create(&self, proposal: Proposal) -> Result<Proposal, StoreError> {
            self.inner.create(proposal).await
        }

        async fn update_if_status(
            &self,
            proposal: &Proposal,
            expected: ProposalStatus,
        ) -> Result<(), StoreError> {
            self.inner.update_if_status(proposal, expected).await
        }

        async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.exists(id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_transitions_apply_only_one() {
        let store = Arc::new(SlowReadStore {
            inner: InMemoryProposalStore::new(),
            delay: Duration::from_millis(30),
        });
        let publisher = Arc::new(InMemoryPublisher::new());
        let service = Arc::new(ProposalService::new(store.clone(), publisher.clone()));
        let created = service.create(sample_input()).await.unwrap();

        let approve = tokio::spawn({
            let service = service.clone();
            async move { service.alter_status(created.id, ProposalStatus::Approved).await }
        });
        let reject = tokio::spawn({
            let service = service.clone();
            async move { service.alter_status(created.id, ProposalStatus::Rejected).await }
        });
        let results = [approve.await.unwrap(), reject.await.unwrap()];

        let winners: Vec<&ProposalView> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser, ContrataError::InvalidTransition { .. }));

        let stored = store.inner.get(created.id).await.unwrap();
        assert_eq!(stored.status().name(), winners[0].status);

        let events = publisher.on_channel(PROPOSAL_STATUS_CHANGED);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["new_status"], stored.status().code());
    }

    #[tokio::test]
    async fn slow_publish_times_out() {
        let store = Arc::new(InMemoryProposalStore::new());
        let publisher = Arc::new(InMemoryPublisher::with_delay(Duration::from_millis(200)));
        let service = ProposalService::new(store.clone(), publisher.clone())
            .with_publish_timeout(Duration::from_millis(20));
        let created = service.create(sample_input()).await.unwrap();

        let err = service
            .alter_status(created.id, ProposalStatus::Approved)
            .await
            .unwrap_err();

        assert!(matches!(err, ContrataError::Publish(PublishError::Timeout)));
        assert_eq!(
            store.get(created.id).await.unwrap().status(),
            ProposalStatus::Approved
        );
    }
}
