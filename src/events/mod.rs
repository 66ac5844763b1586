//! Canal de eventos de domínio.
//!
//! Publicação é at-least-once e fire-and-forget do ponto de vista dos casos
//! de uso: uma falha é reportada ao chamador, mas nunca desfaz o que já foi
//! persistido. Dois adaptadores: [`SpoolPublisher`] (fila durável em disco) e
//! [`InMemoryPublisher`] (registro em memória).

pub mod memory;
pub mod spool;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::state_machine::{ProposalStatus, StatusChange};

pub use memory::{InMemoryPublisher, PublishedEvent};
pub use spool::{SpoolPublisher, SpooledEvent};

pub const PROPOSAL_STATUS_CHANGED: &str = "proposal-status-changed";
pub const CONTRACT_CREATED: &str = "contract-created";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish timed out")]
    Timeout,

    #[error("event channel is closed")]
    Closed,

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event spool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("event rejected by channel: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueues `payload` on `channel`.
    async fn publish(&self, channel: &str, payload: &Value) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalStatusChanged {
    pub proposal_id: Uuid,
    /// Integer code, as every consumer expects.
    pub new_status: ProposalStatus,
    pub changed_at: DateTime<Utc>,
}

impl From<StatusChange> for ProposalStatusChanged {
    fn from(change: StatusChange) -> Self {
        Self {
            proposal_id: change.proposal_id,
            new_status: change.to,
            changed_at: change.changed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCreated {
    pub contract_id: Uuid,
    pub proposal_id: Uuid,
    pub contracted_at: DateTime<Utc>,
}

/// Every event the use cases emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    ProposalStatusChanged(ProposalStatusChanged),
    ContractCreated(ContractCreated),
}

impl DomainEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            DomainEvent::ProposalStatusChanged(_) => PROPOSAL_STATUS_CHANGED,
            DomainEvent::ContractCreated(_) => CONTRACT_CREATED,
        }
    }

    pub fn payload(&self) -> Result<Value, PublishError> {
        let value = match self {
            DomainEvent::ProposalStatusChanged(e) => serde_json::to_value(e)?,
            DomainEvent::ContractCreated(e) => serde_json::to_value(e)?,
        };
        Ok(value)
    }

    /// Serializes the event and publishes it on its channel.
    pub async fn publish_to(&self, publisher: &dyn EventPublisher) -> Result<(), PublishError> {
        publisher.publish(self.channel(), &self.payload()?).await
    }

    /// Like [`DomainEvent::publish_to`], bounded by `limit`.
    pub async fn publish_within(
        &self,
        publisher: &dyn EventPublisher,
        limit: Duration,
    ) -> Result<(), PublishError> {
        tokio::time::timeout(limit, self.publish_to(publisher))
            .await
            .map_err(|_| PublishError::Timeout)?
    }
}
