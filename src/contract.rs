use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ContrataError;

/// Registro durável de que uma proposta virou contrato.
///
/// At most one exists per `proposal_id`; the contract store enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    id: Uuid,
    proposal_id: Uuid,
    contracted_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(proposal_id: Uuid) -> Result<Self, ContrataError> {
        if proposal_id.is_nil() {
            return Err(ContrataError::validation(
                "proposal_id",
                "identifier must not be nil",
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            proposal_id,
            contracted_at: Utc::now(),
        })
    }

    pub(crate) fn from_parts(id: Uuid, proposal_id: Uuid, contracted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            proposal_id,
            contracted_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn proposal_id(&self) -> Uuid {
        self.proposal_id
    }

    pub fn contracted_at(&self) -> DateTime<Utc> {
        self.contracted_at
    }

    pub fn view(&self) -> ContractView {
        ContractView {
            id: self.id,
            proposal_id: self.proposal_id,
            contracted_at: self.contracted_at,
        }
    }
}

/// Public representation returned by the contracting use cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractView {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub contracted_at: DateTime<Utc>,
}
