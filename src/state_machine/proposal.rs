use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ContrataError;

use super::status::ProposalStatus;

/// Dados de entrada para criar uma proposta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProposal {
    pub client_name: String,
    pub client_tax_id: String,
    pub insurance_type: String,
    pub coverage_amount: Decimal,
    pub premium_amount: Decimal,
}

impl NewProposal {
    /// Checks every field, reporting the first offending one.
    pub fn validate(&self) -> Result<(), ContrataError> {
        require_text("client_name", &self.client_name)?;
        require_text("client_tax_id", &self.client_tax_id)?;
        require_text("insurance_type", &self.insurance_type)?;
        require_positive("coverage_amount", self.coverage_amount)?;
        require_positive("premium_amount", self.premium_amount)?;
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ContrataError> {
    if value.trim().is_empty() {
        return Err(ContrataError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_positive(field: &'static str, value: Decimal) -> Result<(), ContrataError> {
    if value <= Decimal::ZERO {
        return Err(ContrataError::validation(field, "must be greater than zero"));
    }
    Ok(())
}

/// A proposal for insurance coverage.
///
/// Status only changes through [`ProposalStateMachine::transition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    id: Uuid,
    client_name: String,
    client_tax_id: String,
    insurance_type: String,
    coverage_amount: Decimal,
    premium_amount: Decimal,
    status: ProposalStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Proposal {
    /// Validates the input and builds a fresh proposal under review.
    pub fn new(input: NewProposal) -> Result<Self, ContrataError> {
        input.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            client_name: input.client_name,
            client_tax_id: input.client_tax_id,
            insurance_type: input.insurance_type,
            coverage_amount: input.coverage_amount,
            premium_amount: input.premium_amount,
            status: ProposalStatus::UnderReview,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Rebuilds a proposal read back from storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: Uuid,
        client_name: String,
        client_tax_id: String,
        insurance_type: String,
        coverage_amount: Decimal,
        premium_amount: Decimal,
        status: ProposalStatus,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            client_name,
            client_tax_id,
            insurance_type,
            coverage_amount,
            premium_amount,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn client_tax_id(&self) -> &str {
        &self.client_tax_id
    }

    pub fn insurance_type(&self) -> &str {
        &self.insurance_type
    }

    pub fn coverage_amount(&self) -> Decimal {
        self.coverage_amount
    }

    pub fn premium_amount(&self) -> Decimal {
        self.premium_amount
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn view(&self) -> ProposalView {
        ProposalView::from(self)
    }
}

/// Uma transição aplicada com sucesso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub proposal_id: Uuid,
    pub from: ProposalStatus,
    pub to: ProposalStatus,
    pub changed_at: DateTime<Utc>,
}

/// Legal `(from, to)` pairs. Everything else is rejected.
const LEGAL_TRANSITIONS: [(ProposalStatus, ProposalStatus); 3] = [
    (ProposalStatus::UnderReview, ProposalStatus::Approved),
    (ProposalStatus::UnderReview, ProposalStatus::Rejected),
    (ProposalStatus::Approved, ProposalStatus::Contracted),
];

/// Guards proposal status changes.
pub struct ProposalStateMachine;

impl ProposalStateMachine {
    pub fn is_legal(from: ProposalStatus, to: ProposalStatus) -> bool {
        LEGAL_TRANSITIONS.contains(&(from, to))
    }

    /// Statuses reachable from `from` in one step.
    pub fn successors(from: ProposalStatus) -> impl Iterator<Item = ProposalStatus> {
        LEGAL_TRANSITIONS
            .into_iter()
            .filter(move |(source, _)| *source == from)
            .map(|(_, target)| target)
    }

    /// Moves the proposal to `target` and stamps `updated_at`.
    ///
    /// On an illegal pair the proposal is left untouched.
    pub fn transition(
        proposal: &mut Proposal,
        target: ProposalStatus,
    ) -> Result<StatusChange, ContrataError> {
        let from = proposal.status;
        if !Self::is_legal(from, target) {
            return Err(ContrataError::InvalidTransition { from, to: target });
        }

        let now = Utc::now();
        proposal.status = target;
        proposal.updated_at = Some(now);

        Ok(StatusChange {
            proposal_id: proposal.id,
            from,
            to: target,
            changed_at: now,
        })
    }
}

/// Representação pública de uma proposta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalView {
    pub id: Uuid,
    pub client_name: String,
    pub client_tax_id: String,
    pub insurance_type: String,
    pub coverage_amount: Decimal,
    pub premium_amount: Decimal,
    /// Nome do status (ex.: "Approved").
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Proposal> for ProposalView {
    fn from(p: &Proposal) -> Self {
        Self {
            id: p.id,
            client_name: p.client_name.clone(),
            client_tax_id: p.client_tax_id.clone(),
            insurance_type: p.insurance_type.clone(),
            coverage_amount: p.coverage_amount,
            premium_amount: p.premium_amount,
            status: p.status.to_string(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
