use thiserror::Error;
use uuid::Uuid;

use crate::authority::AuthorityError;
use crate::events::PublishError;
use crate::state_machine::ProposalStatus;
use crate::store::StoreError;

/// Errors returned by the proposal and contracting use cases.
#[derive(Debug, Error)]
pub enum ContrataError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("cannot change proposal status from {from} to {to}")]
    InvalidTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("only approved proposals can be contracted (current status: {status})")]
    NotApproved { status: ProposalStatus },

    #[error("proposal {proposal_id} is already contracted")]
    AlreadyContracted { proposal_id: Uuid },

    #[error("proposal service call failed: {0}")]
    RemoteCall(#[from] AuthorityError),

    #[error("event publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ContrataError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ContrataError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ContrataError::Validation { .. }
            | ContrataError::InvalidTransition { .. }
            | ContrataError::NotFound { .. }
            | ContrataError::NotApproved { .. }
            | ContrataError::AlreadyContracted { .. } => FailureKind::Business,
            ContrataError::RemoteCall(_) | ContrataError::Publish(_) | ContrataError::Storage(_) => {
                FailureKind::System
            }
        }
    }

    /// A repeated contracting request, from the pre-check or a storage conflict.
    pub fn is_already_contracted(&self) -> bool {
        matches!(self, ContrataError::AlreadyContracted { .. })
    }
}

/// Classifies a failure for the caller's retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Rejected by a business rule; retrying the same request gives the same answer.
    Business,
    /// Infrastructure failure (remote timeout, broker, database). May be transient.
    System,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Business => write!(f, "Business"),
            FailureKind::System => write!(f, "System"),
        }
    }
}

/// Parses a textual identifier, rejecting malformed and nil ids.
pub fn parse_id(raw: &str, field: &'static str) -> Result<Uuid, ContrataError> {
    let id = Uuid::parse_str(raw.trim())
        .map_err(|e| ContrataError::validation(field, format!("malformed identifier: {e}")))?;
    if id.is_nil() {
        return Err(ContrataError::validation(field, "identifier must not be nil"));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_contracted_is_business_failure() {
        let err = ContrataError::AlreadyContracted {
            proposal_id: Uuid::new_v4(),
        };
        assert!(err.is_already_contracted());
        assert_eq!(err.failure_kind(), FailureKind::Business);
    }

    #[test]
    fn remote_failure_is_system_failure() {
        let err = ContrataError::from(AuthorityError::Timeout);
        assert!(!err.is_already_contracted());
        assert_eq!(err.failure_kind(), FailureKind::System);
    }

    #[test]
    fn validation_display_names_field() {
        let err = ContrataError::validation("premium_amount", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid premium_amount: must be greater than zero"
        );
    }

    #[test]
    fn invalid_transition_display() {
        let err = ContrataError::InvalidTransition {
            from: ProposalStatus::Rejected,
            to: ProposalStatus::Approved,
        };
        assert_eq!(
            err.to_string(),
            "cannot change proposal status from Rejected to Approved"
        );
    }

    #[test]
    fn parse_id_rejects_nil_and_garbage() {
        assert!(matches!(
            parse_id("00000000-0000-0000-0000-000000000000", "proposal_id"),
            Err(ContrataError::Validation { field: "proposal_id", .. })
        ));
        assert!(matches!(
            parse_id("not-a-uuid", "proposal_id"),
            Err(ContrataError::Validation { .. })
        ));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "proposal_id").unwrap(), id);
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::Business.to_string(), "Business");
        assert_eq!(FailureKind::System.to_string(), "System");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ContrataError>();
    }
}
