//! Wire types exchanged with the proposal service.
//!
//! The service reports `status` either as a name (`"Approved"`, any case) or
//! as the integer code; both are accepted. Status changes are always sent as
//! the integer code.

use serde::{Deserialize, Serialize};

use super::error::AuthorityError;
use crate::state_machine::ProposalStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusRepr {
    Code(u8),
    Name(String),
}

impl StatusRepr {
    pub fn resolve(&self) -> Result<ProposalStatus, AuthorityError> {
        let parsed = match self {
            StatusRepr::Code(code) => ProposalStatus::try_from(*code),
            // Numeric strings are not a name; only codes travel as numbers.
            StatusRepr::Name(name) if name.trim().parse::<u8>().is_ok() => {
                return Err(AuthorityError::InvalidResponse(format!(
                    "status name expected, got {name:?}"
                )));
            }
            StatusRepr::Name(name) => name.parse::<ProposalStatus>(),
        };
        parsed.map_err(|e| AuthorityError::InvalidResponse(e.to_string()))
    }
}

/// Corpo de `GET /api/proposals/{id}`; os demais campos da proposta são ignorados.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalStatusResponse {
    pub status: StatusRepr,
}

/// Corpo de `PATCH /api/proposals/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub new_status: ProposalStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_name_any_case() {
        let resp: ProposalStatusResponse =
            serde_json::from_str(r#"{"id":"x","client_name":"Ana","status":"aPPROVED"}"#).unwrap();
        assert_eq!(resp.status.resolve().unwrap(), ProposalStatus::Approved);
    }

    #[test]
    fn status_code() {
        let resp: ProposalStatusResponse = serde_json::from_str(r#"{"status":3}"#).unwrap();
        assert_eq!(resp.status.resolve().unwrap(), ProposalStatus::Rejected);
    }

    #[test]
    fn unknown_status_is_invalid_response() {
        for body in [r#"{"status":"Aprovada"}"#, r#"{"status":0}"#, r#"{"status":"2"}"#] {
            let resp: ProposalStatusResponse = serde_json::from_str(body).unwrap();
            assert!(matches!(
                resp.status.resolve(),
                Err(AuthorityError::InvalidResponse(_))
            ));
        }
    }

    #[test]
    fn change_request_sends_integer_code() {
        let body = ChangeStatusRequest {
            new_status: ProposalStatus::Contracted,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"new_status":4}"#);
    }
}
