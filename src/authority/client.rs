use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use super::StatusAuthority;
use super::error::AuthorityError;
use super::types::{ChangeStatusRequest, ProposalStatusResponse};
use crate::state_machine::ProposalStatus;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client for the proposal service, the owner of canonical proposal status.
pub struct HttpStatusAuthority {
    client: Client,
    base_url: String,
}

impl HttpStatusAuthority {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthorityError> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, AuthorityError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(AuthorityError::Network)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn proposal_url(&self, proposal_id: Uuid) -> String {
        format!("{}/api/proposals/{proposal_id}", self.base_url)
    }

    async fn error_from(response: reqwest::Response) -> AuthorityError {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        AuthorityError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl StatusAuthority for HttpStatusAuthority {
    async fn get_status(&self, proposal_id: Uuid) -> Result<ProposalStatus, AuthorityError> {
        let response = self.client.get(self.proposal_url(proposal_id)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AuthorityError::UnknownProposal(proposal_id));
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let bytes = response.bytes().await?;
        let body: ProposalStatusResponse = serde_json::from_slice(&bytes)
            .map_err(|e| AuthorityError::InvalidResponse(e.to_string()))?;
        body.status.resolve()
    }

    async fn set_status_to_contracted(&self, proposal_id: Uuid) -> Result<(), AuthorityError> {
        let body = ChangeStatusRequest {
            new_status: ProposalStatus::Contracted,
        };
        let response = self
            .client
            .patch(format!("{}/status", self.proposal_url(proposal_id)))
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AuthorityError::UnknownProposal(proposal_id));
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }
}
