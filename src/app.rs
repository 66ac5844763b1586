//! Montagem dos adaptadores a partir da configuração e despacho dos comandos.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::authority::{HttpStatusAuthority, LocalStatusAuthority, StatusAuthority};
use crate::cli::{Command, ContractsCommand, ProposalCommand};
use crate::config::ContrataConfig;
use crate::contract::ContractView;
use crate::error::{ContrataError, parse_id};
use crate::events::SpoolPublisher;
use crate::orchestrator::ContractingOrchestrator;
use crate::proposals::ProposalService;
use crate::state_machine::{NewProposal, ProposalView};
use crate::store::SqliteStore;

/// Resultado de um comando, serializado como JSON puro.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Proposal(ProposalView),
    Proposals(Vec<ProposalView>),
    Contract(ContractView),
    Contracts(Vec<ContractView>),
}

/// Use cases wired to SQLite, the event spool and the configured status
/// authority.
pub struct App {
    proposals: Arc<ProposalService>,
    orchestrator: ContractingOrchestrator,
    publisher: Arc<SpoolPublisher>,
}

impl App {
    pub async fn open(config: &ContrataConfig) -> Result<Self> {
        let store = Arc::new(
            SqliteStore::open(&config.database_path).with_context(|| {
                format!("failed to open database {}", config.database_path.display())
            })?,
        );
        let publisher = Arc::new(
            SpoolPublisher::open(&config.events.spool_dir)
                .await
                .with_context(|| {
                    format!(
                        "failed to open event spool {}",
                        config.events.spool_dir.display()
                    )
                })?,
        );

        let proposals = Arc::new(
            ProposalService::new(store.clone(), publisher.clone())
                .with_publish_timeout(config.publish_timeout()),
        );

        let authority: Arc<dyn StatusAuthority> = match &config.proposal_service.base_url {
            Some(url) => {
                tracing::debug!(%url, "using remote proposal service");
                Arc::new(
                    HttpStatusAuthority::with_timeouts(
                        url,
                        Duration::from_millis(config.proposal_service.timeout_ms),
                        Duration::from_millis(config.proposal_service.connect_timeout_ms),
                    )
                    .context("failed to build proposal service client")?,
                )
            }
            None => Arc::new(LocalStatusAuthority::new(proposals.clone())),
        };

        let orchestrator = ContractingOrchestrator::new(store, authority, publisher.clone())
            .with_timeouts(config.saga_timeouts());

        Ok(Self {
            proposals,
            orchestrator,
            publisher,
        })
    }

    pub fn proposals(&self) -> &ProposalService {
        &self.proposals
    }

    pub fn orchestrator(&self) -> &ContractingOrchestrator {
        &self.orchestrator
    }

    pub async fn run(&self, command: Command) -> Result<(&'static str, Outcome), ContrataError> {
        match command {
            Command::Proposal { action } => self.run_proposal(action).await,
            Command::Contract { proposal_id } => {
                let proposal_id = parse_id(&proposal_id, "proposal_id")?;
                let contract = self.orchestrator.contract(proposal_id).await?;
                Ok(("contract created", Outcome::Contract(contract)))
            }
            Command::Contracts { action } => match action {
                ContractsCommand::List => Ok((
                    "contracts",
                    Outcome::Contracts(self.orchestrator.list_contracts().await?),
                )),
                ContractsCommand::Get { id } => {
                    let id = parse_id(&id, "id")?;
                    Ok((
                        "contract",
                        Outcome::Contract(self.orchestrator.get_contract(id).await?),
                    ))
                }
            },
        }
    }

    async fn run_proposal(
        &self,
        action: ProposalCommand,
    ) -> Result<(&'static str, Outcome), ContrataError> {
        match action {
            ProposalCommand::Create {
                name,
                tax_id,
                insurance_type,
                coverage,
                premium,
            } => {
                let view = self
                    .proposals
                    .create(NewProposal {
                        client_name: name,
                        client_tax_id: tax_id,
                        insurance_type,
                        coverage_amount: coverage,
                        premium_amount: premium,
                    })
                    .await?;
                Ok(("proposal created", Outcome::Proposal(view)))
            }
            ProposalCommand::List => Ok((
                "proposals",
                Outcome::Proposals(self.proposals.list().await?),
            )),
            ProposalCommand::Get { id } => {
                let id = parse_id(&id, "id")?;
                Ok(("proposal", Outcome::Proposal(self.proposals.get(id).await?)))
            }
            ProposalCommand::Status { id, status } => {
                let id = parse_id(&id, "id")?;
                let view = self.proposals.alter_status(id, status).await?;
                Ok(("proposal status changed", Outcome::Proposal(view)))
            }
        }
    }

    /// Fecha a fila de eventos. Publicações posteriores falham.
    pub async fn shutdown(&self) -> Result<()> {
        self.publisher
            .shutdown()
            .await
            .context("failed to close event spool")
    }
}
