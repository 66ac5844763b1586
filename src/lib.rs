//! contrata: ciclo de vida de propostas de seguro e contratação com no
//! máximo um contrato por proposta.
//!
//! [`proposals::ProposalService`] cria propostas e aplica transições de
//! status guardadas pela [`state_machine::ProposalStateMachine`].
//! [`orchestrator::ContractingOrchestrator`] converte uma proposta aprovada
//! em contrato, consultando a [`authority::StatusAuthority`], persistindo no
//! [`store::ContractStore`] e publicando em [`events::EventPublisher`].

pub mod app;
pub mod authority;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod proposals;
pub mod state_machine;
pub mod store;
pub mod ui;

pub use contract::{Contract, ContractView};
pub use error::{ContrataError, FailureKind};
pub use orchestrator::{ContractingOrchestrator, SagaTimeouts};
pub use proposals::ProposalService;
