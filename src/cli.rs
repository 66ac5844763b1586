//! Interface de linha de comando do contrata baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (proposal, contract,
//! contracts) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::state_machine::ProposalStatus;

/// contrata: ciclo de vida de propostas de seguro e contratação.
#[derive(Debug, Parser)]
#[command(name = "contrata", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./contrata.toml, se existir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita logs de depuração.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cria, consulta e altera propostas.
    Proposal {
        #[command(subcommand)]
        action: ProposalCommand,
    },

    /// Contrata uma proposta aprovada.
    Contract {
        /// Identificador da proposta.
        proposal_id: String,
    },

    /// Consulta contratos.
    Contracts {
        #[command(subcommand)]
        action: ContractsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProposalCommand {
    /// Registra uma nova proposta em análise.
    Create {
        #[arg(long)]
        name: String,

        /// CPF/CNPJ do cliente.
        #[arg(long)]
        tax_id: String,

        #[arg(long)]
        insurance_type: String,

        /// Valor de cobertura, maior que zero.
        #[arg(long)]
        coverage: Decimal,

        /// Valor do prêmio, maior que zero.
        #[arg(long)]
        premium: Decimal,
    },

    /// Lista propostas, mais recentes primeiro.
    List,

    Get {
        id: String,
    },

    /// Altera o status (nome ou código: UnderReview=1, Approved=2, Rejected=3, Contracted=4).
    Status {
        id: String,
        status: ProposalStatus,
    },
}

#[derive(Debug, Subcommand)]
pub enum ContractsCommand {
    /// Lista contratos, mais recentes primeiro.
    List,

    Get {
        id: String,
    },
}
