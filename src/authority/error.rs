//! Tipos de erro para chamadas à autoridade remota de status.
//!
//! Qualquer variante de [`AuthorityError`] é reportada ao chamador do saga
//! como `RemoteCallFailure`; nenhuma delas é retentada aqui.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthorityError {
    /// O serviço respondeu com um status HTTP fora de 2xx.
    #[error("proposal service returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Timeout (do cliente HTTP ou do limite imposto pelo orquestrador).
    #[error("request to proposal service timed out")]
    Timeout,

    /// O corpo da resposta não pôde ser interpretado (JSON inválido, status desconhecido).
    #[error("invalid response from proposal service: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("proposal {0} is unknown to the status authority")]
    UnknownProposal(Uuid),

    /// The authority refused the status change.
    #[error("status change rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for AuthorityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthorityError::Timeout
        } else if err.is_decode() {
            AuthorityError::InvalidResponse(err.to_string())
        } else {
            AuthorityError::Network(err)
        }
    }
}
