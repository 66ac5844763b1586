use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Os quatro estados de uma proposta.
///
/// Os discriminantes são o contrato de fio entre os serviços (1..=4) e
/// não podem ser renumerados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ProposalStatus {
    UnderReview = 1,
    Approved = 2,
    Rejected = 3,
    Contracted = 4,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 4] = [
        ProposalStatus::UnderReview,
        ProposalStatus::Approved,
        ProposalStatus::Rejected,
        ProposalStatus::Contracted,
    ];

    /// Integer code used on the wire and in storage.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ProposalStatus::UnderReview),
            2 => Some(ProposalStatus::Approved),
            3 => Some(ProposalStatus::Rejected),
            4 => Some(ProposalStatus::Contracted),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ProposalStatus::UnderReview => "UnderReview",
            ProposalStatus::Approved => "Approved",
            ProposalStatus::Rejected => "Rejected",
            ProposalStatus::Contracted => "Contracted",
        }
    }

    /// `Rejected` and `Contracted` accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, ProposalStatus::Rejected | ProposalStatus::Contracted)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ProposalStatus> for u8 {
    fn from(status: ProposalStatus) -> Self {
        status.code()
    }
}

/// Returned when a code or name does not map to any [`ProposalStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown proposal status: {0}")]
pub struct UnknownStatus(pub String);

impl TryFrom<u8> for ProposalStatus {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| UnknownStatus(code.to_string()))
    }
}

impl FromStr for ProposalStatus {
    type Err = UnknownStatus;

    /// Aceita o nome canônico sem diferenciar maiúsculas, ou o código numérico.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::try_from(code);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
