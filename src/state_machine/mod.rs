mod proposal;
mod status;

pub use proposal::{NewProposal, Proposal, ProposalStateMachine, ProposalView, StatusChange};
pub use status::{ProposalStatus, UnknownStatus};

#[cfg(test)]
pub(crate) use proposal::tests::sample_input;
