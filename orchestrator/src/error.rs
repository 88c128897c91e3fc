use anchor_client::solana_client::client_error::ClientError;
use anchor_lang::prelude::Pubkey;
use thiserror::Error;

pub type Result<T, E = OrchestratorError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read keypair {path}: {reason}")]
    Keypair { path: String, reason: String },

    #[error("rpc request failed: {0}")]
    Rpc(#[from] ClientError),

    #[error("account {address} could not be decoded: {reason}")]
    Decode { address: Pubkey, reason: String },

    /// The program (or ledger) refused an instruction.
    #[error("{instruction} rejected: {reason}")]
    Rejected {
        instruction: &'static str,
        reason: String,
    },

    #[error("step `{step}` failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<OrchestratorError>,
    },

    #[error("check after `{step}` failed: {detail}")]
    Check { step: &'static str, detail: String },
}

impl OrchestratorError {
    /// Name of the scenario step that aborted the run, if any.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            OrchestratorError::Step { step, .. } | OrchestratorError::Check { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }
}
