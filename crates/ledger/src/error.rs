use std::time::Duration;

use thiserror::Error;

use crate::instruction::EncodingError;

/// Why a signal did not reach the ledger.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("transaction signing failed: {0}")]
    Signing(String),
    #[error("ledger network error: {0}")]
    Network(String),
    #[error("confirmation timed out after {0:?}")]
    Timeout(Duration),
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),
}

impl SubmitError {
    /// True when the failure happened before anything left the process.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Encoding(_) | Self::Signing(_))
    }
}
