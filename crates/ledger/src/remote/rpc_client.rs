use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_request::RpcError,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, signature::Signature,
    transaction::Transaction,
};
use tracing::debug;

use crate::error::SubmitError;

/// The three ledger round trips a submission needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn minimum_balance_for_rent_exemption(&self, space: usize) -> Result<u64, SubmitError>;

    async fn latest_blockhash(&self) -> Result<Hash, SubmitError>;

    /// Sends and blocks until the transaction reaches the client's commitment.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, SubmitError>;
}

/// JSON-RPC ledger client pinned to `confirmed` commitment.
pub struct RpcLedger {
    client: RpcClient,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed()),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl LedgerRpc for RpcLedger {
    async fn minimum_balance_for_rent_exemption(&self, space: usize) -> Result<u64, SubmitError> {
        let lamports = self
            .client
            .get_minimum_balance_for_rent_exemption(space)
            .await
            .map_err(classify)?;
        debug!(space, lamports, "fetched rent exemption");
        Ok(lamports)
    }

    async fn latest_blockhash(&self) -> Result<Hash, SubmitError> {
        self.client.get_latest_blockhash().await.map_err(classify)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, SubmitError> {
        self.client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(classify)
    }
}

/// JSON-RPC code for a transaction that failed preflight simulation.
const PREFLIGHT_FAILURE: i64 = -32002;

/// Splits client failures into "the program said no" and "we could not
/// get an answer from the node". Node-side RPC errors (unhealthy, behind,
/// blockhash expired) count as the latter.
fn classify(err: ClientError) -> SubmitError {
    match err.kind() {
        ClientErrorKind::TransactionError(e) => SubmitError::Rejected(e.to_string()),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. })
            if *code == PREFLIGHT_FAILURE =>
        {
            SubmitError::Rejected(format!("{} (code {})", message, code))
        }
        _ => SubmitError::Network(err.to_string()),
    }
}
