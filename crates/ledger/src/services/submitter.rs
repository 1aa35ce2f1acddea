use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::identity::OracleIdentity;
use common::models::SignedTradingSignal;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::Transaction,
};
use tokio::time;
use tracing::{debug, info, warn};

use crate::error::SubmitError;
use crate::instruction::{SIGNAL_ACCOUNT_SPACE, SignalInstruction};
use crate::remote::LedgerRpc;

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Delivers a signed signal to the ledger and returns the transaction id.
#[async_trait]
pub trait SignalSubmitter: Send + Sync {
    async fn submit(&self, signal: &SignedTradingSignal) -> Result<String, SubmitError>;
}

/// Stores each signal in a fresh program-owned account, created and
/// written in one atomic transaction.
pub struct LedgerSubmitter<R> {
    rpc: R,
    program_id: Pubkey,
    identity: Arc<OracleIdentity>,
    confirm_timeout: Duration,
}

impl<R: LedgerRpc> LedgerSubmitter<R> {
    pub fn new(rpc: R, program_id: Pubkey, identity: Arc<OracleIdentity>) -> Self {
        Self {
            rpc,
            program_id,
            identity,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }

    /// Upper bound on every ledger round trip of one submission: rent
    /// query, blockhash fetch and the confirmation wait together.
    pub fn with_confirm_timeout(mut self, confirm_timeout: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    fn push_signal_instruction(&self, data: Vec<u8>, signal_account: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly(self.identity.pubkey(), true),
                AccountMeta::new(*signal_account, false),
            ],
            data,
        }
    }

    /// Both the oracle (payer) and the new account sign: the account must
    /// authorize its own creation.
    fn build_transaction(
        &self,
        data: Vec<u8>,
        signal_account: &Keypair,
        lamports: u64,
        blockhash: Hash,
    ) -> Result<Transaction, SubmitError> {
        let payer = self.identity.pubkey();

        let create_ix = system_instruction::create_account(
            &payer,
            &signal_account.pubkey(),
            lamports,
            SIGNAL_ACCOUNT_SPACE as u64,
            &self.program_id,
        );
        let push_ix = self.push_signal_instruction(data, &signal_account.pubkey());

        let mut tx = Transaction::new_with_payer(&[create_ix, push_ix], Some(&payer));
        tx.try_sign(&[self.identity.keypair(), signal_account], blockhash)
            .map_err(|e| SubmitError::Signing(e.to_string()))?;
        Ok(tx)
    }
}

#[async_trait]
impl<R: LedgerRpc> SignalSubmitter for LedgerSubmitter<R> {
    async fn submit(&self, signal: &SignedTradingSignal) -> Result<String, SubmitError> {
        // Encode first: a bad payload must never cost a round trip.
        let data = SignalInstruction::push_signal(signal).encode()?;
        debug!(
            len = data.len(),
            head = %hex::encode(&data[..data.len().min(8)]),
            "encoded push_signal instruction"
        );

        let signal_account = Keypair::new();
        let round_trips = async {
            let lamports = self
                .rpc
                .minimum_balance_for_rent_exemption(SIGNAL_ACCOUNT_SPACE)
                .await?;
            let blockhash = self.rpc.latest_blockhash().await?;

            let tx = self.build_transaction(data, &signal_account, lamports, blockhash)?;

            info!(
                pair = signal.trading_pair(),
                signal_account = %signal_account.pubkey(),
                lamports,
                "submitting signal"
            );
            self.rpc.send_and_confirm(&tx).await
        };

        let signature = match time::timeout(self.confirm_timeout, round_trips).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "Signal account {} not confirmed within {:?}",
                    signal_account.pubkey(),
                    self.confirm_timeout
                );
                return Err(SubmitError::Timeout(self.confirm_timeout));
            }
        };

        info!("Signal pushed to ledger. Transaction ID: {}", signature);
        Ok(signature.to_string())
    }
}
