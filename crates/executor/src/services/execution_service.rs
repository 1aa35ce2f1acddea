use std::sync::Arc;

use common::models::{SignedTradingSignal, StatusUpdate, TrackedTradingSignal, ValidationError};
use common::signer::{SignalSigner, SigningError};
use ledger::{EncodingError, SignalInstruction, SignalSubmitter};
use storage::{SignalRef, StoreError, TrackingStore};
use strategy::SignalGenerator;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, info};

/// Failures that abort a cycle. Ledger failures are not among them: they
/// end up as FAILED entries.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("invalid signal: {0}")]
    Validation(#[from] ValidationError),
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
    #[error("signal cannot be encoded: {0}")]
    Encoding(#[from] EncodingError),
    #[error("tracking store: {0}")]
    Store(#[from] StoreError),
    #[error("submission task died: {0}")]
    Task(#[from] JoinError),
}

pub struct ExecutionService {
    generator: SignalGenerator,
    signer: SignalSigner,
    submitter: Arc<dyn SignalSubmitter>,
    store: TrackingStore,
}

impl ExecutionService {
    pub fn new(
        generator: SignalGenerator,
        signer: SignalSigner,
        submitter: Arc<dyn SignalSubmitter>,
        store: TrackingStore,
    ) -> Self {
        Self {
            generator,
            signer,
            submitter,
            store,
        }
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// Generates, signs and submits one signal, returning its tracked entry
    /// as SENT or FAILED.
    pub async fn execute_cycle(&self) -> Result<TrackedTradingSignal, ExecutionError> {
        let signal = self.generator.generate()?;
        let signed = self.signer.sign(signal)?;

        // Unencodable signals are never tracked.
        SignalInstruction::push_signal(&signed).encode()?;

        let signal_ref = self.store.append(signed.clone()).await;

        // Detached so the entry leaves PENDING even if the caller is dropped.
        let settle = tokio::spawn(settle_submission(
            self.submitter.clone(),
            self.store.clone(),
            signal_ref,
            signed,
        ));

        Ok(settle.await??)
    }
}

async fn settle_submission(
    submitter: Arc<dyn SignalSubmitter>,
    store: TrackingStore,
    signal_ref: SignalRef,
    signed: SignedTradingSignal,
) -> Result<TrackedTradingSignal, StoreError> {
    let side = if signed.is_buy() { "BUY" } else { "SELL" };
    let update = match submitter.submit(&signed).await {
        Ok(transaction_id) if !transaction_id.is_empty() => {
            info!(
                pair = signed.trading_pair(),
                side,
                amount = signed.amount(),
                "Signal {} sent: {}",
                signal_ref,
                transaction_id
            );
            StatusUpdate::Sent { transaction_id }
        }
        Ok(_) => {
            error!("Signal {} confirmed without a transaction id", signal_ref);
            StatusUpdate::Failed {
                error_message: "ledger returned an empty transaction id".to_string(),
            }
        }
        Err(e) => {
            error!("Signal {} failed: {}", signal_ref, e);
            StatusUpdate::Failed {
                error_message: e.to_string(),
            }
        }
    };

    store.update_status(signal_ref, update).await
}
