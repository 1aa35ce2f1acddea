use std::fmt;
use std::sync::Arc;

use common::models::{SignedTradingSignal, StatusUpdate, TrackedTradingSignal, TransitionError};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Position of an entry in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalRef(usize);

impl SignalRef {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no tracked signal {0}")]
    UnknownSignal(SignalRef),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Append-only, in-memory record of every submission attempt.
///
/// Clones share the same entries. Appends and status updates are
/// serialized by the lock; readers get snapshots.
#[derive(Clone, Default)]
pub struct TrackingStore {
    entries: Arc<RwLock<Vec<TrackedTradingSignal>>>,
}

impl TrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signal as PENDING.
    pub async fn append(&self, signal: SignedTradingSignal) -> SignalRef {
        let mut entries = self.entries.write().await;
        entries.push(TrackedTradingSignal::pending(signal));
        let signal_ref = SignalRef(entries.len() - 1);
        debug!("Tracking signal {}", signal_ref);
        signal_ref
    }

    pub async fn list(&self) -> Vec<TrackedTradingSignal> {
        self.entries.read().await.clone()
    }

    pub async fn get(&self, signal_ref: SignalRef) -> Option<TrackedTradingSignal> {
        self.entries.read().await.get(signal_ref.0).cloned()
    }

    /// Applies a status change and returns the updated entry. A rejected
    /// transition leaves the entry untouched.
    pub async fn update_status(
        &self,
        signal_ref: SignalRef,
        update: StatusUpdate,
    ) -> Result<TrackedTradingSignal, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(signal_ref.0)
            .ok_or(StoreError::UnknownSignal(signal_ref))?;

        let mut next = entry.clone();
        next.apply(update)?;
        *entry = next.clone();

        debug!(status = %next.status(), "Signal {} updated", signal_ref);
        Ok(next)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
