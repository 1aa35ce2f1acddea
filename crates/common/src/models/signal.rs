use std::fmt;

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

pub const SIGNATURE_LEN: usize = 64;

const UNKNOWN_SUBMISSION_ERROR: &str = "unknown submission error";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("trading pair must not be empty")]
    EmptyTradingPair,
    #[error("trading pair is {0} bytes, longer than a u32 length prefix allows")]
    TradingPairUnrepresentable(usize),
    #[error("amount must be greater than zero")]
    ZeroAmount,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move signal from {from} to {to}")]
    Illegal { from: SignalStatus, to: SignalStatus },
    #[error("a SENT signal needs a transaction id")]
    MissingTransactionId,
}

/// An unsigned signal as produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignal {
    trading_pair: String,
    is_buy: bool,
    amount: u64,
    timestamp: u64,
    #[serde(serialize_with = "serialize_pubkey")]
    oracle: Pubkey,
}

impl TradingSignal {
    pub fn new(
        trading_pair: impl Into<String>,
        is_buy: bool,
        amount: u64,
        timestamp: u64,
        oracle: Pubkey,
    ) -> Result<Self, ValidationError> {
        let trading_pair = trading_pair.into();

        if trading_pair.is_empty() {
            return Err(ValidationError::EmptyTradingPair);
        }
        if u32::try_from(trading_pair.len()).is_err() {
            return Err(ValidationError::TradingPairUnrepresentable(
                trading_pair.len(),
            ));
        }
        if amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }

        Ok(Self {
            trading_pair,
            is_buy,
            amount,
            timestamp,
            oracle,
        })
    }

    pub fn trading_pair(&self) -> &str {
        &self.trading_pair
    }

    pub fn is_buy(&self) -> bool {
        self.is_buy
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn oracle(&self) -> &Pubkey {
        &self.oracle
    }

    /// Bytes the oracle signs: `u32 LE len | pair | is_buy | amount LE | timestamp LE`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let pair = self.trading_pair.as_bytes();
        let mut buf = Vec::with_capacity(4 + pair.len() + 1 + 8 + 8);
        // length fits, checked in `new`
        buf.extend_from_slice(&(pair.len() as u32).to_le_bytes());
        buf.extend_from_slice(pair);
        buf.push(self.is_buy as u8);
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf
    }
}

/// A signal carrying the oracle's claimed signature. Use
/// `signer::verify` before trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTradingSignal {
    #[serde(flatten)]
    signal: TradingSignal,
    #[serde(serialize_with = "serialize_signature")]
    signature: [u8; SIGNATURE_LEN],
}

impl SignedTradingSignal {
    pub fn new(signal: TradingSignal, signature: [u8; SIGNATURE_LEN]) -> Self {
        Self { signal, signature }
    }

    pub fn signal(&self) -> &TradingSignal {
        &self.signal
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    pub fn trading_pair(&self) -> &str {
        self.signal.trading_pair()
    }

    pub fn is_buy(&self) -> bool {
        self.signal.is_buy()
    }

    pub fn amount(&self) -> u64 {
        self.signal.amount()
    }

    pub fn timestamp(&self) -> u64 {
        self.signal.timestamp()
    }

    pub fn oracle(&self) -> &Pubkey {
        self.signal.oracle()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Pending,
    Sent,
    Executed,
    Failed,
}

impl SignalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Failed)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Executed => "EXECUTED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Sent { transaction_id: String },
    Failed { error_message: String },
    Executed,
}

impl StatusUpdate {
    pub fn target(&self) -> SignalStatus {
        match self {
            Self::Sent { .. } => SignalStatus::Sent,
            Self::Failed { .. } => SignalStatus::Failed,
            Self::Executed => SignalStatus::Executed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTradingSignal {
    #[serde(flatten)]
    signal: SignedTradingSignal,
    status: SignalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl TrackedTradingSignal {
    pub fn pending(signal: SignedTradingSignal) -> Self {
        Self {
            signal,
            status: SignalStatus::Pending,
            transaction_id: None,
            error_message: None,
        }
    }

    pub fn signal(&self) -> &SignedTradingSignal {
        &self.signal
    }

    pub fn status(&self) -> SignalStatus {
        self.status
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn apply(&mut self, update: StatusUpdate) -> Result<(), TransitionError> {
        match (self.status, update) {
            (SignalStatus::Pending, StatusUpdate::Sent { transaction_id }) => {
                if transaction_id.is_empty() {
                    return Err(TransitionError::MissingTransactionId);
                }
                self.status = SignalStatus::Sent;
                self.transaction_id = Some(transaction_id);
            }
            (SignalStatus::Pending, StatusUpdate::Failed { error_message }) => {
                let error_message = if error_message.trim().is_empty() {
                    UNKNOWN_SUBMISSION_ERROR.to_string()
                } else {
                    error_message
                };
                self.status = SignalStatus::Failed;
                self.error_message = Some(error_message);
            }
            (SignalStatus::Sent, StatusUpdate::Executed) => {
                self.status = SignalStatus::Executed;
            }
            (from, update) => {
                return Err(TransitionError::Illegal {
                    from,
                    to: update.target(),
                });
            }
        }
        Ok(())
    }
}

fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

fn serialize_signature<S: serde::Serializer>(
    bytes: &[u8; SIGNATURE_LEN],
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(&solana_sdk::signature::Signature::from(*bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signal() -> TradingSignal {
        TradingSignal::new("SOL/USDC", true, 1_000_000_000, 1_700_000_000_000, Pubkey::new_unique())
            .unwrap()
    }

    #[test]
    fn test_constructor_rejects_invalid_fields() {
        let oracle = Pubkey::new_unique();
        assert_eq!(
            TradingSignal::new("", true, 1, 0, oracle),
            Err(ValidationError::EmptyTradingPair)
        );
        assert_eq!(
            TradingSignal::new("SOL/USDC", false, 0, 0, oracle),
            Err(ValidationError::ZeroAmount)
        );
    }

    #[test]
    fn test_canonical_bytes_layout() {
        let signal = sample_signal();
        let bytes = signal.canonical_bytes();

        assert_eq!(bytes.len(), 4 + 8 + 1 + 8 + 8);
        assert_eq!(&bytes[..4], &[8, 0, 0, 0]);
        assert_eq!(&bytes[4..12], b"SOL/USDC");
        assert_eq!(bytes[12], 1);
        assert_eq!(&bytes[13..21], &1_000_000_000u64.to_le_bytes());
        assert_eq!(&bytes[21..29], &1_700_000_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_pending_to_sent() {
        let mut tracked = TrackedTradingSignal::pending(SignedTradingSignal::new(sample_signal(), [7; 64]));
        tracked
            .apply(StatusUpdate::Sent {
                transaction_id: "5tx".to_string(),
            })
            .unwrap();

        assert_eq!(tracked.status(), SignalStatus::Sent);
        assert_eq!(tracked.transaction_id(), Some("5tx"));
        assert_eq!(tracked.error_message(), None);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut tracked = TrackedTradingSignal::pending(SignedTradingSignal::new(sample_signal(), [7; 64]));
        tracked
            .apply(StatusUpdate::Failed {
                error_message: "rpc down".to_string(),
            })
            .unwrap();

        let err = tracked
            .apply(StatusUpdate::Sent {
                transaction_id: "late".to_string(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Illegal {
                from: SignalStatus::Failed,
                to: SignalStatus::Sent
            }
        );
        assert!(tracked.status().is_terminal());
        assert_eq!(tracked.error_message(), Some("rpc down"));
    }

    #[test]
    fn test_empty_failure_message_is_replaced() {
        let mut tracked = TrackedTradingSignal::pending(SignedTradingSignal::new(sample_signal(), [0; 64]));
        tracked
            .apply(StatusUpdate::Failed {
                error_message: "  ".to_string(),
            })
            .unwrap();
        assert_eq!(tracked.error_message(), Some(UNKNOWN_SUBMISSION_ERROR));
    }

    #[test]
    fn test_executed_only_after_sent() {
        let mut tracked = TrackedTradingSignal::pending(SignedTradingSignal::new(sample_signal(), [0; 64]));
        assert!(tracked.apply(StatusUpdate::Executed).is_err());

        tracked
            .apply(StatusUpdate::Sent {
                transaction_id: "abc".to_string(),
            })
            .unwrap();
        tracked.apply(StatusUpdate::Executed).unwrap();
        assert_eq!(tracked.status(), SignalStatus::Executed);
        assert!(tracked
            .apply(StatusUpdate::Failed {
                error_message: "x".to_string()
            })
            .is_err());
    }

    #[test]
    fn test_json_shape() {
        let signal = sample_signal();
        let oracle = signal.oracle().to_string();
        let tracked = TrackedTradingSignal::pending(SignedTradingSignal::new(signal, [1; 64]));
        let json = serde_json::to_value(&tracked).unwrap();

        assert_eq!(json["tradingPair"], "SOL/USDC");
        assert_eq!(json["isBuy"], true);
        assert_eq!(json["amount"], 1_000_000_000u64);
        assert_eq!(json["oracle"], oracle.as_str());
        assert_eq!(json["status"], "PENDING");
        assert!(json["signature"].is_string());
        assert!(json.get("transactionId").is_none());
        assert!(json.get("errorMessage").is_none());
    }
}
