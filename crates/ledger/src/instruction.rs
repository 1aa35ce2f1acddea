//! Wire format of the signal program's instructions and of the account
//! record it writes.
//!
//! Layout is borsh: a `u8` variant tag, then fields in declaration order.
//! Strings are a `u32` LE byte length followed by UTF-8, integers are LE,
//! fixed arrays are raw bytes, booleans are a single `0`/`1` byte.

use borsh::{BorshDeserialize, BorshSerialize};
use common::models::{SIGNATURE_LEN, SignedTradingSignal};
use thiserror::Error;

/// Longest trading pair, in bytes, the signal account is sized for.
pub const MAX_TRADING_PAIR_LEN: usize = 32;

/// Bytes allocated for a signal account.
pub const SIGNAL_ACCOUNT_SPACE: usize = SignalRecord::MAX_LEN;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("trading pair is {len} bytes, at most {max} fit the signal account")]
    TradingPairTooLong { len: usize, max: usize },
    #[error("signature must be {expected} bytes, got {actual}")]
    SignatureLength { expected: usize, actual: usize },
    #[error("instruction data is empty")]
    Empty,
    #[error("unknown instruction variant {0}")]
    UnknownVariant(u8),
    #[error("malformed data: {0}")]
    Malformed(#[from] std::io::Error),
}

/// Instruction discriminators (first byte of instruction data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InstructionType {
    PushSignal = 0,
    ExecuteTrade = 1,
}

impl TryFrom<u8> for InstructionType {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::PushSignal),
            1 => Ok(Self::ExecuteTrade),
            other => Err(EncodingError::UnknownVariant(other)),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PushSignal {
    pub trading_pair: String,
    pub is_buy: bool,
    pub amount: u64,
    pub timestamp: u64,
    pub signature: [u8; SIGNATURE_LEN],
}

impl PushSignal {
    pub fn from_signed(signal: &SignedTradingSignal) -> Self {
        Self {
            trading_pair: signal.trading_pair().to_string(),
            is_buy: signal.is_buy(),
            amount: signal.amount(),
            timestamp: signal.timestamp(),
            signature: *signal.signature(),
        }
    }

    /// Builds the instruction from an untyped signature buffer.
    pub fn from_parts(
        trading_pair: impl Into<String>,
        is_buy: bool,
        amount: u64,
        timestamp: u64,
        signature: &[u8],
    ) -> Result<Self, EncodingError> {
        let signature: [u8; SIGNATURE_LEN] =
            signature
                .try_into()
                .map_err(|_| EncodingError::SignatureLength {
                    expected: SIGNATURE_LEN,
                    actual: signature.len(),
                })?;

        Ok(Self {
            trading_pair: trading_pair.into(),
            is_buy,
            amount,
            timestamp,
            signature,
        })
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum SignalInstruction {
    /// Accounts:
    /// 0. `[signer]` oracle
    /// 1. `[writable]` signal account
    PushSignal(PushSignal),
    /// Accounts:
    /// 0. `[signer]` trader
    /// 1. `[]` signal account
    ExecuteTrade { slippage_bps: u16 },
}

impl SignalInstruction {
    pub fn push_signal(signal: &SignedTradingSignal) -> Self {
        Self::PushSignal(PushSignal::from_signed(signal))
    }

    pub fn instruction_type(&self) -> InstructionType {
        match self {
            Self::PushSignal(_) => InstructionType::PushSignal,
            Self::ExecuteTrade { .. } => InstructionType::ExecuteTrade,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        if let Self::PushSignal(push) = self {
            check_trading_pair(&push.trading_pair)?;
        }
        Ok(borsh::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        let tag = *data.first().ok_or(EncodingError::Empty)?;
        InstructionType::try_from(tag)?;

        let instruction: Self = borsh::from_slice(data)?;
        if let Self::PushSignal(push) = &instruction {
            check_trading_pair(&push.trading_pair)?;
        }
        Ok(instruction)
    }
}

/// The record the program stores in a signal account.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignalRecord {
    pub oracle: [u8; 32],
    pub trading_pair: String,
    pub is_buy: bool,
    pub amount: u64,
    pub timestamp: u64,
    pub signature: [u8; SIGNATURE_LEN],
    pub executed: bool,
}

impl SignalRecord {
    pub const MAX_LEN: usize = 32 + 4 + MAX_TRADING_PAIR_LEN + 1 + 8 + 8 + SIGNATURE_LEN + 1;

    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        check_trading_pair(&self.trading_pair)?;
        Ok(borsh::to_vec(self)?)
    }

    /// Reads a record from raw account data. Zero padding after the
    /// record is ignored.
    pub fn from_account_data(data: &[u8]) -> Result<Self, EncodingError> {
        let mut cursor = data;
        let record = Self::deserialize(&mut cursor)?;
        check_trading_pair(&record.trading_pair)?;
        Ok(record)
    }
}

pub fn check_trading_pair(pair: &str) -> Result<(), EncodingError> {
    if pair.len() > MAX_TRADING_PAIR_LEN {
        return Err(EncodingError::TradingPairTooLong {
            len: pair.len(),
            max: MAX_TRADING_PAIR_LEN,
        });
    }
    Ok(())
}
