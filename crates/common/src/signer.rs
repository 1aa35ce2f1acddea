use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Signature, Signer},
};
use thiserror::Error;
use tracing::debug;

use crate::identity::OracleIdentity;
use crate::models::{SIGNATURE_LEN, SignedTradingSignal, TradingSignal};

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("ORACLE_PRIVATE_KEY must be set when APP_ENV=production")]
    MissingKey,
    #[error("oracle key is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("oracle key is malformed: {0}")]
    MalformedKey(String),
    #[error("signal is attributed to oracle {claimed}, but this signer is {actual}")]
    OracleMismatch { claimed: Pubkey, actual: Pubkey },
    #[error("signature does not verify against oracle {0}")]
    InvalidSignature(Pubkey),
}

/// Ed25519 signer bound to the process oracle identity.
#[derive(Debug, Clone)]
pub struct SignalSigner {
    identity: Arc<OracleIdentity>,
}

impl SignalSigner {
    pub fn new(identity: Arc<OracleIdentity>) -> Self {
        Self { identity }
    }

    pub fn oracle(&self) -> Pubkey {
        self.identity.pubkey()
    }

    pub fn sign(&self, signal: TradingSignal) -> Result<SignedTradingSignal, SigningError> {
        let actual = self.identity.pubkey();
        if *signal.oracle() != actual {
            return Err(SigningError::OracleMismatch {
                claimed: *signal.oracle(),
                actual,
            });
        }

        let signature = self
            .identity
            .keypair()
            .sign_message(&signal.canonical_bytes());
        let bytes: [u8; SIGNATURE_LEN] = signature
            .as_ref()
            .try_into()
            .map_err(|_| SigningError::MalformedKey("signature is not 64 bytes".to_string()))?;

        debug!(pair = signal.trading_pair(), "signed trading signal");
        Ok(SignedTradingSignal::new(signal, bytes))
    }
}

/// Checks the signature against the declared oracle and the canonical
/// bytes of the unsigned fields.
pub fn verify(signed: &SignedTradingSignal) -> Result<(), SigningError> {
    let oracle = *signed.oracle();
    let message = signed.signal().canonical_bytes();

    if Signature::from(*signed.signature()).verify(oracle.as_ref(), &message) {
        Ok(())
    } else {
        Err(SigningError::InvalidSignature(oracle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> SignalSigner {
        SignalSigner::new(Arc::new(OracleIdentity::generate()))
    }

    fn signal_for(oracle: Pubkey, pair: &str, is_buy: bool, amount: u64, ts: u64) -> TradingSignal {
        TradingSignal::new(pair, is_buy, amount, ts, oracle).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let signed = signer
            .sign(signal_for(signer.oracle(), "SOL/USDC", true, 1_000_000_000, 1_700_000_000_000))
            .unwrap();

        assert!(verify(&signed).is_ok());
        assert_eq!(signed.signature().len(), 64);
        assert_ne!(signed.signature(), &[1u8; 64]);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = signer();
        let signal = signal_for(signer.oracle(), "ETH/USDC", false, 42, 7);

        let a = signer.sign(signal.clone()).unwrap();
        let b = signer.sign(signal).unwrap();
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_tampered_fields_fail_verification() {
        let signer = signer();
        let oracle = signer.oracle();
        let original = signer
            .sign(signal_for(oracle, "SOL/USDC", true, 500, 1_000))
            .unwrap();
        let sig = *original.signature();

        let tampered = [
            signal_for(oracle, "BTC/USDC", true, 500, 1_000),
            signal_for(oracle, "SOL/USDC", false, 500, 1_000),
            signal_for(oracle, "SOL/USDC", true, 501, 1_000),
            signal_for(oracle, "SOL/USDC", true, 500, 1_001),
            signal_for(Pubkey::new_unique(), "SOL/USDC", true, 500, 1_000),
        ];

        for signal in tampered {
            let forged = SignedTradingSignal::new(signal, sig);
            assert!(
                matches!(verify(&forged), Err(SigningError::InvalidSignature(_))),
                "tampered signal verified: {:?}",
                forged
            );
        }
    }

    #[test]
    fn test_refuses_foreign_oracle() {
        let signer = signer();
        let foreign = Pubkey::new_unique();
        let err = signer
            .sign(signal_for(foreign, "SOL/USDC", true, 1, 1))
            .unwrap_err();

        assert!(matches!(err, SigningError::OracleMismatch { claimed, .. } if claimed == foreign));
    }
}
