use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{info, warn};

use crate::config::Settings;
use crate::signer::SigningError;

const KEYPAIR_LEN: usize = 64;

/// The process-wide oracle keypair. Signs every signal and pays for
/// every submitted transaction.
pub struct OracleIdentity {
    keypair: Keypair,
}

impl OracleIdentity {
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn generate() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    /// Decodes a base64 64-byte `secret || public` keypair.
    pub fn from_base64(encoded: &str) -> Result<Self, SigningError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        if bytes.len() != KEYPAIR_LEN {
            return Err(SigningError::MalformedKey(format!(
                "expected {} bytes, got {}",
                KEYPAIR_LEN,
                bytes.len()
            )));
        }
        let keypair =
            Keypair::from_bytes(&bytes).map_err(|e| SigningError::MalformedKey(e.to_string()))?;
        Ok(Self { keypair })
    }

    /// Loads the configured key, or generates a throwaway one outside production.
    pub fn load(settings: &Settings) -> Result<Self, SigningError> {
        match &settings.oracle_secret {
            Some(secret) => {
                let identity = Self::from_base64(secret.expose())?;
                info!("Loaded oracle identity {}", identity.pubkey());
                Ok(identity)
            }
            None if settings.environment.is_production() => Err(SigningError::MissingKey),
            None => {
                let identity = Self::generate();
                warn!(
                    oracle = %identity.pubkey(),
                    "Using a generated keypair for development. Do not use in production."
                );
                Ok(identity)
            }
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for OracleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleIdentity")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
