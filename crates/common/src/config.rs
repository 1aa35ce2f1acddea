use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
const DEFAULT_PROGRAM_ID: &str = "11111111111111111111111111111111";
const DEFAULT_PAIRS: &str = "SOL/USDC,BTC/USDC,ETH/USDC";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            key,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Base64 secret key material. Never printed.
#[derive(Clone)]
pub struct OracleSecret(String);

impl OracleSecret {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OracleSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OracleSecret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub trading_pairs: Vec<String>,
    /// Inclusive lower bound, in units.
    pub min_units: u64,
    /// Exclusive upper bound, in units.
    pub max_units: u64,
    /// Base units per unit.
    pub unit_scale: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            trading_pairs: split_pairs(DEFAULT_PAIRS),
            min_units: 10,
            max_units: 1000,
            unit_scale: 10_000_000,
        }
    }
}

impl GeneratorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trading_pairs.is_empty() {
            return Err(ConfigError::invalid("SIGNAL_PAIRS", "no trading pairs configured"));
        }
        if self.trading_pairs.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::invalid("SIGNAL_PAIRS", "empty trading pair"));
        }
        if self.min_units == 0 {
            return Err(ConfigError::invalid("SIGNAL_MIN_UNITS", "must be positive"));
        }
        if self.min_units >= self.max_units {
            return Err(ConfigError::invalid(
                "SIGNAL_MAX_UNITS",
                format!("must exceed SIGNAL_MIN_UNITS ({})", self.min_units),
            ));
        }
        if self.unit_scale == 0 {
            return Err(ConfigError::invalid("SIGNAL_UNIT_SCALE", "must be positive"));
        }
        if self.max_units.checked_mul(self.unit_scale).is_none() {
            return Err(ConfigError::invalid(
                "SIGNAL_UNIT_SCALE",
                "max amount overflows u64",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub oracle_secret: Option<OracleSecret>,
    pub host: String,
    pub port: u16,
    pub auto_generate: bool,
    pub signal_interval: Duration,
    pub confirm_timeout: Duration,
    pub generator: GeneratorSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        };

        let rpc_url = lookup("SOLANA_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let program_id = lookup("PROGRAM_ID").unwrap_or_else(|| DEFAULT_PROGRAM_ID.to_string());
        let program_id = Pubkey::from_str(program_id.trim())
            .map_err(|e| ConfigError::invalid("PROGRAM_ID", e))?;

        let oracle_secret = lookup("ORACLE_PRIVATE_KEY")
            .filter(|v| !v.trim().is_empty())
            .map(OracleSecret::new);

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3000u16)?;

        let auto_generate = lookup("AUTO_GENERATE_SIGNALS")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let signal_interval = millis_or(&lookup, "SIGNAL_INTERVAL_MS", 60_000)?;
        let confirm_timeout = millis_or(&lookup, "CONFIRM_TIMEOUT_MS", 60_000)?;

        let defaults = GeneratorSettings::default();
        let generator = GeneratorSettings {
            trading_pairs: lookup("SIGNAL_PAIRS")
                .map(|v| split_pairs(&v))
                .unwrap_or(defaults.trading_pairs),
            min_units: parse_or(&lookup, "SIGNAL_MIN_UNITS", defaults.min_units)?,
            max_units: parse_or(&lookup, "SIGNAL_MAX_UNITS", defaults.max_units)?,
            unit_scale: parse_or(&lookup, "SIGNAL_UNIT_SCALE", defaults.unit_scale)?,
        };
        generator.validate()?;

        Ok(Self {
            environment,
            rpc_url,
            program_id,
            oracle_secret,
            host,
            port,
            auto_generate,
            signal_interval,
            confirm_timeout,
            generator,
        })
    }
}

fn split_pairs(raw: &str) -> Vec<String> {
    raw.split(',').map(|p| p.trim().to_string()).collect()
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::invalid(key, e)),
        None => Ok(default),
    }
}

fn millis_or<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let ms: u64 = parse_or(lookup, key, default)?;
    if ms == 0 {
        return Err(ConfigError::invalid(key, "must be positive"));
    }
    Ok(Duration::from_millis(ms))
}
