use common::config::{ConfigError, GeneratorSettings};
use common::models::{TradingSignal, ValidationError};
use rand::Rng;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Produces random signals over a fixed pair set.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    settings: GeneratorSettings,
    oracle: Pubkey,
}

impl SignalGenerator {
    pub fn new(settings: &GeneratorSettings, oracle: Pubkey) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings: settings.clone(),
            oracle,
        })
    }

    pub fn trading_pairs(&self) -> &[String] {
        &self.settings.trading_pairs
    }

    pub fn generate(&self) -> Result<TradingSignal, ValidationError> {
        let now = chrono::Utc::now().timestamp_millis();
        let timestamp = u64::try_from(now).unwrap_or_default();
        self.generate_with(&mut rand::thread_rng(), timestamp)
    }

    fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        timestamp: u64,
    ) -> Result<TradingSignal, ValidationError> {
        let pairs = &self.settings.trading_pairs;
        let pair = &pairs[rng.gen_range(0..pairs.len())];
        let is_buy = rng.gen_bool(0.5);
        let units = rng.gen_range(self.settings.min_units..self.settings.max_units);
        // validate() rules out overflow for any unit below max_units
        let amount = units * self.settings.unit_scale;

        debug!(pair = %pair, is_buy, amount, "generated signal");
        TradingSignal::new(pair.as_str(), is_buy, amount, timestamp, self.oracle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn generator(settings: GeneratorSettings) -> SignalGenerator {
        SignalGenerator::new(&settings, Pubkey::new_unique()).unwrap()
    }

    #[test]
    fn test_amount_and_pair_stay_in_bounds() {
        let settings = GeneratorSettings::default();
        let generator = generator(settings.clone());
        let mut rng = StdRng::seed_from_u64(7);

        let low = settings.min_units * settings.unit_scale;
        let high = (settings.max_units - 1) * settings.unit_scale;

        for _ in 0..2_000 {
            let signal = generator.generate_with(&mut rng, 1).unwrap();
            assert!(signal.amount() >= low && signal.amount() <= high);
            assert_eq!(signal.amount() % settings.unit_scale, 0);
            assert!(settings.trading_pairs.iter().any(|p| p == signal.trading_pair()));
        }
    }

    #[test]
    fn test_covers_every_pair_and_direction() {
        let generator = generator(GeneratorSettings::default());
        let mut rng = StdRng::seed_from_u64(42);

        let mut pairs = HashSet::new();
        let mut directions = HashSet::new();
        for _ in 0..500 {
            let signal = generator.generate_with(&mut rng, 1).unwrap();
            pairs.insert(signal.trading_pair().to_string());
            directions.insert(signal.is_buy());
        }

        assert_eq!(pairs.len(), 3);
        assert_eq!(directions.len(), 2);
    }

    #[test]
    fn test_signal_carries_oracle_and_current_time() {
        let oracle = Pubkey::new_unique();
        let generator = SignalGenerator::new(&GeneratorSettings::default(), oracle).unwrap();

        let before = chrono::Utc::now().timestamp_millis() as u64;
        let signal = generator.generate().unwrap();
        let after = chrono::Utc::now().timestamp_millis() as u64;

        assert_eq!(signal.oracle(), &oracle);
        assert!(signal.timestamp() >= before && signal.timestamp() <= after);
    }

    #[test]
    fn test_single_unit_range() {
        let generator = generator(GeneratorSettings {
            trading_pairs: vec!["JUP/USDC".to_string()],
            min_units: 5,
            max_units: 6,
            unit_scale: 3,
        });
        let signal = generator.generate_with(&mut StdRng::seed_from_u64(1), 9).unwrap();

        assert_eq!(signal.trading_pair(), "JUP/USDC");
        assert_eq!(signal.amount(), 15);
        assert_eq!(signal.timestamp(), 9);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let settings = GeneratorSettings {
            trading_pairs: Vec::new(),
            ..GeneratorSettings::default()
        };
        assert!(SignalGenerator::new(&settings, Pubkey::new_unique()).is_err());
    }
}
