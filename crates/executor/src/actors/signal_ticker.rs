use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

use crate::services::execution_service::ExecutionService;

/// Runs one execution cycle per interval. The first cycle fires one full
/// interval after start.
pub struct SignalTicker {
    id: Uuid,
    service: Arc<ExecutionService>,
    interval: Duration,
}

impl SignalTicker {
    pub fn new(service: Arc<ExecutionService>, interval: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            interval,
        }
    }
}

struct HeartbeatGuard(JoinHandle<()>);

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl Actor for SignalTicker {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::SignalTicker
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let _heartbeat = HeartbeatGuard(self.spawn_heartbeat(supervisor_tx.clone()));

        info!("Starting signal ticker, one cycle every {:?}", self.interval);

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match self.service.execute_cycle().await {
                Ok(entry) => {
                    info!(
                        status = %entry.status(),
                        pair = entry.signal().trading_pair(),
                        "Periodic signal processed"
                    );
                }
                Err(e) => {
                    warn!("Periodic signal generation failed: {}", e);
                    supervisor_tx
                        .send(ControlMessage::Error(
                            self.id,
                            format!("{:?}: {}", self.name(), e),
                        ))
                        .await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::GeneratorSettings;
    use common::identity::OracleIdentity;
    use common::models::{SignalStatus, SignedTradingSignal};
    use common::signer::SignalSigner;
    use ledger::{SignalSubmitter, SubmitError};
    use storage::TrackingStore;
    use strategy::SignalGenerator;

    struct AlwaysConfirms;

    #[async_trait]
    impl SignalSubmitter for AlwaysConfirms {
        async fn submit(&self, _signal: &SignedTradingSignal) -> Result<String, SubmitError> {
            Ok("tick".to_string())
        }
    }

    fn service(pairs: Vec<String>) -> Arc<ExecutionService> {
        let identity = Arc::new(OracleIdentity::generate());
        let settings = GeneratorSettings {
            trading_pairs: pairs,
            ..GeneratorSettings::default()
        };
        let generator = SignalGenerator::new(&settings, identity.pubkey()).unwrap();
        Arc::new(ExecutionService::new(
            generator,
            SignalSigner::new(identity),
            Arc::new(AlwaysConfirms),
            TrackingStore::new(),
        ))
    }

    #[tokio::test]
    async fn test_ticks_after_first_interval() {
        let service = service(GeneratorSettings::default().trading_pairs);
        let mut ticker = SignalTicker::new(service.clone(), Duration::from_millis(100));
        let (tx, mut rx) = mpsc::channel(64);

        let handle = tokio::spawn(async move { ticker.run(tx).await });

        time::sleep(Duration::from_millis(50)).await;
        assert!(service.store().is_empty().await);

        time::sleep(Duration::from_millis(300)).await;
        handle.abort();

        let entries = service.store().list().await;
        assert!(entries.len() >= 2);
        assert!(entries.iter().all(|e| e.status() == SignalStatus::Sent));
        assert!(matches!(rx.try_recv(), Ok(ControlMessage::Heartbeat(_))));
    }

    #[tokio::test]
    async fn test_cycle_errors_reach_supervisor() {
        let service = service(vec!["P".repeat(48)]);
        let mut ticker = SignalTicker::new(service.clone(), Duration::from_millis(20));
        let id = ticker.id();
        let (tx, mut rx) = mpsc::channel(64);

        let handle = tokio::spawn(async move { ticker.run(tx).await });

        let reported = time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Some(ControlMessage::Error(from, msg)) => break (from, msg),
                    Some(_) => continue,
                    None => panic!("channel closed"),
                }
            }
        })
        .await
        .unwrap();
        handle.abort();

        assert_eq!(reported.0, id);
        assert!(reported.1.contains("SignalTicker"));
        assert!(service.store().is_empty().await);
    }
}
