use dotenvy::dotenv;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use common::actors::ActorType;
use common::config::Settings;
use common::identity::OracleIdentity;
use common::logger;
use common::signer::SignalSigner;
use ledger::instruction::check_trading_pair;
use ledger::{LedgerSubmitter, RpcLedger};
use storage::TrackingStore;
use strategy::SignalGenerator;

use crate::actors::signal_ticker::SignalTicker;
use crate::actors::supervisor::Supervisor;
use crate::services::execution_service::ExecutionService;
use crate::services::http_service;

mod actors;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    debug!("System starting up...");

    let settings = Settings::from_env()?;
    for pair in &settings.generator.trading_pairs {
        check_trading_pair(pair)?;
    }

    let identity = Arc::new(OracleIdentity::load(&settings)?);
    info!("Oracle public key: {}", identity.pubkey());
    info!(
        rpc = %settings.rpc_url,
        program = %settings.program_id,
        "Ledger target configured"
    );

    let submitter = LedgerSubmitter::new(
        RpcLedger::new(&settings.rpc_url),
        settings.program_id,
        identity.clone(),
    )
    .with_confirm_timeout(settings.confirm_timeout);

    let generator = SignalGenerator::new(&settings.generator, identity.pubkey())?;
    let service = Arc::new(ExecutionService::new(
        generator,
        SignalSigner::new(identity),
        Arc::new(submitter),
        TrackingStore::new(),
    ));

    let mut supervisor = Supervisor::new();
    if settings.auto_generate {
        let service_for_ticker = service.clone();
        let interval = settings.signal_interval;
        supervisor.register_actor(
            ActorType::SignalTicker,
            Box::new(move || Box::new(SignalTicker::new(service_for_ticker.clone(), interval))),
        );
        info!("Automatic signal generation every {:?}", interval);
    } else {
        info!("Automatic signal generation disabled");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor_handle = tokio::spawn(supervisor.start(shutdown_rx));

    let served = http_service::serve(service, &settings.host, settings.port).await;

    info!("HTTP server stopped, shutting down");
    let _ = shutdown_tx.send(true);
    supervisor_handle.await?;

    served?;
    Ok(())
}
