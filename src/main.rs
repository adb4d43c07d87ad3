use std::sync::Arc;

use amm_rate_monitor::{
    arbitrage::rate_engine::{RateEngine, RateEngineBuilder},
    sync::synchronizer::{ReserveSynchronizer, ReserveSynchronizerBuilder},
    types::{BotError, Result},
    utils::{config::Config, logger::init},
};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::load()?;
    init(&config.logging.level);
    info!("Starting AMM rate monitor for {}", config.tokens);

    config.validate()?;

    let synchronizer = Arc::new(
        ReserveSynchronizerBuilder::new()
            .with_rpc_endpoint(config.network_config().rpc_url.clone())
            .with_ws_url(config.network_config().ws_url.clone())
            .with_pools(config.network_config().pools.clone())
            .with_config(config.sync_config().clone())
            .build()?,
    );

    info!("Performing initial reserve synchronization...");
    let published = synchronizer.initialize().await?;
    info!("Initial synchronization completed: {} pools", published);

    let engine = Arc::new(
        RateEngineBuilder::from_config(&config)
            .with_source(synchronizer.store())
            .build()?,
    );

    run_until_shutdown(synchronizer, engine).await
}

/// Run feed and engine until ctrl-c or SIGTERM
async fn run_until_shutdown(synchronizer: Arc<ReserveSynchronizer>, engine: Arc<RateEngine>) -> Result<()> {
    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let sync_task = {
        let synchronizer = synchronizer.clone();
        let shutdown = shutdown_receiver.clone();
        tokio::spawn(async move { synchronizer.run(shutdown).await })
    };
    let engine_task = {
        let engine = engine.clone();
        let shutdown = shutdown_receiver.clone();
        tokio::spawn(async move { engine.run(shutdown).await })
    };

    wait_for_signal().await?;
    let _ = shutdown_sender.send(true);

    for (name, task) in [("synchronizer", sync_task), ("engine", engine_task)] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} stopped with error: {}", name, e),
            Err(e) => error!("{} task panicked: {}", name, e),
        }
    }

    info!("AMM rate monitor shutdown complete");
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(BotError::Io)?;

        tokio::select! {
            result = ctrl_c => {
                result?;
                info!("Received Ctrl-C, shutting down gracefully...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        info!("Received Ctrl-C, shutting down gracefully...");
    }

    Ok(())
}
