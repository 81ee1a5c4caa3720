mod sim;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{EngineCommand, ProcessConfig, Settings, StrategyKind};
use engine::Engine;
use paper::PaperGateway;
use strategy::{GammaSnapStrategy, Strategy, StraddleStrategy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let process_cfg = ProcessConfig::from_env();
    let settings = Settings::load(&process_cfg.settings_path)?;
    settings.validate().map_err(|e| anyhow::anyhow!("invalid settings: {e}"))?;
    // Write the record back so a fresh install gets a settings file to edit
    settings.save(&process_cfg.settings_path)?;
    info!(strategy = ?settings.strategy, "GammaSnap starting in paper mode");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let gateway = Arc::new(PaperGateway::new(event_tx.clone()));
    gateway.set_connected(true, true);

    let boxed: Box<dyn Strategy> = match settings.strategy {
        StrategyKind::GammaSnap => Box::new(GammaSnapStrategy::new(settings.clone())),
        StrategyKind::Straddle => Box::new(StraddleStrategy::new(settings.clone())),
    };

    let (engine, handle) = Engine::new(
        event_rx,
        gateway.clone(),
        boxed,
        Duration::from_secs(process_cfg.cycle_secs),
    );
    let engine_task = tokio::spawn(engine.run());
    handle.send(EngineCommand::Enable).await;

    // Synthetic market data so the paper mode is observable end to end
    tokio::spawn(sim::SimFeed::new(event_tx).run());

    // Periodic status line, the console stand-in for the GUI status var
    let status_handle = handle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            ticker.tick().await;
            let snapshot = status_handle.snapshot().await;
            info!(
                status = %snapshot.status,
                index = snapshot.index_price,
                vix = snapshot.vol_index,
                trades = snapshot.history.len(),
                "Strategy status"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    handle.send(EngineCommand::Shutdown).await;
    engine_task.await?;
    Ok(())
}
