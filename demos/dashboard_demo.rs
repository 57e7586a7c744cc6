use nutrilens::{
    MemoryStore, MotionSource, NutrilensConfig, NutrilensOrchestrator, ScanHandoff,
    SimulatedMotionSource, TestPatternCamera,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting dashboard demo");

    // Point at an unroutable port: the demo runs fully offline and the
    // fallback paths are part of what it shows
    let mut config = NutrilensConfig::default();
    config.api.base_url = "http://127.0.0.1:9".to_string();

    let motion: Arc<dyn MotionSource> =
        Arc::new(SimulatedMotionSource::new(config.motion.sample_rate_hz));
    let camera = Box::new(TestPatternCamera::new(
        config.scanner.frame_width,
        config.scanner.frame_height,
    ));
    let store = Arc::new(MemoryStore::new());

    let mut orchestrator =
        NutrilensOrchestrator::new(config, motion, camera, store, ScanHandoff::none()).await?;

    orchestrator.initialize().await?;
    orchestrator.start().await?;

    // Let the simulated walk accumulate
    sleep(Duration::from_secs(2)).await;

    let snapshot = orchestrator.ledger_snapshot().await;
    info!(
        "After 2s of walking: {} steps, {:.0} kcal burned, {:.0} kcal remaining",
        orchestrator.steps().await,
        snapshot.burned,
        snapshot.remaining()
    );

    // Two glasses of water
    orchestrator.drink_water().await;
    let snapshot = orchestrator.drink_water().await;
    info!(
        "Water: {:.0} ml ({:.0}% of target, {:?})",
        snapshot.water,
        orchestrator.water_percent().await,
        orchestrator.hydration().await
    );

    // Health alerts came from the offline sample
    for alert in orchestrator.alerts().alerts().await {
        info!("Alert [{:?}]: {}", alert.severity, alert.message);
    }

    // Walk the scan workflow; without a live service the analysis fails
    // and lands back in preview with the error inline
    let scanner = orchestrator.scanner().clone();
    scanner.open().await?;
    scanner.capture().await?;
    info!("Captured still, phase: {:?}", scanner.phase().await);

    scanner.analyze().await?;
    info!(
        "Analysis outcome: phase {:?}, error {:?}",
        scanner.phase().await,
        scanner.scan_error().await
    );
    scanner.close().await;

    let exit_code = orchestrator.shutdown().await?;
    info!("Demo finished with exit code {}", exit_code);

    Ok(())
}
