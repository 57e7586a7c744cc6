use super::{ComponentState, NutrilensOrchestrator};
use crate::error::{NutrilensError, Result};
use crate::motion::DemoStepDriver;
use tracing::{error, info};

impl NutrilensOrchestrator {
    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing NutriLens system components");

        // Set initial component states
        let mut states = self.component_states.lock().await;
        states.insert("motion".to_string(), ComponentState::Stopped);
        states.insert("scanner".to_string(), ComponentState::Stopped);
        states.insert("advice".to_string(), ComponentState::Stopped);
        states.insert("alerts".to_string(), ComponentState::Stopped);

        // Only register the demo driver when no real sensor is available
        if !self.tracker.is_supported() {
            states.insert("demo".to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start all system components
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting NutriLens system");

        // Start step tracking first so burn totals flow before anything renders
        self.set_component_state("motion", ComponentState::Starting)
            .await;

        self.tracker.start().await.map_err(|e| {
            error!("Failed to start step tracker: {}", e);
            e
        })?;

        self.set_component_state("motion", ComponentState::Running)
            .await;
        info!("Step tracker started successfully");

        // Without a sensor, synthesize a walking cadence so the dashboard moves
        if !self.tracker.is_supported() {
            self.set_component_state("demo", ComponentState::Starting)
                .await;

            let driver = DemoStepDriver::new(
                self.tracker.clone(),
                self.config.motion.demo_step_min,
                self.config.motion.demo_step_max,
            );
            driver.start().await;
            self.demo_driver = Some(driver);

            self.set_component_state("demo", ComponentState::Running)
                .await;
            info!("Demo step driver started");
        }

        // Start the advice requester on the ledger snapshot feed
        self.set_component_state("advice", ComponentState::Starting)
            .await;

        let snapshots = self.ledger_snapshots.take().ok_or_else(|| {
            NutrilensError::component("advice", "ledger snapshot channel already taken")
        })?;

        self.advice.start(snapshots).await.map_err(|e| {
            error!("Failed to start advice requester: {}", e);
            e
        })?;

        self.set_component_state("advice", ComponentState::Running)
            .await;
        info!("Advice requester started successfully");

        // Load health alerts, falling back to the offline sample
        self.set_component_state("alerts", ComponentState::Starting)
            .await;

        self.refresh_alerts_with_fallback().await;

        self.set_component_state("alerts", ComponentState::Running)
            .await;
        info!("Alert center started successfully");

        // A pending handoff opens the camera straight away
        if let Some(handoff) = self.handoff.take() {
            if handoff.redeem() {
                info!("Redeeming scan handoff, opening camera");
                self.scanner.open().await.map_err(|e| {
                    error!("Failed to open camera for handoff: {}", e);
                    e
                })?;
            }
        }

        info!("NutriLens system started successfully");
        Ok(())
    }
}
