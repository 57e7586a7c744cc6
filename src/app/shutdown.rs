use super::{ComponentState, NutrilensOrchestrator};
use crate::error::{NutrilensError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl NutrilensOrchestrator {
    /// Perform graceful shutdown of all components
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        // Stop components in reverse dependency order
        if let Err(e) = self.stop_component("scanner").await {
            error!("Error stopping scanner: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_component("alerts").await {
            error!("Error stopping alerts: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_component("advice").await {
            error!("Error stopping advice: {}", e);
            exit_code = 1;
        }

        if self.demo_driver.is_some() {
            if let Err(e) = self.stop_component("demo").await {
                error!("Error stopping demo: {}", e);
                exit_code = 1;
            }
        }

        if let Err(e) = self.stop_component("motion").await {
            error!("Error stopping motion: {}", e);
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop a specific component
    async fn stop_component(&mut self, component: &str) -> Result<()> {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match component {
            "scanner" => match timeout(Duration::from_secs(5), self.scanner.close()).await {
                Ok(()) => {
                    self.set_component_state(component, ComponentState::Stopped)
                        .await;
                    info!("{} component stopped", component);
                    Ok(())
                }
                Err(_) => {
                    self.set_component_state(component, ComponentState::Failed)
                        .await;
                    let err = NutrilensError::System {
                        message: format!("{} component stop timeout", component),
                    };
                    error!("{} component stop timeout", component);
                    Err(err)
                }
            },
            "advice" => match timeout(Duration::from_secs(5), self.advice.stop()).await {
                Ok(()) => {
                    self.set_component_state(component, ComponentState::Stopped)
                        .await;
                    info!("{} component stopped", component);
                    Ok(())
                }
                Err(_) => {
                    self.set_component_state(component, ComponentState::Failed)
                        .await;
                    let err = NutrilensError::System {
                        message: format!("{} component stop timeout", component),
                    };
                    error!("{} component stop timeout", component);
                    Err(err)
                }
            },
            "demo" => {
                if let Some(driver) = &self.demo_driver {
                    match timeout(Duration::from_secs(2), driver.stop()).await {
                        Ok(()) => {
                            self.set_component_state(component, ComponentState::Stopped)
                                .await;
                            info!("{} component stopped", component);
                            Ok(())
                        }
                        Err(_) => {
                            self.set_component_state(component, ComponentState::Failed)
                                .await;
                            let err = NutrilensError::System {
                                message: format!("{} component stop timeout", component),
                            };
                            error!("{} component stop timeout", component);
                            Err(err)
                        }
                    }
                } else {
                    self.set_component_state(component, ComponentState::Stopped)
                        .await;
                    Ok(())
                }
            }
            "motion" => match timeout(Duration::from_secs(5), self.tracker.stop()).await {
                Ok(Ok(())) => {
                    self.set_component_state(component, ComponentState::Stopped)
                        .await;
                    info!("{} component stopped", component);
                    Ok(())
                }
                Ok(Err(e)) => {
                    self.set_component_state(component, ComponentState::Failed)
                        .await;
                    error!("Error stopping {} component: {}", component, e);
                    Err(e)
                }
                Err(_) => {
                    self.set_component_state(component, ComponentState::Failed)
                        .await;
                    let err = NutrilensError::System {
                        message: format!("{} component stop timeout", component),
                    };
                    error!("{} component stop timeout", component);
                    Err(err)
                }
            },
            _ => {
                // Nothing running in the background for these
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
        }
    }
}
