use crate::api::types::AdviceColor;
use crate::error::EventBusError;
use crate::ledger::LedgerSnapshot;
use crate::scanner::ScanPhase;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur in the tracker while it is running
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NutrilensEvent {
    /// The step detector registered a new step
    StepDetected {
        total_steps: u64,
        timestamp: SystemTime,
    },
    /// Availability of the device motion feed changed
    SensorStatusChanged {
        supported: bool,
        timestamp: SystemTime,
    },
    /// The energy ledger changed
    LedgerUpdated {
        snapshot: LedgerSnapshot,
        timestamp: SystemTime,
    },
    /// Fresh adaptive advice was accepted
    AdviceUpdated {
        color: AdviceColor,
        status: String,
        timestamp: SystemTime,
    },
    /// A meal-scan session moved to a new phase
    ScanPhaseChanged {
        session_id: Uuid,
        phase: ScanPhase,
        timestamp: SystemTime,
    },
    /// A meal was confirmed and credited to the ledger
    MealLogged {
        food: String,
        calories: f64,
        timestamp: SystemTime,
    },
    /// A sip of water was recorded
    WaterLogged {
        total_ml: f64,
        timestamp: SystemTime,
    },
    /// A health alert was dismissed locally
    AlertDismissed { alert_id: i64, timestamp: SystemTime },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl NutrilensEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            NutrilensEvent::StepDetected { timestamp, .. } => *timestamp,
            NutrilensEvent::SensorStatusChanged { timestamp, .. } => *timestamp,
            NutrilensEvent::LedgerUpdated { timestamp, .. } => *timestamp,
            NutrilensEvent::AdviceUpdated { timestamp, .. } => *timestamp,
            NutrilensEvent::ScanPhaseChanged { timestamp, .. } => *timestamp,
            NutrilensEvent::MealLogged { timestamp, .. } => *timestamp,
            NutrilensEvent::WaterLogged { timestamp, .. } => *timestamp,
            NutrilensEvent::AlertDismissed { timestamp, .. } => *timestamp,
            NutrilensEvent::SystemError { .. } => SystemTime::now(),
            NutrilensEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            NutrilensEvent::StepDetected { total_steps, .. } => {
                format!("Step detected, total: {}", total_steps)
            }
            NutrilensEvent::SensorStatusChanged { supported, .. } => {
                format!(
                    "Motion sensor {}",
                    if *supported { "available" } else { "unavailable" }
                )
            }
            NutrilensEvent::LedgerUpdated { snapshot, .. } => {
                format!(
                    "Ledger updated: {:.0} kcal consumed, {:.0} kcal burned, {:.0} ml water",
                    snapshot.consumed, snapshot.burned, snapshot.water
                )
            }
            NutrilensEvent::AdviceUpdated { color, status, .. } => {
                format!("Advice updated ({:?}): {}", color, status)
            }
            NutrilensEvent::ScanPhaseChanged {
                session_id, phase, ..
            } => {
                format!("Scan {} entered {} phase", session_id, phase.as_str())
            }
            NutrilensEvent::MealLogged { food, calories, .. } => {
                format!("Meal logged: {} ({:.0} kcal)", food, calories)
            }
            NutrilensEvent::WaterLogged { total_ml, .. } => {
                format!("Water logged, total: {:.0} ml", total_ml)
            }
            NutrilensEvent::AlertDismissed { alert_id, .. } => {
                format!("Alert {} dismissed", alert_id)
            }
            NutrilensEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            NutrilensEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            NutrilensEvent::StepDetected { .. } => "step_detected",
            NutrilensEvent::SensorStatusChanged { .. } => "sensor_status_changed",
            NutrilensEvent::LedgerUpdated { .. } => "ledger_updated",
            NutrilensEvent::AdviceUpdated { .. } => "advice_updated",
            NutrilensEvent::ScanPhaseChanged { .. } => "scan_phase_changed",
            NutrilensEvent::MealLogged { .. } => "meal_logged",
            NutrilensEvent::WaterLogged { .. } => "water_logged",
            NutrilensEvent::AlertDismissed { .. } => "alert_dismissed",
            NutrilensEvent::SystemError { .. } => "system_error",
            NutrilensEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<NutrilensEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<NutrilensEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: NutrilensEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        // Log important events at appropriate levels
        match &event {
            NutrilensEvent::SensorStatusChanged { supported, .. } => {
                if *supported {
                    info!("Motion sensor available");
                } else {
                    warn!("Motion sensor unavailable");
                }
            }
            NutrilensEvent::AdviceUpdated { color, status, .. } => {
                info!("Advice updated ({:?}): {}", color, status);
            }
            NutrilensEvent::ScanPhaseChanged { phase, .. } => {
                info!("Scan phase: {}", phase.as_str());
            }
            NutrilensEvent::MealLogged { food, calories, .. } => {
                info!("Meal logged: {} ({:.0} kcal)", food, calories);
            }
            NutrilensEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            NutrilensEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept events from specific components (for SystemError events)
    Components(Vec<String>),
    /// Custom filter function
    Custom(fn(&NutrilensEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &NutrilensEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Components(components) => {
                if let NutrilensEvent::SystemError { component, .. } = event {
                    components.contains(component)
                } else {
                    false
                }
            }
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<NutrilensEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<NutrilensEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<NutrilensEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                    // Continue loop to get next event if this one doesn't match filter
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<NutrilensEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(Some(event));
                    }
                    // Continue loop to check next event
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
