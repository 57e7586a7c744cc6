use crate::api::types::{AlertSeverity, HealthAlert};
use crate::api::NutritionClient;
use crate::error::Result;
use crate::events::{EventBus, NutrilensEvent};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Local view of the service's health alerts.
///
/// Dismissal is local-first: the alert disappears immediately and the
/// resolve call is best effort. A failed resolve means the alert may
/// come back on the next refresh, which is the accepted trade.
pub struct AlertCenter {
    client: Arc<NutritionClient>,
    events: Arc<EventBus>,
    alerts: RwLock<Vec<HealthAlert>>,
}

impl AlertCenter {
    pub fn new(client: Arc<NutritionClient>, events: Arc<EventBus>) -> Self {
        Self {
            client,
            events,
            alerts: RwLock::new(Vec::new()),
        }
    }

    /// Replace the local list with the service's current alerts.
    pub async fn refresh(&self) -> Result<usize> {
        let fetched = self.client.list_alerts().await?;
        let count = fetched.len();
        info!("Fetched {} health alert(s)", count);
        *self.alerts.write().await = fetched;
        Ok(count)
    }

    pub async fn alerts(&self) -> Vec<HealthAlert> {
        self.alerts.read().await.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }

    /// Dismiss an alert by id.
    ///
    /// The alert leaves the local list right away; the resolve call runs
    /// afterwards and a failure only gets a log line. Dismissing an id
    /// that is not listed does nothing and skips the network entirely.
    pub async fn dismiss(&self, alert_id: i64) -> bool {
        let removed = {
            let mut alerts = self.alerts.write().await;
            let before = alerts.len();
            alerts.retain(|alert| alert.id != alert_id);
            alerts.len() != before
        };

        if !removed {
            debug!("Ignoring dismiss for unknown alert {}", alert_id);
            return false;
        }

        let _ = self
            .events
            .publish(NutrilensEvent::AlertDismissed {
                alert_id,
                timestamp: SystemTime::now(),
            })
            .await;

        if let Err(e) = self.client.resolve_alert(alert_id).await {
            warn!("Resolve for alert {} failed: {}", alert_id, e);
        }
        true
    }

    /// Install the built-in sample alert, used when the service cannot
    /// be reached so the alert surface still has content to show.
    pub async fn seed_offline_sample(&self) {
        info!("Alert service unreachable, seeding sample alert");
        *self.alerts.write().await = vec![HealthAlert {
            id: 1,
            kind: "low_intake".to_string(),
            severity: AlertSeverity::Medium,
            message: "Calorie intake has been very low (<1200 kcal) for 3 days.".to_string(),
            suggested_tests: vec!["Vitamin B12".to_string(), "Vitamin D".to_string()],
        }];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_center() -> (AlertCenter, Arc<EventBus>) {
        let events = Arc::new(EventBus::new(16));
        let client = Arc::new(NutritionClient::new("http://127.0.0.1:9"));
        (AlertCenter::new(client, Arc::clone(&events)), events)
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_as_error() {
        let (center, _events) = test_center();
        assert!(center.refresh().await.is_err());
        assert!(center.is_empty().await);
    }

    #[tokio::test]
    async fn test_offline_sample_fills_the_list() {
        let (center, _events) = test_center();
        center.seed_offline_sample().await;

        let alerts = center.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, "low_intake");
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
        assert_eq!(alerts[0].suggested_tests, vec!["Vitamin B12", "Vitamin D"]);
    }

    #[tokio::test]
    async fn test_dismiss_removes_locally_despite_resolve_failure() {
        let (center, events) = test_center();
        let mut receiver = events.subscribe();
        center.seed_offline_sample().await;

        // The resolve call cannot reach anything; dismissal must stand
        assert!(center.dismiss(1).await);
        assert!(center.is_empty().await);

        let mut saw_dismissed = false;
        while let Ok(event) = receiver.try_recv() {
            if let NutrilensEvent::AlertDismissed { alert_id, .. } = event {
                assert_eq!(alert_id, 1);
                saw_dismissed = true;
            }
        }
        assert!(saw_dismissed);
    }

    #[tokio::test]
    async fn test_dismissing_twice_is_quiet() {
        let (center, _events) = test_center();
        center.seed_offline_sample().await;

        assert!(center.dismiss(1).await);
        assert!(!center.dismiss(1).await);
        assert!(!center.dismiss(99).await);
    }
}
