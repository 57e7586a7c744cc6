use crate::api::types::{FoodCheck, FoodRecord, NutritionSummary, UserProfile};
use crate::api::NutritionClient;
use crate::error::{NutrilensError, Result};
use crate::events::{EventBus, NutrilensEvent};
use crate::ledger::LedgerHandle;
use crate::scanner::camera::CameraSource;
use crate::scanner::session::ScanSession;
use crate::scanner::state::{ConfirmedMeal, MealDraft, ScanPhase};
use crate::storage::{MealHistoryEntry, MealJournal};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Coordinates the meal-scan workflow against the live services.
///
/// The orchestrator owns the scan session and wires its outcomes into
/// the rest of the system: analysis uploads go through the nutrition
/// client, confirmed meals land in the energy ledger and the local
/// journal, and the manual food picker credits the ledger directly.
#[derive(Clone)]
pub struct ScanOrchestrator {
    session: Arc<Mutex<ScanSession>>,
    client: Arc<NutritionClient>,
    ledger: LedgerHandle,
    journal: MealJournal,
    profile: Arc<RwLock<UserProfile>>,
    events: Arc<EventBus>,
}

impl ScanOrchestrator {
    pub fn new(
        camera: Box<dyn CameraSource>,
        jpeg_quality: u8,
        client: Arc<NutritionClient>,
        ledger: LedgerHandle,
        journal: MealJournal,
        profile: Arc<RwLock<UserProfile>>,
        events: Arc<EventBus>,
    ) -> Self {
        let session = ScanSession::new(camera, jpeg_quality, Arc::clone(&events));
        Self {
            session: Arc::new(Mutex::new(session)),
            client,
            ledger,
            journal,
            profile,
            events,
        }
    }

    pub async fn open(&self) -> Result<()> {
        self.session.lock().await.open().await
    }

    pub async fn capture(&self) -> Result<()> {
        self.session.lock().await.capture().await
    }

    pub async fn retake(&self) -> Result<()> {
        self.session.lock().await.retake().await
    }

    /// Upload the previewed still and land the outcome in the session.
    ///
    /// The session lock is dropped while the upload runs, so close and
    /// retake can interleave with a slow server; the epoch check in the
    /// session discards the result if they did.
    pub async fn analyze(&self) -> Result<()> {
        let (still, epoch) = self.session.lock().await.begin_analysis().await?;

        let profile = self.profile.read().await.clone();
        let outcome = self
            .client
            .analyze_meal(&still, &profile)
            .await
            .map_err(NutrilensError::from);

        self.session
            .lock()
            .await
            .complete_analysis(epoch, outcome)
            .await;
        Ok(())
    }

    pub async fn set_meal_name(&self, name: impl Into<String>) -> Result<()> {
        self.session.lock().await.set_meal_name(name)
    }

    pub async fn set_calories(&self, calories: f64) -> Result<()> {
        self.session.lock().await.set_calories(calories)
    }

    /// Accept the shown draft: the meal is added to the ledger and the
    /// journal, and the session ends.
    pub async fn confirm(&self) -> Result<ConfirmedMeal> {
        let meal = self.session.lock().await.confirm().await?;
        self.record_meal(
            meal.name.clone(),
            meal.calories,
            meal.nutrition,
            meal.confirmed_at,
        )
        .await;
        Ok(meal)
    }

    pub async fn close(&self) {
        self.session.lock().await.close().await;
    }

    /// Foods available for manual logging.
    pub async fn food_catalog(&self) -> Result<Vec<FoodRecord>> {
        Ok(self.client.list_foods().await?)
    }

    /// Portion check for a catalog food against the current profile.
    pub async fn check_food(&self, food_id: i64, portion_weight_g: f64) -> Result<FoodCheck> {
        let profile = self.profile.read().await.clone();
        Ok(self
            .client
            .check_food(food_id, portion_weight_g, &profile)
            .await?)
    }

    /// Log a meal picked from the catalog, bypassing the camera.
    ///
    /// Only scanned meals enter the journal; a manual pick counts
    /// against the ledger without a history entry.
    pub async fn log_manual(&self, name: impl Into<String>, calories: f64) {
        let name = name.into();
        info!("Manual meal entry: {} ({:.0} kcal)", name, calories);
        self.credit_meal(&name, calories, SystemTime::now()).await;
    }

    pub async fn phase(&self) -> ScanPhase {
        self.session.lock().await.phase()
    }

    pub async fn session_id(&self) -> Uuid {
        self.session.lock().await.id()
    }

    pub async fn scan_error(&self) -> Option<String> {
        self.session.lock().await.error().map(str::to_string)
    }

    pub async fn draft(&self) -> Option<MealDraft> {
        self.session.lock().await.draft().cloned()
    }

    pub async fn camera_open(&self) -> bool {
        self.session.lock().await.camera_open()
    }

    #[cfg(test)]
    pub(crate) fn session_handle(&self) -> Arc<Mutex<ScanSession>> {
        Arc::clone(&self.session)
    }

    async fn credit_meal(&self, food: &str, calories: f64, timestamp: SystemTime) {
        self.ledger.add_consumed(calories).await;

        let _ = self
            .events
            .publish(NutrilensEvent::MealLogged {
                food: food.to_string(),
                calories,
                timestamp,
            })
            .await;
    }

    /// Ledger, event, journal. A journal write failure is reported but
    /// does not undo the ledger update; the meal stays counted.
    async fn record_meal(
        &self,
        food: String,
        calories: f64,
        nutrition: NutritionSummary,
        confirmed_at: SystemTime,
    ) {
        self.credit_meal(&food, calories, confirmed_at).await;

        let entry = MealHistoryEntry {
            timestamp: confirmed_at.into(),
            food,
            calories,
            nutrition,
        };
        if let Err(e) = self.journal.append(entry).await {
            warn!("Meal journal write failed: {}", e);
            let _ = self
                .events
                .publish(NutrilensEvent::SystemError {
                    component: "scanner".to_string(),
                    error: format!("meal journal write failed: {}", e),
                })
                .await;
        }
    }
}
