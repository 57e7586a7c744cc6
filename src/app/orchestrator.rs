use super::types::{ComponentState, ScanHandoff};
use crate::advice::{AdviceBackend, AdviceRequester};
use crate::alerts::AlertCenter;
use crate::api::types::{AdviceReport, UserProfile};
use crate::api::NutritionClient;
use crate::config::NutrilensConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::ledger::{DietPreset, EnergyLedger, HydrationSignal, LedgerHandle, LedgerSnapshot};
use crate::motion::{burned_for_walk_minutes, DemoStepDriver, MotionSource, StepTracker};
use crate::scanner::{CameraSource, ScanOrchestrator};
use crate::storage::{KeyValueStore, MealHistoryEntry, MealJournal, ProfileStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Main application coordinator that manages all system components
pub struct NutrilensOrchestrator {
    pub(super) config: NutrilensConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) client: Arc<NutritionClient>,

    // Components
    pub(super) profile_store: ProfileStore,
    pub(super) profile: Arc<RwLock<UserProfile>>,
    pub(super) ledger: LedgerHandle,
    pub(super) ledger_snapshots: Option<watch::Receiver<LedgerSnapshot>>,
    pub(super) journal: MealJournal,
    pub(super) tracker: StepTracker,
    pub(super) demo_driver: Option<DemoStepDriver>,
    pub(super) scanner: ScanOrchestrator,
    pub(super) advice: AdviceRequester,
    pub(super) alerts: AlertCenter,
    pub(super) handoff: Option<ScanHandoff>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<super::types::ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<super::types::ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl NutrilensOrchestrator {
    /// Create a new orchestrator from the configuration and the
    /// platform capabilities the host hands in.
    pub async fn new(
        config: NutrilensConfig,
        motion: Arc<dyn MotionSource>,
        camera: Box<dyn CameraSource>,
        store: Arc<dyn KeyValueStore>,
        handoff: ScanHandoff,
    ) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let client = Arc::new(NutritionClient::new(&config.api.base_url));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let profile_store = ProfileStore::new(Arc::clone(&store));
        let profile = Self::initial_profile(&profile_store, &config).await;
        let preset = profile.diet_preset;
        let profile = Arc::new(RwLock::new(profile));

        // The ledger's goal starts from the stored profile's preset
        let (ledger, snapshots) = EnergyLedger::new(preset, config.ledger.water_target_ml);
        let ledger = LedgerHandle::new(ledger, Arc::clone(&event_bus));

        let journal = MealJournal::new(store);
        let tracker = StepTracker::new(motion, ledger.clone(), Arc::clone(&event_bus));

        let scanner = ScanOrchestrator::new(
            camera,
            config.scanner.jpeg_quality.clamp(1, 100) as u8,
            Arc::clone(&client),
            ledger.clone(),
            journal.clone(),
            Arc::clone(&profile),
            Arc::clone(&event_bus),
        );

        let backend: Arc<dyn AdviceBackend> = client.clone();
        let advice = AdviceRequester::new(backend, Arc::clone(&event_bus));

        let alerts = AlertCenter::new(Arc::clone(&client), Arc::clone(&event_bus));

        Ok(Self {
            config,
            event_bus,
            client,
            profile_store,
            profile,
            ledger,
            ledger_snapshots: Some(snapshots),
            journal,
            tracker,
            demo_driver: None,
            scanner,
            advice,
            alerts,
            handoff: Some(handoff),
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    async fn initial_profile(store: &ProfileStore, config: &NutrilensConfig) -> UserProfile {
        match store.load().await {
            Ok(Some(profile)) => {
                info!(
                    "Loaded stored profile ({} preset)",
                    profile.diet_preset.as_str()
                );
                profile
            }
            Ok(None) => {
                info!(
                    "No stored profile, using configured '{}' preset",
                    config.ledger.preset
                );
                UserProfile {
                    diet_preset: config.ledger.diet_preset(),
                    ..UserProfile::default()
                }
            }
            Err(e) => {
                warn!("Stored profile unreadable, starting fresh: {}", e);
                UserProfile {
                    diet_preset: config.ledger.diet_preset(),
                    ..UserProfile::default()
                }
            }
        }
    }

    /// The meal-scan workflow.
    pub fn scanner(&self) -> &ScanOrchestrator {
        &self.scanner
    }

    /// The health alert surface.
    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    pub fn step_tracker(&self) -> &StepTracker {
        &self.tracker
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub async fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot().await
    }

    /// Log one glass of water.
    pub async fn drink_water(&self) -> LedgerSnapshot {
        self.ledger.add_water_sip().await
    }

    pub async fn hydration(&self) -> HydrationSignal {
        self.ledger.hydration().await
    }

    pub async fn water_percent(&self) -> f64 {
        self.ledger.water_percent().await
    }

    /// The most recent adaptive advice, if any has been fetched.
    pub async fn advice_report(&self) -> Option<AdviceReport> {
        self.advice.current().await
    }

    pub async fn steps(&self) -> u64 {
        self.tracker.steps().await
    }

    /// Estimated whole calories for a walk of the given minutes.
    pub fn walk_estimate(&self, minutes: f64) -> u32 {
        burned_for_walk_minutes(minutes)
    }

    /// A copy of the current profile.
    pub async fn profile(&self) -> UserProfile {
        self.profile.read().await.clone()
    }

    /// Persist a new profile, retargeting the calorie goal when the
    /// diet preset moved.
    pub async fn save_profile(&self, profile: UserProfile) -> Result<()> {
        let preset_changed = {
            let mut current = self.profile.write().await;
            let changed = current.diet_preset != profile.diet_preset;
            *current = profile.clone();
            changed
        };

        if preset_changed {
            info!("Diet preset changed to {}", profile.diet_preset.as_str());
            self.ledger.set_preset(profile.diet_preset).await;
        }

        self.profile_store.save(&profile).await?;
        Ok(())
    }

    /// Switch the diet preset only.
    pub async fn set_diet_preset(&self, preset: DietPreset) -> Result<()> {
        let mut profile = self.profile().await;
        profile.diet_preset = preset;
        self.save_profile(profile).await
    }

    /// Record a fresh weight measurement. The service may recompute its
    /// alerts from it, so the local list is refreshed afterwards.
    pub async fn log_weight(&self, weight_kg: f64) -> Result<()> {
        self.client.log_weight(weight_kg).await?;
        info!("Weight logged: {:.1} kg", weight_kg);
        self.refresh_alerts_with_fallback().await;
        Ok(())
    }

    /// The meal journal, newest first.
    pub async fn meal_history(&self) -> Result<Vec<MealHistoryEntry>> {
        Ok(self.journal.entries().await?)
    }

    pub(super) async fn refresh_alerts_with_fallback(&self) {
        if let Err(e) = self.alerts.refresh().await {
            warn!("Alert refresh failed: {}", e);
            self.alerts.seed_offline_sample().await;
        }
    }
}
