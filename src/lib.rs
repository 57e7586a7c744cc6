pub mod config;
pub mod error;
pub mod events;
pub mod api;
pub mod ledger;
pub mod motion;
pub mod scanner;
pub mod advice;
pub mod alerts;
pub mod storage;
pub mod app;

pub use config::NutrilensConfig;
pub use error::{NutrilensError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, NutrilensEvent};
pub use api::NutritionClient;
pub use api::types::{
    AdviceColor, AdviceReport, AlertSeverity, DetectedFood, FoodCheck, FoodRecord, HealthAlert,
    MealAnalysis, NutritionPer100g, NutritionSummary, TrafficLight, UserProfile,
};
pub use ledger::{DietPreset, EnergyLedger, HydrationSignal, LedgerHandle, LedgerSnapshot};
pub use motion::{
    DemoStepDriver, MotionSource, ScriptedMotionSource, SimulatedMotionSource, StepDetector,
    StepTracker, UnsupportedMotionSource,
};
pub use scanner::{
    CameraSource, ConfirmedMeal, MealDraft, ScanOrchestrator, ScanPhase, ScanSession, StillImage,
    TestPatternCamera,
};
pub use advice::{AdviceBackend, AdviceRequester};
pub use alerts::AlertCenter;
pub use storage::{
    JsonFileStore, KeyValueStore, MealHistoryEntry, MealJournal, MemoryStore, ProfileStore,
};
pub use app::{ComponentState, NutrilensOrchestrator, ScanHandoff, ShutdownReason};
