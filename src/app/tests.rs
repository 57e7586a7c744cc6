use super::*;
use crate::config::NutrilensConfig;
use crate::ledger::{DietPreset, HydrationSignal};
use crate::motion::UnsupportedMotionSource;
use crate::scanner::{ScanPhase, TestPatternCamera};
use crate::storage::{KeyValueStore, MemoryStore, ProfileStore};
use std::sync::Arc;

fn create_test_config() -> NutrilensConfig {
    let mut config = NutrilensConfig::default();
    // Unroutable port so network calls fail fast
    config.api.base_url = "http://127.0.0.1:9".to_string();
    config
}

async fn create_test_orchestrator() -> NutrilensOrchestrator {
    create_test_orchestrator_with(Arc::new(MemoryStore::new()), ScanHandoff::none()).await
}

async fn create_test_orchestrator_with(
    store: Arc<dyn KeyValueStore>,
    handoff: ScanHandoff,
) -> NutrilensOrchestrator {
    NutrilensOrchestrator::new(
        create_test_config(),
        Arc::new(UnsupportedMotionSource),
        Box::new(TestPatternCamera::new(64, 48)),
        store,
        handoff,
    )
    .await
    .expect("orchestrator creation failed")
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let orchestrator = create_test_orchestrator().await;

    // Check initial component states
    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty()); // No components registered yet
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let mut orchestrator = create_test_orchestrator().await;
    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.get("motion"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("scanner"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("advice"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("alerts"), Some(&ComponentState::Stopped));

    // No sensor in this setup, so the demo driver is registered too
    assert_eq!(states.get("demo"), Some(&ComponentState::Stopped));
}

#[tokio::test]
async fn test_component_state_management() {
    let orchestrator = create_test_orchestrator().await;

    // Test setting and getting component states
    orchestrator
        .set_component_state("motion", ComponentState::Starting)
        .await;
    let state = orchestrator.get_component_state("motion").await;
    assert_eq!(state, Some(ComponentState::Starting));

    orchestrator
        .set_component_state("motion", ComponentState::Running)
        .await;
    let state = orchestrator.get_component_state("motion").await;
    assert_eq!(state, Some(ComponentState::Running));

    // Test multiple components
    orchestrator
        .set_component_state("advice", ComponentState::Running)
        .await;
    orchestrator
        .set_component_state("scanner", ComponentState::Failed)
        .await;

    let all_states = orchestrator.get_all_component_states().await;
    assert_eq!(all_states.len(), 3);
    assert_eq!(all_states.get("motion"), Some(&ComponentState::Running));
    assert_eq!(all_states.get("advice"), Some(&ComponentState::Running));
    assert_eq!(all_states.get("scanner"), Some(&ComponentState::Failed));
}

#[tokio::test]
async fn test_component_state_transitions() {
    let orchestrator = create_test_orchestrator().await;

    // Test typical component lifecycle
    let component = "test_component";

    // Initial state should be None
    assert_eq!(orchestrator.get_component_state(component).await, None);

    // Starting -> Running -> Stopping -> Stopped
    orchestrator
        .set_component_state(component, ComponentState::Starting)
        .await;
    assert_eq!(
        orchestrator.get_component_state(component).await,
        Some(ComponentState::Starting)
    );

    orchestrator
        .set_component_state(component, ComponentState::Running)
        .await;
    assert_eq!(
        orchestrator.get_component_state(component).await,
        Some(ComponentState::Running)
    );

    orchestrator
        .set_component_state(component, ComponentState::Stopping)
        .await;
    assert_eq!(
        orchestrator.get_component_state(component).await,
        Some(ComponentState::Stopping)
    );

    orchestrator
        .set_component_state(component, ComponentState::Stopped)
        .await;
    assert_eq!(
        orchestrator.get_component_state(component).await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_concurrent_component_state_access() {
    let orchestrator = Arc::new(create_test_orchestrator().await);

    // Test concurrent access to component states
    let mut handles = Vec::new();

    for i in 0..10 {
        let orchestrator_clone = Arc::clone(&orchestrator);
        let handle = tokio::spawn(async move {
            let component_name = format!("component_{}", i);
            orchestrator_clone
                .set_component_state(&component_name, ComponentState::Running)
                .await;
            orchestrator_clone
                .get_component_state(&component_name)
                .await
        });
        handles.push(handle);
    }

    // Wait for all tasks to complete
    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result, Some(ComponentState::Running));
    }

    // Verify all components were created
    let all_states = orchestrator.get_all_component_states().await;
    assert_eq!(all_states.len(), 10);
}

#[tokio::test]
async fn test_start_runs_components_and_seeds_offline_alerts() {
    let mut orchestrator = create_test_orchestrator().await;
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.get("motion"), Some(&ComponentState::Running));
    assert_eq!(states.get("demo"), Some(&ComponentState::Running));
    assert_eq!(states.get("advice"), Some(&ComponentState::Running));
    assert_eq!(states.get("alerts"), Some(&ComponentState::Running));

    // The alert service is unreachable, so the offline sample is loaded
    let alerts = orchestrator.alerts().alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, 1);
    assert_eq!(alerts[0].kind, "low_intake");

    // No handoff was requested, so the scanner stays closed
    assert_eq!(orchestrator.scanner().phase().await, ScanPhase::Closed);

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
}

#[tokio::test]
async fn test_drink_water_moves_hydration() {
    let orchestrator = create_test_orchestrator().await;

    let snapshot = orchestrator.ledger_snapshot().await;
    assert_eq!(snapshot.water, 0.0);
    assert_eq!(orchestrator.hydration().await, HydrationSignal::Weak);

    let snapshot = orchestrator.drink_water().await;
    assert_eq!(snapshot.water, 250.0);

    // One sip of a 2450 ml target is nowhere near the moderate band
    assert!(orchestrator.water_percent().await < 40.0);
    assert_eq!(orchestrator.hydration().await, HydrationSignal::Weak);
}

#[tokio::test]
async fn test_set_diet_preset_retargets_goal_and_persists() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = create_test_orchestrator_with(
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
        ScanHandoff::none(),
    )
    .await;

    assert_eq!(orchestrator.ledger_snapshot().await.goal, 2000.0);

    orchestrator
        .set_diet_preset(DietPreset::WeightLoss)
        .await
        .unwrap();

    assert_eq!(orchestrator.ledger_snapshot().await.goal, 1500.0);
    assert_eq!(orchestrator.profile().await.diet_preset, DietPreset::WeightLoss);

    // A fresh store view sees the persisted profile
    let profiles = ProfileStore::new(store);
    let stored = profiles.load().await.unwrap().unwrap();
    assert_eq!(stored.diet_preset, DietPreset::WeightLoss);
}

#[tokio::test]
async fn test_scan_handoff_opens_camera_on_start() {
    let mut orchestrator = create_test_orchestrator_with(
        Arc::new(MemoryStore::new()),
        ScanHandoff::requested(),
    )
    .await;

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    assert_eq!(orchestrator.scanner().phase().await, ScanPhase::Camera);
    assert!(orchestrator.scanner().camera_open().await);

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(orchestrator.scanner().phase().await, ScanPhase::Closed);
}

#[tokio::test]
async fn test_shutdown_stops_all_components() {
    let mut orchestrator = create_test_orchestrator().await;
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.get("motion"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("demo"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("advice"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("alerts"), Some(&ComponentState::Stopped));
    assert_eq!(states.get("scanner"), Some(&ComponentState::Stopped));
}

#[tokio::test]
async fn test_component_state_enum() {
    // Test Debug formatting
    assert_eq!(format!("{:?}", ComponentState::Running), "Running");
    assert_eq!(format!("{:?}", ComponentState::Failed), "Failed");

    // Test Clone and PartialEq
    let running_state = ComponentState::Running;
    let cloned_state = running_state.clone();
    assert_eq!(running_state, cloned_state);
    assert_ne!(ComponentState::Running, ComponentState::Failed);
}
