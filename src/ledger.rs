use crate::events::{EventBus, NutrilensEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

/// Volume credited per water button press, in milliliters.
pub const WATER_SIP_ML: f64 = 250.0;

/// Diet preset selecting the daily calorie goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum DietPreset {
    WeightLoss,
    Maintenance,
    WeightGain,
    Diabetic,
    HighProtein,
}

impl DietPreset {
    /// Daily calorie goal in kcal.
    pub fn goal_kcal(&self) -> f64 {
        match self {
            Self::WeightLoss => 1500.0,
            Self::Maintenance => 2000.0,
            Self::WeightGain => 2500.0,
            Self::Diabetic => 1800.0,
            Self::HighProtein => 2200.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::Maintenance => "maintenance",
            Self::WeightGain => "weight_gain",
            Self::Diabetic => "diabetic",
            Self::HighProtein => "high_protein",
        }
    }

    /// Resolve a preset name. Unknown names get the maintenance goal.
    pub fn from_name(name: &str) -> Self {
        match name {
            "weight_loss" => Self::WeightLoss,
            "maintenance" => Self::Maintenance,
            "weight_gain" => Self::WeightGain,
            "diabetic" => Self::Diabetic,
            "high_protein" => Self::HighProtein,
            other => {
                debug!("Unknown diet preset '{}', using maintenance", other);
                Self::Maintenance
            }
        }
    }
}

impl From<String> for DietPreset {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl Default for DietPreset {
    fn default() -> Self {
        Self::Maintenance
    }
}

/// Qualitative hydration reading derived from water progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationSignal {
    Weak,
    Moderate,
    Optimal,
}

impl HydrationSignal {
    /// Band the capped progress percentage. The boundaries are exclusive:
    /// exactly 40% still reads weak and exactly 80% still reads moderate.
    pub fn from_percent(percent: f64) -> Self {
        if percent > 80.0 {
            Self::Optimal
        } else if percent > 40.0 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

/// Point-in-time view of the day's energy ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Calories eaten today, in kcal.
    pub consumed: f64,
    /// Calories credited back from activity, in kcal.
    pub burned: f64,
    /// Water drunk today, in milliliters.
    pub water: f64,
    /// Daily calorie goal, in kcal.
    pub goal: f64,
}

impl LedgerSnapshot {
    /// Budget left for the day. Burned calories extend the budget, so
    /// this can exceed the goal and can also go negative.
    pub fn remaining(&self) -> f64 {
        (self.goal + self.burned) - self.consumed
    }

    /// Goal progress capped at 100, ignoring burned calories.
    pub fn progress_percent(&self) -> f64 {
        ((self.consumed / self.goal) * 100.0).min(100.0)
    }
}

/// A single mutation of the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedgerUpdate {
    /// Credit a meal or manual entry.
    AddConsumed(f64),
    /// Overwrite the activity credit with a fresh detector total.
    ReplaceBurned(f64),
    /// Credit water intake.
    AddWater(f64),
    /// Switch the daily goal.
    SetGoal(f64),
}

/// The day's running totals with goal context.
///
/// Consumed and water only ever accumulate; burned is replaced wholesale
/// because the step detector reports running totals, not increments.
/// Every accepted update is published on a watch channel so the advice
/// debouncer can observe changes without polling.
#[derive(Debug)]
pub struct EnergyLedger {
    consumed: f64,
    burned: f64,
    water: f64,
    goal: f64,
    water_target_ml: f64,
    snapshot_tx: watch::Sender<LedgerSnapshot>,
}

impl EnergyLedger {
    pub fn new(preset: DietPreset, water_target_ml: f64) -> (Self, watch::Receiver<LedgerSnapshot>) {
        let initial = LedgerSnapshot {
            consumed: 0.0,
            burned: 0.0,
            water: 0.0,
            goal: preset.goal_kcal(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let ledger = Self {
            consumed: 0.0,
            burned: 0.0,
            water: 0.0,
            goal: preset.goal_kcal(),
            water_target_ml,
            snapshot_tx,
        };
        (ledger, snapshot_rx)
    }

    /// Apply one update and publish the resulting snapshot.
    ///
    /// Updates that would corrupt the ledger (negative amounts, a
    /// non-positive goal) are dropped with a warning.
    pub fn apply(&mut self, update: LedgerUpdate) -> LedgerSnapshot {
        match update {
            LedgerUpdate::AddConsumed(kcal) => {
                if kcal < 0.0 {
                    warn!("Ignoring negative consumed amount: {}", kcal);
                } else {
                    self.consumed += kcal;
                }
            }
            LedgerUpdate::ReplaceBurned(kcal) => {
                if kcal < 0.0 {
                    warn!("Ignoring negative burned total: {}", kcal);
                } else {
                    self.burned = kcal;
                }
            }
            LedgerUpdate::AddWater(ml) => {
                if ml < 0.0 {
                    warn!("Ignoring negative water amount: {}", ml);
                } else {
                    self.water += ml;
                }
            }
            LedgerUpdate::SetGoal(kcal) => {
                if kcal <= 0.0 {
                    warn!("Ignoring non-positive goal: {}", kcal);
                } else {
                    self.goal = kcal;
                }
            }
        }

        let snapshot = self.snapshot();
        self.snapshot_tx.send_replace(snapshot);
        snapshot
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            consumed: self.consumed,
            burned: self.burned,
            water: self.water,
            goal: self.goal,
        }
    }

    /// Water progress toward the daily target, capped at 100.
    pub fn water_percent(&self) -> f64 {
        ((self.water / self.water_target_ml) * 100.0).min(100.0)
    }

    pub fn hydration(&self) -> HydrationSignal {
        HydrationSignal::from_percent(self.water_percent())
    }
}

/// Shared handle to the ledger used across components.
///
/// Mutations go through here so the matching events reach the bus.
#[derive(Clone)]
pub struct LedgerHandle {
    inner: Arc<Mutex<EnergyLedger>>,
    events: Arc<EventBus>,
}

impl LedgerHandle {
    pub fn new(ledger: EnergyLedger, events: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            events,
        }
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn apply(&self, update: LedgerUpdate) -> LedgerSnapshot {
        let snapshot = self.inner.lock().await.apply(update);
        let _ = self
            .events
            .publish(NutrilensEvent::LedgerUpdated {
                snapshot,
                timestamp: SystemTime::now(),
            })
            .await;
        snapshot
    }

    pub async fn add_consumed(&self, kcal: f64) -> LedgerSnapshot {
        self.apply(LedgerUpdate::AddConsumed(kcal)).await
    }

    pub async fn replace_burned(&self, kcal: f64) -> LedgerSnapshot {
        self.apply(LedgerUpdate::ReplaceBurned(kcal)).await
    }

    /// Credit one press of the water button.
    pub async fn add_water_sip(&self) -> LedgerSnapshot {
        let snapshot = self.apply(LedgerUpdate::AddWater(WATER_SIP_ML)).await;
        let _ = self
            .events
            .publish(NutrilensEvent::WaterLogged {
                total_ml: snapshot.water,
                timestamp: SystemTime::now(),
            })
            .await;
        snapshot
    }

    pub async fn set_preset(&self, preset: DietPreset) -> LedgerSnapshot {
        self.apply(LedgerUpdate::SetGoal(preset.goal_kcal())).await
    }

    pub async fn hydration(&self) -> HydrationSignal {
        self.inner.lock().await.hydration()
    }

    pub async fn water_percent(&self) -> f64 {
        self.inner.lock().await.water_percent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ledger() -> (EnergyLedger, watch::Receiver<LedgerSnapshot>) {
        EnergyLedger::new(DietPreset::Maintenance, 2450.0)
    }

    #[test]
    fn test_preset_goals() {
        assert_eq!(DietPreset::WeightLoss.goal_kcal(), 1500.0);
        assert_eq!(DietPreset::Maintenance.goal_kcal(), 2000.0);
        assert_eq!(DietPreset::WeightGain.goal_kcal(), 2500.0);
        assert_eq!(DietPreset::Diabetic.goal_kcal(), 1800.0);
        assert_eq!(DietPreset::HighProtein.goal_kcal(), 2200.0);
    }

    #[test]
    fn test_unknown_preset_name_reads_as_maintenance() {
        assert_eq!(DietPreset::from_name("paleo"), DietPreset::Maintenance);
        assert_eq!(DietPreset::from_name("weight_loss"), DietPreset::WeightLoss);
    }

    #[test]
    fn test_remaining_identity_over_update_sequence() {
        let (mut ledger, _rx) = test_ledger();

        ledger.apply(LedgerUpdate::AddConsumed(450.0));
        ledger.apply(LedgerUpdate::ReplaceBurned(32.0));
        ledger.apply(LedgerUpdate::AddConsumed(612.0));
        ledger.apply(LedgerUpdate::AddWater(WATER_SIP_ML));
        let snapshot = ledger.apply(LedgerUpdate::ReplaceBurned(40.0));

        assert_eq!(
            snapshot.remaining(),
            (snapshot.goal + snapshot.burned) - snapshot.consumed
        );
        assert_eq!(snapshot.remaining(), (2000.0 + 40.0) - 1062.0);
    }

    #[test]
    fn test_remaining_can_go_negative() {
        let (mut ledger, _rx) = test_ledger();
        let snapshot = ledger.apply(LedgerUpdate::AddConsumed(2600.0));

        assert_eq!(snapshot.remaining(), -600.0);
        assert_eq!(snapshot.progress_percent(), 100.0);
    }

    #[test]
    fn test_progress_caps_at_100() {
        let (mut ledger, _rx) = test_ledger();

        let halfway = ledger.apply(LedgerUpdate::AddConsumed(1000.0));
        assert_eq!(halfway.progress_percent(), 50.0);

        let over = ledger.apply(LedgerUpdate::AddConsumed(1500.0));
        assert_eq!(over.progress_percent(), 100.0);
    }

    #[test]
    fn test_burned_is_replaced_not_accumulated() {
        let (mut ledger, _rx) = test_ledger();

        ledger.apply(LedgerUpdate::ReplaceBurned(10.0));
        let snapshot = ledger.apply(LedgerUpdate::ReplaceBurned(14.0));

        assert_eq!(snapshot.burned, 14.0);
    }

    #[test]
    fn test_invalid_updates_are_dropped() {
        let (mut ledger, _rx) = test_ledger();
        ledger.apply(LedgerUpdate::AddConsumed(300.0));

        let snapshot = ledger.apply(LedgerUpdate::AddConsumed(-50.0));
        assert_eq!(snapshot.consumed, 300.0);

        let snapshot = ledger.apply(LedgerUpdate::SetGoal(0.0));
        assert_eq!(snapshot.goal, 2000.0);
    }

    #[test]
    fn test_hydration_band_boundaries() {
        assert_eq!(HydrationSignal::from_percent(0.0), HydrationSignal::Weak);
        assert_eq!(HydrationSignal::from_percent(40.0), HydrationSignal::Weak);
        assert_eq!(
            HydrationSignal::from_percent(40.1),
            HydrationSignal::Moderate
        );
        assert_eq!(
            HydrationSignal::from_percent(80.0),
            HydrationSignal::Moderate
        );
        assert_eq!(
            HydrationSignal::from_percent(80.1),
            HydrationSignal::Optimal
        );
    }

    #[test]
    fn test_water_percent_capped() {
        let (mut ledger, _rx) = test_ledger();
        for _ in 0..12 {
            ledger.apply(LedgerUpdate::AddWater(WATER_SIP_ML));
        }

        // 3000 ml against a 2450 ml target
        assert_eq!(ledger.water_percent(), 100.0);
        assert_eq!(ledger.hydration(), HydrationSignal::Optimal);
    }

    #[test]
    fn test_snapshots_reach_watchers() {
        let (mut ledger, rx) = test_ledger();

        ledger.apply(LedgerUpdate::AddConsumed(250.0));
        assert_eq!(rx.borrow().consumed, 250.0);

        ledger.apply(LedgerUpdate::AddWater(WATER_SIP_ML));
        assert_eq!(rx.borrow().water, WATER_SIP_ML);
    }

    #[tokio::test]
    async fn test_handle_publishes_ledger_events() {
        let events = Arc::new(EventBus::new(16));
        let mut receiver = events.subscribe();
        let (ledger, _rx) = test_ledger();
        let handle = LedgerHandle::new(ledger, events);

        handle.add_consumed(320.0).await;

        match receiver.recv().await.unwrap() {
            NutrilensEvent::LedgerUpdated { snapshot, .. } => {
                assert_eq!(snapshot.consumed, 320.0);
            }
            other => panic!("Unexpected event: {:?}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_water_sip_emits_running_total() {
        let events = Arc::new(EventBus::new(16));
        let mut receiver = events.subscribe();
        let (ledger, _rx) = test_ledger();
        let handle = LedgerHandle::new(ledger, events);

        handle.add_water_sip().await;
        handle.add_water_sip().await;

        let mut totals = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let NutrilensEvent::WaterLogged { total_ml, .. } = event {
                totals.push(total_ml);
            }
        }
        assert_eq!(totals, vec![250.0, 500.0]);
    }
}
