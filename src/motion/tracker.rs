use crate::error::{NutrilensError, Result};
use crate::events::{EventBus, NutrilensEvent};
use crate::ledger::LedgerHandle;
use crate::motion::detector::{burned_for_steps, StepDetector};
use crate::motion::source::{AccelerationSample, MotionSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// Live step tracking from a motion source into the energy ledger.
///
/// Owns the detector and keeps the ledger's burned total in sync with
/// the running step count. When the platform has no motion feed the
/// tracker stays idle and only reports the fact; injected steps from
/// the demo driver still work.
#[derive(Clone)]
pub struct StepTracker {
    source: Arc<dyn MotionSource>,
    detector: Arc<Mutex<StepDetector>>,
    ledger: LedgerHandle,
    events: Arc<EventBus>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StepTracker {
    pub fn new(source: Arc<dyn MotionSource>, ledger: LedgerHandle, events: Arc<EventBus>) -> Self {
        Self {
            source,
            detector: Arc::new(Mutex::new(StepDetector::new())),
            ledger,
            events,
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.source.is_supported()
    }

    /// Start consuming the motion feed.
    ///
    /// On platforms without one this is a no-op apart from announcing
    /// the sensor status; it is not an error.
    pub async fn start(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(NutrilensError::component(
                "step_tracker",
                "already running",
            ));
        }

        if !self.source.is_supported() {
            info!("Motion sensor unavailable, live step tracking disabled");
            self.running.store(false, Ordering::SeqCst);
            let _ = self
                .events
                .publish(NutrilensEvent::SensorStatusChanged {
                    supported: false,
                    timestamp: SystemTime::now(),
                })
                .await;
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        if let Err(e) = self.source.start(tx).await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let _ = self
            .events
            .publish(NutrilensEvent::SensorStatusChanged {
                supported: true,
                timestamp: SystemTime::now(),
            })
            .await;

        let detector = Arc::clone(&self.detector);
        let ledger = self.ledger.clone();
        let events = Arc::clone(&self.events);
        let running = Arc::clone(&self.running);
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            info!("Step tracking started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    maybe_event = rx.recv() => {
                        let Some(raw) = maybe_event else {
                            debug!("Motion stream ended");
                            break;
                        };

                        let sample = AccelerationSample::from(raw);
                        let new_total = {
                            let mut detector = detector.lock().await;
                            detector.process(&sample).then(|| detector.steps())
                        };

                        if let Some(total) = new_total {
                            Self::propagate(&ledger, &events, total).await;
                        }
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Step tracking stopped");
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the feed and the consume loop.
    pub async fn stop(&self) -> Result<()> {
        self.cancel.cancel();

        if let Err(e) = self.source.stop().await {
            warn!("Motion source did not stop cleanly: {}", e);
        }

        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Credit steps from outside the sample stream and propagate the new
    /// total exactly like a detected step.
    pub async fn inject_steps(&self, count: u64) -> u64 {
        let total = { self.detector.lock().await.inject_steps(count) };
        Self::propagate(&self.ledger, &self.events, total).await;
        total
    }

    pub async fn steps(&self) -> u64 {
        self.detector.lock().await.steps()
    }

    pub async fn burned_kcal(&self) -> u32 {
        self.detector.lock().await.burned_kcal()
    }

    async fn propagate(ledger: &LedgerHandle, events: &EventBus, total_steps: u64) {
        ledger
            .replace_burned(burned_for_steps(total_steps) as f64)
            .await;

        let _ = events
            .publish(NutrilensEvent::StepDetected {
                total_steps,
                timestamp: SystemTime::now(),
            })
            .await;
    }
}

/// Feeds a random trickle of steps into the tracker once per second,
/// standing in for a real walk during demos.
pub struct DemoStepDriver {
    tracker: StepTracker,
    step_min: u32,
    step_max: u32,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DemoStepDriver {
    const TICK: Duration = Duration::from_secs(1);

    pub fn new(tracker: StepTracker, step_min: u32, step_max: u32) -> Self {
        Self {
            tracker,
            step_min: step_min.max(1),
            step_max: step_max.max(step_min.max(1)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub async fn start(&self) {
        let tracker = self.tracker.clone();
        let cancel = self.cancel.clone();
        let (low, high) = (self.step_min as u64, self.step_max as u64);

        info!("Demo step driver started ({}..={} steps/s)", low, high);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Self::TICK);
            let mut rng = StdRng::from_entropy();
            // Skip the immediate first tick so the first burst lands
            // after a full period
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let burst = rng.gen_range(low..=high);
                        tracker.inject_steps(burst).await;
                    }
                }
            }
        });

        *self.task.lock().await = Some(handle);
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("Demo step driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DietPreset, EnergyLedger};
    use crate::motion::source::{ScriptedMotionSource, UnsupportedMotionSource};

    fn test_harness() -> (LedgerHandle, Arc<EventBus>) {
        let events = Arc::new(EventBus::new(64));
        let (ledger, _rx) = EnergyLedger::new(DietPreset::Maintenance, 2450.0);
        (LedgerHandle::new(ledger, Arc::clone(&events)), events)
    }

    async fn wait_for_steps(tracker: &StepTracker, expected: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if tracker.steps().await == expected {
                return;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "expected {} steps, saw {}",
                    expected,
                    tracker.steps().await
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_scripted_walk_counts_steps_and_credits_ledger() {
        let (ledger, events) = test_harness();
        let source = Arc::new(ScriptedMotionSource::from_axes(&[
            (0.0, 0.0),
            (15.0, 0.0),
            (15.0, 0.0),
            (0.0, 0.0),
        ]));
        let tracker = StepTracker::new(source, ledger.clone(), Arc::clone(&events));

        tracker.start().await.unwrap();
        // Spikes at samples two and four
        wait_for_steps(&tracker, 2).await;
        tracker.stop().await.unwrap();

        // 2 steps at 0.04 kcal each rounds to zero whole kcal
        assert_eq!(ledger.snapshot().await.burned, 0.0);
    }

    #[tokio::test]
    async fn test_injected_steps_update_ledger_and_publish() {
        let (ledger, events) = test_harness();
        let mut receiver = events.subscribe();
        let source = Arc::new(ScriptedMotionSource::from_axes(&[]));
        let tracker = StepTracker::new(source, ledger.clone(), Arc::clone(&events));

        let total = tracker.inject_steps(250).await;
        assert_eq!(total, 250);

        // 250 steps at 0.04 kcal each
        assert_eq!(ledger.snapshot().await.burned, 10.0);

        let mut saw_step_event = false;
        while let Ok(event) = receiver.try_recv() {
            if let NutrilensEvent::StepDetected { total_steps, .. } = event {
                assert_eq!(total_steps, 250);
                saw_step_event = true;
            }
        }
        assert!(saw_step_event);
    }

    #[tokio::test]
    async fn test_unsupported_source_reports_and_stays_idle() {
        let (ledger, events) = test_harness();
        let mut receiver = events.subscribe();
        let tracker = StepTracker::new(
            Arc::new(UnsupportedMotionSource),
            ledger.clone(),
            Arc::clone(&events),
        );

        tracker.start().await.unwrap();

        match receiver.recv().await.unwrap() {
            NutrilensEvent::SensorStatusChanged { supported, .. } => assert!(!supported),
            other => panic!("Unexpected event: {:?}", other.event_type()),
        }
        assert_eq!(tracker.steps().await, 0);

        // Injection still works without a live feed
        tracker.inject_steps(5).await;
        assert_eq!(tracker.steps().await, 5);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let (ledger, events) = test_harness();
        let source = Arc::new(crate::motion::source::SimulatedMotionSource::new(10));
        let tracker = StepTracker::new(source, ledger, events);

        tracker.start().await.unwrap();
        assert!(tracker.start().await.is_err());
        tracker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_demo_driver_injects_bursts() {
        let (ledger, events) = test_harness();
        let source = Arc::new(ScriptedMotionSource::from_axes(&[]));
        let tracker = StepTracker::new(source, ledger, events);
        let driver = DemoStepDriver::new(tracker.clone(), 2, 4);

        driver.start().await;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            if tracker.steps().await >= 2 {
                break;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("demo driver produced no steps");
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        driver.stop().await;

        let settled = tracker.steps().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.steps().await, settled);
    }
}
