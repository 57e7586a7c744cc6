use crate::api::types::AdviceReport;
use crate::api::NutritionClient;
use crate::error::{NutrilensError, Result};
use crate::events::{EventBus, NutrilensEvent};
use crate::ledger::LedgerSnapshot;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Quiet period after the last ledger change before advice is requested.
const ADVICE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Where adaptive advice comes from. The live implementation is
/// [`NutritionClient`].
#[async_trait]
pub trait AdviceBackend: Send + Sync {
    async fn fetch_advice(&self, consumed: f64, burned: f64, water: f64) -> Result<AdviceReport>;
}

#[async_trait]
impl AdviceBackend for NutritionClient {
    async fn fetch_advice(&self, consumed: f64, burned: f64, water: f64) -> Result<AdviceReport> {
        Ok(self.adaptive_advice(consumed, burned, water).await?)
    }
}

/// Keeps adaptive advice in step with the energy ledger.
///
/// Ledger changes arrive through a watch channel. Each burst of changes
/// is coalesced behind a trailing debounce window, then a single advice
/// request goes out for the settled values. Every observed change bumps
/// a generation counter; a response only commits when the generation it
/// was requested under is still current, so advice can never regress to
/// values the ledger has already moved past.
///
/// A failed request keeps the previous advice and is not retried; the
/// next ledger change schedules the next attempt.
pub struct AdviceRequester {
    backend: Arc<dyn AdviceBackend>,
    events: Arc<EventBus>,
    latest: Arc<RwLock<Option<AdviceReport>>>,
    generation: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AdviceRequester {
    pub fn new(backend: Arc<dyn AdviceBackend>, events: Arc<EventBus>) -> Self {
        Self {
            backend,
            events,
            latest: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Start watching the ledger.
    pub async fn start(&self, snapshots: watch::Receiver<LedgerSnapshot>) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(NutrilensError::component("advice", "already running"));
        }

        let backend = Arc::clone(&self.backend);
        let events = Arc::clone(&self.events);
        let latest = Arc::clone(&self.latest);
        let generation = Arc::clone(&self.generation);
        let running = Arc::clone(&self.running);
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            info!("Advice requester started");
            Self::run(snapshots, backend, events, latest, generation, cancel).await;
            running.store(false, Ordering::SeqCst);
            info!("Advice requester stopped");
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// The most recently committed advice, if any request has succeeded.
    pub async fn current(&self) -> Option<AdviceReport> {
        self.latest.read().await.clone()
    }

    async fn run(
        mut snapshots: watch::Receiver<LedgerSnapshot>,
        backend: Arc<dyn AdviceBackend>,
        events: Arc<EventBus>,
        latest: Arc<RwLock<Option<AdviceReport>>>,
        generation: Arc<AtomicU64>,
        cancel: CancellationToken,
    ) {
        'idle: loop {
            // Sleep until the ledger moves at all.
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        debug!("Ledger channel closed, advice requester exiting");
                        return;
                    }
                }
            }
            generation.fetch_add(1, Ordering::SeqCst);

            'debounce: loop {
                // Trailing window: every further change restarts it.
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        changed = snapshots.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            generation.fetch_add(1, Ordering::SeqCst);
                        }
                        _ = tokio::time::sleep(ADVICE_DEBOUNCE) => break,
                    }
                }

                let snapshot = *snapshots.borrow_and_update();
                let requested_generation = generation.load(Ordering::SeqCst);
                debug!(
                    "Requesting advice (generation {}): consumed {:.0}, burned {:.0}, water {:.0}",
                    requested_generation, snapshot.consumed, snapshot.burned, snapshot.water
                );

                let fetch = backend.fetch_advice(snapshot.consumed, snapshot.burned, snapshot.water);
                tokio::pin!(fetch);

                // Changes arriving while the request is in flight both
                // invalidate its result and queue another round.
                let mut superseded = false;
                let outcome = loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        changed = snapshots.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            generation.fetch_add(1, Ordering::SeqCst);
                            superseded = true;
                        }
                        outcome = &mut fetch => break outcome,
                    }
                };

                if generation.load(Ordering::SeqCst) != requested_generation {
                    debug!(
                        "Discarding advice for stale generation {}",
                        requested_generation
                    );
                } else {
                    match outcome {
                        Ok(report) => {
                            info!("Advice committed: {}", report.status);
                            let _ = events
                                .publish(NutrilensEvent::AdviceUpdated {
                                    color: report.color,
                                    status: report.status.clone(),
                                    timestamp: SystemTime::now(),
                                })
                                .await;
                            *latest.write().await = Some(report);
                        }
                        Err(e) => {
                            warn!("Advice request failed: {}", e);
                        }
                    }
                }

                if superseded {
                    continue 'debounce;
                }
                continue 'idle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::AdviceColor;
    use crate::error::ApiError;
    use std::sync::Mutex as StdMutex;

    struct MockBackend {
        calls: StdMutex<Vec<(f64, f64, f64)>>,
        delay: Duration,
        fail: AtomicBool,
    }

    impl MockBackend {
        fn new() -> Arc<Self> {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                delay,
                fail: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> Vec<(f64, f64, f64)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AdviceBackend for MockBackend {
        async fn fetch_advice(
            &self,
            consumed: f64,
            burned: f64,
            water: f64,
        ) -> Result<AdviceReport> {
            self.calls.lock().unwrap().push((consumed, burned, water));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(NutrilensError::Api(ApiError::Status {
                    endpoint: "/api/adaptive_advice",
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                }));
            }
            Ok(AdviceReport {
                color: AdviceColor::Green,
                status: format!("{:.0} kcal consumed", consumed),
                recommendation: "Keep it up".to_string(),
                limit: String::new(),
                remaining: String::new(),
            })
        }
    }

    fn snap(consumed: f64) -> LedgerSnapshot {
        LedgerSnapshot {
            consumed,
            burned: 0.0,
            water: 0.0,
            goal: 2000.0,
        }
    }

    fn test_requester(backend: Arc<MockBackend>) -> (AdviceRequester, watch::Sender<LedgerSnapshot>) {
        let events = Arc::new(EventBus::new(16));
        let requester = AdviceRequester::new(backend, events);
        let (tx, _) = watch::channel(snap(0.0));
        (requester, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_coalesce_into_one_request() {
        let backend = MockBackend::new();
        let (requester, tx) = test_requester(Arc::clone(&backend));
        requester.start(tx.subscribe()).await.unwrap();

        for consumed in [100.0, 250.0, 400.0] {
            tx.send_replace(snap(consumed));
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        tokio::time::sleep(Duration::from_millis(1200)).await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1, "three rapid changes must yield one request");
        assert_eq!(calls[0].0, 400.0, "the settled values win");

        let advice = requester.current().await.unwrap();
        assert_eq!(advice.status, "400 kcal consumed");
        requester.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_flight_discards_the_response() {
        let backend = MockBackend::with_delay(Duration::from_millis(500));
        let (requester, tx) = test_requester(Arc::clone(&backend));
        requester.start(tx.subscribe()).await.unwrap();

        tx.send_replace(snap(100.0));
        // Past the debounce and into the in-flight request
        tokio::time::sleep(Duration::from_millis(1200)).await;
        tx.send_replace(snap(200.0));
        tokio::time::sleep(Duration::from_millis(400)).await;

        // The first response has landed by now and must not have stuck
        assert!(requester.current().await.is_none());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, 200.0);

        let advice = requester.current().await.unwrap();
        assert_eq!(advice.status, "200 kcal consumed");
        requester.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_request_keeps_previous_advice() {
        let backend = MockBackend::new();
        let (requester, tx) = test_requester(Arc::clone(&backend));
        requester.start(tx.subscribe()).await.unwrap();

        tx.send_replace(snap(300.0));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(requester.current().await.unwrap().status, "300 kcal consumed");

        backend.fail.store(true, Ordering::SeqCst);
        tx.send_replace(snap(500.0));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // One request per settled burst, no retry in between
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(
            requester.current().await.unwrap().status,
            "300 kcal consumed",
            "stale-but-valid advice beats no advice"
        );
        requester.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_ledger_requests_nothing() {
        let backend = MockBackend::new();
        let (requester, tx) = test_requester(Arc::clone(&backend));
        requester.start(tx.subscribe()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(backend.calls().is_empty());
        assert!(requester.current().await.is_none());

        drop(tx);
        requester.stop().await;
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let backend = MockBackend::new();
        let (requester, tx) = test_requester(backend);
        requester.start(tx.subscribe()).await.unwrap();
        assert!(requester.start(tx.subscribe()).await.is_err());
        requester.stop().await;
    }
}
