use crate::error::{Result, SensorError};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A motion reading as the platform delivers it. Axes can be absent on
/// devices that only report some of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMotionEvent {
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub timestamp: SystemTime,
}

/// A normalized reading with missing axes coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationSample {
    pub y: f64,
    pub z: f64,
    pub timestamp: SystemTime,
}

impl From<RawMotionEvent> for AccelerationSample {
    fn from(event: RawMotionEvent) -> Self {
        Self {
            y: event.y.unwrap_or(0.0),
            z: event.z.unwrap_or(0.0),
            timestamp: event.timestamp,
        }
    }
}

/// A source of device motion readings.
///
/// Implementations deliver raw events into the channel handed to
/// [`start`](MotionSource::start) until stopped or the receiver goes
/// away. A source that reports `is_supported() == false` never delivers
/// anything and fails `start`.
#[async_trait]
pub trait MotionSource: Send + Sync {
    /// Whether this platform can deliver motion events at all.
    fn is_supported(&self) -> bool;

    /// Begin delivering raw events into `tx`.
    async fn start(&self, tx: mpsc::Sender<RawMotionEvent>) -> Result<()>;

    /// Stop delivering events and release the platform subscription.
    async fn stop(&self) -> Result<()>;
}

/// Synthetic accelerometer that looks like a person walking.
///
/// Most ticks emit gentle sway around rest; occasionally a heel-strike
/// spike large enough to cross the step threshold is injected.
pub struct SimulatedMotionSource {
    sample_rate_hz: u32,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedMotionSource {
    /// Average stride rate of the synthetic walker, in steps per second.
    const CADENCE_HZ: f64 = 1.8;

    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz: sample_rate_hz.max(1),
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MotionSource for SimulatedMotionSource {
    fn is_supported(&self) -> bool {
        true
    }

    async fn start(&self, tx: mpsc::Sender<RawMotionEvent>) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SensorError::AlreadyStarted.into());
        }

        info!(
            "Starting simulated motion source at {} Hz",
            self.sample_rate_hz
        );

        let running = Arc::clone(&self.running);
        let period = Duration::from_secs_f64(1.0 / self.sample_rate_hz as f64);
        let spike_chance = (Self::CADENCE_HZ / self.sample_rate_hz as f64).min(1.0);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut rng = StdRng::from_entropy();
            let mut y = 0.0_f64;
            let mut z = 9.81_f64;

            loop {
                interval.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if rng.gen_bool(spike_chance) {
                    // Heel strike: a jolt well past the step threshold
                    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    y += direction * rng.gen_range(11.0..16.0);
                } else {
                    // Sway back toward rest with light noise
                    y = y * 0.5 + rng.gen_range(-1.5..1.5);
                    z = 9.81 + rng.gen_range(-0.8..0.8);
                }

                let event = RawMotionEvent {
                    y: Some(y),
                    z: Some(z),
                    timestamp: SystemTime::now(),
                };

                if tx.send(event).await.is_err() {
                    debug!("Motion consumer dropped, stopping simulated source");
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("Simulated motion source stopped");
        Ok(())
    }
}

/// Replays a fixed list of readings, then ends the stream. Used by tests
/// and scripted demos.
pub struct ScriptedMotionSource {
    events: Mutex<Vec<RawMotionEvent>>,
}

impl ScriptedMotionSource {
    pub fn new(events: Vec<RawMotionEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    /// Build a script from bare axis pairs, stamping each with now.
    pub fn from_axes(axes: &[(f64, f64)]) -> Self {
        let events = axes
            .iter()
            .map(|&(y, z)| RawMotionEvent {
                y: Some(y),
                z: Some(z),
                timestamp: SystemTime::now(),
            })
            .collect();
        Self::new(events)
    }
}

#[async_trait]
impl MotionSource for ScriptedMotionSource {
    fn is_supported(&self) -> bool {
        true
    }

    async fn start(&self, tx: mpsc::Sender<RawMotionEvent>) -> Result<()> {
        let events = std::mem::take(&mut *self.events.lock().await);
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            // tx drops here and the consumer sees the stream end
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Stands in on platforms with no motion feed at all.
pub struct UnsupportedMotionSource;

#[async_trait]
impl MotionSource for UnsupportedMotionSource {
    fn is_supported(&self) -> bool {
        false
    }

    async fn start(&self, _tx: mpsc::Sender<RawMotionEvent>) -> Result<()> {
        Err(SensorError::Unsupported.into())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_axes_normalize_to_zero() {
        let raw = RawMotionEvent {
            y: None,
            z: Some(4.5),
            timestamp: SystemTime::now(),
        };

        let sample = AccelerationSample::from(raw);
        assert_eq!(sample.y, 0.0);
        assert_eq!(sample.z, 4.5);
    }

    #[tokio::test]
    async fn test_scripted_source_replays_and_closes() {
        let source = ScriptedMotionSource::from_axes(&[(1.0, 2.0), (3.0, 4.0)]);
        let (tx, mut rx) = mpsc::channel(8);

        source.start(tx).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.y, Some(1.0));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.z, Some(4.0));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_source_refuses_to_start() {
        let source = UnsupportedMotionSource;
        let (tx, _rx) = mpsc::channel(1);

        assert!(!source.is_supported());
        assert!(source.start(tx).await.is_err());
    }

    #[tokio::test]
    async fn test_simulated_source_rejects_double_start() {
        let source = SimulatedMotionSource::new(50);
        let (tx, mut rx) = mpsc::channel(64);

        source.start(tx.clone()).await.unwrap();
        assert!(source.start(tx).await.is_err());

        // It should actually produce samples
        let event = rx.recv().await.unwrap();
        assert!(event.y.is_some());

        source.stop().await.unwrap();
    }
}
