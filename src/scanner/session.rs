use crate::api::types::MealAnalysis;
use crate::error::{ApiError, NutrilensError, Result, ScanError};
use crate::events::{EventBus, NutrilensEvent};
use crate::scanner::camera::CameraSource;
use crate::scanner::state::{ConfirmedMeal, MealDraft, ScanPhase, ScanState};
use crate::scanner::still::StillImage;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One run of the meal-scan workflow.
///
/// The session is the single holder of its camera source and the only
/// writer of its state. Every transition advances an epoch counter;
/// async completions carry the epoch they started under and are dropped
/// when it no longer matches, so a closed or retaken session cannot be
/// overwritten by a late analysis result.
pub struct ScanSession {
    id: Uuid,
    camera: Box<dyn CameraSource>,
    jpeg_quality: u8,
    state: ScanState,
    epoch: u64,
    events: Arc<EventBus>,
}

impl ScanSession {
    pub fn new(camera: Box<dyn CameraSource>, jpeg_quality: u8, events: Arc<EventBus>) -> Self {
        Self {
            id: Uuid::new_v4(),
            camera,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            state: ScanState::Closed,
            epoch: 0,
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> ScanPhase {
        self.state.phase()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// The inline error currently shown, if any.
    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    pub fn draft(&self) -> Option<&MealDraft> {
        self.state.draft()
    }

    pub fn still(&self) -> Option<&StillImage> {
        self.state.still()
    }

    /// Whether the camera device is currently held.
    pub fn camera_open(&self) -> bool {
        self.camera.is_open()
    }

    /// Start (or retry) the camera phase.
    ///
    /// A denied or failed acquisition is not an operation error: the
    /// session stays in the camera phase with an inline message and the
    /// user retries from there.
    pub async fn open(&mut self) -> Result<()> {
        match self.state {
            ScanState::Closed => {
                // A fresh workflow run gets a fresh identity
                self.id = Uuid::new_v4();
            }
            ScanState::Camera { .. } => {}
            _ => return Err(self.invalid("open")),
        }

        let next = self.acquire_camera().await;
        self.transition(next).await;
        Ok(())
    }

    /// Freeze the live view into a still and release the camera.
    pub async fn capture(&mut self) -> Result<()> {
        if !matches!(self.state, ScanState::Camera { .. }) {
            return Err(self.invalid("capture"));
        }

        let frame = match self.camera.grab_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                let message = camera_failure_text(&e);
                self.transition(ScanState::Camera {
                    error: Some(message),
                })
                .await;
                return Ok(());
            }
        };

        let still = match StillImage::from_frame(&frame, self.jpeg_quality) {
            Ok(still) => still,
            Err(e) => {
                warn!("Still encoding failed: {}", e);
                let message = camera_failure_text(&e);
                self.transition(ScanState::Camera {
                    error: Some(message),
                })
                .await;
                return Ok(());
            }
        };

        // The live stream has served its purpose; release the device
        // before showing the frozen preview.
        self.camera.close().await;
        info!("Captured {} byte still, camera released", still.len());

        self.transition(ScanState::Preview { still, error: None }).await;
        Ok(())
    }

    /// Throw the current still (or result) away and go back to the live
    /// camera.
    pub async fn retake(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            ScanState::Preview { .. } | ScanState::Result { .. }
        ) {
            return Err(self.invalid("retake"));
        }

        let next = self.acquire_camera().await;
        self.transition(next).await;
        Ok(())
    }

    /// Move from preview into analysis.
    ///
    /// Returns the still to upload and the epoch the request runs under;
    /// the caller hands both back through [`complete_analysis`].
    ///
    /// [`complete_analysis`]: ScanSession::complete_analysis
    pub async fn begin_analysis(&mut self) -> Result<(StillImage, u64)> {
        let still = match &self.state {
            ScanState::Preview { still, .. } => still.clone(),
            _ => return Err(self.invalid("analyze")),
        };

        self.transition(ScanState::Analyzing {
            still: still.clone(),
        })
        .await;

        Ok((still, self.epoch))
    }

    /// Land an analysis outcome started under `epoch`.
    ///
    /// Stale completions (the session moved on in the meantime) are
    /// dropped silently; this is the normal fate of a request whose
    /// session was closed mid-flight.
    pub async fn complete_analysis(&mut self, epoch: u64, outcome: Result<MealAnalysis>) {
        if epoch != self.epoch {
            debug!(
                "Dropping analysis outcome from epoch {} (session is at {})",
                epoch, self.epoch
            );
            return;
        }

        let still = match std::mem::replace(&mut self.state, ScanState::Closed) {
            ScanState::Analyzing { still } => still,
            other => {
                self.state = other;
                debug!("Dropping analysis outcome, session is not analyzing");
                return;
            }
        };
        // State is a placeholder from here until the transition below.

        match outcome {
            Ok(analysis) if analysis.has_foods() => {
                let draft = MealDraft::from_analysis(&analysis);
                info!(
                    "Analysis recognized {} food(s), primary '{}'",
                    analysis.foods.len(),
                    draft.name
                );
                self.transition(ScanState::Result {
                    still,
                    analysis,
                    draft,
                })
                .await;
            }
            Ok(_) => {
                info!("Analysis found no foods, returning to preview");
                self.transition(ScanState::Preview {
                    still,
                    error: Some(ScanError::NoFoodDetected.to_string()),
                })
                .await;
            }
            Err(error) => {
                warn!("Analysis failed: {}", error);
                let message = match &error {
                    NutrilensError::Api(ApiError::Status { .. }) => {
                        "Server analysis failed".to_string()
                    }
                    other => other.to_string(),
                };
                self.transition(ScanState::Preview {
                    still,
                    error: Some(message),
                })
                .await;
            }
        }
    }

    /// Rename the draft meal. Only legal while a result is shown.
    pub fn set_meal_name(&mut self, name: impl Into<String>) -> Result<()> {
        if let ScanState::Result { draft, .. } = &mut self.state {
            draft.name = name.into();
            return Ok(());
        }
        Err(self.invalid("edit"))
    }

    /// Adjust the draft calories. Only legal while a result is shown.
    pub fn set_calories(&mut self, calories: f64) -> Result<()> {
        if let ScanState::Result { draft, .. } = &mut self.state {
            if calories < 0.0 {
                warn!("Ignoring negative calorie edit: {}", calories);
            } else {
                draft.calories = calories;
            }
            return Ok(());
        }
        Err(self.invalid("edit"))
    }

    /// Accept the draft as shown and end the session.
    pub async fn confirm(&mut self) -> Result<ConfirmedMeal> {
        let phase_before = self.phase();
        match std::mem::replace(&mut self.state, ScanState::Closed) {
            ScanState::Result {
                analysis, draft, ..
            } => {
                self.camera.close().await;
                self.epoch += 1;
                info!(
                    "Scan {} confirmed: {} ({:.0} kcal)",
                    self.id, draft.name, draft.calories
                );
                self.publish_phase(ScanPhase::Closed).await;

                Ok(ConfirmedMeal {
                    name: draft.name,
                    calories: draft.calories,
                    nutrition: analysis.total_nutrition,
                    confirmed_at: SystemTime::now(),
                })
            }
            other => {
                self.state = other;
                Err(NutrilensError::Scan(ScanError::InvalidTransition {
                    action: "confirm",
                    state: phase_before.as_str(),
                }))
            }
        }
    }

    /// Abandon the session from any phase. Always releases the camera
    /// and invalidates in-flight work; closing twice is quiet.
    pub async fn close(&mut self) {
        self.camera.close().await;

        if matches!(self.state, ScanState::Closed) {
            return;
        }

        info!("Scan {} closed from {} phase", self.id, self.phase().as_str());
        self.transition(ScanState::Closed).await;
    }

    async fn acquire_camera(&mut self) -> ScanState {
        match self.camera.open().await {
            Ok(()) => ScanState::Camera { error: None },
            Err(e) => {
                warn!("Camera acquisition failed: {}", e);
                ScanState::Camera {
                    error: Some(camera_failure_text(&e)),
                }
            }
        }
    }

    async fn transition(&mut self, next: ScanState) {
        let phase_changed = self.state.phase() != next.phase();
        let phase = next.phase();

        self.epoch += 1;
        self.state = next;

        if phase_changed {
            debug!(
                "Scan {} entered {} phase (epoch {})",
                self.id,
                phase.as_str(),
                self.epoch
            );
            self.publish_phase(phase).await;
        }
    }

    async fn publish_phase(&self, phase: ScanPhase) {
        let _ = self
            .events
            .publish(NutrilensEvent::ScanPhaseChanged {
                session_id: self.id,
                phase,
                timestamp: SystemTime::now(),
            })
            .await;
    }

    fn invalid(&self, action: &'static str) -> NutrilensError {
        ScanError::InvalidTransition {
            action,
            state: self.phase().as_str(),
        }
        .into()
    }
}

/// Inline text for a failed camera operation. The permission message is
/// the one users know from the browser build.
fn camera_failure_text(error: &NutrilensError) -> String {
    match error {
        NutrilensError::Camera(e) => e.to_string(),
        other => other.to_string(),
    }
}
