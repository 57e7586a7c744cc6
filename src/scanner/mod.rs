mod camera;
mod orchestrator;
mod session;
mod state;
mod still;


pub use camera::{CameraFrame, CameraSource, DeniedCamera, PixelFormat, TestPatternCamera};
pub use orchestrator::ScanOrchestrator;
pub use session::ScanSession;
pub use state::{ConfirmedMeal, MealDraft, ScanPhase, ScanState};
pub use still::StillImage;
