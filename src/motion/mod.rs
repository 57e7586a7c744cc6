mod detector;
mod source;
mod tracker;

pub use detector::{
    burned_for_steps, burned_for_walk_minutes, StepDetector, KCAL_PER_STEP, STEP_DELTA_THRESHOLD,
};
pub use source::{
    AccelerationSample, MotionSource, RawMotionEvent, ScriptedMotionSource, SimulatedMotionSource,
    UnsupportedMotionSource,
};
pub use tracker::{DemoStepDriver, StepTracker};
