use crate::motion::source::AccelerationSample;

/// Combined axis delta that registers as one step.
pub const STEP_DELTA_THRESHOLD: f64 = 10.0;

/// Kilocalories credited per detected step.
pub const KCAL_PER_STEP: f64 = 0.04;

/// MET value used for manually logged walks.
pub const WALK_MET: f64 = 3.5;

/// Reference body weight for the manual walk estimate, in kilograms.
pub const REFERENCE_WEIGHT_KG: f64 = 70.0;

/// Threshold step detector over vertical and depth acceleration.
///
/// Each sample is compared against the previous one; when the summed
/// per-axis change exceeds the threshold, one step is counted. The
/// previous sample always advances, even when no step registers, so the
/// count depends on sample order and a strong jolt can read as a step.
/// That is the accepted trade-off of this detector.
#[derive(Debug, Default)]
pub struct StepDetector {
    last_y: f64,
    last_z: f64,
    steps: u64,
}

impl StepDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. Returns true when it registered a step.
    pub fn process(&mut self, sample: &AccelerationSample) -> bool {
        let delta = (sample.y - self.last_y).abs() + (sample.z - self.last_z).abs();
        let stepped = delta > STEP_DELTA_THRESHOLD;

        if stepped {
            self.steps += 1;
        }

        self.last_y = sample.y;
        self.last_z = sample.z;

        stepped
    }

    /// Credit steps that came from outside the sample stream, e.g. the
    /// demo driver. Returns the new total.
    pub fn inject_steps(&mut self, count: u64) -> u64 {
        self.steps += count;
        self.steps
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn burned_kcal(&self) -> u32 {
        burned_for_steps(self.steps)
    }
}

/// Whole-kilocalorie activity credit for a step total.
pub fn burned_for_steps(steps: u64) -> u32 {
    (steps as f64 * KCAL_PER_STEP).round() as u32
}

/// Whole-kilocalorie estimate for a manually logged walk.
pub fn burned_for_walk_minutes(minutes: f64) -> u32 {
    (WALK_MET * REFERENCE_WEIGHT_KG * minutes / 60.0).round() as u32
}
