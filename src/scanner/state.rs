use crate::api::types::{MealAnalysis, NutritionSummary};
use crate::scanner::still::StillImage;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Workflow phase of a scan session, without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Camera,
    Preview,
    Analyzing,
    Result,
    Closed,
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanPhase::Camera => "camera",
            ScanPhase::Preview => "preview",
            ScanPhase::Analyzing => "analyzing",
            ScanPhase::Result => "result",
            ScanPhase::Closed => "closed",
        }
    }
}

/// The editable meal fields shown in the result phase.
///
/// Seeded from the analysis, then owned by the user until confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct MealDraft {
    pub name: String,
    pub calories: f64,
}

impl MealDraft {
    /// Seed the draft from a fresh analysis: the primary food's name and
    /// its portion calories, rounded to whole kcal.
    pub fn from_analysis(analysis: &MealAnalysis) -> Self {
        let name = analysis
            .primary()
            .map(|food| food.name.clone())
            .unwrap_or_default();

        Self {
            name,
            calories: analysis.calorie_seed().round(),
        }
    }
}

/// A confirmed meal leaving the scan workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedMeal {
    pub name: String,
    pub calories: f64,
    pub nutrition: NutritionSummary,
    pub confirmed_at: SystemTime,
}

/// The scan workflow state. Each variant carries exactly the data that
/// phase needs, so a phase cannot observe stale payloads from another.
#[derive(Debug)]
pub enum ScanState {
    /// Live camera view, possibly with an inline error after a denied
    /// or failed acquisition.
    Camera { error: Option<String> },
    /// A frozen still awaiting the user's decision, possibly with an
    /// inline error from a failed analysis.
    Preview {
        still: StillImage,
        error: Option<String>,
    },
    /// The still is on its way to the analysis service.
    Analyzing { still: StillImage },
    /// Analysis succeeded; the draft is open for edits.
    Result {
        still: StillImage,
        analysis: MealAnalysis,
        draft: MealDraft,
    },
    /// The session is over and holds nothing.
    Closed,
}

impl ScanState {
    pub fn phase(&self) -> ScanPhase {
        match self {
            ScanState::Camera { .. } => ScanPhase::Camera,
            ScanState::Preview { .. } => ScanPhase::Preview,
            ScanState::Analyzing { .. } => ScanPhase::Analyzing,
            ScanState::Result { .. } => ScanPhase::Result,
            ScanState::Closed => ScanPhase::Closed,
        }
    }

    /// The still visible in this phase, if any.
    pub fn still(&self) -> Option<&StillImage> {
        match self {
            ScanState::Preview { still, .. }
            | ScanState::Analyzing { still }
            | ScanState::Result { still, .. } => Some(still),
            ScanState::Camera { .. } | ScanState::Closed => None,
        }
    }

    /// The inline error shown in this phase, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            ScanState::Camera { error } | ScanState::Preview { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&MealDraft> {
        match self {
            ScanState::Result { draft, .. } => Some(draft),
            _ => None,
        }
    }
}
