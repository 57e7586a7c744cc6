use serde::{Deserialize, Serialize};

/// Macro-nutrient profile per 100 g of a recognized food.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionPer100g {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
}

/// Whole-meal nutrient totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionSummary {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
}

/// One recognized food inside a [`MealAnalysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFood {
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub confidence: f64,
    /// Present when the service itemized the food against its database.
    pub nutrition_per_100g: Option<NutritionPer100g>,
    /// Suggested portion weight, present alongside per-100 g data.
    pub default_portion_weight_g: Option<f64>,
    /// Free-text portion description from summary-style responses.
    pub portion_label: Option<String>,
}

impl DetectedFood {
    /// Calories for the suggested portion, when per-100 g data is present.
    pub fn portion_calories(&self) -> Option<f64> {
        let per_100g = self.nutrition_per_100g?;
        let weight_g = self.default_portion_weight_g?;
        Some(per_100g.calories * weight_g / 100.0)
    }
}

/// Canonical result of a meal photo analysis.
///
/// The service answers in one of two shapes depending on its recognition
/// path. Both decode through [`wire::AnalyzeResponse`] and normalize into
/// this envelope so nothing downstream branches on the wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealAnalysis {
    pub foods: Vec<DetectedFood>,
    pub total_nutrition: NutritionSummary,
    #[serde(default)]
    pub health_warnings: Vec<String>,
    #[serde(default)]
    pub dietary_advice: Option<String>,
}

impl MealAnalysis {
    /// The first recognized food, which seeds the editable draft.
    pub fn primary(&self) -> Option<&DetectedFood> {
        self.foods.first()
    }

    pub fn has_foods(&self) -> bool {
        !self.foods.is_empty()
    }

    /// Calorie value used to seed the editable field of a scan draft.
    ///
    /// Prefers the primary food's per-100 g data scaled to its suggested
    /// portion; falls back to the envelope totals when the response only
    /// carried a summary.
    pub fn calorie_seed(&self) -> f64 {
        self.primary()
            .and_then(|food| food.portion_calories())
            .unwrap_or(self.total_nutrition.calories)
    }

    /// Normalize a raw service response into the canonical envelope.
    pub fn from_wire(raw: wire::AnalyzeResponse) -> Self {
        match raw {
            wire::AnalyzeResponse::Itemized(body) => {
                let foods: Vec<DetectedFood> = body
                    .foods
                    .into_iter()
                    .map(|item| DetectedFood {
                        name: item.food_name,
                        quantity: item.quantity,
                        unit: item.unit,
                        confidence: item.confidence,
                        nutrition_per_100g: Some(item.nutrition_per_100g),
                        default_portion_weight_g: Some(item.default_portion.weight_g),
                        portion_label: item.default_portion.name,
                    })
                    .collect();

                // Itemized responses carry no totals, so derive them from
                // each food's suggested portion.
                let mut total = NutritionSummary::default();
                for food in &foods {
                    if let (Some(per_100g), Some(weight_g)) =
                        (food.nutrition_per_100g, food.default_portion_weight_g)
                    {
                        let scale = weight_g / 100.0;
                        total.calories += per_100g.calories * scale;
                        total.protein_g += per_100g.protein_g * scale;
                        total.carbs_g += per_100g.carbs_g * scale;
                        total.fat_g += per_100g.fat_g * scale;
                        total.sugar_g += per_100g.sugar_g * scale;
                    }
                }

                Self {
                    foods,
                    total_nutrition: total,
                    health_warnings: Vec::new(),
                    dietary_advice: None,
                }
            }
            wire::AnalyzeResponse::Summary(body) => Self {
                foods: body
                    .food_items
                    .into_iter()
                    .map(|item| DetectedFood {
                        name: item.name,
                        quantity: 0.0,
                        unit: String::new(),
                        confidence: 0.0,
                        nutrition_per_100g: None,
                        default_portion_weight_g: None,
                        portion_label: item.portion_size,
                    })
                    .collect(),
                total_nutrition: body.total_nutrition,
                health_warnings: body.health_warnings,
                dietary_advice: body.dietary_advice,
            },
        }
    }
}

/// Raw analyze-endpoint shapes as the service sends them.
pub mod wire {
    use super::{NutritionPer100g, NutritionSummary};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct DefaultPortion {
        #[serde(default)]
        pub name: Option<String>,
        pub weight_g: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ItemizedFood {
        pub food_name: String,
        #[serde(default)]
        pub quantity: f64,
        #[serde(default)]
        pub unit: String,
        #[serde(default)]
        pub confidence: f64,
        pub nutrition_per_100g: NutritionPer100g,
        pub default_portion: DefaultPortion,
    }

    #[derive(Debug, Deserialize)]
    pub struct ItemizedResponse {
        pub foods: Vec<ItemizedFood>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SummaryFoodItem {
        pub name: String,
        #[serde(default)]
        pub portion_size: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SummaryResponse {
        pub food_items: Vec<SummaryFoodItem>,
        pub total_nutrition: NutritionSummary,
        #[serde(default)]
        pub health_warnings: Vec<String>,
        #[serde(default)]
        pub dietary_advice: Option<String>,
    }

    /// The two shapes the analyze endpoint is known to answer with.
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    pub enum AnalyzeResponse {
        Itemized(ItemizedResponse),
        Summary(SummaryResponse),
    }
}

/// Traffic-light color of an adaptive advice report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AdviceColor {
    Green,
    Orange,
    Red,
    Gray,
}

impl AdviceColor {
    /// Unknown colors render the same as the neutral one.
    pub fn from_name(name: &str) -> Self {
        match name {
            "green" => Self::Green,
            "orange" => Self::Orange,
            "red" => Self::Red,
            _ => Self::Gray,
        }
    }
}

impl From<String> for AdviceColor {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

/// Adaptive advice computed by the service from current ledger values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceReport {
    pub color: AdviceColor,
    pub status: String,
    pub recommendation: String,
    /// Display string, e.g. "1800 kcal". Kept opaque on purpose.
    #[serde(default)]
    pub limit: String,
    /// Display string, e.g. "450 kcal left". Kept opaque on purpose.
    #[serde(default)]
    pub remaining: String,
}

/// A portion option for a catalog food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortionRecord {
    pub id: i64,
    pub name: String,
    pub weight_g: f64,
}

/// A food in the service catalog, used by manual entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub portions: Vec<PortionRecord>,
}

/// Verdict class of a manual food check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Red,
    Yellow,
    Green,
}

/// Result of checking one portion of a catalog food against the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodCheck {
    pub calories: f64,
    pub recommendation: String,
    pub traffic_light: TrafficLight,
    #[serde(default)]
    pub context_message: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Severity of a service-issued health alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    /// Unknown severities render the same as informational ones.
    pub fn from_name(name: &str) -> Self {
        match name {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl From<String> for AlertSeverity {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

/// A health alert raised by the service from recent intake patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: AlertSeverity,
    pub message: String,
    /// Lab tests the service suggests discussing with a doctor.
    #[serde(default, rename = "tests")]
    pub suggested_tests: Vec<String>,
}

/// The stored user profile, sent along with analysis and check requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub activity_level: String,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub daily_steps: u32,
    #[serde(default)]
    pub diet_preset: crate::ledger::DietPreset,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: 0,
            gender: String::new(),
            height_cm: 0.0,
            weight_kg: 0.0,
            activity_level: String::new(),
            medical_conditions: Vec::new(),
            daily_steps: 0,
            diet_preset: crate::ledger::DietPreset::Maintenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itemized_response_normalizes() {
        let body = r#"{
            "foods": [{
                "food_name": "Grilled Chicken Breast",
                "quantity": 1,
                "unit": "piece",
                "confidence": 0.92,
                "nutrition_per_100g": {
                    "calories": 165,
                    "protein_g": 31,
                    "carbs_g": 0,
                    "fat_g": 3.6
                },
                "default_portion": { "name": "1 breast", "weight_g": 150 }
            }]
        }"#;

        let raw: wire::AnalyzeResponse = serde_json::from_str(body).unwrap();
        let analysis = MealAnalysis::from_wire(raw);

        assert!(analysis.has_foods());
        let primary = analysis.primary().unwrap();
        assert_eq!(primary.name, "Grilled Chicken Breast");
        assert_eq!(primary.default_portion_weight_g, Some(150.0));

        // 165 kcal per 100 g at a 150 g portion
        assert_eq!(analysis.calorie_seed(), 247.5);
        assert_eq!(analysis.total_nutrition.calories, 247.5);
        assert_eq!(analysis.total_nutrition.protein_g, 46.5);
    }

    #[test]
    fn test_summary_response_normalizes() {
        let body = r#"{
            "food_items": [
                { "name": "Caesar Salad", "portion_size": "1 bowl" },
                { "name": "Garlic Bread" }
            ],
            "total_nutrition": {
                "calories": 520,
                "protein_g": 18,
                "carbs_g": 42,
                "fat_g": 30,
                "sugar_g": 4
            },
            "health_warnings": ["High in saturated fat"],
            "dietary_advice": "Consider a lighter dressing."
        }"#;

        let raw: wire::AnalyzeResponse = serde_json::from_str(body).unwrap();
        let analysis = MealAnalysis::from_wire(raw);

        assert_eq!(analysis.foods.len(), 2);
        assert_eq!(analysis.foods[0].portion_label.as_deref(), Some("1 bowl"));
        assert!(analysis.foods[0].nutrition_per_100g.is_none());

        // No per-portion data, so the seed falls back to the totals
        assert_eq!(analysis.calorie_seed(), 520.0);
        assert_eq!(analysis.health_warnings.len(), 1);
    }

    #[test]
    fn test_empty_itemized_response_has_no_foods() {
        let raw: wire::AnalyzeResponse = serde_json::from_str(r#"{ "foods": [] }"#).unwrap();
        let analysis = MealAnalysis::from_wire(raw);

        assert!(!analysis.has_foods());
        assert_eq!(analysis.calorie_seed(), 0.0);
    }

    #[test]
    fn test_advice_color_tolerates_unknown_values() {
        let report: AdviceReport = serde_json::from_str(
            r#"{
                "color": "purple",
                "status": "On track",
                "recommendation": "Keep it up"
            }"#,
        )
        .unwrap();

        assert_eq!(report.color, AdviceColor::Gray);
        assert_eq!(report.limit, "");
    }

    #[test]
    fn test_alert_decodes_with_renamed_kind() {
        let alert: HealthAlert = serde_json::from_str(
            r#"{
                "id": 3,
                "type": "low_calorie_intake",
                "severity": "medium",
                "message": "Calorie intake has been very low for 3 days.",
                "tests": ["Vitamin B12", "Iron"]
            }"#,
        )
        .unwrap();

        assert_eq!(alert.kind, "low_calorie_intake");
        assert_eq!(alert.severity, AlertSeverity::Medium);
        assert_eq!(alert.suggested_tests.len(), 2);
    }

    #[test]
    fn test_profile_round_trips_preset_name() {
        let profile = UserProfile {
            age: 34,
            weight_kg: 70.0,
            diet_preset: crate::ledger::DietPreset::Diabetic,
            ..UserProfile::default()
        };

        let encoded = serde_json::to_string(&profile).unwrap();
        assert!(encoded.contains("\"diet_preset\":\"diabetic\""));

        let decoded: UserProfile = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, profile);
    }
}
