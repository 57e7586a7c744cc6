use crate::api::types::{
    wire, AdviceReport, FoodCheck, FoodRecord, HealthAlert, MealAnalysis, UserProfile,
};
use crate::error::ApiError;
use crate::scanner::StillImage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

const ANALYZE_ENDPOINT: &str = "/api/analyze";
const ADVICE_ENDPOINT: &str = "/api/adaptive_advice";
const FOODS_ENDPOINT: &str = "/api/foods";
const CHECK_FOOD_ENDPOINT: &str = "/api/check_food";
const ALERTS_ENDPOINT: &str = "/api/alerts";
const RESOLVE_ALERT_ENDPOINT: &str = "/api/alerts/{id}/resolve";
const LOG_WEIGHT_ENDPOINT: &str = "/api/log/weight";

#[derive(Debug, Serialize)]
struct AdviceQuery {
    consumed: f64,
    burned: f64,
    water: f64,
}

#[derive(Debug, Serialize)]
struct CheckFoodQuery<'a> {
    food_id: i64,
    portion_weight_g: f64,
    user_profile: &'a UserProfile,
}

#[derive(Debug, Serialize)]
struct WeightEntry {
    weight_kg: f64,
}

/// HTTP client for the nutrition service.
///
/// Every call is single-flight: no retries, no backoff. Callers decide
/// whether a failure is worth surfacing or trying again.
pub struct NutritionClient {
    http: reqwest::Client,
    base_url: String,
}

impl NutritionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload a captured still for analysis.
    ///
    /// The image travels as a multipart `file` part with the stored
    /// profile serialized into a `user_data` text part, and the response
    /// is normalized into the canonical [`MealAnalysis`] envelope.
    pub async fn analyze_meal(
        &self,
        image: &StillImage,
        profile: &UserProfile,
    ) -> Result<MealAnalysis, ApiError> {
        let user_data = serde_json::to_string(profile).map_err(|e| ApiError::Encode {
            details: e.to_string(),
        })?;

        let file_part = reqwest::multipart::Part::bytes(image.jpeg.to_vec())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ApiError::Encode {
                details: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("user_data", user_data);

        debug!(
            "Uploading {} byte still to {}",
            image.jpeg.len(),
            ANALYZE_ENDPOINT
        );

        let response = self
            .http
            .post(self.url(ANALYZE_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ANALYZE_ENDPOINT,
                source,
            })?;

        let raw: wire::AnalyzeResponse = Self::decode(ANALYZE_ENDPOINT, response).await?;
        Ok(MealAnalysis::from_wire(raw))
    }

    /// Ask for fresh advice computed from the current ledger values.
    pub async fn adaptive_advice(
        &self,
        consumed: f64,
        burned: f64,
        water: f64,
    ) -> Result<AdviceReport, ApiError> {
        let response = self
            .http
            .post(self.url(ADVICE_ENDPOINT))
            .json(&AdviceQuery {
                consumed,
                burned,
                water,
            })
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ADVICE_ENDPOINT,
                source,
            })?;

        Self::decode(ADVICE_ENDPOINT, response).await
    }

    /// Fetch the food catalog used by manual entry.
    pub async fn list_foods(&self) -> Result<Vec<FoodRecord>, ApiError> {
        let response = self
            .http
            .get(self.url(FOODS_ENDPOINT))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: FOODS_ENDPOINT,
                source,
            })?;

        Self::decode(FOODS_ENDPOINT, response).await
    }

    /// Check one portion of a catalog food against the stored profile.
    pub async fn check_food(
        &self,
        food_id: i64,
        portion_weight_g: f64,
        profile: &UserProfile,
    ) -> Result<FoodCheck, ApiError> {
        let response = self
            .http
            .post(self.url(CHECK_FOOD_ENDPOINT))
            .json(&CheckFoodQuery {
                food_id,
                portion_weight_g,
                user_profile: profile,
            })
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: CHECK_FOOD_ENDPOINT,
                source,
            })?;

        Self::decode(CHECK_FOOD_ENDPOINT, response).await
    }

    /// Fetch currently open health alerts. The service answers with a
    /// bare array.
    pub async fn list_alerts(&self) -> Result<Vec<HealthAlert>, ApiError> {
        let response = self
            .http
            .get(self.url(ALERTS_ENDPOINT))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: ALERTS_ENDPOINT,
                source,
            })?;

        Self::decode(ALERTS_ENDPOINT, response).await
    }

    /// Tell the service an alert was acknowledged. The response body is
    /// ignored; only the status matters.
    pub async fn resolve_alert(&self, alert_id: i64) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/api/alerts/{}/resolve", alert_id)))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: RESOLVE_ALERT_ENDPOINT,
                source,
            })?;

        Self::expect_success(RESOLVE_ALERT_ENDPOINT, &response)
    }

    /// Record a fresh weight measurement so the service can re-run its
    /// safety checks.
    pub async fn log_weight(&self, weight_kg: f64) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(LOG_WEIGHT_ENDPOINT))
            .json(&WeightEntry { weight_kg })
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: LOG_WEIGHT_ENDPOINT,
                source,
            })?;

        Self::expect_success(LOG_WEIGHT_ENDPOINT, &response)
    }

    fn expect_success(endpoint: &'static str, response: &reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status { endpoint, status })
        }
    }

    async fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { endpoint, status });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        serde_json::from_str(&body).map_err(|e| {
            warn!("{} answered with an uninterpretable body: {}", endpoint, e);
            ApiError::MalformedResponse {
                endpoint,
                details: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = NutritionClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url(ALERTS_ENDPOINT), "http://localhost:8000/api/alerts");
    }

    #[test]
    fn test_advice_query_wire_shape() {
        let query = AdviceQuery {
            consumed: 1200.0,
            burned: 48.0,
            water: 750.0,
        };

        let encoded = serde_json::to_value(&query).unwrap();
        assert_eq!(encoded["consumed"], 1200.0);
        assert_eq!(encoded["burned"], 48.0);
        assert_eq!(encoded["water"], 750.0);
    }

    #[test]
    fn test_weight_entry_wire_shape() {
        let encoded = serde_json::to_value(WeightEntry { weight_kg: 71.5 }).unwrap();
        assert_eq!(encoded["weight_kg"], 71.5);
    }
}
