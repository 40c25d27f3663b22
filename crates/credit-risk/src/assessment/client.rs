use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mapping::ServicePayload;
use crate::config::PredictionServiceConfig;

const BODY_SNIPPET_LIMIT: usize = 200;

/// Contribution of a single feature to the predicted outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub value: f64,
    pub impact: f64,
}

/// Which way a feature pushes the default probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDirection {
    IncreasesRisk,
    DecreasesRisk,
}

impl RiskDirection {
    pub const fn label(self) -> &'static str {
        match self {
            RiskDirection::IncreasesRisk => "increases risk",
            RiskDirection::DecreasesRisk => "decreases risk",
        }
    }
}

impl FeatureImportance {
    pub fn direction(&self) -> RiskDirection {
        if self.impact > 0.0 {
            RiskDirection::IncreasesRisk
        } else {
            RiskDirection::DecreasesRisk
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub feature_importance: Vec<FeatureImportance>,
}

/// Outcome of a full assessment: label, default probability and its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: String,
    pub probability: f64,
    pub explanation: Explanation,
}

impl PredictionResult {
    pub fn is_denied(&self) -> bool {
        self.prediction == "Denied"
    }
}

/// Failure of a single prediction call. The display text is the user-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("prediction service unreachable: {0}")]
    Network(String),
    #[error("prediction service responded with status {status}: {body}")]
    Service { status: u16, body: String },
    #[error("malformed prediction response: {0}")]
    MalformedResponse(String),
}

/// Remote risk model, addressed in full (explained) or light (probability only) mode.
#[async_trait]
pub trait PredictionGateway: Send + Sync {
    async fn predict_full(
        &self,
        payload: &ServicePayload,
    ) -> Result<PredictionResult, PredictionError>;

    async fn predict_light(&self, payload: &ServicePayload) -> Result<f64, PredictionError>;
}

#[derive(Debug, Deserialize)]
struct FullResponse {
    prediction: String,
    probability: f64,
    explanation: Option<Explanation>,
}

#[derive(Debug, Deserialize)]
struct LightResponse {
    probability: f64,
}

/// reqwest-backed gateway posting payloads to `{base_url}/predict`.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    endpoint: String,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionServiceConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &PredictionServiceConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/predict", config.base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(
        &self,
        payload: &ServicePayload,
        include_explanation: bool,
    ) -> Result<String, PredictionError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if !include_explanation {
            request = request.query(&[("include_explanation", "false")]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| PredictionError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PredictionError::Network(err.to_string()))?;

        if !status.is_success() {
            return Err(PredictionError::Service {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        debug!(%status, include_explanation, "prediction service responded");
        Ok(body)
    }
}

#[async_trait]
impl PredictionGateway for HttpPredictionClient {
    async fn predict_full(
        &self,
        payload: &ServicePayload,
    ) -> Result<PredictionResult, PredictionError> {
        let body = self.post(payload, true).await?;
        parse_full(&body)
    }

    async fn predict_light(&self, payload: &ServicePayload) -> Result<f64, PredictionError> {
        let body = self.post(payload, false).await?;
        parse_light(&body)
    }
}

pub(crate) fn parse_full(body: &str) -> Result<PredictionResult, PredictionError> {
    let response: FullResponse = serde_json::from_str(body)
        .map_err(|err| PredictionError::MalformedResponse(err.to_string()))?;
    let probability = checked_probability(response.probability)?;
    let explanation = response.explanation.ok_or_else(|| {
        PredictionError::MalformedResponse("full response is missing its explanation".to_string())
    })?;

    Ok(PredictionResult {
        prediction: response.prediction,
        probability,
        explanation,
    })
}

pub(crate) fn parse_light(body: &str) -> Result<f64, PredictionError> {
    let response: LightResponse = serde_json::from_str(body)
        .map_err(|err| PredictionError::MalformedResponse(err.to_string()))?;
    checked_probability(response.probability)
}

fn checked_probability(value: f64) -> Result<f64, PredictionError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PredictionError::MalformedResponse(format!(
            "probability {value} is outside [0, 1]"
        )))
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
