use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::time::Instant;

use crate::assessment::client::{
    Explanation, FeatureImportance, PredictionError, PredictionGateway, PredictionResult,
};
use crate::assessment::domain::{ApplicantProfile, Education, EmploymentType, MaritalStatus};
use crate::assessment::mapping::ServicePayload;
use crate::assessment::service::CreditAssessmentService;
use crate::config::SimulationConfig;

pub(super) const WINDOW: Duration = Duration::from_millis(400);

pub(super) fn applicant() -> ApplicantProfile {
    ApplicantProfile {
        age: 30.0,
        income: 50_000.0,
        loan_amount: 10_000.0,
        credit_score: 650.0,
        months_employed: 24.0,
        num_credit_lines: 5.0,
        interest_rate: 10.0,
        loan_term: 36.0,
        dti_ratio: 0.3,
        education: Education::Bachelor,
        employment_type: EmploymentType::FullTime,
        marital_status: MaritalStatus::Single,
    }
}

pub(super) fn risky_applicant() -> ApplicantProfile {
    ApplicantProfile {
        credit_score: 420.0,
        dti_ratio: 0.75,
        employment_type: EmploymentType::Unemployed,
        ..applicant()
    }
}

pub(super) fn approved(probability: f64) -> PredictionResult {
    PredictionResult {
        prediction: "Approved".to_string(),
        probability,
        explanation: Explanation {
            summary: "Looks good.".to_string(),
            feature_importance: Vec::new(),
        },
    }
}

pub(super) fn denied(probability: f64) -> PredictionResult {
    PredictionResult {
        prediction: "Denied".to_string(),
        probability,
        explanation: Explanation {
            summary: "The decision was primarily influenced by credit_score.".to_string(),
            feature_importance: vec![FeatureImportance {
                feature: "credit_score".to_string(),
                value: 420.0,
                impact: 0.38,
            }],
        },
    }
}

pub(super) fn simulation_config() -> SimulationConfig {
    SimulationConfig { debounce: WINDOW }
}

pub(super) fn network_down() -> PredictionError {
    PredictionError::Network("connection refused".to_string())
}

struct Scripted<T> {
    delay: Duration,
    response: Result<T, PredictionError>,
}

/// Payload and issue time of a recorded gateway call.
#[derive(Debug, Clone)]
pub(super) struct RecordedCall {
    pub(super) at: Instant,
    pub(super) payload: ServicePayload,
}

/// Gateway replaying queued responses after a per-response delay.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    full: Mutex<VecDeque<Scripted<PredictionResult>>>,
    light: Mutex<VecDeque<Scripted<f64>>>,
    full_calls: Mutex<Vec<RecordedCall>>,
    light_calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub(super) fn full_after(
        &self,
        delay: Duration,
        response: Result<PredictionResult, PredictionError>,
    ) -> &Self {
        self.full
            .lock()
            .expect("script mutex poisoned")
            .push_back(Scripted { delay, response });
        self
    }

    pub(super) fn full(&self, response: Result<PredictionResult, PredictionError>) -> &Self {
        self.full_after(Duration::ZERO, response)
    }

    pub(super) fn light_after(
        &self,
        delay: Duration,
        response: Result<f64, PredictionError>,
    ) -> &Self {
        self.light
            .lock()
            .expect("script mutex poisoned")
            .push_back(Scripted { delay, response });
        self
    }

    pub(super) fn light(&self, response: Result<f64, PredictionError>) -> &Self {
        self.light_after(Duration::ZERO, response)
    }

    pub(super) fn full_calls(&self) -> Vec<RecordedCall> {
        self.full_calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn light_calls(&self) -> Vec<RecordedCall> {
        self.light_calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl PredictionGateway for ScriptedGateway {
    async fn predict_full(
        &self,
        payload: &ServicePayload,
    ) -> Result<PredictionResult, PredictionError> {
        self.full_calls
            .lock()
            .expect("calls mutex poisoned")
            .push(RecordedCall {
                at: Instant::now(),
                payload: payload.clone(),
            });
        let next = self.full.lock().expect("script mutex poisoned").pop_front();
        match next {
            Some(Scripted { delay, response }) => {
                tokio::time::sleep(delay).await;
                response
            }
            None => Err(PredictionError::Network("no scripted response".to_string())),
        }
    }

    async fn predict_light(&self, payload: &ServicePayload) -> Result<f64, PredictionError> {
        self.light_calls
            .lock()
            .expect("calls mutex poisoned")
            .push(RecordedCall {
                at: Instant::now(),
                payload: payload.clone(),
            });
        let next = self.light.lock().expect("script mutex poisoned").pop_front();
        match next {
            Some(Scripted { delay, response }) => {
                tokio::time::sleep(delay).await;
                response
            }
            None => Err(PredictionError::Network("no scripted response".to_string())),
        }
    }
}

pub(super) fn build_service() -> (
    Arc<CreditAssessmentService<ScriptedGateway>>,
    Arc<ScriptedGateway>,
) {
    let gateway = Arc::new(ScriptedGateway::default());
    let service = Arc::new(CreditAssessmentService::new(
        gateway.clone(),
        simulation_config(),
    ));
    (service, gateway)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
