use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::client::PredictionGateway;
use super::form::{ApplicantForm, FieldEdit};
use super::service::CreditAssessmentService;
use super::session::SubmitOutcome;
use super::simulation::SIMULATION_SLIDERS;
use crate::error::AppError;

/// Router builder exposing the assessment and simulation lanes to a presentation layer.
pub fn assessment_router<G>(service: Arc<CreditAssessmentService<G>>) -> Router
where
    G: PredictionGateway + 'static,
{
    Router::new()
        .route("/api/v1/assessments", post(submit_handler::<G>))
        .route("/api/v1/assessments/current", get(current_handler::<G>))
        .route("/api/v1/simulation", get(simulation_handler::<G>))
        .route("/api/v1/simulation/edits", post(edit_handler::<G>))
        .route("/api/v1/simulation/sliders", get(sliders_handler))
        .with_state(service)
}

pub(crate) async fn submit_handler<G>(
    State(service): State<Arc<CreditAssessmentService<G>>>,
    Json(form): Json<ApplicantForm>,
) -> Response
where
    G: PredictionGateway + 'static,
{
    match service.submit_form(form).await {
        SubmitOutcome::Ready(_) => {
            (StatusCode::OK, Json(service.assessment().view())).into_response()
        }
        SubmitOutcome::Failed(_) => {
            (StatusCode::BAD_GATEWAY, Json(service.assessment().view())).into_response()
        }
        SubmitOutcome::Superseded => {
            let payload = json!({
                "error": "superseded by a newer assessment",
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn current_handler<G>(
    State(service): State<Arc<CreditAssessmentService<G>>>,
) -> Response
where
    G: PredictionGateway + 'static,
{
    (StatusCode::OK, Json(service.assessment().view())).into_response()
}

pub(crate) async fn simulation_handler<G>(
    State(service): State<Arc<CreditAssessmentService<G>>>,
) -> Response
where
    G: PredictionGateway + 'static,
{
    (StatusCode::OK, Json(service.simulation())).into_response()
}

pub(crate) async fn edit_handler<G>(
    State(service): State<Arc<CreditAssessmentService<G>>>,
    Json(edit): Json<FieldEdit>,
) -> Result<Response, AppError>
where
    G: PredictionGateway + 'static,
{
    let snapshot = service.edit(&edit)?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)).into_response())
}

pub(crate) async fn sliders_handler() -> Response {
    (StatusCode::OK, Json(SIMULATION_SLIDERS)).into_response()
}
