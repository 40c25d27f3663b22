use crate::assessment::{PredictionError, SimulationError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Prediction(PredictionError),
    Simulation(SimulationError),
    InvalidProfile(serde_json::Error),
    InvalidArgument(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Prediction(err) => write!(f, "prediction error: {}", err),
            AppError::Simulation(err) => write!(f, "simulation error: {}", err),
            AppError::InvalidProfile(err) => write!(f, "invalid applicant profile: {}", err),
            AppError::InvalidArgument(message) => write!(f, "invalid argument: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Prediction(err) => Some(err),
            AppError::Simulation(err) => Some(err),
            AppError::InvalidProfile(err) => Some(err),
            AppError::InvalidArgument(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Simulation(SimulationError::NoBaseline) => StatusCode::CONFLICT,
            AppError::Simulation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidProfile(_) | AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Prediction(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<PredictionError> for AppError {
    fn from(value: PredictionError) -> Self {
        Self::Prediction(value)
    }
}

impl From<SimulationError> for AppError {
    fn from(value: SimulationError) -> Self {
        Self::Simulation(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidProfile(value)
    }
}
