//! Credit-risk assessment core: payload mapping, the prediction gateway, the full-assessment
//! session and the debounced what-if simulation loop.

pub mod client;
pub mod domain;
pub mod form;
pub mod mapping;
pub mod router;
pub mod service;
pub mod session;
pub mod simulation;

#[cfg(test)]
mod tests;

pub use client::{
    Explanation, FeatureImportance, HttpPredictionClient, PredictionError, PredictionGateway,
    PredictionResult, RiskDirection,
};
pub use domain::{
    ApplicantProfile, Categorical, Education, EmploymentType, MaritalStatus, NumericField,
};
pub use form::{ApplicantForm, FieldEdit, RawInput};
pub use mapping::{map_to_payload, payload_keys, ServicePayload};
pub use router::assessment_router;
pub use service::CreditAssessmentService;
pub use session::{
    AssessmentSession, AssessmentSnapshot, AssessmentStatus, AssessmentView, SubmitOutcome,
};
pub use simulation::{
    is_simulable, BaselineEpoch, RiskTrend, SimulationError, SimulationLoop, SimulationSnapshot,
    SliderSpec, SIMULATION_SLIDERS,
};
