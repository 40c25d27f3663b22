//! Assessment and what-if simulation engine for a remote credit-risk prediction service.

pub mod assessment;
pub mod config;
pub mod error;
pub mod telemetry;
