use credit_risk::assessment::{ApplicantForm, ApplicantProfile, FieldEdit};
use credit_risk::config::{AppConfig, PredictionServiceConfig};
use credit_risk::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reads a JSON applicant form. Fields absent from the file keep the form defaults.
pub(crate) fn load_profile(path: Option<&Path>) -> Result<ApplicantForm, AppError> {
    let mut form = ApplicantForm::from(&ApplicantProfile::default());
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)?;
        let overrides: ApplicantForm = serde_json::from_str(&raw)?;
        form.0.extend(overrides.0);
    }
    Ok(form)
}

/// Parses a `field=value` assignment from the command line.
pub(crate) fn parse_assignment(raw: &str) -> Result<FieldEdit, AppError> {
    let (field, value) = raw.split_once('=').ok_or_else(|| {
        AppError::InvalidArgument(format!("expected field=value, got '{raw}'"))
    })?;
    let field = field.trim();
    if field.is_empty() {
        return Err(AppError::InvalidArgument(format!(
            "missing field name in '{raw}'"
        )));
    }
    Ok(FieldEdit::new(field, value.trim()))
}

pub(crate) fn apply_assignments(
    form: &mut ApplicantForm,
    assignments: &[String],
) -> Result<(), AppError> {
    for raw in assignments {
        let FieldEdit { field, value } = parse_assignment(raw)?;
        form.set(field, value);
    }
    Ok(())
}

/// Loads the service configuration, letting the command line override the model address.
pub(crate) fn load_config(base_url: Option<&str>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(base_url) = base_url {
        config.prediction.base_url = PredictionServiceConfig::normalize_base_url(base_url)?;
    }
    Ok(config)
}
