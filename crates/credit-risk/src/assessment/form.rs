use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    ApplicantProfile, Categorical, Education, EmploymentType, MaritalStatus, NumericField,
};

/// Value exactly as the presentation layer delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
    Number(f64),
    Text(String),
    /// `null` or an absent value.
    Empty,
    /// Any other JSON shape, such as a boolean or an object.
    Other(serde_json::Value),
}

impl RawInput {
    /// Coerces the input to a finite number. Unparseable or non-finite input becomes `0.0`.
    pub fn coerce(&self) -> f64 {
        let parsed = match self {
            RawInput::Number(value) => *value,
            RawInput::Text(text) => text.trim().parse::<f64>().unwrap_or(0.0),
            RawInput::Empty | RawInput::Other(_) => 0.0,
        };
        if parsed.is_finite() {
            parsed
        } else {
            0.0
        }
    }

    fn as_label(&self) -> String {
        match self {
            RawInput::Text(text) => text.clone(),
            RawInput::Number(value) => value.to_string(),
            RawInput::Empty => String::new(),
            RawInput::Other(value) => value.to_string(),
        }
    }
}

impl From<f64> for RawInput {
    fn from(value: f64) -> Self {
        RawInput::Number(value)
    }
}

impl From<&str> for RawInput {
    fn from(value: &str) -> Self {
        RawInput::Text(value.to_string())
    }
}

/// Raw form state keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantForm(pub BTreeMap<String, RawInput>);

impl ApplicantForm {
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<RawInput>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builds a profile, coercing missing numeric fields to `0` and missing categorical
    /// fields to an unrecognized empty label.
    pub fn into_profile(self) -> ApplicantProfile {
        let mut fields = self.0;
        let mut profile = ApplicantProfile::default();

        for field in NumericField::ALL {
            let value = fields
                .remove(field.key())
                .map(|raw| raw.coerce())
                .unwrap_or(0.0);
            profile.set_numeric(field, value);
        }

        profile.education = Education::parse(&take_label(&mut fields, Education::FIELD));
        profile.employment_type =
            EmploymentType::parse(&take_label(&mut fields, EmploymentType::FIELD));
        profile.marital_status =
            MaritalStatus::parse(&take_label(&mut fields, MaritalStatus::FIELD));

        for ignored in fields.keys() {
            debug!(field = %ignored, "ignoring unknown form field");
        }

        profile
    }
}

impl From<&ApplicantProfile> for ApplicantForm {
    fn from(profile: &ApplicantProfile) -> Self {
        let mut form = ApplicantForm::default();
        for field in NumericField::ALL {
            form.set(field.key(), profile.numeric(field));
        }
        form.set(Education::FIELD, profile.education.label());
        form.set(EmploymentType::FIELD, profile.employment_type.label());
        form.set(MaritalStatus::FIELD, profile.marital_status.label());
        form
    }
}

fn take_label(fields: &mut BTreeMap<String, RawInput>, key: &str) -> String {
    fields
        .remove(key)
        .map(|raw| raw.as_label())
        .unwrap_or_default()
}

/// Incremental edit event produced while a control is dragged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEdit {
    pub field: String,
    pub value: RawInput,
}

impl FieldEdit {
    pub fn new(field: impl Into<String>, value: impl Into<RawInput>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}
