use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{
    ApplicantProfile, Categorical, Education, EmploymentType, MaritalStatus, NumericField,
};

/// Flat feature mapping sent to the prediction service.
///
/// The key set is identical for every profile: nine numeric features plus every indicator
/// of every categorical dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServicePayload(BTreeMap<&'static str, f64>);

impl ServicePayload {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Expands a profile into the service's fixed-width feature mapping.
///
/// A categorical value that matches no known label emits every indicator of its
/// dimension as `0`.
pub fn map_to_payload(profile: &ApplicantProfile) -> ServicePayload {
    let mut features = BTreeMap::new();

    for field in NumericField::ALL {
        features.insert(field.key(), profile.numeric(field));
    }

    one_hot(&mut features, &profile.education);
    one_hot(&mut features, &profile.employment_type);
    one_hot(&mut features, &profile.marital_status);

    ServicePayload(features)
}

fn one_hot<C: Categorical>(features: &mut BTreeMap<&'static str, f64>, value: &C) {
    let selected = value.indicator();
    for &key in C::INDICATORS {
        let flag = if selected == Some(key) { 1.0 } else { 0.0 };
        features.insert(key, flag);
    }
}

/// Every key a payload carries, in serialization order.
pub fn payload_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = NumericField::ALL.iter().map(|field| field.key()).collect();
    keys.extend_from_slice(Education::INDICATORS);
    keys.extend_from_slice(EmploymentType::INDICATORS);
    keys.extend_from_slice(MaritalStatus::INDICATORS);
    keys.sort_unstable();
    keys
}
