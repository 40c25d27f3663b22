//! Debounced what-if loop over a private working copy of the submitted profile.
//!
//! Every edit bumps a debounce token. A timer task only issues its light request when its
//! token is still current at fire time, and a response is only published when the token is
//! still current at completion, so late responses from superseded requests are dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::client::PredictionGateway;
use super::domain::{ApplicantProfile, NumericField};
use super::form::FieldEdit;
use super::mapping::map_to_payload;
use crate::config::SimulationConfig;

/// Slider metadata for a simulable field. Bounds are advisory and are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliderSpec {
    pub field: NumericField,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

pub const SIMULATION_SLIDERS: [SliderSpec; 4] = [
    SliderSpec {
        field: NumericField::Income,
        label: "Income",
        min: 20_000.0,
        max: 200_000.0,
        step: 5_000.0,
    },
    SliderSpec {
        field: NumericField::CreditScore,
        label: "Credit Score",
        min: 300.0,
        max: 850.0,
        step: 10.0,
    },
    SliderSpec {
        field: NumericField::DtiRatio,
        label: "DTI Ratio",
        min: 0.0,
        max: 1.0,
        step: 0.05,
    },
    SliderSpec {
        field: NumericField::LoanAmount,
        label: "Loan Amount",
        min: 1_000.0,
        max: 50_000.0,
        step: 1_000.0,
    },
];

pub fn is_simulable(field: NumericField) -> bool {
    SIMULATION_SLIDERS.iter().any(|slider| slider.field == field)
}

/// Direction of the simulated probability relative to the assessed one.
/// Lower probability means lower default risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTrend {
    Improved,
    Worsened,
    Unchanged,
}

impl RiskTrend {
    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            RiskTrend::Improved
        } else if delta > 0.0 {
            RiskTrend::Worsened
        } else {
            RiskTrend::Unchanged
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskTrend::Improved => "Improved",
            RiskTrend::Worsened => "Worsened",
            RiskTrend::Unchanged => "Unchanged",
        }
    }
}

/// Identifies one baseline; probabilities for older baselines are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineEpoch(u64);

/// Render payload for the simulation lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub working_values: BTreeMap<&'static str, f64>,
    pub simulated_probability: Option<f64>,
    pub baseline_probability: Option<f64>,
    pub pending: bool,
    /// `simulated - baseline`; negative means risk improved.
    pub delta: Option<f64>,
    pub trend: Option<RiskTrend>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("no assessment has been submitted yet")]
    NoBaseline,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' cannot be simulated")]
    FieldNotSimulable(NumericField),
}

#[derive(Default)]
struct SimulationState {
    epoch: u64,
    token: u64,
    working: Option<ApplicantProfile>,
    simulated: Option<f64>,
    baseline: Option<f64>,
    pending: bool,
    timer: Option<JoinHandle<()>>,
}

impl SimulationState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn snapshot(&self) -> SimulationSnapshot {
        let working_values = match &self.working {
            Some(profile) => SIMULATION_SLIDERS
                .iter()
                .map(|slider| (slider.field.key(), profile.numeric(slider.field)))
                .collect(),
            None => BTreeMap::new(),
        };
        let delta = match (self.simulated, self.baseline) {
            (Some(simulated), Some(baseline)) => Some(simulated - baseline),
            _ => None,
        };

        SimulationSnapshot {
            working_values,
            simulated_probability: self.simulated,
            baseline_probability: self.baseline,
            pending: self.pending,
            delta,
            trend: delta.map(RiskTrend::from_delta),
        }
    }
}

struct Shared<G> {
    gateway: Arc<G>,
    debounce: Duration,
    state: Mutex<SimulationState>,
    updates: watch::Sender<SimulationSnapshot>,
}

impl<G> Shared<G> {
    fn publish(&self, state: &SimulationState) {
        self.updates.send_replace(state.snapshot());
    }
}

/// What-if simulation lane. Edits and baseline resets must happen inside a Tokio runtime.
pub struct SimulationLoop<G> {
    shared: Arc<Shared<G>>,
}

impl<G> SimulationLoop<G>
where
    G: PredictionGateway + 'static,
{
    pub fn new(gateway: Arc<G>, config: SimulationConfig) -> Self {
        let state = SimulationState::default();
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            shared: Arc::new(Shared {
                gateway,
                debounce: config.debounce,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.shared.debounce
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        self.shared.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SimulationSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Starts over from a freshly submitted profile, dropping any pending or in-flight request.
    pub fn reset_baseline(&self, profile: ApplicantProfile) -> BaselineEpoch {
        let mut state = self.shared.state.lock().expect("simulation mutex poisoned");
        state.epoch += 1;
        state.token += 1;
        state.cancel_timer();
        state.working = Some(profile);
        state.simulated = None;
        state.baseline = None;
        state.pending = false;
        self.shared.publish(&state);
        debug!(epoch = state.epoch, "simulation baseline reset");
        BaselineEpoch(state.epoch)
    }

    /// Records the assessed probability for `epoch`. Returns `false` if a newer baseline exists.
    pub fn set_baseline_probability(&self, epoch: BaselineEpoch, probability: f64) -> bool {
        let mut state = self.shared.state.lock().expect("simulation mutex poisoned");
        if state.epoch != epoch.0 {
            return false;
        }
        state.baseline = Some(probability);
        self.shared.publish(&state);
        true
    }

    pub fn apply_raw_edit(&self, edit: &FieldEdit) -> Result<SimulationSnapshot, SimulationError> {
        let field = NumericField::from_key(&edit.field)
            .ok_or_else(|| SimulationError::UnknownField(edit.field.clone()))?;
        self.apply_edit(field, edit.value.coerce())
    }

    /// Updates the working copy immediately and (re)starts the debounce timer.
    pub fn apply_edit(
        &self,
        field: NumericField,
        value: f64,
    ) -> Result<SimulationSnapshot, SimulationError> {
        if !is_simulable(field) {
            return Err(SimulationError::FieldNotSimulable(field));
        }

        let mut state = self.shared.state.lock().expect("simulation mutex poisoned");
        let working = state.working.as_mut().ok_or(SimulationError::NoBaseline)?;
        working.set_numeric(field, if value.is_finite() { value } else { 0.0 });

        state.token += 1;
        state.pending = true;
        state.cancel_timer();
        let token = state.token;
        state.timer = Some(tokio::spawn(fire_after_quiescence(
            Arc::clone(&self.shared),
            token,
        )));

        let snapshot = state.snapshot();
        self.shared.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }
}

impl<G> Drop for SimulationLoop<G> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.token += 1;
            state.cancel_timer();
        }
    }
}

async fn fire_after_quiescence<G>(shared: Arc<Shared<G>>, token: u64)
where
    G: PredictionGateway + 'static,
{
    tokio::time::sleep(shared.debounce).await;

    let snapshot = {
        let mut state = shared.state.lock().expect("simulation mutex poisoned");
        if state.token != token {
            return;
        }
        // Detach: from here on the request is in flight and only its effect can be ignored.
        state.timer = None;
        match state.working.clone() {
            Some(profile) => profile,
            None => return,
        }
    };

    debug!(token, "debounce window elapsed, issuing light prediction");
    let response = shared.gateway.predict_light(&map_to_payload(&snapshot)).await;

    let mut state = shared.state.lock().expect("simulation mutex poisoned");
    if state.token != token {
        debug!(
            token,
            current = state.token,
            "discarding stale simulation response"
        );
        return;
    }

    match response {
        Ok(probability) => state.simulated = Some(probability),
        Err(err) => warn!(token, error = %err, "simulation request failed"),
    }
    state.pending = false;
    shared.publish(&state);
}
