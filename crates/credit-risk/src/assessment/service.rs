use std::sync::{Arc, Mutex};

use super::client::PredictionGateway;
use super::domain::ApplicantProfile;
use super::form::{ApplicantForm, FieldEdit};
use super::session::{AssessmentSession, AssessmentSnapshot, SubmitOutcome};
use super::simulation::{SimulationError, SimulationLoop, SimulationSnapshot};
use crate::config::SimulationConfig;

/// Service composing the full-assessment lane and the what-if simulation lane.
///
/// The two lanes share the gateway but never share in-flight state: the simulation loop
/// only learns about a submission through its baseline epoch.
pub struct CreditAssessmentService<G> {
    session: AssessmentSession<G>,
    simulation: SimulationLoop<G>,
    /// Serializes baseline epochs and session generations so both lanes agree on the latest submission.
    submissions: Mutex<()>,
}

impl<G> CreditAssessmentService<G>
where
    G: PredictionGateway + 'static,
{
    pub fn new(gateway: Arc<G>, config: SimulationConfig) -> Self {
        Self {
            session: AssessmentSession::new(Arc::clone(&gateway)),
            simulation: SimulationLoop::new(gateway, config),
            submissions: Mutex::new(()),
        }
    }

    /// Submit a full assessment, re-seeding the simulation from the same profile.
    pub async fn submit(&self, profile: ApplicantProfile) -> SubmitOutcome {
        let (epoch, submission) = {
            let _order = self.submissions.lock().expect("submission mutex poisoned");
            let epoch = self.simulation.reset_baseline(profile.clone());
            (epoch, self.session.start(profile))
        };
        let outcome = self.session.run(submission).await;
        if let SubmitOutcome::Ready(result) = &outcome {
            self.simulation
                .set_baseline_probability(epoch, result.probability);
        }
        outcome
    }

    pub async fn submit_form(&self, form: ApplicantForm) -> SubmitOutcome {
        self.submit(form.into_profile()).await
    }

    /// Forward a slider edit to the simulation lane.
    pub fn edit(&self, edit: &FieldEdit) -> Result<SimulationSnapshot, SimulationError> {
        self.simulation.apply_raw_edit(edit)
    }

    pub fn assessment(&self) -> AssessmentSnapshot {
        self.session.snapshot()
    }

    pub fn simulation(&self) -> SimulationSnapshot {
        self.simulation.snapshot()
    }

    pub fn session(&self) -> &AssessmentSession<G> {
        &self.session
    }

    pub fn simulation_loop(&self) -> &SimulationLoop<G> {
        &self.simulation
    }
}
