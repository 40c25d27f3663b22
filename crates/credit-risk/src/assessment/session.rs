use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::client::{PredictionError, PredictionGateway, PredictionResult};
use super::domain::ApplicantProfile;
use super::mapping::{map_to_payload, ServicePayload};

const CANCELLED_MESSAGE: &str = "assessment request was cancelled";

/// Lifecycle of the full-assessment lane. `Ready` and `Failed` are never terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentStatus {
    Idle,
    Loading,
    Ready(PredictionResult),
    Failed(String),
}

/// Everything the presentation layer renders for the full-assessment lane.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentSnapshot {
    pub status: AssessmentStatus,
    /// Last submitted profile, kept as the simulation baseline.
    pub current: Option<ApplicantProfile>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AssessmentSnapshot {
    pub fn idle() -> Self {
        Self {
            status: AssessmentStatus::Idle,
            current: None,
            completed_at: None,
        }
    }

    fn begin(profile: ApplicantProfile) -> Self {
        Self {
            status: AssessmentStatus::Loading,
            current: Some(profile),
            completed_at: None,
        }
    }

    fn complete(&mut self, result: PredictionResult) {
        self.status = AssessmentStatus::Ready(result);
        self.completed_at = Some(Utc::now());
    }

    fn fail(&mut self, message: String) {
        self.status = AssessmentStatus::Failed(message);
        self.completed_at = Some(Utc::now());
    }

    pub fn loading(&self) -> bool {
        matches!(self.status, AssessmentStatus::Loading)
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match &self.status {
            AssessmentStatus::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            AssessmentStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn view(&self) -> AssessmentView {
        AssessmentView {
            result: self.result().cloned(),
            current_data: self.current.clone(),
            loading: self.loading(),
            error: self.error().map(str::to_string),
            completed_at: self.completed_at,
        }
    }
}

/// Serialized render payload: `{result, current_data, loading, error}`.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub result: Option<PredictionResult>,
    pub current_data: Option<ApplicantProfile>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// What a single `submit` call ended up doing to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Ready(PredictionResult),
    Failed(String),
    /// A later submission was issued before this one resolved; its response was discarded.
    Superseded,
}

pub(crate) fn failure_message(err: &PredictionError) -> String {
    format!("Failed to get prediction. Ensure the prediction service is running. ({err})")
}

struct SessionState {
    generation: u64,
}

/// Full-assessment lane. The latest `submit` call is authoritative.
pub struct AssessmentSession<G> {
    gateway: Arc<G>,
    state: Mutex<SessionState>,
    updates: watch::Sender<AssessmentSnapshot>,
}

impl<G> AssessmentSession<G> {
    pub fn snapshot(&self) -> AssessmentSnapshot {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AssessmentSnapshot> {
        self.updates.subscribe()
    }

    fn begin(&self, profile: ApplicantProfile) -> u64 {
        let mut state = self.state.lock().expect("session mutex poisoned");
        state.generation += 1;
        self.updates.send_replace(AssessmentSnapshot::begin(profile));
        state.generation
    }

    fn settle(
        &self,
        generation: u64,
        response: Result<PredictionResult, PredictionError>,
    ) -> SubmitOutcome {
        let state = self.state.lock().expect("session mutex poisoned");
        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                "discarding superseded assessment response"
            );
            return SubmitOutcome::Superseded;
        }

        match response {
            Ok(result) => {
                info!(
                    generation,
                    prediction = %result.prediction,
                    probability = result.probability,
                    "assessment ready"
                );
                self.updates
                    .send_modify(|snapshot| snapshot.complete(result.clone()));
                SubmitOutcome::Ready(result)
            }
            Err(err) => {
                warn!(generation, error = %err, "assessment failed");
                let message = failure_message(&err);
                self.updates
                    .send_modify(|snapshot| snapshot.fail(message.clone()));
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn abandon(&self, generation: u64) {
        let state = self.state.lock().expect("session mutex poisoned");
        if state.generation == generation {
            debug!(generation, "assessment dropped before completion");
            self.updates
                .send_modify(|snapshot| snapshot.fail(CANCELLED_MESSAGE.to_string()));
        }
    }
}

impl<G> AssessmentSession<G>
where
    G: PredictionGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        let (updates, _) = watch::channel(AssessmentSnapshot::idle());
        Self {
            gateway,
            state: Mutex::new(SessionState { generation: 0 }),
            updates,
        }
    }

    /// Moves to `Loading`, requests a full prediction and settles into `Ready` or `Failed`
    /// unless a newer submission has taken over in the meantime.
    pub async fn submit(&self, profile: ApplicantProfile) -> SubmitOutcome {
        let submission = self.start(profile);
        self.run(submission).await
    }

    /// Takes a generation and enters `Loading` without issuing the request yet.
    pub(crate) fn start(&self, profile: ApplicantProfile) -> PendingSubmission<'_, G> {
        let payload = map_to_payload(&profile);
        let generation = self.begin(profile);
        PendingSubmission {
            session: self,
            generation,
            payload,
            settled: false,
        }
    }

    pub(crate) async fn run(&self, mut submission: PendingSubmission<'_, G>) -> SubmitOutcome {
        let generation = submission.generation;
        info!(generation, "submitting full assessment");
        let response = self.gateway.predict_full(&submission.payload).await;

        submission.settled = true;
        self.settle(generation, response)
    }
}

/// Clears the loading state if a submission is dropped before it settles.
pub(crate) struct PendingSubmission<'a, G> {
    session: &'a AssessmentSession<G>,
    generation: u64,
    payload: ServicePayload,
    settled: bool,
}

impl<G> Drop for PendingSubmission<'_, G> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.abandon(self.generation);
        }
    }
}
