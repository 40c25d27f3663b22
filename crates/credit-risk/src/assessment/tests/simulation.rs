use super::common::*;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::assessment::client::PredictionError;
use crate::assessment::domain::NumericField;
use crate::assessment::form::FieldEdit;
use crate::assessment::simulation::{
    is_simulable, RiskTrend, SimulationError, SimulationLoop, SIMULATION_SLIDERS,
};

fn simulation() -> (SimulationLoop<ScriptedGateway>, Arc<ScriptedGateway>) {
    let gateway = Arc::new(ScriptedGateway::default());
    let simulation = SimulationLoop::new(gateway.clone(), simulation_config());
    (simulation, gateway)
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_issues_a_single_request_with_the_last_value() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.21));
    simulation.reset_baseline(applicant());
    let start = Instant::now();

    simulation
        .apply_edit(NumericField::Income, 60_000.0)
        .expect("edit accepted");
    sleep(Duration::from_millis(100)).await;
    simulation
        .apply_edit(NumericField::Income, 70_000.0)
        .expect("edit accepted");
    sleep(Duration::from_millis(100)).await;
    simulation
        .apply_edit(NumericField::Income, 80_000.0)
        .expect("edit accepted");
    sleep(Duration::from_secs(1)).await;

    let calls = gateway.light_calls();
    assert_eq!(calls.len(), 1, "edits should coalesce");
    let fired_after = calls[0].at.duration_since(start);
    assert!(
        fired_after >= Duration::from_millis(600) && fired_after < Duration::from_millis(610),
        "fired after {fired_after:?}"
    );
    assert_eq!(calls[0].payload.get("income"), Some(80_000.0));

    let snapshot = simulation.snapshot();
    assert_eq!(snapshot.simulated_probability, Some(0.21));
    assert!(!snapshot.pending);
}

#[tokio::test(start_paused = true)]
async fn edit_updates_working_copy_immediately_and_marks_pending() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.4));
    simulation.reset_baseline(applicant());

    let snapshot = simulation
        .apply_edit(NumericField::CreditScore, 720.0)
        .expect("edit accepted");

    assert!(snapshot.pending);
    assert_eq!(snapshot.working_values.get("credit_score"), Some(&720.0));
    assert_eq!(snapshot.simulated_probability, None);
    assert!(gateway.light_calls().is_empty(), "no request before quiescence");
    assert_eq!(simulation.snapshot(), snapshot);
}

#[tokio::test(start_paused = true)]
async fn stale_response_never_overwrites_newer_result() {
    let (simulation, gateway) = simulation();
    gateway.light_after(Duration::from_millis(1_000), Ok(0.9));
    gateway.light_after(Duration::from_millis(10), Ok(0.2));
    simulation.reset_baseline(applicant());

    // Request A fires at 400ms and resolves at 1400ms.
    simulation
        .apply_edit(NumericField::DtiRatio, 0.9)
        .expect("edit accepted");
    sleep(Duration::from_millis(500)).await;
    assert_eq!(gateway.light_calls().len(), 1);

    // Request B fires at 900ms and resolves at 910ms.
    simulation
        .apply_edit(NumericField::DtiRatio, 0.1)
        .expect("edit accepted");
    sleep(Duration::from_millis(500)).await;
    assert_eq!(simulation.snapshot().simulated_probability, Some(0.2));

    sleep(Duration::from_secs(2)).await;
    let snapshot = simulation.snapshot();
    assert_eq!(gateway.light_calls().len(), 2);
    assert_eq!(snapshot.simulated_probability, Some(0.2));
    assert!(!snapshot.pending);
}

#[tokio::test(start_paused = true)]
async fn baseline_reset_cancels_pending_timer_and_clears_probability() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.3));
    gateway.light(Ok(0.6));
    simulation.reset_baseline(applicant());

    simulation
        .apply_edit(NumericField::LoanAmount, 20_000.0)
        .expect("edit accepted");
    sleep(Duration::from_secs(1)).await;
    assert_eq!(simulation.snapshot().simulated_probability, Some(0.3));

    simulation
        .apply_edit(NumericField::LoanAmount, 45_000.0)
        .expect("edit accepted");
    simulation.reset_baseline(risky_applicant());

    let snapshot = simulation.snapshot();
    assert_eq!(snapshot.simulated_probability, None);
    assert!(!snapshot.pending);
    assert_eq!(snapshot.working_values.get("loan_amount"), Some(&10_000.0));
    assert_eq!(snapshot.working_values.get("credit_score"), Some(&420.0));

    sleep(Duration::from_secs(2)).await;
    assert_eq!(gateway.light_calls().len(), 1, "pending timer was cancelled");
    assert_eq!(simulation.snapshot().simulated_probability, None);
}

#[tokio::test(start_paused = true)]
async fn baseline_reset_ignores_in_flight_response() {
    let (simulation, gateway) = simulation();
    gateway.light_after(Duration::from_millis(1_000), Ok(0.8));
    simulation.reset_baseline(applicant());

    simulation
        .apply_edit(NumericField::Income, 25_000.0)
        .expect("edit accepted");
    sleep(Duration::from_millis(500)).await;
    assert_eq!(gateway.light_calls().len(), 1, "request in flight");

    simulation.reset_baseline(applicant());
    sleep(Duration::from_secs(2)).await;

    let snapshot = simulation.snapshot();
    assert_eq!(snapshot.simulated_probability, None);
    assert!(!snapshot.pending);
}

#[tokio::test(start_paused = true)]
async fn failed_tick_clears_pending_and_keeps_previous_probability() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.35));
    gateway.light(Err(PredictionError::Service {
        status: 500,
        body: "Internal Server Error".to_string(),
    }));
    simulation.reset_baseline(applicant());

    simulation
        .apply_edit(NumericField::CreditScore, 700.0)
        .expect("edit accepted");
    sleep(Duration::from_secs(1)).await;
    simulation
        .apply_edit(NumericField::CreditScore, 710.0)
        .expect("edit accepted");
    assert!(simulation.snapshot().pending);
    sleep(Duration::from_secs(1)).await;

    let snapshot = simulation.snapshot();
    assert_eq!(gateway.light_calls().len(), 2);
    assert_eq!(snapshot.simulated_probability, Some(0.35));
    assert!(!snapshot.pending);
    assert_eq!(snapshot.working_values.get("credit_score"), Some(&710.0));
}

#[tokio::test(start_paused = true)]
async fn delta_is_negative_when_risk_improves() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.25));
    gateway.light(Ok(0.55));
    let epoch = simulation.reset_baseline(applicant());
    assert!(simulation.set_baseline_probability(epoch, 0.4));

    simulation
        .apply_edit(NumericField::Income, 120_000.0)
        .expect("edit accepted");
    sleep(Duration::from_secs(1)).await;
    let improved = simulation.snapshot();
    assert_close(improved.delta.expect("delta present"), -0.15);
    assert_eq!(improved.trend, Some(RiskTrend::Improved));

    simulation
        .apply_edit(NumericField::Income, 20_000.0)
        .expect("edit accepted");
    sleep(Duration::from_secs(1)).await;
    let worsened = simulation.snapshot();
    assert_close(worsened.delta.expect("delta present"), 0.15);
    assert_eq!(worsened.trend, Some(RiskTrend::Worsened));
}

#[tokio::test(start_paused = true)]
async fn delta_is_absent_without_both_probabilities() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.5));
    simulation.reset_baseline(applicant());

    assert_eq!(simulation.snapshot().delta, None);
    simulation
        .apply_edit(NumericField::Income, 90_000.0)
        .expect("edit accepted");
    sleep(Duration::from_secs(1)).await;

    let snapshot = simulation.snapshot();
    assert_eq!(snapshot.simulated_probability, Some(0.5));
    assert_eq!(snapshot.delta, None);
    assert_eq!(snapshot.trend, None);
}

#[tokio::test]
async fn stale_epoch_cannot_set_baseline_probability() {
    let (simulation, _) = simulation();
    let first = simulation.reset_baseline(applicant());
    let second = simulation.reset_baseline(risky_applicant());

    assert!(!simulation.set_baseline_probability(first, 0.1));
    assert_eq!(simulation.snapshot().baseline_probability, None);
    assert!(simulation.set_baseline_probability(second, 0.7));
    assert_eq!(simulation.snapshot().baseline_probability, Some(0.7));
}

#[tokio::test]
async fn edits_are_validated_before_touching_the_working_copy() {
    let (simulation, _) = simulation();

    assert_eq!(
        simulation.apply_edit(NumericField::Income, 1.0),
        Err(SimulationError::NoBaseline)
    );

    simulation.reset_baseline(applicant());
    assert_eq!(
        simulation.apply_edit(NumericField::Age, 45.0),
        Err(SimulationError::FieldNotSimulable(NumericField::Age))
    );
    assert_eq!(
        simulation.apply_raw_edit(&FieldEdit::new("zip_code", "50309")),
        Err(SimulationError::UnknownField("zip_code".to_string()))
    );
    assert!(!simulation.snapshot().pending);
}

#[tokio::test(start_paused = true)]
async fn raw_edits_are_coerced_at_the_boundary() {
    let (simulation, gateway) = simulation();
    gateway.light(Ok(0.6));
    simulation.reset_baseline(applicant());

    let snapshot = simulation
        .apply_raw_edit(&FieldEdit::new("dti_ratio", "not a number"))
        .expect("edit accepted");
    assert_eq!(snapshot.working_values.get("dti_ratio"), Some(&0.0));

    let snapshot = simulation
        .apply_edit(NumericField::Income, f64::NAN)
        .expect("edit accepted");
    assert_eq!(snapshot.working_values.get("income"), Some(&0.0));

    sleep(Duration::from_secs(1)).await;
    let calls = gateway.light_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payload.get("income"), Some(0.0));
    assert_eq!(calls[0].payload.get("dti_ratio"), Some(0.0));
}

#[test]
fn sliders_cover_exactly_the_simulable_fields() {
    assert_eq!(SIMULATION_SLIDERS.len(), 4);
    for field in NumericField::ALL {
        let has_slider = SIMULATION_SLIDERS.iter().any(|slider| slider.field == field);
        assert_eq!(is_simulable(field), has_slider, "{field}");
    }
    assert!(is_simulable(NumericField::DtiRatio));
    assert!(!is_simulable(NumericField::LoanTerm));
}

#[test]
fn trend_follows_lower_is_better_convention() {
    assert_eq!(RiskTrend::from_delta(-0.01), RiskTrend::Improved);
    assert_eq!(RiskTrend::from_delta(0.01), RiskTrend::Worsened);
    assert_eq!(RiskTrend::from_delta(0.0), RiskTrend::Unchanged);
}
