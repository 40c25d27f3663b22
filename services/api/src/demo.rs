use crate::infra::{apply_assignments, load_config, load_profile, parse_assignment};
use clap::Args;
use credit_risk::assessment::{
    CreditAssessmentService, HttpPredictionClient, PredictionResult, SimulationSnapshot,
    SubmitOutcome,
};
use credit_risk::error::AppError;
use credit_risk::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TOP_FACTORS: usize = 5;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// JSON applicant form; missing fields keep the form defaults
    #[arg(long)]
    pub(crate) profile: Option<PathBuf>,
    /// Override individual form fields (field=value, repeatable)
    #[arg(long)]
    pub(crate) set: Vec<String>,
    /// Base URL of the prediction service (overrides RISK_API_BASE_URL)
    #[arg(long)]
    pub(crate) base_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// JSON applicant form used as the simulation baseline
    #[arg(long)]
    pub(crate) profile: Option<PathBuf>,
    /// Slider edits applied in order after the assessment (field=value, repeatable)
    #[arg(long)]
    pub(crate) set: Vec<String>,
    /// Base URL of the prediction service (overrides RISK_API_BASE_URL)
    #[arg(long)]
    pub(crate) base_url: Option<String>,
}

pub(crate) async fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        profile,
        set,
        base_url,
    } = args;

    let config = load_config(base_url.as_deref())?;
    telemetry::init(&config.telemetry)?;

    let mut form = load_profile(profile.as_deref())?;
    apply_assignments(&mut form, &set)?;

    let client = Arc::new(HttpPredictionClient::new(&config.prediction));
    let service = CreditAssessmentService::new(client, config.simulation);

    println!("Credit risk assessment ({})", config.prediction.base_url);
    match service.submit_form(form).await {
        SubmitOutcome::Ready(result) => render_result(&result),
        SubmitOutcome::Failed(message) => println!("  {message}"),
        SubmitOutcome::Superseded => println!("  Assessment superseded before completion"),
    }

    Ok(())
}

pub(crate) async fn run_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let SimulateArgs {
        profile,
        set,
        base_url,
    } = args;

    let edits = set
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>, _>>()?;
    if edits.is_empty() {
        return Err(AppError::InvalidArgument(
            "simulate needs at least one --set field=value edit".to_string(),
        ));
    }

    let config = load_config(base_url.as_deref())?;
    telemetry::init(&config.telemetry)?;

    let form = load_profile(profile.as_deref())?;
    let client = Arc::new(HttpPredictionClient::new(&config.prediction));
    let service = CreditAssessmentService::new(client, config.simulation);

    println!("Baseline assessment ({})", config.prediction.base_url);
    match service.submit_form(form).await {
        SubmitOutcome::Ready(result) => render_result(&result),
        SubmitOutcome::Failed(message) => println!("  {message}"),
        SubmitOutcome::Superseded => println!("  Assessment superseded before completion"),
    }

    let mut updates = service.simulation_loop().subscribe();
    println!("\nWhat-if edits");
    for edit in &edits {
        let snapshot = service.edit(edit)?;
        let value = snapshot
            .working_values
            .get(edit.field.as_str())
            .copied()
            .unwrap_or_default();
        println!("- {} -> {}", edit.field, value);
    }

    let settled = tokio::time::timeout(SETTLE_TIMEOUT, async {
        loop {
            if !updates.borrow_and_update().pending {
                break;
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    })
    .await;
    if settled.is_err() {
        warn!(
            timeout_secs = SETTLE_TIMEOUT.as_secs(),
            "simulation did not settle"
        );
    }

    render_simulation(&service.simulation());
    Ok(())
}

fn render_result(result: &PredictionResult) {
    println!(
        "- Decision: {} | default probability {:.1}%",
        result.prediction,
        result.probability * 100.0
    );
    println!("  {}", result.explanation.summary);

    let mut factors: Vec<_> = result.explanation.feature_importance.iter().collect();
    factors.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    if factors.is_empty() {
        return;
    }
    println!("  Key factors:");
    for factor in factors.into_iter().take(TOP_FACTORS) {
        println!(
            "    - {} = {} ({:+.3}, {})",
            factor.feature,
            factor.value,
            factor.impact,
            factor.direction().label()
        );
    }
}

fn render_simulation(snapshot: &SimulationSnapshot) {
    println!("\nSimulation result");
    for (field, value) in &snapshot.working_values {
        println!("  {field}: {value}");
    }

    match snapshot.simulated_probability {
        Some(probability) => println!("- Simulated probability {:.1}%", probability * 100.0),
        None => println!("- Simulated probability unavailable"),
    }
    if let (Some(delta), Some(trend)) = (snapshot.delta, snapshot.trend) {
        println!(
            "- Change vs. assessment {:+.1} pts ({})",
            delta * 100.0,
            trend.label()
        );
    }
}
