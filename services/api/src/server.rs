use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_risk::assessment::{CreditAssessmentService, HttpPredictionClient};
use credit_risk::config::AppConfig;
use credit_risk::error::AppError;
use credit_risk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let gateway = Arc::new(HttpPredictionClient::new(&config.prediction));
    let assessment_service = Arc::new(CreditAssessmentService::new(gateway, config.simulation));

    let app = with_service_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        prediction_service = %config.prediction.base_url,
        debounce_ms = config.simulation.debounce.as_millis() as u64,
        "credit risk assessor ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
