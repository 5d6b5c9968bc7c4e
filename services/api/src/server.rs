use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySafetyScoreRepository};
use crate::routes::with_readiness_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use roster_readiness::config::AppConfig;
use roster_readiness::error::AppError;
use roster_readiness::readiness::EscalationService;
use roster_readiness::telemetry;
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

    let settings = Arc::new(config.readiness.report_settings());
    let repository = Arc::new(InMemorySafetyScoreRepository::default());
    let escalation = Arc::new(EscalationService::new(
        repository,
        config.readiness.escalation_policy(),
    ));

    let app = with_readiness_routes(escalation)
        .layer(Extension(settings))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        low_score_threshold = config.readiness.low_score_threshold,
        "roster readiness service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
