use crate::cli::ServeArgs;
use crate::infra::{
    AppState, ConfiguredRoles, LoggingNotificationPublisher, StaticDocumentCatalog,
};
use crate::routes::with_health_card_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use health_card::config::AppConfig;
use health_card::error::AppError;
use health_card::telemetry;
use health_card::workflows::health_card::{
    Collaborators, HealthCardWorkflowService, InMemoryWorkflowStore, SystemClock,
};
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

    let repository = Arc::new(InMemoryWorkflowStore::new());
    let publisher = Arc::new(LoggingNotificationPublisher);
    let collaborators = Collaborators {
        catalog: Arc::new(StaticDocumentCatalog),
        roles: Arc::new(ConfiguredRoles::new(&config.workflow.reviewer_ids)),
        clock: Arc::new(SystemClock),
    };
    let workflow_service = Arc::new(HealthCardWorkflowService::new(
        repository,
        publisher,
        collaborators,
        &config.workflow,
    ));

    let app = with_health_card_routes(workflow_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        reviewers = config.workflow.reviewer_ids.len(),
        "health card review service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
