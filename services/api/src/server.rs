use crate::cli::ServeArgs;
use crate::infra::{recruitment_service, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruiting::config::AppConfig;
use recruiting::error::AppError;
use recruiting::telemetry;
use recruiting::workflows::recruitment::{portal_router, CvStore, PortalState, SessionKeys};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
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

    let uploads = CvStore::new(config.uploads.directory.clone());
    uploads.ensure_directory().await?;

    let portal = portal_router(PortalState {
        service: Arc::new(recruitment_service(&config)),
        uploads: Arc::new(uploads),
        sessions: SessionKeys::from_config(&config.session),
        public_url: config.server.public_url.clone(),
        body_limit: config.uploads.max_request_bytes,
    });

    let app = with_operational_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.database.name,
        uploads = %config.uploads.directory.display(),
        "recruitment portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
