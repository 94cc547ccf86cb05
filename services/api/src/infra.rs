use metrics_exporter_prometheus::PrometheusHandle;
use recruiting::config::AppConfig;
use recruiting::procedures::MySqlGateway;
use recruiting::workflows::recruitment::{RecruitmentService, ServiceSettings};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service over a lazily connected pool; procedures record the database user when no actor is known.
pub(crate) fn recruitment_service(config: &AppConfig) -> RecruitmentService<MySqlGateway> {
    let gateway = Arc::new(MySqlGateway::connect_lazy(&config.database));
    RecruitmentService::new(gateway, ServiceSettings::new(config.database.user.as_str()))
}
