use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryProfileStore};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use launchpad::config::AppConfig;
use launchpad::error::AppError;
use launchpad::telemetry;
use launchpad::workflows::profile_analysis::{
    AnalysisError, ChatCompletionsOracle, ProfileAnalysisService, StaticTokenVerifier,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let store = match config.store.seed_path.as_deref() {
        Some(path) => {
            let store = InMemoryProfileStore::seed_from_path(path)?;
            info!(profiles = store.len(), seed = %path.display(), "profile store seeded");
            store
        }
        None => InMemoryProfileStore::default(),
    };

    let oracle = ChatCompletionsOracle::new(&config.oracle).map_err(AnalysisError::from)?;
    if config.oracle.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; analysis requests will fail until it is configured");
    }
    info!(endpoint = oracle.endpoint(), model = oracle.model(), "scoring service configured");

    let sessions = StaticTokenVerifier::new(config.auth.session_tokens.iter().cloned());
    if sessions.is_empty() {
        warn!("APP_SESSION_TOKENS is empty; every profile request will be rejected");
    }

    let analysis_service = Arc::new(ProfileAnalysisService::new(
        Arc::new(store),
        Arc::new(oracle),
    ));

    let app = with_service_routes(analysis_service, Arc::new(sessions))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "profile analysis service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
