use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use launchpad::workflows::profile_analysis::{
    analysis_router, ProfileAnalysisService, ProfileStore, ScoringOracle, SessionVerifier,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes<S, O>(
    service: Arc<ProfileAnalysisService<S, O>>,
    sessions: Arc<dyn SessionVerifier>,
) -> axum::Router
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    analysis_router(service, sessions)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryProfileStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use launchpad::workflows::profile_analysis::{OracleError, StaticTokenVerifier};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    struct SilentOracle;

    #[async_trait]
    impl ScoringOracle for SilentOracle {
        async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            Err(OracleError::NotConfigured)
        }
    }

    fn app(ready: bool) -> axum::Router {
        let service = Arc::new(ProfileAnalysisService::new(
            Arc::new(InMemoryProfileStore::default()),
            Arc::new(SilentOracle),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_service_routes(service, Arc::new(StaticTokenVerifier::new(["token"])))
            .layer(Extension(state))
    }

    async fn get(router: axum::Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .expect("route executes")
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = get(app(false), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        assert_eq!(
            get(app(false), "/ready").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(get(app(true), "/ready").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let response = get(app(true), "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn profile_routes_still_require_a_session() {
        let response = get(app(true), "/api/v1/profiles/ada").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
