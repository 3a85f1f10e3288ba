use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::domain::Profile;
use super::oracle::ScoringOracle;
use super::repository::{ProfileId, ProfileStore, StoreError};
use super::service::{AnalysisError, AnalysisOutcome, FailureKind, ProfileAnalysisService};
use super::session::{session_token, Session, SessionVerifier};

const ANALYSIS_FAILED: &str = "Failed to analyze profile";
const SAVE_FAILED: &str = "Failed to save profile";

/// Body of `POST /api/v1/profiles/analyze`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeProfileRequest {
    pub profile: Profile,
    #[serde(default)]
    pub force_refresh: bool,
    /// When present, the merged snapshot is written back under this id.
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
}

/// Optional body of `POST /api/v1/profiles/:profile_id/analysis`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    success: bool,
    #[serde(flatten)]
    outcome: AnalysisOutcome,
}

/// Router builder exposing the profile and analysis endpoints behind session checks.
pub fn analysis_router<S, O>(
    service: Arc<ProfileAnalysisService<S, O>>,
    sessions: Arc<dyn SessionVerifier>,
) -> Router
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    Router::new()
        .route("/api/v1/profiles/analyze", post(analyze_handler::<S, O>))
        .route(
            "/api/v1/profiles/:profile_id",
            get(get_profile_handler::<S, O>).put(put_profile_handler::<S, O>),
        )
        .route(
            "/api/v1/profiles/:profile_id/analysis",
            post(analyze_stored_handler::<S, O>),
        )
        .route_layer(middleware::from_fn_with_state(sessions, require_session))
        .with_state(service)
}

/// Rejects requests without a verified session before any body parsing or analysis work.
pub(crate) async fn require_session(
    State(sessions): State<Arc<dyn SessionVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = session_token(request.headers()).and_then(|token| sessions.verify(token));
    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => unauthorized(),
    }
}

pub(crate) async fn analyze_handler<S, O>(
    State(service): State<Arc<ProfileAnalysisService<S, O>>>,
    Extension(session): Extension<Session>,
    payload: Result<Json<AnalyzeProfileRequest>, JsonRejection>,
) -> Response
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejected_body(ANALYSIS_FAILED, rejection),
    };
    let AnalyzeProfileRequest {
        profile,
        force_refresh,
        profile_id,
    } = request;
    info!(subject = %session.subject, force_refresh, "profile analysis requested");

    let result = match profile_id {
        Some(id) => service.analyze_and_store(&id, profile, force_refresh).await,
        None => service.analyze(&profile, force_refresh).await,
    };
    analysis_response(result)
}

pub(crate) async fn analyze_stored_handler<S, O>(
    State(service): State<Arc<ProfileAnalysisService<S, O>>>,
    Path(profile_id): Path<String>,
    body: Option<Json<RefreshRequest>>,
) -> Response
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    let force_refresh = body.map(|Json(request)| request.force_refresh).unwrap_or_default();
    let id = ProfileId(profile_id);
    analysis_response(service.analyze_stored(&id, force_refresh).await)
}

pub(crate) async fn get_profile_handler<S, O>(
    State(service): State<Arc<ProfileAnalysisService<S, O>>>,
    Path(profile_id): Path<String>,
) -> Response
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    match service.get_profile(&ProfileId(profile_id)) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn put_profile_handler<S, O>(
    State(service): State<Arc<ProfileAnalysisService<S, O>>>,
    Path(profile_id): Path<String>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> Response
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    let profile = match payload {
        Ok(Json(profile)) => profile,
        Err(rejection) => return rejected_body(SAVE_FAILED, rejection),
    };
    let id = ProfileId(profile_id);
    match service.put_profile(&id, profile) {
        Ok(()) => {
            let payload = json!({ "success": true, "profileId": id });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => store_error_response(error),
    }
}

fn rejected_body(error: &str, rejection: JsonRejection) -> Response {
    warn!(details = %rejection.body_text(), "request body rejected");
    let payload = json!({
        "error": error,
        "details": rejection.body_text(),
        "kind": FailureKind::InvalidRequest,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn unauthorized() -> Response {
    let payload = json!({ "error": "Unauthorized" });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

fn analysis_response(result: Result<AnalysisOutcome, AnalysisError>) -> Response {
    match result {
        Ok(outcome) => {
            let body = AnalysisResponse {
                success: true,
                outcome,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(AnalysisError::RateLimited { details }) => {
            let payload = json!({
                "error": "Rate limit exceeded. Please wait a moment and try again.",
                "details": details,
                "rateLimitExceeded": true,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(payload)).into_response()
        }
        Err(AnalysisError::Store(StoreError::NotFound)) => not_found(),
        Err(other) => {
            let payload = json!({
                "error": ANALYSIS_FAILED,
                "details": other.to_string(),
                "kind": other.kind(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn store_error_response(error: AnalysisError) -> Response {
    match error {
        AnalysisError::Store(StoreError::NotFound) => not_found(),
        other => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

fn not_found() -> Response {
    let payload = json!({ "error": "profile not found" });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
