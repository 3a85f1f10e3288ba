use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::decision::{decide, AnalysisMode, AnalysisPlan};
use super::domain::{AnalysisSnapshot, CategoryScores, Profile};
use super::merge::{merge_full, merge_partial};
use super::oracle::{OracleError, ScoringOracle};
use super::prompt::{full_request, partial_request, OraclePrompt};
use super::repository::{ProfileId, ProfileStore, StoreError};
use super::response::{parse_full, parse_partial, MalformedResponse};

const CONTEXT_ADVISORY: &str =
    "Context changed since the last analysis; request a full refresh to regenerate feedback.";

/// Result of one analysis call as exposed to HTTP callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub analysis: AnalysisSnapshot,
    pub cached: bool,
    pub partial: bool,
    pub should_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Service composing the change detector, the scoring oracle, and the profile store.
pub struct ProfileAnalysisService<S, O> {
    store: Arc<S>,
    oracle: Arc<O>,
}

impl<S, O> ProfileAnalysisService<S, O>
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    pub fn new(store: Arc<S>, oracle: Arc<O>) -> Self {
        Self { store, oracle }
    }

    /// Analyze a caller-supplied profile. Never writes to the store.
    pub async fn analyze(
        &self,
        profile: &Profile,
        force_refresh: bool,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let plan = decide(profile, force_refresh);
        log_plan(&plan, force_refresh);

        let analyzed_at = Utc::now();

        match plan.mode {
            AnalysisMode::Cached { previous } => Ok(AnalysisOutcome {
                analysis: previous.clone(),
                cached: true,
                partial: false,
                should_cache: false,
                advisory: None,
            }),
            AnalysisMode::Partial { previous, changed } => {
                let rescored = if changed.is_empty() {
                    CategoryScores::new()
                } else {
                    let prompt = partial_request(profile, previous, &changed);
                    let reply = self.consult(&prompt).await?;
                    parse_partial(&reply, &prompt.requested).inspect_err(|err| {
                        warn!(error = %err, "partial analysis reply could not be parsed");
                    })?
                };

                let advisory = plan.context_changed.then(|| {
                    warn!("profile context changed; keeping previous feedback until a full refresh");
                    CONTEXT_ADVISORY.to_string()
                });

                let analysis = merge_partial(previous, rescored, plan.fingerprints, analyzed_at);
                info!(
                    rescored = changed.len(),
                    overall = analysis.overall_score,
                    "partial analysis merged"
                );

                Ok(AnalysisOutcome {
                    analysis,
                    cached: false,
                    partial: true,
                    should_cache: true,
                    advisory,
                })
            }
            AnalysisMode::Full => {
                let reply = self.consult(&full_request(profile)).await?;
                let assessment = parse_full(&reply).inspect_err(|err| {
                    warn!(error = %err, "full analysis reply could not be parsed");
                })?;

                let analysis = merge_full(assessment, plan.fingerprints, analyzed_at);
                info!(overall = analysis.overall_score, "full analysis complete");

                Ok(AnalysisOutcome {
                    analysis,
                    cached: false,
                    partial: false,
                    should_cache: true,
                    advisory: None,
                })
            }
        }
    }

    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, AnalysisError> {
        debug!(requested = ?prompt.requested, "requesting scores");
        self.oracle.complete(&prompt.text).await.map_err(|err| {
            warn!(error = %err, "scoring service call failed");
            AnalysisError::from(err)
        })
    }

    /// Analyze `profile` and persist the merged snapshot under `id` when it changed.
    pub async fn analyze_and_store(
        &self,
        id: &ProfileId,
        mut profile: Profile,
        force_refresh: bool,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let outcome = self.analyze(&profile, force_refresh).await?;

        if outcome.should_cache {
            profile.profile_analysis = Some(outcome.analysis.clone());
            self.store.put(id, profile)?;
            debug!(profile_id = %id, "analysis snapshot stored");
        }

        Ok(outcome)
    }

    /// Load a stored profile, analyze it, and write the result back.
    pub async fn analyze_stored(
        &self,
        id: &ProfileId,
        force_refresh: bool,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let profile = self.get_profile(id)?;
        self.analyze_and_store(id, profile, force_refresh).await
    }

    pub fn get_profile(&self, id: &ProfileId) -> Result<Profile, AnalysisError> {
        let profile = self.store.get(id)?.ok_or(StoreError::NotFound)?;
        Ok(profile)
    }

    pub fn put_profile(&self, id: &ProfileId, profile: Profile) -> Result<(), AnalysisError> {
        self.store.put(id, profile)?;
        Ok(())
    }
}

fn log_plan(plan: &AnalysisPlan<'_>, force_refresh: bool) {
    match &plan.mode {
        AnalysisMode::Cached { .. } => info!("using cached analysis; no changes detected"),
        AnalysisMode::Partial { changed, .. } => {
            for category in changed {
                debug!(%category, "category changed since last analysis");
            }
            info!(
                changed = ?changed,
                context_changed = plan.context_changed,
                "partial analysis needed"
            );
        }
        AnalysisMode::Full => info!(force_refresh, "full profile analysis needed"),
    }
}

/// Error raised by the analysis service. Every variant leaves the stored snapshot untouched.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("scoring service rate limit reached: {details}")]
    RateLimited { details: String },
    #[error("could not parse scoring response: {0}")]
    MalformedResponse(#[from] MalformedResponse),
    #[error("scoring service unavailable: {0}")]
    OracleUnavailable(#[source] OracleError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stable failure classification for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    MalformedResponse,
    OracleUnavailable,
    StoreUnavailable,
    /// The HTTP body could not be read as the expected JSON document.
    InvalidRequest,
}

impl AnalysisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::RateLimited { .. } => FailureKind::RateLimited,
            AnalysisError::MalformedResponse(_) => FailureKind::MalformedResponse,
            AnalysisError::OracleUnavailable(_) => FailureKind::OracleUnavailable,
            AnalysisError::Store(_) => FailureKind::StoreUnavailable,
        }
    }
}

impl From<OracleError> for AnalysisError {
    fn from(value: OracleError) -> Self {
        match value {
            OracleError::RateLimited(details) => AnalysisError::RateLimited { details },
            other => AnalysisError::OracleUnavailable(other),
        }
    }
}
