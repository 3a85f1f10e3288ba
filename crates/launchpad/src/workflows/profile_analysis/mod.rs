//! Change-aware profile analysis.
//!
//! A request flows through [`decide`] (fingerprint every category and compare with the cached
//! snapshot), [`build_request`] (prompt for the categories that moved), the [`ScoringOracle`],
//! [`parse_full`]/[`parse_partial`], and finally [`merge_full`]/[`merge_partial`]. The
//! [`ProfileAnalysisService`] wires those steps to an injected [`ProfileStore`] and oracle, and
//! [`analysis_router`] exposes them over HTTP behind a [`SessionVerifier`].

pub mod decision;
pub mod domain;
pub mod fingerprint;
pub mod merge;
pub mod oracle;
pub mod prompt;
pub mod repository;
pub mod response;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use decision::{decide, AnalysisMode, AnalysisModeKind, AnalysisPlan};
pub use domain::{
    overall_score, Academics, AnalysisSnapshot, Award, Category, CategoryHashes, CategoryScores,
    Essay, EssaySection, Extracurricular, Major, Mark, Profile, Score, Subject, TestScore,
};
pub use fingerprint::{category_fingerprint, fingerprint};
pub use merge::{merge_full, merge_partial};
pub use oracle::{ChatCompletionsOracle, OracleError, ScoringOracle};
pub use prompt::{build_request, OraclePrompt};
pub use repository::{ProfileId, ProfileStore, StoreError};
pub use response::{extract_json_object, parse_full, parse_partial, FullAssessment, MalformedResponse};
pub use router::{analysis_router, AnalyzeProfileRequest, RefreshRequest};
pub use service::{AnalysisError, AnalysisOutcome, FailureKind, ProfileAnalysisService};
pub use session::{session_token, Session, SessionVerifier, StaticTokenVerifier};
