use chrono::{DateTime, Utc};

use super::domain::{overall_score, AnalysisSnapshot, CategoryHashes, CategoryScores};
use super::response::FullAssessment;

/// Replace the snapshot wholesale with a fresh full assessment.
pub fn merge_full(
    assessment: FullAssessment,
    fingerprints: CategoryHashes,
    analyzed_at: DateTime<Utc>,
) -> AnalysisSnapshot {
    let FullAssessment {
        scores,
        strengths,
        weaknesses,
        improvements,
    } = assessment;

    AnalysisSnapshot {
        overall_score: overall_score(&scores),
        scores,
        strengths,
        weaknesses,
        improvements,
        category_hashes: Some(fingerprints),
        analyzed_at: Some(analyzed_at),
    }
}

/// Overwrite the rescored categories, keep everything else, and recompute the overall score.
///
/// Rationale lists are carried over verbatim even though they were written against the previous
/// scores; only a full refresh regenerates them.
pub fn merge_partial(
    previous: &AnalysisSnapshot,
    rescored: CategoryScores,
    fingerprints: CategoryHashes,
    analyzed_at: DateTime<Utc>,
) -> AnalysisSnapshot {
    let mut scores = previous.scores.clone();
    scores.extend(rescored);

    AnalysisSnapshot {
        overall_score: overall_score(&scores),
        scores,
        strengths: previous.strengths.clone(),
        weaknesses: previous.weaknesses.clone(),
        improvements: previous.improvements.clone(),
        category_hashes: Some(fingerprints),
        analyzed_at: Some(analyzed_at),
    }
}
