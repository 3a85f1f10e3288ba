use serde::Serialize;

use super::domain::{AnalysisSnapshot, Category, CategoryHashes, Profile};
use super::fingerprint::fingerprint;

/// How much rescoring a request needs relative to the cached snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisMode<'a> {
    /// Nothing moved; the cached snapshot is returned as is.
    Cached { previous: &'a AnalysisSnapshot },
    /// Rescore `changed` only. An empty set means only the context moved.
    Partial {
        previous: &'a AnalysisSnapshot,
        changed: Vec<Category>,
    },
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisModeKind {
    Cached,
    Partial,
    Full,
}

/// Outcome of comparing a profile against its cached snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan<'a> {
    pub mode: AnalysisMode<'a>,
    pub fingerprints: CategoryHashes,
    pub context_changed: bool,
}

impl AnalysisPlan<'_> {
    pub fn kind(&self) -> AnalysisModeKind {
        match self.mode {
            AnalysisMode::Cached { .. } => AnalysisModeKind::Cached,
            AnalysisMode::Partial { .. } => AnalysisModeKind::Partial,
            AnalysisMode::Full => AnalysisModeKind::Full,
        }
    }

    /// Categories the oracle will be asked to score.
    pub fn changed(&self) -> &[Category] {
        match &self.mode {
            AnalysisMode::Cached { .. } => &[],
            AnalysisMode::Partial { changed, .. } => changed,
            AnalysisMode::Full => &Category::ALL,
        }
    }

    pub fn requires_oracle(&self) -> bool {
        !self.changed().is_empty()
    }
}

/// Pick the analysis mode for `profile` without touching the oracle or the store.
pub fn decide(profile: &Profile, force_refresh: bool) -> AnalysisPlan<'_> {
    let fingerprints = fingerprint(profile);

    let previous = match profile.profile_analysis.as_ref() {
        Some(previous) if !force_refresh => previous,
        _ => return full(fingerprints, false),
    };
    let Some(stored) = previous.category_hashes.as_ref() else {
        return full(fingerprints, false);
    };

    let context_changed = stored.context() != fingerprints.context();
    // A snapshot missing a score cannot be patched back to five categories.
    if !previous.is_complete() {
        return full(fingerprints, context_changed);
    }

    let changed: Vec<Category> = Category::ALL
        .into_iter()
        .filter(|category| stored.category(*category) != fingerprints.category(*category))
        .collect();

    let mode = if changed.is_empty() && !context_changed {
        AnalysisMode::Cached { previous }
    } else if changed.len() < Category::ALL.len() {
        AnalysisMode::Partial { previous, changed }
    } else {
        AnalysisMode::Full
    };

    AnalysisPlan {
        mode,
        fingerprints,
        context_changed,
    }
}

fn full(fingerprints: CategoryHashes, context_changed: bool) -> AnalysisPlan<'static> {
    AnalysisPlan {
        mode: AnalysisMode::Full,
        fingerprints,
        context_changed,
    }
}
