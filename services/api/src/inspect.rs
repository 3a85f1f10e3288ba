use crate::infra::{read_profile, write_profile, InMemoryProfileStore};
use clap::Args;
use launchpad::config::AppConfig;
use launchpad::error::AppError;
use launchpad::workflows::profile_analysis::{
    decide, AnalysisError, AnalysisModeKind, AnalysisPlan, Category, CategoryHashes,
    ChatCompletionsOracle, Profile, ProfileAnalysisService,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct PlanArgs {
    /// Profile JSON document to inspect
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Ignore the cached snapshot
    #[arg(long)]
    pub(crate) force_refresh: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Profile JSON document to analyze
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Ignore the cached snapshot and rescore every category
    #[arg(long)]
    pub(crate) force_refresh: bool,
    /// Write the profile back with the merged snapshot when it changed
    #[arg(long)]
    pub(crate) write: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlanReport {
    mode: AnalysisModeKind,
    changed: Vec<Category>,
    context_changed: bool,
    requires_oracle: bool,
    fingerprints: CategoryHashes,
}

impl PlanReport {
    fn from_plan(plan: AnalysisPlan<'_>) -> Self {
        Self {
            mode: plan.kind(),
            changed: plan.changed().to_vec(),
            context_changed: plan.context_changed,
            requires_oracle: plan.requires_oracle(),
            fingerprints: plan.fingerprints,
        }
    }
}

pub(crate) fn plan_report(profile: &Profile, force_refresh: bool) -> PlanReport {
    PlanReport::from_plan(decide(profile, force_refresh))
}

pub(crate) fn run_plan(args: PlanArgs) -> Result<(), AppError> {
    let profile = read_profile(&args.profile)?;
    let report = plan_report(&profile, args.force_refresh);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) async fn run_analysis(args: RunArgs) -> Result<(), AppError> {
    let RunArgs {
        profile: path,
        force_refresh,
        write,
    } = args;

    let config = AppConfig::load()?;
    let mut profile = read_profile(&path)?;

    let oracle = ChatCompletionsOracle::new(&config.oracle).map_err(AnalysisError::from)?;
    let service = ProfileAnalysisService::new(
        Arc::new(InMemoryProfileStore::default()),
        Arc::new(oracle),
    );

    let outcome = service.analyze(&profile, force_refresh).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if write && outcome.should_cache {
        profile.profile_analysis = Some(outcome.analysis);
        write_profile(&path, &profile)?;
        eprintln!("Updated {}", path.display());
    }

    Ok(())
}
