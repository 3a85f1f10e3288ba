//! Change-aware scoring of college application profiles.
//!
//! The [`workflows::profile_analysis`] module fingerprints each profile category, compares the
//! fingerprints with the cached analysis, and only asks the scoring model to rescore what moved.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
