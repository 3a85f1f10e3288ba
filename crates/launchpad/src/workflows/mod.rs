pub mod profile_analysis;
