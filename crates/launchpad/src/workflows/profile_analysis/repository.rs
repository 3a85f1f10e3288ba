use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::Profile;

/// Identifier of a profile document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage abstraction for profiles and their cached analysis.
///
/// Writes are last-write-wins; two concurrent analyses of the same profile may both land.
pub trait ProfileStore: Send + Sync {
    fn get(&self, id: &ProfileId) -> Result<Option<Profile>, StoreError>;
    fn put(&self, id: &ProfileId, profile: Profile) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile not found")]
    NotFound,
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}
