use launchpad::error::AppError;
use launchpad::workflows::profile_analysis::{Profile, ProfileId, ProfileStore, StoreError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileStore {
    profiles: Arc<Mutex<HashMap<ProfileId, Profile>>>,
}

impl InMemoryProfileStore {
    /// Load a `{ "<profile id>": { ...profile } }` document.
    pub(crate) fn seed_from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let profiles: HashMap<ProfileId, Profile> = serde_json::from_str(&raw)?;
        Ok(Self {
            profiles: Arc::new(Mutex::new(profiles)),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.guard().map(|guard| guard.len()).unwrap_or_default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<ProfileId, Profile>>, StoreError> {
        self.profiles
            .lock()
            .map_err(|_| StoreError::Unavailable("profile store mutex poisoned".to_string()))
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, id: &ProfileId) -> Result<Option<Profile>, StoreError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn put(&self, id: &ProfileId, profile: Profile) -> Result<(), StoreError> {
        self.guard()?.insert(id.clone(), profile);
        Ok(())
    }
}

pub(crate) fn read_profile(path: &Path) -> Result<Profile, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn write_profile(path: &Path, profile: &Profile) -> Result<(), AppError> {
    let mut rendered = serde_json::to_string_pretty(profile)?;
    rendered.push('\n');
    std::fs::write(path, rendered)?;
    Ok(())
}
