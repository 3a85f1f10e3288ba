use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::profile_analysis::domain::{
    AnalysisSnapshot, Category, CategoryScores, Profile, Score,
};
use crate::workflows::profile_analysis::fingerprint::fingerprint;
use crate::workflows::profile_analysis::oracle::{OracleError, ScoringOracle};
use crate::workflows::profile_analysis::repository::{ProfileId, ProfileStore, StoreError};
use crate::workflows::profile_analysis::session::StaticTokenVerifier;
use crate::workflows::profile_analysis::{analysis_router, ProfileAnalysisService};

pub(super) const TOKEN: &str = "test-session-token";

pub(super) fn profile() -> Profile {
    serde_json::from_value(json!({
        "username": "kwame",
        "academics": {
            "type": "IB",
            "gpa": "3.9",
            "subjects": [
                { "name": "HL Physics", "grade": 7 },
                { "name": "HL Mathematics AA", "grade": 7 },
                { "name": "SL English", "grade": 6 }
            ]
        },
        "testScores": [{ "testType": "SAT", "scores": { "math": 790, "reading": 740 } }],
        "extracurriculars": [
            { "name": "Robotics Club", "role": "Captain", "id": "ec-1" },
            { "name": "Community Tutoring", "role": "Founder", "id": "ec-2" }
        ],
        "awards": [{ "name": "National Physics Olympiad", "level": "National" }],
        "essays": [
            { "title": "Personal Statement", "content": "When the drone first lifted off the ground...", "maxWordCount": 650 }
        ],
        "majors": [{ "name": "Mechanical Engineering" }],
        "nationality": "Ghana",
        "efc": 4500
    }))
    .expect("fixture profile parses")
}

pub(super) fn scores(values: [u8; 5]) -> CategoryScores {
    Category::ALL
        .into_iter()
        .zip(values)
        .map(|(category, value)| (category, Score::new(value).expect("score in range")))
        .collect()
}

/// Snapshot matching the worked example: 7/8/6/5/7, overall 6.6.
pub(super) fn snapshot_for(profile: &Profile) -> AnalysisSnapshot {
    AnalysisSnapshot {
        scores: scores([7, 8, 6, 5, 7]),
        overall_score: 6.6,
        strengths: vec![
            "Strong quantitative record".to_string(),
            "Clear engineering focus".to_string(),
            "Sustained leadership".to_string(),
        ],
        weaknesses: vec![
            "Few awards".to_string(),
            "Limited service hours".to_string(),
            "Single essay drafted".to_string(),
        ],
        improvements: vec![
            "Enter a national competition".to_string(),
            "Expand the tutoring program".to_string(),
            "Draft supplemental essays".to_string(),
        ],
        category_hashes: Some(fingerprint(profile)),
        analyzed_at: None,
    }
}

pub(super) fn cached_profile() -> Profile {
    let mut profile = profile();
    profile.profile_analysis = Some(snapshot_for(&profile));
    profile
}

pub(super) fn full_reply(values: [u8; 5]) -> String {
    format!(
        "Here is my assessment:\n{}\nGood luck!",
        json!({
            "scores": {
                "academics": values[0],
                "testScores": values[1],
                "extracurriculars": values[2],
                "awards": values[3],
                "essays": values[4]
            },
            "overallScore": 0.0,
            "strengths": ["s1", "s2", "s3"],
            "weaknesses": ["w1", "w2", "w3"],
            "improvements": ["i1", "i2", "i3"]
        })
    )
}

#[derive(Default)]
pub(super) struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub(super) fn replying<I, T>(replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(error: OracleError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt mutex poisoned").clone()
    }

    pub(super) fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt mutex poisoned").len()
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts
            .lock()
            .expect("prompt mutex poisoned")
            .push(prompt.to_string());
        self.replies
            .lock()
            .expect("reply mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Transport("no scripted reply".to_string())))
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    profiles: Mutex<HashMap<ProfileId, Profile>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn seeded(id: &str, profile: Profile) -> Self {
        let store = Self::default();
        store
            .profiles
            .lock()
            .expect("store mutex poisoned")
            .insert(ProfileId(id.to_string()), profile);
        store
    }

    pub(super) fn stored(&self, id: &str) -> Option<Profile> {
        self.profiles
            .lock()
            .expect("store mutex poisoned")
            .get(&ProfileId(id.to_string()))
            .cloned()
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ProfileStore for MemoryStore {
    fn get(&self, id: &ProfileId) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn put(&self, id: &ProfileId, profile: Profile) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .expect("store mutex poisoned")
            .insert(id.clone(), profile);
        Ok(())
    }
}

pub(super) struct UnavailableStore;

impl ProfileStore for UnavailableStore {
    fn get(&self, _id: &ProfileId) -> Result<Option<Profile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn put(&self, _id: &ProfileId, _profile: Profile) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service(
    oracle: ScriptedOracle,
    store: MemoryStore,
) -> (
    ProfileAnalysisService<MemoryStore, ScriptedOracle>,
    Arc<MemoryStore>,
    Arc<ScriptedOracle>,
) {
    let store = Arc::new(store);
    let oracle = Arc::new(oracle);
    let service = ProfileAnalysisService::new(store.clone(), oracle.clone());
    (service, store, oracle)
}

pub(super) fn router_with_service<S, O>(service: ProfileAnalysisService<S, O>) -> axum::Router
where
    S: ProfileStore + 'static,
    O: ScoringOracle + 'static,
{
    analysis_router(
        Arc::new(service),
        Arc::new(StaticTokenVerifier::new([TOKEN])),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
