use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One of the five independently scored profile dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Academics,
    TestScores,
    Extracurriculars,
    Awards,
    Essays,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Academics,
        Category::TestScores,
        Category::Extracurriculars,
        Category::Awards,
        Category::Essays,
    ];

    /// Wire key used in `scores` and `categoryHashes`.
    pub fn key(self) -> &'static str {
        match self {
            Category::Academics => "academics",
            Category::TestScores => "testScores",
            Category::Extracurriculars => "extracurriculars",
            Category::Awards => "awards",
            Category::Essays => "essays",
        }
    }

    /// Heading used when describing the category to the scoring model.
    pub fn label(self) -> &'static str {
        match self {
            Category::Academics => "Academic Excellence",
            Category::TestScores => "Test Scores",
            Category::Extracurriculars => "Extracurriculars",
            Category::Awards => "Awards",
            Category::Essays => "Essays",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Integer rating on the 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Rounds a model-provided rating to the nearest integer and clamps it into range.
    pub fn from_rating(raw: f64) -> Result<Self, InvalidScore> {
        if !raw.is_finite() {
            return Err(InvalidScore(raw));
        }
        let clamped = raw.round().clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        Ok(Self(clamped as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for Score {
    type Error = InvalidScore;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Score::from_rating(value)
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("score must be a finite number, got {0}")]
pub struct InvalidScore(pub f64);

pub type CategoryScores = BTreeMap<Category, Score>;

/// Mean of the given scores rounded to one decimal place.
pub fn overall_score(scores: &CategoryScores) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let total: u32 = scores.values().map(|score| u32::from(score.value())).sum();
    let mean = f64::from(total) / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub const CONTEXT_KEY: &str = "context";

/// Per-category fingerprints recorded alongside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryHashes(BTreeMap<String, String>);

impl CategoryHashes {
    pub fn category(&self, category: Category) -> Option<&str> {
        self.0.get(category.key()).map(String::as_str)
    }

    pub fn context(&self) -> Option<&str> {
        self.0.get(CONTEXT_KEY).map(String::as_str)
    }

    pub fn set_category(&mut self, category: Category, fingerprint: String) {
        self.0.insert(category.key().to_string(), fingerprint);
    }

    pub fn set_context(&mut self, fingerprint: String) {
        self.0.insert(CONTEXT_KEY.to_string(), fingerprint);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cached scoring result persisted on the profile as `profileAnalysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    #[serde(default)]
    pub scores: CategoryScores,
    #[serde(default)]
    pub overall_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_hashes: Option<CategoryHashes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl AnalysisSnapshot {
    /// True when every scored category carries a rating.
    pub fn is_complete(&self) -> bool {
        Category::ALL
            .iter()
            .all(|category| self.scores.contains_key(category))
    }
}

/// Grade, GPA, or subsection result; intake forms submit these as numbers or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Mark {
    Number(f64),
    Text(String),
}

impl Mark {
    pub fn is_blank(&self) -> bool {
        match self {
            Mark::Number(value) => *value == 0.0,
            Mark::Text(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Number(value) => write!(f, "{value}"),
            Mark::Text(text) => f.write_str(text),
        }
    }
}

/// Profiles written by older clients carry `null` where a list is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Student application profile as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academics: Option<Academics>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test_scores: Vec<TestScore>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extracurriculars: Vec<Extracurricular>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub awards: Vec<Award>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub essays: Vec<Essay>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub majors: Vec<Major>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_analysis: Option<AnalysisSnapshot>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Academics {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<Mark>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subjects: Vec<Subject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScore {
    #[serde(default)]
    pub test_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: BTreeMap<String, Option<Mark>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extracurricular {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Either a single essay blob or a multi-part supplement answered section by section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Essay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_word_count: Option<u32>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sections: Vec<EssaySection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_char_count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Essay {
    pub const DEFAULT_MAX_COUNT: u32 = 650;

    /// Full essay text; sectioned essays are joined with single spaces.
    pub fn text(&self) -> String {
        if self.sections.is_empty() {
            return self.content.clone().unwrap_or_default();
        }
        self.sections
            .iter()
            .map(EssaySection::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }

    pub fn char_count(&self) -> usize {
        self.text().chars().count()
    }

    pub fn max_count(&self) -> u32 {
        self.max_char_count
            .filter(|limit| *limit > 0)
            .or(self.max_word_count.filter(|limit| *limit > 0))
            .unwrap_or(Self::DEFAULT_MAX_COUNT)
    }

    /// Character-limited essays count as complete once any text exists, word-limited ones once a word exists.
    pub fn is_complete(&self) -> bool {
        match self.max_char_count {
            Some(limit) if limit > 0 => self.char_count() > 0,
            _ => self.word_count() > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssaySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EssaySection {
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|content| !content.is_empty())
            .or(self.answer.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Major {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_rounds_and_clamps_ratings() {
        assert_eq!(Score::from_rating(7.4).expect("finite").value(), 7);
        assert_eq!(Score::from_rating(7.5).expect("finite").value(), 8);
        assert_eq!(Score::from_rating(0.0).expect("finite").value(), 1);
        assert_eq!(Score::from_rating(14.0).expect("finite").value(), 10);
        assert!(Score::from_rating(f64::NAN).is_err());
        assert!(Score::new(0).is_none());
        assert!(Score::new(11).is_none());
    }

    #[test]
    fn overall_score_rounds_to_one_decimal() {
        let scores: CategoryScores = [
            (Category::Academics, 7),
            (Category::TestScores, 8),
            (Category::Extracurriculars, 6),
            (Category::Awards, 5),
            (Category::Essays, 7),
        ]
        .into_iter()
        .map(|(category, value)| (category, Score::new(value).expect("in range")))
        .collect();

        assert_eq!(overall_score(&scores), 6.6);
        assert_eq!(overall_score(&CategoryScores::new()), 0.0);
    }

    #[test]
    fn snapshot_uses_camel_case_wire_keys() {
        let snapshot: AnalysisSnapshot = serde_json::from_value(json!({
            "scores": { "academics": 7, "testScores": 8.0, "extracurriculars": 6,
                        "awards": 5, "essays": 7 },
            "overallScore": 6.6,
            "strengths": ["Rigorous course load"],
            "categoryHashes": { "academics": "a", "context": "c" }
        }))
        .expect("snapshot parses");

        assert!(snapshot.is_complete());
        assert_eq!(snapshot.scores[&Category::TestScores].value(), 8);
        let hashes = snapshot.category_hashes.as_ref().expect("hashes present");
        assert_eq!(hashes.category(Category::Academics), Some("a"));
        assert_eq!(hashes.context(), Some("c"));
        assert!(snapshot.weaknesses.is_empty());

        let encoded = serde_json::to_value(&snapshot).expect("serializes");
        assert_eq!(encoded["scores"]["testScores"], json!(8));
        assert!(encoded.get("analyzedAt").is_none());
    }

    #[test]
    fn profile_keeps_unknown_fields() {
        let raw = json!({
            "username": "ada",
            "academics": { "type": "IB", "gpa": "3.9", "subjects": [] },
            "essays": [{ "title": "Why us", "sections": [{ "answer": "Because" }], "maxCharCount": 500 }],
            "efc": 12000
        });
        let profile: Profile = serde_json::from_value(raw).expect("profile parses");

        assert_eq!(profile.extra.get("username"), Some(&json!("ada")));
        let academics = profile.academics.as_ref().expect("academics");
        assert_eq!(academics.gpa, Some(Mark::Text("3.9".to_string())));
        assert_eq!(profile.efc, Some(12000.0));

        let encoded = serde_json::to_value(&profile).expect("serializes");
        assert_eq!(encoded["username"], json!("ada"));
        assert_eq!(encoded["academics"]["type"], json!("IB"));
    }

    #[test]
    fn null_collections_read_as_empty() {
        let raw = json!({
            "nationality": "Ghana",
            "testScores": null,
            "awards": null,
            "academics": { "type": "IB", "subjects": null },
            "essays": [{ "title": "Personal", "sections": null }]
        });
        let profile: Profile = serde_json::from_value(raw).expect("profile parses");

        assert!(profile.test_scores.is_empty());
        assert!(profile.awards.is_empty());
        assert!(profile.academics.expect("academics").subjects.is_empty());
        assert!(profile.essays[0].sections.is_empty());
        assert_eq!(profile.nationality.as_deref(), Some("Ghana"));
    }

    #[test]
    fn essay_counts_follow_limit_kind() {
        let sectioned = Essay {
            sections: vec![
                EssaySection {
                    content: Some("First part".to_string()),
                    ..EssaySection::default()
                },
                EssaySection {
                    content: Some(String::new()),
                    answer: Some("second".to_string()),
                    ..EssaySection::default()
                },
            ],
            max_char_count: Some(4000),
            ..Essay::default()
        };
        assert_eq!(sectioned.text(), "First part second");
        assert_eq!(sectioned.word_count(), 3);
        assert_eq!(sectioned.char_count(), 17);
        assert_eq!(sectioned.max_count(), 4000);
        assert!(sectioned.is_complete());

        let empty = Essay::default();
        assert_eq!(empty.max_count(), Essay::DEFAULT_MAX_COUNT);
        assert!(!empty.is_complete());
    }
}
