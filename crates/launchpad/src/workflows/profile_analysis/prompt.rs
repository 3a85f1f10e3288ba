use std::fmt::Write as _;

use super::decision::{AnalysisMode, AnalysisPlan};
use super::domain::{AnalysisSnapshot, Category, Essay, Profile};

const NOT_SPECIFIED: &str = "Not specified";

const TEST_SCORE_ANCHORS: &str =
    "SAT 1550-1600 or ACT 35-36 = 9-10; SAT 1450-1540 or ACT 33-34 = 7-8";
const EXTENDED_TEST_SCORE_ANCHORS: &str =
    "SAT 1550-1600 or ACT 35-36 = 9-10; SAT 1450-1540 or ACT 33-34 = 7-8; SAT 1350-1440 or ACT 30-32 = 6-7";

/// Scoring instruction sent to the oracle together with the categories it must rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OraclePrompt {
    pub text: String,
    pub requested: Vec<Category>,
}

/// Build the oracle request for `plan`; `None` when no rescoring is needed.
pub fn build_request(profile: &Profile, plan: &AnalysisPlan<'_>) -> Option<OraclePrompt> {
    match &plan.mode {
        AnalysisMode::Cached { .. } => None,
        AnalysisMode::Partial { changed, .. } if changed.is_empty() => None,
        AnalysisMode::Partial { previous, changed } => {
            Some(partial_request(profile, previous, changed))
        }
        AnalysisMode::Full => Some(full_request(profile)),
    }
}

pub(crate) fn full_request(profile: &Profile) -> OraclePrompt {
    let summary = ProfileSummary::from_profile(profile);
    OraclePrompt {
        text: full_prompt(&summary),
        requested: Category::ALL.to_vec(),
    }
}

pub(crate) fn partial_request(
    profile: &Profile,
    previous: &AnalysisSnapshot,
    changed: &[Category],
) -> OraclePrompt {
    let summary = ProfileSummary::from_profile(profile);
    OraclePrompt {
        text: partial_prompt(&summary, previous, changed),
        requested: changed.to_vec(),
    }
}

struct EssaySummary {
    title: String,
    word_count: usize,
    char_count: usize,
    max_count: u32,
    sections: usize,
    complete: bool,
}

impl EssaySummary {
    fn from_essay(essay: &Essay) -> Self {
        Self {
            title: essay
                .title
                .clone()
                .unwrap_or_else(|| "Untitled essay".to_string()),
            word_count: essay.word_count(),
            char_count: essay.char_count(),
            max_count: essay.max_count(),
            sections: essay.sections.len(),
            complete: essay.is_complete(),
        }
    }

    fn describe(&self) -> String {
        let written = match (self.complete, self.char_count) {
            (false, _) => 0,
            (true, 0) => self.word_count,
            (true, chars) => chars,
        };
        let unit = if self.char_count > 0 {
            "characters"
        } else {
            "words"
        };
        let mut line = format!("{} ({}/{} {}", self.title, written, self.max_count, unit);
        if self.sections > 0 {
            let _ = write!(line, ", {} sections", self.sections);
        }
        line.push(')');
        line
    }
}

struct ProfileSummary {
    majors: Vec<String>,
    nationality: String,
    efc: String,
    essays: Vec<EssaySummary>,
    extracurricular_count: usize,
    award_count: usize,
    test_scores: String,
    academic_type: String,
    gpa: String,
    subject_count: usize,
}

impl ProfileSummary {
    fn from_profile(profile: &Profile) -> Self {
        let academics = profile.academics.as_ref();
        Self {
            majors: profile
                .majors
                .iter()
                .filter_map(|major| major.name.clone())
                .filter(|name| !name.trim().is_empty())
                .collect(),
            nationality: profile
                .nationality
                .clone()
                .filter(|nationality| !nationality.trim().is_empty())
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            efc: profile
                .efc
                .map(format_currency)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            essays: profile.essays.iter().map(EssaySummary::from_essay).collect(),
            extracurricular_count: profile.extracurriculars.len(),
            award_count: profile.awards.len(),
            test_scores: describe_test_scores(profile),
            academic_type: academics
                .and_then(|academics| academics.kind.clone())
                .filter(|kind| !kind.trim().is_empty())
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            gpa: academics
                .and_then(|academics| academics.gpa.as_ref())
                .filter(|gpa| !gpa.is_blank())
                .map(ToString::to_string)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            subject_count: academics.map_or(0, |academics| academics.subjects.len()),
        }
    }

    fn majors_line(&self) -> String {
        if self.majors.is_empty() {
            "None".to_string()
        } else {
            self.majors.join(", ")
        }
    }

    fn essays_line(&self) -> String {
        let listed = self
            .essays
            .iter()
            .map(EssaySummary::describe)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} essays - {}", self.essays.len(), listed)
    }

    fn describe(&self, category: Category) -> String {
        let detail = match category {
            Category::Academics => format!(
                "GPA {}, {} subjects, Type: {}",
                self.gpa, self.subject_count, self.academic_type
            ),
            Category::TestScores => self.test_scores.clone(),
            Category::Extracurriculars => format!("{} activities", self.extracurricular_count),
            Category::Awards => format!("{} awards/honors", self.award_count),
            Category::Essays => self.essays_line(),
        };
        format!("{}: {detail}", category.label())
    }
}

fn describe_test_scores(profile: &Profile) -> String {
    if profile.test_scores.is_empty() {
        return "None".to_string();
    }
    profile
        .test_scores
        .iter()
        .map(|test| {
            let details = test
                .scores
                .iter()
                .filter_map(|(section, mark)| {
                    mark.as_ref()
                        .filter(|mark| !mark.is_blank())
                        .map(|mark| format!("{section}: {mark}"))
                })
                .collect::<Vec<_>>()
                .join(", ");
            let details = if details.is_empty() {
                "No scores".to_string()
            } else {
                details
            };
            format!("{} ({})", test.test_type, details)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Dollar amount with thousands separators, e.g. `$12,345` or `$1,200.5`.
pub(crate) fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{sign}${grouped}")
    } else {
        let decimals = format!("{fraction:02}");
        format!("{sign}${grouped}.{}", decimals.trim_end_matches('0'))
    }
}

fn full_prompt(summary: &ProfileSummary) -> String {
    format!(
        r#"You are a harsh but fair college admissions expert analyzing a student's application profile. Provide a realistic, holistic assessment.

Profile Data:
- Intended Majors: {majors}
- Nationality: {nationality}
- Expected Family Contribution (EFC): {efc}
- Essays: {essays}
- Extracurriculars: {extracurriculars} activities
- Awards: {awards} awards/honors
- Test Scores: {tests}
- Academic Type: {academic_type}
- GPA: {gpa}
- Subjects: {subjects} subjects

Rate each category from 1-10 (be realistic but fair):
1. Academic Excellence (grades, rigor, consistency)
2. Test Scores (standardized test performance - {anchors})
3. Extracurricular Impact (depth, leadership, commitment)
4. Awards & Recognition (prestige, relevance, achievement)
5. Essay Quality (based on completion and variety)

Provide your response in the following JSON format only (no additional text):
{{
  "scores": {{
    "academics": <number 1-10>,
    "testScores": <number 1-10>,
    "extracurriculars": <number 1-10>,
    "awards": <number 1-10>,
    "essays": <number 1-10>
  }},
  "overallScore": <average of all scores, 1 decimal>,
  "strengths": ["strength1", "strength2", "strength3"],
  "weaknesses": ["weakness1", "weakness2", "weakness3"],
  "improvements": ["improvement1", "improvement2", "improvement3"]
}}

Be realistic and constructive. Consider:
- Are academics rigorous enough for top-tier schools?
- Test scores: A perfect SAT 1600 or ACT 36 deserves a 10. Near-perfect (1550+, 35+) deserves 9-10.
- Do extracurriculars show genuine passion and impact?
- Are awards prestigious and relevant?
- Do essays appear complete and well-thought-out? (Consider TOTAL content across ALL sections, not just word count)
- Does everything tell a coherent story about the student's interests and goals?

IMPORTANT:
- Give appropriate credit for excellent test scores. A 1600 SAT is exceptional and should be rated 10/10.
- For essays with sections: An essay with 3998/4000 characters across multiple sections is COMPLETE, not incomplete!
- Judge essay quality on total content length and number of sections completed, not individual section lengths."#,
        majors = summary.majors_line(),
        nationality = summary.nationality,
        efc = summary.efc,
        essays = summary.essays_line(),
        extracurriculars = summary.extracurricular_count,
        awards = summary.award_count,
        tests = summary.test_scores,
        academic_type = summary.academic_type,
        gpa = summary.gpa,
        subjects = summary.subject_count,
        anchors = EXTENDED_TEST_SCORE_ANCHORS,
    )
}

fn partial_prompt(
    summary: &ProfileSummary,
    previous: &AnalysisSnapshot,
    changed: &[Category],
) -> String {
    let updated = changed
        .iter()
        .map(|category| summary.describe(*category))
        .collect::<Vec<_>>()
        .join("\n- ");

    let unchanged = previous
        .scores
        .iter()
        .filter(|(category, _)| !changed.contains(category))
        .map(|(category, score)| format!("- {category}: {score}/10"))
        .collect::<Vec<_>>()
        .join("\n");

    let template = changed
        .iter()
        .map(|category| format!("\"{category}\": <number 1-10>"))
        .collect::<Vec<_>>()
        .join(",\n    ");

    format!(
        r#"You are a college admissions expert. Rate ONLY the following categories that have been updated (1-10 scale):

Updated Categories:
- {updated}

Context:
- Intended Majors: {majors}
- Nationality: {nationality}
- EFC: {efc}

Previous scores for unchanged categories:
{unchanged}

Provide ONLY the updated scores in JSON format:
{{
  "scores": {{
    {template}
  }}
}}

Rating guidelines:
- Academic Excellence: GPA, rigor, consistency
- Test Scores: {anchors}
- Extracurriculars: depth, leadership, commitment
- Awards: prestige, relevance, achievement
- Essays: completion, variety, quality"#,
        majors = summary.majors_line(),
        nationality = summary.nationality,
        efc = summary.efc,
        anchors = TEST_SCORE_ANCHORS,
    )
}
