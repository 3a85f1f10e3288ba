use serde_json::{Map, Value};

use super::domain::{Category, CategoryScores, Score};

const RATIONALE_LIMIT: usize = 3;

/// Reasons an oracle reply could not be turned into scores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedResponse {
    #[error("response did not contain a JSON object")]
    MissingObject,
    #[error("response JSON could not be parsed: {0}")]
    InvalidJson(String),
    #[error("response is missing the '{0}' field")]
    MissingField(&'static str),
    #[error("response is missing a score for {0}")]
    MissingScore(Category),
    #[error("score for {0} is not a number")]
    NonNumericScore(Category),
}

/// Complete assessment returned on the full-analysis path.
#[derive(Debug, Clone, PartialEq)]
pub struct FullAssessment {
    pub scores: CategoryScores,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvements: Vec<String>,
}

/// Find the first brace-balanced JSON object in `text`, skipping prose around it.
///
/// Segments are scanned left to right and never overlap: a segment that fails to parse is
/// skipped as a whole, so each byte is scanned once. An unclosed brace ends the search.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, MalformedResponse> {
    let mut last_error = None;
    let mut offset = 0;

    while let Some(start) = text[offset..].find('{').map(|index| offset + index) {
        let Some(end) = balanced_end(&text[start..]).map(|len| start + len) else {
            break;
        };
        match serde_json::from_str::<Map<String, Value>>(&text[start..end]) {
            Ok(object) => return Ok(object),
            Err(err) => last_error = Some(err.to_string()),
        }
        offset = end;
    }

    Err(match last_error {
        Some(message) => MalformedResponse::InvalidJson(message),
        None => MalformedResponse::MissingObject,
    })
}

/// Byte length of the object opening at the start of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

pub fn parse_full(text: &str) -> Result<FullAssessment, MalformedResponse> {
    let object = extract_json_object(text)?;
    let scores = parse_scores(&object, &Category::ALL)?;

    Ok(FullAssessment {
        scores,
        strengths: parse_rationale(&object, "strengths")?,
        weaknesses: parse_rationale(&object, "weaknesses")?,
        improvements: parse_rationale(&object, "improvements")?,
    })
}

/// Scores for `requested` only; ratings for other categories are dropped.
pub fn parse_partial(
    text: &str,
    requested: &[Category],
) -> Result<CategoryScores, MalformedResponse> {
    let object = extract_json_object(text)?;
    parse_scores(&object, requested)
}

fn parse_scores(
    object: &Map<String, Value>,
    requested: &[Category],
) -> Result<CategoryScores, MalformedResponse> {
    let scores = object
        .get("scores")
        .and_then(Value::as_object)
        .ok_or(MalformedResponse::MissingField("scores"))?;

    requested
        .iter()
        .map(|category| {
            let raw = scores
                .get(category.key())
                .ok_or(MalformedResponse::MissingScore(*category))?;
            let rating = match raw {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or(MalformedResponse::NonNumericScore(*category))?;
            let score = Score::from_rating(rating)
                .map_err(|_| MalformedResponse::NonNumericScore(*category))?;
            Ok((*category, score))
        })
        .collect()
}

fn parse_rationale(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, MalformedResponse> {
    let items = object
        .get(field)
        .and_then(Value::as_array)
        .ok_or(MalformedResponse::MissingField(field))?;

    Ok(items
        .iter()
        .map(|item| match item {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .take(RATIONALE_LIMIT)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPLY: &str = r#"{
        "scores": { "academics": 8, "testScores": 9, "extracurriculars": 7, "awards": 6, "essays": 7 },
        "overallScore": 9.9,
        "strengths": ["Near-perfect SAT", "Sustained robotics leadership", "Clear engineering narrative", "extra"],
        "weaknesses": ["Few national awards", "Thin service record", "Generic supplement"],
        "improvements": ["Enter USACO", "Lead a service project", "Revise the supplement"]
    }"#;

    #[test]
    fn tolerates_prose_around_the_payload() {
        let text = "Sure, here you go:\n{\"scores\":{\"essays\":9}}\nLet me know!";
        let scores = parse_partial(text, &[Category::Essays]).expect("embedded object parses");
        assert_eq!(scores[&Category::Essays].value(), 9);
    }

    #[test]
    fn prose_without_object_is_malformed() {
        let err = parse_full("I am unable to score this profile today.").unwrap_err();
        assert_eq!(err, MalformedResponse::MissingObject);
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_object() {
        let text = r#"Result: {"scores": {"awards": 4}, "note": "uses } and { freely"} trailing }"#;
        let scores = parse_partial(text, &[Category::Awards]).expect("string braces ignored");
        assert_eq!(scores[&Category::Awards].value(), 4);
    }

    #[test]
    fn skips_brace_fragments_that_are_not_json() {
        let text = "Scores below {see rubric}: {\"scores\": {\"awards\": 5}}";
        let scores = parse_partial(text, &[Category::Awards]).expect("second object parses");
        assert_eq!(scores[&Category::Awards].value(), 5);
    }

    #[test]
    fn rejected_segments_are_skipped_whole() {
        let text = r#"{draft {"scores": {"awards": 2}}} final: {"scores": {"awards": 7}}"#;
        let scores = parse_partial(text, &[Category::Awards]).expect("later object parses");
        assert_eq!(scores[&Category::Awards].value(), 7);
    }

    #[test]
    fn deeply_nested_garbage_is_rejected_in_one_pass() {
        let text = format!("{}{}", "{".repeat(20_000), "}".repeat(20_000));
        match extract_json_object(&text) {
            Err(MalformedResponse::InvalidJson(_)) => {}
            other => panic!("expected invalid json, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_fragment_reports_invalid_json_when_nothing_parses() {
        match extract_json_object("{not json} and then {\"scores\": ") {
            Err(MalformedResponse::InvalidJson(_)) => {}
            other => panic!("expected invalid json, got {other:?}"),
        }
    }

    #[test]
    fn full_reply_truncates_rationale_lists() {
        let assessment = parse_full(FULL_REPLY).expect("full reply parses");
        assert_eq!(assessment.scores.len(), 5);
        assert_eq!(assessment.scores[&Category::TestScores].value(), 9);
        assert_eq!(assessment.strengths.len(), 3);
        assert_eq!(assessment.strengths[0], "Near-perfect SAT");
        assert_eq!(assessment.improvements[2], "Revise the supplement");
    }

    #[test]
    fn full_reply_requires_every_score_and_list() {
        let missing_score = r#"{"scores": {"academics": 8, "testScores": 9, "extracurriculars": 7, "awards": 6},
            "strengths": [], "weaknesses": [], "improvements": []}"#;
        assert_eq!(
            parse_full(missing_score).unwrap_err(),
            MalformedResponse::MissingScore(Category::Essays)
        );

        let missing_list = r#"{"scores": {"academics": 8, "testScores": 9, "extracurriculars": 7, "awards": 6, "essays": 5},
            "strengths": [], "weaknesses": []}"#;
        assert_eq!(
            parse_full(missing_list).unwrap_err(),
            MalformedResponse::MissingField("improvements")
        );
    }

    #[test]
    fn partial_reply_ignores_unrequested_scores_and_normalizes_values() {
        let text = r#"{"scores": {"essays": "8.6", "academics": 2, "awards": 12}}"#;
        let scores =
            parse_partial(text, &[Category::Essays, Category::Awards]).expect("partial parses");
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[&Category::Essays].value(), 9);
        assert_eq!(scores[&Category::Awards].value(), 10);
        assert!(!scores.contains_key(&Category::Academics));
    }

    #[test]
    fn non_numeric_scores_are_rejected() {
        let text = r#"{"scores": {"essays": "excellent"}}"#;
        assert_eq!(
            parse_partial(text, &[Category::Essays]).unwrap_err(),
            MalformedResponse::NonNumericScore(Category::Essays)
        );
    }
}
