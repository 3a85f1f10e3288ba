//! Content fingerprints used to detect which profile categories moved since the last analysis.
//!
//! Each category is projected onto the fields that influence its score, rendered as canonical
//! JSON (sorted object keys, array order preserved), and digested with BLAKE3. Two profiles with
//! equal projections always produce equal fingerprints; nothing else about the digest is relied on.

use serde_json::{json, Value};

use super::domain::{Category, CategoryHashes, Profile};

/// Keys that carry storage or UI bookkeeping rather than profile content.
const IGNORED_FIELDS: &[&str] = &["_id", "id", "createdAt", "updatedAt", "isEditing", "isExpanded"];

/// Fingerprint every scored category plus the shared `context` entry.
pub fn fingerprint(profile: &Profile) -> CategoryHashes {
    let mut hashes = CategoryHashes::default();
    for category in Category::ALL {
        hashes.set_category(category, category_fingerprint(profile, category));
    }
    hashes.set_context(digest(context_projection(profile)));
    hashes
}

pub fn category_fingerprint(profile: &Profile, category: Category) -> String {
    digest(category_projection(profile, category))
}

fn category_projection(profile: &Profile, category: Category) -> Value {
    match category {
        Category::Academics => {
            let academics = profile.academics.as_ref();
            json!({
                "type": academics.and_then(|academics| academics.kind.as_ref()),
                "gpa": academics.and_then(|academics| academics.gpa.as_ref()),
                "subjects": academics.map(|academics| &academics.subjects),
            })
        }
        Category::TestScores => json!(profile.test_scores),
        Category::Extracurriculars => json!(profile.extracurriculars),
        Category::Awards => json!(profile.awards),
        Category::Essays => json!(profile.essays),
    }
}

fn context_projection(profile: &Profile) -> Value {
    json!({
        "majors": profile.majors,
        "nationality": profile.nationality,
        "efc": profile.efc,
    })
}

fn digest(mut value: Value) -> String {
    strip_ignored(&mut value);
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

fn strip_ignored(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !IGNORED_FIELDS.contains(&key.as_str()));
            map.values_mut().for_each(strip_ignored);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_ignored),
        _ => {}
    }
}

/// Key order is fixed here instead of trusting the map implementation serde_json was built with.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            out.push('{');
            for (index, (key, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        leaf => out.push_str(&leaf.to_string()),
    }
}
