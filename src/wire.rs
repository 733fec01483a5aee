//! Boundary JSON for storage and the UI.
//!
//! [`session_package`] is what a caller stores when a session opens: the
//! items, the explanation, the style's allowed item types, the producing
//! source, the fraction numbers used and their SHA-256 signature.
//! [`raw_items_from_json`] reads a stored package (or a bare item array)
//! back through the sanitizer.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::exercise_engine::{
    fraction::scan_fractions,
    models::{ExerciseItem, ExerciseSet, ItemKind, LearningStyle},
    sanitizer::sanitize_values,
};

/// Item types a style may show, in wire names.
fn allowed_types(style: LearningStyle) -> Vec<String> {
    let kinds = if style.allows_multiple_choice() {
        vec![ItemKind::MultipleChoice, ItemKind::MatchPairs, ItemKind::DragToBucket]
    } else {
        vec![ItemKind::MatchPairs, ItemKind::DragToBucket]
    };
    kinds.into_iter().map(|k| k.to_string()).collect()
}

/// Every fraction token in the items as `a/b`, sorted and deduplicated.
pub fn fraction_list(items: &[ExerciseItem]) -> Vec<String> {
    let mut out: Vec<String> = items
        .iter()
        .flat_map(|item| match item {
            ExerciseItem::MultipleChoice(m) => {
                let mut texts = vec![m.question.clone()];
                texts.extend(m.choices.iter().cloned());
                texts
            }
            ExerciseItem::MatchPairs(m) => m.pairs.iter().flat_map(|(l, r)| [l.clone(), r.clone()]).collect(),
            ExerciseItem::DragToBucket(d) => d.items.clone(),
        })
        .flat_map(|text| scan_fractions(&text, None).into_iter().map(|t| t.fraction.to_string()).collect::<Vec<_>>())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// SHA-256 hex of the sorted fraction list; identifies a number set.
pub fn signature_of_numbers(items: &[ExerciseItem]) -> String {
    hex::encode(Sha256::digest(fraction_list(items).join(",").as_bytes()))
}

/// Session package stored and sent to the UI.
pub fn session_package(set: &ExerciseSet) -> Value {
    let used: Vec<u32> = set.used_numbers().iter().collect();
    json!({
        "items": set.items(),
        "explanation": set.explanation,
        "style_meta": {
            "style": set.style.to_string(),
            "allowed_types": allowed_types(set.style),
        },
        "source": set.source.to_string(),
        "used_numbers": used,
        "signature": signature_of_numbers(set.items()),
    })
}

/// Decode stored items (a bare array, an `{"items": [...]}` package, or a
/// single item) into sanitized items.
pub fn raw_items_from_json(text: &str) -> Result<Vec<ExerciseItem>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let items = match &value {
        Value::Array(values) => sanitize_values(values),
        Value::Object(obj) => match obj.get("items") {
            Some(Value::Array(values)) => sanitize_values(values),
            _ => sanitize_values(std::slice::from_ref(&value)),
        },
        _ => sanitize_values(std::slice::from_ref(&value)),
    };
    Ok(items)
}
