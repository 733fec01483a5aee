//! Answer Checker. Pure; every comparison goes through [`normalize`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exercise_engine::{
    error::EngineError,
    models::{ExerciseItem, ItemKind},
    sanitizer::{index_value, pair_list, text_list},
    text::normalize,
};

/// A learner's submission for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Pairs(Vec<(String, String)>),
    Buckets(BTreeMap<String, Vec<String>>),
}

impl Answer {
    /// Strict, item-directed parse. A submission of the wrong shape for the
    /// item is a caller error.
    pub fn parse_for(item: &ExerciseItem, value: &Value) -> Result<Answer, EngineError> {
        let expected = item.kind();
        let shape_error = || EngineError::AnswerShape { expected };
        match expected {
            ItemKind::MultipleChoice => index_value(value)
                .and_then(|i| usize::try_from(i).ok())
                .map(Answer::Choice)
                .ok_or_else(shape_error),
            ItemKind::MatchPairs => match value {
                Value::Array(_) | Value::Object(_) => Ok(Answer::Pairs(pair_list(value))),
                _ => Err(shape_error()),
            },
            ItemKind::DragToBucket => match value {
                Value::Object(map) => Ok(Answer::Buckets(
                    map.iter().map(|(k, v)| (k.clone(), text_list(v))).collect(),
                )),
                _ => Err(shape_error()),
            },
        }
    }
}

fn pair_set(pairs: &[(String, String)]) -> BTreeSet<(String, String)> {
    pairs.iter().map(|(l, r)| (normalize(l), normalize(r))).collect()
}

fn value_set(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|v| normalize(v)).collect()
}

/// `true` only for a correct submission of the item's own shape.
pub fn check_answer(item: &ExerciseItem, answer: &Answer) -> bool {
    match (item, answer) {
        (ExerciseItem::MultipleChoice(m), Answer::Choice(i)) => *i == m.correct_index,
        (ExerciseItem::MatchPairs(m), Answer::Pairs(submitted)) => pair_set(submitted) == pair_set(&m.pairs),
        (ExerciseItem::DragToBucket(d), Answer::Buckets(submitted)) => {
            let submitted: BTreeMap<String, BTreeSet<String>> =
                submitted.iter().map(|(k, v)| (normalize(k), value_set(v))).collect();
            let expected: BTreeMap<String, BTreeSet<String>> = d
                .buckets
                .iter()
                .map(|b| (normalize(b), d.solution.get(b).map(|v| value_set(v)).unwrap_or_default()))
                .collect();
            submitted.len() == answer_key_count(answer) && submitted == expected
        }
        _ => false,
    }
}

/// Keys that collide after normalizing make a submission ambiguous.
fn answer_key_count(answer: &Answer) -> usize {
    match answer {
        Answer::Buckets(map) => map.len(),
        _ => 0,
    }
}

/// Total variant over raw JSON: malformed submissions are `false`.
pub fn check_value(item: &ExerciseItem, value: &Value) -> bool {
    Answer::parse_for(item, value).map_or(false, |answer| check_answer(item, &answer))
}
