//! Style Filter/Converter.
//!
//! | Style        | multiple choice               | match pairs | drag to bucket |
//! |--------------|-------------------------------|-------------|----------------|
//! | visual       | as is                         | as is       | as is          |
//! | auditory     | as is (prompts may be reworded) | as is     | as is          |
//! | kinesthetic  | converted to Correct/Incorrect buckets | as is | as is       |

use crate::exercise_engine::{
    models::{ExerciseItem, LearningStyle, MultipleChoice},
    sanitizer::{sanitize_raw, RawItem},
    text::neutralize_audio_words,
};

pub const CORRECT_BUCKET: &str = "Correct";
pub const INCORRECT_BUCKET: &str = "Incorrect";

pub fn is_allowed(item: &ExerciseItem, style: LearningStyle) -> bool {
    style.allows_multiple_choice() || !matches!(item, ExerciseItem::MultipleChoice(_))
}

/// Same count out as in. Kinesthetic output never holds a multiple-choice item.
pub fn apply_style(items: &[ExerciseItem], style: LearningStyle) -> Vec<ExerciseItem> {
    items
        .iter()
        .map(|item| match item {
            ExerciseItem::MultipleChoice(m) if !style.allows_multiple_choice() => choice_to_buckets(m),
            other => other.clone(),
        })
        .collect()
}

/// The choices become the draggable items; the correct one goes to
/// "Correct", the rest to "Incorrect". The explanation is kept.
pub fn choice_to_buckets(m: &MultipleChoice) -> ExerciseItem {
    let correct: Vec<String> = m.correct_choice().map(str::to_string).into_iter().collect();
    let incorrect: Vec<String> = m
        .choices
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != m.correct_index)
        .map(|(_, c)| c.clone())
        .collect();
    sanitize_raw(&RawItem {
        kind: Some("drag_to_bucket".into()),
        title: Some(m.question.clone()),
        items: Some(m.choices.clone()),
        buckets: vec![CORRECT_BUCKET.into(), INCORRECT_BUCKET.into()],
        solution: vec![(CORRECT_BUCKET.into(), correct), (INCORRECT_BUCKET.into(), incorrect)],
        explain: Some(m.explain.clone()),
        ..RawItem::default()
    })
}

/// Reword "Listen ..." prompts when an auditory session ships without audio.
pub fn neutralize_audio_prompts(items: &mut [ExerciseItem]) {
    for item in items {
        if let ExerciseItem::MultipleChoice(m) = item {
            m.question = neutralize_audio_words(&m.question);
        }
    }
}
