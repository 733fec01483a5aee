//! Concept/example fallback for topics without a dedicated strategy.
//!
//! Questions quote the material itself; pairs link a concept's lead phrase to
//! its text; buckets separate definitions from examples.

use rand::rngs::StdRng;
use rand::Rng;

use crate::exercise_engine::{
    helpers::{bucket_item, mcq_by_value, pairs_item},
    models::{ContentContext, ExerciseItem, SESSION_SIZE},
    text::short,
};

use super::{FallbackRequest, TopicStrategy};

const STEMS: [&str; 4] = [
    "According to the material, which option best describes this idea",
    "Which statement agrees with this idea",
    "What does the material say about this",
    "Which option is consistent with this",
];

const QUOTED_MCQS: usize = 7;

pub struct GenericTopic;

impl TopicStrategy for GenericTopic {
    fn slug(&self) -> &'static str {
        "generic"
    }

    fn detect(&self, _context: &ContentContext) -> bool {
        false
    }

    fn fallback_items(&self, request: &FallbackRequest<'_>, rng: &mut StdRng) -> Vec<ExerciseItem> {
        generate(request.context, rng)
    }
}

fn sources(context: &ContentContext) -> Vec<String> {
    let mut texts = context.concept_texts();
    texts.extend(context.example_texts());
    texts.retain(|t| !t.trim().is_empty());
    if texts.is_empty() {
        let title = if context.title.trim().is_empty() { "this topic" } else { context.title.trim() };
        texts.push(format!("The main ideas of {title}"));
    }
    texts
}

fn quoted_mcq(stem: &str, source: &str) -> ExerciseItem {
    mcq_by_value(
        format!("{stem}: “{}”?", short(source, 140)),
        "A statement consistent with the material.",
        vec![
            "A partially related but inaccurate statement.".to_string(),
            "A statement that contradicts the material.".to_string(),
            "A statement unrelated to the topic.".to_string(),
        ],
        "Compare each option with the definition and the examples.",
    )
}

/// Lead phrase of a concept: its first sentence, at most 40 characters.
fn lead(text: &str) -> String {
    let first = text.split(['.', ':', ';']).next().unwrap_or(text);
    short(first, 40)
}

pub fn generate<R: Rng>(context: &ContentContext, rng: &mut R) -> Vec<ExerciseItem> {
    let sources = sources(context);
    let offset = rng.gen_range(0..sources.len());
    let stem_offset = rng.gen_range(0..STEMS.len());
    let mut items: Vec<ExerciseItem> = (0..QUOTED_MCQS)
        .map(|i| {
            let source = &sources[(offset + i) % sources.len()];
            // Advance the stem once per full pass over the sources.
            let stem = STEMS[(stem_offset + i / sources.len() + i) % STEMS.len()];
            quoted_mcq(stem, source)
        })
        .collect();

    let concepts = context.concept_texts();
    let pairs: Vec<(String, String)> = concepts
        .iter()
        .filter(|c| !c.trim().is_empty())
        .take(4)
        .map(|c| (lead(c), short(c, 80)))
        .filter(|(l, r)| l != r)
        .collect();
    if pairs.len() >= 2 {
        items.push(pairs_item("Match each idea with its description", pairs, "Read each description carefully."));
    }

    let examples = context.example_texts();
    if !concepts.is_empty() && !examples.is_empty() {
        let buckets = ["Definitions".to_string(), "Examples".to_string()];
        let assignments = concepts
            .iter()
            .take(3)
            .map(|c| (short(c, 80), 0))
            .chain(examples.iter().take(3).map(|e| (short(e, 80), 1)))
            .collect();
        items.push(bucket_item(
            "Sort definitions and examples",
            &buckets,
            assignments,
            "A definition states what something is; an example shows a case of it.",
        ));
    }

    let mut n = 1;
    while items.len() < SESSION_SIZE {
        let source = &sources[(offset + n) % sources.len()];
        items.push(mcq_by_value(
            format!("Choose the true statement about ({n}): “{}”", short(source, 120)),
            "It matches the material.",
            vec![
                "It reverses the definition.".to_string(),
                "It draws an unsupported conclusion.".to_string(),
                "It describes a different topic.".to_string(),
            ],
            "Go back to the definition and check each option.",
        ));
        n += 1;
    }
    items
}
