//! One template session per built-in topic strategy, plus exercise-bank
//! variation.
//!
//! Run with: `cargo run --example topics`
//!
//! Shows how the registry resolves a strategy (by grade and slug, by slug,
//! by content, or the generic fallback) and what each strategy produces.
//! Fixed seeds keep the output reproducible.

use serde_json::json;
use vak_drill_gen::exercise_engine::topics::StrategyRegistry;
use vak_drill_gen::{
    ContentContext, ExerciseItem, GenerationStrategy, LearningStyle, SessionRequest, TopicEngine,
};

fn describe(item: &ExerciseItem) -> String {
    match item {
        ExerciseItem::MultipleChoice(m) => format!(
            "{}  [{}]  → {}",
            m.question,
            m.choices.join(" | "),
            m.correct_choice().unwrap_or("?")
        ),
        ExerciseItem::MatchPairs(m) => {
            let pairs: Vec<String> = m.pairs.iter().map(|(l, r)| format!("{l} = {r}")).collect();
            format!("{}  ({})", m.title, pairs.join("; "))
        }
        ExerciseItem::DragToBucket(d) => {
            let buckets: Vec<String> =
                d.buckets.iter().map(|b| format!("{b}: {}", d.solution[b].join(", "))).collect();
            format!("{}  ({})", d.title, buckets.join(" / "))
        }
    }
}

fn print_session(label: &str, context: ContentContext, strategy: GenerationStrategy, seed: u64) {
    let engine = TopicEngine::default();
    let registry = StrategyRegistry::default();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  {label}  →  strategy: {}", registry.resolve(&context).slug());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let request = SessionRequest {
        seed: Some(seed),
        strategy,
        ..SessionRequest::new(context, LearningStyle::Visual)
    };
    let set = engine.build_session_blocking(request);
    println!("  source: {}", set.source);
    println!("  {}", set.explanation);
    println!();
    for (i, item) in set.items().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, describe(item));
    }
    println!();
}

fn context(value: serde_json::Value) -> ContentContext {
    serde_json::from_value(value).unwrap_or_default()
}

fn main() {
    print_session(
        "grade 3 / fracciones-basicas",
        context(json!({"grade": 3, "slug": "fracciones-basicas"})),
        GenerationStrategy::Template,
        1001,
    );
    print_session(
        "grade 6 / porcentajes",
        context(json!({"grade": 6, "slug": "porcentajes", "title": "Porcentajes"})),
        GenerationStrategy::Template,
        2002,
    );
    print_session(
        "unknown slug, fraction content",
        context(json!({"slug": "repaso", "concepts": [{"text": "Half a pizza is 1/2."}]})),
        GenerationStrategy::Template,
        3003,
    );
    print_session(
        "generic / sustantivos",
        context(json!({
            "slug": "sustantivos",
            "title": "Sustantivos",
            "concepts": [
                {"text": "Un sustantivo nombra personas, lugares o cosas."},
                {"text": "Los sustantivos propios empiezan con mayúscula."}
            ],
            "examples": [{"explain": "Madrid es un sustantivo propio."}]
        })),
        GenerationStrategy::Template,
        4004,
    );
    print_session(
        "exercise bank variation",
        context(json!({
            "grade": 3,
            "slug": "fracciones-basicas",
            "exercise_bank": [
                {"type": "multiple_choice", "question": "Resuelve: 1/5 + 2/5 = ?", "choices": ["3/5", "3/10", "1/5", "4/5"], "correct_index": 0},
                {"type": "multiple_choice", "question": "Un rectángulo está dividido en 8 partes iguales y 3 están coloreadas. ¿Qué fracción representa la parte coloreada?", "choices": ["3/8", "8/3", "3/5", "5/8"], "correct_index": 0},
                {"type": "multiple_choice", "question": "¿Cuál de estas fracciones es la más pequeña?", "choices": ["1/2", "1/9", "1/4", "1/3"], "correct_index": 1},
                {"type": "match_pairs", "title": "Equivalentes", "pairs": [["1/2", "2/4"], ["1/3", "2/6"]]}
            ]
        })),
        GenerationStrategy::BankVariation { seed: 5005 },
        5005,
    );
}
