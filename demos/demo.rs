//! End-to-end demo of the Topic Engine.
//!
//! Run with: `cargo run --example demo`
//! (`LOG_LEVEL=debug` shows sanitizer repairs; `LOG_FORMAT=json` switches to JSON logs.)
//!
//! 1. **Model path**: a cached model reply full of placeholders and a stray
//!    code fence is repaired and padded to ten items.
//! 2. **Styles**: the same fraction topic for visual, auditory and
//!    kinesthetic learners (kinesthetic sessions carry no multiple choice).
//! 3. **Checking**: the correct submission for each item is built from the
//!    item itself and checked.
//! 4. **Bookkeeping**: three consecutive sessions feed a `VariationState`, and
//!    the last one is printed as a session package.

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use vak_drill_gen::{
    check_answer, session_package, Answer, CachedModel, ContentContext, EngineConfig, ExerciseItem,
    GenerationStrategy, LearningStyle, SessionRequest, TopicEngine, VariationState,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("info,exercise_engine=info,sanitizer=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

fn fractions() -> ContentContext {
    serde_json::from_value(json!({
        "grade": 3,
        "slug": "fracciones-basicas",
        "title": "Fracciones básicas",
        "concepts": [
            {"text": "A fraction a/b names a parts out of b equal parts."},
            {"text": "Equivalent fractions name the same amount: 1/2 = 2/4."}
        ],
        "constraints": {"allowed_numbers": {"min": 1, "max": 12}}
    }))
    .unwrap_or_default()
}

fn print_item(i: usize, item: &ExerciseItem) {
    match item {
        ExerciseItem::MultipleChoice(m) => {
            println!("  {:>2}. [choice] {}", i + 1, m.question);
            for (j, c) in m.choices.iter().enumerate() {
                let mark = if j == m.correct_index { "✓" } else { " " };
                println!("        {mark} {c}");
            }
        }
        ExerciseItem::MatchPairs(m) => {
            println!("  {:>2}. [pairs]  {}", i + 1, m.title);
            for (l, r) in &m.pairs {
                println!("        {l}  ↔  {r}");
            }
        }
        ExerciseItem::DragToBucket(d) => {
            println!("  {:>2}. [bucket] {}", i + 1, d.title);
            for b in &d.buckets {
                println!("        {b}: {}", d.solution[b].join(", "));
            }
        }
    }
}

/// The submission that answers `item` correctly.
fn perfect_answer(item: &ExerciseItem) -> Answer {
    match item {
        ExerciseItem::MultipleChoice(m) => Answer::Choice(m.correct_index),
        ExerciseItem::MatchPairs(m) => Answer::Pairs(m.pairs.iter().rev().cloned().collect()),
        ExerciseItem::DragToBucket(d) => Answer::Buckets(d.solution.clone()),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let config = EngineConfig::load_from_env();

    // ── Model path ───────────────────────────────────────────────────────────
    println!();
    println!("══ Model reply, repaired ══");
    println!();
    let reply: Value = json!([
        {"type": "mcq", "question": "Which is greater: 3/8 or 5/8?", "choices": ["Option A", "5/8", "5 / 8"], "correct_index": 1},
        {"type": "pairs", "title": "Parts", "pairs": [["Numerator", "Parts taken"], ["Denominator", ""]]},
        {"type": "drag_to_bucket", "buckets": ["Less than 1/2", "Greater than or equal to 1/2"],
         "solution": {"Less than 1/2": ["1/3", "1/2"], "Greater than or equal to 1/2": ["3/4"]}}
    ]);
    let cached = CachedModel { payload: format!("```json\n{reply}\n```") };
    let engine = TopicEngine::with_adapter(cached, config.clone());
    let set = engine
        .build_session(SessionRequest { seed: Some(7), ..SessionRequest::new(fractions(), LearningStyle::Visual) })
        .await;
    println!("  source: {}   explanation: {}", set.source, set.explanation);
    for (i, item) in set.items().iter().enumerate() {
        print_item(i, item);
    }

    // ── Styles ───────────────────────────────────────────────────────────────
    let engine = TopicEngine::new(config);
    for style in ["visual", "auditivo", "kinestesico"] {
        let style: LearningStyle = match style.parse() {
            Ok(style) => style,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        println!();
        println!("══ Templates for a {style} learner ══");
        println!();
        let request = SessionRequest {
            seed: Some(2024),
            strategy: GenerationStrategy::Template,
            ..SessionRequest::new(fractions(), style)
        };
        let set = engine.build_session(request).await;
        for (i, item) in set.items().iter().enumerate() {
            print_item(i, item);
        }

        // ── Checking ─────────────────────────────────────────────────────────
        let correct = set.items().iter().filter(|item| check_answer(item, &perfect_answer(item))).count();
        println!();
        println!("  perfect submissions accepted: {correct}/{}", set.items().len());
    }

    // ── Bookkeeping ──────────────────────────────────────────────────────────
    println!();
    println!("══ Three sessions for one learner ══");
    println!();
    let mut state = VariationState::default();
    let mut last = None;
    for _ in 0..3 {
        let request = SessionRequest {
            avoid: state.avoid_set(),
            seed: Some(state.variation_seed),
            strategy: GenerationStrategy::Template,
            ..SessionRequest::new(fractions(), LearningStyle::Visual)
        };
        let set = engine.build_session(request).await;
        let used: Vec<u32> = set.used_numbers().iter().collect();
        println!("  seed {:>2}: used {:?}", state.variation_seed, used);
        state.record(&set);
        last = Some(set);
    }
    if let Some(set) = last {
        match serde_json::to_string_pretty(&session_package(&set)) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("could not render package: {e}"),
        }
    }
}
