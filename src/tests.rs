//! Crate-level tests for `vak_drill_gen`.
//!
//! Included from `lib.rs` under `#[cfg(test)]`.
//!
//! | Group | What is tested |
//! |-------|----------------|
//! | Determinism | Same seed → identical session; different seeds → varied sessions |
//! | Session size | Exactly 10 items with no model, failing, slow, empty and oversized adapters |
//! | Structural | Every item valid for every topic, style and seed |
//! | Style | Kinesthetic sessions hold no multiple choice; auditory prompt rewording |
//! | Scenarios | Equivalent-fraction fallback item; bucket and pair submissions |
//! | Variation | Replaying the variation on the correct value still checks as correct |
//! | Bookkeeping | `VariationState` window, session package shape |

use std::time::Duration;

use serde_json::{json, Value};

use crate::exercise_engine::{
    fraction::{scan_fractions, Fraction},
    models::Concept,
    variation::Variation,
};
use crate::{
    check_answer, check_value, session_package, vary, AdapterError, Answer, AvoidSet,
    CachedModel, ContentContext, EngineConfig, ExerciseItem, GenerationStrategy, ItemKind,
    ItemSource, LearningStyle, ModelAdapter, ModelRequest, MultipleChoice, NumericRange,
    SessionRequest, TopicEngine, VariationState, SESSION_SIZE,
};

// ── helpers ──────────────────────────────────────────────────────────────────

fn fractions() -> ContentContext {
    ContentContext { grade: Some(3), slug: "fracciones-basicas".into(), ..ContentContext::default() }
}

fn percentages() -> ContentContext {
    ContentContext { grade: Some(6), slug: "porcentajes".into(), ..ContentContext::default() }
}

fn nouns() -> ContentContext {
    ContentContext {
        slug: "sustantivos".into(),
        title: "Nouns".into(),
        concepts: vec![
            Concept { text: "A noun names a person, place or thing.".into() },
            Concept { text: "Proper nouns start with a capital letter.".into() },
        ],
        ..ContentContext::default()
    }
}

fn all_contexts() -> [ContentContext; 3] {
    [fractions(), percentages(), nouns()]
}

const ALL_STYLES: [LearningStyle; 3] = [LearningStyle::Visual, LearningStyle::Auditory, LearningStyle::Kinesthetic];

const SEEDS: [u64; 5] = [1, 42, 999, 0xDEAD_BEEF, 7];

fn req(context: ContentContext, style: LearningStyle, seed: u64) -> SessionRequest {
    SessionRequest {
        seed: Some(seed),
        strategy: GenerationStrategy::Template,
        ..SessionRequest::new(context, style)
    }
}

fn short_timeout() -> EngineConfig {
    EngineConfig { model_timeout_ms: 50, ..EngineConfig::default() }
}

struct FailingModel;

impl ModelAdapter for FailingModel {
    async fn generate(&self, _: &ModelRequest) -> Result<Vec<Value>, AdapterError> {
        Err(AdapterError::HttpStatus { status: 503, body: "overloaded".into() })
    }
}

struct SlowModel;

impl ModelAdapter for SlowModel {
    async fn generate(&self, _: &ModelRequest) -> Result<Vec<Value>, AdapterError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![json!({"type": "mcq"})])
    }
}

struct EmptyModel;

impl ModelAdapter for EmptyModel {
    async fn generate(&self, _: &ModelRequest) -> Result<Vec<Value>, AdapterError> {
        Ok(Vec::new())
    }
}

fn model_payload(count: usize) -> String {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "type": "multiple_choice",
                "question": format!("Listen to the fractions and choose the larger one ({i})."),
                "choices": [format!("{}/{}", i + 2, i + 3), format!("{}/{}", i + 1, i + 3), "Option C", "Distractor 2"],
                "correct_index": 0,
                "explain": "Same denominator.",
            })
        })
        .collect();
    Value::Array(items).to_string()
}

// ── determinism ──────────────────────────────────────────────────────────────

#[test]
fn same_seed_produces_identical_session() {
    let engine = TopicEngine::default();
    for ctx in all_contexts() {
        for style in ALL_STYLES {
            let a = engine.build_session_blocking(req(ctx.clone(), style, 12345));
            let b = engine.build_session_blocking(req(ctx.clone(), style, 12345));
            assert_eq!(a, b, "session mismatch for {} / {style}", ctx.slug);
        }
    }
}

#[test]
fn different_seeds_produce_varied_sessions() {
    let engine = TopicEngine::default();
    let mut same = 0usize;
    let pairs = 20u64;
    for seed in 0..pairs {
        let a = engine.build_session_blocking(req(fractions(), LearningStyle::Visual, seed));
        let b = engine.build_session_blocking(req(fractions(), LearningStyle::Visual, seed + 500));
        if a.items() == b.items() {
            same += 1;
        }
    }
    assert!(same < pairs as usize / 4, "too many identical sessions ({same}/{pairs})");
}

#[test]
fn entropy_seed_produces_a_valid_session() {
    let engine = TopicEngine::default();
    let mut request = req(fractions(), LearningStyle::Visual, 0);
    request.seed = None;
    let set = engine.build_session_blocking(request);
    assert_eq!(set.items().len(), SESSION_SIZE);
    assert!(set.items().iter().all(ExerciseItem::is_valid));
}

// ── session size ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_model_falls_back_to_templates() {
    let engine = TopicEngine::default();
    let set = engine.build_session(SessionRequest::new(fractions(), LearningStyle::Visual)).await;
    assert_eq!(set.items().len(), SESSION_SIZE);
    assert_eq!(set.source, ItemSource::Template);
}

#[tokio::test]
async fn failing_model_still_yields_ten_items() {
    let engine = TopicEngine::with_adapter(FailingModel, EngineConfig::default());
    for ctx in all_contexts() {
        let set = engine.build_session(SessionRequest::new(ctx, LearningStyle::Auditory)).await;
        assert_eq!(set.items().len(), SESSION_SIZE);
        assert_eq!(set.source, ItemSource::Template);
    }
}

#[tokio::test]
async fn slow_model_is_abandoned_at_the_deadline() {
    let engine = TopicEngine::with_adapter(SlowModel, short_timeout());
    let started = std::time::Instant::now();
    let set = engine.build_session(SessionRequest::new(percentages(), LearningStyle::Visual)).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(set.items().len(), SESSION_SIZE);
    assert_eq!(set.source, ItemSource::Template);
}

#[tokio::test]
async fn empty_model_reply_counts_as_failure() {
    let engine = TopicEngine::with_adapter(EmptyModel, EngineConfig::default());
    let set = engine.build_session(SessionRequest::new(nouns(), LearningStyle::Visual)).await;
    assert_eq!(set.source, ItemSource::Template);
    assert_eq!(set.items().len(), SESSION_SIZE);
}

#[tokio::test]
async fn model_sessions_are_repaired_truncated_and_padded() {
    for count in [3, 12] {
        let engine = TopicEngine::with_adapter(CachedModel { payload: model_payload(count) }, EngineConfig::default());
        let set = engine.build_session(SessionRequest { seed: Some(5), ..SessionRequest::new(fractions(), LearningStyle::Visual) }).await;
        assert_eq!(set.source, ItemSource::Model);
        assert_eq!(set.items().len(), SESSION_SIZE, "{count} model items");
        assert!(set.items().iter().all(ExerciseItem::is_valid));
        let ExerciseItem::MultipleChoice(first) = &set.items()[0] else { panic!("expected multiple choice") };
        assert_eq!(first.correct_choice(), Some("2/3"));
        assert!(!first.choices.iter().any(|c| c.starts_with("Option") || c.starts_with("Distractor")));
    }
}

#[tokio::test]
async fn bank_variation_strategy_uses_the_bank() {
    let mut ctx = fractions();
    ctx.exercise_bank = vec![
        json!({"type": "mcq", "question": "¿Cuál de estas fracciones es la más grande?", "choices": ["1/6", "5/6", "2/6", "3/6"], "correct_index": 1}),
        json!({"type": "match_pairs", "title": "Equivalentes", "pairs": [["1/2", "2/4"], ["1/3", "2/6"]]}),
    ];
    let engine = TopicEngine::default();
    let request = SessionRequest {
        seed: Some(8),
        strategy: GenerationStrategy::BankVariation { seed: 3 },
        ..SessionRequest::new(ctx.clone(), LearningStyle::Visual)
    };
    let set = engine.build_session(request).await;
    assert_eq!(set.source, ItemSource::BankVariation);
    assert_eq!(set.items().len(), SESSION_SIZE);
    assert!(set.items()[0].is_valid());

    ctx.exercise_bank.clear();
    let request = SessionRequest {
        strategy: GenerationStrategy::BankVariation { seed: 3 },
        ..SessionRequest::new(ctx, LearningStyle::Visual)
    };
    assert_eq!(engine.build_session(request).await.source, ItemSource::Template);
}

// ── structural invariants ────────────────────────────────────────────────────

#[test]
fn every_item_is_valid_for_every_topic_style_and_seed() {
    let engine = TopicEngine::default();
    for ctx in all_contexts() {
        for style in ALL_STYLES {
            for seed in SEEDS {
                let set = engine.build_session_blocking(req(ctx.clone(), style, seed));
                assert_eq!(set.items().len(), SESSION_SIZE);
                for (i, item) in set.items().iter().enumerate() {
                    assert!(item.is_valid(), "invalid item {i} for {} / {style} seed={seed}: {item:?}", ctx.slug);
                }
                assert!(!set.explanation.is_empty());
            }
        }
    }
}

#[test]
fn narrow_and_odd_ranges_still_work() {
    let engine = TopicEngine::default();
    for (min, max) in [(0, 0), (5, 6), (40, 45), (12, 3)] {
        let mut ctx = fractions();
        ctx.constraints.allowed_numbers = Some(NumericRange { min, max });
        let set = engine.build_session_blocking(req(ctx, LearningStyle::Visual, 3));
        assert!(set.items().iter().all(ExerciseItem::is_valid), "range {min}..{max}");
    }
}

#[test]
fn huge_ranges_are_capped() {
    let engine = TopicEngine::default();
    let bank = vec![
        json!({"type": "mcq", "question": "¿Cuál de estas fracciones es la más grande?", "choices": ["1/6", "5/6", "2/6", "3/6"], "correct_index": 1}),
        json!({"type": "mcq", "question": "¿Cuál de estas fracciones es la más pequeña?", "choices": ["1/2", "1/9", "1/4", "1/3"], "correct_index": 1}),
        json!({"type": "mcq", "question": "Resuelve: 1/5 + 2/5 = ?", "choices": ["3/5", "3/10", "1/5", "4/5"], "correct_index": 0}),
    ];
    for (min, max) in [(1, 4_294_967_290), (1, 100_000_000), (u32::MAX, u32::MAX)] {
        for ctx in [fractions(), percentages()] {
            let mut ctx = ctx;
            ctx.constraints.allowed_numbers = Some(NumericRange { min, max });
            ctx.exercise_bank = bank.clone();
            for strategy in [GenerationStrategy::Template, GenerationStrategy::BankVariation { seed: 11 }] {
                let request = SessionRequest { strategy, ..req(ctx.clone(), LearningStyle::Visual, 5) };
                let set = engine.build_session_blocking(request);
                assert_eq!(set.items().len(), SESSION_SIZE);
                assert!(set.items().iter().all(ExerciseItem::is_valid), "{} range {min}..{max}", ctx.slug);
                for item in set.items() {
                    let ExerciseItem::MultipleChoice(m) = item else { continue };
                    let Some(rest) = m.question.strip_prefix("What is ") else { continue };
                    let Some((p, n)) = rest.trim_end_matches('?').split_once("% of ") else { continue };
                    let (p, n): (u64, u64) = (p.parse().unwrap(), n.parse().unwrap());
                    assert_eq!(m.correct_choice(), Some((p * n / 100).to_string().as_str()), "{}", m.question);
                }
            }
        }
    }
}

// ── style ────────────────────────────────────────────────────────────────────

#[test]
fn kinesthetic_sessions_hold_no_multiple_choice() {
    let engine = TopicEngine::default();
    for ctx in all_contexts() {
        for seed in SEEDS {
            let set = engine.build_session_blocking(req(ctx.clone(), "kinestésico".parse().unwrap(), seed));
            assert!(
                set.items().iter().all(|i| i.kind() != ItemKind::MultipleChoice),
                "multiple choice left in kinesthetic session for {} seed={seed}",
                ctx.slug
            );
        }
    }
}

#[test]
fn unknown_style_is_rejected() {
    assert!("tactile".parse::<LearningStyle>().is_err());
    assert_eq!("Auditivo".parse::<LearningStyle>().unwrap(), LearningStyle::Auditory);
}

#[tokio::test]
async fn auditory_prompts_are_reworded_without_audio() {
    let engine = TopicEngine::with_adapter(CachedModel { payload: model_payload(10) }, EngineConfig::default());
    let request = SessionRequest::new(fractions(), LearningStyle::Auditory);
    let set = engine.build_session(request.clone()).await;
    let ExerciseItem::MultipleChoice(m) = &set.items()[0] else { panic!("expected multiple choice") };
    assert!(m.question.starts_with("Read the fractions"), "{}", m.question);

    let set = engine.build_session(SessionRequest { audio_available: true, ..request }).await;
    let ExerciseItem::MultipleChoice(m) = &set.items()[0] else { panic!("expected multiple choice") };
    assert!(m.question.starts_with("Listen to the fractions"));
}

// ── scenarios ────────────────────────────────────────────────────────────────

#[test]
fn fraction_fallback_asks_for_an_equivalent_fraction() {
    let engine = TopicEngine::default();
    let mut ctx = fractions();
    ctx.constraints.allowed_numbers = Some(NumericRange { min: 1, max: 12 });
    for seed in 0..25 {
        let items = engine.generate_fallback(&ctx, LearningStyle::Visual, &AvoidSet::new(), seed);
        assert_eq!(items.len(), SESSION_SIZE);
        let item = items
            .iter()
            .find_map(|i| match i {
                ExerciseItem::MultipleChoice(m) if m.question.contains("equivalent to") => Some(m),
                _ => None,
            })
            .expect("an equivalence item");
        let base = scan_fractions(&item.question, None)[0].fraction;
        assert!((1..=12).contains(&base.num));
        let hits: Vec<usize> = item
            .choices
            .iter()
            .enumerate()
            .filter(|(_, c)| Fraction::parse(c).map_or(false, |f| [2, 3, 4].iter().any(|k| f == base.scale(*k))))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, vec![item.correct_index], "seed {seed}");
    }
}

#[test]
fn bucket_submission_scenario() {
    let item: ExerciseItem = serde_json::from_value(json!({
        "type": "drag_to_bucket",
        "title": "Sort",
        "items": ["1/2", "2/4", "1/3"],
        "buckets": ["BucketA", "BucketB"],
        "solution": {"BucketA": ["1/2", "2/4"], "BucketB": ["1/3"]},
        "explain": "",
    }))
    .unwrap();
    assert!(check_value(&item, &json!({"BucketA": ["1/2", "2/4"], "BucketB": ["1/3"]})));
    assert!(!check_value(&item, &json!({"BucketA": ["1/2"], "BucketB": ["1/3", "2/4"]})));
}

#[test]
fn pair_submission_scenario() {
    let item: ExerciseItem = serde_json::from_value(json!({
        "type": "match_pairs",
        "title": "Parts",
        "pairs": [["Denominator", "Total parts"], ["Numerator", "Parts taken"]],
    }))
    .unwrap();
    assert!(check_value(&item, &json!([["Numerator", "Parts taken"], ["Denominator", "Total parts"]])));
}

// ── variation ────────────────────────────────────────────────────────────────

#[test]
fn replayed_variation_keeps_the_answer_correct() {
    let template = ExerciseItem::MultipleChoice(MultipleChoice {
        question: "Which fraction is equivalent to 2/3?".into(),
        choices: vec!["4/6".into(), "2/6".into(), "3/3".into(), "4/5".into()],
        correct_index: 0,
        explain: "Multiply both terms by 2.".into(),
    });
    let range = NumericRange::default();
    for seed in 0..60 {
        let varied = vary(&template, seed, range);
        let plan = Variation::for_item(&crate::sanitize(&template), seed, range);
        let expected = plan.transform_choice("4/6");
        let ExerciseItem::MultipleChoice(m) = &varied else { panic!("variant changed") };
        let index = m.choices.iter().position(|c| *c == expected).expect("transformed correct value present");
        assert!(check_answer(&varied, &Answer::Choice(index)), "seed {seed}: {m:?}");
    }
}

// ── bookkeeping ──────────────────────────────────────────────────────────────

#[test]
fn variation_state_keeps_the_last_five_sessions() {
    let engine = TopicEngine::default();
    let mut state = VariationState::default();
    for seed in 0..7 {
        let request = SessionRequest { avoid: state.avoid_set(), ..req(fractions(), LearningStyle::Visual, seed) };
        let set = engine.build_session_blocking(request);
        state.record(&set);
        assert!(set.used_numbers().iter().all(|n| state.avoid_set().contains(n)));
    }
    assert_eq!(state.recent.len(), 5);
    assert_eq!(state.variation_seed, 7);
}

#[test]
fn session_package_shape() {
    let engine = TopicEngine::default();
    let set = engine.build_session_blocking(req(fractions(), LearningStyle::Kinesthetic, 9));
    let package = session_package(&set);
    assert_eq!(package["items"].as_array().map(Vec::len), Some(SESSION_SIZE));
    assert_eq!(package["style_meta"]["style"], "kinesthetic");
    assert_eq!(package["style_meta"]["allowed_types"], json!(["match_pairs", "drag_to_bucket"]));
    assert_eq!(package["source"], "template");
    assert_eq!(package["signature"].as_str().map(str::len), Some(64));
    assert!(package["items"][0]["type"].is_string());
}
