//! Sanitizer: the single validation boundary.
//!
//! Every producer (model adapter, templates, variation) emits [`RawItem`]s or
//! untrusted JSON, and everything that reaches a learner went through
//! [`sanitize_raw`]. The functions here are total: unusable input degrades to
//! a fixed safe item instead of failing.
//!
//! | Variant          | Repairs                                                          |
//! |------------------|------------------------------------------------------------------|
//! | multiple choice  | placeholders out, dedup, domain fillers, question synthesis      |
//! | match pairs      | empty sides out, dedup, default pair set below two pairs         |
//! | drag to bucket   | items rebuilt/clipped, orphans to first bucket, pivot placement  |
//!
//! Output is a fixed point: `sanitize(&sanitize(x)) == sanitize(x)`. The
//! final choice order comes from a shuffle seeded by the item's own content,
//! never by the caller's seed, which is what makes that hold.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use tracing::debug;

use crate::exercise_engine::{
    fraction::{parse_int, parse_percent, parse_value, Fraction, PivotBucket},
    helpers::{content_seed, shuffle},
    models::{DragToBucket, ExerciseItem, ItemKind, MatchPairs, MultipleChoice, CHOICE_COUNT},
    text::{clean, is_generic_question, is_placeholder_choice, normalize},
};

// ---------------------------------------------------------------------------
// Raw (untrusted) items
// ---------------------------------------------------------------------------

/// A candidate item before repair. Every field may be missing or wrong.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub kind: Option<String>,
    pub question: Option<String>,
    pub choices: Vec<String>,
    pub correct_index: Option<i64>,
    /// Correct value, used when `correct_index` is missing or unusable.
    pub answer: Option<String>,
    pub explain: Option<String>,
    pub title: Option<String>,
    pub pairs: Vec<(String, String)>,
    /// `None` means "rebuild from the solution".
    pub items: Option<Vec<String>>,
    pub buckets: Vec<String>,
    pub solution: Vec<(String, Vec<String>)>,
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

pub(crate) fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Value::Object(o) => field(o, &["text", "label", "value"]).and_then(scalar_text),
        _ => None,
    }
}

pub(crate) fn text_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(values) => values.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

pub(crate) fn index_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn pair_list(v: &Value) -> Vec<(String, String)> {
    match v {
        Value::Array(list) => list
            .iter()
            .filter_map(|p| match p {
                Value::Array(lr) if lr.len() >= 2 => Some((scalar_text(&lr[0])?, scalar_text(&lr[1])?)),
                Value::Object(o) => {
                    let left = field(o, &["left", "l", "term", "a"]).and_then(scalar_text)?;
                    let right = field(o, &["right", "r", "match", "b"]).and_then(scalar_text)?;
                    Some((left, right))
                }
                _ => None,
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), scalar_text(v)?)))
            .collect(),
        _ => Vec::new(),
    }
}

fn solution_list(v: &Value) -> Vec<(String, Vec<String>)> {
    match v {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), text_list(v))).collect(),
        _ => Vec::new(),
    }
}

impl RawItem {
    /// Lenient decoding of model or storage JSON. Never fails; a non-object
    /// decodes to an empty item, which sanitizes to the safe default.
    pub fn from_value(v: &Value) -> RawItem {
        let Some(obj) = v.as_object() else {
            return RawItem::default();
        };
        let text = |keys: &[&str]| field(obj, keys).and_then(scalar_text);
        RawItem {
            kind: text(&["type", "kind"]),
            question: text(&["question", "prompt", "enunciado", "pregunta"]),
            choices: field(obj, &["choices", "options", "opciones"]).map(text_list).unwrap_or_default(),
            correct_index: field(obj, &["correct_index", "correctIndex", "answer_index"]).and_then(index_value),
            answer: text(&["answer", "correct_answer", "respuesta"]),
            explain: text(&["explain", "explanation", "explicacion"]),
            title: text(&["title", "titulo"]),
            pairs: field(obj, &["pairs", "parejas"]).map(pair_list).unwrap_or_default(),
            items: field(obj, &["items"]).map(text_list),
            buckets: field(obj, &["buckets", "categories", "categorias"]).map(text_list).unwrap_or_default(),
            solution: field(obj, &["solution", "solucion"]).map(solution_list).unwrap_or_default(),
        }
    }

    /// Declared shape, from the type tag or else from which fields are present.
    pub fn shape(&self) -> Option<ItemKind> {
        let declared = self.kind.as_deref().map(|k| normalize(k).replace(['-', ' '], "_"));
        match declared.as_deref() {
            Some("multiple_choice" | "mcq" | "choice" | "multiplechoice" | "seleccion_multiple") => {
                return Some(ItemKind::MultipleChoice)
            }
            Some("match_pairs" | "pairs" | "matching" | "match" | "pareo") => return Some(ItemKind::MatchPairs),
            Some("drag_to_bucket" | "buckets" | "drag_and_drop" | "classify" | "clasificar") => {
                return Some(ItemKind::DragToBucket)
            }
            _ => {}
        }
        if !self.choices.is_empty() {
            Some(ItemKind::MultipleChoice)
        } else if !self.pairs.is_empty() {
            Some(ItemKind::MatchPairs)
        } else if !self.buckets.is_empty() || !self.solution.is_empty() {
            Some(ItemKind::DragToBucket)
        } else {
            None
        }
    }
}

impl From<&ExerciseItem> for RawItem {
    fn from(item: &ExerciseItem) -> Self {
        match item {
            ExerciseItem::MultipleChoice(m) => RawItem {
                kind: Some(ItemKind::MultipleChoice.to_string()),
                question: Some(m.question.clone()),
                choices: m.choices.clone(),
                correct_index: i64::try_from(m.correct_index).ok(),
                explain: Some(m.explain.clone()),
                ..RawItem::default()
            },
            ExerciseItem::MatchPairs(m) => RawItem {
                kind: Some(ItemKind::MatchPairs.to_string()),
                title: Some(m.title.clone()),
                pairs: m.pairs.clone(),
                explain: Some(m.explain.clone()),
                ..RawItem::default()
            },
            ExerciseItem::DragToBucket(d) => RawItem {
                kind: Some(ItemKind::DragToBucket.to_string()),
                title: Some(d.title.clone()),
                items: Some(d.items.clone()),
                buckets: d.buckets.clone(),
                solution: d.solution.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                explain: Some(d.explain.clone()),
                ..RawItem::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Repair one candidate into a valid item.
pub fn sanitize_raw(raw: &RawItem) -> ExerciseItem {
    match raw.shape() {
        Some(ItemKind::MultipleChoice) => repair_choice(
            raw.question.as_deref().unwrap_or_default(),
            &raw.choices,
            correct_value(raw).as_deref(),
            raw.explain.as_deref().unwrap_or_default(),
        ),
        Some(ItemKind::MatchPairs) => repair_pairs(raw),
        Some(ItemKind::DragToBucket) => repair_buckets(raw),
        None => {
            debug!(target: "sanitizer", kind = ?raw.kind, "unrecognised item shape; using default");
            default_choice()
        }
    }
}

pub fn sanitize(item: &ExerciseItem) -> ExerciseItem {
    sanitize_raw(&RawItem::from(item))
}

/// Total and idempotent over a list; preserves count and order.
pub fn sanitize_items(items: &[ExerciseItem]) -> Vec<ExerciseItem> {
    items.iter().map(sanitize).collect()
}

pub fn sanitize_values(values: &[Value]) -> Vec<ExerciseItem> {
    values.iter().map(|v| sanitize_raw(&RawItem::from_value(v))).collect()
}

fn first_clean(candidates: &[Option<&String>]) -> Option<String> {
    candidates.iter().flatten().map(|s| clean(s)).find(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Multiple choice
// ---------------------------------------------------------------------------

const DEFAULT_EXPLAIN: &str = "Review the key concept and try again.";

fn usable_choice(c: &str) -> bool {
    !c.is_empty() && !is_placeholder_choice(c)
}

/// Correct value by position, else by the `answer` field. The first usable
/// choice stands in when neither is usable.
fn correct_value(raw: &RawItem) -> Option<String> {
    let by_index = raw
        .correct_index
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| raw.choices.get(i))
        .map(|c| clean(c))
        .filter(|c| usable_choice(c));
    by_index.or_else(|| raw.answer.as_deref().map(clean).filter(|c| usable_choice(c)))
}

/// Rebuild a multiple-choice item around a correct value tracked by value.
///
/// `correct == None` promotes the first usable choice; with no usable choice
/// at all the safe default item is returned.
pub(crate) fn repair_choice(
    question: &str,
    choices: &[String],
    correct: Option<&str>,
    explain: &str,
) -> ExerciseItem {
    let cleaned: Vec<String> = choices.iter().map(|c| clean(c)).collect();
    let correct = correct
        .map(clean)
        .filter(|c| usable_choice(c))
        .or_else(|| cleaned.iter().find(|c| usable_choice(c)).cloned());
    let Some(correct) = correct else {
        debug!(target: "sanitizer", kind = "multiple_choice", "no usable correct value; using default");
        return default_choice();
    };

    let correct_key = normalize(&correct);
    let mut seen = BTreeSet::from([correct_key.clone()]);
    let mut distractors: Vec<String> = cleaned
        .iter()
        .filter(|c| usable_choice(c) && !same_number(c, &correct))
        .filter(|c| seen.insert(normalize(c)))
        .take(CHOICE_COUNT - 1)
        .cloned()
        .collect();
    let dropped = cleaned.len().saturating_sub(distractors.len() + 1);

    let mut question = clean(question);
    if distractors.len() < CHOICE_COUNT - 1 {
        let seed = content_seed(&[question.as_str(), correct.as_str()]);
        fill_distractors(&correct, &mut distractors, seed);
    }
    if is_generic_question(&question) {
        let all: Vec<String> = std::iter::once(correct.clone()).chain(distractors.iter().cloned()).collect();
        question = synthesize_question(&correct, &all);
        debug!(target: "sanitizer", kind = "multiple_choice", %question, "synthesized question");
    }
    if dropped > 0 {
        debug!(target: "sanitizer", kind = "multiple_choice", dropped, "removed placeholder or duplicate choices");
    }

    let explain = Some(clean(explain)).filter(|e| !e.is_empty()).unwrap_or_else(|| DEFAULT_EXPLAIN.into());
    finish_choice(question, correct, distractors, explain)
}

fn same_number(a: &str, b: &str) -> bool {
    parse_value(a).zip(parse_value(b)).map_or(false, |(x, y)| x.equivalent(y))
}

/// Final step: canonical order, content-seeded shuffle, index resolved from
/// the correct value.
fn finish_choice(question: String, correct: String, distractors: Vec<String>, explain: String) -> ExerciseItem {
    let correct_key = normalize(&correct);
    let mut choices: Vec<String> = std::iter::once(correct).chain(distractors).collect();
    choices.sort_by_key(|c| normalize(c));
    let mut seed_parts = vec![normalize(&question)];
    seed_parts.extend(choices.iter().map(|c| normalize(c)));
    let mut rng = StdRng::seed_from_u64(content_seed(&seed_parts));
    shuffle(&mut rng, &mut choices);
    let correct_index = choices.iter().position(|c| normalize(c) == correct_key).unwrap_or(0);
    ExerciseItem::MultipleChoice(MultipleChoice { question, choices, correct_index, explain })
}

enum FillMode {
    Fraction,
    Percent(u32),
    Integer(u32),
    Text,
}

fn fill_mode(correct: &str, distractors: &[String]) -> FillMode {
    if Fraction::parse(correct).is_some() || distractors.iter().any(|d| Fraction::parse(d).is_some()) {
        FillMode::Fraction
    } else if let Some(p) = parse_percent(correct) {
        FillMode::Percent(p)
    } else if let Some(n) = parse_int(correct) {
        FillMode::Integer(n)
    } else {
        FillMode::Text
    }
}

const TEXT_FILLERS: &[&str] = &[
    "An unrelated statement",
    "A contradictory statement",
    "A partially related but incorrect statement",
    "An unsupported claim",
];

fn offsets_from(n: u32, suffix: &str) -> Vec<String> {
    let n = i64::from(n);
    let near = [1, -1, 2, -2, 3, -3, 5, -5, 10, 15, 20, 25];
    near.iter()
        .map(|o| n + o)
        .chain((11..=30).map(|o| n + o))
        .filter(|v| *v >= 0)
        .map(|v| format!("{v}{suffix}"))
        .collect()
}

/// Candidates in preference order; long enough that three fresh ones
/// always exist.
fn filler_candidates(correct: &str, distractors: &[String], seed: u64) -> Vec<String> {
    match fill_mode(correct, distractors) {
        FillMode::Fraction => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut out: Vec<String> = (0..50)
                .map(|_| format!("{}/{}", rng.gen_range(1..=9u32), rng.gen_range(2..=12u32)))
                .collect();
            out.extend((2..=12u32).flat_map(|b| (1..b).map(move |a| format!("{a}/{b}"))));
            out
        }
        FillMode::Percent(p) => offsets_from(p, "%"),
        FillMode::Integer(n) => offsets_from(n, ""),
        FillMode::Text => TEXT_FILLERS
            .iter()
            .map(|s| s.to_string())
            .chain((1..=CHOICE_COUNT).map(|i| format!("Another unrelated idea {i}")))
            .collect(),
    }
}

fn fill_distractors(correct: &str, distractors: &mut Vec<String>, seed: u64) {
    let needed = CHOICE_COUNT - 1;
    let before = distractors.len();
    let mut seen: BTreeSet<String> = distractors.iter().map(|d| normalize(d)).collect();
    seen.insert(normalize(correct));
    let mut present: Vec<Fraction> = std::iter::once(correct)
        .chain(distractors.iter().map(String::as_str))
        .filter_map(parse_value)
        .collect();
    for candidate in filler_candidates(correct, distractors, seed) {
        if distractors.len() >= needed {
            break;
        }
        let value = parse_value(&candidate);
        let clashes = value.map_or(false, |v| present.iter().any(|p| p.equivalent(v)));
        if !clashes && !is_placeholder_choice(&candidate) && seen.insert(normalize(&candidate)) {
            present.extend(value);
            distractors.push(candidate);
        }
    }
    debug!(target: "sanitizer", kind = "multiple_choice", filled = distractors.len() - before, "filled missing distractors");
}

/// Question for a choice set whose prompt was lost or generic.
fn synthesize_question(correct: &str, choices: &[String]) -> String {
    let extremes = |values: &[Fraction], target: Fraction| {
        let largest = values.iter().all(|v| target.cmp_value(*v) != Ordering::Less);
        let smallest = values.iter().all(|v| target.cmp_value(*v) != Ordering::Greater);
        (largest, smallest)
    };

    let fractions: Option<Vec<Fraction>> = choices.iter().map(|c| Fraction::parse(c)).collect();
    if let (Some(fractions), Some(target)) = (fractions, Fraction::parse(correct)) {
        let first = fractions.first().copied().unwrap_or(target);
        let family = if fractions.iter().all(|f| f.den == first.den) {
            " with the same denominator"
        } else if fractions.iter().all(|f| f.num == first.num) {
            " with the same numerator"
        } else {
            ""
        };
        match extremes(&fractions, target) {
            (true, _) => return format!("Which of these fractions{family} is the largest?"),
            (_, true) => return format!("Which of these fractions{family} is the smallest?"),
            _ => {}
        }
    }

    let integers: Option<Vec<Fraction>> = choices
        .iter()
        .map(|c| parse_int(c).and_then(|n| Fraction::new(n, 1)))
        .collect();
    if let (Some(integers), Some(target)) = (integers, parse_int(correct).and_then(|n| Fraction::new(n, 1))) {
        match extremes(&integers, target) {
            (true, _) => return "Which number is the largest?".into(),
            (_, true) => return "Which number is the smallest?".into(),
            _ => {}
        }
    }
    "Which of the following options is correct?".into()
}

/// Fixed item returned when nothing in the input is salvageable.
pub fn default_choice() -> ExerciseItem {
    finish_choice(
        "Which fraction is equivalent to 1/2?".into(),
        "2/4".into(),
        vec!["1/3".into(), "2/3".into(), "3/4".into()],
        "Multiplying numerator and denominator by the same number keeps the value.".into(),
    )
}

// ---------------------------------------------------------------------------
// Match pairs
// ---------------------------------------------------------------------------

fn default_pairs() -> Vec<(String, String)> {
    [("Numerator", "Parts taken"), ("Denominator", "Total parts"), ("1/2", "One half")]
        .iter()
        .map(|(l, r)| (l.to_string(), r.to_string()))
        .collect()
}

fn repair_pairs(raw: &RawItem) -> ExerciseItem {
    let mut seen = BTreeSet::new();
    let mut pairs: Vec<(String, String)> = raw
        .pairs
        .iter()
        .map(|(l, r)| (clean(l), clean(r)))
        .filter(|(l, r)| !l.is_empty() && !r.is_empty())
        .filter(|(l, r)| seen.insert((normalize(l), normalize(r))))
        .collect();
    if pairs.len() < 2 {
        debug!(target: "sanitizer", kind = "match_pairs", kept = pairs.len(), "too few pairs; using default pair set");
        pairs = default_pairs();
    }
    let title = first_clean(&[raw.title.as_ref(), raw.question.as_ref()]).unwrap_or_else(|| "Match each pair".into());
    let explain = first_clean(&[raw.explain.as_ref()]).unwrap_or_else(|| "Match each term with its meaning.".into());
    ExerciseItem::MatchPairs(MatchPairs { title, pairs, explain })
}

// ---------------------------------------------------------------------------
// Drag to bucket
// ---------------------------------------------------------------------------

fn distinct_clean<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .map(|v| clean(v))
        .filter(|v| !v.is_empty() && seen.insert(normalize(v)))
        .collect()
}

/// Assemble a drag item; `assigned[i]` is the bucket index of `items[i]`.
fn build_drag(
    title: String,
    items: Vec<String>,
    buckets: Vec<String>,
    assigned: &[usize],
    explain: String,
) -> ExerciseItem {
    let mut solution: BTreeMap<String, Vec<String>> = buckets.iter().map(|b| (b.clone(), Vec::new())).collect();
    for (item, &bi) in items.iter().zip(assigned) {
        if let Some(values) = buckets.get(bi).and_then(|b| solution.get_mut(b)) {
            values.push(item.clone());
        }
    }
    ExerciseItem::DragToBucket(DragToBucket { title, items, buckets, solution, explain })
}

fn default_drag() -> ExerciseItem {
    let strings = |values: &[&str]| values.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    build_drag(
        "Classify each fraction".into(),
        strings(&["1/2", "3/4", "5/3", "7/4"]),
        strings(&["Proper (a<b)", "Improper (a≥b)"]),
        &[0, 0, 1, 1],
        "A fraction is proper when the numerator is smaller than the denominator.".into(),
    )
}

fn repair_buckets(raw: &RawItem) -> ExerciseItem {
    let title =
        first_clean(&[raw.title.as_ref(), raw.question.as_ref()]).unwrap_or_else(|| "Drag each item to its bucket".into());
    let explain =
        first_clean(&[raw.explain.as_ref()]).unwrap_or_else(|| "Each item belongs to exactly one bucket.".into());

    let mut buckets = distinct_clean(&raw.buckets);
    if buckets.is_empty() {
        buckets = distinct_clean(raw.solution.iter().map(|(k, _)| k));
    }
    let items = match &raw.items {
        Some(items) if !items.is_empty() => distinct_clean(items),
        _ => {
            debug!(target: "sanitizer", kind = "drag_to_bucket", "items missing; rebuilt from solution");
            distinct_clean(raw.solution.iter().flat_map(|(_, v)| v))
        }
    };
    if items.is_empty() {
        debug!(target: "sanitizer", kind = "drag_to_bucket", "no items; using default");
        return default_drag();
    }

    if buckets.len() < 2 {
        debug!(target: "sanitizer", kind = "drag_to_bucket", buckets = buckets.len(), "too few buckets; bisecting");
        let half = items.len().div_ceil(2);
        let assigned: Vec<usize> = (0..items.len()).map(|i| usize::from(i >= half)).collect();
        return build_drag(title, items, vec!["Group A".into(), "Group B".into()], &assigned, explain);
    }

    let bucket_keys: Vec<String> = buckets.iter().map(|b| normalize(b)).collect();
    let item_keys: Vec<String> = items.iter().map(|i| normalize(i)).collect();
    let mut placements: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); items.len()];
    for (key, values) in &raw.solution {
        let Some(bi) = bucket_keys.iter().position(|k| *k == normalize(key)) else {
            continue;
        };
        for v in values {
            let v = normalize(v);
            if let Some(ii) = item_keys.iter().position(|k| *k == v) {
                placements[ii].insert(bi);
            }
        }
    }
    // Anything not in exactly one bucket goes to the first bucket.
    let orphans = placements.iter().filter(|p| p.len() != 1).count();
    if orphans > 0 {
        debug!(target: "sanitizer", kind = "drag_to_bucket", orphans, "assigned orphans to first bucket");
    }
    let mut assigned: Vec<Option<usize>> = placements
        .iter()
        .map(|p| match (p.len(), p.first()) {
            (1, Some(&bi)) => Some(bi),
            _ => Some(0),
        })
        .collect();

    place_pivot_values(&buckets, &items, &mut assigned);

    let (items, assigned): (Vec<String>, Vec<usize>) = items
        .into_iter()
        .zip(assigned)
        .filter_map(|(item, a)| a.map(|a| (item, a)))
        .unzip();
    if items.is_empty() {
        return default_drag();
    }
    build_drag(title, items, buckets, &assigned, explain)
}

/// Put an item equal to a pivot value on the side its comparison accepts.
/// `None` in `assigned` marks an item that fits no bucket and is dropped.
fn place_pivot_values(buckets: &[String], items: &[String], assigned: &mut [Option<usize>]) {
    let pivots: Vec<Option<PivotBucket>> = buckets.iter().map(|b| PivotBucket::parse(b)).collect();
    if pivots.iter().all(Option::is_none) {
        return;
    }
    for (item, slot) in items.iter().zip(assigned.iter_mut()) {
        let Some(value) = parse_value(item) else { continue };
        if !pivots.iter().flatten().any(|p| p.pivot.equivalent(value)) {
            continue;
        }
        let Some(current) = *slot else { continue };
        let fits = match pivots.get(current).copied().flatten() {
            Some(p) => p.accepts(value),
            None => true,
        };
        if fits {
            continue;
        }
        let target = pivots
            .iter()
            .position(|p| p.map_or(false, |p| p.accepts(value)))
            .or_else(|| pivots.iter().position(Option::is_none));
        debug!(target: "sanitizer", kind = "drag_to_bucket", %item, ?target, "moved pivot value");
        *slot = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq(item: ExerciseItem) -> MultipleChoice {
        match item {
            ExerciseItem::MultipleChoice(m) => m,
            other => panic!("expected multiple choice, got {:?}", other.kind()),
        }
    }

    fn drag(item: ExerciseItem) -> DragToBucket {
        match item {
            ExerciseItem::DragToBucket(d) => d,
            other => panic!("expected drag to bucket, got {:?}", other.kind()),
        }
    }

    #[test]
    fn placeholders_are_replaced_and_correct_value_tracked() {
        let item = sanitize_values(&[json!({
            "type": "multiple_choice",
            "question": "Which is greater: 3/8 or 5/8?",
            "choices": ["Option A", "5/8", "Distractor 2", "5 / 8"],
            "correct_index": 1,
            "explain": "Same denominator: compare numerators."
        })]);
        let m = mcq(item.into_iter().next().unwrap());
        assert!(m.is_valid(), "{m:?}");
        assert_eq!(m.correct_choice(), Some("5/8"));
        assert!(m.choices.iter().all(|c| c.contains('/')), "fraction fillers: {:?}", m.choices);
    }

    #[test]
    fn answer_field_recovers_lost_index() {
        let raw = RawItem {
            kind: Some("mcq".into()),
            question: Some("How many parts are taken in 3/7?".into()),
            choices: vec!["7".into(), "3".into()],
            correct_index: Some(9),
            answer: Some("3".into()),
            ..RawItem::default()
        };
        let m = mcq(sanitize_raw(&raw));
        assert!(m.is_valid());
        assert_eq!(m.correct_choice(), Some("3"));
        assert!(m.choices.iter().all(|c| parse_int(c).is_some()), "integer fillers: {:?}", m.choices);
    }

    #[test]
    fn generic_question_is_synthesized_from_choices() {
        let raw = RawItem {
            kind: Some("multiple_choice".into()),
            question: Some("Question 4".into()),
            choices: vec!["2/9".into(), "7/9".into(), "4/9".into(), "5/9".into()],
            correct_index: Some(1),
            ..RawItem::default()
        };
        let m = mcq(sanitize_raw(&raw));
        assert_eq!(m.question, "Which of these fractions with the same denominator is the largest?");
        assert_eq!(m.correct_choice(), Some("7/9"));
        assert_eq!(m.explain, DEFAULT_EXPLAIN);
    }

    #[test]
    fn equivalent_distractors_are_not_kept_next_to_the_answer() {
        let m = mcq(sanitize_raw(&RawItem {
            question: Some("Which fraction equals one half?".into()),
            choices: vec!["1/2".into(), "2/4".into(), "1/3".into(), "3/4".into()],
            correct_index: Some(0),
            ..RawItem::default()
        }));
        assert_eq!(m.choices.iter().filter(|c| same_number(c, "1/2")).count(), 1);
    }

    #[test]
    fn match_pairs_are_deduplicated_and_defaulted() {
        let item = sanitize_values(&[json!({
            "type": "pairs",
            "pairs": [["Numerator", "Parts taken"], ["numerator ", "parts  taken"], ["", "x"]]
        })]);
        let ExerciseItem::MatchPairs(m) = &item[0] else { panic!("expected pairs") };
        assert!(m.is_valid());
        assert_eq!(m.pairs, default_pairs());

        let item = sanitize_values(&[json!({"type": "match_pairs", "title": "T", "pairs": {"1/2": "half", "1/4": "quarter"}})]);
        let ExerciseItem::MatchPairs(m) = &item[0] else { panic!("expected pairs") };
        assert_eq!(m.pairs.len(), 2);
    }

    #[test]
    fn drag_items_are_rebuilt_and_orphans_go_first() {
        let d = drag(sanitize_raw(&RawItem {
            kind: Some("drag_to_bucket".into()),
            title: Some("Sort".into()),
            buckets: vec!["Proper".into(), "Improper".into()],
            solution: vec![
                ("Improper".into(), vec!["5/3".into(), "ghost".into()]),
                ("Proper".into(), vec!["1/2".into()]),
            ],
            ..RawItem::default()
        }));
        assert!(d.is_valid());
        assert_eq!(d.solution["Improper"], vec!["5/3", "ghost"]);

        let d = drag(sanitize_raw(&RawItem {
            kind: Some("buckets".into()),
            items: Some(vec!["1/2".into(), "5/3".into(), "7/8".into()]),
            buckets: vec!["Proper".into(), "Improper".into()],
            solution: vec![("Improper".into(), vec!["5/3".into(), "9/2".into()])],
            ..RawItem::default()
        }));
        assert!(d.is_valid());
        assert_eq!(d.solution["Proper"], vec!["1/2", "7/8"], "orphans land in the first bucket");
        assert_eq!(d.solution["Improper"], vec!["5/3"], "values outside items are clipped");
    }

    #[test]
    fn items_in_several_buckets_go_to_the_first_bucket() {
        let d = drag(sanitize_values(&[json!({
            "type": "drag_to_bucket",
            "buckets": ["Proper", "Improper"],
            "solution": {"Proper": ["1/2"], "Improper": ["5/3", "1/2"]}
        })]).remove(0));
        assert!(d.is_valid());
        assert_eq!(d.solution["Proper"], vec!["1/2"]);
        assert_eq!(d.solution["Improper"], vec!["5/3"]);

        let d = drag(sanitize_values(&[json!({
            "type": "drag_to_bucket",
            "items": ["x", "y", "z"],
            "buckets": ["Zeta", "Alpha"],
            "solution": {"Alpha": ["x", "y"], "Zeta": ["x", "z"]}
        })]).remove(0));
        assert!(d.is_valid());
        assert_eq!(d.bucket_of("x"), Some("Zeta"), "listed twice");
        assert_eq!(d.bucket_of("y"), Some("Alpha"));
        assert_eq!(d.bucket_of("z"), Some("Zeta"));
        assert_eq!(sanitize(&ExerciseItem::DragToBucket(d.clone())), ExerciseItem::DragToBucket(d));
    }

    #[test]
    fn single_bucket_is_bisected() {
        let d = drag(sanitize_raw(&RawItem {
            kind: Some("drag_to_bucket".into()),
            items: Some(vec!["a".into(), "b".into(), "c".into()]),
            buckets: vec!["Only".into()],
            ..RawItem::default()
        }));
        assert!(d.is_valid());
        assert_eq!(d.solution["Group A"], vec!["a", "b"]);
        assert_eq!(d.solution["Group B"], vec!["c"]);
    }

    #[test]
    fn pivot_value_moves_to_the_accepting_side() {
        let d = drag(sanitize_raw(&RawItem {
            kind: Some("drag_to_bucket".into()),
            title: Some("Compare with 3/5".into()),
            items: Some(vec!["1/5".into(), "3/5".into(), "4/5".into()]),
            buckets: vec!["Less than 3/5".into(), "Greater than or equal to 3/5".into()],
            solution: vec![
                ("Less than 3/5".into(), vec!["1/5".into(), "3/5".into()]),
                ("Greater than or equal to 3/5".into(), vec!["4/5".into()]),
            ],
            ..RawItem::default()
        }));
        assert!(d.is_valid());
        assert_eq!(d.bucket_of("3/5"), Some("Greater than or equal to 3/5"));
        assert_eq!(d.bucket_of("1/5"), Some("Less than 3/5"));
    }

    #[test]
    fn garbage_degrades_to_valid_defaults() {
        for v in [json!(null), json!(42), json!({}), json!({"type": "essay"}), json!({"type": "mcq", "choices": ["", "Option 1"]})] {
            let item = &sanitize_values(&[v.clone()])[0];
            assert!(item.is_valid(), "{v} -> {item:?}");
        }
    }

    #[test]
    fn lenient_decoding_coerces_scalars() {
        let raw = RawItem::from_value(&json!({
            "type": "Multiple-Choice",
            "question": "Pick the half",
            "options": [1, {"text": "1/2"}, true, null],
            "correct_index": "1"
        }));
        assert_eq!(raw.shape(), Some(ItemKind::MultipleChoice));
        assert_eq!(raw.choices, vec!["1", "1/2", "True"]);
        assert_eq!(raw.correct_index, Some(1));
    }

    #[test]
    fn sanitize_is_idempotent_on_repaired_items() {
        let samples = sanitize_values(&[
            json!({"type": "multiple_choice", "question": "", "choices": ["3/4"], "correct_index": 0}),
            json!({"type": "multiple_choice", "question": "Capital of nothing?", "choices": ["Blue"], "correct_index": 0}),
            json!({"type": "drag_to_bucket", "items": ["x"], "buckets": ["B"]}),
            json!({"type": "match_pairs", "pairs": [["a", "b"]]}),
        ]);
        for item in &samples {
            assert!(item.is_valid(), "{item:?}");
            assert_eq!(&sanitize(item), item);
        }
    }
}
