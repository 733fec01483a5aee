use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::exercise_engine::error::EngineError;
use crate::exercise_engine::fraction::{scan_fractions, PivotBucket};
use crate::exercise_engine::text::{clean, is_generic_question, is_placeholder_choice, normalize};

/// Every session holds exactly this many items.
pub const SESSION_SIZE: usize = 10;
/// Every multiple-choice item holds exactly this many choices.
pub const CHOICE_COUNT: usize = 4;

// ---------------------------------------------------------------------------
// Exercise items
// ---------------------------------------------------------------------------

/// One exercise. The serde form is the boundary JSON
/// (`{"type": "multiple_choice", ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExerciseItem {
    MultipleChoice(MultipleChoice),
    MatchPairs(MatchPairs),
    DragToBucket(DragToBucket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoice {
    pub question: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPairs {
    pub title: String,
    pub pairs: Vec<(String, String)>,
    #[serde(default)]
    pub explain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragToBucket {
    pub title: String,
    pub items: Vec<String>,
    pub buckets: Vec<String>,
    /// Keyed by every bucket name; an exact partition of `items`.
    pub solution: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub explain: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    MultipleChoice,
    MatchPairs,
    DragToBucket,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::MultipleChoice => write!(f, "multiple_choice"),
            ItemKind::MatchPairs     => write!(f, "match_pairs"),
            ItemKind::DragToBucket   => write!(f, "drag_to_bucket"),
        }
    }
}

fn is_clean_text(s: &str) -> bool {
    !s.is_empty() && clean(s) == s
}

fn all_distinct<'a>(values: impl IntoIterator<Item = &'a String>) -> bool {
    let mut seen = BTreeSet::new();
    values.into_iter().all(|v| seen.insert(normalize(v)))
}

impl MultipleChoice {
    pub fn correct_choice(&self) -> Option<&str> {
        self.choices.get(self.correct_index).map(String::as_str)
    }

    /// Four distinct, non-placeholder choices; index in range; real question.
    pub fn is_valid(&self) -> bool {
        self.choices.len() == CHOICE_COUNT
            && self.correct_index < CHOICE_COUNT
            && self.choices.iter().all(|c| is_clean_text(c) && !is_placeholder_choice(c))
            && all_distinct(&self.choices)
            && is_clean_text(&self.question)
            && !is_generic_question(&self.question)
            && !self.explain.is_empty()
    }
}

impl MatchPairs {
    /// At least two pairs, both sides non-empty, no duplicate pair.
    pub fn is_valid(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.pairs.len() >= 2
            && self.pairs.iter().all(|(l, r)| {
                is_clean_text(l) && is_clean_text(r) && seen.insert((normalize(l), normalize(r)))
            })
            && is_clean_text(&self.title)
            && !self.explain.is_empty()
    }
}

impl DragToBucket {
    /// `solution` covers every item exactly once and only names real buckets.
    pub fn is_partition(&self) -> bool {
        let bucket_keys: BTreeSet<String> = self.buckets.iter().map(|b| normalize(b)).collect();
        if self.solution.keys().any(|k| !bucket_keys.contains(&normalize(k))) {
            return false;
        }
        let mut assigned: BTreeMap<String, usize> = BTreeMap::new();
        for values in self.solution.values() {
            for v in values {
                *assigned.entry(normalize(v)).or_default() += 1;
            }
        }
        let item_keys: BTreeSet<String> = self.items.iter().map(|i| normalize(i)).collect();
        item_keys.len() == self.items.len()
            && assigned.len() == item_keys.len()
            && assigned.iter().all(|(k, n)| *n == 1 && item_keys.contains(k))
    }

    /// Bucket whose solution list holds `item`.
    pub fn bucket_of(&self, item: &str) -> Option<&str> {
        let key = normalize(item);
        self.solution
            .iter()
            .find(|(_, values)| values.iter().any(|v| normalize(v) == key))
            .map(|(b, _)| b.as_str())
    }

    pub fn pivot_buckets(&self) -> Vec<(String, PivotBucket)> {
        self.buckets
            .iter()
            .filter_map(|b| PivotBucket::parse(b).map(|p| (b.clone(), p)))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.buckets.len() >= 2
            && self.buckets.iter().all(|b| is_clean_text(b))
            && all_distinct(&self.buckets)
            && self.buckets.iter().all(|b| self.solution.contains_key(b))
            && !self.items.is_empty()
            && self.items.iter().all(|i| is_clean_text(i))
            && self.is_partition()
            && is_clean_text(&self.title)
            && !self.explain.is_empty()
    }
}

impl ExerciseItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            ExerciseItem::MultipleChoice(_) => ItemKind::MultipleChoice,
            ExerciseItem::MatchPairs(_)     => ItemKind::MatchPairs,
            ExerciseItem::DragToBucket(_)   => ItemKind::DragToBucket,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ExerciseItem::MultipleChoice(m) => m.is_valid(),
            ExerciseItem::MatchPairs(m)     => m.is_valid(),
            ExerciseItem::DragToBucket(d)   => d.is_valid(),
        }
    }

    pub fn explain(&self) -> &str {
        match self {
            ExerciseItem::MultipleChoice(m) => &m.explain,
            ExerciseItem::MatchPairs(m)     => &m.explain,
            ExerciseItem::DragToBucket(d)   => &d.explain,
        }
    }

    /// Order-insensitive, formatting-insensitive identity used for dedup.
    pub fn structural_key(&self) -> String {
        fn sorted(values: impl Iterator<Item = String>) -> String {
            let set: BTreeSet<String> = values.collect();
            set.into_iter().collect::<Vec<_>>().join("|")
        }
        match self {
            ExerciseItem::MultipleChoice(m) => format!(
                "mc:{}:{}",
                normalize(&m.question),
                sorted(m.choices.iter().map(|c| normalize(c)))
            ),
            ExerciseItem::MatchPairs(m) => format!(
                "mp:{}",
                sorted(m.pairs.iter().map(|(l, r)| format!("{}={}", normalize(l), normalize(r))))
            ),
            ExerciseItem::DragToBucket(d) => format!(
                "db:{}:{}",
                sorted(d.buckets.iter().map(|b| normalize(b))),
                sorted(d.items.iter().map(|i| normalize(i)))
            ),
        }
    }

    /// Every integer appearing in a fraction token anywhere in the item.
    pub fn fraction_numbers(&self) -> Vec<u32> {
        let mut texts: Vec<&str> = Vec::new();
        match self {
            ExerciseItem::MultipleChoice(m) => {
                texts.push(&m.question);
                texts.extend(m.choices.iter().map(String::as_str));
            }
            ExerciseItem::MatchPairs(m) => {
                for (l, r) in &m.pairs {
                    texts.push(l);
                    texts.push(r);
                }
            }
            ExerciseItem::DragToBucket(d) => {
                texts.extend(d.items.iter().map(String::as_str));
                texts.extend(d.buckets.iter().map(String::as_str));
            }
        }
        texts
            .into_iter()
            .flat_map(|t| scan_fractions(t, None))
            .flat_map(|tok| [tok.fraction.num, tok.fraction.den])
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Learning style
// ---------------------------------------------------------------------------

/// VAK style: which sensory modality the learner prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    #[serde(alias = "auditivo")]
    Auditory,
    #[serde(alias = "kinestesico", alias = "kinestésico")]
    Kinesthetic,
}

impl LearningStyle {
    /// Kinesthetic learners only get items they physically manipulate.
    pub fn allows_multiple_choice(self) -> bool {
        !matches!(self, LearningStyle::Kinesthetic)
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningStyle::Visual      => write!(f, "visual"),
            LearningStyle::Auditory    => write!(f, "auditory"),
            LearningStyle::Kinesthetic => write!(f, "kinesthetic"),
        }
    }
}

impl FromStr for LearningStyle {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visual" => Ok(LearningStyle::Visual),
            "auditory" | "auditivo" => Ok(LearningStyle::Auditory),
            "kinesthetic" | "kinestesico" | "kinestésico" => Ok(LearningStyle::Kinesthetic),
            _ => Err(EngineError::UnknownStyle(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Content context
// ---------------------------------------------------------------------------

/// Inclusive bounds for generated numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericRange {
    pub min: u32,
    pub max: u32,
}

impl Default for NumericRange {
    fn default() -> Self {
        NumericRange { min: 1, max: 12 }
    }
}

/// Largest number any generator draws, whatever the caller allows.
pub const MAX_NUMBER: u32 = 1000;

impl NumericRange {
    /// Effective bounds: within `1..=MAX_NUMBER` with room for at least
    /// four values.
    pub fn bounds(self) -> (u32, u32) {
        let min = self.min.clamp(1, MAX_NUMBER - 3);
        (min, self.max.clamp(min + 3, MAX_NUMBER))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Concept {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Example {
    pub explain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub allowed_numbers: Option<NumericRange>,
}

/// Read-only description of a topic, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentContext {
    pub grade: Option<u32>,
    pub slug: String,
    pub title: String,
    pub concepts: Vec<Concept>,
    pub examples: Vec<Example>,
    pub constraints: Constraints,
    /// Pre-authored template items, untrusted until sanitized.
    pub exercise_bank: Vec<serde_json::Value>,
}

impl ContentContext {
    pub fn numeric_range(&self, default: NumericRange) -> NumericRange {
        self.constraints.allowed_numbers.unwrap_or(default)
    }

    pub fn concept_texts(&self) -> Vec<String> {
        self.concepts.iter().map(|c| clean(&c.text)).filter(|t| !t.is_empty()).collect()
    }

    pub fn example_texts(&self) -> Vec<String> {
        self.examples.iter().map(|e| clean(&e.explain)).filter(|t| !t.is_empty()).collect()
    }
}

// ---------------------------------------------------------------------------
// Avoid set and per-learner variation state
// ---------------------------------------------------------------------------

/// Numbers recently used for a learner+topic. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvoidSet(BTreeSet<u32>);

impl AvoidSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, n: u32) -> bool {
        self.0.contains(&n)
    }

    pub fn insert(&mut self, n: u32) {
        self.0.insert(n);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Numbers used by the fraction tokens of `items`.
    pub fn from_items(items: &[ExerciseItem]) -> Self {
        items.iter().flat_map(ExerciseItem::fraction_numbers).collect()
    }
}

impl FromIterator<u32> for AvoidSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        AvoidSet(iter.into_iter().collect())
    }
}

impl Extend<u32> for AvoidSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

/// How many past sessions feed the avoid set.
pub const RECENT_SESSIONS: usize = 5;

/// Per learner+topic value the caller persists between sessions.
///
/// The engine never locks it: the caller serializes session opens for the
/// same learner+topic and stores the updated value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationState {
    pub variation_seed: u64,
    pub recent: VecDeque<AvoidSet>,
}

impl VariationState {
    pub fn avoid_set(&self) -> AvoidSet {
        self.recent.iter().flat_map(AvoidSet::iter).collect()
    }

    /// Record a finished build: remember its numbers and advance the seed.
    pub fn record(&mut self, set: &ExerciseSet) {
        self.recent.push_back(AvoidSet::from_items(set.items()));
        while self.recent.len() > RECENT_SESSIONS {
            self.recent.pop_front();
        }
        self.variation_seed = self.variation_seed.wrapping_add(1);
    }
}

// ---------------------------------------------------------------------------
// Session request / response
// ---------------------------------------------------------------------------

/// Which producer fills the session before sanitizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// Model adapter, falling back to templates on failure or timeout.
    Model,
    /// Deterministic templates only.
    Template,
    /// Vary the context's exercise bank with the given seed.
    BankVariation { seed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Model,
    Template,
    BankVariation,
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemSource::Model         => write!(f, "model"),
            ItemSource::Template      => write!(f, "template"),
            ItemSource::BankVariation => write!(f, "bank_variation"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub context: ContentContext,
    pub style: LearningStyle,
    pub avoid: AvoidSet,
    /// `None` draws from entropy.
    pub seed: Option<u64>,
    pub strategy: GenerationStrategy,
    /// Whether the caller will attach audio to auditory sessions.
    pub audio_available: bool,
}

impl SessionRequest {
    /// Model strategy, no avoid set, entropy seed, no audio.
    pub fn new(context: ContentContext, style: LearningStyle) -> Self {
        SessionRequest {
            context,
            style,
            avoid: AvoidSet::new(),
            seed: None,
            strategy: GenerationStrategy::Model,
            audio_available: false,
        }
    }
}

/// Exactly [`SESSION_SIZE`] items plus a short explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseSet {
    items: Vec<ExerciseItem>,
    pub explanation: String,
    pub style: LearningStyle,
    pub source: ItemSource,
}

impl ExerciseSet {
    /// Callers outside the engine get sets only from the Topic Engine.
    pub(crate) fn new(
        items: Vec<ExerciseItem>,
        explanation: String,
        style: LearningStyle,
        source: ItemSource,
    ) -> Self {
        debug_assert_eq!(items.len(), SESSION_SIZE);
        ExerciseSet { items, explanation, style, source }
    }

    pub fn items(&self) -> &[ExerciseItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ExerciseItem> {
        self.items
    }

    pub fn used_numbers(&self) -> AvoidSet {
        AvoidSet::from_items(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(choices: [&str; 4], correct_index: usize) -> MultipleChoice {
        MultipleChoice {
            question: "Which is greater: 3/8 or 5/8?".into(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            correct_index,
            explain: "Same denominator: larger numerator.".into(),
        }
    }

    #[test]
    fn multiple_choice_validity() {
        assert!(mcq(["5/8", "3/8", "3/9", "5/9"], 0).is_valid());
        assert!(!mcq(["5/8", "5 / 8", "3/9", "5/9"], 0).is_valid(), "duplicate after normalizing");
        assert!(!mcq(["5/8", "Option B", "3/9", "5/9"], 0).is_valid(), "placeholder");
        assert!(!mcq(["5/8", "3/8", "3/9", "5/9"], 4).is_valid(), "index out of range");
    }

    #[test]
    fn partition_detects_orphans_and_duplicates() {
        let mut d = DragToBucket {
            title: "Classify".into(),
            items: vec!["1/2".into(), "2/4".into(), "1/3".into()],
            buckets: vec!["BucketA".into(), "BucketB".into()],
            solution: BTreeMap::from([
                ("BucketA".to_string(), vec!["1/2".to_string(), "2/4".to_string()]),
                ("BucketB".to_string(), vec!["1/3".to_string()]),
            ]),
            explain: "x".into(),
        };
        assert!(d.is_valid());
        d.solution.get_mut("BucketB").unwrap().clear();
        assert!(!d.is_partition(), "orphan");
        d.solution.get_mut("BucketB").unwrap().extend(["1/3".to_string(), "1/2".to_string()]);
        assert!(!d.is_partition(), "duplicate");
    }

    #[test]
    fn style_parsing_accepts_spanish_and_rejects_unknown() {
        assert_eq!("kinestesico".parse::<LearningStyle>().unwrap(), LearningStyle::Kinesthetic);
        assert_eq!(" Auditivo ".parse::<LearningStyle>().unwrap(), LearningStyle::Auditory);
        assert!(matches!("tactile".parse::<LearningStyle>(), Err(EngineError::UnknownStyle(_))));
        let s: LearningStyle = serde_json::from_str("\"kinestésico\"").unwrap();
        assert_eq!(s, LearningStyle::Kinesthetic);
    }

    #[test]
    fn wire_shape_is_internally_tagged() {
        let item = ExerciseItem::MatchPairs(MatchPairs {
            title: "Match".into(),
            pairs: vec![("L1".into(), "R1".into()), ("L2".into(), "R2".into())],
            explain: "e".into(),
        });
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["type"], "match_pairs");
        assert_eq!(v["pairs"][1][0], "L2");
        let back: ExerciseItem = serde_json::from_value(v).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn variation_state_keeps_a_bounded_window() {
        let set = ExerciseSet::new(
            vec![ExerciseItem::MatchPairs(MatchPairs {
                title: "Match".into(),
                pairs: vec![("1/2".into(), "2/4".into()), ("1/3".into(), "2/6".into())],
                explain: "e".into(),
            }); SESSION_SIZE],
            "x".into(),
            LearningStyle::Visual,
            ItemSource::Template,
        );
        let mut state = VariationState::default();
        for _ in 0..(RECENT_SESSIONS + 3) {
            state.record(&set);
        }
        assert_eq!(state.recent.len(), RECENT_SESSIONS);
        assert_eq!(state.variation_seed, (RECENT_SESSIONS + 3) as u64);
        assert_eq!(state.avoid_set().iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 6]);
    }

    #[test]
    fn numeric_range_bounds_leave_room() {
        assert_eq!(NumericRange { min: 0, max: 2 }.bounds(), (1, 4));
        assert_eq!(NumericRange { min: 1, max: 12 }.bounds(), (1, 12));
        assert_eq!(NumericRange { min: 1, max: u32::MAX }.bounds(), (1, MAX_NUMBER));
        assert_eq!(NumericRange { min: u32::MAX, max: u32::MAX }.bounds(), (MAX_NUMBER - 3, MAX_NUMBER));
    }
}
