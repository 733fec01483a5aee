//! Numeric Variation Generator.
//!
//! Perturbs the `a/b` tokens of a known-good template by small seeded deltas:
//! numerators move by one shared delta in `[-2, 2]` (clamped to the range),
//! denominators by one shared shift derived from a delta in `[-1, 2]`.
//!
//! A shared shift keeps same-denominator and same-numerator families intact.
//! Fractions that are a k-multiple of a value named in the prompt (`4/6` for
//! "equivalent to 2/3") move with that value, so equivalence survives. A plan
//! is only used if it keeps every token proper/improper as it was, keeps
//! distinct tokens distinct, and keeps the ordering between the anchor values
//! (prompt values and the correct answer) and every other token. Otherwise the
//! numerator delta is dropped, and as a last resort the template is returned
//! unvaried.
//!
//! The correct answer is re-located by replaying the same transformation on
//! its original value, then the choice list goes back through the sanitizer.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::exercise_engine::{
    fraction::{parse_int, parse_value, replace_fractions, scan_fractions, Fraction},
    models::{DragToBucket, ExerciseItem, MatchPairs, MultipleChoice, NumericRange},
    sanitizer::{repair_choice, sanitize, sanitize_raw, RawItem},
    text::normalize,
};

/// Templates only vary one- and two-digit terms.
pub const MAX_TERM_DIGITS: usize = 2;

const NUM_DELTAS: [i64; 5] = [-2, -1, 0, 1, 2];
const DEN_DELTAS: [i64; 4] = [-1, 0, 1, 2];

fn tokens_in(text: &str) -> Vec<Fraction> {
    scan_fractions(text, Some(MAX_TERM_DIGITS)).into_iter().map(|t| t.fraction).collect()
}

/// One seeded rewrite of fraction tokens, applied identically to every string
/// of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    num_delta: i64,
    den_shift: i64,
    /// `None` disables clamping (identity plan).
    bounds: Option<(u32, u32)>,
    /// Values named by the prompt, title or bucket names.
    bases: Vec<Fraction>,
}

impl Variation {
    pub fn identity() -> Self {
        Variation { num_delta: 0, den_shift: 0, bounds: None, bases: Vec::new() }
    }

    pub fn is_identity(&self) -> bool {
        self.num_delta == 0 && self.den_shift == 0
    }

    /// Draw deltas from `seed` and keep the first plan that preserves the
    /// relations described in the module docs.
    pub fn plan(
        seed: u64,
        range: NumericRange,
        bases: Vec<Fraction>,
        tokens: &[Fraction],
        anchors: &[Fraction],
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let nd = NUM_DELTAS[rng.gen_range(0..NUM_DELTAS.len())];
        let dd = DEN_DELTAS[rng.gen_range(0..DEN_DELTAS.len())];
        for num_delta in [nd, 0] {
            let mut plan = Variation { num_delta, den_shift: 0, bounds: Some(range.bounds()), bases: bases.clone() };
            let Some((lo, hi)) = plan.shift_window(tokens) else { continue };
            plan.den_shift = dd.clamp(lo, hi);
            if plan.preserves(tokens, anchors) {
                return plan;
            }
        }
        Variation::identity()
    }

    /// Plan for a whole item: which tokens are bases and anchors depends on
    /// the variant.
    pub fn for_item(item: &ExerciseItem, seed: u64, range: NumericRange) -> Self {
        match item {
            ExerciseItem::MultipleChoice(m) => {
                let bases = tokens_in(&m.question);
                let mut tokens = bases.clone();
                tokens.extend(m.choices.iter().flat_map(|c| tokens_in(c)));
                let mut anchors = bases.clone();
                anchors.extend(m.correct_choice().map(tokens_in).unwrap_or_default());
                Variation::plan(seed, range, bases, &tokens, &anchors)
            }
            ExerciseItem::MatchPairs(m) => {
                let tokens: Vec<Fraction> =
                    m.pairs.iter().flat_map(|(l, r)| tokens_in(l).into_iter().chain(tokens_in(r))).collect();
                Variation::plan(seed, range, Vec::new(), &tokens, &tokens)
            }
            ExerciseItem::DragToBucket(d) => {
                let mut bases = tokens_in(&d.title);
                bases.extend(d.buckets.iter().flat_map(|b| tokens_in(b)));
                let mut tokens = bases.clone();
                tokens.extend(d.items.iter().flat_map(|i| tokens_in(i)));
                Variation::plan(seed, range, bases.clone(), &tokens, &bases)
            }
        }
    }

    fn numerator(&self, n: u32) -> i64 {
        let a = i64::from(n) + self.num_delta;
        match self.bounds {
            Some((lo, hi)) => a.clamp(i64::from(lo), i64::from(hi)),
            None => a.max(0),
        }
    }

    fn scaled_base(&self, f: Fraction) -> Option<(Fraction, u32)> {
        self.bases
            .iter()
            .find_map(|b| f.multiple_of(*b).filter(|k| *k >= 2).map(|k| (*b, k)))
    }

    /// Allowed denominator shifts: at least 1, and proper stays proper,
    /// improper stays improper, for every token that moves on its own.
    fn shift_window(&self, tokens: &[Fraction]) -> Option<(i64, i64)> {
        let (mut lo, mut hi) = (i64::MIN, i64::MAX);
        for f in tokens.iter().filter(|f| self.scaled_base(**f).is_none()) {
            let a = self.numerator(f.num);
            let b = i64::from(f.den);
            lo = lo.max(1 - b);
            if f.is_proper() {
                lo = lo.max(a - b + 1);
            } else {
                hi = hi.min(a - b);
            }
        }
        (lo <= hi).then_some((lo, hi))
    }

    fn preserves(&self, tokens: &[Fraction], anchors: &[Fraction]) -> bool {
        let before: BTreeSet<(u32, u32)> = tokens.iter().map(|f| (f.num, f.den)).collect();
        let after: BTreeSet<(u32, u32)> = before
            .iter()
            .map(|&(num, den)| self.apply(Fraction { num, den }))
            .map(|f| (f.num, f.den))
            .collect();
        before.len() == after.len()
            && tokens.iter().all(|f| self.apply(*f).is_proper() == f.is_proper())
            && anchors.iter().all(|x| {
                tokens
                    .iter()
                    .all(|y| x.cmp_value(*y) == self.apply(*x).cmp_value(self.apply(*y)))
            })
    }

    fn moved(&self, f: Fraction) -> Fraction {
        let num = u32::try_from(self.numerator(f.num)).unwrap_or(f.num);
        let den = u32::try_from((i64::from(f.den) + self.den_shift).max(1)).unwrap_or(f.den);
        Fraction { num, den }
    }

    /// Rewrite one fraction.
    pub fn apply(&self, f: Fraction) -> Fraction {
        match self.scaled_base(f) {
            Some((base, k)) => self.moved(base).scale(k),
            None => self.moved(f),
        }
    }

    /// Rewrite every fraction token in `text`.
    pub fn transform(&self, text: &str) -> String {
        replace_fractions(text, Some(MAX_TERM_DIGITS), |f| self.apply(f))
    }

    /// Like [`transform`](Self::transform), but a bare integer equal to a term
    /// of the single prompt fraction ("the numerator of 3/7") follows that term.
    pub fn transform_choice(&self, choice: &str) -> String {
        if let (Some(n), [base]) = (parse_int(choice), self.bases.as_slice()) {
            let moved = self.apply(*base);
            if n == base.num && base.num != base.den {
                return moved.num.to_string();
            }
            if n == base.den {
                return moved.den.to_string();
            }
            return choice.to_string();
        }
        self.transform(choice)
    }
}

/// Vary a template item. Same variant out, always sanitized.
pub fn vary(template: &ExerciseItem, seed: u64, range: NumericRange) -> ExerciseItem {
    let template = sanitize(template);
    let plan = Variation::for_item(&template, seed, range);
    if plan.is_identity() {
        return template;
    }
    let varied = match &template {
        ExerciseItem::MultipleChoice(m) => Some(vary_choice(m, &plan, seed)),
        ExerciseItem::MatchPairs(m) => vary_pairs(m, &plan),
        ExerciseItem::DragToBucket(d) => Some(vary_buckets(d, &plan)),
    };
    varied.unwrap_or(template)
}

fn vary_choice(m: &MultipleChoice, plan: &Variation, seed: u64) -> ExerciseItem {
    let question = plan.transform(&m.question);
    let mut choices: Vec<String> = m.choices.iter().map(|c| plan.transform_choice(c)).collect();
    let correct = plan.transform_choice(m.correct_choice().unwrap_or_default());
    let key = normalize(&correct);
    if !choices.iter().any(|c| normalize(c) == key) {
        let at = usize::try_from(seed % (choices.len() as u64 + 1)).unwrap_or(0);
        choices.insert(at.min(choices.len()), correct.clone());
    }
    repair_choice(&question, &choices, Some(&correct), &plan.transform(&m.explain))
}

/// `None` when a pair mixes a number with prose that cannot follow it.
fn vary_pairs(m: &MatchPairs, plan: &Variation) -> Option<ExerciseItem> {
    let numeric = |s: &str| parse_value(s).is_some();
    let has_token = |s: &str| !tokens_in(s).is_empty();
    let safe = m
        .pairs
        .iter()
        .all(|(l, r)| (numeric(l) && numeric(r)) || (!has_token(l) && !has_token(r)));
    if !safe {
        return None;
    }
    Some(sanitize_raw(&RawItem {
        kind: Some("match_pairs".into()),
        title: Some(plan.transform(&m.title)),
        pairs: m.pairs.iter().map(|(l, r)| (plan.transform(l), plan.transform(r))).collect(),
        explain: Some(plan.transform(&m.explain)),
        ..RawItem::default()
    }))
}

fn vary_buckets(d: &DragToBucket, plan: &Variation) -> ExerciseItem {
    let all = |values: &[String]| values.iter().map(|v| plan.transform(v)).collect::<Vec<_>>();
    sanitize_raw(&RawItem {
        kind: Some("drag_to_bucket".into()),
        title: Some(plan.transform(&d.title)),
        items: Some(all(&d.items)),
        buckets: all(&d.buckets),
        solution: d.solution.iter().map(|(k, v)| (plan.transform(k), all(v))).collect(),
        explain: Some(plan.transform(&d.explain)),
        ..RawItem::default()
    })
}
