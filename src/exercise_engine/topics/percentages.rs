//! Percentages fallback (grade 6, `porcentajes`).
//!
//! | #    | Item                                         |
//! |------|----------------------------------------------|
//! | 1-4  | `p%` of `n`                                  |
//! | 5-7  | percentage equal to a fraction               |
//! | 8    | match fractions with percentages             |
//! | 9    | below 50% / at least 50% buckets             |
//! | 10   | fraction equal to a percentage               |

use rand::rngs::StdRng;
use rand::Rng;

use crate::exercise_engine::{
    helpers::{bucket_item, draw_avoiding, mcq_by_value, pairs_item, shuffle},
    models::{AvoidSet, ContentContext, ExerciseItem, SESSION_SIZE},
    text::normalize,
};

use super::{FallbackRequest, TopicStrategy};

/// `(percent, step)`: `n` must be a multiple of `step` for `p% of n` to be whole.
const PERCENT_STEPS: [(u32, u32); 5] = [(10, 10), (20, 5), (25, 4), (50, 2), (75, 4)];

/// Simplest fractions with a whole-number percentage.
const FRACTION_PERCENTS: [(u32, u32, u32); 10] = [
    (1, 2, 50),
    (1, 4, 25),
    (3, 4, 75),
    (1, 5, 20),
    (2, 5, 40),
    (3, 5, 60),
    (4, 5, 80),
    (1, 10, 10),
    (3, 10, 30),
    (7, 10, 70),
];

pub const BELOW_HALF_BUCKET: &str = "Less than 50%";
pub const AT_LEAST_HALF_BUCKET: &str = "Greater than or equal to 50%";

pub struct PercentagesTopic;

impl TopicStrategy for PercentagesTopic {
    fn slug(&self) -> &'static str {
        "porcentajes"
    }

    fn grade(&self) -> Option<u32> {
        Some(6)
    }

    fn detect(&self, context: &ContentContext) -> bool {
        let key = normalize(&format!("{} {}", context.slug, context.title));
        if ["porcentaje", "percent", "%"].iter().any(|w| key.contains(w)) {
            return true;
        }
        context.concept_texts().iter().any(|t| t.contains('%'))
    }

    fn fallback_items(&self, request: &FallbackRequest<'_>, rng: &mut StdRng) -> Vec<ExerciseItem> {
        generate(request, rng)
    }
}

pub fn generate<R: Rng>(request: &FallbackRequest<'_>, rng: &mut R) -> Vec<ExerciseItem> {
    let mut avoid = request.avoid.clone();
    let mut items = Vec::with_capacity(SESSION_SIZE);
    for _ in 0..4 {
        items.push(percent_of(rng, request, &mut avoid));
    }

    // Table rows not touching the avoid set go first; rows are never reused.
    let mut rows = FRACTION_PERCENTS.to_vec();
    shuffle(rng, &mut rows);
    rows.sort_by_key(|&(a, b, _)| avoid.contains(a) || avoid.contains(b));

    for &row in &rows[..3] {
        items.push(to_percent(rng, row));
    }
    items.push(fraction_percent_pairs(&rows[4..7]));
    items.push(half_buckets(rng));
    items.push(to_fraction(rng, rows[3]));
    items
}

fn percent_of<R: Rng>(rng: &mut R, request: &FallbackRequest<'_>, avoid: &mut AvoidSet) -> ExerciseItem {
    let (min, max) = request.range;
    let draw = |rng: &mut R| {
        let (p, step) = PERCENT_STEPS[rng.gen_range(0..PERCENT_STEPS.len())];
        (p, step * rng.gen_range(min..=max))
    };
    let (p, n) = draw_avoiding(rng, request.attempts, draw, |&(p, n)| {
        !avoid.contains(n) && !avoid.contains(p * n / 100)
    })
    .unwrap_or_else(|_| (50, 2 * rng.gen_range(min..=max)));
    let result = p * n / 100;
    avoid.extend([n, result]);
    mcq_by_value(
        format!("What is {p}% of {n}?"),
        result.to_string(),
        vec![(n - result).to_string(), (result * 2).to_string(), n.to_string()],
        "Divide by 100 and multiply by the percentage.",
    )
}

fn others<R: Rng>(rng: &mut R, row: (u32, u32, u32)) -> Vec<(u32, u32, u32)> {
    let mut rest: Vec<_> = FRACTION_PERCENTS.iter().copied().filter(|r| *r != row).collect();
    shuffle(rng, &mut rest);
    rest.truncate(3);
    rest
}

fn to_percent<R: Rng>(rng: &mut R, row: (u32, u32, u32)) -> ExerciseItem {
    let (a, b, p) = row;
    mcq_by_value(
        format!("Which percentage is equal to {a}/{b}?"),
        format!("{p}%"),
        others(rng, row).into_iter().map(|(_, _, q)| format!("{q}%")).collect(),
        "Write the fraction with denominator 100; the numerator is the percentage.",
    )
}

fn to_fraction<R: Rng>(rng: &mut R, row: (u32, u32, u32)) -> ExerciseItem {
    let (a, b, p) = row;
    mcq_by_value(
        format!("Which fraction is equal to {p}%?"),
        format!("{a}/{b}"),
        others(rng, row).into_iter().map(|(x, y, _)| format!("{x}/{y}")).collect(),
        "A percentage is a fraction of 100; simplify it.",
    )
}

fn fraction_percent_pairs(rows: &[(u32, u32, u32)]) -> ExerciseItem {
    let pairs = rows.iter().map(|(a, b, p)| (format!("{a}/{b}"), format!("{p}%"))).collect();
    pairs_item("Match each fraction with its percentage", pairs, "Equal amounts, two notations.")
}

fn half_buckets<R: Rng>(rng: &mut R) -> ExerciseItem {
    let mut below: Vec<u32> = (1..10).map(|k| k * 5).collect();
    let mut above: Vec<u32> = (10..20).map(|k| k * 5).collect();
    shuffle(rng, &mut below);
    shuffle(rng, &mut above);
    let mut values: Vec<(String, usize)> = below[..3]
        .iter()
        .map(|p| (format!("{p}%"), 0))
        .chain(above[..3].iter().map(|p| (format!("{p}%"), 1)))
        .collect();
    shuffle(rng, &mut values);
    bucket_item(
        "Compare each percentage with 50%",
        &[BELOW_HALF_BUCKET.to_string(), AT_LEAST_HALF_BUCKET.to_string()],
        values,
        "50% is one half.",
    )
}
