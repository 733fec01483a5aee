//! Fractions fallback (grade 3, `fracciones-basicas`).
//!
//! | #    | Item                                              |
//! |------|---------------------------------------------------|
//! | 1-4  | equivalent fraction of `a/b` (factor 2, 3 or 4)   |
//! | 5-7  | greater of two, same denominator or numerator     |
//! | 8    | match equivalent fractions                        |
//! | 9    | proper / improper buckets                         |
//! | 10   | less than / at least a pivot fraction             |

use rand::rngs::StdRng;
use rand::Rng;

use crate::exercise_engine::{
    fraction::scan_fractions,
    helpers::{bucket_item, draw_avoiding, mcq_by_value, pairs_item, pick_fraction, shuffle},
    models::{AvoidSet, ContentContext, ExerciseItem, SESSION_SIZE},
    text::normalize,
};

use super::{FallbackRequest, TopicStrategy};

const FACTORS: [u32; 3] = [2, 3, 4];

pub const PROPER_BUCKET: &str = "Proper (a<b)";
pub const IMPROPER_BUCKET: &str = "Improper (a≥b)";

pub struct FractionsTopic;

impl TopicStrategy for FractionsTopic {
    fn slug(&self) -> &'static str {
        "fracciones-basicas"
    }

    fn grade(&self) -> Option<u32> {
        Some(3)
    }

    fn detect(&self, context: &ContentContext) -> bool {
        let key = normalize(&format!("{} {}", context.slug, context.title));
        if ["fraccion", "fracción", "fraction"].iter().any(|w| key.contains(w)) {
            return true;
        }
        context
            .concept_texts()
            .iter()
            .chain(context.example_texts().iter())
            .any(|t| !scan_fractions(t, Some(2)).is_empty())
    }

    fn fallback_items(&self, request: &FallbackRequest<'_>, rng: &mut StdRng) -> Vec<ExerciseItem> {
        generate(request, rng)
    }
}

/// The ten items in table order. Numbers used by earlier items are added to
/// the avoid set for later ones.
pub fn generate<R: Rng>(request: &FallbackRequest<'_>, rng: &mut R) -> Vec<ExerciseItem> {
    let mut avoid = request.avoid.clone();
    let mut items = Vec::with_capacity(SESSION_SIZE);
    for _ in 0..4 {
        items.push(equivalence(rng, request, &mut avoid));
    }
    for _ in 0..3 {
        items.push(comparison(rng, request, &mut avoid));
    }
    items.push(equivalent_pairs(rng, request, &mut avoid));
    items.push(proper_improper(rng, request, &mut avoid));
    items.push(pivot_comparison(rng, request, &mut avoid));
    items
}

fn factor<R: Rng>(rng: &mut R) -> u32 {
    FACTORS[rng.gen_range(0..FACTORS.len())]
}

// ---------------------------------------------------------------------------
// Multiple choice
// ---------------------------------------------------------------------------

fn equivalence<R: Rng>(rng: &mut R, request: &FallbackRequest<'_>, avoid: &mut AvoidSet) -> ExerciseItem {
    let (a, b) = pick_fraction(rng, request.range, avoid, request.attempts);
    let k = factor(rng);
    avoid.extend([a, b, a * k, b * k]);
    mcq_by_value(
        format!("Which fraction is equivalent to {a}/{b}?"),
        format!("{}/{}", a * k, b * k),
        vec![format!("{a}/{}", b + k), format!("{}/{b}", a + k), format!("{}/{}", a * k, b + k)],
        "Multiply the numerator and the denominator by the same number.",
    )
}

fn comparison<R: Rng>(rng: &mut R, request: &FallbackRequest<'_>, avoid: &mut AvoidSet) -> ExerciseItem {
    let (min, max) = request.range;
    if rng.gen_bool(0.5) {
        // Same denominator: the larger numerator wins.
        let lo_den = (min + 2).max(3);
        let draw = |rng: &mut R| {
            let den = rng.gen_range(lo_den..=max + 4);
            (den, rng.gen_range(min..den), rng.gen_range(min..den))
        };
        let (den, a1, a2) = draw_avoiding(rng, request.attempts, draw, |&(d, x, y)| {
            x != y && ![d, x, y].iter().any(|n| avoid.contains(*n))
        })
        .unwrap_or_else(|_| {
            let den = rng.gen_range(lo_den..=max + 4);
            let a1 = rng.gen_range(min..den);
            (den, a1, if a1 == min { min + 1 } else { min })
        });
        avoid.extend([a1, a2, den]);
        let (hi, lo) = (a1.max(a2), a1.min(a2));
        mcq_by_value(
            format!("Which is greater: {a1}/{den} or {a2}/{den}?"),
            format!("{hi}/{den}"),
            vec![format!("{lo}/{den}"), format!("{a1}/{}", den + 1), format!("{a2}/{}", den + 1)],
            "Same denominator: the larger numerator gives the larger fraction.",
        )
    } else {
        // Same numerator: the smaller denominator wins.
        let draw = |rng: &mut R| {
            let num = rng.gen_range(min..=max);
            (num, rng.gen_range(num + 1..=num + 6), rng.gen_range(num + 1..=num + 6))
        };
        let (num, b1, b2) = draw_avoiding(rng, request.attempts, draw, |&(n, x, y)| {
            x != y && ![n, x, y].iter().any(|v| avoid.contains(*v))
        })
        .unwrap_or_else(|_| {
            let num = rng.gen_range(min..=max);
            (num, num + 1, num + 2)
        });
        avoid.extend([num, b1, b2]);
        let (small, big) = (b1.min(b2), b1.max(b2));
        mcq_by_value(
            format!("Which is greater: {num}/{b1} or {num}/{b2}?"),
            format!("{num}/{small}"),
            vec![format!("{num}/{big}"), format!("{}/{b1}", num + 1), format!("{}/{b2}", num + 1)],
            "Same numerator: the smaller denominator gives the larger fraction.",
        )
    }
}

// ---------------------------------------------------------------------------
// Pairs and buckets
// ---------------------------------------------------------------------------

fn equivalent_pairs<R: Rng>(rng: &mut R, request: &FallbackRequest<'_>, avoid: &mut AvoidSet) -> ExerciseItem {
    let pairs = (0..3)
        .map(|_| {
            let (a, b) = pick_fraction(rng, request.range, avoid, request.attempts);
            let k = factor(rng);
            avoid.extend([a, b, a * k, b * k]);
            (format!("{a}/{b}"), format!("{}/{}", a * k, b * k))
        })
        .collect();
    pairs_item("Match the equivalent fractions", pairs, "Equivalent fractions name the same amount.")
}

fn proper_improper<R: Rng>(rng: &mut R, request: &FallbackRequest<'_>, avoid: &mut AvoidSet) -> ExerciseItem {
    let mut pool: Vec<(u32, u32)> = (0..6)
        .map(|_| {
            let (a, b) = pick_fraction(rng, request.range, avoid, request.attempts);
            avoid.extend([a, b]);
            (a, b)
        })
        .collect();
    // Both buckets get at least one member.
    if pool.iter().all(|(a, b)| a < b) {
        if let Some(last) = pool.last_mut() {
            *last = (last.1, last.0);
        }
    } else if pool.iter().all(|(a, b)| a >= b) {
        if let Some(first) = pool.first_mut() {
            *first = (first.1.min(first.0), first.0.max(first.1) + 1);
        }
    }
    let buckets = [PROPER_BUCKET.to_string(), IMPROPER_BUCKET.to_string()];
    let assignments = pool
        .into_iter()
        .map(|(a, b)| (format!("{a}/{b}"), usize::from(a >= b)))
        .collect();
    bucket_item(
        "Classify the fractions",
        &buckets,
        assignments,
        "A fraction is proper when the numerator is smaller than the denominator.",
    )
}

fn pivot_comparison<R: Rng>(rng: &mut R, request: &FallbackRequest<'_>, avoid: &mut AvoidSet) -> ExerciseItem {
    let (min, max) = request.range;
    let lo_den = (min + 2).max(3);
    let (num, den) = draw_avoiding(
        rng,
        request.attempts,
        |rng: &mut R| {
            let den = rng.gen_range(lo_den..=max + 4);
            (rng.gen_range(1..den), den)
        },
        |&(n, d)| !avoid.contains(n) && !avoid.contains(d),
    )
    .unwrap_or_else(|_| (1, lo_den));
    avoid.extend([num, den]);

    let mut others: Vec<u32> = (1..=den + den / 2).filter(|n| *n != num).collect();
    shuffle(rng, &mut others);
    others.truncate(4);
    let mut numerators = others;
    numerators.push(num);
    shuffle(rng, &mut numerators);

    let pivot = format!("{num}/{den}");
    let buckets = [format!("Less than {pivot}"), format!("Greater than or equal to {pivot}")];
    let assignments = numerators
        .into_iter()
        .map(|n| (format!("{n}/{den}"), usize::from(n >= num)))
        .collect();
    bucket_item(
        &format!("Compare each fraction with {pivot}"),
        &buckets,
        assignments,
        "With the same denominator, compare the numerators.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise_engine::fraction::Fraction;
    use crate::exercise_engine::models::{ItemKind, LearningStyle};
    use rand::SeedableRng;

    fn request<'a>(ctx: &'a ContentContext, avoid: &'a AvoidSet) -> FallbackRequest<'a> {
        FallbackRequest { context: ctx, style: LearningStyle::Visual, avoid, range: (1, 12), attempts: 50 }
    }

    #[test]
    fn ten_valid_items_in_table_order() {
        let ctx = ContentContext::default();
        let avoid = AvoidSet::new();
        for seed in 0..20 {
            let items = generate(&request(&ctx, &avoid), &mut StdRng::seed_from_u64(seed));
            assert_eq!(items.len(), SESSION_SIZE);
            assert!(items.iter().all(ExerciseItem::is_valid), "seed {seed}");
            let kinds: Vec<ItemKind> = items.iter().map(ExerciseItem::kind).collect();
            assert_eq!(&kinds[..7], &[ItemKind::MultipleChoice; 7]);
            assert_eq!(kinds[7], ItemKind::MatchPairs);
            assert_eq!(&kinds[8..], &[ItemKind::DragToBucket; 2]);
        }
    }

    #[test]
    fn equivalence_item_has_exactly_one_scaled_answer() {
        let ctx = ContentContext::default();
        let avoid = AvoidSet::new();
        for seed in 0..30 {
            let items = generate(&request(&ctx, &avoid), &mut StdRng::seed_from_u64(seed));
            let ExerciseItem::MultipleChoice(m) = &items[0] else { panic!("expected multiple choice") };
            let base = scan_fractions(&m.question, None)[0].fraction;
            assert!((1..=12).contains(&base.num));
            let scaled: Vec<usize> = m
                .choices
                .iter()
                .enumerate()
                .filter(|(_, c)| {
                    Fraction::parse(c).map_or(false, |f| FACTORS.iter().any(|k| f == base.scale(*k)))
                })
                .map(|(i, _)| i)
                .collect();
            assert_eq!(scaled, vec![m.correct_index], "seed {seed}: {m:?}");
        }
    }

    #[test]
    fn avoid_set_is_respected_when_possible() {
        let ctx = ContentContext::default();
        let avoid: AvoidSet = [2u32, 3, 5].into_iter().collect();
        let items = generate(&request(&ctx, &avoid), &mut StdRng::seed_from_u64(4));
        let ExerciseItem::MultipleChoice(m) = &items[0] else { panic!("expected multiple choice") };
        let base = scan_fractions(&m.question, None)[0].fraction;
        assert!(!avoid.contains(base.num) && !avoid.contains(base.den));
    }

    #[test]
    fn buckets_classify_correctly() {
        let ctx = ContentContext::default();
        let avoid = AvoidSet::new();
        for seed in 0..20 {
            let items = generate(&request(&ctx, &avoid), &mut StdRng::seed_from_u64(seed));
            let ExerciseItem::DragToBucket(d) = &items[8] else { panic!("expected buckets") };
            assert!(!d.solution[PROPER_BUCKET].is_empty() && !d.solution[IMPROPER_BUCKET].is_empty());
            for v in &d.solution[PROPER_BUCKET] {
                assert!(Fraction::parse(v).unwrap().is_proper(), "{v}");
            }
            let ExerciseItem::DragToBucket(p) = &items[9] else { panic!("expected buckets") };
            for (bucket, pivot) in p.pivot_buckets() {
                for v in &p.solution[&bucket] {
                    assert!(pivot.accepts(Fraction::parse(v).unwrap()), "{v} in {bucket}");
                }
            }
        }
    }

    #[test]
    fn detection_by_title_and_content() {
        let topic = FractionsTopic;
        assert!(topic.detect(&ContentContext { title: "Fracciones".into(), ..ContentContext::default() }));
        let ctx = ContentContext {
            concepts: vec![crate::exercise_engine::models::Concept { text: "Half of a pizza is 1/2.".into() }],
            ..ContentContext::default()
        };
        assert!(topic.detect(&ctx));
        assert!(!topic.detect(&ContentContext { title: "Verbs".into(), ..ContentContext::default() }));
    }
}
